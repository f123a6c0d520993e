//! Browser infrastructure: launch, lifecycle and errors

mod wrapper;

pub use wrapper::BrowserWrapper;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to find browser executable: {0}")]
    NotFound(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;
