//! Shared helpers for text normalization and URL handling

pub mod text;
pub mod urls;

pub use text::{sanitize_text, truncate};
pub use urls::{clean_url, resolve_url, same_origin};
