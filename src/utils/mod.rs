//! Shared utilities: cancellation, streaming infrastructure, URL handling.

pub mod cancel;
pub mod streaming;
pub mod url;
