//! Console error types.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The REST endpoint could not be reached or answered with a failure.
    #[error("transport error: {0}")]
    Transport(SmolStr),
    /// The endpoint answered, but not with a usable sitemap.
    #[error("invalid sitemap: {0}")]
    InvalidSitemap(SmolStr),
    #[error("invalid config: {0}")]
    InvalidConfig(SmolStr),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
