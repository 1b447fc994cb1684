#![forbid(unsafe_code)]

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors originated by the proxy itself.
///
/// Everything else (collaborator failures) propagates unmodified; the
/// proxy performs no error translation beyond this enum.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// A forwarded write was attempted while the proxy is not editable.
    #[error("{proxy} is not editable: cannot set {key:?}")]
    NotEditable { proxy: String, key: String },
}

impl ProxyError {
    #[must_use]
    pub fn not_editable(proxy: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotEditable {
            proxy: proxy.into(),
            key: key.into(),
        }
    }
}
