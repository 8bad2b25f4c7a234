use std::fmt;

/// The error taxonomy shared by the engine, the control plane, and the CLI.
///
/// Every variant maps to exactly one HTTP status (see [`Error::http_status`])
/// and to exactly one `kind` string in the control plane's JSON error body.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration invalid: {field}: expected {expected}, got {got}{suggestion}")]
    ConfigInvalid {
        field: String,
        expected: String,
        got: String,
        suggestion: String,
    },

    #[error("interface unavailable: {0}")]
    InterfaceUnavailable(String),

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("frame malformed: {0}")]
    FrameMalformed(String),

    #[error("handler busy (queue full): {0}")]
    HandlerBusy(String),

    #[error("protocol unsupported: {0}")]
    ProtocolUnsupported(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("rate limited")]
    RateLimited,

    #[error("replay busy: {0}")]
    ReplayBusy(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn config_invalid(
        field: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
        suggestion: Option<&str>,
    ) -> Self {
        Error::ConfigInvalid {
            field: field.into(),
            expected: expected.into(),
            got: got.into(),
            suggestion: suggestion
                .map(|s| format!(" (suggestion: {s})"))
                .unwrap_or_default(),
        }
    }

    /// The stable machine-readable kind, used both for JSON bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ConfigInvalid { .. } => "ConfigInvalid",
            Error::InterfaceUnavailable(_) => "InterfaceUnavailable",
            Error::CaptureFailed(_) => "CaptureFailed",
            Error::FrameMalformed(_) => "FrameMalformed",
            Error::HandlerBusy(_) => "HandlerBusy",
            Error::ProtocolUnsupported(_) => "ProtocolUnsupported",
            Error::NotFound(_) => "NotFound",
            Error::Conflict(_) => "Conflict",
            Error::StorageUnavailable(_) => "StorageUnavailable",
            Error::Unauthorized => "Unauthorized",
            Error::RateLimited => "RateLimited",
            Error::ReplayBusy(_) => "ReplayBusy",
            Error::Cancelled => "Cancelled",
            Error::Internal(_) => "Internal",
        }
    }

    /// Process exit code per the CLI surface described in `spec.md` §6.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InterfaceUnavailable(_) => 2,
            _ => 1,
        }
    }

    /// HTTP status mapping per `spec.md` §7.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Conflict(_) => 409,
            Error::NotFound(_) => 404,
            Error::Unauthorized => 401,
            Error::RateLimited => 429,
            Error::ConfigInvalid { .. } => 400,
            Error::InterfaceUnavailable(_) => 400,
            Error::FrameMalformed(_) => 400,
            Error::HandlerBusy(_) => 503,
            Error::ProtocolUnsupported(_) => 400,
            Error::StorageUnavailable(_) => 503,
            Error::ReplayBusy(_) => 409,
            Error::Cancelled => 499,
            Error::CaptureFailed(_) | Error::Internal(_) => 500,
        }
    }
}

/// Structured details attached to a control-plane error response.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ErrorDetails {
    pub field: Option<String>,
    pub expected: Option<String>,
    pub got: Option<String>,
    pub suggestion: Option<String>,
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_total_status_mapping() {
        let samples = [
            Error::config_invalid("mac", "unique", "duplicate", None),
            Error::InterfaceUnavailable("eth9".into()),
            Error::CaptureFailed("x".into()),
            Error::FrameMalformed("short".into()),
            Error::HandlerBusy("arp".into()),
            Error::ProtocolUnsupported("x".into()),
            Error::NotFound("oid".into()),
            Error::Conflict("mac".into()),
            Error::StorageUnavailable("disk".into()),
            Error::Unauthorized,
            Error::RateLimited,
            Error::ReplayBusy("x".into()),
            Error::Cancelled,
            Error::Internal("x".into()),
        ];
        for e in &samples {
            assert!(e.http_status() >= 400);
            assert!(!e.kind().is_empty());
        }
    }

    #[test]
    fn interface_unavailable_exits_2() {
        assert_eq!(Error::InterfaceUnavailable("x".into()).exit_code(), 2);
        assert_eq!(Error::Internal("x".into()).exit_code(), 1);
    }
}
