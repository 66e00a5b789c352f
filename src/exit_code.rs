use crate::error::CurlError;

/// Process exit status for an error, following curl's numbering.
pub fn exit_code_for_error(err: &CurlError) -> i32 {
    match err {
        CurlError::ExtensionUnavailable(_) => 2,
        CurlError::Config(_) => 2,
        CurlError::InvalidUrl(_) => 3,
        CurlError::Unsupported(_) => 4,
        CurlError::Transport { code, .. } => *code,
        CurlError::Io(_) => 23,
        CurlError::Json(_) => 26,
        CurlError::UnknownAuthType(_) | CurlError::InvalidOptionValue { .. } => 43,
        CurlError::NoSession => 43,
        CurlError::UnknownOption(_) => 48,
    }
}
