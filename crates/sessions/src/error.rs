/// Failures of session lookup.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// No live session for the given id, and the request could not start one.
    #[error("Bad Request: No valid session ID provided")]
    InvalidSession,
}
