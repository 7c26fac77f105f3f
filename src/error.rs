use thiserror::Error;

/// Everything that can go wrong while editing an avatar.
///
/// `Clone` because errors travel inside iced messages when a background
/// task completes.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EditorError {
    /// Bad local input (empty name, empty token). Recoverable; nothing changed.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Network or HTTP failure talking to the avatar service. Recoverable;
    /// the user must re-invoke the operation.
    #[error("Request failed: {0}")]
    Remote(String),

    /// The service answered with a shape we don't understand. Aborts the
    /// in-progress operation.
    #[error("Unexpected response from avatar service: {0}")]
    RemoteSchema(String),

    /// The avatar identifier did not match `base_session-sversion`. Fatal to
    /// the post-save version advance: the save itself already succeeded, but
    /// the new confirmation image cannot be addressed.
    #[error("Malformed avatar identifier: {0:?}")]
    MalformedIdentifier(String),
}
