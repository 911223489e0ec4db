#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Permission denied")]
    PermissionDenied,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Content is empty")]
    EmptyContent,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Invalid document {id}: {reason}")]
    InvalidDocument { id: String, reason: String },
}

impl Error {
    pub fn not_found(what: impl std::fmt::Display) -> Error {
        Error::NotFound(what.to_string())
    }

    pub fn unavailable(err: impl std::fmt::Display) -> Error {
        Error::StoreUnavailable(err.to_string())
    }

    /// The target vanished between render and action: callers drop these
    /// without telling the viewer.
    pub fn is_silent(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Short message the presentation layer shows when an action did not go through
    pub fn notice(&self) -> &'static str {
        match self {
            Error::PermissionDenied => "You can only delete what you created yourself.",
            Error::NotFound(_) => "This item no longer exists.",
            Error::StoreUnavailable(_) => "Something went wrong, please try again later.",
            Error::EmptyContent => "Please write something first.",
            Error::NullByteInString(_) => "The text contains an invalid character.",
            Error::InvalidDocument { .. } => "Received malformed data from the server.",
        }
    }
}
