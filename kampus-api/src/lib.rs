use chrono::Utc;

pub use uuid::Uuid;
pub type Time = chrono::DateTime<Utc>;

mod comment;
pub use comment::{Comment, CommentId};

mod error;
pub use error::Error;

mod homework;
pub use homework::{Audience, CompletionFilter, HomeworkId, HomeworkItem, NewHomework, Subgroup};

mod post;
pub use post::{Category, CategoryFilter, NewPost, Post, PostId};

pub mod store;
pub use store::{Collection, Document, DocumentId, Fields, OrderBy, OrderType, Snapshot, Store};

mod user;
pub use user::{Theme, UserProfile, Viewer};

// Strings coming from the presentation layer end up verbatim in store documents,
// so anything the document store would choke on is rejected at the boundary.
pub fn validate_string(s: &str) -> Result<(), Error> {
    match s.contains('\0') {
        true => Err(Error::NullByteInString(String::from(s))),
        false => Ok(()),
    }
}

/// Like `validate_string`, but also refuses text that is empty once trimmed
pub fn validate_content(s: &str) -> Result<(), Error> {
    validate_string(s)?;
    match s.trim().is_empty() {
        true => Err(Error::EmptyContent),
        false => Ok(()),
    }
}
