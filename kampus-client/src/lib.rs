mod composer;
pub use composer::{Composer, DraftKey, InputState, Submission};

mod feed;
pub use feed::Feed;

mod forum;
pub use forum::{decode_posts, ForumBoard};

mod homework;
pub use homework::{sweep, visible, HomeworkBoard, Sweep};

mod label;
pub use label::{DeadlineLabel, TimeAgo, Urgency};

pub mod profile;

pub mod api {
    pub use kampus_api::*;
}
