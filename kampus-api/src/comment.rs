use std::fmt;

use chrono::Utc;

use crate::{PostId, Time, Uuid};

#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn generate() -> CommentId {
        CommentId(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,

    /// Post this comment belongs to, for the presentation layer's callbacks.
    /// Always the enclosing post once decoded through `Post::from_document`.
    #[serde(default)]
    pub post_id: PostId,

    pub author: String,

    #[serde(default)]
    pub avatar: String,

    pub content: String,

    #[serde(default = "Utc::now")]
    pub created_at: Time,

    #[serde(default)]
    pub likes: u64,

    /// Child comments, in insertion order
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn now(post_id: PostId, author: &str, avatar: &str, content: &str) -> Comment {
        Comment {
            id: CommentId::generate(),
            post_id,
            author: String::from(author),
            avatar: String::from(avatar),
            content: String::from(content),
            created_at: Utc::now(),
            likes: 0,
            replies: Vec::new(),
        }
    }

    pub fn find_in<'a>(comments: &'a [Comment], id: &CommentId) -> Option<&'a Comment> {
        for c in comments {
            if c.id == *id {
                return Some(c);
            }
            if let Some(res) = Comment::find_in(&c.replies, id) {
                return Some(res);
            }
        }
        None
    }

    pub fn find_in_mut<'a>(
        comments: &'a mut [Comment],
        id: &CommentId,
    ) -> Option<&'a mut Comment> {
        for c in comments.iter_mut() {
            if c.id == *id {
                return Some(c);
            }
            if let Some(res) = Comment::find_in_mut(&mut c.replies, id) {
                return Some(res);
            }
        }
        None
    }

    /// Removes every comment with this id at any depth, along with its replies.
    /// Returns whether anything was removed.
    pub fn prune(comments: &mut Vec<Comment>, id: &CommentId) -> bool {
        let before = comments.len();
        comments.retain(|c| c.id != *id);
        let mut removed = comments.len() != before;
        for c in comments.iter_mut() {
            removed |= Comment::prune(&mut c.replies, id);
        }
        removed
    }

    /// Appends `reply` to the replies of `parent`, wherever it is in the tree.
    /// Hands `reply` back if `parent` is nowhere to be found.
    pub fn insert_reply(
        comments: &mut [Comment],
        parent: &CommentId,
        reply: Comment,
    ) -> Result<(), Comment> {
        match Comment::find_in_mut(comments, parent) {
            Some(p) => {
                p.replies.push(reply);
                Ok(())
            }
            None => Err(reply),
        }
    }

    /// Points every comment of the tree back at `post`
    pub fn adopt(comments: &mut [Comment], post: &PostId) {
        for c in comments {
            if c.post_id != *post {
                c.post_id = post.clone();
            }
            Comment::adopt(&mut c.replies, post);
        }
    }

    /// Number of comments in this subtree, self included
    pub fn count(&self) -> usize {
        1 + Comment::count_all(&self.replies)
    }

    pub fn count_all(comments: &[Comment]) -> usize {
        comments.iter().map(|c| c.count()).sum()
    }
}
