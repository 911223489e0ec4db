use std::{fmt, str::FromStr};

use chrono::Utc;

use crate::{Comment, Document, DocumentId, Error, Fields, Time};

#[derive(
    Clone,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(transparent)]
pub struct PostId(pub String);

impl From<&PostId> for DocumentId {
    fn from(id: &PostId) -> DocumentId {
        DocumentId(id.0.clone())
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Programming,
    Mathematics,
    Physics,
    Announcements,
    #[serde(other)]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Programming,
        Category::Mathematics,
        Category::Physics,
        Category::Announcements,
        Category::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Programming => "programming",
            Category::Mathematics => "mathematics",
            Category::Physics => "physics",
            Category::Announcements => "announcements",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Category, String> {
        Category::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown category {s:?}"))
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => post.category == *c,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<CategoryFilter, String> {
        match s {
            "all" => Ok(CategoryFilter::All),
            s => s.parse().map(CategoryFilter::Only),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author: String,

    #[serde(default)]
    pub avatar: String,

    pub category: Category,

    // posts written before timestamps were recorded show up as brand new
    #[serde(default = "Utc::now")]
    pub created_at: Time,

    /// Shared counter: every like from anyone adds one
    #[serde(default)]
    pub likes: u64,

    /// Top-level comments in insertion order, replies nest inside
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Decodes a stored post, pointing its whole comment tree back at it
    pub fn from_document(doc: &Document) -> Result<Post, Error> {
        let mut post = doc.decode::<Post>()?;
        Comment::adopt(&mut post.comments, &post.id);
        Ok(post)
    }

    pub fn comment(&self, id: &crate::CommentId) -> Option<&Comment> {
        Comment::find_in(&self.comments, id)
    }

    pub fn comment_count(&self) -> usize {
        Comment::count_all(&self.comments)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category: Category,
    pub author: String,
    pub avatar: String,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_content(&self.title)?;
        crate::validate_content(&self.content)?;
        crate::validate_content(&self.author)?;
        crate::validate_string(&self.avatar)
    }

    pub fn into_fields(self, now: Time) -> Fields {
        let mut fields = crate::store::to_fields(&self);
        fields.insert(String::from("createdAt"), serde_json::json!(now));
        fields.insert(String::from("likes"), serde_json::json!(0));
        fields.insert(String::from("comments"), serde_json::json!([]));
        fields
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_with_defaults() {
        let before = Utc::now();
        let post: Post = serde_json::from_value(json!({
            "id": "p1",
            "title": "Exam dates",
            "content": "anyone?",
            "author": "ira",
            "avatar": "🐱",
            "category": "announcements",
        }))
        .unwrap();
        assert_eq!(post.likes, 0);
        assert!(post.comments.is_empty());
        assert!(post.created_at >= before);
        assert_eq!(post.category, Category::Announcements);
    }

    #[test]
    fn sparse_replies_keep_the_post() {
        let doc = Document {
            id: DocumentId(String::from("p1")),
            fields: crate::store::to_fields(&json!({
                "title": "t",
                "content": "c",
                "author": "a",
                "category": "physics",
                "comments": [{
                    "id": "c1",
                    "postId": "elsewhere",
                    "author": "x",
                    "content": "top",
                    "replies": [{ "id": "r1", "author": "y", "content": "reply" }],
                }],
            })),
        };
        let post = Post::from_document(&doc).unwrap();
        assert_eq!(post.avatar, "");
        assert_eq!(post.comments[0].post_id, post.id);
        let reply = &post.comments[0].replies[0];
        assert_eq!(reply.post_id, post.id);
        assert_eq!(reply.avatar, "");
        assert_eq!(post.comment_count(), 2);
    }

    #[test]
    fn unknown_category_is_other() {
        let post: Post = serde_json::from_value(json!({
            "id": "p1",
            "title": "t",
            "content": "c",
            "author": "a",
            "avatar": "",
            "category": "chemistry",
            "likes": 4,
        }))
        .unwrap();
        assert_eq!(post.category, Category::Other);
        assert_eq!(post.likes, 4);
    }

    #[test]
    fn category_filter() {
        let post: Post = serde_json::from_value(json!({
            "id": "p1",
            "title": "t",
            "content": "c",
            "author": "a",
            "avatar": "",
            "category": "physics",
        }))
        .unwrap();
        assert!("all".parse::<CategoryFilter>().unwrap().matches(&post));
        assert!("physics".parse::<CategoryFilter>().unwrap().matches(&post));
        assert!(!"mathematics"
            .parse::<CategoryFilter>()
            .unwrap()
            .matches(&post));
        assert!("chemistry".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn new_post_fields() {
        let now = Utc::now();
        let post = NewPost {
            title: String::from("t"),
            content: String::from("c"),
            category: Category::Programming,
            author: String::from("a"),
            avatar: String::from("🦉"),
        };
        assert_eq!(post.validate(), Ok(()));
        let fields = post.into_fields(now);
        assert_eq!(fields["category"], json!("programming"));
        assert_eq!(fields["likes"], json!(0));
        assert_eq!(fields["comments"], json!([]));
        assert_eq!(fields["createdAt"], json!(now));
    }

    #[test]
    fn new_post_needs_a_title() {
        let post = NewPost {
            title: String::from("  "),
            content: String::from("c"),
            category: Category::Other,
            author: String::from("a"),
            avatar: String::new(),
        };
        assert_eq!(post.validate(), Err(Error::EmptyContent));
    }
}
