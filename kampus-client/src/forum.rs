use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::{
    api::{
        Category, CategoryFilter, Collection, Comment, CommentId, Document, DocumentId, Error,
        Fields, NewPost, OrderBy, Post, PostId, Store, Viewer,
    },
    composer::{Composer, DraftKey},
    feed::{self, Feed},
};

/// Posts decoded from a snapshot, in store order. Malformed ones are skipped.
pub fn decode_posts(snapshot: &[Document]) -> Vec<Post> {
    snapshot
        .iter()
        .filter_map(|doc| match Post::from_document(doc) {
            Ok(post) => Some(post),
            Err(err) => {
                tracing::warn!(?err, "skipping malformed post document");
                None
            }
        })
        .collect()
}

pub fn filtered(posts: &[Post], filter: CategoryFilter) -> Vec<Post> {
    posts
        .iter()
        .filter(|p| filter.matches(p))
        .cloned()
        .collect()
}

fn comments_fields(comments: &[Comment]) -> Fields {
    let mut fields = Fields::new();
    fields.insert(String::from("comments"), serde_json::json!(comments));
    fields
}

/// Live view of the forum. Posts never expire, so there is no side effect on
/// snapshot delivery.
pub struct ForumBoard<S: ?Sized> {
    store: Arc<S>,
    posts: watch::Receiver<Arc<Vec<Post>>>,
    feed: Feed,
}

impl<S> ForumBoard<S>
where
    S: 'static + ?Sized + Store,
{
    pub async fn start(store: Arc<S>) -> Result<ForumBoard<S>, Error> {
        let snapshots = store
            .subscribe(Collection::Posts, OrderBy::created_at_desc())
            .await?;
        let (publish, posts) = watch::channel(Arc::new(Vec::new()));
        let feed = Feed::spawn("posts", snapshots, move |snapshot| {
            let posts = decode_posts(&snapshot);
            tracing::debug!(num_posts = posts.len(), "received posts snapshot");
            publish.send_replace(Arc::new(posts));
            futures::future::ready(())
        });
        Ok(ForumBoard { store, posts, feed })
    }

    pub fn stop(&mut self) {
        self.feed.stop()
    }

    pub fn is_stopped(&self) -> bool {
        self.feed.is_stopped()
    }

    /// Every post, newest first
    pub fn posts(&self) -> Arc<Vec<Post>> {
        self.posts.borrow().clone()
    }

    pub fn filtered(&self, filter: CategoryFilter) -> Vec<Post> {
        filtered(&self.posts(), filter)
    }

    pub fn post(&self, id: &PostId) -> Option<Post> {
        self.posts.borrow().iter().find(|p| p.id == *id).cloned()
    }

    pub async fn next_update(&mut self) -> Option<Arc<Vec<Post>>> {
        self.posts.changed().await.ok()?;
        Some(self.posts.borrow_and_update().clone())
    }

    pub async fn wait_until<P>(&mut self, pred: P) -> Option<Arc<Vec<Post>>>
    where
        P: FnMut(&Arc<Vec<Post>>) -> bool,
    {
        feed::wait_until(&mut self.posts, pred).await
    }

    fn require(&self, id: &PostId) -> Result<Post, Error> {
        self.post(id)
            .ok_or_else(|| Error::not_found(format!("post {id}")))
    }

    async fn write(&self, id: &PostId, fields: Fields, what: &'static str) -> Result<(), Error> {
        self.store
            .update(Collection::Posts, &DocumentId::from(id), fields)
            .await
            .map_err(|err| {
                tracing::error!(post = %id, ?err, "failed to {}", what);
                err
            })
    }

    pub async fn add_post(&self, post: NewPost) -> Result<PostId, Error> {
        post.validate()?;
        let category: Category = post.category;
        match self
            .store
            .add(Collection::Posts, post.into_fields(Utc::now()))
            .await
        {
            Ok(id) => {
                tracing::info!(%id, %category, "added post");
                Ok(PostId(id.0))
            }
            Err(err) => {
                tracing::error!(?err, "failed adding post");
                Err(err)
            }
        }
    }

    /// Adds one like from the local view of the counter. Concurrent likes
    /// from others may be lost.
    pub async fn toggle_like(&self, id: &PostId) -> Result<(), Error> {
        let post = self.require(id)?;
        let mut fields = Fields::new();
        fields.insert(String::from("likes"), serde_json::json!(post.likes + 1));
        self.write(id, fields, "like post").await
    }

    pub async fn toggle_comment_like(
        &self,
        post_id: &PostId,
        comment_id: &CommentId,
    ) -> Result<(), Error> {
        let mut comments = self.require(post_id)?.comments;
        let comment = Comment::find_in_mut(&mut comments, comment_id)
            .ok_or_else(|| Error::not_found(format!("comment {comment_id}")))?;
        comment.likes += 1;
        self.write(post_id, comments_fields(&comments), "like comment")
            .await
    }

    /// Appends a new comment, at the top level or under `parent` wherever it
    /// sits in the tree. The whole tree is written back.
    pub async fn add_comment(
        &self,
        post_id: &PostId,
        content: &str,
        author: &str,
        avatar: &str,
        parent: Option<&CommentId>,
    ) -> Result<CommentId, Error> {
        crate::api::validate_content(content)?;
        crate::api::validate_content(author)?;
        crate::api::validate_string(avatar)?;
        let mut comments = self.require(post_id)?.comments;
        let comment = Comment::now(post_id.clone(), author, avatar, content.trim());
        let id = comment.id.clone();
        match parent {
            None => comments.push(comment),
            Some(parent) => Comment::insert_reply(&mut comments, parent, comment)
                .map_err(|_| Error::not_found(format!("comment {parent}")))?,
        }
        self.write(post_id, comments_fields(&comments), "add comment")
            .await?;
        tracing::info!(post = %post_id, comment = %id, "added comment");
        Ok(id)
    }

    /// Removes the comment and its whole subtree. Only its author may do so.
    pub async fn delete_comment(
        &self,
        post_id: &PostId,
        comment_id: &CommentId,
        requesting_author: &str,
    ) -> Result<(), Error> {
        let mut comments = self.require(post_id)?.comments;
        let comment = Comment::find_in(&comments, comment_id)
            .ok_or_else(|| Error::not_found(format!("comment {comment_id}")))?;
        if comment.author != requesting_author {
            return Err(Error::PermissionDenied);
        }
        Comment::prune(&mut comments, comment_id);
        self.write(post_id, comments_fields(&comments), "delete comment")
            .await
    }

    pub async fn delete_post(&self, id: &PostId, requesting_author: &str) -> Result<(), Error> {
        let post = self.require(id)?;
        if post.author != requesting_author {
            return Err(Error::PermissionDenied);
        }
        self.store
            .delete(Collection::Posts, &DocumentId::from(id))
            .await
            .map_err(|err| {
                tracing::error!(post = %id, ?err, "failed deleting post");
                err
            })
    }

    /// Sends the draft behind `key` as `viewer`. The draft is only cleared
    /// once the write went through.
    pub async fn submit(
        &self,
        composer: &mut Composer,
        key: &DraftKey,
        viewer: &Viewer,
    ) -> Result<CommentId, Error> {
        let submission = composer.submission(key)?;
        let id = self
            .add_comment(
                &submission.post,
                &submission.content,
                &viewer.name,
                &viewer.avatar,
                submission.parent.as_ref(),
            )
            .await?;
        composer.submitted(key);
        Ok(id)
    }
}
