//! Comment input boxes of one viewer session.
//!
//! Every post has a top-level box. On top of that, at most one reply box is
//! open at a time: opening another one closes the previous one and drops its
//! draft.

use std::collections::HashMap;

use crate::api::{CommentId, Error, PostId};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum DraftKey {
    Post(PostId),
    Reply(PostId, CommentId),
}

impl DraftKey {
    pub fn post(&self) -> &PostId {
        match self {
            DraftKey::Post(p) | DraftKey::Reply(p, _) => p,
        }
    }

    pub fn parent(&self) -> Option<&CommentId> {
        match self {
            DraftKey::Post(_) => None,
            DraftKey::Reply(_, c) => Some(c),
        }
    }
}

/// What the comment area under one post currently looks like
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputState<'a> {
    Idle,
    Composing(&'a str),
    Replying { parent: &'a CommentId, draft: &'a str },
}

/// A draft ready to be written as a comment
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Submission {
    pub post: PostId,
    pub parent: Option<CommentId>,
    pub content: String,
}

#[derive(Clone, Debug, Default)]
pub struct Composer {
    drafts: HashMap<DraftKey, String>,
    replying_to: Option<(PostId, CommentId)>,
}

impl Composer {
    pub fn draft(&self, key: &DraftKey) -> &str {
        self.drafts.get(key).map(|d| d.as_str()).unwrap_or("")
    }

    pub fn edit(&mut self, key: DraftKey, text: impl Into<String>) {
        self.drafts.insert(key, text.into());
    }

    pub fn replying_to(&self) -> Option<(&PostId, &CommentId)> {
        self.replying_to.as_ref().map(|(p, c)| (p, c))
    }

    /// Opens the reply box under `parent`, or closes it if it already was open
    pub fn toggle_reply(&mut self, post: PostId, parent: CommentId) {
        let same = self
            .replying_to
            .as_ref()
            .map(|(_, c)| *c == parent)
            .unwrap_or(false);
        self.cancel_reply();
        if !same {
            self.replying_to = Some((post, parent));
        }
    }

    pub fn cancel_reply(&mut self) {
        if let Some((post, parent)) = self.replying_to.take() {
            self.drafts.remove(&DraftKey::Reply(post, parent));
        }
    }

    pub fn state(&self, post: &PostId) -> InputState<'_> {
        if let Some((p, parent)) = &self.replying_to {
            if p == post {
                let draft = self.draft(&DraftKey::Reply(p.clone(), parent.clone()));
                return InputState::Replying { parent, draft };
            }
        }
        match self.draft(&DraftKey::Post(post.clone())) {
            "" => InputState::Idle,
            draft => InputState::Composing(draft),
        }
    }

    /// The trimmed draft behind `key`. Blank drafts are refused.
    pub fn submission(&self, key: &DraftKey) -> Result<Submission, Error> {
        let draft = self.draft(key);
        crate::api::validate_content(draft)?;
        Ok(Submission {
            post: key.post().clone(),
            parent: key.parent().cloned(),
            content: String::from(draft.trim()),
        })
    }

    /// Back to idle once the draft went through
    pub fn submitted(&mut self, key: &DraftKey) {
        self.drafts.remove(key);
        if let DraftKey::Reply(post, parent) = key {
            if self.replying_to.as_ref() == Some(&(post.clone(), parent.clone())) {
                self.replying_to = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str) -> PostId {
        PostId(String::from(id))
    }

    fn comment(id: &str) -> CommentId {
        CommentId(String::from(id))
    }

    #[test]
    fn composing_then_submitting_goes_back_to_idle() {
        let mut composer = Composer::default();
        let key = DraftKey::Post(post("p"));
        assert_eq!(composer.state(&post("p")), InputState::Idle);
        composer.edit(key.clone(), "  hello ");
        assert_eq!(
            composer.state(&post("p")),
            InputState::Composing("  hello ")
        );

        let submission = composer.submission(&key).unwrap();
        assert_eq!(submission.content, "hello");
        assert_eq!(submission.parent, None);
        composer.submitted(&key);
        assert_eq!(composer.state(&post("p")), InputState::Idle);
    }

    #[test]
    fn blank_drafts_are_not_submitted() {
        let mut composer = Composer::default();
        let key = DraftKey::Post(post("p"));
        assert_eq!(composer.submission(&key), Err(Error::EmptyContent));
        composer.edit(key.clone(), " \t\n");
        assert_eq!(composer.submission(&key), Err(Error::EmptyContent));
    }

    #[test]
    fn only_one_reply_box_is_open() {
        let mut composer = Composer::default();
        composer.toggle_reply(post("p"), comment("c1"));
        composer.edit(DraftKey::Reply(post("p"), comment("c1")), "draft");
        assert_eq!(
            composer.state(&post("p")),
            InputState::Replying {
                parent: &comment("c1"),
                draft: "draft"
            }
        );

        // opening another closes the first, draft included
        composer.toggle_reply(post("q"), comment("c2"));
        assert_eq!(composer.replying_to(), Some((&post("q"), &comment("c2"))));
        assert_eq!(composer.state(&post("p")), InputState::Idle);
        assert_eq!(
            composer.draft(&DraftKey::Reply(post("p"), comment("c1"))),
            ""
        );

        // selecting the same target again closes it
        composer.toggle_reply(post("q"), comment("c2"));
        assert_eq!(composer.replying_to(), None);
    }

    #[test]
    fn submitting_a_reply_closes_the_box() {
        let mut composer = Composer::default();
        let key = DraftKey::Reply(post("p"), comment("c1"));
        composer.toggle_reply(post("p"), comment("c1"));
        composer.edit(key.clone(), "yes");
        composer.edit(DraftKey::Post(post("p")), "top-level draft");

        let submission = composer.submission(&key).unwrap();
        assert_eq!(submission.parent, Some(comment("c1")));
        composer.submitted(&key);
        assert_eq!(composer.replying_to(), None);
        assert_eq!(
            composer.state(&post("p")),
            InputState::Composing("top-level draft")
        );
    }
}
