use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use remark_client::{
    api::{
        Action, Comment, CommentId, FeedPost, NewComment, NewCommentResponse, ParentRef,
        PostComments, PostId, RemoteError, SiteId, COMMENT_STATUS_APPROVED,
        COMMENT_STATUS_UNAPPROVED,
    },
    key, FetchQueue, PostKey,
};

/// In-memory stand-in for the remote comments API. Every request is answered
/// with the action the real API client would dispatch.
pub struct MockServer {
    // chronological order
    posts: BTreeMap<PostKey, Vec<Comment>>,
    next_id: u64,
    moderation: bool,
    blocked_words: HashSet<String>,
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            posts: BTreeMap::new(),
            next_id: 1,
            moderation: false,
            blocked_words: HashSet::new(),
        }
    }

    /// When on, new comments are held for moderation instead of published
    pub fn with_moderation(mut self, moderation: bool) -> MockServer {
        self.moderation = moderation;
        self
    }

    pub fn block_word(&mut self, word: impl Into<String>) {
        self.blocked_words.insert(word.into().to_lowercase());
    }

    /// Adds an already published comment, returning its id
    pub fn seed_comment(
        &mut self,
        site_id: SiteId,
        post_id: PostId,
        text: &str,
        parent_id: u64,
    ) -> u64 {
        let id = self.next_id;
        let c = self.new_comment(text, parent_id, COMMENT_STATUS_APPROVED);
        self.posts.entry(key(site_id, post_id)).or_default().push(c);
        id
    }

    /// Published comments of a post: newest top-level comment first, then the
    /// replies, newest first too
    pub fn fetch_post_comments(&self, site_id: SiteId, post_id: PostId) -> Action {
        let published = self
            .posts
            .get(&key(site_id, post_id))
            .into_iter()
            .flatten()
            .filter(|c| c.is_approved())
            .rev();
        let (replies, mut comments): (Vec<Comment>, Vec<Comment>) =
            published.cloned().partition(|c| c.is_reply());
        comments.extend(replies);
        Action::ReceivePostComments(PostComments {
            site_id,
            post_id,
            result: Ok(comments),
        })
    }

    /// Answers every request recorded in `queue`, emptying it
    pub fn serve_fetches(&self, queue: &FetchQueue) -> Vec<Action> {
        queue
            .drain()
            .into_iter()
            .map(|k| self.fetch_post_comments(k.site_id, k.post_id))
            .collect()
    }

    pub fn feed_post(&self, site_id: SiteId, post_id: PostId) -> Action {
        let count = self
            .posts
            .get(&key(site_id, post_id))
            .map(|comments| comments.iter().filter(|c| c.is_approved()).count())
            .unwrap_or(0);
        Action::ReceiveFeedPost(Ok(FeedPost {
            site_id,
            post_id,
            comment_count: Some(count as u64),
        }))
    }

    /// Handles a comment submission. Returns `None` for actions that are not
    /// submissions.
    pub fn submit(&mut self, action: &Action) -> Option<Action> {
        let (c, is_reply) = match action {
            Action::AddComment(c) => (c, false),
            Action::ReplyToComment(c) => (c, true),
            _ => return None,
        };
        let response = NewCommentResponse {
            site_id: c.site_id,
            post_id: c.post_id,
            placeholder: c.placeholder.clone(),
            result: self.create_comment(c),
        };
        if let Err(err) = &response.result {
            tracing::debug!(placeholder = %c.placeholder, %err, "mock server rejecting comment");
        }
        Some(match is_reply {
            false => Action::ReceiveAddComment(response),
            true => Action::ReceiveReplyToComment(response),
        })
    }

    fn create_comment(&mut self, c: &NewComment) -> Result<Comment, RemoteError> {
        let text = c.text.trim();
        if text.is_empty() {
            return Err(RemoteError::new("empty_comment", "Comment cannot be empty"));
        }
        let lower = text.to_lowercase();
        if self.blocked_words.iter().any(|w| lower.contains(w.as_str())) {
            return Err(RemoteError::new(
                "comment_blocked",
                "Sorry, this comment could not be posted",
            ));
        }
        let existing = self.posts.get(&key(c.site_id, c.post_id));
        let content = format!("<p>{text}</p>\n");
        if existing
            .into_iter()
            .flatten()
            .any(|other| other.content == content)
        {
            return Err(RemoteError::new(
                "comment_duplicate",
                "Duplicate comment detected; it looks as though you have already said that",
            ));
        }
        if c.parent_id > 0
            && !existing
                .into_iter()
                .flatten()
                .any(|other| other.id == CommentId::Server(c.parent_id))
        {
            return Err(RemoteError::new("unknown_comment", "Unknown parent comment"));
        }

        let status = match self.moderation {
            true => COMMENT_STATUS_UNAPPROVED,
            false => COMMENT_STATUS_APPROVED,
        };
        let comment = self.new_comment(text, c.parent_id, status);
        self.posts
            .entry(key(c.site_id, c.post_id))
            .or_default()
            .push(comment.clone());
        Ok(comment)
    }

    fn new_comment(&mut self, text: &str, parent_id: u64, status: &str) -> Comment {
        let id = self.next_id;
        self.next_id += 1;
        Comment {
            id: CommentId::Server(id),
            content: format!("<p>{text}</p>\n"),
            parent: (parent_id > 0).then_some(ParentRef { id: parent_id }),
            state: None,
            status: Some(String::from(status)),
            date: Some(Utc::now()),
            kind: String::from("comment"),
            extra: BTreeMap::new(),
        }
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}
