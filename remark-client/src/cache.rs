use std::collections::HashMap;

use crate::{
    api::{Comment, CommentState, NewComment, PlaceholderId, RemoteError, Time},
    key, CommentCollection, ErrorLedger, PostKey, Sanitizer,
};

/// Comment collections and error ledgers of every post seen so far, along
/// with the transitions reconciling optimistic writes with server answers.
///
/// Every transition is deterministic: the caller supplies the clock reading
/// and the sanitizer. Transitions return whether anything visible changed.
#[derive(Clone, Debug, Default)]
pub struct CommentCache {
    collections: HashMap<PostKey, CommentCollection>,
    errors: HashMap<PostKey, ErrorLedger>,
}

impl CommentCache {
    pub fn new() -> CommentCache {
        CommentCache::default()
    }

    pub fn collection(&self, key: &PostKey) -> Option<&CommentCollection> {
        self.collections.get(key)
    }

    pub fn errors(&self, key: &PostKey) -> Option<&ErrorLedger> {
        self.errors.get(key)
    }

    pub fn collections(&self) -> &HashMap<PostKey, CommentCollection> {
        &self.collections
    }

    pub fn reset(&mut self) {
        self.collections.clear();
        self.errors.clear();
    }

    /// Inserts the optimistic version of `new`, returning it.
    ///
    /// Replies go to the tail, top-level comments to the head. Errors and
    /// failed comments from previous attempts on this post are dropped.
    pub fn add_pending_comment(
        &mut self,
        new: &NewComment,
        date: Time,
        sanitizer: &dyn Sanitizer,
    ) -> Comment {
        let key = key(new.site_id, new.post_id);
        self.remove_errors_for_post(&key);
        self.prune_error_state(&key);

        let comment = Comment::pending(
            new.placeholder.clone(),
            sanitizer.sanitize(&new.text),
            new.parent_id,
            date,
        );
        let comments = self
            .collections
            .entry(key)
            .or_insert_with(CommentCollection::empty)
            .comments_mut();
        if comment.is_reply() {
            comments.push(comment.clone());
        } else {
            comments.insert(0, comment.clone());
        }
        comment
    }

    /// Replaces the pending comment `placeholder` with its server version.
    ///
    /// Returns false, changing nothing, if there is no such pending comment.
    pub fn confirm_comment(
        &mut self,
        key: &PostKey,
        placeholder: &PlaceholderId,
        mut confirmed: Comment,
    ) -> bool {
        let coll = match self.collections.get_mut(key) {
            Some(coll) => coll,
            None => return false,
        };
        let idx = match coll.position_of(placeholder) {
            Some(idx) => idx,
            None => return false,
        };
        let comments = coll.comments_mut();
        if comments[idx].state != Some(CommentState::Pending) {
            tracing::warn!(
                %placeholder,
                state = ?comments[idx].state,
                "ignoring confirmation of a comment that is no longer pending"
            );
            return false;
        }

        confirmed.state = Some(CommentState::Confirmed);
        if confirmed.is_approved() {
            coll.count += 1;
        }
        let comments = coll.comments_mut();
        if confirmed.is_reply() {
            // Move the reply to the tail so the active thread stays in view
            comments.remove(idx);
            comments.push(confirmed);
        } else {
            comments[idx] = confirmed;
        }
        true
    }

    /// Records `error` for the submission `placeholder` and marks its comment
    /// as failed if it is still around.
    ///
    /// Returns whether a comment changed state; the ledger is updated either way.
    pub fn receive_error(
        &mut self,
        key: &PostKey,
        placeholder: &PlaceholderId,
        error: RemoteError,
    ) -> bool {
        self.errors
            .entry(*key)
            .or_default()
            .record(placeholder.clone(), error);

        let coll = match self.collections.get_mut(key) {
            Some(coll) => coll,
            None => return false,
        };
        let idx = match coll.position_of(placeholder) {
            Some(idx) => idx,
            None => return false,
        };
        let comments = coll.comments_mut();
        if comments[idx].state != Some(CommentState::Pending) {
            return false;
        }
        comments[idx].state = Some(CommentState::Error);
        if comments[idx].is_reply() {
            let failed = comments.remove(idx);
            comments.push(failed);
        }
        true
    }

    pub fn remove_errors_for_post(&mut self, key: &PostKey) -> bool {
        self.errors.remove(key).is_some()
    }

    /// Drops every comment in the error state, returning how many were dropped
    pub fn prune_error_state(&mut self, key: &PostKey) -> usize {
        match self.collections.get_mut(key).and_then(|c| c.comments.as_mut()) {
            None => 0,
            Some(comments) => {
                let before = comments.len();
                comments.retain(|c| c.state != Some(CommentState::Error));
                before - comments.len()
            }
        }
    }

    /// Stores a freshly fetched comment list, keeping the known count
    pub fn receive_post_comments(&mut self, key: &PostKey, comments: Vec<Comment>) -> bool {
        let current = self.collections.get(key);
        let received = CommentCollection {
            count: current.map(|c| c.count).unwrap_or(0),
            comments: Some(comments),
        };
        if current == Some(&received) {
            return false;
        }
        self.collections.insert(*key, received);
        true
    }

    /// Updates the count only, leaving any known comment list untouched
    pub fn receive_comment_count(&mut self, key: &PostKey, count: u64) -> bool {
        match self.collections.get_mut(key) {
            Some(coll) if coll.count == count => false,
            Some(coll) => {
                coll.count = count;
                true
            }
            None => {
                self.collections.insert(
                    *key,
                    CommentCollection {
                        count,
                        comments: None,
                    },
                );
                true
            }
        }
    }
}
