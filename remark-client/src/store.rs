use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::Rc,
};

use chrono::Utc;
use serde_json::Value;

#[cfg(any(debug_assertions, feature = "dev-inspect"))]
use std::collections::HashMap;

#[cfg(any(debug_assertions, feature = "dev-inspect"))]
use crate::{CommentCollection, PostKey};

use crate::{
    api::{
        Action, Comment, FeedPost, NewComment, NewCommentResponse, PostComments, PostId,
        RemoteError, SiteId, SubmissionError,
    },
    key, CommentCache, Error, Fetcher, Sanitizer, StripHtml,
};

#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    /// Something visible changed, re-read whatever is displayed
    Change,

    /// The user just submitted this comment; always followed by a `Change`
    CommentAdded(Comment),
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionId(u64);

type Observer = Rc<dyn Fn(&StoreEvent)>;

/// Client-side cache of post comments.
///
/// All state lives behind interior mutability so that the store can be shared
/// as an `Rc<CommentStore>` between the dispatcher and the UI. Observers are
/// called after the store is done mutating, so they can freely read it back.
pub struct CommentStore {
    cache: RefCell<CommentCache>,
    observers: RefCell<Vec<(SubscriptionId, Observer)>>,
    next_subscription: Cell<u64>,
    fetcher: Box<dyn Fetcher>,
    sanitizer: Box<dyn Sanitizer>,
}

impl CommentStore {
    pub fn new(fetcher: impl Fetcher + 'static) -> CommentStore {
        CommentStore {
            cache: RefCell::new(CommentCache::new()),
            observers: RefCell::new(Vec::new()),
            next_subscription: Cell::new(0),
            fetcher: Box::new(fetcher),
            sanitizer: Box::new(StripHtml),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> CommentStore {
        self.sanitizer = Box::new(sanitizer);
        self
    }

    /// Returns the comments of a post keyed by parent id (0 for top-level
    /// comments), each thread oldest first.
    ///
    /// If the comments were never fetched, asks the fetcher for them and
    /// returns `None`.
    pub fn get_comments_for_post(
        &self,
        site_id: SiteId,
        post_id: PostId,
    ) -> Option<BTreeMap<u64, Vec<Comment>>> {
        let res = self
            .cache
            .borrow()
            .collection(&key(site_id, post_id))
            .and_then(|c| c.by_parent());
        if res.is_none() {
            self.fetcher.fetch_comments(site_id, post_id);
        }
        res
    }

    pub fn get_comment_count_for_post(&self, site_id: SiteId, post_id: PostId) -> u64 {
        self.cache
            .borrow()
            .collection(&key(site_id, post_id))
            .map(|c| c.count)
            .unwrap_or(0)
    }

    pub fn get_errors_for_post(
        &self,
        site_id: SiteId,
        post_id: PostId,
    ) -> Option<Vec<SubmissionError>> {
        self.cache
            .borrow()
            .errors(&key(site_id, post_id))
            .map(|l| l.0.clone())
    }

    pub fn subscribe(&self, observer: impl Fn(&StoreEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.observers.borrow_mut().push((id, Rc::new(observer)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.borrow_mut();
        let len = observers.len();
        observers.retain(|(i, _)| *i != id);
        observers.len() != len
    }

    /// Single entry point for every write
    pub fn handle(&self, action: Action) {
        tracing::trace!(action_type = %action.action_type(), "comment store handling action");
        match action {
            Action::ReceivePostComments(p) => self.receive_post_comments(p),
            Action::ReceiveFeedPost(p) => self.receive_feed_post(p),
            Action::AddComment(c) | Action::ReplyToComment(c) => self.receive_new_comment(c),
            Action::ReceiveAddComment(r) | Action::ReceiveReplyToComment(r) => {
                self.receive_new_comment_response(r)
            }
        }
    }

    /// Parses a raw dispatcher payload and handles it. Payloads for actions
    /// the store does not care about are accepted and ignored.
    pub fn handle_payload(&self, payload: &Value) -> Result<(), Error> {
        if let Some(action) = Action::from_payload(payload)? {
            self.handle(action);
        }
        Ok(())
    }

    fn receive_post_comments(&self, p: PostComments) {
        let comments = match p.result {
            Ok(comments) => comments,
            Err(err) => {
                tracing::warn!(
                    site_id = %p.site_id,
                    post_id = %p.post_id,
                    %err,
                    "failed fetching comments"
                );
                return;
            }
        };
        let changed = self
            .cache
            .borrow_mut()
            .receive_post_comments(&key(p.site_id, p.post_id), comments);
        if changed {
            self.emit(StoreEvent::Change);
        } else {
            tracing::debug!(
                site_id = %p.site_id,
                post_id = %p.post_id,
                "fetched comments already known"
            );
        }
    }

    fn receive_feed_post(&self, post: Result<FeedPost, RemoteError>) {
        let post = match post {
            Ok(post) => post,
            Err(err) => {
                tracing::warn!(%err, "failed fetching feed post");
                return;
            }
        };
        let count = match post.comment_count {
            Some(count) => count,
            None => return,
        };
        let changed = self
            .cache
            .borrow_mut()
            .receive_comment_count(&key(post.site_id, post.post_id), count);
        if changed {
            self.emit(StoreEvent::Change);
        }
    }

    fn receive_new_comment(&self, c: NewComment) {
        let comment = self.cache.borrow_mut().add_pending_comment(
            &c,
            Utc::now(),
            self.sanitizer.as_ref(),
        );
        tracing::debug!(placeholder = %c.placeholder, "added pending comment");
        self.emit(StoreEvent::CommentAdded(comment));
        self.emit(StoreEvent::Change);
    }

    fn receive_new_comment_response(&self, r: NewCommentResponse) {
        let key = key(r.site_id, r.post_id);
        match r.result {
            Err(err) => {
                let found = self
                    .cache
                    .borrow_mut()
                    .receive_error(&key, &r.placeholder, err);
                if !found {
                    tracing::warn!(
                        placeholder = %r.placeholder,
                        "received error for unknown pending comment"
                    );
                }
                self.emit(StoreEvent::Change);
            }
            Ok(confirmed) => {
                let changed = self
                    .cache
                    .borrow_mut()
                    .confirm_comment(&key, &r.placeholder, confirmed);
                if changed {
                    self.emit(StoreEvent::Change);
                } else {
                    tracing::warn!(
                        placeholder = %r.placeholder,
                        "dropping confirmation for unknown pending comment"
                    );
                }
            }
        }
    }

    fn emit(&self, event: StoreEvent) {
        // Snapshot so observers may subscribe or unsubscribe while being notified
        let observers = self
            .observers
            .borrow()
            .iter()
            .map(|(_, o)| o.clone())
            .collect::<Vec<_>>();
        for o in observers {
            o(&event);
        }
    }

    #[cfg(any(debug_assertions, feature = "dev-inspect"))]
    pub fn all(&self) -> HashMap<PostKey, CommentCollection> {
        self.cache.borrow().collections().clone()
    }

    #[cfg(any(debug_assertions, feature = "dev-inspect"))]
    pub fn reset(&self) {
        self.cache.borrow_mut().reset();
    }
}
