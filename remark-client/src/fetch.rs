use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::{
    api::{PostId, SiteId},
    key, PostKey,
};

/// Asks the outside world to fetch the comments of a post. The answer is
/// expected to come back later as a `RECEIVE_POST_COMMENTS` action.
pub trait Fetcher {
    fn fetch_comments(&self, site_id: SiteId, post_id: PostId);
}

impl<F: Fn(SiteId, PostId)> Fetcher for F {
    fn fetch_comments(&self, site_id: SiteId, post_id: PostId) {
        self(site_id, post_id)
    }
}

/// Fetcher that only records requests, for a caller to serve at its own pace.
/// Clones share the same queue.
#[derive(Clone, Debug, Default)]
pub struct FetchQueue(Rc<RefCell<VecDeque<PostKey>>>); // push_back, pop_front

impl FetchQueue {
    pub fn new() -> FetchQueue {
        FetchQueue::default()
    }

    pub fn pop(&self) -> Option<PostKey> {
        self.0.borrow_mut().pop_front()
    }

    pub fn drain(&self) -> Vec<PostKey> {
        self.0.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl Fetcher for FetchQueue {
    fn fetch_comments(&self, site_id: SiteId, post_id: PostId) {
        tracing::debug!(%site_id, %post_id, "queueing comment fetch");
        self.0.borrow_mut().push_back(key(site_id, post_id));
    }
}
