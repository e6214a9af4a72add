use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use serde_json::Value;

use crate::{api::Action, CommentStore, Error};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DispatchToken(u64);

type Callback = Rc<dyn Fn(&Value)>;

/// Action bus: hands every dispatched payload to all registered callbacks,
/// in registration order, one payload at a time.
#[derive(Default)]
pub struct Dispatcher {
    callbacks: RefCell<Vec<(DispatchToken, Callback)>>,
    next_token: Cell<u64>,
    dispatching: Cell<bool>,
}

struct DispatchGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Dispatcher::default()
    }

    pub fn register(&self, callback: impl Fn(&Value) + 'static) -> DispatchToken {
        let tok = DispatchToken(self.next_token.get());
        self.next_token.set(tok.0 + 1);
        self.callbacks.borrow_mut().push((tok, Rc::new(callback)));
        tok
    }

    /// Returns false if `tok` was not registered
    pub fn unregister(&self, tok: DispatchToken) -> bool {
        let mut callbacks = self.callbacks.borrow_mut();
        let len = callbacks.len();
        callbacks.retain(|(t, _)| *t != tok);
        callbacks.len() != len
    }

    /// Fails without calling anything when invoked from within a callback
    pub fn dispatch(&self, payload: &Value) -> Result<(), Error> {
        if self.dispatching.replace(true) {
            tracing::error!("refusing re-entrant dispatch");
            return Err(Error::ReentrantDispatch);
        }
        let _guard = DispatchGuard(&self.dispatching);
        let callbacks = self
            .callbacks
            .borrow()
            .iter()
            .map(|(_, c)| c.clone())
            .collect::<Vec<_>>();
        for c in callbacks {
            c(payload);
        }
        Ok(())
    }

    pub fn dispatch_action(&self, action: &Action) -> Result<(), Error> {
        self.dispatch(&action.to_payload())
    }
}

/// Routes every payload dispatched on `dispatcher` to `store`. Meant to be
/// called once, at startup.
///
/// Payloads the store does not handle, and malformed ones, are dropped.
pub fn register_comment_store(dispatcher: &Dispatcher, store: Rc<CommentStore>) -> DispatchToken {
    dispatcher.register(move |payload| {
        if let Err(err) = store.handle_payload(payload) {
            tracing::debug!(%err, "comment store ignoring payload");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{CommentId, CommentState, ParentRef, PlaceholderId, PostId, SiteId},
        FetchQueue, StoreEvent,
    };
    use serde_json::json;

    fn setup() -> (Rc<Dispatcher>, Rc<CommentStore>, Rc<RefCell<Vec<StoreEvent>>>) {
        let dispatcher = Rc::new(Dispatcher::new());
        let store = Rc::new(CommentStore::new(FetchQueue::new()));
        register_comment_store(&dispatcher, store.clone());
        let events = Rc::new(RefCell::new(Vec::new()));
        {
            let events = events.clone();
            store.subscribe(move |e| events.borrow_mut().push(e.clone()));
        }
        (dispatcher, store, events)
    }

    fn add_comment_payload(tag: &str, parent: u64, placeholder: &str) -> Value {
        json!({ "action": {
            "type": tag,
            "args": {
                "siteId": 1,
                "postId": 10,
                "commentText": "hello",
                "parentCommentId": parent,
                "commentPlaceholderId": placeholder,
            },
        } })
    }

    #[test]
    fn routes_by_tag() {
        let (dispatcher, store, _) = setup();
        dispatcher
            .dispatch(&add_comment_payload("ADD_COMMENT", 0, "pending1"))
            .unwrap();
        dispatcher
            .dispatch(&json!({ "action": {
                "type": "RECEIVE_ADD_COMMENT",
                "args": { "siteId": 1, "postId": 10, "commentPlaceholderId": "pending1" },
                "data": {
                    "ID": 55,
                    "status": "approved",
                    "parent": false,
                    "date": "2015-06-01T10:00:00Z",
                },
            } }))
            .unwrap();
        dispatcher
            .dispatch(&add_comment_payload("REPLY_TO_COMMENT", 55, "pending2"))
            .unwrap();
        dispatcher
            .dispatch(&json!({ "action": {
                "type": "RECEIVE_REPLY_TO_COMMENT",
                "args": { "siteId": 1, "postId": 10, "commentPlaceholderId": "pending2" },
                "error": { "error": "comment_blocked", "message": "blocked" },
            } }))
            .unwrap();
        dispatcher
            .dispatch(&json!({ "action": {
                "type": "RECEIVE_FEED_POST",
                "data": { "site_ID": 1, "ID": 10, "discussion": { "comment_count": 9 } },
            } }))
            .unwrap();

        let groups = store.get_comments_for_post(SiteId(1), PostId(10)).unwrap();
        assert_eq!(groups[&0][0].state, Some(CommentState::Confirmed));
        assert_eq!(groups[&55][0].state, Some(CommentState::Error));
        assert_eq!(store.get_comment_count_for_post(SiteId(1), PostId(10)), 9);
        let errors = store.get_errors_for_post(SiteId(1), PostId(10)).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].placeholder, PlaceholderId::new("pending2"));
    }

    #[test]
    fn add_confirm_then_failed_reply() {
        let (dispatcher, store, _) = setup();
        let k = crate::key(SiteId(1), PostId(10));

        dispatcher
            .dispatch(&add_comment_payload("ADD_COMMENT", 0, "pending1"))
            .unwrap();
        let all = store.all();
        assert_eq!(all[&k].count, 0);
        let comments = all[&k].comments();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, CommentId::Placeholder(PlaceholderId::new("pending1")));
        assert_eq!(comments[0].state, Some(CommentState::Pending));
        assert_eq!(comments[0].parent, Some(ParentRef { id: 0 }));

        dispatcher
            .dispatch(&json!({ "action": {
                "type": "RECEIVE_ADD_COMMENT",
                "args": { "siteId": 1, "postId": 10, "commentPlaceholderId": "pending1" },
                "data": { "ID": 55, "status": "approved", "parent": { "ID": 0 } },
            } }))
            .unwrap();
        let all = store.all();
        assert_eq!(all[&k].count, 1);
        let comments = all[&k].comments();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, CommentId::Server(55));
        assert_eq!(comments[0].state, Some(CommentState::Confirmed));

        dispatcher
            .dispatch(&add_comment_payload("REPLY_TO_COMMENT", 55, "pending2"))
            .unwrap();
        dispatcher
            .dispatch(&json!({ "action": {
                "type": "RECEIVE_REPLY_TO_COMMENT",
                "args": { "siteId": 1, "postId": 10, "commentPlaceholderId": "pending2" },
                "error": { "message": "blocked" },
            } }))
            .unwrap();
        let all = store.all();
        let last = all[&k].comments().last().unwrap();
        assert_eq!(last.id, CommentId::Placeholder(PlaceholderId::new("pending2")));
        assert_eq!(last.state, Some(CommentState::Error));
        let errors = store.get_errors_for_post(SiteId(1), PostId(10)).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].placeholder, PlaceholderId::new("pending2"));
        assert_eq!(errors[0].error.message.as_deref(), Some("blocked"));
    }

    #[test]
    fn fetched_comments_need_only_an_id() {
        let (dispatcher, store, events) = setup();
        dispatcher
            .dispatch(&json!({ "action": {
                "type": "RECEIVE_POST_COMMENTS",
                "siteId": 1,
                "postId": 10,
                "data": { "comments": [ { "ID": 3, "content": "x", "parent": false } ] },
            } }))
            .unwrap();
        let groups = store.get_comments_for_post(SiteId(1), PostId(10)).unwrap();
        assert_eq!(groups[&0].len(), 1);
        assert_eq!(groups[&0][0].id, CommentId::Server(3));
        assert_eq!(groups[&0][0].date, None);
        assert_eq!(*events.borrow(), vec![StoreEvent::Change]);
    }

    #[test]
    fn ignores_garbage() {
        let (dispatcher, store, events) = setup();
        for payload in [
            json!(null),
            json!({}),
            json!({ "action": null }),
            json!({ "action": { "type": "RECEIVE_POST" } }),
            json!({ "action": { "type": "ADD_COMMENT" } }),
            json!({ "action": { "type": "RECEIVE_POST_COMMENTS", "siteId": 1 } }),
            json!({ "action": { "type": 42 } }),
        ] {
            dispatcher.dispatch(&payload).unwrap();
        }
        assert!(events.borrow().is_empty());
        assert!(store.all().is_empty());
    }

    #[test]
    fn refuses_reentrant_dispatch() {
        let (dispatcher, store, _) = setup();
        let results = Rc::new(RefCell::new(Vec::new()));
        {
            let weak = Rc::downgrade(&dispatcher);
            let results = results.clone();
            store.subscribe(move |e| {
                if let (StoreEvent::CommentAdded(_), Some(d)) = (e, weak.upgrade()) {
                    let res = d.dispatch(&add_comment_payload("ADD_COMMENT", 0, "pending9"));
                    results.borrow_mut().push(res.is_err());
                }
            });
        }
        dispatcher
            .dispatch(&add_comment_payload("ADD_COMMENT", 0, "pending1"))
            .unwrap();
        assert_eq!(*results.borrow(), vec![true]);
        let groups = store.get_comments_for_post(SiteId(1), PostId(10)).unwrap();
        assert_eq!(groups[&0].len(), 1);

        // The bus is usable again once the outer dispatch is over
        dispatcher
            .dispatch(&add_comment_payload("ADD_COMMENT", 0, "pending2"))
            .unwrap();
        assert_eq!(*results.borrow(), vec![true, true]);
    }

    #[test]
    fn unregistered_callbacks_are_not_called() {
        let dispatcher = Dispatcher::new();
        let calls = Rc::new(Cell::new(0));
        let tok = {
            let calls = calls.clone();
            dispatcher.register(move |_| calls.set(calls.get() + 1))
        };
        dispatcher.dispatch(&json!({})).unwrap();
        assert!(dispatcher.unregister(tok));
        assert!(!dispatcher.unregister(tok));
        dispatcher.dispatch(&json!({})).unwrap();
        assert_eq!(calls.get(), 1);
    }
}
