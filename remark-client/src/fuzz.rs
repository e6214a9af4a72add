#![cfg(test)]

use std::{cell::Cell, rc::Rc};

use bolero::generator::{bolero_generator, TypeGenerator};
use serde_json::json;

use crate::{
    api::{
        Action, Comment, CommentId, CommentState, FeedPost, NewComment, NewCommentResponse,
        PlaceholderId, PostComments, PostId, RemoteError, SiteId,
    },
    key, CommentStore, StoreEvent,
};

const SITE: SiteId = SiteId(1);

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum Op {
    Add { post: u8, reply_to: u8 },
    Confirm { pending: u8, approved: bool },
    Fail { pending: u8 },
    Fetch { post: u8, len: u8 },
    Count { post: u8, count: u8 },
}

fn post(p: u8) -> PostId {
    PostId(u64::from(p % 3) + 1)
}

fn server_comment(id: u64, parent_id: u64, approved: bool) -> Comment {
    serde_json::from_value(json!({
        "ID": id,
        "parent": { "ID": parent_id },
        "status": if approved { "approved" } else { "unapproved" },
        "date": "2015-06-01T10:00:00Z",
    }))
    .expect("building server comment")
}

fn comments(store: &CommentStore, post_id: PostId) -> Vec<Comment> {
    store
        .all()
        .get(&key(SITE, post_id))
        .map(|c| c.comments().to_vec())
        .unwrap_or_default()
}

fn find(store: &CommentStore, post_id: PostId, placeholder: &PlaceholderId) -> Option<Comment> {
    comments(store, post_id)
        .into_iter()
        .find(|c| c.has_placeholder(placeholder))
}

fn run(ops: Vec<Op>) {
    let store = CommentStore::new(|_: SiteId, _: PostId| ());
    let changes = Rc::new(Cell::new(0usize));
    {
        let changes = changes.clone();
        store.subscribe(move |e| {
            if *e == StoreEvent::Change {
                changes.set(changes.get() + 1);
            }
        });
    }
    let mut issued: Vec<(PostId, PlaceholderId, u64)> = Vec::new();
    let mut next_server_id = 1000;

    for op in ops {
        match op {
            Op::Add { post: p, reply_to } => {
                let placeholder = PlaceholderId::new(format!("pending{}", issued.len() + 1));
                let parent_id = u64::from(reply_to % 4);
                store.handle(Action::new_comment(NewComment {
                    site_id: SITE,
                    post_id: post(p),
                    text: String::from("hi"),
                    parent_id,
                    placeholder: placeholder.clone(),
                }));
                let comments = comments(&store, post(p));
                let pos = comments
                    .iter()
                    .position(|c| c.has_placeholder(&placeholder))
                    .expect("pending comment was not inserted");
                if parent_id > 0 {
                    assert_eq!(pos, comments.len() - 1);
                } else {
                    assert_eq!(pos, 0);
                }
                assert!(comments
                    .iter()
                    .all(|c| c.state != Some(CommentState::Error)));
                assert_eq!(store.get_errors_for_post(SITE, post(p)), None);
                issued.push((post(p), placeholder, parent_id));
            }
            Op::Confirm { pending, approved } => {
                if issued.is_empty() {
                    continue;
                }
                let (post_id, placeholder, parent_id) =
                    issued[usize::from(pending) % issued.len()].clone();
                let was_pending = find(&store, post_id, &placeholder)
                    .map(|c| c.state == Some(CommentState::Pending))
                    .unwrap_or(false);
                let count_before = store.get_comment_count_for_post(SITE, post_id);
                let changes_before = changes.get();
                next_server_id += 1;
                store.handle(Action::ReceiveAddComment(NewCommentResponse {
                    site_id: SITE,
                    post_id,
                    placeholder: placeholder.clone(),
                    result: Ok(server_comment(next_server_id, parent_id, approved)),
                }));

                let count_after = store.get_comment_count_for_post(SITE, post_id);
                if was_pending {
                    assert_eq!(count_after, count_before + u64::from(approved));
                    assert_eq!(changes.get(), changes_before + 1);
                    let comments = comments(&store, post_id);
                    let pos = comments
                        .iter()
                        .position(|c| c.id == CommentId::Server(next_server_id))
                        .expect("confirmed comment disappeared");
                    assert_eq!(comments[pos].state, Some(CommentState::Confirmed));
                    if parent_id > 0 {
                        assert_eq!(pos, comments.len() - 1);
                    }
                    assert!(find(&store, post_id, &placeholder).is_none());
                } else {
                    assert_eq!(count_after, count_before);
                    assert_eq!(changes.get(), changes_before);
                }
            }
            Op::Fail { pending } => {
                if issued.is_empty() {
                    continue;
                }
                let (post_id, placeholder, parent_id) =
                    issued[usize::from(pending) % issued.len()].clone();
                let before = find(&store, post_id, &placeholder);
                let errors_before = store
                    .get_errors_for_post(SITE, post_id)
                    .map(|e| e.len())
                    .unwrap_or(0);
                let changes_before = changes.get();
                store.handle(Action::ReceiveAddComment(NewCommentResponse {
                    site_id: SITE,
                    post_id,
                    placeholder: placeholder.clone(),
                    result: Err(RemoteError::with_message("nope")),
                }));

                assert_eq!(changes.get(), changes_before + 1);
                let errors = store
                    .get_errors_for_post(SITE, post_id)
                    .expect("error was not recorded");
                assert_eq!(errors.len(), errors_before + 1);
                assert_eq!(errors[errors.len() - 1].placeholder, placeholder);
                match before.map(|c| c.state) {
                    Some(Some(CommentState::Pending)) => {
                        let comments = comments(&store, post_id);
                        let pos = comments
                            .iter()
                            .position(|c| c.has_placeholder(&placeholder))
                            .expect("failed comment disappeared");
                        assert_eq!(comments[pos].state, Some(CommentState::Error));
                        if parent_id > 0 {
                            assert_eq!(pos, comments.len() - 1);
                        }
                    }
                    Some(state) => {
                        let after = find(&store, post_id, &placeholder).map(|c| c.state);
                        assert_eq!(after, Some(state));
                    }
                    None => assert!(find(&store, post_id, &placeholder).is_none()),
                }
            }
            Op::Fetch { post: p, len } => {
                let fetched = (0..u64::from(len % 4))
                    .map(|i| server_comment(i + 1, 0, true))
                    .collect::<Vec<_>>();
                let action = Action::ReceivePostComments(PostComments {
                    site_id: SITE,
                    post_id: post(p),
                    result: Ok(fetched.clone()),
                });
                let count_before = store.get_comment_count_for_post(SITE, post(p));
                store.handle(action.clone());
                let after_first = changes.get();
                store.handle(action);
                assert_eq!(changes.get(), after_first);
                assert_eq!(comments(&store, post(p)), fetched);
                assert_eq!(store.get_comment_count_for_post(SITE, post(p)), count_before);
            }
            Op::Count { post: p, count } => {
                let comments_before = comments(&store, post(p));
                store.handle(Action::ReceiveFeedPost(Ok(FeedPost {
                    site_id: SITE,
                    post_id: post(p),
                    comment_count: Some(u64::from(count)),
                })));
                assert_eq!(
                    store.get_comment_count_for_post(SITE, post(p)),
                    u64::from(count)
                );
                assert_eq!(comments(&store, post(p)), comments_before);
            }
        }
    }
}

#[test]
fn reconciliation_invariants() {
    bolero::check!()
        .with_type::<Vec<Op>>()
        .cloned()
        .for_each(run)
}
