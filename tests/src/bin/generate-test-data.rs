use std::{
    collections::BTreeMap,
    io::{BufWriter, Write},
};

use anyhow::Context;
use chrono::{Duration, Utc};
use rand::{seq::SliceRandom, Rng};
use remark_api::{
    Action, Comment, CommentId, FeedPost, NewComment, NewCommentResponse, ParentRef,
    PlaceholderId, PostComments, PostId, RemoteError, SiteId, COMMENT_STATUS_APPROVED,
    COMMENT_STATUS_UNAPPROVED,
};

const NUM_SITES: u64 = 2;
const NUM_POSTS_PER_SITE: u64 = 4;

const NUM_COMMENTS_PER_POST: usize = 12;
const NUM_SUBMISSIONS: usize = 40;
const COMMENT_WORD_COUNT: usize = 15;

const REPLY_PROBABILITY: f64 = 0.4;
const FAILURE_PROBABILITY: f64 = 0.15;
const MODERATION_PROBABILITY: f64 = 0.2;

const REMOTE_ERRORS: &[(&str, &str)] = &[
    ("comment_duplicate", "Duplicate comment detected"),
    ("comment_blocked", "Sorry, this comment could not be posted"),
    ("unauthorized", "You need to log in to comment"),
];

fn gen_comment_text(rng: &mut impl Rng) -> String {
    lipsum::lipsum_words(rng.gen_range(1..=COMMENT_WORD_COUNT))
}

fn gen_comment(
    rng: &mut impl Rng,
    id: u64,
    text: &str,
    parent_id: u64,
    age: Duration,
) -> Comment {
    let status = match rng.gen_bool(MODERATION_PROBABILITY) {
        true => COMMENT_STATUS_UNAPPROVED,
        false => COMMENT_STATUS_APPROVED,
    };
    Comment {
        id: CommentId::Server(id),
        content: format!("<p>{text}</p>\n"),
        parent: (parent_id > 0).then_some(ParentRef { id: parent_id }),
        state: None,
        status: Some(String::from(status)),
        date: Some(Utc::now() - age),
        kind: String::from("comment"),
        extra: BTreeMap::new(),
    }
}

fn main() -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();
    let mut actions = Vec::new();
    let mut next_id = 1;

    // Generate the initial state of every post, as the api would return it
    let mut known = Vec::new();
    for site in 1..=NUM_SITES {
        for post in 1..=NUM_POSTS_PER_SITE {
            let (site_id, post_id) = (SiteId(site), PostId(site * 100 + post));
            let mut comments: Vec<Comment> = Vec::new();
            for i in 0..NUM_COMMENTS_PER_POST {
                let parent_id = match comments.choose(&mut rng) {
                    Some(Comment {
                        id: CommentId::Server(p),
                        ..
                    }) if rng.gen_bool(REPLY_PROBABILITY) => *p,
                    _ => 0,
                };
                let age = Duration::minutes((NUM_COMMENTS_PER_POST - i) as i64);
                let text = gen_comment_text(&mut rng);
                comments.push(gen_comment(&mut rng, next_id, &text, parent_id, age));
                next_id += 1;
            }
            let count = comments.iter().filter(|c| c.is_approved()).count() as u64;
            comments.reverse();
            actions.push(Action::ReceiveFeedPost(Ok(FeedPost {
                site_id,
                post_id,
                comment_count: Some(count),
            })));
            actions.push(Action::ReceivePostComments(PostComments {
                site_id,
                post_id,
                result: Ok(comments.clone()),
            }));
            known.push((site_id, post_id, comments));
        }
    }

    // Then submit comments, each followed by the api's answer
    for _ in 0..NUM_SUBMISSIONS {
        let (site_id, post_id, comments) = known
            .choose(&mut rng)
            .context("generating at least one post")?;
        let parent_id = match comments.choose(&mut rng) {
            Some(Comment {
                id: CommentId::Server(p),
                ..
            }) if rng.gen_bool(REPLY_PROBABILITY) => *p,
            _ => 0,
        };
        let placeholder = PlaceholderId::next();
        let text = gen_comment_text(&mut rng);
        actions.push(Action::new_comment(NewComment {
            site_id: *site_id,
            post_id: *post_id,
            text: text.clone(),
            parent_id,
            placeholder: placeholder.clone(),
        }));
        let result = match rng.gen_bool(FAILURE_PROBABILITY) {
            true => {
                let (error, message) = REMOTE_ERRORS
                    .choose(&mut rng)
                    .context("picking a remote error")?;
                Err(RemoteError::new(*error, *message))
            }
            false => {
                let c = gen_comment(&mut rng, next_id, &text, parent_id, Duration::zero());
                next_id += 1;
                Ok(c)
            }
        };
        let response = NewCommentResponse {
            site_id: *site_id,
            post_id: *post_id,
            placeholder,
            result,
        };
        actions.push(match parent_id {
            0 => Action::ReceiveAddComment(response),
            _ => Action::ReceiveReplyToComment(response),
        });
    }

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for a in actions {
        serde_json::to_writer(&mut out, &a.to_payload()).context("serializing action")?;
        writeln!(out).context("writing action log")?;
    }
    out.flush().context("flushing action log")?;
    Ok(())
}
