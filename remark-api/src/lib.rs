use chrono::Utc;
use std::fmt;

pub type Time = chrono::DateTime<Utc>;

mod action;
pub use action::{
    Action, ActionType, FeedPost, NewComment, NewCommentResponse, PostComments,
};

mod comment;
pub use comment::{
    Comment, CommentId, CommentState, ParentRef, PlaceholderId, COMMENT_STATUS_APPROVED,
    COMMENT_STATUS_UNAPPROVED,
};

mod error;
pub use error::{Error, RemoteError, SubmissionError};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct SiteId(pub u64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
