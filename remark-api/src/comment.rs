use std::{
    collections::BTreeMap,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Deserializer};

use crate::Time;

pub const COMMENT_STATUS_APPROVED: &str = "approved";
pub const COMMENT_STATUS_UNAPPROVED: &str = "unapproved";

static NEXT_PLACEHOLDER: AtomicU64 = AtomicU64::new(1);

/// Temporary identifier of a comment the server has not acknowledged yet
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct PlaceholderId(pub String);

impl PlaceholderId {
    pub fn new(id: impl Into<String>) -> PlaceholderId {
        PlaceholderId(id.into())
    }

    /// Returns a process-unique placeholder, `pending1`, `pending2` and so on
    pub fn next() -> PlaceholderId {
        let n = NEXT_PLACEHOLDER.fetch_add(1, Ordering::Relaxed);
        PlaceholderId(format!("pending{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum CommentId {
    Server(u64),
    Placeholder(PlaceholderId),
}

impl From<u64> for CommentId {
    fn from(id: u64) -> CommentId {
        CommentId::Server(id)
    }
}

impl From<PlaceholderId> for CommentId {
    fn from(id: PlaceholderId) -> CommentId {
        CommentId::Placeholder(id)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentId::Server(id) => id.fmt(f),
            CommentId::Placeholder(id) => id.fmt(f),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ParentRef {
    #[serde(rename = "ID", default)]
    pub id: u64,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentState {
    /// Inserted locally, waiting for the server
    Pending,
    Confirmed,
    Error,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    #[serde(rename = "ID")]
    pub id: CommentId,

    #[serde(default)]
    pub content: String,

    /// `None` for top-level comments; the server sends `false` for those
    #[serde(
        default,
        deserialize_with = "deserialize_parent",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent: Option<ParentRef>,

    /// Only set on comments that went through the optimistic-write path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<CommentState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Not every answer carries it; confirmations are often just `ID` and `status`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Time>,

    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,

    /// Everything else the server sent (author, URL, ...), kept as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_kind() -> String {
    String::from("comment")
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawParent {
    Ref(ParentRef),
    Id(u64),
    Flag(bool),
}

fn deserialize_parent<'de, D>(d: D) -> Result<Option<ParentRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawParent>::deserialize(d)? {
        Some(RawParent::Ref(p)) => Some(p),
        Some(RawParent::Id(id)) => Some(ParentRef { id }),
        Some(RawParent::Flag(_)) | None => None,
    })
}

impl Comment {
    /// Builds the optimistic stand-in for a comment the user just submitted
    pub fn pending(id: PlaceholderId, content: String, parent_id: u64, date: Time) -> Comment {
        Comment {
            id: CommentId::Placeholder(id),
            content,
            parent: Some(ParentRef { id: parent_id }),
            state: Some(CommentState::Pending),
            status: None,
            date: Some(date),
            kind: default_kind(),
            extra: BTreeMap::new(),
        }
    }

    pub fn parent_id(&self) -> u64 {
        self.parent.map(|p| p.id).unwrap_or(0)
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id() > 0
    }

    pub fn is_approved(&self) -> bool {
        self.status.as_deref() == Some(COMMENT_STATUS_APPROVED)
    }

    pub fn has_placeholder(&self, placeholder: &PlaceholderId) -> bool {
        matches!(&self.id, CommentId::Placeholder(p) if p == placeholder)
    }
}
