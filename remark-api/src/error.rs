use std::{collections::BTreeMap, fmt};

use serde_json::Value;

use crate::{ActionType, PlaceholderId};

/// Reasons an inbound payload could not be turned into an [`Action`](crate::Action)
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Payload has no action")]
    MissingAction,

    #[error("Action has no type tag")]
    MissingType,

    #[error("Invalid {tag} payload: {message}")]
    InvalidPayload { tag: ActionType, message: String },

    #[error("{tag} payload is missing {field}")]
    MissingField {
        tag: ActionType,
        field: &'static str,
    },
}

impl Error {
    pub fn invalid_payload(tag: ActionType, err: serde_json::Error) -> Error {
        Error::InvalidPayload {
            tag,
            message: err.to_string(),
        }
    }

    pub fn missing_field(tag: ActionType, field: &'static str) -> Error {
        Error::MissingField { tag, field }
    }
}

/// Error body returned by the remote API, e.g. `{"error": "comment_duplicate", "message": "..."}`
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct RemoteError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Every other member, kept as sent. Also holds `error` or `message` when
    /// they are not strings.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RemoteError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> RemoteError {
        RemoteError {
            error: Some(error.into()),
            message: Some(message.into()),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_message(message: impl Into<String>) -> RemoteError {
        RemoteError {
            error: None,
            message: Some(message.into()),
            extra: BTreeMap::new(),
        }
    }

    /// Reads the `error` member of an inbound payload. `null` and `false` mean
    /// no error; any other value is one, with as much detail as can be found.
    pub fn from_payload(v: &Value) -> Option<RemoteError> {
        match v {
            Value::Null | Value::Bool(false) => None,
            Value::String(msg) => Some(RemoteError::with_message(msg.clone())),
            Value::Object(obj) => {
                let mut extra = obj.clone().into_iter().collect::<BTreeMap<_, _>>();
                Some(RemoteError {
                    error: take_string(&mut extra, "error"),
                    message: take_string(&mut extra, "message"),
                    extra,
                })
            }
            _ => Some(RemoteError::default()),
        }
    }
}

fn take_string(fields: &mut BTreeMap<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(_)) => match fields.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, &self.message) {
            (Some(e), Some(m)) => write!(f, "{e}: {m}"),
            (Some(e), None) => f.write_str(e),
            (None, Some(m)) => f.write_str(m),
            (None, None) => match self.extra.get("error") {
                Some(e) => write!(f, "error {e}"),
                None => f.write_str("unknown error"),
            },
        }
    }
}

/// A failed comment submission, as kept in a post's error ledger
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SubmissionError {
    #[serde(rename = "ID")]
    pub placeholder: PlaceholderId,

    #[serde(flatten)]
    pub error: RemoteError,
}
