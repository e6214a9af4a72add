use std::fmt;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::{Comment, Error, PlaceholderId, PostId, RemoteError, SiteId};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ActionType {
    ReceivePostComments,
    ReceiveFeedPost,
    AddComment,
    ReplyToComment,
    ReceiveAddComment,
    ReceiveReplyToComment,
}

impl ActionType {
    pub const ALL: [ActionType; 6] = [
        ActionType::ReceivePostComments,
        ActionType::ReceiveFeedPost,
        ActionType::AddComment,
        ActionType::ReplyToComment,
        ActionType::ReceiveAddComment,
        ActionType::ReceiveReplyToComment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::ReceivePostComments => "RECEIVE_POST_COMMENTS",
            ActionType::ReceiveFeedPost => "RECEIVE_FEED_POST",
            ActionType::AddComment => "ADD_COMMENT",
            ActionType::ReplyToComment => "REPLY_TO_COMMENT",
            ActionType::ReceiveAddComment => "RECEIVE_ADD_COMMENT",
            ActionType::ReceiveReplyToComment => "RECEIVE_REPLY_TO_COMMENT",
        }
    }

    pub fn from_tag(tag: &str) -> Option<ActionType> {
        ActionType::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of fetching the comments of a post
#[derive(Clone, Debug, PartialEq)]
pub struct PostComments {
    pub site_id: SiteId,
    pub post_id: PostId,
    pub result: Result<Vec<Comment>, RemoteError>,
}

/// The parts of a reader feed post the comment store cares about
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeedPost {
    pub site_id: SiteId,
    pub post_id: PostId,

    /// `None` when the post carries no discussion block
    pub comment_count: Option<u64>,
}

/// A comment or reply the user just submitted
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewComment {
    pub site_id: SiteId,
    pub post_id: PostId,
    pub text: String,

    /// 0 for a top-level comment
    pub parent_id: u64,
    pub placeholder: PlaceholderId,
}

/// The server's answer to a [`NewComment`]
#[derive(Clone, Debug, PartialEq)]
pub struct NewCommentResponse {
    pub site_id: SiteId,
    pub post_id: PostId,
    pub placeholder: PlaceholderId,
    pub result: Result<Comment, RemoteError>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    ReceivePostComments(PostComments),
    ReceiveFeedPost(Result<FeedPost, RemoteError>),
    AddComment(NewComment),
    ReplyToComment(NewComment),
    ReceiveAddComment(NewCommentResponse),
    ReceiveReplyToComment(NewCommentResponse),
}

#[derive(Deserialize)]
struct PostCommentsWire {
    #[serde(rename = "siteId", default)]
    site_id: Option<SiteId>,
    #[serde(rename = "postId", default)]
    post_id: Option<PostId>,
    #[serde(default)]
    data: Option<CommentsWire>,
    #[serde(default)]
    error: Value,
}

#[derive(Deserialize)]
struct CommentsWire {
    #[serde(default)]
    comments: Value,
}

#[derive(Deserialize)]
struct FeedPostWire {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Value,
}

#[derive(Deserialize)]
struct FeedPostDataWire {
    #[serde(rename = "site_ID")]
    site_id: SiteId,
    #[serde(rename = "ID")]
    post_id: PostId,
    #[serde(default)]
    discussion: Option<DiscussionWire>,
}

#[derive(Deserialize)]
struct DiscussionWire {
    #[serde(default)]
    comment_count: Option<u64>,
}

#[derive(Deserialize)]
struct NewCommentWire {
    args: NewCommentArgsWire,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewCommentArgsWire {
    site_id: SiteId,
    post_id: PostId,
    #[serde(default)]
    comment_text: String,
    #[serde(default)]
    parent_comment_id: Option<u64>,
    comment_placeholder_id: PlaceholderId,
}

#[derive(Deserialize)]
struct ResponseWire {
    args: ResponseArgsWire,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseArgsWire {
    site_id: SiteId,
    post_id: PostId,
    comment_placeholder_id: PlaceholderId,
}

fn parse<'a, T: Deserialize<'a>>(tag: ActionType, v: &'a Value) -> Result<T, Error> {
    T::deserialize(v).map_err(|e| Error::invalid_payload(tag, e))
}

impl Action {
    /// Reads a dispatcher payload of the form `{"action": {"type": ..., ...}}`.
    ///
    /// Returns `Ok(None)` for action types the comment store does not handle.
    pub fn from_payload(payload: &Value) -> Result<Option<Action>, Error> {
        match payload.get("action") {
            None | Some(Value::Null) => Err(Error::MissingAction),
            Some(action) => Action::from_action(action),
        }
    }

    pub fn from_action(action: &Value) -> Result<Option<Action>, Error> {
        let tag = action
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or(Error::MissingType)?;
        let tag = match ActionType::from_tag(tag) {
            Some(tag) => tag,
            None => return Ok(None),
        };
        Ok(Some(match tag {
            ActionType::ReceivePostComments => {
                Action::ReceivePostComments(parse_post_comments(tag, action)?)
            }
            ActionType::ReceiveFeedPost => Action::ReceiveFeedPost(parse_feed_post(tag, action)?),
            ActionType::AddComment => Action::AddComment(parse_new_comment(tag, action)?),
            ActionType::ReplyToComment => Action::ReplyToComment(parse_new_comment(tag, action)?),
            ActionType::ReceiveAddComment => {
                Action::ReceiveAddComment(parse_response(tag, action)?)
            }
            ActionType::ReceiveReplyToComment => {
                Action::ReceiveReplyToComment(parse_response(tag, action)?)
            }
        }))
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            Action::ReceivePostComments(_) => ActionType::ReceivePostComments,
            Action::ReceiveFeedPost(_) => ActionType::ReceiveFeedPost,
            Action::AddComment(_) => ActionType::AddComment,
            Action::ReplyToComment(_) => ActionType::ReplyToComment,
            Action::ReceiveAddComment(_) => ActionType::ReceiveAddComment,
            Action::ReceiveReplyToComment(_) => ActionType::ReceiveReplyToComment,
        }
    }

    /// Builds the submission action for `c`, picking the reply variant when it has a parent
    pub fn new_comment(c: NewComment) -> Action {
        if c.parent_id > 0 {
            Action::ReplyToComment(c)
        } else {
            Action::AddComment(c)
        }
    }

    /// Inverse of [`Action::from_payload`]
    pub fn to_payload(&self) -> Value {
        json!({ "action": self.to_action() })
    }

    pub fn to_action(&self) -> Value {
        let tag = self.action_type().as_str();
        match self {
            Action::ReceivePostComments(p) => {
                let mut res = json!({
                    "type": tag,
                    "siteId": p.site_id,
                    "postId": p.post_id,
                });
                match &p.result {
                    Ok(comments) => res["data"] = json!({ "comments": comments }),
                    Err(e) => res["error"] = json!(e),
                }
                res
            }
            Action::ReceiveFeedPost(Ok(post)) => {
                let mut data = json!({
                    "site_ID": post.site_id,
                    "ID": post.post_id,
                });
                if let Some(count) = post.comment_count {
                    data["discussion"] = json!({ "comment_count": count });
                }
                json!({ "type": tag, "data": data })
            }
            Action::ReceiveFeedPost(Err(e)) => json!({ "type": tag, "error": e }),
            Action::AddComment(c) | Action::ReplyToComment(c) => json!({
                "type": tag,
                "args": {
                    "siteId": c.site_id,
                    "postId": c.post_id,
                    "commentText": c.text,
                    "parentCommentId": c.parent_id,
                    "commentPlaceholderId": c.placeholder,
                },
            }),
            Action::ReceiveAddComment(r) | Action::ReceiveReplyToComment(r) => {
                let mut res = json!({
                    "type": tag,
                    "args": {
                        "siteId": r.site_id,
                        "postId": r.post_id,
                        "commentPlaceholderId": r.placeholder,
                    },
                });
                match &r.result {
                    Ok(comment) => res["data"] = json!(comment),
                    Err(e) => res["error"] = json!(e),
                }
                res
            }
        }
    }
}

fn parse_post_comments(tag: ActionType, action: &Value) -> Result<PostComments, Error> {
    let wire: PostCommentsWire = parse(tag, action)?;
    let site_id = wire
        .site_id
        .filter(|s| s.0 != 0)
        .ok_or_else(|| Error::missing_field(tag, "siteId"))?;
    let post_id = wire
        .post_id
        .filter(|p| p.0 != 0)
        .ok_or_else(|| Error::missing_field(tag, "postId"))?;
    if let Some(e) = RemoteError::from_payload(&wire.error) {
        return Ok(PostComments {
            site_id,
            post_id,
            result: Err(e),
        });
    }
    let comments = match wire.data {
        Some(CommentsWire { comments }) if !comments.is_null() => comments,
        _ => return Err(Error::missing_field(tag, "data.comments")),
    };
    Ok(PostComments {
        site_id,
        post_id,
        result: Ok(parse(tag, &comments)?),
    })
}

fn parse_feed_post(
    tag: ActionType,
    action: &Value,
) -> Result<Result<FeedPost, RemoteError>, Error> {
    let wire: FeedPostWire = parse(tag, action)?;
    if let Some(e) = RemoteError::from_payload(&wire.error) {
        return Ok(Err(e));
    }
    if wire.data.is_null() {
        return Err(Error::missing_field(tag, "data"));
    }
    let data: FeedPostDataWire = parse(tag, &wire.data)?;
    Ok(Ok(FeedPost {
        site_id: data.site_id,
        post_id: data.post_id,
        comment_count: data.discussion.and_then(|d| d.comment_count),
    }))
}

fn parse_new_comment(tag: ActionType, action: &Value) -> Result<NewComment, Error> {
    let NewCommentWire { args } = parse(tag, action)?;
    Ok(NewComment {
        site_id: args.site_id,
        post_id: args.post_id,
        text: args.comment_text,
        parent_id: args.parent_comment_id.unwrap_or(0),
        placeholder: args.comment_placeholder_id,
    })
}

fn parse_response(tag: ActionType, action: &Value) -> Result<NewCommentResponse, Error> {
    let wire: ResponseWire = parse(tag, action)?;
    let result = match RemoteError::from_payload(&wire.error) {
        Some(e) => Err(e),
        None if wire.data.is_null() => return Err(Error::missing_field(tag, "data")),
        None => Ok(parse(tag, &wire.data)?),
    };
    Ok(NewCommentResponse {
        site_id: wire.args.site_id,
        post_id: wire.args.post_id,
        placeholder: wire.args.comment_placeholder_id,
        result,
    })
}
