use std::collections::BTreeMap;

use crate::api::{Comment, PlaceholderId};

/// Comments of one post, in presentation order: newest top-level comment first,
/// recently active replies at the tail.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct CommentCollection {
    /// Number of published comments according to the server. This is not the
    /// length of `comments`: pending and held-for-moderation comments do not count.
    pub count: u64,

    /// `None` while only the count is known, e.g. from a feed post
    pub comments: Option<Vec<Comment>>,
}

impl CommentCollection {
    pub fn empty() -> CommentCollection {
        CommentCollection {
            count: 0,
            comments: Some(Vec::new()),
        }
    }

    pub fn comments(&self) -> &[Comment] {
        self.comments.as_deref().unwrap_or(&[])
    }

    pub fn comments_mut(&mut self) -> &mut Vec<Comment> {
        self.comments.get_or_insert_with(Vec::new)
    }

    pub fn position_of(&self, placeholder: &PlaceholderId) -> Option<usize> {
        self.comments()
            .iter()
            .position(|c| c.has_placeholder(placeholder))
    }

    /// Groups the comments by parent id (0 for top-level comments). Inside a
    /// group comments come in reverse storage order, so that a thread reads
    /// oldest first.
    pub fn by_parent(&self) -> Option<BTreeMap<u64, Vec<Comment>>> {
        let comments = self.comments.as_ref()?;
        let mut res = BTreeMap::<u64, Vec<Comment>>::new();
        for c in comments {
            res.entry(c.parent_id()).or_default().push(c.clone());
        }
        for group in res.values_mut() {
            group.reverse();
        }
        Some(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CommentId, Time};

    fn comment(id: u64, parent_id: u64) -> Comment {
        let mut c = Comment::pending(
            PlaceholderId::new("x"),
            String::new(),
            parent_id,
            Time::default(),
        );
        c.id = CommentId::Server(id);
        c
    }

    fn ids(v: &[Comment]) -> Vec<CommentId> {
        v.iter().map(|c| c.id.clone()).collect()
    }

    #[test]
    fn groups_by_parent_oldest_first() {
        let coll = CommentCollection {
            count: 4,
            comments: Some(vec![comment(4, 0), comment(3, 0), comment(5, 3), comment(6, 3)]),
        };
        let groups = coll.by_parent().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(ids(&groups[&0]), vec![CommentId::Server(3), CommentId::Server(4)]);
        assert_eq!(ids(&groups[&3]), vec![CommentId::Server(6), CommentId::Server(5)]);
    }

    #[test]
    fn count_only_collection_has_no_groups() {
        let coll = CommentCollection {
            count: 12,
            comments: None,
        };
        assert_eq!(coll.by_parent(), None);
        assert!(coll.comments().is_empty());
    }
}
