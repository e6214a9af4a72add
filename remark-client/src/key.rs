use std::fmt;

use crate::api::{PostId, SiteId};

/// Lookup key shared by the comment collections and the error ledgers
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PostKey {
    pub site_id: SiteId,
    pub post_id: PostId,
}

pub fn key(site_id: SiteId, post_id: PostId) -> PostKey {
    PostKey { site_id, post_id }
}

impl fmt::Display for PostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.site_id, self.post_id)
    }
}

// Serialized as a string so that maps keyed by PostKey dump to JSON objects
impl serde::Serialize for PostKey {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}
