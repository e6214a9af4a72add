mod cache;
pub use cache::CommentCache;

mod collection;
pub use collection::CommentCollection;

mod dispatch;
pub use dispatch::{register_comment_store, DispatchToken, Dispatcher};

mod error;
pub use error::Error;

mod fetch;
pub use fetch::{FetchQueue, Fetcher};

mod key;
pub use key::{key, PostKey};

mod ledger;
pub use ledger::ErrorLedger;

mod sanitize;
pub use sanitize::{Sanitizer, StripHtml};

mod store;
pub use store::{CommentStore, StoreEvent, SubscriptionId};

mod fuzz;

pub mod api {
    pub use remark_api::*;
}
