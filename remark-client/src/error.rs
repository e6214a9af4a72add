use crate::api::Error as ApiError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Dispatching from inside a dispatch callback is not supported")]
    ReentrantDispatch,

    #[error(transparent)]
    Api(#[from] ApiError),
}
