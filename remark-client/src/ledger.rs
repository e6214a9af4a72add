use crate::api::{PlaceholderId, RemoteError, SubmissionError};

/// Failed submissions for one post, oldest first
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct ErrorLedger(pub Vec<SubmissionError>);

impl ErrorLedger {
    pub fn record(&mut self, placeholder: PlaceholderId, error: RemoteError) {
        self.0.push(SubmissionError { placeholder, error });
    }

    pub fn for_placeholder<'a>(
        &'a self,
        placeholder: &'a PlaceholderId,
    ) -> impl Iterator<Item = &'a SubmissionError> {
        self.0.iter().filter(move |e| e.placeholder == *placeholder)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
