use std::sync::{Arc, Mutex, PoisonError};

/// Latest known document text, shared between the editing surface and the
/// session loop.
///
/// Writes land immediately, so a snapshot requested right after an edit
/// always carries that edit. `None` means this participant has not seen any
/// content yet.
#[derive(Clone, Debug, Default)]
pub struct DocumentRef {
    inner: Arc<Mutex<Option<String>>>,
}

impl DocumentRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, text: impl Into<String>) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.into());
    }
}
