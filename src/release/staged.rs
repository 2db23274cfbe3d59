// ABOUTME: Release struct parameterized by its build state.
// ABOUTME: The state marker decides which transitions are available.

use std::marker::PhantomData;

use crate::types::ReleaseId;

/// A release directory on one host, parameterized by how far it has been built.
#[derive(Debug)]
pub struct Release<S> {
    pub(crate) id: ReleaseId,
    pub(crate) dir: String,
    pub(crate) _state: PhantomData<S>,
}

impl<S> Release<S> {
    pub fn id(&self) -> &ReleaseId {
        &self.id
    }

    /// Absolute path of the release directory.
    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub(crate) fn transition<T>(self) -> Release<T> {
        Release {
            id: self.id,
            dir: self.dir,
            _state: PhantomData,
        }
    }
}
