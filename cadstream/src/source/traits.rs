//! Raw file access for a model.

use bytes::Bytes;

use crate::loading::{BoxFuture, FetchError};

/// Location that serves a model's files by name.
///
/// Names are relative to the model root, e.g. `scene.json` or
/// `mesh_12.ctm`.
pub trait ModelSource: Send + Sync {
    fn fetch_file<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

impl<S: ModelSource + ?Sized> ModelSource for std::sync::Arc<S> {
    fn fetch_file<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        (**self).fetch_file(name)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<S: ModelSource + ?Sized> ModelSource for Box<S> {
    fn fetch_file<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        (**self).fetch_file(name)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
