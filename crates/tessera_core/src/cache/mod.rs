//! Object cache: storages, repositories and the strategies they use.

mod lru;
mod repository;
mod storage;
mod strategy;

pub use repository::Repository;
pub(crate) use storage::SharedCache;
pub use storage::Storage;
pub use strategy::{Eraser, KeyEraser, KeyLoader, Loader, ObjectRecorder, Recorder};
