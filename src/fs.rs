//! Filesystem probing, abstracted so the resolver and tests can run against
//! an in-memory filesystem.

use std::time::SystemTime;

/// MTime info gathered for a file.  This also models "file is absent".
/// It's not using an Option<> just because it makes the code using it easier
/// to follow.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MTime {
    Missing,
    Stamp(SystemTime),
}

impl MTime {
    pub fn exists(&self) -> bool {
        *self != MTime::Missing
    }
}

pub trait FileSystem: Sync {
    fn read(&self, path: &str) -> std::io::Result<Vec<u8>>;
    /// stat() an on-disk path.  Failures to stat are reported as Missing, so
    /// that staleness is always decidable.
    fn stat(&self, path: &str) -> MTime;
}

#[derive(Default)]
pub struct RealFileSystem {}
impl RealFileSystem {
    pub fn new() -> Self {
        RealFileSystem {}
    }
}

impl FileSystem for RealFileSystem {
    fn read(&self, path: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn stat(&self, path: &str) -> MTime {
        match std::fs::metadata(path).and_then(|meta| meta.modified()) {
            Ok(t) => MTime::Stamp(t),
            Err(_) => MTime::Missing,
        }
    }
}
