//! Physical resources backing an application.
//!
//! The mapper only asks two questions of a resource root: is this path a
//! directory (directory redirect) and is it a file (welcome-file
//! resolution). The HTTP layer additionally asks where the file lives.

use std::fmt::Debug;
use std::path::{Component, Path, PathBuf};

/// Read-only view of an application's resources, addressed by request path.
pub trait ResourceRoot: Send + Sync + Debug {
    fn is_directory(&self, path: &str) -> bool;

    fn is_file(&self, path: &str) -> bool;

    /// Filesystem location for `path`, if the root is file backed.
    fn real_path(&self, _path: &str) -> Option<PathBuf> {
        None
    }
}

/// Resource root backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct FsResourceRoot {
    base: PathBuf,
}

impl FsResourceRoot {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Join a request path onto the base, refusing anything that climbs out of it.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let mut resolved = self.base.clone();
        for component in Path::new(path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(resolved)
    }
}

impl ResourceRoot for FsResourceRoot {
    fn is_directory(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|p| p.is_dir())
    }

    fn is_file(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|p| p.is_file())
    }

    fn real_path(&self, path: &str) -> Option<PathBuf> {
        self.resolve(path)
    }
}
