use std::fs::File;
use std::io::*;
use std::path::{Path, PathBuf};

use crate::*;

/// A VFS which is backed by a given root directory.
///
/// This handles the rather tricky path cases around Windows and Linux differences, and makes it so that you can and
/// should use keys like `/b/c` (behavior with `\` is undefined).  Additionally, it makes a best effort to disallow a
/// user to use relative paths to escape the root directory, primarily as a measure to detect bugs.
#[derive(Debug)]
pub struct FilesystemVfs {
    root_path: PathBuf,
}

fn conv_path(path: impl AsRef<Path>) -> Result<relative_path::RelativePathBuf> {
    relative_path::RelativePathBuf::from_path(path)
        .map_err(|_| Error::new(ErrorKind::Other, "Invalid path"))
}

impl FilesystemVfs {
    pub fn new(root_path: &Path) -> FilesystemVfs {
        FilesystemVfs {
            root_path: root_path.to_path_buf(),
        }
    }

    /// Open a file under the root, refusing paths which resolve outside of it.
    pub fn open_file(&self, path: &Path) -> Result<File> {
        // Go via `RelativePathBuf` so `..` segments are resolved logically rather than by the OS.
        let absolute = conv_path(path)?.to_logical_path(&self.root_path);
        if !absolute.starts_with(&self.root_path) {
            return Err(Error::new(
                ErrorKind::Other,
                "path is outside the vfs root directory",
            ));
        }
        File::open(absolute)
    }
}

impl Vfs for FilesystemVfs {
    type Reader = File;

    fn open(&self, key: &str) -> Result<File> {
        // Keys are rooted at the VFS root, so a leading `/` means the root and not the filesystem's.
        self.open_file(Path::new(key.trim_start_matches('/')))
    }
}
