//! Pluggable I/O abstraction.
//!
//! The original library threads a `struct mf_userio` of five function
//! pointers (`open`/`close`/`read`/`write`/`seek`) through every codec so a
//! caller can substitute a virtual filesystem. In Rust the `read`/`write`/
//! `seek` trio is already a trait (`std::io::{Read, Write, Seek}`), and
//! `close` is just `Drop` on the handle — only `open` (resolving a path,
//! possibly a sibling asset path, to a handle) needs to be pluggable.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// A handle returned by an [`IoProvider`]. Readers only need `Read + Seek`;
/// writers only need `Write`; most real handles (files) support both, so
/// the trait requires all three and codecs use whichever half they need.
pub trait MeshIo: Read + Write + Seek {}
impl<T: Read + Write + Seek> MeshIo for T {}

/// Resolves a path to an I/O handle. Implementations own how "open" maps
/// to bytes (a real filesystem, an in-memory archive, a network fetch).
pub trait IoProvider {
    type Handle: MeshIo;

    fn open(&self, path: &str, mode: OpenMode) -> io::Result<Self::Handle>;
}

/// Default provider backed by `std::fs::File`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileIoProvider;

impl IoProvider for FileIoProvider {
    type Handle = File;

    fn open(&self, path: &str, mode: OpenMode) -> io::Result<File> {
        match mode {
            OpenMode::Read => File::open(Path::new(path)),
            OpenMode::Write => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(Path::new(path)),
        }
    }
}

/// Splits `path` into `(dirname, filename)`, matching the original's
/// handling of `mf->dirname` (empty dirname when there's no separator).
pub fn split_dirname(path: &str) -> (&str, &str) {
    match path.rfind(['/', '\\']) {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn split_dirname_with_separator() {
        assert_eq!(split_dirname("models/cube.obj"), ("models", "cube.obj"));
    }

    #[test]
    fn split_dirname_without_separator() {
        assert_eq!(split_dirname("cube.obj"), ("", "cube.obj"));
    }
}
