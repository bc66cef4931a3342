use std::{fs, io};
use std::path::{Path, PathBuf};
use std::fmt::Debug;

use crate::error::{Result, Chainable};
use crate::pipe::{Blob, Source};

pub trait Sink: Debug {
    fn write<B: Into<Blob>>(&self, value: B) -> Result<()> {
        self.write_blob(value.into())
    }

    fn write_blob(&self, blob: Blob) -> Result<()>;

    #[inline]
    fn write_from<S: Source>(&self, source: S) -> Result<()> {
        self.write(source.read()?)
    }
}

impl Sink for fs::File {
    fn write_blob(&self, blob: Blob) -> Result<()> {
        use io::Write;

        let mut file = io::BufWriter::new(self);
        Ok(file.write_all(blob.as_bytes())?)
    }
}

/// Writing to a path creates missing parent directories. Stages write into
/// output subtrees that `clean` removed moments earlier.
impl Sink for &Path {
    fn write_blob(&self, blob: Blob) -> Result<()> {
        if let Some(parent) = self.parent() {
            fs::create_dir_all(parent).chain_with(|| error! {
                "failed to create output directory",
                "directory" => parent.display()
            })?;
        }

        fs::File::create(self)
            .chain(error! {
                "failed to open/create file for writing",
                "file path" => self.display()
            })?
            .write(blob)
    }
}

impl Sink for PathBuf {
    fn write_blob(&self, blob: Blob) -> Result<()> {
        <&Path as Sink>::write_blob(&self.as_path(), blob)
    }
}

impl<T: Sink> Sink for &T {
    fn write_blob(&self, blob: Blob) -> Result<()> {
        <T as Sink>::write_blob(self, blob)
    }
}
