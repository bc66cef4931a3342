use std::{fs, io};
use std::path::Path;
use std::fmt::Debug;

use crate::error::{Result, Chainable};
use crate::fstree::Entry;
use crate::pipe::{Blob, Sink};

pub trait Source: Debug {
    fn read(self) -> Result<Blob>;

    /// The filesystem path backing this source, if there is one. Mappers
    /// that can work directly off a path (say, an scss compiler resolving
    /// `@use`) prefer it over the in-memory payload.
    fn path(&self) -> Option<&Path> {
        None
    }

    fn read_text(self) -> Result<String> where Self: Sized {
        let path = self.path().map(|p| p.display().to_string());
        self.read()?.into_text().chain_with(|| error! {
            "source did not contain valid UTF-8",
            "path" => path.unwrap_or_else(|| "<in-memory>".into()),
        })
    }

    #[inline]
    fn read_to<S: Sink>(self, sink: S) -> Result<()> where Self: Sized {
        sink.write(self.read()?)
    }
}

impl Source for Blob {
    fn read(self) -> Result<Blob> {
        Ok(self)
    }
}

impl Source for String {
    fn read(self) -> Result<Blob> {
        Ok(Blob::Text(self))
    }
}

impl Source for &str {
    fn read(self) -> Result<Blob> {
        Ok(Blob::Text(self.to_string()))
    }
}

impl Source for &fs::File {
    fn read(self) -> Result<Blob> {
        use io::Read;

        let mut data = Vec::new();
        let mut file = io::BufReader::new(self);
        file.read_to_end(&mut data)?;
        Ok(Blob::from_utf8(data))
    }
}

impl Source for &Path {
    fn read(self) -> Result<Blob> {
        let file = fs::File::open(self).chain(error! {
            "failed to open file for reading",
            "file path" => self.display()
        })?;

        (&file).read()
    }

    fn path(&self) -> Option<&Path> {
        Some(self)
    }
}

impl Source for &Entry {
    fn read(self) -> Result<Blob> {
        self.path.as_ref().read()
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
