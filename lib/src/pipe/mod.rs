mod source;
mod sink;
mod mapper;

pub use source::*;
pub use sink::*;
pub use mapper::*;

use crate::error::Result;

/// An in-flight stage payload: the contents of one asset on its way from a
/// [`Source`] through a [`Mapper`] into a [`Sink`].
#[derive(Debug, Clone)]
pub enum Blob {
    Text(String),
    Bytes(Vec<u8>),
}

impl Blob {
    /// Classifies raw bytes: UTF-8 input becomes `Text`, anything else
    /// stays `Bytes`.
    pub fn from_utf8(bytes: Vec<u8>) -> Blob {
        String::from_utf8(bytes)
            .map(Blob::Text)
            .unwrap_or_else(|e| Blob::Bytes(e.into_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Blob::Text(s) => s.as_bytes(),
            Blob::Bytes(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Blob::Text(s) => s.into_bytes(),
            Blob::Bytes(b) => b,
        }
    }

    pub fn into_text(self) -> Result<String> {
        match self {
            Blob::Text(s) => Ok(s),
            Blob::Bytes(_) => err!("expected text payload, found binary data"),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<String> for Blob {
    fn from(value: String) -> Self {
        Blob::Text(value)
    }
}

impl From<&str> for Blob {
    fn from(value: &str) -> Self {
        Blob::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Blob {
    fn from(value: Vec<u8>) -> Self {
        Blob::Bytes(value)
    }
}
