use crate::error::{ErrorDetail, Result};
use crate::pipe::{Blob, Source, Sink};

/// One asset transformation: scss to css, ttf to woff, svg minification,
/// and so on. Stages are mappers wired between a [`Source`] and a [`Sink`].
pub trait Mapper {
    fn map<I: Source>(&self, input: I) -> Result<Blob>;

    fn map_copy<I: Source, O: Sink>(&self, input: I, output: O) -> Result<()> {
        output.write(self.map(input)?)
    }
}

/// A self-describing data format that deserializes into fully typed values
/// via serde. Used for configuration files.
pub trait Format: Sized {
    type Error: serde::de::Error + ErrorDetail + 'static;

    fn from_str<T: serde::de::DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    fn read<I: Source, T: serde::de::DeserializeOwned>(input: I) -> Result<T> {
        let input = input.read_text()?;
        Ok(Self::from_str(&input)?)
    }
}

macro_rules! impl_format {
    ($name:ident : $func:expr, $E:ty) => (
        pub struct $name;

        impl Format for $name {
            type Error = $E;

            fn from_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }
        }
    );
}

impl_format!(Toml: toml::from_str, toml::de::Error);
impl_format!(Json: serde_json::from_str, serde_json::error::Error);
