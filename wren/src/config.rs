use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use bellows::error::Result;
use bellows::pipe::{Format, Toml};
use bellows::font::face::Dedup;

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Source tree, relative to the project root.
    pub src: PathBuf,
    /// Output tree, relative to the project root.
    pub out: PathBuf,
    /// Address the dev server binds.
    pub serve: String,
    /// How the font-face generator collapses repeated basenames.
    pub dedup: Dedup,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            src: PathBuf::from("src"),
            out: PathBuf::from("dist"),
            serve: "127.0.0.1:4000".into(),
            dedup: Dedup::default(),
        }
    }
}

impl Settings {
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(crate::CONFIG_FILE);
        match path.exists() {
            true => Toml::read(path.as_path()),
            false => Ok(Settings::default()),
        }
    }
}
