//! Derives `@font-face` mixin directives from the converted font files
//! sitting in the output font directory.
//!
//! Font files encode their variant in the basename: hyphen-separated
//! `Family-Weight[-Style]` segments, e.g. `Roboto-Bold.woff2` or
//! `Inter-Light-italic.woff`. The weight segment is a keyword looked up in
//! a fixed table; a file without a recognizable weight is an error rather
//! than a silently broken declaration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use rustc_hash::FxHashSet;

use crate::error::{Result, Chainable};

/// Keyword-to-numeric-weight table. Lookup is case-insensitive.
pub const WEIGHTS: &[(&str, u16)] = &[
    ("thin", 100),
    ("extralight", 200),
    ("light", 300),
    ("normal", 400),
    ("regular", 400),
    ("medium", 500),
    ("semibold", 600),
    ("bold", 700),
    ("extrabold", 800),
    ("black", 900),
];

pub fn weight_value(keyword: &str) -> Option<u16> {
    WEIGHTS.iter()
        .find(|(word, _)| keyword.eq_ignore_ascii_case(word))
        .map(|&(_, value)| value)
}

/// How repeated basenames in the directory listing are collapsed.
///
/// `Adjacent` skips a directive only when the previous listing entry had
/// the same basename: exactly enough to fold a `.woff`/`.woff2` pair that
/// lists together, while knowingly emitting duplicates when equal
/// basenames appear apart. `Global` collapses by distinct basename across
/// the whole listing.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dedup {
    #[default]
    Adjacent,
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFace {
    pub family: String,
    pub weight: u16,
    pub style: String,
    pub basename: String,
}

impl FontFace {
    /// Parses `Family-Weight[-Style]` out of a font file basename.
    pub fn parse(basename: &str) -> Result<Self> {
        let mut segments = basename.split('-');
        let family = segments.next().filter(|s| !s.is_empty()).ok_or_else(|| error! {
            "font basename has no family segment",
            "basename" => basename,
        })?;

        let keyword = segments.next().ok_or_else(|| error! {
            "font basename has no weight segment",
            "basename" => basename,
            "expected form" => "Family-Weight[-Style].ext, e.g. Roboto-Regular.woff",
        })?;

        let weight = weight_value(keyword).ok_or_else(|| error! {
            "unrecognized font weight keyword",
            "keyword" => keyword,
            "basename" => basename,
            "known keywords" => WEIGHTS.iter().map(|&(w, _)| w).collect::<Vec<_>>().join(", "),
        })?;

        let style = segments.next().unwrap_or("normal");
        Ok(FontFace {
            family: family.to_string(),
            weight,
            style: style.to_string(),
            basename: basename.to_string(),
        })
    }

    /// The generated stylesheet line. The scss side defines the `font`
    /// mixin; lines terminate with CRLF.
    pub fn mixin_directive(&self) -> String {
        format!(
            "@include font(\"{}\", {}, {}, \"{}\");\r\n",
            self.family, self.weight, self.style, self.basename,
        )
    }
}

/// Phase one: gather the font file basenames from the output font
/// directory, in the listing's native order. A missing directory yields an
/// empty listing, matching a run where no fonts were converted.
pub fn scan_basenames(font_dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(font_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(crate::error::Error::from(e)).chain_with(|| error! {
            "failed to list output font directory",
            "directory" => font_dir.display(),
        }),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.chain_with(|| error! {
            "failed to read output font directory entry",
            "directory" => font_dir.display(),
        })?;

        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        // everything before the first dot, so `.woff` and `.woff2`
        // variants of one face share a basename
        let basename = name.split('.').next().unwrap_or(&name).to_string();
        names.push(basename);
    }

    Ok(names)
}

/// Phase two: fold the gathered basenames into the stylesheet fragment.
/// Pure; errors identify the offending filename.
pub fn fragment<I, S>(basenames: I, dedup: Dedup) -> Result<String>
    where I: IntoIterator<Item = S>, S: AsRef<str>
{
    let mut out = String::new();
    let mut prev: Option<String> = None;
    let mut seen = FxHashSet::default();

    for basename in basenames {
        let basename = basename.as_ref();
        let skip = match dedup {
            Dedup::Adjacent => prev.as_deref() == Some(basename),
            Dedup::Global => !seen.insert(basename.to_string()),
        };

        if !skip {
            let face = FontFace::parse(basename)?;
            out.push_str(&face.mixin_directive());
        }

        prev = Some(basename.to_string());
    }

    Ok(out)
}
