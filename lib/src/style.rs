use std::path::Path;

use crate::error::Result;
use crate::pipe::{Blob, Mapper, Source};

/// Compiles scss to css via [`grass`].
#[derive(Debug, Copy, Clone)]
pub struct Scss {
    style: grass::OutputStyle,
}

impl Scss {
    /// Expanded output, the development mode default.
    pub fn expanded() -> Self {
        Scss { style: grass::OutputStyle::Expanded }
    }

    /// Compressed output for production builds. Minification is delegated
    /// entirely to the compiler's output style.
    pub fn compressed() -> Self {
        Scss { style: grass::OutputStyle::Compressed }
    }
}

impl Mapper for Scss {
    fn map<I: Source>(&self, input: I) -> Result<Blob> {
        let options = grass::Options::default().style(self.style);
        let result = match input.path() {
            Some(path) => grass::from_path(path, &options),
            None => {
                let string = input.read_text()?;
                grass::from_string(string, &options)
            }
        };

        result
            .map(Blob::Text)
            .map_err(|e| error!("failed to render sass as css", e))
    }
}

/// A source map v3 document pointing a compiled stylesheet back at its
/// scss input. grass does not track mappings, so the map carries the
/// source name and content with an empty mappings field; tools still get
/// the original text for display.
pub fn stub_source_map(css_file: &str, source: &Path, scss: &str) -> Result<String> {
    let map = serde_json::json!({
        "version": 3,
        "file": css_file,
        "sources": [source.display().to_string()],
        "sourcesContent": [scss],
        "names": [],
        "mappings": "",
    });

    Ok(serde_json::to_string(&map)?)
}

/// The trailer appended to dev-mode css so browsers pick up the map.
pub fn source_map_trailer(map_file: &str) -> String {
    format!("\n/*# sourceMappingURL={map_file} */\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_rules_flatten() {
        let css = Scss::expanded()
            .map(".outer { .inner { color: black; } }".to_string())
            .unwrap()
            .into_text()
            .unwrap();

        assert_eq!(css, ".outer .inner {\n  color: black;\n}\n");
    }

    #[test]
    fn compressed_strips_whitespace() {
        let css = Scss::compressed()
            .map("a {\n  color: red;\n}\n".to_string())
            .unwrap()
            .into_text()
            .unwrap();

        assert_eq!(css.trim_end(), "a{color:red}");
    }

    #[test]
    fn malformed_scss_is_an_error() {
        assert!(Scss::expanded().map("a { color: ".to_string()).is_err());
    }

    #[test]
    fn map_names_its_source() {
        let map = stub_source_map("main.css", Path::new("scss/main.scss"), "a { b: c; }").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&map).unwrap();
        assert_eq!(parsed["version"], 3);
        assert_eq!(parsed["sources"][0], "scss/main.scss");
        assert_eq!(parsed["sourcesContent"][0], "a { b: c; }");
    }
}
