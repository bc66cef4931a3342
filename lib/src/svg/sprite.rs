use crate::error::Result;
use crate::pipe::Blob;

/// Builds a stack-mode svg sprite: every source svg becomes a nested
/// `<svg>` carrying its file stem as `id`, and a style rule keeps all of
/// them hidden except the `:target` fragment. Consumers reference one icon
/// as `sprite.svg#name`.
#[derive(Debug, Default)]
pub struct SpriteBuilder {
    symbols: Vec<String>,
}

const STACK_STYLE: &str = ":root > svg { display: none; } :root > svg:target { display: inline; }";

impl SpriteBuilder {
    pub fn new() -> Self {
        SpriteBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Adds one source svg under `id`. The source's root element is
    /// unwrapped; its viewBox (or width/height) carries over.
    pub fn push(&mut self, id: &str, svg: &str) -> Result<()> {
        let (open_tag, inner) = split_root(svg).ok_or_else(|| error! {
            "sprite source is not a well-formed svg document",
            "id" => id,
        })?;

        let mut symbol = format!("<svg id=\"{id}\"");
        for name in ["viewBox", "width", "height", "preserveAspectRatio"] {
            if let Some(value) = attr(open_tag, name) {
                symbol.push_str(&format!(" {name}=\"{value}\""));
            }
        }

        symbol.push('>');
        symbol.push_str(inner.trim());
        symbol.push_str("</svg>");
        self.symbols.push(symbol);
        Ok(())
    }

    pub fn build(self) -> Blob {
        let mut sprite = String::new();
        sprite.push_str("<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">");
        sprite.push_str(&format!("<style>{STACK_STYLE}</style>"));
        for symbol in &self.symbols {
            sprite.push_str(symbol);
        }

        sprite.push_str("</svg>");
        Blob::Text(sprite)
    }
}

/// Splits a document into its root `<svg ...>` open tag and the content up
/// to the final `</svg>`. Self-closing roots yield empty content.
fn split_root(svg: &str) -> Option<(&str, &str)> {
    let start = svg.find("<svg")?;
    let rest = &svg[start..];
    let open_end = rest.find('>')?;
    let open_tag = &rest[..open_end + 1];

    if open_tag.ends_with("/>") {
        return Some((open_tag, ""));
    }

    let inner = &rest[open_end + 1..];
    let close = inner.rfind("</svg")?;
    Some((open_tag, &inner[..close]))
}

fn attr<'a>(open_tag: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = open_tag;
    while let Some(at) = rest.find(name) {
        let tail = &rest[at + name.len()..];
        let preceded_ok = rest[..at].ends_with([' ', '\t', '\n'])
            && tail.trim_start().starts_with('=');
        if preceded_ok {
            let tail = tail.trim_start();
            let tail = tail[1..].trim_start();
            let quote = tail.chars().next().filter(|&c| c == '"' || c == '\'')?;
            let inner = &tail[1..];
            let end = inner.find(quote)?;
            return Some(&inner[..end]);
        }

        rest = &rest[at + name.len()..];
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICON: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 24 24\"><path d=\"M0 0h24\"/></svg>";

    #[test]
    fn icons_become_targetable_fragments() {
        let mut builder = SpriteBuilder::new();
        builder.push("arrow", ICON).unwrap();
        builder.push("cross", "<svg width=\"16\" height=\"16\"/>").unwrap();

        let sprite = builder.build().into_text().unwrap();
        assert!(sprite.contains("<svg id=\"arrow\" viewBox=\"0 0 24 24\"><path d=\"M0 0h24\"/></svg>"));
        assert!(sprite.contains("<svg id=\"cross\" width=\"16\" height=\"16\"></svg>"));
        assert!(sprite.contains(":target"));
        assert!(sprite.starts_with("<svg xmlns="));
    }

    #[test]
    fn garbage_input_is_rejected() {
        let mut builder = SpriteBuilder::new();
        assert!(builder.push("bad", "<png>not svg</png>").is_err());
    }

    #[test]
    fn attr_lookup_ignores_lookalikes() {
        let tag = "<svg data-viewBox=\"9 9 9 9\" viewBox=\"0 0 1 1\">";
        assert_eq!(attr(tag, "viewBox"), Some("0 0 1 1"));
        assert_eq!(attr(tag, "height"), None);
    }
}
