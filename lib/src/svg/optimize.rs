use crate::error::Result;
use crate::pipe::{Blob, Mapper, Source};

/// Lightweight svg cleanup: drops XML comments, processing instructions,
/// and DOCTYPE declarations, and collapses whitespace between tags. Markup
/// inside tags and text content are left alone.
#[derive(Debug, Default)]
pub struct SvgMin;

impl Mapper for SvgMin {
    fn map<I: Source>(&self, input: I) -> Result<Blob> {
        let text = input.read_text()?;
        Ok(Blob::Text(minify(&text)))
    }
}

fn minify(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('<') {
        let (before, tail) = rest.split_at(open);
        push_text(&mut output, before);

        if let Some(stripped) = strip_markup(tail, "<!--", "-->")
            .or_else(|| strip_markup(tail, "<?", "?>"))
            .or_else(|| strip_markup(tail, "<!DOCTYPE", ">"))
        {
            rest = stripped;
            continue;
        }

        match tail.find('>') {
            Some(end) => {
                output.push_str(&tail[..=end]);
                rest = &tail[end + 1..];
            }
            None => {
                // unterminated tag; emit as-is and let downstream complain
                output.push_str(tail);
                rest = "";
            }
        }
    }

    push_text(&mut output, rest);
    output
}

/// Inter-tag whitespace-only runs vanish; mixed content is preserved.
fn push_text(output: &mut String, text: &str) {
    if !text.chars().all(char::is_whitespace) {
        output.push_str(text);
    }
}

fn strip_markup<'a>(tail: &'a str, open: &str, close: &str) -> Option<&'a str> {
    if tail.len() < open.len() || !tail[..open.len()].eq_ignore_ascii_case(open) {
        return None;
    }

    match tail[open.len()..].find(close) {
        Some(end) => Some(&tail[open.len() + end + close.len()..]),
        None => Some(""),
    }
}
