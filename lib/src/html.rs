use std::path::Path;

use crate::error::{Result, Chainable};
use crate::pipe::{Blob, Mapper, Source};

/// Stitches pages together from partials. Pages reference partials with
/// `@include('relative/path.html')` directives; each include resolves
/// relative to the file containing the directive and may itself include
/// further partials.
#[derive(Debug)]
pub struct HtmlInclude {
    depth_limit: usize,
}

impl Default for HtmlInclude {
    fn default() -> Self {
        // deep enough for any sane partial nesting, shallow enough to
        // catch include cycles quickly
        HtmlInclude { depth_limit: 16 }
    }
}

const DIRECTIVE: &str = "include(";

impl Mapper for HtmlInclude {
    fn map<I: Source>(&self, input: I) -> Result<Blob> {
        let base = input.path().and_then(Path::parent).map(Path::to_path_buf);
        let text = input.read_text()?;
        let expanded = self.expand(&text, base.as_deref(), self.depth_limit)?;
        Ok(Blob::Text(expanded))
    }
}

impl HtmlInclude {
    fn expand(&self, text: &str, base: Option<&Path>, depth: usize) -> Result<String> {
        let mut output = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(at) = memchr::memchr(b'@', rest.as_bytes()) {
            let (before, tail) = rest.split_at(at);
            output.push_str(before);

            let Some(args) = tail[1..].strip_prefix(DIRECTIVE) else {
                // a literal '@', not a directive
                output.push('@');
                rest = &tail[1..];
                continue;
            };

            let (target, after) = parse_target(args).ok_or_else(|| error! {
                "malformed @include directive",
                "directive" => tail.lines().next().unwrap_or(tail),
            })?;

            if depth == 0 {
                return err! {
                    "partial include depth limit exceeded (include cycle?)",
                    "target" => target,
                };
            }

            let base = base.ok_or_else(|| error! {
                "cannot resolve @include without a file-backed page",
                "target" => target,
            })?;

            let path = base.join(target);
            let partial = path.as_path().read_text().chain_with(|| error! {
                "failed to read included partial",
                "target" => target,
                "resolved path" => path.display(),
            })?;

            let expanded = self.expand(&partial, path.parent(), depth - 1)
                .chain_with(|| error! {
                    "failed while expanding partial",
                    "partial" => path.display(),
                })?;

            output.push_str(&expanded);
            rest = after;
        }

        output.push_str(rest);
        Ok(output)
    }
}

/// Parses `'path')` or `"path")` at the head of `args`, returning the
/// quoted path and the remainder after the closing parenthesis.
fn parse_target(args: &str) -> Option<(&str, &str)> {
    let args = args.trim_start();
    let quote = args.chars().next().filter(|&c| c == '\'' || c == '"')?;
    let inner = &args[1..];
    let end = inner.find(quote)?;
    let target = &inner[..end];
    let after = inner[end + 1..].trim_start().strip_prefix(')')?;
    Some((target, after))
}
