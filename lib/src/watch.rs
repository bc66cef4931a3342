use std::sync::Arc;
use std::sync::mpsc;
use std::net::ToSocketAddrs;
use std::path::{Component, Path, PathBuf};
use std::thread::JoinHandle;
use std::{fs, thread};

use notify::{EventKind, RecursiveMode, Watcher as _};

use crate::error::{Result, Chainable};
use crate::pipeline::{Pipeline, Stage};

/// The development reaction loop: filesystem events in the source tree
/// re-run exactly the stage whose inputs changed. There is no debouncing
/// and no cancellation; rapid edits simply re-run a stage again.
pub struct Watcher {
    pipeline: Arc<Pipeline>,
}

impl Watcher {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Watcher { pipeline }
    }

    /// Blocks forever, reacting to source changes, until the watch
    /// backend shuts down (in practice: process exit).
    pub fn run(&self) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx).chain("failed to create file watcher")?;
        watcher.watch(&self.pipeline.src, RecursiveMode::Recursive).chain_with(|| error! {
            "failed to watch source tree",
            "source root" => self.pipeline.src.display(),
        })?;

        log::info!("watching {} for changes", self.pipeline.src.display());
        for result in rx {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    log::warn!("watch backend error: {e}");
                    continue;
                }
            };

            if !matters(&event.kind) {
                continue;
            }

            for path in &event.paths {
                for &stage in stages_for(path) {
                    log::debug!("{} changed, re-running [{stage}]", path.display());
                    self.pipeline.rerun(stage);
                }
            }
        }

        Ok(())
    }
}

fn matters(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_))
}

/// Maps a changed source path to the stage chain it invalidates. Fonts
/// fan out: new font files reshape the generated fragment, which the
/// stylesheets import.
fn stages_for(path: &Path) -> &'static [Stage] {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let in_sprite_dir = path.parent()
        .map_or(false, |p| p.ends_with("svg-for-sprite"));

    match ext.to_ascii_lowercase().as_str() {
        "scss" | "sass" => &[Stage::Styles],
        "html" => &[Stage::Html],
        "jpg" | "jpeg" | "png" => &[Stage::ImagesCopy],
        "svg" if in_sprite_dir => &[Stage::SvgSprite],
        "svg" => &[Stage::SvgOptimize],
        "ttf" => &[Stage::FontsConvert, Stage::FontStyle, Stage::Styles],
        "woff" | "woff2" => &[Stage::FontsCopy, Stage::FontStyle, Stage::Styles],
        _ => &[],
    }
}

/// A static file server over the output tree with an explicit lifecycle:
/// construction binds and spawns the accept loop, [`DevServer::stop`] (or
/// drop) unblocks and joins it.
pub struct DevServer {
    server: Arc<tiny_http::Server>,
    handle: Option<JoinHandle<()>>,
}

impl DevServer {
    pub fn start<A: ToSocketAddrs>(addr: A, root: PathBuf) -> Result<Self> {
        let server = tiny_http::Server::http(addr)
            .map_err(|e| error!("failed to bind dev server", e))?;

        let server = Arc::new(server);
        let handle = {
            let server = server.clone();
            thread::spawn(move || {
                for request in server.incoming_requests() {
                    respond(&root, request);
                }
            })
        };

        Ok(DevServer { server, handle: Some(handle) })
    }

    /// The address the accept loop is bound to. Useful when started on
    /// port zero.
    pub fn addr(&self) -> Option<std::net::SocketAddr> {
        self.server.server_addr().to_ip()
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn respond(root: &Path, request: tiny_http::Request) {
    let (status, body, mime) = match resolve(root, request.url()) {
        Some(path) => match fs::read(&path) {
            Ok(body) => (200, body, content_type(&path)),
            Err(_) => (404, b"not found".to_vec(), "text/plain"),
        },
        None => (404, b"not found".to_vec(), "text/plain"),
    };

    let mut response = tiny_http::Response::from_data(body).with_status_code(status);
    if let Ok(header) = tiny_http::Header::from_bytes(&b"Content-Type"[..], mime.as_bytes()) {
        response = response.with_header(header);
    }

    if let Err(e) = request.respond(response) {
        log::debug!("dev server response dropped: {e}");
    }
}

/// Resolves a request url inside `root`, defaulting directories to their
/// `index.html`. Traversal components bail out.
fn resolve(root: &Path, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let relative = Path::new(path.trim_start_matches('/'));
    if relative.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
        return None;
    }

    let mut target = root.join(relative);
    if target.is_dir() {
        target = target.join("index.html");
    }

    Some(target)
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_routing() {
        assert_eq!(stages_for(Path::new("src/scss/main.scss")), &[Stage::Styles]);
        assert_eq!(stages_for(Path::new("src/index.html")), &[Stage::Html]);
        assert_eq!(stages_for(Path::new("src/img/logo.svg")), &[Stage::SvgOptimize]);
        assert_eq!(
            stages_for(Path::new("src/img/svg-for-sprite/icon.svg")),
            &[Stage::SvgSprite],
        );
        assert_eq!(
            stages_for(Path::new("src/fonts/Roboto-Bold.ttf")),
            &[Stage::FontsConvert, Stage::FontStyle, Stage::Styles],
        );
        assert!(stages_for(Path::new("src/notes.txt")).is_empty());
    }

    #[test]
    fn url_resolution_stays_inside_root() {
        let root = Path::new("/srv/dist");
        assert_eq!(resolve(root, "/css/main.css?v=2"), Some(root.join("css/main.css")));
        assert_eq!(resolve(root, "/../etc/passwd"), None);
        assert_eq!(resolve(root, "/img/%2e%2e/x"), Some(root.join("img/%2e%2e/x")));
    }
}
