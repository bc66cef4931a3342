use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bellows::error::Result;
use bellows::pipeline::{Mode, Pipeline};
use bellows::watch::{DevServer, Watcher};

use crate::config::Settings;

mod config;

pub const CONFIG_FILE: &str = "wren.toml";

xflags::xflags! {
    /// Build a static-asset project.
    cmd wren {
        /// Project root holding wren.toml and the source tree.
        optional -r, --root path: PathBuf

        /// Log more. Twice for trace output.
        repeated -v, --verbose

        /// Development build: source maps, uncompressed images, then
        /// watch the source tree and serve the output.
        default cmd dev { }

        /// Production build: minified stylesheets, compressed images,
        /// no source maps. Exits nonzero if any stage failed.
        cmd build { }
    }
}

// TODO: a `buildmin` entry point that also minifies the assembled html.

fn main() {
    let flags = Wren::from_env_or_exit();

    let level = match flags.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let root = flags.root.unwrap_or_else(|| PathBuf::from("."));
    let mode = match flags.subcommand {
        WrenCmd::Dev(_) => Mode::Dev,
        WrenCmd::Build(_) => Mode::Build,
    };

    match run(root, mode) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            log::error!("{mode} failed\n{e}");
            std::process::exit(1);
        }
    }
}

fn run(root: PathBuf, mode: Mode) -> Result<bool> {
    let settings = Settings::discover(&root)?;
    let pipeline = Arc::new(
        Pipeline::new(root.join(&settings.src), root.join(&settings.out))
            .dedup(settings.dedup),
    );

    let start = Instant::now();
    let summary = pipeline.run(mode)?;
    log::info!(
        "{mode} finished in {}ms, {} stage(s) failed",
        start.elapsed().as_millis(),
        summary.failures.len(),
    );

    if mode == Mode::Dev {
        let server = DevServer::start(settings.serve.as_str(), pipeline.out.clone())?;
        log::info!("serving {} at http://{}", pipeline.out.display(), settings.serve);

        // blocks until the process dies; failures during watch surface
        // through the reporter and never tear the loop down
        Watcher::new(pipeline.clone()).run()?;
        server.stop();
    }

    Ok(summary.ok())
}
