use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::Error;

/// One discrete asset-processing operation with fixed inputs and outputs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    Clean,
    Html,
    FontsConvert,
    FontsCopy,
    FontStyle,
    Styles,
    ImagesCopy,
    ImagesCompress,
    SvgOptimize,
    SvgSprite,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Clean => "clean",
            Stage::Html => "html",
            Stage::FontsConvert => "fonts:convert",
            Stage::FontsCopy => "fonts:copy",
            Stage::FontStyle => "fonts:style",
            Stage::Styles => "styles",
            Stage::ImagesCopy => "images:copy",
            Stage::ImagesCompress => "images:compress",
            Stage::SvgOptimize => "svg:optimize",
            Stage::SvgSprite => "svg:sprite",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

/// Progress and failure notifications emitted by the orchestrator. Stage
/// failures surface here instead of aborting the run.
#[derive(Debug)]
pub enum Event<'a> {
    Started(Stage),
    Finished(Stage, Duration),
    Failed(Stage, &'a Error),
}

pub trait Reporter: Send + Sync {
    fn report(&self, event: Event<'_>);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, event: Event<'_>) {
        match event {
            Event::Started(stage) => log::debug!("[{stage}] started"),
            Event::Finished(stage, took) => log::info!("[{stage}] done in {}ms", took.as_millis()),
            Event::Failed(stage, error) => log::error!("[{stage}] failed\n{error}"),
        }
    }
}

/// Records stage outcomes; the sink used by tests.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    outcomes: Mutex<Vec<(Stage, bool)>>,
}

impl MemoryReporter {
    pub fn outcomes(&self) -> Vec<(Stage, bool)> {
        self.outcomes.lock().clone()
    }

    pub fn failed_stages(&self) -> Vec<Stage> {
        self.outcomes.lock().iter().filter(|(_, ok)| !ok).map(|&(s, _)| s).collect()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: Event<'_>) {
        match event {
            Event::Started(_) => {}
            Event::Finished(stage, _) => self.outcomes.lock().push((stage, true)),
            Event::Failed(stage, _) => self.outcomes.lock().push((stage, false)),
        }
    }
}
