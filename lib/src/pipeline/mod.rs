mod report;

pub use report::*;

use std::fs;
use std::fmt;
use std::sync::Arc;
use std::path::{Path, PathBuf};
use std::time::Instant;

use derive_more::Debug;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::error::{Error, Result, Chainable};
use crate::fstree::{Entry, FsTree};
use crate::pipe::{Mapper, Sink, Source};
use crate::font::face::{self, Dedup};
use crate::font::{Woff, Woff2};
use crate::html::HtmlInclude;
use crate::svg::{SpriteBuilder, SvgMin};

pub const SCSS_DIR: &str = "scss";
pub const IMG_DIR: &str = "img";
pub const SPRITE_SRC_DIR: &str = "img/svg-for-sprite";
pub const FONTS_DIR: &str = "fonts";
pub const FONTS_SCSS: &str = "scss/_fonts.scss";

const RASTER_EXTS: &[&str] = &["jpg", "jpeg", "png"];

/// The two entry points. Dev keeps source maps and copies raster images
/// untouched; build minifies stylesheets and runs lossy image compression
/// instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    Dev,
    Build,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Dev => f.write_str("dev"),
            Mode::Build => f.write_str("build"),
        }
    }
}

/// The explicitly constructed pipeline: source and output roots plus stage
/// policy, handed by reference to every stage. Stages never consult any
/// global registry.
#[derive(Debug)]
pub struct Pipeline {
    pub src: PathBuf,
    pub out: PathBuf,
    pub dedup: Dedup,
    #[debug(ignore)]
    reporter: Arc<dyn Reporter>,
}

/// The outcome of one full run. Stage failures are surfaced, not fatal;
/// callers decide what a failed stage means for the exit code.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub failures: Vec<(Stage, Error)>,
}

impl RunSummary {
    pub fn ok(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Pipeline {
    pub fn new<S: AsRef<Path>, O: AsRef<Path>>(src: S, out: O) -> Self {
        Pipeline {
            src: src.as_ref().to_path_buf(),
            out: out.as_ref().to_path_buf(),
            dedup: Dedup::default(),
            reporter: Arc::new(ConsoleReporter),
        }
    }

    pub fn dedup(mut self, dedup: Dedup) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn css_out(&self) -> PathBuf { self.out.join("css") }
    pub fn img_out(&self) -> PathBuf { self.out.join(IMG_DIR) }
    pub fn fonts_out(&self) -> PathBuf { self.out.join(FONTS_DIR) }
    pub fn fonts_scss(&self) -> PathBuf { self.src.join(FONTS_SCSS) }

    /// Runs one entry point to completion. Ordering: clean, then the
    /// concurrent group (html, font conversion, image copy, svg), then the
    /// font copy/style/compile chain, then build-only image compression.
    pub fn run(&self, mode: Mode) -> Result<RunSummary> {
        let failures = Mutex::new(Vec::new());
        self.run_stage(Stage::Clean, &failures, || self.clean());

        // the snapshot every stage selects its inputs from
        let tree = FsTree::build(&self.src)?;

        rayon::scope(|s| {
            s.spawn(|_| self.run_stage(Stage::Html, &failures, || self.assemble_html(&tree)));
            s.spawn(|_| self.run_stage(Stage::FontsConvert, &failures, || self.convert_fonts(&tree)));
            s.spawn(|_| self.run_stage(Stage::SvgOptimize, &failures, || self.optimize_svgs(&tree)));
            s.spawn(|_| self.run_stage(Stage::SvgSprite, &failures, || self.build_sprite(&tree)));
            if mode == Mode::Dev {
                s.spawn(|_| self.run_stage(Stage::ImagesCopy, &failures, || self.copy_images(&tree)));
            }
        });

        // the font chain: copy and convert land files first, the style
        // generator scans what landed, the compiler imports its output
        self.run_stage(Stage::FontsCopy, &failures, || self.copy_fonts(&tree));
        self.run_stage(Stage::FontStyle, &failures, || self.generate_font_style());
        self.run_stage(Stage::Styles, &failures, || self.compile_styles(&tree, mode));

        if mode == Mode::Build {
            self.run_stage(Stage::ImagesCompress, &failures, || self.compress_images(&tree));
        }

        Ok(RunSummary { failures: failures.into_inner() })
    }

    /// Re-runs a single stage against a fresh source snapshot; the watch
    /// loop maps each filesystem event to the one stage it invalidates.
    /// Output is recomputed from scratch, never patched.
    pub fn run_one(&self, stage: Stage) -> Result<()> {
        let tree = FsTree::build(&self.src)?;
        match stage {
            Stage::Clean => self.clean(),
            Stage::Html => self.assemble_html(&tree),
            Stage::FontsConvert => self.convert_fonts(&tree),
            Stage::FontsCopy => self.copy_fonts(&tree),
            Stage::FontStyle => self.generate_font_style(),
            Stage::Styles => self.compile_styles(&tree, Mode::Dev),
            Stage::ImagesCopy => self.copy_images(&tree),
            Stage::ImagesCompress => self.compress_images(&tree),
            Stage::SvgOptimize => self.optimize_svgs(&tree),
            Stage::SvgSprite => self.build_sprite(&tree),
        }
    }

    /// Re-runs one stage with failures surfaced through the reporter and
    /// then dropped; the watch loop's "surface, don't crash" path.
    pub fn rerun(&self, stage: Stage) {
        let failures = Mutex::new(Vec::new());
        self.run_stage(stage, &failures, || self.run_one(stage));
    }

    fn run_stage<F>(&self, stage: Stage, failures: &Mutex<Vec<(Stage, Error)>>, f: F)
        where F: FnOnce() -> Result<()>
    {
        self.reporter.report(Event::Started(stage));
        let start = Instant::now();
        match f() {
            Ok(()) => self.reporter.report(Event::Finished(stage, start.elapsed())),
            Err(e) => {
                self.reporter.report(Event::Failed(stage, &e));
                failures.lock().push((stage, e));
            }
        }
    }

    /// Removes the output tree. Succeeds trivially when it is absent.
    fn clean(&self) -> Result<()> {
        if self.out.exists() {
            fs::remove_dir_all(&self.out).chain_with(|| error! {
                "failed to remove output directory",
                "directory" => self.out.display(),
            })?;
        }

        Ok(())
    }

    /// Assembles top-level pages from their partials into the output root.
    fn assemble_html(&self, tree: &FsTree) -> Result<()> {
        let pages: Vec<&Entry> = tree.files_with_ext(Path::new(""), false, &["html"]).collect();
        pages.par_iter().try_for_each(|page| {
            HtmlInclude::default()
                .map_copy(*page, self.out.join(&page.file_name))
                .chain_with(|| error! {
                    "failed to assemble page",
                    "page" => page.relative_path().display(),
                })
        })
    }

    /// Converts every source ttf into woff and woff2 siblings in the
    /// output font directory.
    fn convert_fonts(&self, tree: &FsTree) -> Result<()> {
        let fonts: Vec<&Entry> = tree.files_with_ext(Path::new(FONTS_DIR), false, &["ttf"]).collect();
        let out = self.fonts_out();
        fonts.par_iter().try_for_each(|font| {
            let stem = font.file_stem();
            Woff.map_copy(*font, out.join(format!("{stem}.woff")))?;
            Woff2.map_copy(*font, out.join(format!("{stem}.woff2")))
        })
    }

    /// Moves pre-converted woff/woff2 files into the output font
    /// directory so the style generator sees them too.
    fn copy_fonts(&self, tree: &FsTree) -> Result<()> {
        let out = self.fonts_out();
        for font in tree.files_with_ext(Path::new(FONTS_DIR), false, &["woff", "woff2"]) {
            font.read_to(out.join(&font.file_name))?;
        }

        Ok(())
    }

    /// Regenerates the font-face fragment from the output font directory:
    /// truncate, then gather the listing, then emit one directive per
    /// distinct basename under the configured dedup policy.
    fn generate_font_style(&self) -> Result<()> {
        let target = self.fonts_scss();
        target.write("")?;

        let basenames = face::scan_basenames(&self.fonts_out())?;
        let fragment = face::fragment(basenames, self.dedup)?;
        log::debug!("font fragment: {} directives", fragment.matches("\r\n").count());
        target.write(fragment)
    }

    /// Compiles every non-partial scss file. Dev emits expanded css plus a
    /// source map; build emits compressed css under a `.min.css` name and
    /// no maps.
    fn compile_styles(&self, tree: &FsTree, mode: Mode) -> Result<()> {
        #[cfg(feature = "sass")]
        {
            use crate::style::{Scss, stub_source_map, source_map_trailer};

            let sheets: Vec<&Entry> = tree
                .files_with_ext(Path::new(SCSS_DIR), true, &["scss"])
                .filter(|e| !e.file_name.starts_with('_'))
                .collect();

            let out = self.css_out();
            return sheets.par_iter().try_for_each(|sheet| {
                // nested sheets keep their directory relative to the scss root
                let rel = sheet.relative_path();
                let rel = rel.strip_prefix(SCSS_DIR).unwrap_or(rel);
                let out = rel.parent().map_or_else(|| out.clone(), |dir| out.join(dir));

                let result = (|| match mode {
                    Mode::Dev => {
                        let css_name = format!("{}.css", sheet.file_stem());
                        let map_name = format!("{css_name}.map");

                        let mut css = Scss::expanded().map(*sheet)?.into_text()?;
                        css.push_str(&source_map_trailer(&map_name));

                        let scss = sheet.path.as_ref().read_text()?;
                        let map = stub_source_map(&css_name, sheet.relative_path(), &scss)?;

                        out.join(css_name).write(css)?;
                        out.join(map_name).write(map)
                    }
                    Mode::Build => {
                        let css = Scss::compressed().map(*sheet)?;
                        out.join(format!("{}.min.css", sheet.file_stem())).write(css)
                    }
                })();

                result.chain_with(|| error! {
                    "failed to compile stylesheet",
                    "stylesheet" => sheet.relative_path().display(),
                })
            });
        }

        #[cfg(not(feature = "sass"))]
        {
            let _ = (tree, mode);
            err!("stylesheet compilation requires the `sass` feature")
        }
    }

    /// Copies top-level raster images into the output untouched.
    fn copy_images(&self, tree: &FsTree) -> Result<()> {
        let out = self.img_out();
        for image in tree.files_with_ext(Path::new(IMG_DIR), false, RASTER_EXTS) {
            image.read_to(out.join(&image.file_name))?;
        }

        Ok(())
    }

    /// Build-only lossy compression through the external service.
    fn compress_images(&self, tree: &FsTree) -> Result<()> {
        #[cfg(feature = "tinify")]
        {
            let images: Vec<&Entry> = tree
                .files_with_ext(Path::new(IMG_DIR), false, RASTER_EXTS)
                .collect();

            if images.is_empty() {
                return Ok(());
            }

            let client = crate::tinify::Tinify::from_env()?;
            let out = self.img_out();
            return images.par_iter().try_for_each(|image| {
                let compressed = client.compress(image.path.as_ref().read()?.into_bytes())
                    .chain_with(|| error! {
                        "image compression failed",
                        "image" => image.relative_path().display(),
                    })?;

                out.join(&image.file_name).write(compressed)
            });
        }

        #[cfg(not(feature = "tinify"))]
        {
            let _ = tree;
            err!("image compression requires the `tinify` feature")
        }
    }

    /// Minifies standalone svgs into the output image directory.
    fn optimize_svgs(&self, tree: &FsTree) -> Result<()> {
        let svgs: Vec<&Entry> = tree.files_with_ext(Path::new(IMG_DIR), false, &["svg"]).collect();
        let out = self.img_out();
        svgs.par_iter().try_for_each(|svg| {
            SvgMin.map_copy(*svg, out.join(&svg.file_name)).chain_with(|| error! {
                "failed to optimize svg",
                "svg" => svg.relative_path().display(),
            })
        })
    }

    /// Folds the sprite source directory into one stack sprite. No
    /// sources, no sprite file.
    fn build_sprite(&self, tree: &FsTree) -> Result<()> {
        let mut builder = SpriteBuilder::new();
        for svg in tree.files_with_ext(Path::new(SPRITE_SRC_DIR), false, &["svg"]) {
            let minified = SvgMin.map(svg)?.into_text()?;
            builder.push(svg.file_stem(), &minified).chain_with(|| error! {
                "failed to add svg to sprite",
                "svg" => svg.relative_path().display(),
            })?;
        }

        if builder.is_empty() {
            return Ok(());
        }

        self.img_out().join("sprite.svg").write(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names() {
        assert_eq!(Mode::Dev.to_string(), "dev");
        assert_eq!(Mode::Build.to_string(), "build");
        assert_eq!(format!("entering {} mode", Mode::Build), "entering build mode");
    }
}
