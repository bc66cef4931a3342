//! Full pipeline runs against a scratch project tree: both entry points,
//! stage ordering effects, and the dev/build mode differences.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use bellows::pipeline::{MemoryReporter, Mode, Pipeline, Stage};
use bellows::font::face::Dedup;

const MAIN_SCSS: &str = r#"@mixin font($family, $weight, $style, $file) {
  @font-face {
    font-family: $family;
    font-weight: $weight;
    font-style: #{$style};
    src: url("../fonts/#{$file}.woff2") format("woff2");
  }
}
@import "fonts";

body {
  color: red;
}
"#;

/// A structurally valid ttf with two dummy tables; the converters only
/// read the table directory.
fn fake_ttf() -> Vec<u8> {
    let tables: &[(&[u8; 4], &[u8])] = &[(b"head", &[1; 54]), (b"glyf", &[7; 128])];
    let mut font = Vec::new();
    font.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    font.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    font.extend_from_slice(&[0; 6]);

    let mut offset = 12 + 16 * tables.len();
    let mut blob = Vec::new();
    for (tag, data) in tables {
        font.extend_from_slice(*tag);
        font.extend_from_slice(&0u32.to_be_bytes());
        font.extend_from_slice(&(offset as u32).to_be_bytes());
        font.extend_from_slice(&(data.len() as u32).to_be_bytes());

        blob.extend_from_slice(data);
        let pad = (4 - data.len() % 4) % 4;
        blob.extend_from_slice(&[0, 0, 0][..pad]);
        offset += data.len() + pad;
    }

    font.extend_from_slice(&blob);
    font
}

struct Project {
    root: PathBuf,
}

impl Project {
    fn new(name: &str, with_raster: bool) -> Project {
        let root = std::env::temp_dir().join(format!("bellows-it-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);

        let src = root.join("src");
        fs::create_dir_all(src.join("partials")).unwrap();
        fs::create_dir_all(src.join("scss")).unwrap();
        fs::create_dir_all(src.join("img/svg-for-sprite")).unwrap();
        fs::create_dir_all(src.join("fonts")).unwrap();

        fs::write(src.join("index.html"), "@include('./partials/header.html')<main></main>").unwrap();
        fs::write(src.join("partials/header.html"), "<header>hi</header>").unwrap();
        fs::write(src.join("scss/main.scss"), MAIN_SCSS).unwrap();
        fs::write(src.join("img/logo.svg"), "<!-- editor junk -->\n<svg>\n  <path/>\n</svg>").unwrap();
        fs::write(
            src.join("img/svg-for-sprite/arrow.svg"),
            "<svg viewBox=\"0 0 24 24\"><path d=\"M0 0h24\"/></svg>",
        ).unwrap();
        fs::write(src.join("fonts/Roboto-Regular.ttf"), fake_ttf()).unwrap();

        if with_raster {
            fs::write(src.join("img/photo.png"), [137, 80, 78, 71, 13, 10, 26, 10, 1, 2, 3]).unwrap();
        }

        Project { root }
    }

    fn pipeline(&self) -> (Arc<MemoryReporter>, Pipeline) {
        let reporter = Arc::new(MemoryReporter::default());
        let pipeline = Pipeline::new(self.root.join("src"), self.root.join("dist"))
            .reporter(reporter.clone());
        (reporter, pipeline)
    }

    fn dist(&self, rel: &str) -> PathBuf {
        self.root.join("dist").join(rel)
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

#[test]
fn build_produces_a_complete_minified_tree() {
    let project = Project::new("build", false);
    let (reporter, pipeline) = project.pipeline();

    let summary = pipeline.run(Mode::Build).unwrap();
    assert!(summary.ok(), "failures: {:?}", summary.failures);
    assert!(reporter.failed_stages().is_empty());

    let html = fs::read_to_string(project.dist("index.html")).unwrap();
    assert_eq!(html, "<header>hi</header><main></main>");

    let css = fs::read_to_string(project.dist("css/main.min.css")).unwrap();
    assert!(css.contains("@font-face"));
    assert!(css.contains("Roboto-Regular.woff2"));
    assert!(css.contains("font-weight:400"));
    assert!(!css.contains("sourceMappingURL"));
    assert!(!project.dist("css/main.css").exists());
    assert!(!project.dist("css/main.min.css.map").exists());

    let woff = fs::read(project.dist("fonts/Roboto-Regular.woff")).unwrap();
    let woff2 = fs::read(project.dist("fonts/Roboto-Regular.woff2")).unwrap();
    assert_eq!(&woff[..4], b"wOFF");
    assert_eq!(&woff2[..4], b"wOF2");

    // a woff/woff2 pair lists adjacently and folds into one directive
    let fragment = fs::read_to_string(project.root.join("src/scss/_fonts.scss")).unwrap();
    assert_eq!(
        fragment,
        "@include font(\"Roboto\", 400, normal, \"Roboto-Regular\");\r\n",
    );

    let logo = fs::read_to_string(project.dist("img/logo.svg")).unwrap();
    assert_eq!(logo, "<svg><path/></svg>");

    let sprite = fs::read_to_string(project.dist("img/sprite.svg")).unwrap();
    assert!(sprite.contains("<svg id=\"arrow\" viewBox=\"0 0 24 24\">"));
}

#[test]
fn build_twice_is_idempotent() {
    let project = Project::new("idem", false);
    let (_, pipeline) = project.pipeline();

    assert!(pipeline.run(Mode::Build).unwrap().ok());
    let css = fs::read(project.dist("css/main.min.css")).unwrap();
    let woff2 = fs::read(project.dist("fonts/Roboto-Regular.woff2")).unwrap();

    assert!(pipeline.run(Mode::Build).unwrap().ok());
    assert_eq!(fs::read(project.dist("css/main.min.css")).unwrap(), css);
    assert_eq!(fs::read(project.dist("fonts/Roboto-Regular.woff2")).unwrap(), woff2);
}

#[test]
fn dev_keeps_maps_and_raw_images() {
    let project = Project::new("dev", true);
    let (_, pipeline) = project.pipeline();

    let summary = pipeline.run(Mode::Dev).unwrap();
    assert!(summary.ok(), "failures: {:?}", summary.failures);

    let css = fs::read_to_string(project.dist("css/main.css")).unwrap();
    assert!(css.contains("sourceMappingURL=main.css.map"));
    assert!(project.dist("css/main.css.map").exists());
    assert!(!project.dist("css/main.min.css").exists());

    // dev copies rasters byte for byte; lossy compression never runs
    let copied = fs::read(project.dist("img/photo.png")).unwrap();
    let original = fs::read(project.root.join("src/img/photo.png")).unwrap();
    assert_eq!(copied, original);
}

#[test]
fn broken_stylesheets_surface_without_aborting() {
    let project = Project::new("broken", false);
    fs::write(project.root.join("src/scss/main.scss"), "body { color: ").unwrap();

    let (reporter, pipeline) = project.pipeline();
    let summary = pipeline.run(Mode::Dev).unwrap();

    assert!(!summary.ok());
    assert_eq!(reporter.failed_stages(), vec![Stage::Styles]);
    // everything else still ran
    assert!(project.dist("index.html").exists());
    assert!(project.dist("fonts/Roboto-Regular.woff2").exists());
}

#[test]
fn single_stage_reruns_recompute_output() {
    let project = Project::new("rerun", false);
    let (_, pipeline) = project.pipeline();
    assert!(pipeline.run(Mode::Dev).unwrap().ok());

    fs::write(
        project.root.join("src/index.html"),
        "@include('./partials/header.html')<footer></footer>",
    ).unwrap();

    pipeline.run_one(Stage::Html).unwrap();
    let html = fs::read_to_string(project.dist("index.html")).unwrap();
    assert_eq!(html, "<header>hi</header><footer></footer>");
}

#[test]
fn global_dedup_collapses_scattered_variants() {
    let project = Project::new("dedup", false);
    // a second family guarantees at least two distinct basenames in the
    // output font directory, whatever order the listing settles on
    fs::write(project.root.join("src/fonts/Mulish-Black.woff"), [0u8; 8]).unwrap();

    let reporter = Arc::new(MemoryReporter::default());
    let pipeline = Pipeline::new(project.root.join("src"), project.root.join("dist"))
        .dedup(Dedup::Global)
        .reporter(reporter);
    assert!(pipeline.run(Mode::Dev).unwrap().ok());

    let fragment = fs::read_to_string(project.root.join("src/scss/_fonts.scss")).unwrap();
    assert_eq!(fragment.matches("\"Roboto-Regular\"").count(), 1);
    assert_eq!(fragment.matches("\"Mulish-Black\"").count(), 1);
}

#[test]
fn nested_stylesheets_keep_their_subdirectory() {
    let project = Project::new("nested", false);
    fs::create_dir_all(project.root.join("src/scss/pages")).unwrap();
    fs::write(project.root.join("src/scss/pages/about.scss"), "a { color: blue; }").unwrap();

    let (_, pipeline) = project.pipeline();
    assert!(pipeline.run(Mode::Build).unwrap().ok());
    assert!(project.dist("css/pages/about.min.css").exists());
    assert!(project.dist("css/main.min.css").exists());
    assert!(!project.dist("css/about.min.css").exists());

    assert!(pipeline.run(Mode::Dev).unwrap().ok());
    assert!(project.dist("css/pages/about.css").exists());
    assert!(project.dist("css/pages/about.css.map").exists());
}

#[test]
fn clean_removes_stale_output() {
    let project = Project::new("clean", false);
    let stale = project.dist("css/stale.css");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "gone").unwrap();

    let (_, pipeline) = project.pipeline();
    assert!(pipeline.run(Mode::Build).unwrap().ok());
    assert!(!stale.exists());
}

#[test]
fn missing_source_root_is_a_hard_error() {
    let root = std::env::temp_dir().join("bellows-it-absent-source");
    let _ = fs::remove_dir_all(&root);
    let pipeline = Pipeline::new(root.join("src"), root.join("dist"));
    assert!(pipeline.run(Mode::Build).is_err());
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn dev_server_round_trip() {
    use bellows::watch::DevServer;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    let root = std::env::temp_dir().join(format!("bellows-it-serve-{}", std::process::id()));
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("index.html"), "<h1>ok</h1>").unwrap();

    let server = DevServer::start("127.0.0.1:0", root.clone()).unwrap();
    let addr = server.addr().unwrap();

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(b"GET / HTTP/1.0\r\n\r\n").unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).unwrap();
    assert!(reply.starts_with("HTTP/1.0 200") || reply.starts_with("HTTP/1.1 200"));
    assert!(reply.contains("<h1>ok</h1>"));

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(b"GET /../secret HTTP/1.0\r\n\r\n").unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).unwrap();
    assert!(reply.contains("404"));

    server.stop();
    let _ = fs::remove_dir_all(&root);
}
