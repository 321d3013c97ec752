use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use frontpress::build::{build_site, BuildReport, Error};
use frontpress::config::Config;
use frontpress::loader;
use walkdir::WalkDir;

const HELLO: &str = "---\ndate: 05-Mar-2024\ntitle: Hello World\n---\n# Hi\n";

/// A project directory with `entries/` and `static/` populated.
struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    fn new() -> Project {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("entries")).unwrap();
        fs::create_dir_all(dir.path().join("static/img")).unwrap();
        fs::write(dir.path().join("static/style.css"), "body { margin: 0 }").unwrap();
        fs::write(dir.path().join("static/img/logo.svg"), "<svg/>").unwrap();
        Project { dir }
    }

    fn entry(&self, name: &str, contents: &str) -> &Project {
        fs::write(self.dir.path().join("entries").join(name), contents).unwrap();
        self
    }

    fn config(&self) -> Config {
        Config::from_directory(self.dir.path()).unwrap()
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("docs")
    }

    fn build(&self) -> BuildReport {
        build_site(&self.config()).unwrap()
    }
}

/// Every file under `root`, keyed by its relative path.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            (
                entry.path().strip_prefix(root).unwrap().to_owned(),
                fs::read(entry.path()).unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_hello_world() {
    let project = Project::new();
    project.entry("hello.md", HELLO);
    let report = project.build();

    assert_eq!(report.posts_written, 1);
    assert_eq!(report.skipped(), 0);

    let out = project.output();
    let files: Vec<PathBuf> = snapshot(&out).into_keys().collect();
    assert_eq!(
        files,
        vec![
            PathBuf::from("2024/03/05/hello-world/index.html"),
            PathBuf::from("index.html"),
            PathBuf::from("static/img/logo.svg"),
            PathBuf::from("static/style.css"),
        ]
    );

    let page = fs::read_to_string(out.join("2024/03/05/hello-world/index.html")).unwrap();
    assert!(page.contains("<title>Hello World</title>"));
    assert!(page.contains("<h1>Hi</h1>"));
    let index = fs::read_to_string(out.join("index.html")).unwrap();
    assert!(index.contains(r#"<a href="/2024/03/05/hello-world/">Hello World</a>"#));
}

#[test]
fn test_bad_date_contributes_no_posts() {
    let project = Project::new();
    project
        .entry("hello.md", HELLO)
        .entry("bad.md", "---\ndate: not-a-date\ntitle: Bad\n---\nbad\n");
    let report = project.build();

    assert_eq!(report.posts_written, 1);
    match &report.skipped_documents[..] {
        [loader::Error::Parse { path, .. }] => assert!(path.ends_with("bad.md")),
        other => panic!("expected one parse error, got {:?}", other),
    }

    // no zero-dated or untitled page anywhere
    let files = snapshot(&project.output());
    assert!(files.keys().all(|p| !p.starts_with("0001") && !p.starts_with("1970")));
    let index = fs::read_to_string(project.output().join("index.html")).unwrap();
    assert!(!index.contains("Bad"));
}

#[test]
fn test_rebuild_is_idempotent() {
    let project = Project::new();
    project
        .entry("hello.md", HELLO)
        .entry("second.md", "---\ndate: 06-Mar-2024\ntitle: Second Post\n---\nMore *words*.\n");

    project.build();
    let first = snapshot(&project.output());
    project.build();
    let second = snapshot(&project.output());
    assert_eq!(first, second);
}

#[test]
fn test_unrelated_files_are_removed() {
    let project = Project::new();
    project.entry("hello.md", HELLO);
    let out = project.output();
    fs::create_dir_all(out.join("2019/01/01/old-post")).unwrap();
    fs::write(out.join("2019/01/01/old-post/index.html"), "old").unwrap();
    fs::write(out.join("CNAME"), "example.com").unwrap();

    project.build();
    let files = snapshot(&out);
    assert!(!files.contains_key(Path::new("CNAME")));
    assert!(!files.contains_key(Path::new("2019/01/01/old-post/index.html")));
    assert!(!out.join("2019").exists());
    assert!(files.contains_key(Path::new("2024/03/05/hello-world/index.html")));
}

#[test]
fn test_colliding_posts_overwrite() {
    let project = Project::new();
    project
        .entry("a.md", "---\ndate: 05-Mar-2024\ntitle: Same Title\n---\nfirst\n")
        .entry("b.md", "---\ndate: 05-Mar-2024\ntitle: Same Title\n---\nsecond\n");
    let report = project.build();

    assert_eq!(report.collisions, 1);
    assert_eq!(report.posts_written, 1);
    let page =
        fs::read_to_string(project.output().join("2024/03/05/same-title/index.html")).unwrap();
    assert!(page.contains("second"));
}

#[test]
fn test_index_lists_newest_first() {
    let project = Project::new();
    project
        .entry("a.md", "---\ndate: 01-Jan-2023\ntitle: Oldest\n---\n")
        .entry("b.md", "---\ndate: 01-Jan-2025\ntitle: Newest\n---\n")
        .entry("c.md", "---\ndate: 01-Jan-2024\ntitle: Middle\n---\n");
    project.build();

    let index = fs::read_to_string(project.output().join("index.html")).unwrap();
    let newest = index.find("Newest").unwrap();
    let middle = index.find("Middle").unwrap();
    let oldest = index.find("Oldest").unwrap();
    assert!(newest < middle && middle < oldest);
}

#[test]
fn test_root_prefix() {
    let project = Project::new();
    project.entry("hello.md", "---\ndate: 05-Mar-2024\ntitle: Hello World\n---\n![logo](/static/img/logo.svg)\n");
    let mut config = project.config();
    config.root = String::from("/blog");
    build_site(&config).unwrap();

    let page =
        fs::read_to_string(project.output().join("2024/03/05/hello-world/index.html")).unwrap();
    assert!(page.contains(r#"href="/blog/static/style.css""#));
    assert!(page.contains(r#"src="/blog/static/img/logo.svg""#));
    let index = fs::read_to_string(project.output().join("index.html")).unwrap();
    assert!(index.contains(r#"href="/blog/2024/03/05/hello-world/""#));
}

#[test]
fn test_missing_static_directory_is_fatal() {
    let project = Project::new();
    project.entry("hello.md", HELLO);
    fs::remove_dir_all(project.dir.path().join("static")).unwrap();

    match build_site(&project.config()) {
        Err(Error::Write(_)) => {}
        other => panic!("expected a write error, got {:?}", other),
    }
}

#[test]
fn test_missing_posts_directory_leaves_output_alone() {
    let project = Project::new();
    let out = project.output();
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("index.html"), "previous").unwrap();
    fs::remove_dir_all(project.dir.path().join("entries")).unwrap();

    assert!(matches!(build_site(&project.config()), Err(Error::Load(_))));
    assert_eq!(fs::read_to_string(out.join("index.html")).unwrap(), "previous");
}

#[test]
fn test_staged_build_matches_in_place_build() {
    let project = Project::new();
    project.entry("hello.md", HELLO);

    project.build();
    let in_place = snapshot(&project.output());

    let mut config = project.config();
    config.staged = true;
    build_site(&config).unwrap();
    assert_eq!(snapshot(&project.output()), in_place);
}

#[test]
fn test_thematic_break_in_body() {
    let project = Project::new();
    project.entry(
        "breaks.md",
        "---\ndate: 05-Mar-2024\ntitle: Breaks\n---\nabove\n\n---\n\nbelow\n",
    );
    project.build();

    let page = fs::read_to_string(project.output().join("2024/03/05/breaks/index.html")).unwrap();
    assert!(page.contains("<p>above</p>\n<hr />\n<p>below</p>"));
}
