//! Integration tests for draining coverage files out of the build tree

use camino::{Utf8Path, Utf8PathBuf};
use democov::services::{ArtifactCollector, ArtifactRoot};
use democov::{CoverageError, DemoUnit};
use std::fs;
use tempfile::TempDir;

const EXTENSIONS: [&str; 2] = ["gcda", "gcno"];

fn create_build_tree() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    fs::create_dir_all(root.join("CMakeFiles")).unwrap();
    (temp_dir, root)
}

fn touch(path: &Utf8Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "cov").unwrap();
}

#[test]
fn test_collected_files_leave_the_build_tree() {
    let (_temp_dir, root) = create_build_tree();
    touch(&root.join("CMakeFiles/demoA.dir/demos/demoA.c.gcda"));
    touch(&root.join("CMakeFiles/demoA.dir/demos/demoA.c.gcno"));
    touch(&root.join("CMakeFiles/demoA.dir/demos/demoA.c.o"));

    let demo = DemoUnit::new("demoA");
    let dirs = ArtifactRoot::new(&root.join("cov")).prepare(&[demo]).unwrap();
    let collector = ArtifactCollector::new(&root.join("CMakeFiles"), &EXTENSIONS);

    assert_eq!(collector.collect(&dirs[0]).unwrap(), 2);

    assert!(root.join("cov/demoA_cov/demoA.c.gcda").is_file());
    assert!(root.join("cov/demoA_cov/demoA.c.gcno").is_file());
    assert!(root.join("CMakeFiles/demoA.dir/demos/demoA.c.o").is_file());
    assert!(collector.find_artifacts().unwrap().is_empty());
}

#[test]
fn test_second_demo_starts_from_an_empty_tree() {
    let (_temp_dir, root) = create_build_tree();
    let demos = [DemoUnit::new("first"), DemoUnit::new("second")];
    let dirs = ArtifactRoot::new(&root.join("cov")).prepare(&demos).unwrap();
    let collector = ArtifactCollector::new(&root.join("CMakeFiles"), &EXTENSIONS);

    touch(&root.join("CMakeFiles/first.dir/first.c.gcda"));
    assert_eq!(collector.collect(&dirs[0]).unwrap(), 1);

    touch(&root.join("CMakeFiles/second.dir/second.c.gcda"));
    assert_eq!(collector.collect(&dirs[1]).unwrap(), 1);

    assert!(!root.join("cov/second_cov/first.c.gcda").exists());
    assert!(root.join("cov/second_cov/second.c.gcda").is_file());
}

#[test]
fn test_same_file_name_twice_is_a_collision() {
    let (_temp_dir, root) = create_build_tree();
    touch(&root.join("CMakeFiles/lib_a.dir/common.c.gcno"));
    touch(&root.join("CMakeFiles/lib_b.dir/common.c.gcno"));

    let dirs = ArtifactRoot::new(&root.join("cov"))
        .prepare(&[DemoUnit::new("demo")])
        .unwrap();
    let collector = ArtifactCollector::new(&root.join("CMakeFiles"), &EXTENSIONS);

    let err = collector.collect(&dirs[0]).unwrap_err();
    assert!(matches!(err, CoverageError::ArtifactCollision(path) if path.ends_with("common.c.gcno")));
}

#[test]
fn test_collect_needs_a_prepared_directory() {
    let (_temp_dir, root) = create_build_tree();
    let dir = ArtifactRoot::new(&root.join("cov")).directory_for(&DemoUnit::new("demo"));
    let collector = ArtifactCollector::new(&root.join("CMakeFiles"), &EXTENSIONS);

    let err = collector.collect(&dir).unwrap_err();
    assert!(matches!(err, CoverageError::MissingArtifactDir(_)));
}

#[test]
fn test_artifact_root_inside_search_root_is_skipped() {
    let (_temp_dir, root) = create_build_tree();
    let artifact_root = root.join("CMakeFiles/cov");
    let dirs = ArtifactRoot::new(&artifact_root)
        .prepare(&[DemoUnit::new("a"), DemoUnit::new("b")])
        .unwrap();
    let collector =
        ArtifactCollector::new(&root.join("CMakeFiles"), &EXTENSIONS).skipping(&artifact_root);

    touch(&root.join("CMakeFiles/a.dir/a.c.gcda"));
    assert_eq!(collector.collect(&dirs[0]).unwrap(), 1);

    // a's collected file sits under the search root but must not move again
    assert_eq!(collector.collect(&dirs[1]).unwrap(), 0);
    assert!(artifact_root.join("a_cov/a.c.gcda").is_file());
}

#[test]
fn test_prepare_wipes_previous_run() {
    let (_temp_dir, root) = create_build_tree();
    let artifact_root = ArtifactRoot::new(&root.join("cov"));
    touch(&root.join("cov/old_cov/old.c.gcda"));

    let dirs = artifact_root.prepare(&[DemoUnit::new("new")]).unwrap();

    assert_eq!(dirs.len(), 1);
    assert!(!root.join("cov/old_cov").exists());
    assert!(root.join("cov/new_cov").is_dir());
    assert_eq!(fs::read_dir(root.join("cov/new_cov")).unwrap().count(), 0);
}

#[test]
fn test_purge_stale_removes_only_coverage_files() {
    let (_temp_dir, root) = create_build_tree();
    touch(&root.join("CMakeFiles/x.dir/x.c.gcda"));
    touch(&root.join("CMakeFiles/x.dir/x.c.o"));

    let collector = ArtifactCollector::new(&root.join("CMakeFiles"), &EXTENSIONS);
    assert_eq!(collector.purge_stale().unwrap(), 1);
    assert!(root.join("CMakeFiles/x.dir/x.c.o").is_file());
}
