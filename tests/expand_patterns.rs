use std::fs::File;
use std::path::{Path, PathBuf};

use taskmake::errors::BuildError;
use taskmake::fs::RealFileSystem;
use taskmake::fs::mock::{MockFileSystem, at};
use taskmake::pattern::expand;

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn paths(list: &[&str]) -> Vec<PathBuf> {
    list.iter().map(PathBuf::from).collect()
}

fn source_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("src/a.c", at(1));
    fs.add_file("src/b.c", at(1));
    fs.add_file("src/readme.md", at(1));
    fs.add_file("src/sub/c.c", at(1));
    fs.add_dir("src/dir.c");
    fs
}

#[test]
fn star_matches_files_in_one_directory() {
    let fs = source_tree();
    let result = expand(&fs, &patterns(&["src/*.c"]), Path::new("."));

    assert_eq!(result.files, paths(&["src/a.c", "src/b.c"]));
    assert!(result.warnings.is_empty());
}

#[test]
fn double_star_recurses_into_subdirectories() {
    let fs = source_tree();
    let result = expand(&fs, &patterns(&["src/**/*.c"]), Path::new("."));

    assert_eq!(result.files, paths(&["src/a.c", "src/b.c", "src/sub/c.c"]));
}

#[test]
fn trailing_double_star_collects_every_file() {
    let fs = source_tree();
    let result = expand(&fs, &patterns(&["src/**"]), Path::new("."));

    assert_eq!(
        result.files,
        paths(&["src/a.c", "src/b.c", "src/readme.md", "src/sub/c.c"])
    );
}

#[test]
fn literal_patterns_are_kept_even_when_missing() {
    let fs = source_tree();
    let result = expand(&fs, &patterns(&["missing.txt", "src/a.c"]), Path::new("."));

    assert_eq!(result.files, paths(&["missing.txt", "src/a.c"]));
}

#[test]
fn overlapping_patterns_are_deduplicated() {
    let fs = source_tree();
    let result = expand(
        &fs,
        &patterns(&["src/*.c", "src/a.c", "./src/*.c"]),
        Path::new("."),
    );

    assert_eq!(result.files, paths(&["src/a.c", "src/b.c"]));
}

#[test]
fn patterns_resolve_against_cwd() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/a.c", at(1));
    let result = expand(&fs, &patterns(&["src/*.c"]), Path::new("/proj"));

    assert_eq!(result.files, paths(&["/proj/src/a.c"]));
}

#[test]
fn unreadable_directory_only_drops_its_branch() {
    let fs = source_tree();
    fs.deny_read("src/sub");
    let result = expand(&fs, &patterns(&["src/**/*.c"]), Path::new("."));

    assert_eq!(result.files, paths(&["src/a.c", "src/b.c"]));
    assert_eq!(result.warnings.len(), 1);
    assert!(matches!(
        &result.warnings[0],
        BuildError::DirectoryRead { dir, .. } if dir == Path::new("src/sub")
    ));
    assert!(result.warnings[0]
        .to_string()
        .starts_with("Warning: Cannot read directory src/sub"));
}

#[test]
fn missing_base_directory_yields_nothing() {
    let fs = source_tree();
    let result = expand(&fs, &patterns(&["nowhere/*.c"]), Path::new("."));

    assert!(result.files.is_empty());
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn expands_a_real_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    File::create(root.join("a.txt")).unwrap();
    File::create(root.join("b.txt")).unwrap();
    File::create(root.join("c.log")).unwrap();
    std::fs::create_dir(root.join("d.txt")).unwrap();

    let result = expand(&RealFileSystem, &patterns(&["*.txt"]), root);

    assert_eq!(result.files, vec![root.join("a.txt"), root.join("b.txt")]);
    assert!(result.warnings.is_empty());
}
