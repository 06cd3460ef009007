//! Edge case and error handling tests for treestat


use harness::{TestTree, run_json, run_treestat};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

// ============================================================================
// Symlink Edge Cases
// ============================================================================

#[test]
#[cfg(unix)]
fn test_symlink_to_directory_is_not_followed() {
    let tree = TestTree::new();
    tree.add_file("realdir/file.rs", "fn file() {}");
    tree.add_symlink("linkdir", "realdir");

    let json = run_json(tree.path(), &["--stat", "type"]);
    // realdir, realdir/file.rs, linkdir
    assert_eq!(json["entries"], 3);
    assert_eq!(json["stats"]["type"]["symlink"], 1);
    assert_eq!(json["stats"]["type"]["file"], 1);
}

#[test]
#[cfg(unix)]
fn test_symlink_to_parent_no_infinite_loop() {
    let tree = TestTree::new();
    tree.add_file("subdir/file.rs", "fn file() {}");
    tree.add_symlink("subdir/parent", "..");

    let json = run_json(tree.path(), &["--stat", "type", "--jobs", "2"]);
    assert_eq!(json["entries"], 3);
}

#[test]
#[cfg(unix)]
fn test_broken_and_self_referential_symlinks() {
    let tree = TestTree::new();
    tree.add_file("real.rs", "fn real() {}");
    tree.add_symlink("broken_link.rs", "nonexistent.rs");
    tree.add_symlink("selfref", "selfref");

    let json = run_json(tree.path(), &["--stat", "type,ext"]);
    assert_eq!(json["stats"]["type"]["symlink"], 2);
    // Extension counts plain files only
    assert_eq!(json["stats"]["ext"]["rs"], 1);
}

#[test]
#[cfg(unix)]
fn test_symlinks_have_no_size_or_lines() {
    let tree = TestTree::new();
    tree.add_file("a.txt", "one\ntwo\n");
    tree.add_symlink("b.txt", "a.txt");

    let json = run_json(tree.path(), &["--stat", "lines,size", "--per-file"]);
    assert_eq!(json["stats"]["lines"].as_object().unwrap().len(), 1);
    assert_eq!(json["stats"]["size"].as_object().unwrap().len(), 1);
}

// ============================================================================
// Permission Error Handling
// ============================================================================

/// Root ignores permission bits, so some checks only hold for other users.
#[cfg(unix)]
fn permissions_enforced(path: &std::path::Path) -> bool {
    if path.is_dir() {
        fs::read_dir(path).is_err()
    } else {
        fs::read(path).is_err()
    }
}

#[test]
#[cfg(unix)]
fn test_unreadable_directory() {
    let tree = TestTree::new();
    tree.add_file("readable/file.rs", "fn readable() {}");
    let unreadable = tree.add_dir("unreadable");
    fs::write(unreadable.join("secret.rs"), "fn hidden() {}").expect("Failed to write file");

    let mut perms = fs::metadata(&unreadable).unwrap().permissions();
    perms.set_mode(0o000);
    fs::set_permissions(&unreadable, perms).expect("Failed to set permissions");
    let enforced = permissions_enforced(&unreadable);

    let (stdout, stderr, success) =
        run_treestat(tree.path(), &["--format", "json", "--stat", "type"]);

    // Restore permissions for cleanup
    let mut perms = fs::metadata(&unreadable).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&unreadable, perms).expect("Failed to restore permissions");

    assert!(success, "unreadable directories are not fatal: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    if enforced {
        // readable, readable/file.rs, unreadable
        assert_eq!(json["entries"], 3);
        assert!(stderr.contains("cannot read directory"), "stderr: {}", stderr);
    } else {
        assert_eq!(json["entries"], 4);
    }
}

#[test]
#[cfg(unix)]
fn test_unreadable_file_counts_zero_lines() {
    let tree = TestTree::new();
    let file_path = tree.add_file("locked.txt", "a\nb\nc\n");

    let mut perms = fs::metadata(&file_path).unwrap().permissions();
    perms.set_mode(0o000);
    fs::set_permissions(&file_path, perms).expect("Failed to set permissions");
    let enforced = permissions_enforced(&file_path);

    let (stdout, stderr, success) =
        run_treestat(tree.path(), &["--format", "json", "--stat", "lines"]);

    let mut perms = fs::metadata(&file_path).unwrap().permissions();
    perms.set_mode(0o644);
    fs::set_permissions(&file_path, perms).expect("Failed to restore permissions");

    assert!(success, "unreadable files are not fatal");
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let key = file_path.display().to_string();
    if enforced {
        assert_eq!(json["stats"]["lines"][&key], 0);
        assert!(stderr.contains("cannot count lines"), "stderr: {}", stderr);
    } else {
        assert_eq!(json["stats"]["lines"][&key], 3);
    }
}

#[test]
#[cfg(unix)]
fn test_readonly_per_dir() {
    let tree = TestTree::new();
    let locked = tree.add_file("docs/locked.txt", "x");
    tree.add_file("docs/open.txt", "y");

    let mut perms = fs::metadata(&locked).unwrap().permissions();
    perms.set_mode(0o444);
    fs::set_permissions(&locked, perms).unwrap();

    let json = run_json(tree.path(), &["--stat", "readonly-per-dir,perm"]);
    let docs = tree.path().join("docs").display().to_string();
    assert_eq!(json["stats"]["readonly-per-dir"][&docs]["file"], 1);
    assert_eq!(json["stats"]["perm"]["0444"], 1);
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_excluded_directory_subtree_is_skipped() {
    let tree = TestTree::new();
    tree.add_file("src/main.rs", "fn main() {}");
    tree.add_file("node_modules/pkg/index.js", "module.exports = 1;");
    tree.add_file("node_modules/pkg/lib/util.js", "");

    let json = run_json(tree.path(), &["--exclude-dir", "node_modules"]);
    assert_eq!(json["entries"], 2);
}

#[test]
fn test_exclude_dir_does_not_match_files() {
    let tree = TestTree::new();
    tree.add_file("build", "not a directory");
    tree.add_file("build.d/out.o", "");

    let json = run_json(tree.path(), &["--exclude-dir", "build"]);
    assert_eq!(json["entries"], 3);
}

#[test]
fn test_exclude_file_and_extension() {
    let tree = TestTree::new();
    tree.add_file("keep.rs", "");
    tree.add_file("Cargo.lock", "");
    tree.add_file("debug.log", "");
    tree.add_file("trace.LOG", "");

    let json = run_json(
        tree.path(),
        &["--exclude-file", "Cargo.lock", "--exclude-ext", ".log", "--stat", "ext"],
    );
    assert_eq!(json["entries"], 1);
    assert_eq!(json["stats"]["ext"]["rs"], 1);
}

#[test]
fn test_exclude_glob_matches_basenames() {
    let tree = TestTree::new();
    tree.add_file("a/test_one.rs", "");
    tree.add_file("a/two.rs", "");
    tree.add_file("test_dir/inner.rs", "");

    let json = run_json(tree.path(), &["--exclude-glob", "test_*"]);
    // a, a/two.rs
    assert_eq!(json["entries"], 2);
}

#[test]
fn test_ignore_hidden() {
    let tree = TestTree::sample();
    tree.add_file(".git/HEAD", "ref: refs/heads/main\n");

    let all = run_json(tree.path(), &[]);
    let visible = run_json(tree.path(), &["--ignore-hidden"]);
    assert_eq!(all["entries"], 11);
    assert_eq!(visible["entries"], 8);
}

#[test]
fn test_ignore_hidden_applies_to_every_stat() {
    let tree = TestTree::sample();
    tree.add_file(".git/HEAD", "ref: refs/heads/main\n");
    tree.add_file("src/.env", "A=1\n");
    let args = ["--stat", "lines,size,hidden-per-dir", "--per-file"];

    let all = run_json(tree.path(), &args);
    assert!(!all["stats"]["hidden-per-dir"].as_object().unwrap().is_empty());

    let mut hidden_args = args.to_vec();
    hidden_args.push("--ignore-hidden");
    let visible = run_json(tree.path(), &hidden_args);
    let root = tree.path().display().to_string();
    for stat in ["lines", "size"] {
        for key in visible["stats"][stat].as_object().unwrap().keys() {
            let relative = key.strip_prefix(&root).unwrap_or(key);
            assert!(!relative.contains("/."), "hidden path in {}: {}", stat, key);
        }
    }
    assert_eq!(visible["stats"]["lines"].as_object().unwrap().len(), 5);
    assert!(visible["stats"]["hidden-per-dir"].as_object().unwrap().is_empty());
}

#[test]
fn test_hidden_per_dir() {
    let tree = TestTree::new();
    tree.add_file("cfg/.env", "A=1\n");
    tree.add_file("cfg/.env.local", "A=2\n");
    tree.add_file("cfg/app.toml", "");

    let json = run_json(tree.path(), &["--stat", "hidden-per-dir"]);
    let cfg = tree.path().join("cfg").display().to_string();
    assert_eq!(json["stats"]["hidden-per-dir"][&cfg]["file"], 2);
    assert_eq!(json["stats"]["hidden-per-dir"][&cfg]["dir"], 0);
}

#[test]
fn test_archives_per_dir() {
    let tree = TestTree::new();
    tree.add_sized("dist/release.tar.gz", 10);
    tree.add_sized("dist/source.tar", 10);
    tree.add_sized("dist/readme.txt", 10);

    let json = run_json(tree.path(), &["--stat", "archives-per-dir"]);
    let dist = tree.path().join("dist").display().to_string();
    assert_eq!(json["stats"]["archives-per-dir"][&dist]["file"], 2);
}

// ============================================================================
// Line Counting
// ============================================================================

#[test]
fn test_line_endings() {
    let tree = TestTree::new();
    let crlf = tree.add_file("crlf.txt", "a\r\nb\r\n");
    let cr = tree.add_file("cr.txt", "a\rb\rc");
    let open = tree.add_file("open.txt", "a\nb");
    let empty = tree.add_file("empty.txt", "");

    let json = run_json(tree.path(), &["--stat", "lines"]);
    let lines = &json["stats"]["lines"];
    assert_eq!(lines[&crlf.display().to_string()], 2);
    assert_eq!(lines[&cr.display().to_string()], 3);
    assert_eq!(lines[&open.display().to_string()], 2);
    assert_eq!(lines[&empty.display().to_string()], 0);
}

#[test]
fn test_binary_file_falls_back_to_byte_mode() {
    let tree = TestTree::new();
    let bin = tree.write_bytes("blob.bin", &[0xff, 0xfe, b'\n', 0x80, b'\r', b'\n', 0x81]);

    let json = run_json(tree.path(), &["--stat", "lines"]);
    // Two '\n' bytes plus the unterminated tail
    assert_eq!(json["stats"]["lines"][&bin.display().to_string()], 3);
}

// ============================================================================
// Special Trees and Names
// ============================================================================

#[test]
fn test_empty_root() {
    let tree = TestTree::new();

    let json = run_json(tree.path(), &["--percentiles", "--size-ranges"]);
    assert_eq!(json["entries"], 0);
    assert_eq!(json["size_summary"]["p50"], 0);
    assert_eq!(json["size_summary"]["total_files"], 0);
    let ranges = json["size_ranges"].as_array().unwrap();
    assert!(ranges.iter().all(|r| r["count"] == 0));
}

#[test]
fn test_filenames_with_spaces_and_unicode() {
    let tree = TestTree::new();
    let spaced = tree.add_file("file with spaces.txt", "x\n");
    let unicode = tree.add_file("日本語/ファイル.TXT", "y\n");

    let json = run_json(tree.path(), &["--stat", "lines,ext"]);
    assert_eq!(json["stats"]["lines"][&spaced.display().to_string()], 1);
    assert_eq!(json["stats"]["lines"][&unicode.display().to_string()], 1);
    assert_eq!(json["stats"]["ext"]["txt"], 2);
}

#[test]
fn test_deep_nesting() {
    let tree = TestTree::new();
    let deep = (0..40).map(|i| format!("d{}", i)).collect::<Vec<_>>().join("/");
    tree.add_file(&format!("{}/leaf.txt", deep), "");

    let json = run_json(tree.path(), &["--jobs", "3"]);
    assert_eq!(json["entries"], 41);
}

#[test]
fn test_repeated_runs_are_identical() {
    let tree = TestTree::sample();
    let args = ["--stat", "type,size,ext,files-per-dir"];

    let mut first = run_json(tree.path(), &args);
    let mut second = run_json(tree.path(), &args);
    first["elapsed_seconds"] = 0.into();
    second["elapsed_seconds"] = 0.into();
    assert_eq!(first, second);
}
