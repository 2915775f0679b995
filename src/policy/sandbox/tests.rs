use super::*;
use proptest::prelude::*;
use std::path::PathBuf;

fn sandbox(patterns: &[&str]) -> PathSandbox {
    PathSandbox::new(
        vec![PathBuf::from("/workspace")],
        patterns.iter().map(|s| (*s).to_string()).collect(),
    )
}

#[test]
fn test_accepts_path_under_root() {
    let sb = sandbox(&[]);
    let p = sb.validate(Path::new("/workspace/src/main.rs")).unwrap();
    assert_eq!(p, PathBuf::from("/workspace/src/main.rs"));
}

#[test]
fn test_accepts_root_itself() {
    let sb = sandbox(&[]);
    assert!(sb.validate(Path::new("/workspace")).is_ok());
}

#[test]
fn test_rejects_path_outside_roots() {
    let sb = sandbox(&[]);
    let err = sb.validate(Path::new("/etc/passwd")).unwrap_err();
    assert_eq!(err.kind(), "policy");
    assert!(err.to_string().contains("outside the allowed directories"));
}

#[test]
fn test_rejects_traversal_escape() {
    let sb = sandbox(&[]);
    let err = sb
        .validate(Path::new("/workspace/../etc/passwd"))
        .unwrap_err();
    assert_eq!(err.kind(), "policy");
}

#[test]
fn test_normalizes_redundant_segments() {
    let sb = sandbox(&[]);
    let p = sb
        .validate(Path::new("/workspace/./a//b/../c.txt"))
        .unwrap();
    assert_eq!(p, PathBuf::from("/workspace/a/c.txt"));
}

#[test]
fn test_dir_pattern_protects_contents() {
    let sb = sandbox(&[".git/"]);
    let err = sb.validate(Path::new("/workspace/.git/config")).unwrap_err();
    assert!(err.to_string().contains("protected"));
    // The directory itself is also protected
    assert!(sb.validate(Path::new("/workspace/.git")).is_err());
    // Deeply nested contents too
    assert!(
        sb.validate(Path::new("/workspace/.git/hooks/pre-commit"))
            .is_err()
    );
}

#[test]
fn test_star_pattern_protects_immediate_children_only() {
    let sb = sandbox(&["secrets/*"]);
    assert!(sb.validate(Path::new("/workspace/secrets/key.pem")).is_err());
    // The directory itself and deeper paths are not covered by `/*`
    assert!(sb.validate(Path::new("/workspace/secrets")).is_ok());
    assert!(
        sb.validate(Path::new("/workspace/secrets/sub/key.pem"))
            .is_ok()
    );
}

#[test]
fn test_extension_pattern_matches_basename() {
    let sb = sandbox(&["*.pem"]);
    assert!(sb.validate(Path::new("/workspace/a/server.pem")).is_err());
    assert!(sb.validate(Path::new("/workspace/pem.txt")).is_ok());
}

#[test]
fn test_literal_leaf_pattern() {
    let sb = sandbox(&[".env"]);
    assert!(sb.validate(Path::new("/workspace/.env")).is_err());
    assert!(sb.validate(Path::new("/workspace/deep/.env")).is_err());
    assert!(sb.validate(Path::new("/workspace/.env.example")).is_ok());
}

#[test]
fn test_multi_segment_literal_pattern() {
    let sb = sandbox(&[".git/config"]);
    assert!(sb.validate(Path::new("/workspace/.git/config")).is_err());
    assert!(sb.validate(Path::new("/workspace/.git/other")).is_ok());
}

#[test]
fn test_relative_paths_resolve_against_cwd() {
    let cwd = std::env::current_dir().unwrap();
    let sb = PathSandbox::new(vec![cwd.clone()], vec![]);
    let p = sb.validate(Path::new("some/file.txt")).unwrap();
    assert!(p.starts_with(&cwd));
}

#[test]
fn test_multiple_roots() {
    let sb = PathSandbox::new(
        vec![PathBuf::from("/workspace"), PathBuf::from("/tmp/scratch")],
        vec![],
    );
    assert!(sb.validate(Path::new("/tmp/scratch/x")).is_ok());
    assert!(sb.validate(Path::new("/tmp/other")).is_err());
}

#[test]
fn test_from_config_expands_home_roots() {
    if let Some(home) = dirs::home_dir() {
        let sb = PathSandbox::from_config(&["~/workspace".to_string()], vec![]);
        assert_eq!(sb.allowed_roots(), &[home.join("workspace")]);
        assert!(sb.validate(&home.join("workspace/file.txt")).is_ok());
    }
    // Non-tilde roots pass through untouched.
    let sb = PathSandbox::from_config(&["/srv/data".to_string()], vec![]);
    assert_eq!(sb.allowed_roots(), &[PathBuf::from("/srv/data")]);
}

#[test]
fn test_lexical_normalize_never_pops_past_root() {
    assert_eq!(
        lexical_normalize(Path::new("/../../etc")),
        PathBuf::from("/etc")
    );
}

proptest! {
    // Containment invariant: any accepted path lies under some allowed root
    // and matches no protected pattern.
    #[test]
    fn prop_accepted_paths_are_contained(segments in proptest::collection::vec("[a-z.]{1,8}", 0..6)) {
        let sb = sandbox(&[".git/", "*.pem", ".env"]);
        let mut p = PathBuf::from("/workspace");
        for s in &segments {
            p.push(s);
        }
        if let Ok(normalized) = sb.validate(&p) {
            prop_assert!(normalized.starts_with("/workspace"));
            let as_str = normalized.to_string_lossy().into_owned();
            prop_assert!(!as_str.split('/').any(|c| c == ".git"));
            prop_assert!(!as_str.ends_with(".pem"));
            prop_assert!(!as_str.ends_with("/.env"));
        }
    }
}
