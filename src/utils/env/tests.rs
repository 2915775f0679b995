use super::*;

#[test]
fn test_resolve_plain_string_unchanged() {
    assert_eq!(resolve_env_refs("no refs here"), "no refs here");
    assert_eq!(resolve_env_refs(""), "");
}

#[test]
fn test_resolve_single_ref() {
    unsafe { std::env::set_var("FERRITE_TEST_TOKEN", "sekrit") };
    assert_eq!(resolve_env_refs("${FERRITE_TEST_TOKEN}"), "sekrit");
    unsafe { std::env::remove_var("FERRITE_TEST_TOKEN") };
}

#[test]
fn test_resolve_embedded_ref() {
    unsafe { std::env::set_var("FERRITE_TEST_HOST", "agent.local") };
    assert_eq!(
        resolve_env_refs("http://${FERRITE_TEST_HOST}:8080"),
        "http://agent.local:8080"
    );
    unsafe { std::env::remove_var("FERRITE_TEST_HOST") };
}

#[test]
fn test_unset_ref_resolves_empty() {
    assert_eq!(resolve_env_refs("${FERRITE_DEFINITELY_UNSET_VAR}"), "");
}

#[test]
fn test_malformed_refs_pass_through() {
    assert_eq!(resolve_env_refs("${not closed"), "${not closed");
    assert_eq!(resolve_env_refs("$NAME"), "$NAME");
    assert_eq!(resolve_env_refs("${1BAD}"), "${1BAD}");
}
