use super::*;
use std::ffi::OsStr;

#[test]
fn test_secrets_are_withheld() {
    unsafe { std::env::set_var("FERRITE_API_KEY", "should-not-leak") };
    let cmd = scrubbed_command("echo");
    let envs: Vec<_> = cmd.as_std().get_envs().collect();
    assert!(
        !envs
            .iter()
            .any(|(k, _)| *k == OsStr::new("FERRITE_API_KEY")),
        "non-passthrough env var leaked to child"
    );
    unsafe { std::env::remove_var("FERRITE_API_KEY") };
}

#[test]
fn test_path_passes_through() {
    if std::env::var("PATH").is_ok() {
        let cmd = scrubbed_command("echo");
        let envs: Vec<_> = cmd.as_std().get_envs().collect();
        assert!(envs.iter().any(|(k, _)| *k == OsStr::new("PATH")));
    }
}

#[test]
fn test_only_passthrough_names_survive() {
    let cmd = scrubbed_command("echo");
    for (name, _) in cmd.as_std().get_envs() {
        let name = name.to_string_lossy();
        assert!(
            PASSTHROUGH_ENV.contains(&name.as_ref()),
            "unexpected env var '{}' in child environment",
            name
        );
    }
}
