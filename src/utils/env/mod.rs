use regex::Regex;
use std::sync::OnceLock;

/// Matches `${NAME}` references inside config string values.
fn env_ref_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static pattern"))
}

/// Resolve `${NAME}` references from the process environment at call time.
///
/// Unset variables resolve to the empty string so that secrets never
/// round-trip through config files. Literal text without references passes
/// through unchanged.
pub fn resolve_env_refs(value: &str) -> String {
    if !value.contains("${") {
        return value.to_string();
    }
    env_ref_pattern()
        .replace_all(value, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// Display server detected from the session environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    Wayland,
    X11,
    None,
}

/// Detect the display server for computer-use actions.
/// `WAYLAND_DISPLAY` wins over `DISPLAY` when both are set.
pub fn detect_display_server() -> DisplayServer {
    if std::env::var_os("WAYLAND_DISPLAY").is_some_and(|v| !v.is_empty()) {
        DisplayServer::Wayland
    } else if std::env::var_os("DISPLAY").is_some_and(|v| !v.is_empty()) {
        DisplayServer::X11
    } else {
        DisplayServer::None
    }
}

#[cfg(test)]
mod tests;
