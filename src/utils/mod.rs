pub mod env;
pub mod http;
pub mod ratelimit;
pub mod subprocess;

/// Cap a string at `max_chars` characters, appending `suffix` (e.g. `"…"`)
/// when anything was cut. Used for argument previews and error snippets,
/// which are length-bounded by characters, not bytes.
pub fn truncate_chars(s: &str, max_chars: usize, suffix: &str) -> String {
    let mut chars = s.char_indices();
    match chars.nth(max_chars) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}{}", &s[..cut], suffix),
    }
}

#[cfg(test)]
mod tests;
