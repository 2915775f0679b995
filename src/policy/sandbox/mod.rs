use std::path::{Component, Path, PathBuf};

use crate::errors::ToolError;

/// Path sandbox: an ordered set of allowed directory roots plus a set of
/// protected path patterns.
///
/// A path is accepted iff its normalized form resolves under some allowed
/// root and matches no protected pattern. Both checks are pure and
/// deterministic; no filesystem access.
///
/// Protected pattern forms:
/// - `foo/`  — the directory `foo` and everything inside it
/// - `foo/*` — immediate children of `foo` only
/// - `*.ext` — any path whose basename ends in `.ext`
/// - `foo`   — literal basename match
///
/// Multi-segment patterns (`config/secrets.yaml`, `.git/hooks/`) match their
/// component sequence anywhere in the path.
#[derive(Debug, Clone)]
pub struct PathSandbox {
    allowed_roots: Vec<PathBuf>,
    protected_patterns: Vec<String>,
}

impl PathSandbox {
    pub fn new(allowed_roots: Vec<PathBuf>, protected_patterns: Vec<String>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let allowed_roots = allowed_roots
            .into_iter()
            .map(|r| lexical_normalize(&absolutize(&r, &cwd)))
            .collect();
        Self {
            allowed_roots,
            protected_patterns,
        }
    }

    /// Build from config-file root strings, which may lead with `~`.
    pub fn from_config(allowed_roots: &[String], protected_patterns: Vec<String>) -> Self {
        Self::new(
            allowed_roots.iter().map(|r| expand_root(r)).collect(),
            protected_patterns,
        )
    }

    pub fn allowed_roots(&self) -> &[PathBuf] {
        &self.allowed_roots
    }

    /// Validate a path against the sandbox. Returns the normalized absolute
    /// path on success.
    pub fn validate(&self, path: &Path) -> Result<PathBuf, ToolError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let normalized = lexical_normalize(&absolutize(path, &cwd));

        let contained = self
            .allowed_roots
            .iter()
            .any(|root| normalized == *root || normalized.starts_with(root));
        if !contained {
            let roots = self
                .allowed_roots
                .iter()
                .map(|r| r.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ToolError::Policy(format!(
                "path '{}' is outside the allowed directories ({})",
                path.display(),
                roots
            )));
        }

        if let Some(pattern) = self.matching_protected_pattern(&normalized) {
            return Err(ToolError::Policy(format!(
                "path '{}' is protected (matches '{}')",
                path.display(),
                pattern
            )));
        }

        Ok(normalized)
    }

    /// First protected pattern the path matches, if any.
    fn matching_protected_pattern(&self, normalized: &Path) -> Option<&str> {
        let components: Vec<&str> = normalized
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect();

        self.protected_patterns
            .iter()
            .find(|p| pattern_matches(p, &components))
            .map(String::as_str)
    }
}

/// Match a single protected pattern against a path's normal components.
fn pattern_matches(pattern: &str, components: &[&str]) -> bool {
    if components.is_empty() {
        return false;
    }
    let basename = components[components.len() - 1];

    // `*.ext` — basename suffix match
    if let Some(suffix) = pattern.strip_prefix('*') {
        return !suffix.is_empty() && basename.ends_with(suffix);
    }

    // `foo/*` — immediate children of foo only
    if let Some(prefix) = pattern.strip_suffix("/*") {
        let pat: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
        return occurrence_indices(components, &pat)
            .any(|end| components.len() == end + 1);
    }

    // `foo/` — the directory and its contents
    if let Some(prefix) = pattern.strip_suffix('/') {
        let pat: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
        return occurrence_indices(components, &pat).next().is_some();
    }

    // Literal: single-segment patterns match the basename; multi-segment
    // patterns match their component sequence at the end of the path.
    let pat: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    if pat.len() == 1 {
        return basename == pat[0];
    }
    components.len() >= pat.len() && components[components.len() - pat.len()..] == pat[..]
}

/// Iterator over end indices (exclusive) of contiguous occurrences of `pat`
/// inside `components`.
fn occurrence_indices<'a>(
    components: &'a [&'a str],
    pat: &'a [&'a str],
) -> impl Iterator<Item = usize> + 'a {
    let n = pat.len();
    (0..components.len().saturating_sub(n.saturating_sub(1)))
        .filter(move |&i| n > 0 && components[i..].len() >= n && components[i..i + n] == pat[..])
        .map(move |i| i + n)
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Expand a leading `~` in a configured root. Falls back to the literal
/// string when no home directory can be determined.
fn expand_root(raw: &str) -> PathBuf {
    match raw.strip_prefix('~') {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest.trim_start_matches('/')))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

/// Normalize a path lexically (without touching the filesystem).
/// Resolves `.` and `..` components so that `/workspace/../etc/passwd`
/// correctly normalizes to `/etc/passwd` rather than passing through
/// as if it starts with `/workspace`.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                // Pop the last normal component (but never pop past root)
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            Component::CurDir => {}
            other => components.push(other),
        }
    }
    components.iter().collect()
}

#[cfg(test)]
mod tests;
