use tokio::process::Command;

/// Environment passed through to the children this crate spawns: the bash
/// tool's `sh`, the ripgrep adapter, and MCP servers. `PATH`/`HOME` for
/// binary and config resolution, locale and terminal basics, `TMPDIR` for
/// scratch space. Everything else, API keys above all, is withheld; MCP
/// servers get their extra variables explicitly from config.
const PASSTHROUGH_ENV: &[&str] = &["PATH", "HOME", "LANG", "LC_ALL", "TERM", "TMPDIR"];

/// Create a `Command` whose environment contains only the passthrough set.
pub fn scrubbed_command(program: &str) -> Command {
    let mut cmd = Command::new(program);
    cmd.env_clear();
    cmd.envs(std::env::vars().filter(|(name, _)| PASSTHROUGH_ENV.contains(&name.as_str())));
    cmd
}

#[cfg(test)]
mod tests;
