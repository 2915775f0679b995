// Shared test helpers — not all items used by every test binary.
#![allow(unused)]

use ferrite::config::Config;
use ferrite::tools::{ToolArgs, ToolRegistry, ToolResult};
use serde_json::Value;
use std::path::Path;
use std::sync::Once;
use tokio_util::sync::CancellationToken;

static INIT_TRACING: Once = Once::new();

/// Route tracing output through the test harness; honours RUST_LOG.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Config whose sandbox is rooted at the given directory, with bash allowed
/// to run the usual test commands.
pub fn config_rooted_at(root: &Path) -> Config {
    let mut config = Config::default();
    config.tools.sandbox.allowed_paths = vec![root.display().to_string()];
    config
}

pub fn args(pairs: &[(&str, Value)]) -> ToolArgs {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

pub async fn dispatch(registry: &ToolRegistry, name: &str, a: ToolArgs) -> ToolResult {
    init_tracing();
    registry
        .dispatch(name, a, CancellationToken::new())
        .await
        .expect("dispatch should not fault")
}
