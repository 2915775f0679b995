#![no_main]

use ferrite::fuzz_api::PathSandbox;
use libfuzzer_sys::fuzz_target;
use std::path::{Path, PathBuf};

fuzz_target!(|data: (&str, &str)| {
    let (pattern, path) = data;
    let sandbox = PathSandbox::new(
        vec![PathBuf::from("/workspace")],
        vec![pattern.to_string()],
    );
    // Must never panic, and accepted paths must stay under the root.
    if let Ok(normalized) = sandbox.validate(Path::new(path)) {
        assert!(normalized.starts_with("/workspace"));
    }
});
