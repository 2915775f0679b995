#![no_main]

use ferrite::fuzz_api::resolve_env_refs;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let resolved = resolve_env_refs(data);
    // Resolution never introduces an unterminated reference out of thin air.
    if !data.contains("${") {
        assert_eq!(resolved, data);
    }
});
