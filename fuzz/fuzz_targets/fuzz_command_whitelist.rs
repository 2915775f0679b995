#![no_main]

use ferrite::fuzz_api::CommandWhitelist;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, &str)| {
    let (pattern, command) = data;
    // Pattern compilation may fail; matching must never panic.
    if let Ok(whitelist) = CommandWhitelist::new(
        vec!["ls".to_string(), "git".to_string()],
        &[pattern.to_string()],
    ) {
        let _ = whitelist.is_whitelisted(command);
    }
});
