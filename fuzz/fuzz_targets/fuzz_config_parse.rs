#![no_main]

use ferrite::config::Config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must parse or error, never panic.
    let _ = Config::from_toml(data);
});
