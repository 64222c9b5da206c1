#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must either decode or fail with NotSst; never panic.
    let _ = sst_format::decode(data);
});
