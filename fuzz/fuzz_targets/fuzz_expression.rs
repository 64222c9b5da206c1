#![no_main]
use libfuzzer_sys::fuzz_target;
use sst_core::expression::{Scope, compile};

fuzz_target!(|data: &str| {
    // Compilation may reject the input but must not panic, and anything that
    // compiles must evaluate without panicking.
    let mut scope = Scope::default();
    let _ = scope.push("sample");
    if let Ok(program) = compile(data, &scope) {
        let _ = program.eval(&[0.0], 0, 1.0);
    }
});
