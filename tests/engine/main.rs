//! Integration tests for the engine, organized by feature.
//!
//! Everything goes through the public API: build an `Engine`, drive it with
//! `run()` (or `step()` where stepping itself is under test), inspect the
//! completion value or host-side effects.

mod arrays;
mod basics;
mod control_flow;
mod errors;
mod eval_code;
mod functions;
mod host_bridge;
mod objects;
mod regexp_ops;
mod step_api;
mod strict;
mod strings;

use sandjs::{Engine, EngineError, Value};

/// Run a source snippet to completion and return the program's value.
pub fn eval(source: &str) -> Value {
    let mut engine = Engine::new(source).expect("source must parse");
    let paused = engine.run().expect("execution must not throw");
    assert!(!paused, "execution must not suspend on a host async call");
    engine.value()
}

/// Run a source snippet expecting an uncaught guest error.
pub fn eval_err(source: &str) -> EngineError {
    let mut engine = Engine::new(source).expect("source must parse");
    engine.run().expect_err("execution should have thrown")
}

/// Shorthand for numeric results.
pub fn eval_number(source: &str) -> f64 {
    eval(source).as_number().expect("expected a number result")
}

/// Shorthand for string results.
pub fn eval_string(source: &str) -> String {
    eval(source)
        .as_str()
        .expect("expected a string result")
        .to_string()
}

/// Shorthand for boolean results.
pub fn eval_bool(source: &str) -> bool {
    eval(source).as_bool().expect("expected a boolean result")
}
