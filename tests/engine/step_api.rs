//! Host-driven execution: step(), run(), append_code(), value().

use sandjs::{Engine, Value};

#[test]
fn test_step_until_complete() {
    let mut engine = Engine::new("1 + 2 + 3").unwrap();
    let mut steps = 0;
    while engine.step().unwrap() {
        steps += 1;
        assert!(steps < 1000, "too many steps");
    }
    assert!(steps > 1, "stepping should take several visible steps");
    assert_eq!(engine.value().as_number(), Some(6.0));
}

#[test]
fn test_step_on_finished_engine_reports_no_work() {
    let mut engine = Engine::new("1").unwrap();
    engine.run().unwrap();
    assert!(!engine.step().unwrap());
}

#[test]
fn test_step_can_abandon_infinite_loop() {
    let mut engine = Engine::new("while (true) {}").unwrap();
    for _ in 0..500 {
        assert!(engine.step().unwrap(), "loop must keep reporting work");
    }
    // The host simply stops calling; nothing further to assert.
}

#[test]
fn test_run_completes_loop() {
    let mut engine =
        Engine::new("var sum = 0; for (var i = 0; i < 100; i++) { sum += i; } sum").unwrap();
    let paused = engine.run().unwrap();
    assert!(!paused);
    assert_eq!(engine.value().as_number(), Some(4950.0));
}

#[test]
fn test_value_tracks_latest_expression() {
    let mut engine = Engine::new("1 + 1;").unwrap();
    engine.run().unwrap();
    assert_eq!(engine.value().as_number(), Some(2.0));

    let mut engine = Engine::new("'a'; 'b';").unwrap();
    engine.run().unwrap();
    assert_eq!(engine.value().as_str(), Some("b"));
}

#[test]
fn test_append_code() {
    let mut engine = Engine::new("var a = 40;").unwrap();
    engine.run().unwrap();
    engine.append_code("a + 2").unwrap();
    engine.run().unwrap();
    assert_eq!(engine.value().as_number(), Some(42.0));
}

#[test]
fn test_append_code_hoists_into_global() {
    let mut engine = Engine::new("var a = 1;").unwrap();
    engine.run().unwrap();
    engine.append_code("function f() { return a + b; } var b = 2;").unwrap();
    engine.run().unwrap();
    engine.append_code("f()").unwrap();
    engine.run().unwrap();
    assert_eq!(engine.value().as_number(), Some(3.0));
}

#[test]
fn test_append_preserves_existing_values() {
    let mut engine = Engine::new("var counter = 10;").unwrap();
    engine.run().unwrap();
    // Re-declaring the same var must not reset it.
    engine.append_code("var counter; counter").unwrap();
    engine.run().unwrap();
    assert_eq!(engine.value().as_number(), Some(10.0));
}

#[test]
fn test_stepping_mixed_with_run() {
    let mut engine = Engine::new("var n = 0; n++; n++; n++; n").unwrap();
    engine.step().unwrap();
    engine.step().unwrap();
    let paused = engine.run().unwrap();
    assert!(!paused);
    assert_eq!(engine.value().as_number(), Some(3.0));
}

#[test]
fn test_paused_flag_without_async_is_false() {
    let mut engine = Engine::new("1 + 1").unwrap();
    assert!(!engine.paused());
    engine.run().unwrap();
    assert!(!engine.paused());
}

#[test]
fn test_polyfill_frames_do_not_surface() {
    // Array.prototype.map is guest source; stepping a program that uses it
    // must still terminate through step() alone.
    let mut engine = Engine::new("[1, 2, 3].map(function(x) { return x + 1; }).length").unwrap();
    let mut steps = 0;
    while engine.step().unwrap() {
        steps += 1;
        assert!(steps < 100_000, "runaway stepping");
    }
    assert_eq!(engine.value().as_number(), Some(3.0));
}

#[test]
fn test_from_ast() {
    let body = sandjs::Parser::new("2 + 3").unwrap().parse_program().unwrap();
    let mut engine = Engine::from_ast(body, sandjs::EngineConfig::default()).unwrap();
    engine.run().unwrap();
    assert_eq!(engine.value(), Value::Number(5.0));
}
