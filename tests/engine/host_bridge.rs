//! Host ↔ guest integration: injected functions, value conversion, async
//! suspension and resumption.

use std::cell::RefCell;
use std::rc::Rc;

use sandjs::{
    AsyncHandle, Engine, EngineConfig, EngineError, HostValue, Property, Value,
};

/// Install a named native function on the global object.
fn install_native(
    interp: &mut sandjs::Interpreter,
    global: &sandjs::ObjectRef,
    name: &str,
    arity: usize,
    func: impl Fn(&mut sandjs::Interpreter, Value, &[Value]) -> Result<Value, sandjs::Raise> + 'static,
) {
    let func = interp.create_native_function(name, Rc::new(func), arity, false);
    interp.define_value(global, name, Property::builtin(Value::Object(func)));
}

#[test]
fn test_native_functions_and_shared_counter() {
    let counter = Rc::new(RefCell::new(0.0f64));
    let set_side = counter.clone();
    let get_side = counter.clone();

    let mut engine = Engine::with_init(
        "setVal(2); setVal(getVal() + 2);",
        EngineConfig::default(),
        move |interp, global| {
            install_native(interp, &global, "setVal", 1, move |_interp, _this, args| {
                *set_side.borrow_mut() = args[0].to_number();
                Ok(Value::Undefined)
            });
            install_native(interp, &global, "getVal", 0, move |_interp, _this, _args| {
                Ok(Value::Number(*get_side.borrow()))
            });
        },
    )
    .unwrap();

    let paused = engine.run().unwrap();
    assert!(!paused);
    assert_eq!(*counter.borrow(), 4.0);
}

#[test]
fn test_throw_before_native_call_keeps_host_untouched() {
    let counter = Rc::new(RefCell::new(0));
    let side = counter.clone();

    let mut engine = Engine::with_init(
        "throw 'horrible err'; setVal(2);",
        EngineConfig::default(),
        move |interp, global| {
            install_native(interp, &global, "setVal", 1, move |_interp, _this, _args| {
                *side.borrow_mut() += 1;
                Ok(Value::Undefined)
            });
        },
    )
    .unwrap();

    let error = engine.run().unwrap_err();
    let EngineError::Uncaught { message, .. } = error else {
        panic!("expected an uncaught guest error");
    };
    assert_eq!(message, "horrible err");
    assert_eq!(*counter.borrow(), 0);
}

#[test]
fn test_export_object_preserves_order() {
    let exported: Rc<RefCell<Option<HostValue>>> = Rc::new(RefCell::new(None));
    let side = exported.clone();

    let mut engine = Engine::with_init(
        r#"var a = {str: "abc", n: 4}; exportObj(a);"#,
        EngineConfig::default(),
        move |interp, global| {
            install_native(interp, &global, "exportObj", 1, move |interp, _this, args| {
                *side.borrow_mut() = Some(interp.pseudo_to_native(&args[0])?);
                Ok(Value::Undefined)
            });
        },
    )
    .unwrap();

    engine.run().unwrap();
    let observed = exported.borrow_mut().take().expect("exportObj was called");
    assert_eq!(
        observed,
        HostValue::Object(vec![
            ("str".to_string(), HostValue::String("abc".to_string())),
            ("n".to_string(), HostValue::Number(4.0)),
        ])
    );
}

#[test]
fn test_native_to_pseudo_installs_host_data() {
    let mut engine = Engine::with_init(
        "config.retries + config.names.length",
        EngineConfig::default(),
        |interp, global| {
            let host = HostValue::Object(vec![
                ("retries".to_string(), HostValue::Number(3.0)),
                (
                    "names".to_string(),
                    HostValue::Array(vec![
                        HostValue::String("a".to_string()),
                        HostValue::String("b".to_string()),
                    ]),
                ),
            ]);
            let guest = interp.native_to_pseudo(&host).unwrap();
            interp.define_value(&global, "config", Property::data(guest));
        },
    )
    .unwrap();
    engine.run().unwrap();
    assert_eq!(engine.value().as_number(), Some(5.0));
}

#[test]
fn test_host_function_via_bridge() {
    let mut engine = Engine::with_init(
        "double(21)",
        EngineConfig::default(),
        |interp, global| {
            let host = HostValue::Function {
                name: "double".to_string(),
                func: Rc::new(|_interp, _this, args: &[Value]| {
                    Ok(Value::Number(args[0].to_number() * 2.0))
                }),
                arity: 1,
            };
            let guest = interp.native_to_pseudo(&host).unwrap();
            interp.define_value(&global, "double", Property::data(guest));
        },
    )
    .unwrap();
    engine.run().unwrap();
    assert_eq!(engine.value().as_number(), Some(42.0));
}

#[test]
fn test_guest_error_from_native() {
    let mut engine = Engine::with_init(
        "var r; try { explode(); } catch (e) { r = e.name + ':' + e.message; } r",
        EngineConfig::default(),
        |interp, global| {
            install_native(interp, &global, "explode", 0, |_interp, _this, _args| {
                Err(sandjs::Raise::type_error("from host"))
            });
        },
    )
    .unwrap();
    engine.run().unwrap();
    assert_eq!(engine.value().as_str(), Some("TypeError:from host"));
}

/// Host side of the async tests: pending (callback, handle) pairs.
type Scheduled = Rc<RefCell<Vec<(Value, AsyncHandle)>>>;

fn install_defer(interp: &mut sandjs::Interpreter, global: &sandjs::ObjectRef, queue: Scheduled) {
    let defer = interp.create_async_function(
        "defer",
        Rc::new(move |_interp, _this, args: &[Value], handle: AsyncHandle| {
            queue.borrow_mut().push((args[0].clone(), handle));
            Ok(())
        }),
        1,
    );
    interp.define_value(global, "defer", Property::builtin(Value::Object(defer)));
}

#[test]
fn test_async_suspension_and_resume() {
    let queue: Scheduled = Rc::new(RefCell::new(Vec::new()));
    let host_queue = queue.clone();

    let mut engine = Engine::with_init(
        "var log = []; log.push('start'); defer(function() { log.push('fired'); }); log.join(',')",
        EngineConfig::default(),
        move |interp, global| install_defer(interp, &global, host_queue),
    )
    .unwrap();

    // First run parks on the defer call.
    assert!(engine.run().unwrap());
    assert!(engine.paused());

    // The host timer fires: queue the callback and resume.
    let (callback, handle) = queue.borrow_mut().pop().expect("defer was called");
    engine.interpreter().queue_call(callback, Value::Undefined, Vec::new());
    handle.resolve(Value::Undefined);
    assert!(!engine.paused());

    assert!(!engine.run().unwrap());
    assert_eq!(engine.value().as_str(), Some("start,fired"));
}

#[test]
fn test_nested_async_defers_in_order() {
    let queue: Scheduled = Rc::new(RefCell::new(Vec::new()));
    let host_queue = queue.clone();

    let source = r#"
        var log = [];
        log.push('start');
        defer(function() {
          log.push('first');
          defer(function() { log.push('second'); });
        });
    "#;
    let mut engine = Engine::with_init(
        source,
        EngineConfig::default(),
        move |interp, global| install_defer(interp, &global, host_queue),
    )
    .unwrap();

    assert!(engine.run().unwrap());

    // Two timer fires drive the nested schedule to completion.
    for _ in 0..2 {
        let (callback, handle) = queue.borrow_mut().pop().expect("a deferred callback");
        engine.interpreter().queue_call(callback, Value::Undefined, Vec::new());
        handle.resolve(Value::Undefined);
        engine.run().unwrap();
    }
    assert!(!engine.paused());

    engine.append_code("log.join(',')").unwrap();
    engine.run().unwrap();
    assert_eq!(engine.value().as_str(), Some("start,first,second"));
}

#[test]
fn test_async_rejection_becomes_guest_throw() {
    let queue: Scheduled = Rc::new(RefCell::new(Vec::new()));
    let host_queue = queue.clone();

    let mut engine = Engine::with_init(
        "var r; try { defer(null); r = 'resumed'; } catch (e) { r = 'caught:' + e; } r",
        EngineConfig::default(),
        move |interp, global| install_defer(interp, &global, host_queue),
    )
    .unwrap();

    assert!(engine.run().unwrap());
    let (_callback, handle) = queue.borrow_mut().pop().unwrap();
    handle.reject(Value::from("host failure"));
    engine.run().unwrap();
    assert_eq!(engine.value().as_str(), Some("caught:host failure"));
}

#[test]
fn test_queue_call_after_completion() {
    let hits = Rc::new(RefCell::new(0));
    let side = hits.clone();

    let mut engine = Engine::with_init(
        "function onTick() { bump(); }",
        EngineConfig::default(),
        move |interp, global| {
            install_native(interp, &global, "bump", 0, move |_interp, _this, _args| {
                *side.borrow_mut() += 1;
                Ok(Value::Undefined)
            });
        },
    )
    .unwrap();
    engine.run().unwrap();

    let global = engine.global();
    let on_tick = match engine
        .interpreter()
        .get_property(&Value::Object(global), "onTick")
    {
        Ok(sandjs::PropGet::Value(v)) => v,
        _ => panic!("onTick is a global"),
    };
    engine
        .interpreter()
        .queue_call(on_tick, Value::Undefined, Vec::new());
    engine.run().unwrap();
    assert_eq!(*hits.borrow(), 1);
}
