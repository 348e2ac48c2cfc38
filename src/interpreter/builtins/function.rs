//! `Function` constructor and `Function.prototype`.
//!
//! `call` and `apply` are registered here but intercepted by the call
//! machinery (it re-targets the invocation before the native body would
//! run); their bodies exist only to give the objects an identity.

use std::rc::Rc;

use crate::ast::NodeKind;
use crate::error::Raise;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::scope::ScopeId;
use crate::value::{Property, Value};

use super::{register_constructor, register_method};

pub(crate) fn install(interp: &mut Interpreter) {
    let proto = interp.function_proto.clone();
    register_constructor(interp, "Function", function_constructor, 1, &proto);

    register_method(interp, &proto, "toString", function_to_string, 0);
    register_method(interp, &proto, "valueOf", function_value_of, 0);

    let call = interp.create_native_function("call", Rc::new(function_call_stub), 1, false);
    interp.define_value(&proto, "call", Property::builtin(Value::Object(call.clone())));
    interp.fn_call = Some(call);

    let apply = interp.create_native_function("apply", Rc::new(function_call_stub), 2, false);
    interp.define_value(&proto, "apply", Property::builtin(Value::Object(apply.clone())));
    interp.fn_apply = Some(apply);
}

/// Build a function from source text: the last argument is the body, the
/// rest are parameter lists. The closure scope is the global scope.
fn function_constructor(
    interp: &mut Interpreter,
    _this: Value,
    args: &[Value],
) -> Result<Value, Raise> {
    let (params, body) = match args.split_last() {
        None => (String::new(), String::new()),
        Some((body, params)) => (
            params
                .iter()
                .map(|p| p.to_display_string())
                .collect::<Vec<_>>()
                .join(","),
            body.to_display_string(),
        ),
    };
    let source = format!("function anonymous({params}\n) {{\n{body}\n}}");
    let program = Parser::new(&source)
        .and_then(|p| {
            let mut p = p.without_locations();
            p.parse_program()
        })
        .map_err(|e| Raise::syntax_error(e.to_string()))?;
    let Some(NodeKind::FunctionDeclaration { function }) = program.first().map(|n| &n.kind) else {
        return Err(Raise::syntax_error("invalid function body"));
    };
    let closure = interp.create_guest_function(function.clone(), ScopeId::GLOBAL);
    Ok(Value::Object(closure))
}

fn function_to_string(
    _interp: &mut Interpreter,
    this: Value,
    _args: &[Value],
) -> Result<Value, Raise> {
    if !this.is_callable() {
        return Err(Raise::type_error(
            "Function.prototype.toString requires a function",
        ));
    }
    Ok(Value::from(this.to_display_string()))
}

fn function_value_of(
    _interp: &mut Interpreter,
    this: Value,
    _args: &[Value],
) -> Result<Value, Raise> {
    Ok(this)
}

/// Never executed: the call machinery rewrites `call`/`apply` invocations
/// before dispatching to a native body.
fn function_call_stub(
    _interp: &mut Interpreter,
    _this: Value,
    _args: &[Value],
) -> Result<Value, Raise> {
    Ok(Value::Undefined)
}
