//! Node handlers.
//!
//! One handler per AST node kind, each re-entrant over its frame's
//! [`FrameState`]. A handler advances its frame one phase per step: push a
//! child, mutate state, finish with a value, or hand a completion to the
//! unwinder.

use rustc_hash::FxHashSet;

use crate::ast::{
    AssignOp, BinaryOp, Declarator, LiteralValue, LogicalOp, Node, NodeKind, NodeRef,
    ObjectProperty, PropertyKind, SwitchCase, UnaryOp, UpdateOp,
};
use crate::error::Raise;
use crate::scope::ScopeId;
use crate::value::{
    number_to_string, InternalData, JsStr, ObjectKind, ObjectRef, Property, RegExpData, Value,
};

use super::frame::{AsyncSlot, Completion, ForInData, ForInPhase, Frame, FrameState, FrameStep, RefTarget};
use super::{CallOutcome, Interpreter, Lookup, PropGet, PropSet};

impl Interpreter {
    /// Route a frame to its handler. Shared call-machinery states dispatch
    /// on state; everything else dispatches on the node kind.
    pub(crate) fn dispatch_frame(&mut self, frame: &mut Frame) -> Result<FrameStep, Raise> {
        match &frame.state {
            FrameState::ProgramBody { .. } => return self.step_program(frame),
            FrameState::FunctionBody { .. } => return self.step_function_body(frame),
            FrameState::Invoke { .. } | FrameState::InvokeAwait => return self.step_invoke(frame),
            FrameState::CallSuspended { .. } => return self.step_call_suspended(frame),
            FrameState::AwaitAccessor | FrameState::ForwardChild => {
                return Ok(FrameStep::Done(frame.take_child()));
            }
            _ => {}
        }

        let node = frame.node.clone();
        match &node.kind {
            NodeKind::Program { .. } | NodeKind::EvalProgram { .. } => self.step_program(frame),
            NodeKind::ExpressionStatement { expression } => {
                self.step_expression_statement(frame, expression)
            }
            NodeKind::BlockStatement { .. } => self.step_block(frame, &node),
            NodeKind::EmptyStatement | NodeKind::DebuggerStatement => {
                Ok(FrameStep::Done(Value::Undefined))
            }
            NodeKind::VariableDeclaration { declarations } => {
                self.step_variable_declaration(frame, declarations)
            }
            NodeKind::FunctionDeclaration { .. } => Ok(FrameStep::Done(Value::Undefined)),
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => self.step_if(frame, test, consequent, alternate.as_ref()),
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => self.step_conditional(frame, test, consequent, alternate),
            NodeKind::WhileStatement { test, body } => self.step_while(frame, test, body),
            NodeKind::DoWhileStatement { body, test } => self.step_do_while(frame, body, test),
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            } => self.step_for(frame, init.as_ref(), test.as_ref(), update.as_ref(), body),
            NodeKind::ForInStatement { left, right, body } => {
                self.step_for_in(frame, left, right, body)
            }
            NodeKind::SwitchStatement {
                discriminant,
                cases,
            } => self.step_switch(frame, discriminant, cases),
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => self.step_try(frame, block, handler, finalizer.as_ref()),
            NodeKind::ThrowStatement { argument } => self.step_throw(frame, argument),
            NodeKind::ReturnStatement { argument } => self.step_return(frame, argument.as_ref()),
            NodeKind::BreakStatement { label } => {
                Ok(FrameStep::Transfer(Completion::Break(label.clone())))
            }
            NodeKind::ContinueStatement { label } => {
                Ok(FrameStep::Transfer(Completion::Continue(label.clone())))
            }
            NodeKind::LabeledStatement { label, body } => self.step_labeled(frame, label, body),
            NodeKind::WithStatement { object, body } => self.step_with(frame, object, body),
            NodeKind::Identifier { name } => self.step_identifier(frame, name),
            NodeKind::Literal { value } => self.step_literal(frame, value),
            NodeKind::ThisExpression => self.step_this(frame),
            NodeKind::ArrayExpression { elements } => self.step_array_literal(frame, elements),
            NodeKind::ObjectExpression { properties } => self.step_object_literal(frame, properties),
            NodeKind::FunctionExpression { function } => {
                let closure = self.create_guest_function(function.clone(), frame.scope);
                Ok(FrameStep::Done(Value::Object(closure)))
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
            } => self.step_member(frame, object, property, *computed),
            NodeKind::CallExpression { callee, arguments } => {
                self.step_call(frame, callee, arguments, false)
            }
            NodeKind::NewExpression { callee, arguments } => {
                self.step_call(frame, callee, arguments, true)
            }
            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            } => self.step_assignment(frame, *operator, left, right),
            NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => self.step_binary(frame, *operator, left, right),
            NodeKind::LogicalExpression {
                operator,
                left,
                right,
            } => self.step_logical(frame, *operator, left, right),
            NodeKind::UnaryExpression { operator, argument } => {
                self.step_unary(frame, *operator, argument)
            }
            NodeKind::UpdateExpression {
                operator,
                argument,
                prefix,
            } => self.step_update(frame, *operator, argument, *prefix),
            NodeKind::SequenceExpression { expressions } => self.step_sequence(frame, expressions),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Programs, blocks, function bodies
    // ═══════════════════════════════════════════════════════════════════════

    fn step_program(&mut self, frame: &mut Frame) -> Result<FrameStep, Raise> {
        if matches!(frame.state, FrameState::Start) {
            // Only reached by eval program frames built without a body;
            // root frames are created directly in ProgramBody.
            frame.state = FrameState::ProgramBody {
                body: Vec::new(),
                index: 0,
            };
        }
        let FrameState::ProgramBody { body, index } = &mut frame.state else {
            unreachable!("program frame in foreign state");
        };
        if matches!(frame.node.kind, NodeKind::EvalProgram { .. }) && *index == 0 {
            self.value = Value::Undefined;
        }
        frame.child = None;
        if *index < body.len() {
            let stmt = body[*index].clone();
            *index += 1;
            return Ok(FrameStep::Push(Frame::new(stmt, frame.scope)));
        }
        Ok(FrameStep::Done(self.value.clone()))
    }

    fn step_block(&mut self, frame: &mut Frame, node: &NodeRef) -> Result<FrameStep, Raise> {
        let NodeKind::BlockStatement { body } = &node.kind else {
            unreachable!("block handler on non-block node");
        };
        if matches!(frame.state, FrameState::Start) {
            frame.state = FrameState::BlockBody { index: 0 };
        }
        let FrameState::BlockBody { index } = &mut frame.state else {
            unreachable!("block frame in foreign state");
        };
        frame.child = None;
        if *index < body.len() {
            let stmt = body[*index].clone();
            *index += 1;
            return Ok(FrameStep::Push(Frame::new(stmt, frame.scope)));
        }
        Ok(FrameStep::Done(Value::Undefined))
    }

    fn step_function_body(&mut self, frame: &mut Frame) -> Result<FrameStep, Raise> {
        let FrameState::FunctionBody {
            body,
            index,
            construct_this,
        } = &mut frame.state
        else {
            unreachable!("function body frame in foreign state");
        };
        frame.child = None;
        if *index < body.len() {
            let stmt = body[*index].clone();
            *index += 1;
            return Ok(FrameStep::Push(Frame::new(stmt, frame.scope)));
        }
        // Fell off the end: a constructor yields its instance, a plain call
        // yields undefined.
        Ok(FrameStep::Done(
            construct_this.take().unwrap_or(Value::Undefined),
        ))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Simple statements
    // ═══════════════════════════════════════════════════════════════════════

    fn step_expression_statement(
        &mut self,
        frame: &mut Frame,
        expression: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        match frame.state {
            FrameState::Start => {
                frame.state = FrameState::ExprStmtValue;
                Ok(FrameStep::Push(Frame::new(expression.clone(), frame.scope)))
            }
            FrameState::ExprStmtValue => {
                let value = frame.take_child();
                self.value = value.clone();
                Ok(FrameStep::Done(value))
            }
            _ => unreachable!("expression statement frame in foreign state"),
        }
    }

    fn step_variable_declaration(
        &mut self,
        frame: &mut Frame,
        declarations: &[Declarator],
    ) -> Result<FrameStep, Raise> {
        let strict = self.scopes.strict(frame.scope);
        let state = std::mem::replace(&mut frame.state, FrameState::Start);
        let mut next = match state {
            FrameState::Start => 0,
            FrameState::DeclInit { index } => {
                let value = frame.take_child();
                let name = declarations[index].name.clone();
                match self.assign_name(frame.scope, name.as_str(), value, strict)? {
                    PropSet::Done => index + 1,
                    PropSet::Setter { func, this, value } => {
                        frame.state = FrameState::DeclStore { index };
                        return Ok(FrameStep::Push(self.invoke_frame(
                            func,
                            this,
                            vec![value],
                            frame.scope,
                        )));
                    }
                }
            }
            FrameState::DeclStore { index } => {
                frame.child = None;
                index + 1
            }
            _ => unreachable!("variable declaration frame in foreign state"),
        };
        while next < declarations.len() {
            match &declarations[next].init {
                Some(init) => {
                    frame.state = FrameState::DeclInit { index: next };
                    return Ok(FrameStep::Push(Frame::new(init.clone(), frame.scope)));
                }
                None => next += 1,
            }
        }
        Ok(FrameStep::Done(Value::Undefined))
    }

    fn step_if(
        &mut self,
        frame: &mut Frame,
        test: &NodeRef,
        consequent: &NodeRef,
        alternate: Option<&NodeRef>,
    ) -> Result<FrameStep, Raise> {
        match frame.state {
            FrameState::Start => {
                frame.state = FrameState::IfTest;
                Ok(FrameStep::Push(Frame::new(test.clone(), frame.scope)))
            }
            FrameState::IfTest => {
                let taken = frame.take_child().to_boolean();
                let branch = if taken {
                    Some(consequent)
                } else {
                    alternate
                };
                match branch {
                    Some(branch) => {
                        frame.state = FrameState::IfBranch;
                        Ok(FrameStep::Push(Frame::new(branch.clone(), frame.scope)))
                    }
                    None => Ok(FrameStep::Done(Value::Undefined)),
                }
            }
            FrameState::IfBranch => Ok(FrameStep::Done(Value::Undefined)),
            _ => unreachable!("if frame in foreign state"),
        }
    }

    fn step_conditional(
        &mut self,
        frame: &mut Frame,
        test: &NodeRef,
        consequent: &NodeRef,
        alternate: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        match frame.state {
            FrameState::Start => {
                frame.state = FrameState::CondTest;
                Ok(FrameStep::Push(Frame::new(test.clone(), frame.scope)))
            }
            FrameState::CondTest => {
                let branch = if frame.take_child().to_boolean() {
                    consequent
                } else {
                    alternate
                };
                frame.state = FrameState::ForwardChild;
                Ok(FrameStep::Push(Frame::new(branch.clone(), frame.scope)))
            }
            _ => unreachable!("conditional frame in foreign state"),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Loops
    // ═══════════════════════════════════════════════════════════════════════

    fn step_while(
        &mut self,
        frame: &mut Frame,
        test: &NodeRef,
        body: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        match frame.state {
            FrameState::Start | FrameState::WhileBody => {
                frame.child = None;
                frame.state = FrameState::WhileTest;
                Ok(FrameStep::Push(Frame::new(test.clone(), frame.scope)))
            }
            FrameState::WhileTest => {
                if frame.take_child().to_boolean() {
                    frame.state = FrameState::WhileBody;
                    Ok(FrameStep::Push(Frame::new(body.clone(), frame.scope)))
                } else {
                    Ok(FrameStep::Done(Value::Undefined))
                }
            }
            _ => unreachable!("while frame in foreign state"),
        }
    }

    fn step_do_while(
        &mut self,
        frame: &mut Frame,
        body: &NodeRef,
        test: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        match frame.state {
            FrameState::Start | FrameState::DoTest => {
                if !matches!(frame.state, FrameState::Start) && !frame.take_child().to_boolean() {
                    return Ok(FrameStep::Done(Value::Undefined));
                }
                frame.child = None;
                frame.state = FrameState::DoBody;
                Ok(FrameStep::Push(Frame::new(body.clone(), frame.scope)))
            }
            FrameState::DoBody => {
                frame.child = None;
                frame.state = FrameState::DoTest;
                Ok(FrameStep::Push(Frame::new(test.clone(), frame.scope)))
            }
            _ => unreachable!("do-while frame in foreign state"),
        }
    }

    fn step_for(
        &mut self,
        frame: &mut Frame,
        init: Option<&NodeRef>,
        test: Option<&NodeRef>,
        update: Option<&NodeRef>,
        body: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        match frame.state {
            FrameState::Start => {
                if let Some(init) = init {
                    frame.state = FrameState::ForInit;
                    return Ok(FrameStep::Push(Frame::new(init.clone(), frame.scope)));
                }
                frame.state = FrameState::ForInit;
                Ok(FrameStep::Again)
            }
            FrameState::ForInit | FrameState::ForUpdate => {
                frame.child = None;
                match test {
                    Some(test) => {
                        frame.state = FrameState::ForTest;
                        Ok(FrameStep::Push(Frame::new(test.clone(), frame.scope)))
                    }
                    None => {
                        frame.state = FrameState::ForBody;
                        Ok(FrameStep::Push(Frame::new(body.clone(), frame.scope)))
                    }
                }
            }
            FrameState::ForTest => {
                if frame.take_child().to_boolean() {
                    frame.state = FrameState::ForBody;
                    Ok(FrameStep::Push(Frame::new(body.clone(), frame.scope)))
                } else {
                    Ok(FrameStep::Done(Value::Undefined))
                }
            }
            FrameState::ForBody => {
                frame.child = None;
                match update {
                    Some(update) => {
                        frame.state = FrameState::ForUpdate;
                        Ok(FrameStep::Push(Frame::new(update.clone(), frame.scope)))
                    }
                    None => {
                        frame.state = FrameState::ForInit;
                        Ok(FrameStep::Again)
                    }
                }
            }
            _ => unreachable!("for frame in foreign state"),
        }
    }

    fn step_for_in(
        &mut self,
        frame: &mut Frame,
        left: &NodeRef,
        right: &NodeRef,
        body: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        match &mut frame.state {
            FrameState::Start => {
                frame.state = FrameState::ForInRight;
                Ok(FrameStep::Push(Frame::new(right.clone(), frame.scope)))
            }
            FrameState::ForInRight => {
                let target = frame.take_child();
                if target.is_nullish() {
                    return Ok(FrameStep::Done(Value::Undefined));
                }
                let keys = self.own_enumerable_keys(&target);
                frame.state = FrameState::ForInLoop(Box::new(ForInData {
                    object: Some(target),
                    keys,
                    key_index: 0,
                    visited: FxHashSet::default(),
                    phase: ForInPhase::NextKey,
                }));
                Ok(FrameStep::Again)
            }
            FrameState::ForInLoop(data) => match data.phase.clone() {
                ForInPhase::NextKey => {
                    frame.child = None;
                    loop {
                        let Some(object) = data.object.clone() else {
                            return Ok(FrameStep::Done(Value::Undefined));
                        };
                        if data.key_index >= data.keys.len() {
                            // This level is exhausted; every own key of it
                            // (enumerable or not) shadows the prototypes.
                            for key in self.own_keys_of(&object) {
                                data.visited.insert(key);
                            }
                            data.object = self.proto_of(&object);
                            data.keys = match &data.object {
                                Some(next) => self.own_enumerable_keys(next),
                                None => Vec::new(),
                            };
                            data.key_index = 0;
                            continue;
                        }
                        let key = data.keys[data.key_index].clone();
                        data.key_index += 1;
                        if !data.visited.insert(key.clone()) {
                            continue;
                        }
                        // Deleted mid-loop: skip.
                        if !self.value_has_own(&object, key.as_str()) {
                            continue;
                        }
                        data.phase = ForInPhase::AwaitAssign;
                        return self.for_in_assign(frame, left, key);
                    }
                }
                ForInPhase::AwaitAssign => {
                    frame.child = None;
                    let FrameState::ForInLoop(data) = &mut frame.state else {
                        unreachable!();
                    };
                    data.phase = ForInPhase::AwaitBody;
                    Ok(FrameStep::Push(Frame::new(body.clone(), frame.scope)))
                }
                ForInPhase::AwaitBody => {
                    frame.child = None;
                    let FrameState::ForInLoop(data) = &mut frame.state else {
                        unreachable!();
                    };
                    data.phase = ForInPhase::NextKey;
                    Ok(FrameStep::Again)
                }
            },
            _ => unreachable!("for-in frame in foreign state"),
        }
    }

    /// Bind the current key to the loop target. Plain names assign in
    /// place; member targets run through a synthetic assignment frame.
    fn for_in_assign(
        &mut self,
        frame: &mut Frame,
        left: &NodeRef,
        key: JsStr,
    ) -> Result<FrameStep, Raise> {
        let name = match &left.kind {
            NodeKind::VariableDeclaration { declarations } => Some(declarations[0].name.clone()),
            NodeKind::Identifier { name } => Some(name.clone()),
            _ => None,
        };
        if let Some(name) = name {
            let strict = self.scopes.strict(frame.scope);
            match self.assign_name(frame.scope, name.as_str(), Value::String(key), strict)? {
                PropSet::Done => {
                    // No setter ran; move straight on as if the synthetic
                    // assignment completed.
                    let FrameState::ForInLoop(data) = &mut frame.state else {
                        unreachable!();
                    };
                    data.phase = ForInPhase::AwaitAssign;
                    Ok(FrameStep::Again)
                }
                PropSet::Setter { func, this, value } => Ok(FrameStep::Push(self.invoke_frame(
                    func,
                    this,
                    vec![value],
                    frame.scope,
                ))),
            }
        } else {
            let assignment = Node::synthetic(NodeKind::AssignmentExpression {
                operator: AssignOp::Assign,
                left: left.clone(),
                right: Node::synthetic(NodeKind::Literal {
                    value: LiteralValue::String(key),
                }),
            });
            Ok(FrameStep::Push(Frame::new(assignment, frame.scope)))
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Switch
    // ═══════════════════════════════════════════════════════════════════════

    fn step_switch(
        &mut self,
        frame: &mut Frame,
        discriminant: &NodeRef,
        cases: &[SwitchCase],
    ) -> Result<FrameStep, Raise> {
        match &mut frame.state {
            FrameState::Start => {
                frame.state = FrameState::SwitchDisc;
                Ok(FrameStep::Push(Frame::new(
                    discriminant.clone(),
                    frame.scope,
                )))
            }
            FrameState::SwitchDisc => {
                let discriminant = frame.take_child();
                frame.state = FrameState::SwitchTest {
                    discriminant,
                    index: 0,
                    default_index: None,
                };
                Ok(FrameStep::Again)
            }
            FrameState::SwitchTest {
                discriminant,
                index,
                default_index,
            } => {
                if let Some(test_result) = frame.child.take() {
                    if test_result.strict_equals(discriminant) {
                        let matched = *index;
                        frame.state = FrameState::SwitchBody {
                            index: matched,
                            stmt: 0,
                        };
                        return Ok(FrameStep::Again);
                    }
                    *index += 1;
                }
                loop {
                    if *index >= cases.len() {
                        return match default_index {
                            Some(default) => {
                                let default = *default;
                                frame.state = FrameState::SwitchBody {
                                    index: default,
                                    stmt: 0,
                                };
                                Ok(FrameStep::Again)
                            }
                            None => Ok(FrameStep::Done(Value::Undefined)),
                        };
                    }
                    match &cases[*index].test {
                        None => {
                            *default_index = Some(*index);
                            *index += 1;
                        }
                        Some(test) => {
                            let test = test.clone();
                            return Ok(FrameStep::Push(Frame::new(test, frame.scope)));
                        }
                    }
                }
            }
            FrameState::SwitchBody { index, stmt } => {
                frame.child = None;
                loop {
                    if *index >= cases.len() {
                        return Ok(FrameStep::Done(Value::Undefined));
                    }
                    if *stmt < cases[*index].consequent.len() {
                        let node = cases[*index].consequent[*stmt].clone();
                        *stmt += 1;
                        return Ok(FrameStep::Push(Frame::new(node, frame.scope)));
                    }
                    // Fall through into the next case's consequents.
                    *index += 1;
                    *stmt = 0;
                }
            }
            _ => unreachable!("switch frame in foreign state"),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Try / throw / return / labels / with
    // ═══════════════════════════════════════════════════════════════════════

    fn step_try(
        &mut self,
        frame: &mut Frame,
        block: &NodeRef,
        handler: &Option<crate::ast::CatchClause>,
        finalizer: Option<&NodeRef>,
    ) -> Result<FrameStep, Raise> {
        match &mut frame.state {
            FrameState::Start => {
                frame.state = FrameState::TryBlock;
                Ok(FrameStep::Push(Frame::new(block.clone(), frame.scope)))
            }
            FrameState::TryBlock => {
                frame.child = None;
                let captured = frame.captured.take();
                if let Some(Completion::Throw(thrown)) = &captured {
                    if let Some(catch) = handler {
                        let strict = self.scopes.strict(frame.scope);
                        let bag = self.create_object(None);
                        self.define_value(&bag, catch.param.as_str(), Property::data(thrown.clone()));
                        let catch_scope = self.scopes.alloc(frame.scope, strict, bag);
                        frame.state = FrameState::TryHandler { catch_scope };
                        return Ok(FrameStep::Push(Frame::new(catch.body.clone(), catch_scope)));
                    }
                }
                self.enter_finalizer(frame, captured, finalizer)
            }
            FrameState::TryHandler { catch_scope } => {
                let catch_scope = *catch_scope;
                frame.child = None;
                let captured = frame.captured.take();
                self.scopes.try_free(catch_scope);
                self.enter_finalizer(frame, captured, finalizer)
            }
            FrameState::TryFinalizer { pending } => {
                frame.child = None;
                match pending.take() {
                    Some(completion) if !matches!(completion, Completion::Normal) => {
                        Ok(FrameStep::Transfer(completion))
                    }
                    _ => Ok(FrameStep::Done(Value::Undefined)),
                }
            }
            _ => unreachable!("try frame in foreign state"),
        }
    }

    /// After the protected block or handler: run `finally` if present,
    /// otherwise re-deliver whatever completion is still pending.
    fn enter_finalizer(
        &mut self,
        frame: &mut Frame,
        pending: Option<Completion>,
        finalizer: Option<&NodeRef>,
    ) -> Result<FrameStep, Raise> {
        match finalizer {
            Some(finalizer) => {
                frame.state = FrameState::TryFinalizer { pending };
                Ok(FrameStep::Push(Frame::new(finalizer.clone(), frame.scope)))
            }
            None => match pending {
                Some(completion) if !matches!(completion, Completion::Normal) => {
                    Ok(FrameStep::Transfer(completion))
                }
                _ => Ok(FrameStep::Done(Value::Undefined)),
            },
        }
    }

    fn step_throw(&mut self, frame: &mut Frame, argument: &NodeRef) -> Result<FrameStep, Raise> {
        match frame.state {
            FrameState::Start => {
                frame.state = FrameState::ThrowArg;
                Ok(FrameStep::Push(Frame::new(argument.clone(), frame.scope)))
            }
            FrameState::ThrowArg => {
                let value = frame.take_child();
                Ok(FrameStep::Transfer(Completion::Throw(value)))
            }
            _ => unreachable!("throw frame in foreign state"),
        }
    }

    fn step_return(
        &mut self,
        frame: &mut Frame,
        argument: Option<&NodeRef>,
    ) -> Result<FrameStep, Raise> {
        match frame.state {
            FrameState::Start => match argument {
                Some(argument) => {
                    frame.state = FrameState::ReturnArg;
                    Ok(FrameStep::Push(Frame::new(argument.clone(), frame.scope)))
                }
                None => Ok(FrameStep::Transfer(Completion::Return(Value::Undefined))),
            },
            FrameState::ReturnArg => {
                let value = frame.take_child();
                Ok(FrameStep::Transfer(Completion::Return(value)))
            }
            _ => unreachable!("return frame in foreign state"),
        }
    }

    fn step_labeled(
        &mut self,
        frame: &mut Frame,
        label: &JsStr,
        body: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        match frame.state {
            FrameState::Start => {
                frame.state = FrameState::LabelBody;
                let mut child = Frame::new(body.clone(), frame.scope);
                child.labels = frame.labels.clone();
                child.labels.push(label.clone());
                Ok(FrameStep::Push(child))
            }
            FrameState::LabelBody => Ok(FrameStep::Done(Value::Undefined)),
            _ => unreachable!("labeled frame in foreign state"),
        }
    }

    fn step_with(
        &mut self,
        frame: &mut Frame,
        object: &NodeRef,
        body: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        match frame.state {
            FrameState::Start => {
                frame.state = FrameState::WithObject;
                Ok(FrameStep::Push(Frame::new(object.clone(), frame.scope)))
            }
            FrameState::WithObject => {
                let target = frame.take_child();
                let object = self.to_object(&target)?;
                let strict = self.scopes.strict(frame.scope);
                let with_scope = self.scopes.alloc_with(frame.scope, strict, object);
                frame.state = FrameState::WithBody { with_scope };
                Ok(FrameStep::Push(Frame::new(body.clone(), with_scope)))
            }
            FrameState::WithBody { .. } => Ok(FrameStep::Done(Value::Undefined)),
            _ => unreachable!("with frame in foreign state"),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Leaf expressions
    // ═══════════════════════════════════════════════════════════════════════

    fn step_identifier(&mut self, frame: &mut Frame, name: &JsStr) -> Result<FrameStep, Raise> {
        match self.lookup_name(frame.scope, name.as_str())? {
            Lookup::Value(value) => Ok(FrameStep::Done(value)),
            Lookup::Accessor { func, this } => {
                frame.state = FrameState::AwaitAccessor;
                Ok(FrameStep::Push(self.invoke_frame(
                    func,
                    this,
                    Vec::new(),
                    frame.scope,
                )))
            }
            Lookup::NotFound => Err(Raise::reference_error(name.as_str())),
        }
    }

    fn step_this(&mut self, frame: &mut Frame) -> Result<FrameStep, Raise> {
        match self.lookup_name(frame.scope, "this")? {
            Lookup::Value(value) => Ok(FrameStep::Done(value)),
            _ => Ok(FrameStep::Done(Value::Undefined)),
        }
    }

    fn step_literal(&mut self, _frame: &mut Frame, value: &LiteralValue) -> Result<FrameStep, Raise> {
        let value = match value {
            LiteralValue::Null => Value::Null,
            LiteralValue::Boolean(b) => Value::Boolean(*b),
            LiteralValue::Number(n) => Value::Number(*n),
            LiteralValue::String(s) => Value::String(s.clone()),
            LiteralValue::RegExp { pattern, flags } => {
                let data = RegExpData {
                    source: pattern.clone(),
                    global: flags.as_str().contains('g'),
                    ignore_case: flags.as_str().contains('i'),
                    multiline: flags.as_str().contains('m'),
                };
                Value::Object(self.create_regexp(pattern.as_str(), data))
            }
        };
        Ok(FrameStep::Done(value))
    }

    fn step_array_literal(
        &mut self,
        frame: &mut Frame,
        elements: &[Option<NodeRef>],
    ) -> Result<FrameStep, Raise> {
        if matches!(frame.state, FrameState::Start) {
            frame.state = FrameState::ArrayElems {
                object: self.create_array(Vec::new()),
                index: 0,
            };
        }
        let object = match &frame.state {
            FrameState::ArrayElems { object, .. } => object.clone(),
            _ => unreachable!("array literal frame in foreign state"),
        };
        if let Some(value) = frame.child.take() {
            let FrameState::ArrayElems { index, .. } = &mut frame.state else {
                unreachable!();
            };
            object
                .borrow_mut()
                .properties
                .insert(JsStr::from(index.to_string()), Property::data(value));
            *index += 1;
        }
        loop {
            let FrameState::ArrayElems { index, .. } = &mut frame.state else {
                unreachable!();
            };
            if *index >= elements.len() {
                self.define_value(
                    &object,
                    "length",
                    Property::with_attributes(
                        Value::Number(elements.len() as f64),
                        true,
                        false,
                        false,
                    ),
                );
                return Ok(FrameStep::Done(Value::Object(object)));
            }
            match &elements[*index] {
                Some(element) => {
                    let element = element.clone();
                    return Ok(FrameStep::Push(Frame::new(element, frame.scope)));
                }
                None => *index += 1, // elision leaves a hole
            }
        }
    }

    fn step_object_literal(
        &mut self,
        frame: &mut Frame,
        properties: &[ObjectProperty],
    ) -> Result<FrameStep, Raise> {
        if matches!(frame.state, FrameState::Start) {
            frame.state = FrameState::ObjectProps {
                object: self.create_plain(),
                index: 0,
            };
        }
        let object = match &frame.state {
            FrameState::ObjectProps { object, .. } => object.clone(),
            _ => unreachable!("object literal frame in foreign state"),
        };
        if let Some(value) = frame.child.take() {
            let FrameState::ObjectProps { index, .. } = &mut frame.state else {
                unreachable!();
            };
            let prop = &properties[*index];
            match prop.kind {
                PropertyKind::Init => {
                    self.define_value(&object, prop.key.as_str(), Property::data(value));
                }
                PropertyKind::Get => {
                    let getter = value.as_object().cloned();
                    self.define_accessor(&object, prop.key.as_str(), getter, None);
                }
                PropertyKind::Set => {
                    let setter = value.as_object().cloned();
                    self.define_accessor(&object, prop.key.as_str(), None, setter);
                }
            }
            *index += 1;
        }
        let FrameState::ObjectProps { index, .. } = &frame.state else {
            unreachable!();
        };
        if *index >= properties.len() {
            return Ok(FrameStep::Done(Value::Object(object)));
        }
        let value = properties[*index].value.clone();
        Ok(FrameStep::Push(Frame::new(value, frame.scope)))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Member access
    // ═══════════════════════════════════════════════════════════════════════

    fn step_member(
        &mut self,
        frame: &mut Frame,
        object: &NodeRef,
        property: &NodeRef,
        computed: bool,
    ) -> Result<FrameStep, Raise> {
        match &frame.state {
            FrameState::Start => {
                frame.state = FrameState::MemberObject;
                Ok(FrameStep::Push(Frame::new(object.clone(), frame.scope)))
            }
            FrameState::MemberObject => {
                let target = frame.take_child();
                if computed {
                    frame.state = FrameState::MemberProperty { object: target };
                    return Ok(FrameStep::Push(Frame::new(property.clone(), frame.scope)));
                }
                let key = static_key(property);
                self.member_get(frame, target, key)
            }
            FrameState::MemberProperty { object } => {
                let target = object.clone();
                let key = frame.take_child().to_js_str();
                self.member_get(frame, target, key)
            }
            _ => unreachable!("member frame in foreign state"),
        }
    }

    fn member_get(
        &mut self,
        frame: &mut Frame,
        target: Value,
        key: JsStr,
    ) -> Result<FrameStep, Raise> {
        match self.get_property(&target, key.as_str())? {
            PropGet::Value(value) => Ok(FrameStep::Done(value)),
            PropGet::Getter { func, this } => {
                frame.state = FrameState::AwaitAccessor;
                Ok(FrameStep::Push(self.invoke_frame(
                    func,
                    this,
                    Vec::new(),
                    frame.scope,
                )))
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════

    fn step_call(
        &mut self,
        frame: &mut Frame,
        callee: &NodeRef,
        arguments: &[NodeRef],
        construct: bool,
    ) -> Result<FrameStep, Raise> {
        match &mut frame.state {
            FrameState::Start => {
                if let NodeKind::MemberExpression { object, .. } = &callee.kind {
                    frame.state = FrameState::CallMemberObject;
                    return Ok(FrameStep::Push(Frame::new(object.clone(), frame.scope)));
                }
                frame.state = FrameState::CallCallee;
                Ok(FrameStep::Push(Frame::new(callee.clone(), frame.scope)))
            }
            FrameState::CallCallee => {
                let func = frame.take_child();
                frame.state = FrameState::CallArgs {
                    func,
                    this: Value::Undefined,
                    args: Vec::new(),
                };
                Ok(FrameStep::Again)
            }
            FrameState::CallMemberObject => {
                let target = frame.take_child();
                let NodeKind::MemberExpression {
                    property, computed, ..
                } = &callee.kind
                else {
                    unreachable!("call member phase without member callee");
                };
                if *computed {
                    frame.state = FrameState::CallMemberProperty { object: target };
                    return Ok(FrameStep::Push(Frame::new(property.clone(), frame.scope)));
                }
                let key = static_key(property);
                self.call_member_get(frame, target, key)
            }
            FrameState::CallMemberProperty { object } => {
                let target = object.clone();
                let key = frame.take_child().to_js_str();
                self.call_member_get(frame, target, key)
            }
            FrameState::CallMemberGet { object } => {
                let this = object.clone();
                let func = frame.take_child();
                frame.state = FrameState::CallArgs {
                    func,
                    this,
                    args: Vec::new(),
                };
                Ok(FrameStep::Again)
            }
            FrameState::CallArgs { .. } => {
                if let Some(value) = frame.child.take() {
                    let FrameState::CallArgs { args, .. } = &mut frame.state else {
                        unreachable!();
                    };
                    args.push(value);
                }
                let FrameState::CallArgs { func, this, args } = &mut frame.state else {
                    unreachable!();
                };
                if args.len() < arguments.len() {
                    let next = arguments[args.len()].clone();
                    return Ok(FrameStep::Push(Frame::new(next, frame.scope)));
                }
                let func = func.clone();
                let this = this.clone();
                let args = std::mem::take(args);
                self.call_dispatch(frame, callee, func, this, args, construct)
            }
            FrameState::CallAwait { .. } => Ok(FrameStep::Done(frame.take_child())),
            _ => unreachable!("call frame in foreign state"),
        }
    }

    fn call_member_get(
        &mut self,
        frame: &mut Frame,
        target: Value,
        key: JsStr,
    ) -> Result<FrameStep, Raise> {
        match self.get_property(&target, key.as_str())? {
            PropGet::Value(func) => {
                frame.state = FrameState::CallArgs {
                    func,
                    this: target,
                    args: Vec::new(),
                };
                Ok(FrameStep::Again)
            }
            PropGet::Getter { func, this } => {
                frame.state = FrameState::CallMemberGet { object: target };
                Ok(FrameStep::Push(self.invoke_frame(
                    func,
                    this,
                    Vec::new(),
                    frame.scope,
                )))
            }
        }
    }

    /// All operands are in; branch on the callee kind.
    fn call_dispatch(
        &mut self,
        frame: &mut Frame,
        callee: &NodeRef,
        func: Value,
        this: Value,
        args: Vec<Value>,
        construct: bool,
    ) -> Result<FrameStep, Raise> {
        // Direct eval runs in the caller's scope.
        let is_direct_eval = !construct
            && matches!(&callee.kind, NodeKind::Identifier { name } if name.as_str() == "eval")
            && func
                .as_object()
                .is_some_and(|o| matches!(o.borrow().kind, ObjectKind::Eval));
        if is_direct_eval {
            return match self.eval_frame(args.into_iter().next(), frame.scope)? {
                Some(child) => {
                    frame.state = FrameState::CallAwait { construct: false };
                    Ok(FrameStep::Push(child))
                }
                None => Ok(FrameStep::Done(Value::Undefined)),
            };
        }

        let construct_this = if construct {
            let Some(func_obj) = func.as_object() else {
                return Err(Raise::type_error(format!(
                    "{} is not a function",
                    func.to_display_string()
                )));
            };
            let proto = match self.plain_lookup(func_obj, "prototype") {
                Some(Value::Object(proto)) => proto,
                _ => self.object_proto.clone(),
            };
            Some(Value::Object(self.create_object(Some(proto))))
        } else {
            None
        };

        match self.begin_call(func, this, args, construct_this.clone())? {
            CallOutcome::Value(value) => Ok(FrameStep::Done(value)),
            CallOutcome::Push(child) => {
                frame.state = FrameState::CallAwait { construct };
                Ok(FrameStep::Push(child))
            }
            CallOutcome::Suspend(slot) => {
                frame.state = FrameState::CallSuspended {
                    slot,
                    construct_this,
                };
                Ok(FrameStep::Suspend)
            }
        }
    }

    /// A suspended async call; only entered once the pause flag cleared.
    fn step_call_suspended(&mut self, frame: &mut Frame) -> Result<FrameStep, Raise> {
        let FrameState::CallSuspended {
            slot,
            construct_this,
        } = &mut frame.state
        else {
            unreachable!("suspended handler on foreign state");
        };
        let settled = {
            let mut borrowed = slot.borrow_mut();
            std::mem::replace(&mut *borrowed, AsyncSlot::Pending)
        };
        match settled {
            AsyncSlot::Pending => Ok(FrameStep::Suspend),
            AsyncSlot::Resolved(value) => {
                let result = if matches!(value, Value::Object(_)) {
                    value
                } else if let Some(this) = construct_this.take() {
                    this
                } else {
                    value
                };
                Ok(FrameStep::Done(result))
            }
            AsyncSlot::Rejected(error) => Ok(FrameStep::Transfer(Completion::Throw(error))),
        }
    }

    /// Synthetic calls: accessor invocations and host-queued functions.
    fn step_invoke(&mut self, frame: &mut Frame) -> Result<FrameStep, Raise> {
        match &mut frame.state {
            FrameState::Invoke { func, this, args } => {
                let func = func.clone();
                let this = this.clone();
                let args = std::mem::take(args);
                match self.begin_call(func, this, args, None)? {
                    CallOutcome::Value(value) => Ok(FrameStep::Done(value)),
                    CallOutcome::Push(child) => {
                        frame.state = FrameState::InvokeAwait;
                        Ok(FrameStep::Push(child))
                    }
                    CallOutcome::Suspend(slot) => {
                        frame.state = FrameState::CallSuspended {
                            slot,
                            construct_this: None,
                        };
                        Ok(FrameStep::Suspend)
                    }
                }
            }
            FrameState::InvokeAwait => Ok(FrameStep::Done(frame.take_child())),
            _ => unreachable!("invoke handler on foreign state"),
        }
    }

    /// Frame for a synthetic call (getter/setter dispatch).
    pub(crate) fn invoke_frame(
        &self,
        func: ObjectRef,
        this: Value,
        args: Vec<Value>,
        scope: ScopeId,
    ) -> Frame {
        Frame::with_state(
            self.synthetic_node.clone(),
            scope,
            FrameState::Invoke {
                func: Value::Object(func),
                this,
                args,
            },
        )
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Operators
    // ═══════════════════════════════════════════════════════════════════════

    fn step_binary(
        &mut self,
        frame: &mut Frame,
        operator: BinaryOp,
        left: &NodeRef,
        right: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        match &frame.state {
            FrameState::Start => {
                frame.state = FrameState::BinLeft;
                Ok(FrameStep::Push(Frame::new(left.clone(), frame.scope)))
            }
            FrameState::BinLeft => {
                let left_value = frame.take_child();
                frame.state = FrameState::BinRight { left: left_value };
                Ok(FrameStep::Push(Frame::new(right.clone(), frame.scope)))
            }
            FrameState::BinRight { left } => {
                let left = left.clone();
                let right = frame.take_child();
                let result = self.apply_binary(operator, &left, &right)?;
                Ok(FrameStep::Done(result))
            }
            _ => unreachable!("binary frame in foreign state"),
        }
    }

    pub(crate) fn apply_binary(
        &mut self,
        operator: BinaryOp,
        left: &Value,
        right: &Value,
    ) -> Result<Value, Raise> {
        let value = match operator {
            BinaryOp::Add => {
                let a = to_primitive(left);
                let b = to_primitive(right);
                match (&a, &b) {
                    (Value::String(_), _) | (_, Value::String(_)) => {
                        let mut s = a.to_display_string();
                        s.push_str(&b.to_display_string());
                        Value::from(s)
                    }
                    _ => Value::Number(a.to_number() + b.to_number()),
                }
            }
            BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
            BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
            BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
            BinaryOp::Mod => Value::Number(left.to_number() % right.to_number()),
            BinaryOp::Eq => Value::Boolean(left.loose_equals(right)),
            BinaryOp::NotEq => Value::Boolean(!left.loose_equals(right)),
            BinaryOp::StrictEq => Value::Boolean(left.strict_equals(right)),
            BinaryOp::StrictNotEq => Value::Boolean(!left.strict_equals(right)),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                let a = to_primitive(left);
                let b = to_primitive(right);
                if let (Value::String(x), Value::String(y)) = (&a, &b) {
                    Value::Boolean(match operator {
                        BinaryOp::Lt => x < y,
                        BinaryOp::Gt => x > y,
                        BinaryOp::Le => x <= y,
                        _ => x >= y,
                    })
                } else {
                    let x = a.to_number();
                    let y = b.to_number();
                    if x.is_nan() || y.is_nan() {
                        Value::Boolean(false)
                    } else {
                        Value::Boolean(match operator {
                            BinaryOp::Lt => x < y,
                            BinaryOp::Gt => x > y,
                            BinaryOp::Le => x <= y,
                            _ => x >= y,
                        })
                    }
                }
            }
            BinaryOp::Shl => Value::Number(((left.to_int32()) << (right.to_uint32() & 31)) as f64),
            BinaryOp::Shr => Value::Number(((left.to_int32()) >> (right.to_uint32() & 31)) as f64),
            BinaryOp::UShr => {
                Value::Number(((left.to_uint32()) >> (right.to_uint32() & 31)) as f64)
            }
            BinaryOp::BitAnd => Value::Number((left.to_int32() & right.to_int32()) as f64),
            BinaryOp::BitOr => Value::Number((left.to_int32() | right.to_int32()) as f64),
            BinaryOp::BitXor => Value::Number((left.to_int32() ^ right.to_int32()) as f64),
            BinaryOp::In => {
                if !right.is_object() {
                    return Err(Raise::type_error(
                        "'in' expects an object as its right operand",
                    ));
                }
                Value::Boolean(self.has_property(right, left.to_js_str().as_str()))
            }
            BinaryOp::Instanceof => Value::Boolean(self.instance_of(left, right)?),
        };
        Ok(value)
    }

    fn step_logical(
        &mut self,
        frame: &mut Frame,
        operator: LogicalOp,
        left: &NodeRef,
        right: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        match frame.state {
            FrameState::Start => {
                frame.state = FrameState::LogicalLeft;
                Ok(FrameStep::Push(Frame::new(left.clone(), frame.scope)))
            }
            FrameState::LogicalLeft => {
                let left_value = frame.take_child();
                let short_circuit = match operator {
                    LogicalOp::And => !left_value.to_boolean(),
                    LogicalOp::Or => left_value.to_boolean(),
                };
                if short_circuit {
                    return Ok(FrameStep::Done(left_value));
                }
                frame.state = FrameState::ForwardChild;
                Ok(FrameStep::Push(Frame::new(right.clone(), frame.scope)))
            }
            _ => unreachable!("logical frame in foreign state"),
        }
    }

    fn step_unary(
        &mut self,
        frame: &mut Frame,
        operator: UnaryOp,
        argument: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        match &frame.state {
            FrameState::Start => match operator {
                UnaryOp::Typeof => {
                    if let NodeKind::Identifier { name } = &argument.kind {
                        // `typeof` tolerates unresolved names.
                        return match self.lookup_name(frame.scope, name.as_str())? {
                            Lookup::NotFound => Ok(FrameStep::Done(Value::from("undefined"))),
                            Lookup::Value(value) => Ok(FrameStep::Done(Value::from(value.type_of()))),
                            Lookup::Accessor { func, this } => {
                                frame.state = FrameState::UnaryArg;
                                Ok(FrameStep::Push(self.invoke_frame(
                                    func,
                                    this,
                                    Vec::new(),
                                    frame.scope,
                                )))
                            }
                        };
                    }
                    frame.state = FrameState::UnaryArg;
                    Ok(FrameStep::Push(Frame::new(argument.clone(), frame.scope)))
                }
                UnaryOp::Delete => match &argument.kind {
                    NodeKind::MemberExpression { object, .. } => {
                        frame.state = FrameState::DeleteObject;
                        Ok(FrameStep::Push(Frame::new(object.clone(), frame.scope)))
                    }
                    // Declared bindings are non-configurable.
                    NodeKind::Identifier { .. } => Ok(FrameStep::Done(Value::Boolean(false))),
                    _ => Ok(FrameStep::Done(Value::Boolean(true))),
                },
                _ => {
                    frame.state = FrameState::UnaryArg;
                    Ok(FrameStep::Push(Frame::new(argument.clone(), frame.scope)))
                }
            },
            FrameState::UnaryArg => {
                let value = frame.take_child();
                let result = match operator {
                    UnaryOp::Minus => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::Not => Value::Boolean(!value.to_boolean()),
                    UnaryOp::BitNot => Value::Number(!value.to_int32() as f64),
                    UnaryOp::Typeof => Value::from(value.type_of()),
                    UnaryOp::Void => Value::Undefined,
                    UnaryOp::Delete => Value::Boolean(true),
                };
                Ok(FrameStep::Done(result))
            }
            FrameState::DeleteObject => {
                let target = frame.take_child();
                let NodeKind::MemberExpression {
                    property, computed, ..
                } = &argument.kind
                else {
                    unreachable!("delete phase without member argument");
                };
                if *computed {
                    frame.state = FrameState::DeleteProperty { object: target };
                    return Ok(FrameStep::Push(Frame::new(property.clone(), frame.scope)));
                }
                let key = static_key(property);
                let strict = self.scopes.strict(frame.scope);
                let deleted = self.delete_property(&target, key.as_str(), strict)?;
                Ok(FrameStep::Done(Value::Boolean(deleted)))
            }
            FrameState::DeleteProperty { object } => {
                let target = object.clone();
                let key = frame.take_child().to_js_str();
                let strict = self.scopes.strict(frame.scope);
                let deleted = self.delete_property(&target, key.as_str(), strict)?;
                Ok(FrameStep::Done(Value::Boolean(deleted)))
            }
            _ => unreachable!("unary frame in foreign state"),
        }
    }

    fn step_update(
        &mut self,
        frame: &mut Frame,
        operator: UpdateOp,
        argument: &NodeRef,
        prefix: bool,
    ) -> Result<FrameStep, Raise> {
        match &frame.state {
            FrameState::Start => match &argument.kind {
                NodeKind::Identifier { name } => {
                    let target = RefTarget::Name(name.clone());
                    match self.lookup_name(frame.scope, name.as_str())? {
                        Lookup::Value(old) => self.update_apply(frame, target, old, operator, prefix),
                        Lookup::Accessor { func, this } => {
                            frame.state = FrameState::UpdateApply { target };
                            Ok(FrameStep::Push(self.invoke_frame(
                                func,
                                this,
                                Vec::new(),
                                frame.scope,
                            )))
                        }
                        Lookup::NotFound => Err(Raise::reference_error(name.as_str())),
                    }
                }
                NodeKind::MemberExpression { object, .. } => {
                    frame.state = FrameState::UpdateMemberObject;
                    Ok(FrameStep::Push(Frame::new(object.clone(), frame.scope)))
                }
                _ => Err(Raise::syntax_error("invalid increment/decrement target")),
            },
            FrameState::UpdateMemberObject => {
                let base = frame.take_child();
                let NodeKind::MemberExpression {
                    property, computed, ..
                } = &argument.kind
                else {
                    unreachable!("update phase without member argument");
                };
                if *computed {
                    frame.state = FrameState::UpdateMemberProperty { object: base };
                    return Ok(FrameStep::Push(Frame::new(property.clone(), frame.scope)));
                }
                let key = static_key(property);
                self.update_read(frame, base, key, operator, prefix)
            }
            FrameState::UpdateMemberProperty { object } => {
                let base = object.clone();
                let key = frame.take_child().to_js_str();
                self.update_read(frame, base, key, operator, prefix)
            }
            FrameState::UpdateApply { target } => {
                let target = target.clone();
                let old = frame.take_child();
                self.update_apply(frame, target, old, operator, prefix)
            }
            FrameState::UpdateStore { result } => {
                let result = result.clone();
                frame.child = None;
                Ok(FrameStep::Done(result))
            }
            _ => unreachable!("update frame in foreign state"),
        }
    }

    fn update_read(
        &mut self,
        frame: &mut Frame,
        base: Value,
        key: JsStr,
        operator: UpdateOp,
        prefix: bool,
    ) -> Result<FrameStep, Raise> {
        let target = RefTarget::Member {
            base: base.clone(),
            key: key.clone(),
        };
        match self.get_property(&base, key.as_str())? {
            PropGet::Value(old) => self.update_apply(frame, target, old, operator, prefix),
            PropGet::Getter { func, this } => {
                frame.state = FrameState::UpdateApply { target };
                Ok(FrameStep::Push(self.invoke_frame(
                    func,
                    this,
                    Vec::new(),
                    frame.scope,
                )))
            }
        }
    }

    fn update_apply(
        &mut self,
        frame: &mut Frame,
        target: RefTarget,
        old: Value,
        operator: UpdateOp,
        prefix: bool,
    ) -> Result<FrameStep, Raise> {
        let old_number = old.to_number();
        let new_number = match operator {
            UpdateOp::Increment => old_number + 1.0,
            UpdateOp::Decrement => old_number - 1.0,
        };
        let result = Value::Number(if prefix { new_number } else { old_number });
        let strict = self.scopes.strict(frame.scope);
        let outcome = match &target {
            RefTarget::Name(name) => {
                self.assign_name(frame.scope, name.as_str(), Value::Number(new_number), strict)?
            }
            RefTarget::Member { base, key } => {
                self.set_property(base, key.as_str(), Value::Number(new_number), strict)?
            }
        };
        match outcome {
            PropSet::Done => Ok(FrameStep::Done(result)),
            PropSet::Setter { func, this, value } => {
                frame.state = FrameState::UpdateStore { result };
                Ok(FrameStep::Push(self.invoke_frame(
                    func,
                    this,
                    vec![value],
                    frame.scope,
                )))
            }
        }
    }

    fn step_assignment(
        &mut self,
        frame: &mut Frame,
        operator: AssignOp,
        left: &NodeRef,
        right: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        match &frame.state {
            FrameState::Start => match &left.kind {
                NodeKind::Identifier { name } => {
                    let target = RefTarget::Name(name.clone());
                    if operator == AssignOp::Assign {
                        frame.state = FrameState::AssignRight { target, old: None };
                        return Ok(FrameStep::Push(Frame::new(right.clone(), frame.scope)));
                    }
                    match self.lookup_name(frame.scope, name.as_str())? {
                        Lookup::Value(old) => {
                            frame.state = FrameState::AssignRight {
                                target,
                                old: Some(old),
                            };
                            Ok(FrameStep::Push(Frame::new(right.clone(), frame.scope)))
                        }
                        Lookup::Accessor { func, this } => {
                            frame.state = FrameState::AssignOldValue { target };
                            Ok(FrameStep::Push(self.invoke_frame(
                                func,
                                this,
                                Vec::new(),
                                frame.scope,
                            )))
                        }
                        Lookup::NotFound => Err(Raise::reference_error(name.as_str())),
                    }
                }
                NodeKind::MemberExpression { object, .. } => {
                    frame.state = FrameState::AssignMemberObject;
                    Ok(FrameStep::Push(Frame::new(object.clone(), frame.scope)))
                }
                _ => Err(Raise::syntax_error("invalid assignment target")),
            },
            FrameState::AssignMemberObject => {
                let base = frame.take_child();
                let NodeKind::MemberExpression {
                    property, computed, ..
                } = &left.kind
                else {
                    unreachable!("assignment phase without member target");
                };
                if *computed {
                    frame.state = FrameState::AssignMemberProperty { object: base };
                    return Ok(FrameStep::Push(Frame::new(property.clone(), frame.scope)));
                }
                let key = static_key(property);
                self.assign_prepare(frame, base, key, operator, right)
            }
            FrameState::AssignMemberProperty { object } => {
                let base = object.clone();
                let key = frame.take_child().to_js_str();
                self.assign_prepare(frame, base, key, operator, right)
            }
            FrameState::AssignOldValue { target } => {
                let target = target.clone();
                let old = frame.take_child();
                frame.state = FrameState::AssignRight {
                    target,
                    old: Some(old),
                };
                Ok(FrameStep::Push(Frame::new(right.clone(), frame.scope)))
            }
            FrameState::AssignRight { target, old } => {
                let target = target.clone();
                let old = old.clone();
                let rhs = frame.take_child();
                let result = match (old, operator.binary_op()) {
                    (Some(old), Some(op)) => self.apply_binary(op, &old, &rhs)?,
                    _ => rhs,
                };
                let strict = self.scopes.strict(frame.scope);
                let outcome = match &target {
                    RefTarget::Name(name) => {
                        self.assign_name(frame.scope, name.as_str(), result.clone(), strict)?
                    }
                    RefTarget::Member { base, key } => {
                        self.set_property(base, key.as_str(), result.clone(), strict)?
                    }
                };
                match outcome {
                    PropSet::Done => Ok(FrameStep::Done(result)),
                    PropSet::Setter { func, this, value } => {
                        frame.state = FrameState::AssignStore { result };
                        Ok(FrameStep::Push(self.invoke_frame(
                            func,
                            this,
                            vec![value],
                            frame.scope,
                        )))
                    }
                }
            }
            FrameState::AssignStore { result } => {
                let result = result.clone();
                frame.child = None;
                Ok(FrameStep::Done(result))
            }
            _ => unreachable!("assignment frame in foreign state"),
        }
    }

    /// Member target ready: for compound assignment read the current value
    /// first, otherwise go straight to the right-hand side.
    fn assign_prepare(
        &mut self,
        frame: &mut Frame,
        base: Value,
        key: JsStr,
        operator: AssignOp,
        right: &NodeRef,
    ) -> Result<FrameStep, Raise> {
        let target = RefTarget::Member {
            base: base.clone(),
            key: key.clone(),
        };
        if operator == AssignOp::Assign {
            frame.state = FrameState::AssignRight { target, old: None };
            return Ok(FrameStep::Push(Frame::new(right.clone(), frame.scope)));
        }
        match self.get_property(&base, key.as_str())? {
            PropGet::Value(old) => {
                frame.state = FrameState::AssignRight {
                    target,
                    old: Some(old),
                };
                Ok(FrameStep::Push(Frame::new(right.clone(), frame.scope)))
            }
            PropGet::Getter { func, this } => {
                frame.state = FrameState::AssignOldValue { target };
                Ok(FrameStep::Push(self.invoke_frame(
                    func,
                    this,
                    Vec::new(),
                    frame.scope,
                )))
            }
        }
    }

    fn step_sequence(
        &mut self,
        frame: &mut Frame,
        expressions: &[NodeRef],
    ) -> Result<FrameStep, Raise> {
        if matches!(frame.state, FrameState::Start) {
            frame.state = FrameState::SeqIndex { index: 0 };
        }
        let FrameState::SeqIndex { index } = &mut frame.state else {
            unreachable!("sequence frame in foreign state");
        };
        if *index >= expressions.len() {
            // The last operand's value is the sequence's value.
            return Ok(FrameStep::Done(frame.take_child()));
        }
        let expr = expressions[*index].clone();
        *index += 1;
        frame.child = None;
        Ok(FrameStep::Push(Frame::new(expr, frame.scope)))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Enumeration helpers
    // ═══════════════════════════════════════════════════════════════════════

    /// Own enumerable keys of a for-in level. Strings enumerate their
    /// indices; numbers and booleans have none.
    fn own_enumerable_keys(&self, value: &Value) -> Vec<JsStr> {
        match value {
            Value::String(s) => string_index_keys(s),
            Value::Object(obj) => {
                let borrowed = obj.borrow();
                let mut keys = match &borrowed.data {
                    Some(InternalData::String(s)) => string_index_keys(s),
                    _ => Vec::new(),
                };
                keys.extend(borrowed.enumerable_keys());
                keys
            }
            _ => Vec::new(),
        }
    }

    /// Every own key of a for-in level (shadowing set).
    fn own_keys_of(&self, value: &Value) -> Vec<JsStr> {
        match value {
            Value::String(s) => string_index_keys(s),
            Value::Object(obj) => {
                let borrowed = obj.borrow();
                let mut keys = match &borrowed.data {
                    Some(InternalData::String(s)) => string_index_keys(s),
                    _ => Vec::new(),
                };
                keys.extend(borrowed.own_keys());
                keys
            }
            _ => Vec::new(),
        }
    }

    fn proto_of(&self, value: &Value) -> Option<Value> {
        match value {
            Value::String(_) => Some(Value::Object(self.string_proto.clone())),
            Value::Number(_) => Some(Value::Object(self.number_proto.clone())),
            Value::Boolean(_) => Some(Value::Object(self.boolean_proto.clone())),
            Value::Object(obj) => obj.borrow().proto.clone().map(Value::Object),
            _ => None,
        }
    }

    fn value_has_own(&self, value: &Value, key: &str) -> bool {
        match value {
            Value::String(s) => {
                crate::value::array_index(key).is_some_and(|i| (i as usize) < s.char_len())
            }
            Value::Object(obj) => {
                let borrowed = obj.borrow();
                if let Some(InternalData::String(s)) = &borrowed.data {
                    if crate::value::array_index(key).is_some_and(|i| (i as usize) < s.char_len()) {
                        return true;
                    }
                }
                borrowed.has_own(key)
            }
            _ => false,
        }
    }
}

/// Class-based ToPrimitive (see DESIGN.md): boxed numbers and booleans
/// unwrap, everything else object-shaped goes through its string form.
pub(crate) fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Object(obj) => {
            let borrowed = obj.borrow();
            match &borrowed.data {
                Some(InternalData::Number(n)) => Value::Number(*n),
                Some(InternalData::Boolean(b)) => {
                    Value::Number(if *b { 1.0 } else { 0.0 })
                }
                _ => {
                    drop(borrowed);
                    Value::from(value.to_display_string())
                }
            }
        }
        other => other.clone(),
    }
}

/// Key of a non-computed member access.
fn static_key(property: &NodeRef) -> JsStr {
    match &property.kind {
        NodeKind::Identifier { name } => name.clone(),
        NodeKind::Literal { value } => match value {
            LiteralValue::String(s) => s.clone(),
            LiteralValue::Number(n) => JsStr::from(number_to_string(*n)),
            other => JsStr::from(format!("{other:?}")),
        },
        _ => JsStr::from(""),
    }
}

/// Index keys `"0"`..`"len-1"` of a string.
fn string_index_keys(s: &JsStr) -> Vec<JsStr> {
    (0..s.char_len()).map(|i| JsStr::from(i.to_string())).collect()
}
