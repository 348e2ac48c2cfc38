//! State-stack frames.
//!
//! Execution is a stack of [`Frame`]s, each pairing an AST node with the
//! scope it runs in plus whatever bookkeeping that node needs to resume
//! after a child completes. Handlers are re-entrant: every `step()` pops the
//! top frame, advances it one phase, and pushes it back unless it finished.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::ast::NodeRef;
use crate::scope::ScopeId;
use crate::value::{JsStr, ObjectRef, Value};

/// Non-local transfer driving `unwind`.
#[derive(Debug, Clone)]
pub enum Completion {
    Normal,
    Break(Option<JsStr>),
    Continue(Option<JsStr>),
    Return(Value),
    Throw(Value),
}

/// One element of the state stack.
#[derive(Debug)]
pub struct Frame {
    pub node: NodeRef,
    pub scope: ScopeId,
    pub state: FrameState,
    /// Result of the most recently completed child frame.
    pub child: Option<Value>,
    /// Labels attached by enclosing labeled statements.
    pub labels: Vec<JsStr>,
    /// Completion captured while unwinding into a `try` frame.
    pub captured: Option<Completion>,
}

impl Frame {
    pub fn new(node: NodeRef, scope: ScopeId) -> Self {
        Self {
            node,
            scope,
            state: FrameState::Start,
            child: None,
            labels: Vec::new(),
            captured: None,
        }
    }

    pub fn with_state(node: NodeRef, scope: ScopeId, state: FrameState) -> Self {
        Self {
            node,
            scope,
            state,
            child: None,
            labels: Vec::new(),
            captured: None,
        }
    }

    /// Take the pending child result, defaulting to `undefined`.
    pub fn take_child(&mut self) -> Value {
        self.child.take().unwrap_or_default()
    }

    /// Frames `break`/`continue` without a label can target.
    pub fn is_loop(&self) -> bool {
        matches!(
            self.state,
            FrameState::WhileTest
                | FrameState::WhileBody
                | FrameState::DoBody
                | FrameState::DoTest
                | FrameState::ForInit
                | FrameState::ForTest
                | FrameState::ForBody
                | FrameState::ForUpdate
                | FrameState::ForInRight
                | FrameState::ForInLoop(_)
        )
    }

    pub fn is_switch(&self) -> bool {
        matches!(
            self.state,
            FrameState::SwitchDisc | FrameState::SwitchTest { .. } | FrameState::SwitchBody { .. }
        )
    }
}

/// What a handler did with its frame.
#[derive(Debug)]
pub enum FrameStep {
    /// Push a child frame; the current frame stays underneath.
    Push(Frame),
    /// State advanced without pushing; run this frame again next step.
    Again,
    /// The frame completed with a value.
    Done(Value),
    /// Hand a non-local completion to the unwinder; the current frame is
    /// discarded.
    Transfer(Completion),
    /// The frame suspended on an async call; `paused` is set.
    Suspend,
}

/// The target of an assignment/update/delete, captured as a reference.
#[derive(Debug, Clone)]
pub enum RefTarget {
    /// A name resolved through the scope chain.
    Name(JsStr),
    /// A property of a specific base value.
    Member { base: Value, key: JsStr },
}

/// Per-node resume data. Variants are grouped by the node kind that owns
/// them; `Invoke`/`InvokeAwait`/`CallSuspended`/`AwaitAccessor` are shared
/// call machinery usable under any node.
#[derive(Debug)]
pub enum FrameState {
    /// Fresh frame; the handler has not run yet.
    Start,

    // ============ PROGRAMS / BLOCKS ============
    /// `Program`/`EvalProgram` body. Owned by the frame so `append_code`
    /// can extend the root while it is live.
    ProgramBody { body: Vec<NodeRef>, index: usize },
    /// Statement list of a block.
    BlockBody { index: usize },
    /// A function body with its own scope. `Return` unwinding stops here.
    FunctionBody {
        body: Vec<NodeRef>,
        index: usize,
        construct_this: Option<Value>,
    },

    // ============ STATEMENTS ============
    /// An expression statement's expression is running; its value becomes
    /// the engine's latest completion value.
    ExprStmtValue,
    /// Waiting for `declarations[index]`'s initializer.
    DeclInit { index: usize },
    /// An inherited setter for `declarations[index]` is running.
    DeclStore { index: usize },
    IfTest,
    IfBranch,
    WhileTest,
    WhileBody,
    DoBody,
    DoTest,
    ForInit,
    ForTest,
    ForBody,
    ForUpdate,
    ForInRight,
    ForInLoop(Box<ForInData>),
    SwitchDisc,
    SwitchTest {
        discriminant: Value,
        index: usize,
        default_index: Option<usize>,
    },
    SwitchBody {
        /// Case whose consequents are executing (fallthrough walks on).
        index: usize,
        stmt: usize,
    },
    TryBlock,
    TryHandler {
        catch_scope: ScopeId,
    },
    TryFinalizer {
        pending: Option<Completion>,
    },
    ThrowArg,
    ReturnArg,
    LabelBody,
    WithObject,
    WithBody {
        with_scope: ScopeId,
    },

    // ============ EXPRESSIONS ============
    MemberObject,
    MemberProperty { object: Value },
    /// Generic wait on a pushed accessor `Invoke` frame; completes with its
    /// result.
    AwaitAccessor,

    CallCallee,
    CallMemberObject,
    CallMemberProperty { object: Value },
    /// Callee came from a getter; waiting for it.
    CallMemberGet { object: Value },
    CallArgs {
        func: Value,
        this: Value,
        args: Vec<Value>,
    },
    /// Waiting for a pushed `FunctionBody`/`EvalProgram` frame.
    CallAwait { construct: bool },
    /// Waiting for an async native's resume handle.
    CallSuspended {
        slot: Rc<RefCell<AsyncSlot>>,
        construct_this: Option<Value>,
    },
    /// Synthetic call (accessor invocation, host-enqueued function).
    Invoke {
        func: Value,
        this: Value,
        args: Vec<Value>,
    },
    InvokeAwait,

    BinLeft,
    BinRight { left: Value },
    LogicalLeft,
    CondTest,
    /// Generic tail state: complete with the pushed child's result
    /// (conditional branches, logical right operands).
    ForwardChild,
    UnaryArg,
    SeqIndex { index: usize },
    ArrayElems { object: ObjectRef, index: usize },
    ObjectProps { object: ObjectRef, index: usize },

    UpdateMemberObject,
    UpdateMemberProperty { object: Value },
    /// Read of the current value finished (possibly via a getter).
    UpdateApply { target: RefTarget },
    UpdateStore { result: Value },

    AssignMemberObject,
    AssignMemberProperty { object: Value },
    /// Compound assignment: waiting for the current value (maybe a getter).
    AssignOldValue { target: RefTarget },
    AssignRight {
        target: RefTarget,
        old: Option<Value>,
    },
    /// Waiting for an inherited setter to run; the assignment's own value
    /// is `result`.
    AssignStore { result: Value },

    DeleteObject,
    DeleteProperty { object: Value },
}

/// Shared slot between an async call frame and its [`AsyncHandle`].
#[derive(Debug)]
pub enum AsyncSlot {
    Pending,
    Resolved(Value),
    Rejected(Value),
}

/// Bookkeeping of an in-flight `for (k in o)`.
#[derive(Debug)]
pub struct ForInData {
    /// Object currently being enumerated (walks up the prototype chain);
    /// `None` once the chain is exhausted.
    pub object: Option<Value>,
    /// Snapshot of the current object's own enumerable keys.
    pub keys: Vec<JsStr>,
    pub key_index: usize,
    /// Keys already seen on this or a descendant object.
    pub visited: FxHashSet<JsStr>,
    pub phase: ForInPhase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForInPhase {
    /// Pick the next key (may advance the prototype chain).
    NextKey,
    /// A synthetic assignment of the key to the loop target is running.
    AwaitAssign,
    /// The loop body is running.
    AwaitBody,
}
