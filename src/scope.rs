//! Lexical scopes.
//!
//! Scopes live in an index arena and are referenced by [`ScopeId`]. Closures
//! capture a `ScopeId` rather than an owning pointer, which keeps the object
//! graph free of strong cycles through scopes: the arena owns every scope,
//! and capture counts decide when a slot can be reused.
//!
//! Each scope wraps a *bag* — a guest object holding its variables. The
//! global scope's bag is the global object itself; other bags are
//! null-prototype objects so variable lookups never leak into
//! `Object.prototype`. A `with` scope borrows an arbitrary guest object as
//! its bag and is the one case where lookups walk the prototype chain.

use rustc_hash::FxHashSet;

use crate::value::{ObjectKind, ObjectRef};

/// Scope identifier - an index into the scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

impl ScopeId {
    /// The global scope (always index 0).
    pub const GLOBAL: ScopeId = ScopeId(0);
}

/// One lexical scope.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Enclosing scope, `None` only for the global scope.
    pub parent: Option<ScopeId>,
    /// Strict-mode flag, inherited and possibly promoted by a directive.
    pub strict: bool,
    /// Variable storage.
    pub bag: ObjectRef,
    /// True for scopes pushed by `with`; lookups on these walk the bag's
    /// prototype chain and may hit accessors.
    pub with_scope: bool,
    /// Number of closures holding this scope (transitively, through the
    /// parent chain). Non-zero blocks slot reuse.
    captures: usize,
}

/// Arena owning all scopes of one interpreter.
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Option<Scope>>,
    free_list: Vec<usize>,
}

impl ScopeArena {
    /// Create an arena seeded with the global scope.
    pub fn new(global_bag: ObjectRef) -> Self {
        Self {
            scopes: vec![Some(Scope {
                parent: None,
                strict: false,
                bag: global_bag,
                with_scope: false,
                captures: 0,
            })],
            free_list: Vec::new(),
        }
    }

    /// Allocate a scope, reusing a freed slot when one exists.
    pub fn alloc(&mut self, parent: ScopeId, strict: bool, bag: ObjectRef) -> ScopeId {
        self.alloc_inner(parent, strict, bag, false)
    }

    /// Allocate a `with` scope borrowing `object` as its bag.
    pub fn alloc_with(&mut self, parent: ScopeId, strict: bool, object: ObjectRef) -> ScopeId {
        self.alloc_inner(parent, strict, object, true)
    }

    fn alloc_inner(
        &mut self,
        parent: ScopeId,
        strict: bool,
        bag: ObjectRef,
        with_scope: bool,
    ) -> ScopeId {
        let scope = Scope {
            parent: Some(parent),
            strict,
            bag,
            with_scope,
            captures: 0,
        };
        if let Some(index) = self.free_list.pop() {
            self.scopes[index] = Some(scope);
            ScopeId(index)
        } else {
            self.scopes.push(Some(scope));
            ScopeId(self.scopes.len() - 1)
        }
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        self.scopes[id.0]
            .as_ref()
            .expect("scope accessed after free")
    }

    pub fn strict(&self, id: ScopeId) -> bool {
        self.get(id).strict
    }

    /// Promote a scope to strict (program-level `"use strict"`).
    pub fn set_strict(&mut self, id: ScopeId, strict: bool) {
        if let Some(scope) = self.scopes[id.0].as_mut() {
            scope.strict = strict;
        }
    }

    pub fn bag(&self, id: ScopeId) -> ObjectRef {
        self.get(id).bag.clone()
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).parent
    }

    /// Record that a closure captured `id`. The whole ancestor chain is
    /// pinned, since resolving a name from the closure walks outward.
    pub fn capture(&mut self, id: ScopeId) {
        let mut current = Some(id);
        while let Some(ScopeId(index)) = current {
            match self.scopes[index].as_mut() {
                Some(scope) => {
                    scope.captures = scope.captures.saturating_add(1);
                    current = scope.parent;
                }
                None => break,
            }
        }
    }

    /// Free `id` if no closure captured it. Closures found in the bag at
    /// free time release their own captured chains, so a fully local helper
    /// function does not pin its defining scope forever.
    pub fn try_free(&mut self, id: ScopeId) {
        if id == ScopeId::GLOBAL {
            return;
        }
        let (captured, with_scope) = match self.scopes[id.0].as_ref() {
            Some(scope) => (scope.captures > 0, scope.with_scope),
            None => return,
        };
        if captured {
            return;
        }
        if !with_scope {
            let bag = self.scopes[id.0].as_ref().map(|s| s.bag.clone());
            if let Some(bag) = bag {
                let closure_scopes: Vec<ScopeId> = bag
                    .borrow()
                    .properties
                    .values()
                    .filter_map(|prop| match prop.value.as_object() {
                        Some(obj) => match &obj.borrow().kind {
                            ObjectKind::Guest(f) if f.scope != id => Some(f.scope),
                            _ => None,
                        },
                        None => None,
                    })
                    .collect();
                for scope in closure_scopes {
                    self.release(scope);
                }
            }
        }
        self.scopes[id.0] = None;
        self.free_list.push(id.0);
    }

    fn release(&mut self, id: ScopeId) {
        let mut current = Some(id);
        let mut seen = FxHashSet::default();
        while let Some(ScopeId(index)) = current {
            if !seen.insert(index) {
                break;
            }
            match self.scopes.get_mut(index).and_then(|s| s.as_mut()) {
                Some(scope) => {
                    scope.captures = scope.captures.saturating_sub(1);
                    current = scope.parent;
                }
                None => break,
            }
        }
    }

    /// Number of live scopes (for tests and diagnostics).
    pub fn live_count(&self) -> usize {
        self.scopes.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::GuestObject;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn bag() -> ObjectRef {
        Rc::new(RefCell::new(GuestObject::new("Object", None)))
    }

    #[test]
    fn test_alloc_and_parent_chain() {
        let mut arena = ScopeArena::new(bag());
        let a = arena.alloc(ScopeId::GLOBAL, false, bag());
        let b = arena.alloc(a, true, bag());
        assert_eq!(arena.parent(b), Some(a));
        assert_eq!(arena.parent(a), Some(ScopeId::GLOBAL));
        assert!(arena.strict(b));
        assert!(!arena.strict(a));
    }

    #[test]
    fn test_free_reuses_slot() {
        let mut arena = ScopeArena::new(bag());
        let a = arena.alloc(ScopeId::GLOBAL, false, bag());
        assert_eq!(arena.live_count(), 2);
        arena.try_free(a);
        assert_eq!(arena.live_count(), 1);
        let b = arena.alloc(ScopeId::GLOBAL, false, bag());
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn test_captured_scope_survives() {
        let mut arena = ScopeArena::new(bag());
        let a = arena.alloc(ScopeId::GLOBAL, false, bag());
        arena.capture(a);
        arena.try_free(a);
        assert_eq!(arena.live_count(), 2);
    }

    #[test]
    fn test_global_never_freed() {
        let mut arena = ScopeArena::new(bag());
        arena.try_free(ScopeId::GLOBAL);
        assert_eq!(arena.live_count(), 1);
    }
}
