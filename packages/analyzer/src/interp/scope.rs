//! Scope chain

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::value::Value;

pub type ScopeRef = Rc<RefCell<Scope>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub kind: BindingKind,
    pub initialized: bool,
}

/// One scope-chain node. Each function call pushes a fresh node rooted at
/// the function's captured closure.
#[derive(Debug)]
pub struct Scope {
    pub bindings: IndexMap<String, Binding>,
    pub parent: Option<ScopeRef>,
}

impl Scope {
    pub fn root() -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            bindings: IndexMap::new(),
            parent: None,
        }))
    }

    pub fn child(parent: &ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            bindings: IndexMap::new(),
            parent: Some(parent.clone()),
        }))
    }

    pub fn declare(scope: &ScopeRef, name: &str, value: Value, kind: BindingKind) {
        scope.borrow_mut().bindings.insert(
            name.to_string(),
            Binding {
                value,
                kind,
                initialized: true,
            },
        );
    }

    pub fn lookup(scope: &ScopeRef, name: &str) -> Option<Value> {
        let mut current = Some(scope.clone());
        while let Some(node) = current {
            let node_ref = node.borrow();
            if let Some(binding) = node_ref.bindings.get(name) {
                return Some(binding.value.clone());
            }
            current = node_ref.parent.clone();
        }
        None
    }

    /// Assign to the nearest binding. Returns `false` when the name is
    /// unbound or bound as `const`.
    pub fn assign(scope: &ScopeRef, name: &str, value: Value) -> bool {
        let mut current = Some(scope.clone());
        while let Some(node) = current {
            let mut node_ref = node.borrow_mut();
            if let Some(binding) = node_ref.bindings.get_mut(name) {
                if binding.kind == BindingKind::Const && binding.initialized {
                    return false;
                }
                binding.value = value;
                binding.initialized = true;
                return true;
            }
            current = node_ref.parent.clone();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_resolve_through_parent_chain() {
        let root = Scope::root();
        Scope::declare(&root, "x", Value::Number(1.0), BindingKind::Let);
        let inner = Scope::child(&root);
        assert!(matches!(Scope::lookup(&inner, "x"), Some(Value::Number(n)) if n == 1.0));
        assert!(Scope::lookup(&inner, "y").is_none());
    }

    #[test]
    fn should_shadow_outer_bindings() {
        let root = Scope::root();
        Scope::declare(&root, "x", Value::Number(1.0), BindingKind::Let);
        let inner = Scope::child(&root);
        Scope::declare(&inner, "x", Value::Number(2.0), BindingKind::Let);
        assert!(matches!(Scope::lookup(&inner, "x"), Some(Value::Number(n)) if n == 2.0));
        assert!(matches!(Scope::lookup(&root, "x"), Some(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn should_refuse_const_reassignment() {
        let root = Scope::root();
        Scope::declare(&root, "k", Value::Number(1.0), BindingKind::Const);
        assert!(!Scope::assign(&root, "k", Value::Number(2.0)));
        assert!(Scope::assign(&root, "missing", Value::Null) == false);
    }
}
