//! Lexical environments: a parent-pointer chain of scopes.
//!
//! Lookups fall through to the parent when a name is absent locally.
//! Assignment updates the nearest scope that already defines the name and
//! only defines it locally when no scope does.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::error::RuntimeError;
use super::value::Value;

struct Scope {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Env>,
}

/// A shared handle to one scope in the chain.
#[derive(Clone)]
pub struct Env(Rc<Scope>);

impl Env {
    /// A new root scope.
    pub fn new() -> Self {
        Env(Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// A child scope reading through to `self`.
    pub fn extend(&self) -> Env {
        Env(Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Env> {
        self.0.parent.as_ref()
    }

    pub fn is_in_current_scope(&self, name: &str) -> bool {
        self.0.vars.borrow().contains_key(name)
    }

    /// The nearest scope defining `name`.
    pub fn lookup(&self, name: &str) -> Option<Env> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if env.is_in_current_scope(name) {
                return Some(env.clone());
            }
            scope = env.parent();
        }
        None
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(value) = env.0.vars.borrow().get(name) {
                return Some(value.clone());
            }
            scope = env.parent();
        }
        None
    }

    /// Bind `name` in this scope, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.vars.borrow_mut().insert(name.into(), value);
    }

    /// Assign to `name` in the nearest scope defining it, or define it here.
    ///
    /// Fails if the existing binding is a built-in function.
    pub fn set(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        match self.lookup(name) {
            Some(scope) => {
                let mut vars = scope.0.vars.borrow_mut();
                if let Some(Value::BuiltIn(_)) = vars.get(name) {
                    return Err(RuntimeError::BuiltInReassignment(name.to_string()));
                }
                vars.insert(name.to_string(), value);
            }
            None => self.define(name, value),
        }
        Ok(())
    }

    /// Names defined directly in this scope, sorted.
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.vars.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("names", &self.local_names())
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::value::BuiltIn;

    fn number(env: &Env, name: &str) -> Option<f64> {
        match env.get(name) {
            Some(Value::Number(n)) => Some(n),
            _ => None,
        }
    }

    #[test]
    fn child_reads_through_to_parent() {
        let root = Env::new();
        root.define("x", Value::Number(1.0));
        let child = root.extend();
        assert_eq!(number(&child, "x"), Some(1.0));
        assert!(!child.is_in_current_scope("x"));
    }

    #[test]
    fn set_updates_nearest_defining_scope() {
        let root = Env::new();
        root.define("x", Value::Number(1.0));
        let child = root.extend();
        child.set("x", Value::Number(2.0)).unwrap();
        assert_eq!(number(&root, "x"), Some(2.0));
        assert!(!child.is_in_current_scope("x"));
    }

    #[test]
    fn set_defines_locally_when_unbound() {
        let root = Env::new();
        let child = root.extend();
        child.set("y", Value::Number(3.0)).unwrap();
        assert!(child.is_in_current_scope("y"));
        assert!(root.get("y").is_none());
    }

    #[test]
    fn define_shadows() {
        let root = Env::new();
        root.define("x", Value::Number(1.0));
        let child = root.extend();
        child.define("x", Value::Number(5.0));
        assert_eq!(number(&child, "x"), Some(5.0));
        assert_eq!(number(&root, "x"), Some(1.0));
    }

    #[test]
    fn built_ins_cannot_be_reassigned() {
        let root = Env::new();
        root.define("len", Value::BuiltIn(BuiltIn::new("len", |_| Ok(Value::Nil))));
        let child = root.extend();
        let err = child.set("len", Value::Number(1.0)).unwrap_err();
        assert_eq!(err, RuntimeError::BuiltInReassignment("len".to_string()));
    }

    #[test]
    fn lookup_finds_defining_scope() {
        let root = Env::new();
        root.define("x", Value::Nil);
        let child = root.extend().extend();
        let scope = child.lookup("x").unwrap();
        assert!(scope.is_in_current_scope("x"));
        assert!(child.lookup("missing").is_none());
    }
}
