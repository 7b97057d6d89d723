use std::{collections::HashMap, rc::Rc};

use crate::{
    error::{BuildError, BuildResult},
    function::FunctionRef,
};

/// Every addressable function, by name
#[derive(Default)]
pub struct Registry {
    functions: HashMap<String, FunctionRef>,
    pub allow_redefinition: bool,
}

impl Registry {
    pub fn new(allow_redefinition: bool) -> Self {
        Registry {
            functions: HashMap::new(),
            allow_redefinition,
        }
    }
    pub fn lookup(&self, name: &str) -> Option<FunctionRef> {
        self.functions.get(name).cloned()
    }
    pub fn throwing_lookup(&self, name: &str) -> BuildResult<FunctionRef> {
        if name.is_empty() {
            return Err(BuildError::UnknownFunction(String::new()));
        }
        self.lookup(name)
            .ok_or_else(|| BuildError::UnknownFunction(name.into()))
    }
    /// Install a function under its own name
    pub fn add_function(&mut self, function: FunctionRef) -> BuildResult<FunctionRef> {
        let name = function.name();
        if name.is_empty() {
            return Err(BuildError::UnconvertibleNode("an anonymous function".into()));
        }
        if !self.allow_redefinition && self.functions.contains_key(name) {
            return Err(BuildError::DuplicateFunction(name.into()));
        }
        tracing::trace!(name, "installing function");
        self.functions.insert(name.into(), Rc::clone(&function));
        Ok(function)
    }
    /// Put back whatever was under `name` before a failed definition
    pub(crate) fn restore(&mut self, name: &str, previous: Option<FunctionRef>) {
        match previous {
            Some(function) => {
                self.functions.insert(name.into(), function);
            }
            None => {
                self.functions.remove(name);
            }
        }
    }
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
    pub fn len(&self) -> usize {
        self.functions.len()
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Function;

    fn named(name: &str, val: i64) -> FunctionRef {
        let def = crate::function::Defined::new(name, None);
        def.set_body(Rc::from(vec![Function::literal(val)]));
        Rc::new(Function::Defined(def))
    }

    #[test]
    fn lookup_never_fails() {
        let registry = Registry::new(false);
        assert!(registry.lookup("missing").is_none());
        assert_eq!(
            registry.throwing_lookup("missing").unwrap_err(),
            BuildError::UnknownFunction("missing".into())
        );
        assert_eq!(
            registry.throwing_lookup("").unwrap_err(),
            BuildError::UnknownFunction(String::new())
        );
    }

    #[test]
    fn lookup_is_stable() {
        let mut registry = Registry::new(false);
        registry.add_function(named("f", 1)).unwrap();
        let a = registry.lookup("f").unwrap();
        let b = registry.lookup("f").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn redefinition_denied() {
        let mut registry = Registry::new(false);
        let first = registry.add_function(named("f", 1)).unwrap();
        assert_eq!(
            registry.add_function(named("f", 2)).unwrap_err(),
            BuildError::DuplicateFunction("f".into())
        );
        assert!(Rc::ptr_eq(&registry.lookup("f").unwrap(), &first));
    }

    #[test]
    fn redefinition_allowed() {
        let mut registry = Registry::new(true);
        registry.add_function(named("f", 1)).unwrap();
        let second = registry.add_function(named("f", 2)).unwrap();
        assert!(Rc::ptr_eq(&registry.lookup("f").unwrap(), &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn restore_previous_entry() {
        let mut registry = Registry::new(true);
        let first = registry.add_function(named("f", 1)).unwrap();
        registry.add_function(named("f", 2)).unwrap();
        registry.restore("f", Some(first.clone()));
        assert!(Rc::ptr_eq(&registry.lookup("f").unwrap(), &first));
        registry.restore("f", None);
        assert!(!registry.contains("f"));
    }
}
