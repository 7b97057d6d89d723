//! Built-in functions
//!
//! Each set is a fixed table of `(name, stack effect, implementation)`
//! entries. Most are free functions over the executor. The console set is
//! built at startup around the console it writes to.

mod arith;
mod control;
mod io;
mod list;
mod shuffle;
mod text;

use crate::{
    console::Console,
    error::{BuildError, BuildResult},
    function::{BuiltinFn, Function, PrimitiveImpl},
    resolve::Registry,
};

/// A free-standing built-in
pub struct Builtin {
    pub name: &'static str,
    pub effect: &'static str,
    pub f: BuiltinFn,
}

macro_rules! builtins {
    ($($name:literal $effect:literal => $f:expr),* $(,)?) => {
        &[$($crate::primitives::Builtin { name: $name, effect: $effect, f: $f }),*]
    };
}
pub(crate) use builtins;

pub struct PrimitiveDef {
    pub name: &'static str,
    pub effect: &'static str,
    pub imp: PrimitiveImpl,
}

/// A named group of built-ins
pub struct PrimitiveSet {
    pub name: &'static str,
    pub defs: Vec<PrimitiveDef>,
}

impl PrimitiveSet {
    fn free(name: &'static str, builtins: &'static [Builtin]) -> Self {
        PrimitiveSet {
            name,
            defs: builtins
                .iter()
                .map(|builtin| PrimitiveDef {
                    name: builtin.name,
                    effect: builtin.effect,
                    imp: PrimitiveImpl::Free(builtin.f),
                })
                .collect(),
        }
    }
}

/// Every primitive set, with the console set bound to `console`
pub fn sets(console: &Console) -> Vec<PrimitiveSet> {
    vec![
        PrimitiveSet::free("shuffle", shuffle::BUILTINS),
        PrimitiveSet::free("arithmetic", arith::BUILTINS),
        PrimitiveSet::free("logic", arith::LOGIC),
        PrimitiveSet::free("control", control::BUILTINS),
        PrimitiveSet::free("list", list::BUILTINS),
        PrimitiveSet::free("text", text::BUILTINS),
        PrimitiveSet::free("module", io::MODULE),
        io::console_set(console),
    ]
}

/// Register every primitive
///
/// Two entries with the same name are a defect in the tables, so this fails
/// whatever the redefinition policy is.
pub fn install(registry: &mut Registry, console: &Console) -> BuildResult<()> {
    for set in sets(console) {
        tracing::debug!(set = set.name, count = set.defs.len(), "installing primitives");
        for def in set.defs {
            if registry.contains(def.name) {
                return Err(BuildError::DuplicateFunction(def.name.into()));
            }
            registry.add_function(Function::primitive(def.name, def.effect, def.imp))?;
        }
    }
    tracing::debug!(count = registry.len(), "primitives installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_primitive_is_installed_once() {
        let (console, _) = Console::capture();
        let mut registry = Registry::new(false);
        install(&mut registry, &console).unwrap();
        let total: usize = sets(&console).iter().map(|set| set.defs.len()).sum();
        assert_eq!(registry.len(), total);
        for name in ["+", "dup", "apply", "cons", "writeln", "load", "true"] {
            let function = registry.lookup(name).unwrap();
            assert!(matches!(&*function, Function::Primitive(_)));
            assert!(function.sub_functions().is_empty());
            assert!(function.effect().unwrap().starts_with('('));
        }
    }

    #[test]
    fn duplicate_primitives_are_fatal() {
        let (console, _) = Console::capture();
        let mut registry = Registry::new(true);
        install(&mut registry, &console).unwrap();
        assert_eq!(
            install(&mut registry, &console).unwrap_err(),
            BuildError::DuplicateFunction("pop".into())
        );
    }
}
