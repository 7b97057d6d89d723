use std::{cell::OnceCell, fmt, rc::Rc};

use itertools::Itertools;

use crate::{error::EvalResult, exec::Executor, types::FnType, value::Val};

pub type FunctionRef = Rc<Function>;
pub type Seq = Rc<[FunctionRef]>;

pub type BuiltinFn = fn(&mut Executor) -> EvalResult<()>;
pub type BoundFn = Rc<dyn Fn(&mut Executor) -> EvalResult<()>>;

/// Anything that can be evaluated against an executor
pub enum Function {
    Primitive(Primitive),
    Defined(Defined),
    PushLiteral(Val),
    /// Pushes the contained anonymous function as a value
    PushQuotation(FunctionRef),
}

#[derive(Clone)]
pub enum PrimitiveImpl {
    Free(BuiltinFn),
    /// Calls through a captured host instance
    Bound(BoundFn),
}

pub struct Primitive {
    pub name: &'static str,
    /// Documented stack effect, e.g. `(int int -> int)`
    pub effect: &'static str,
    pub imp: PrimitiveImpl,
}

impl Primitive {
    pub fn call(&self, exec: &mut Executor) -> EvalResult<()> {
        match &self.imp {
            PrimitiveImpl::Free(f) => f(exec),
            PrimitiveImpl::Bound(f) => f(exec),
        }
    }
}

/// A named composition of other functions
///
/// The body is filled in after the function is registered so that the body
/// can refer to the function itself.
pub struct Defined {
    pub name: String,
    pub ty: Option<FnType>,
    body: OnceCell<Seq>,
}

impl Defined {
    pub fn new(name: impl Into<String>, ty: Option<FnType>) -> Self {
        Defined {
            name: name.into(),
            ty,
            body: OnceCell::new(),
        }
    }
    pub fn body(&self) -> Seq {
        self.body
            .get()
            .cloned()
            .unwrap_or_else(|| Rc::from(Vec::new()))
    }
    /// Set the body. Returns false if it was already set.
    pub fn set_body(&self, body: Seq) -> bool {
        self.body.set(body).is_ok()
    }
}

impl Function {
    pub fn primitive(name: &'static str, effect: &'static str, imp: PrimitiveImpl) -> FunctionRef {
        Rc::new(Function::Primitive(Primitive { name, effect, imp }))
    }
    pub fn literal(val: impl Into<Val>) -> FunctionRef {
        Rc::new(Function::PushLiteral(val.into()))
    }
    /// An anonymous function over `body`
    pub fn quotation(body: Seq) -> FunctionRef {
        let defined = Defined::new("", None);
        defined.set_body(body);
        Rc::new(Function::Defined(defined))
    }
    pub fn push_quotation(body: Seq) -> FunctionRef {
        Rc::new(Function::PushQuotation(Function::quotation(body)))
    }
    pub fn name(&self) -> &str {
        match self {
            Function::Primitive(prim) => prim.name,
            Function::Defined(def) => &def.name,
            Function::PushLiteral(_) | Function::PushQuotation(_) => "",
        }
    }
    pub fn sub_functions(&self) -> Seq {
        match self {
            Function::Defined(def) => def.body(),
            Function::PushQuotation(quoted) => quoted.sub_functions(),
            Function::Primitive(_) | Function::PushLiteral(_) => Rc::from(Vec::new()),
        }
    }
    /// The documented or declared stack effect, if there is one
    pub fn effect(&self) -> Option<String> {
        match self {
            Function::Primitive(prim) => Some(prim.effect.into()),
            Function::Defined(def) => def.ty.as_ref().map(ToString::to_string),
            Function::PushLiteral(_) | Function::PushQuotation(_) => None,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Function::Primitive(prim) => write!(f, "{}", prim.name),
            Function::Defined(def) if !def.name.is_empty() => write!(f, "{}", def.name),
            Function::Defined(def) => write!(f, "[{}]", def.body().iter().join(" ")),
            Function::PushLiteral(val) => write!(f, "{}", val),
            Function::PushQuotation(quoted) => write!(f, "{}", quoted),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Function::Primitive(prim) => write!(f, "primitive {} {}", prim.name, prim.effect),
            Function::Defined(def) => write!(f, "defined {:?} {:?}", def.name, def.body()),
            Function::PushLiteral(val) => write!(f, "push {}", val),
            Function::PushQuotation(quoted) => write!(f, "push {}", quoted),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn noop(_: &mut Executor) -> EvalResult<()> {
        Ok(())
    }

    #[test]
    fn names_and_sub_functions() {
        let prim = Function::primitive("noop", "(->)", PrimitiveImpl::Free(noop));
        let one = Function::literal(1i64);
        let quoted = Function::push_quotation(Rc::from(vec![one.clone(), prim.clone()]));
        assert_eq!(prim.name(), "noop");
        assert_eq!(one.name(), "");
        assert!(prim.sub_functions().is_empty());
        assert!(one.sub_functions().is_empty());
        assert_eq!(quoted.sub_functions().len(), 2);
        assert_eq!(quoted.to_string(), "[1 noop]");
        assert_eq!(prim.effect().as_deref(), Some("(->)"));
    }

    #[test]
    fn body_is_set_once() {
        let def = Defined::new("f", None);
        assert!(def.body().is_empty());
        assert!(def.set_body(Rc::from(vec![Function::literal(true)])));
        assert!(!def.set_body(Rc::from(Vec::new())));
        assert_eq!(def.body().len(), 1);
    }
}
