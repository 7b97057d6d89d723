use std::{cell::RefCell, fmt, rc::Rc};

use derive_more::Display;
use itertools::Itertools;

use crate::{exec::ensure_sufficient_stack, function::FunctionRef};

pub type List = Rc<RefCell<Vec<Val>>>;
type ListPtr = *const RefCell<Vec<Val>>;

/// A runtime value
///
/// Lists are shared by reference. Everything else is either immutable or
/// cheap to copy, so sharing and copying are indistinguishable for them.
#[derive(Clone)]
pub enum Val {
    Int(i64),
    Bool(bool),
    Char(char),
    Float(f64),
    Str(Rc<str>),
    List(List),
    Function(FunctionRef),
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ValKind {
    #[display(fmt = "int")]
    Int,
    #[display(fmt = "bool")]
    Bool,
    #[display(fmt = "char")]
    Char,
    #[display(fmt = "float")]
    Float,
    #[display(fmt = "string")]
    Str,
    #[display(fmt = "list")]
    List,
    #[display(fmt = "function")]
    Function,
    /// Only ever expected, never found
    #[display(fmt = "number")]
    Number,
}

impl Val {
    pub fn list(items: Vec<Val>) -> Self {
        Val::List(Rc::new(RefCell::new(items)))
    }
    pub fn kind(&self) -> ValKind {
        match self {
            Val::Int(_) => ValKind::Int,
            Val::Bool(_) => ValKind::Bool,
            Val::Char(_) => ValKind::Char,
            Val::Float(_) => ValKind::Float,
            Val::Str(_) => ValKind::Str,
            Val::List(_) => ValKind::List,
            Val::Function(_) => ValKind::Function,
        }
    }
    /// The copy made when this value is duplicated on the stack
    ///
    /// Lists get a new container holding the same elements.
    pub fn duplicate(&self) -> Self {
        match self {
            Val::List(items) => Val::list(items.borrow().clone()),
            val => val.clone(),
        }
    }
    /// Whether two values are the same object rather than merely equal
    #[cfg(test)]
    pub fn same_identity(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::List(a), Val::List(b)) => Rc::ptr_eq(a, b),
            (Val::Str(a), Val::Str(b)) => Rc::ptr_eq(a, b),
            (Val::Function(a), Val::Function(b)) => Rc::ptr_eq(a, b),
            (a, b) => a == b,
        }
    }
    /// Text for console output, without literal quoting
    pub fn to_plain(&self) -> String {
        match self {
            Val::Str(s) => s.to_string(),
            Val::Char(c) => c.to_string(),
            val => val.to_string(),
        }
    }
}

thread_local! {
    /// Lists whose contents are being printed, innermost last
    static PRINTING: RefCell<Vec<ListPtr>> = RefCell::new(Vec::new());
}

/// Marks a list as being printed until dropped
struct Printing;

impl Printing {
    /// None if the list is already being printed further out
    fn enter(items: &List) -> Option<Self> {
        let ptr = Rc::as_ptr(items);
        PRINTING.with(|printing| {
            let mut printing = printing.borrow_mut();
            if printing.contains(&ptr) {
                None
            } else {
                printing.push(ptr);
                Some(Printing)
            }
        })
    }
}

impl Drop for Printing {
    fn drop(&mut self) {
        PRINTING.with(|printing| {
            printing.borrow_mut().pop();
        });
    }
}

/// Pairs of lists already being compared are assumed equal
fn eq_tracking(a: &Val, b: &Val, comparing: &mut Vec<(ListPtr, ListPtr)>) -> bool {
    match (a, b) {
        (Val::Int(a), Val::Int(b)) => a == b,
        (Val::Float(a), Val::Float(b)) => a == b,
        (Val::Int(a), Val::Float(b)) | (Val::Float(b), Val::Int(a)) => *a as f64 == *b,
        (Val::Bool(a), Val::Bool(b)) => a == b,
        (Val::Char(a), Val::Char(b)) => a == b,
        (Val::Str(a), Val::Str(b)) => a == b,
        (Val::List(a), Val::List(b)) => {
            let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
            if Rc::ptr_eq(a, b) || comparing.contains(&pair) {
                return true;
            }
            let (a, b) = (a.borrow(), b.borrow());
            if a.len() != b.len() {
                return false;
            }
            comparing.push(pair);
            let equal = ensure_sufficient_stack(|| {
                a.iter().zip(b.iter()).all(|(a, b)| eq_tracking(a, b, comparing))
            });
            comparing.pop();
            equal
        }
        (Val::Function(a), Val::Function(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        eq_tracking(self, other, &mut Vec::new())
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Val::Int(i) => write!(f, "{}", i),
            Val::Bool(b) => write!(f, "{}", b),
            Val::Char(c) => write!(f, "{:?}", c),
            Val::Float(r) => write!(f, "{:?}", r),
            Val::Str(s) => write!(f, "{:?}", s),
            Val::List(items) => match Printing::enter(items) {
                Some(_printing) => ensure_sufficient_stack(|| {
                    write!(f, "({})", items.borrow().iter().join(" "))
                }),
                None => write!(f, "(...)"),
            },
            Val::Function(function) => write!(f, "{}", function),
        }
    }
}

impl fmt::Debug for Val {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl From<i64> for Val {
    fn from(i: i64) -> Self {
        Val::Int(i)
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<char> for Val {
    fn from(c: char) -> Self {
        Val::Char(c)
    }
}

impl From<f64> for Val {
    fn from(r: f64) -> Self {
        Val::Float(r)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::Str(s.into())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::Str(s.into())
    }
}

impl From<FunctionRef> for Val {
    fn from(function: FunctionRef) -> Self {
        Val::Function(function)
    }
}
