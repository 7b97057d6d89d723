use itertools::Itertools;

use crate::{
    error::{EvalError, EvalResult},
    function::FunctionRef,
    value::*,
};

/// The evaluation stack. The top is the last element.
#[derive(Debug, Default)]
pub struct Stack {
    vals: Vec<Val>,
}

fn mismatch(expected: ValKind, val: &Val) -> EvalError {
    EvalError::TypeMismatch {
        expected,
        found: val.kind(),
    }
}

macro_rules! typed_pops {
    ($($pop:ident, $variant:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $pop(&mut self) -> EvalResult<$ty> {
                match self.pop()? {
                    Val::$variant(x) => Ok(x),
                    val => Err(mismatch(ValKind::$variant, &val)),
                }
            }
        )*
    };
}

impl Stack {
    pub fn new() -> Self {
        Stack::default()
    }
    pub fn push(&mut self, val: impl Into<Val>) {
        self.vals.push(val.into());
    }
    pub fn pop(&mut self) -> EvalResult<Val> {
        self.vals.pop().ok_or(EvalError::StackUnderflow {
            needed: 1,
            found: 0,
        })
    }
    pub fn peek(&self) -> EvalResult<&Val> {
        self.peek_below(0)
    }
    /// The value `n` places below the top, where 0 is the top
    pub fn peek_below(&self, n: usize) -> EvalResult<&Val> {
        let len = self.vals.len();
        if n < len {
            Ok(&self.vals[len - 1 - n])
        } else {
            Err(EvalError::StackUnderflow {
                needed: n + 1,
                found: len,
            })
        }
    }
    pub fn dup(&mut self) -> EvalResult<()> {
        let top = self.peek()?.duplicate();
        self.vals.push(top);
        Ok(())
    }
    pub fn swap(&mut self) -> EvalResult<()> {
        self.require(2)?;
        let len = self.vals.len();
        self.vals.swap(len - 1, len - 2);
        Ok(())
    }
    pub fn require(&self, needed: usize) -> EvalResult<()> {
        if self.vals.len() < needed {
            Err(EvalError::StackUnderflow {
                needed,
                found: self.vals.len(),
            })
        } else {
            Ok(())
        }
    }
    pub fn count(&self) -> usize {
        self.vals.len()
    }
    pub fn clear(&mut self) {
        self.clear_to(0);
    }
    /// Drop values until at most `n` remain
    pub fn clear_to(&mut self, n: usize) {
        self.vals.truncate(n);
    }
    pub fn values(&self) -> &[Val] {
        &self.vals
    }
    typed_pops!(
        pop_int, Int => i64,
        pop_bool, Bool => bool,
        pop_str, Str => std::rc::Rc<str>,
        pop_list, List => List,
        pop_function, Function => FunctionRef,
    );
    /// The list on top, left in place
    pub fn peek_list(&self) -> EvalResult<&List> {
        match self.peek()? {
            Val::List(items) => Ok(items),
            val => Err(mismatch(ValKind::List, val)),
        }
    }
    /// Pop an int or a float
    pub fn pop_number(&mut self) -> EvalResult<Val> {
        match self.pop()? {
            val @ (Val::Int(_) | Val::Float(_)) => Ok(val),
            val => Err(mismatch(ValKind::Number, &val)),
        }
    }
}

impl std::fmt::Display for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{}]", self.vals.iter().join(" "))
    }
}
