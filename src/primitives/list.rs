use super::{builtins, Builtin};
use crate::{
    error::{EvalError, EvalResult},
    exec::Executor,
    function::FunctionRef,
    value::{Val, ValKind},
};

pub const BUILTINS: &[Builtin] = builtins!(
    "nil" "(-> list)" => nil,
    "cons" "(list a -> list)" => cons,
    "uncons" "(list -> list a)" => uncons,
    "empty" "(list -> list bool)" => empty,
    "count" "(list -> list int)" => count,
    "nth" "(list int -> list a)" => nth,
    "map" "(list [f] -> list)" => map,
    "filter" "(list [f] -> list)" => filter,
    "fold" "(list init [f] -> acc)" => fold,
);

fn nil(exec: &mut Executor) -> EvalResult<()> {
    exec.stack.push(Val::list(Vec::new()));
    Ok(())
}

fn cons(exec: &mut Executor) -> EvalResult<()> {
    let item = exec.stack.pop()?;
    exec.stack.peek_list()?.borrow_mut().push(item);
    Ok(())
}

fn uncons(exec: &mut Executor) -> EvalResult<()> {
    let item = exec.stack.peek_list()?.borrow_mut().pop();
    let item = item.ok_or(EvalError::IndexOutOfRange { index: 0, len: 0 })?;
    exec.stack.push(item);
    Ok(())
}

fn empty(exec: &mut Executor) -> EvalResult<()> {
    let empty = exec.stack.peek_list()?.borrow().is_empty();
    exec.stack.push(empty);
    Ok(())
}

fn count(exec: &mut Executor) -> EvalResult<()> {
    let len = exec.stack.peek_list()?.borrow().len() as i64;
    exec.stack.push(len);
    Ok(())
}

fn nth(exec: &mut Executor) -> EvalResult<()> {
    let index = exec.stack.pop_int()?;
    let item = {
        let items = exec.stack.peek_list()?.borrow();
        usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i).cloned())
            .ok_or(EvalError::IndexOutOfRange {
                index,
                len: items.len(),
            })?
    };
    exec.stack.push(item);
    Ok(())
}

/// Run `f` on each item in turn, collecting the value each call leaves
fn each(exec: &mut Executor, items: Vec<Val>, f: &FunctionRef) -> EvalResult<Vec<Val>> {
    let mut results = Vec::with_capacity(items.len());
    for item in items {
        exec.stack.push(item);
        exec.invoke(f)?;
        results.push(exec.stack.pop()?);
    }
    Ok(results)
}

fn map(exec: &mut Executor) -> EvalResult<()> {
    let f = exec.stack.pop_function()?;
    let items = exec.stack.pop_list()?.borrow().clone();
    let mapped = each(exec, items, &f)?;
    exec.stack.push(Val::list(mapped));
    Ok(())
}

fn filter(exec: &mut Executor) -> EvalResult<()> {
    let f = exec.stack.pop_function()?;
    let items = exec.stack.pop_list()?.borrow().clone();
    let keep = each(exec, items.clone(), &f)?;
    let mut kept = Vec::new();
    for (item, keep) in items.into_iter().zip(keep) {
        match keep {
            Val::Bool(true) => kept.push(item),
            Val::Bool(false) => {}
            val => {
                return Err(EvalError::TypeMismatch {
                    expected: ValKind::Bool,
                    found: val.kind(),
                })
            }
        }
    }
    exec.stack.push(Val::list(kept));
    Ok(())
}

fn fold(exec: &mut Executor) -> EvalResult<()> {
    let f = exec.stack.pop_function()?;
    let init = exec.stack.pop()?;
    let items = exec.stack.pop_list()?.borrow().clone();
    exec.stack.push(init);
    for item in items {
        exec.stack.push(item);
        exec.invoke(&f)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        error::{Error, EvalError},
        exec::tests::{error_after, stack_after},
    };

    #[test]
    fn building_and_taking_apart() {
        assert_eq!(stack_after("nil 1 cons 2 cons"), "[(1 2)]");
        assert_eq!(stack_after("nil 1 cons 2 cons uncons"), "[(1) 2]");
        assert_eq!(stack_after("nil empty swap 1 cons empty"), "[true (1) false]");
        assert_eq!(stack_after("nil 7 cons 8 cons count"), "[(7 8) 2]");
        assert_eq!(stack_after("nil 7 cons 8 cons 1 nth"), "[(7 8) 8]");
    }

    #[test]
    fn cons_mutates_in_place_but_dup_copies() {
        assert_eq!(stack_after("nil dup 1 cons"), "[() (1)]");
    }

    #[test]
    fn lists_holding_themselves() {
        let shared = "nil quote dup apply swap apply cons";
        let crossed = "nil nil cons dup uncons swap pop swap cons";
        for cycle in [shared, crossed] {
            assert_eq!(stack_after(cycle), "[((...))]");
            assert_eq!(stack_after(&format!("{} str", cycle)), r#"["((...))"]"#);
            assert_eq!(stack_after(&format!("{} dup eq", cycle)), "[true]");
            assert_eq!(stack_after(&format!("{} nil 1 cons neq", cycle)), "[true]");
        }
    }

    #[test]
    fn out_of_range() {
        assert!(matches!(
            error_after("nil 1 cons 3 nth"),
            Error::Eval(EvalError::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert!(matches!(
            error_after("nil 1 cons -1 nth"),
            Error::Eval(EvalError::IndexOutOfRange { index: -1, len: 1 })
        ));
        assert!(matches!(
            error_after("nil uncons"),
            Error::Eval(EvalError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn higher_order() {
        let list = "nil 1 cons 2 cons 3 cons 4 cons";
        assert_eq!(stack_after(&format!("{} [dup *] map", list)), "[(1 4 9 16)]");
        assert_eq!(stack_after(&format!("{} [2 % 0 eq] filter", list)), "[(2 4)]");
        assert_eq!(stack_after(&format!("{} 0 [+] fold", list)), "[10]");
        assert!(matches!(
            error_after(&format!("{} [1] filter", list)),
            Error::Eval(EvalError::TypeMismatch { .. })
        ));
    }
}
