use super::{builtins, Builtin};
use crate::{error::EvalResult, exec::Executor, value::Val};

pub const BUILTINS: &[Builtin] = builtins!(
    "pop" "(a ->)" => pop,
    "dup" "(a -> a a)" => dup,
    "swap" "(a b -> b a)" => swap,
    "over" "(a b -> a b a)" => over,
    "clear" "(A ->)" => clear,
    "depth" "(A -> A int)" => depth,
);

fn pop(exec: &mut Executor) -> EvalResult<()> {
    exec.stack.pop()?;
    Ok(())
}

fn dup(exec: &mut Executor) -> EvalResult<()> {
    exec.stack.dup()
}

fn swap(exec: &mut Executor) -> EvalResult<()> {
    exec.stack.swap()
}

fn over(exec: &mut Executor) -> EvalResult<()> {
    let below = exec.stack.peek_below(1)?.duplicate();
    exec.stack.push(below);
    Ok(())
}

fn clear(exec: &mut Executor) -> EvalResult<()> {
    exec.stack.clear();
    Ok(())
}

fn depth(exec: &mut Executor) -> EvalResult<()> {
    let depth = exec.stack.count() as i64;
    exec.stack.push(Val::Int(depth));
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
    fn shuffles() {
        assert_eq!(stack_after("1 2 over"), "[1 2 1]");
        assert_eq!(stack_after("1 2 swap"), "[2 1]");
        assert_eq!(stack_after("1 dup"), "[1 1]");
        assert_eq!(stack_after("1 2 clear 3"), "[3]");
        assert_eq!(stack_after("4 5 depth"), "[4 5 2]");
    }

    #[test]
    fn underflow_reports_counts() {
        assert!(matches!(
            error_after("1 over"),
            Error::Eval(EvalError::StackUnderflow { needed: 2, found: 1 })
        ));
    }
}
