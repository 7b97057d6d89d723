use super::{builtins, Builtin};
use crate::{error::EvalResult, exec::Executor};

pub const BUILTINS: &[Builtin] = builtins!(
    "str" "(a -> string)" => to_str,
    "concat" "(string string -> string)" => concat,
    "strlen" "(string -> int)" => strlen,
);

fn to_str(exec: &mut Executor) -> EvalResult<()> {
    let text = exec.stack.pop()?.to_plain();
    exec.stack.push(text);
    Ok(())
}

fn concat(exec: &mut Executor) -> EvalResult<()> {
    let b = exec.stack.pop_str()?;
    let a = exec.stack.pop_str()?;
    exec.stack.push(format!("{}{}", a, b));
    Ok(())
}

fn strlen(exec: &mut Executor) -> EvalResult<()> {
    let len = exec.stack.pop_str()?.chars().count() as i64;
    exec.stack.push(len);
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::exec::tests::stack_after;

    #[test]
    fn text() {
        assert_eq!(stack_after("12 str"), r#"["12"]"#);
        assert_eq!(stack_after("'c' str \"d\" concat"), r#"["cd"]"#);
        assert_eq!(stack_after("\"héllo\" strlen"), "[5]");
        assert_eq!(stack_after("nil 1 cons str"), r#"["(1)"]"#);
    }
}
