use super::{builtins, Builtin};
use crate::{
    error::{EvalError, EvalResult},
    exec::Executor,
    value::Val,
};

pub const BUILTINS: &[Builtin] = builtins!(
    "+" "(num num -> num)" => add,
    "-" "(num num -> num)" => sub,
    "*" "(num num -> num)" => mul,
    "/" "(num num -> num)" => div,
    "%" "(num num -> num)" => rem,
    "neg" "(num -> num)" => neg,
    "<" "(num num -> bool)" => lt,
    ">" "(num num -> bool)" => gt,
    "<=" "(num num -> bool)" => le,
    ">=" "(num num -> bool)" => ge,
    "eq" "(a a -> bool)" => eq,
    "neq" "(a a -> bool)" => neq,
);

pub const LOGIC: &[Builtin] = builtins!(
    "true" "(-> bool)" => push_true,
    "false" "(-> bool)" => push_false,
    "and" "(bool bool -> bool)" => and,
    "or" "(bool bool -> bool)" => or,
    "not" "(bool -> bool)" => not,
);

/// Pop two numbers, with the top one second
fn operands(exec: &mut Executor) -> EvalResult<(Val, Val)> {
    let b = exec.stack.pop_number()?;
    let a = exec.stack.pop_number()?;
    Ok((a, b))
}

fn as_float(val: &Val) -> f64 {
    match val {
        Val::Int(i) => *i as f64,
        Val::Float(r) => *r,
        _ => f64::NAN,
    }
}

/// Integers stay integers and wrap. Anything involving a float is a float.
fn numeric(
    exec: &mut Executor,
    int: fn(i64, i64) -> EvalResult<i64>,
    float: fn(f64, f64) -> f64,
) -> EvalResult<()> {
    let result = match operands(exec)? {
        (Val::Int(a), Val::Int(b)) => Val::Int(int(a, b)?),
        (a, b) => Val::Float(float(as_float(&a), as_float(&b))),
    };
    exec.stack.push(result);
    Ok(())
}

fn compare(
    exec: &mut Executor,
    int: fn(&i64, &i64) -> bool,
    float: fn(&f64, &f64) -> bool,
) -> EvalResult<()> {
    let result = match operands(exec)? {
        (Val::Int(a), Val::Int(b)) => int(&a, &b),
        (a, b) => float(&as_float(&a), &as_float(&b)),
    };
    exec.stack.push(result);
    Ok(())
}

fn add(exec: &mut Executor) -> EvalResult<()> {
    numeric(exec, |a, b| Ok(a.wrapping_add(b)), |a, b| a + b)
}

fn sub(exec: &mut Executor) -> EvalResult<()> {
    numeric(exec, |a, b| Ok(a.wrapping_sub(b)), |a, b| a - b)
}

fn mul(exec: &mut Executor) -> EvalResult<()> {
    numeric(exec, |a, b| Ok(a.wrapping_mul(b)), |a, b| a * b)
}

fn div(exec: &mut Executor) -> EvalResult<()> {
    numeric(
        exec,
        |a, b| {
            if b == 0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(a.wrapping_div(b))
            }
        },
        |a, b| a / b,
    )
}

fn rem(exec: &mut Executor) -> EvalResult<()> {
    numeric(
        exec,
        |a, b| {
            if b == 0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(a.wrapping_rem(b))
            }
        },
        |a, b| a % b,
    )
}

fn neg(exec: &mut Executor) -> EvalResult<()> {
    let result = match exec.stack.pop_number()? {
        Val::Int(i) => Val::Int(i.wrapping_neg()),
        val => Val::Float(-as_float(&val)),
    };
    exec.stack.push(result);
    Ok(())
}

fn lt(exec: &mut Executor) -> EvalResult<()> {
    compare(exec, i64::lt, f64::lt)
}

fn gt(exec: &mut Executor) -> EvalResult<()> {
    compare(exec, i64::gt, f64::gt)
}

fn le(exec: &mut Executor) -> EvalResult<()> {
    compare(exec, i64::le, f64::le)
}

fn ge(exec: &mut Executor) -> EvalResult<()> {
    compare(exec, i64::ge, f64::ge)
}

fn eq(exec: &mut Executor) -> EvalResult<()> {
    let b = exec.stack.pop()?;
    let a = exec.stack.pop()?;
    exec.stack.push(a == b);
    Ok(())
}

fn neq(exec: &mut Executor) -> EvalResult<()> {
    let b = exec.stack.pop()?;
    let a = exec.stack.pop()?;
    exec.stack.push(a != b);
    Ok(())
}

fn push_true(exec: &mut Executor) -> EvalResult<()> {
    exec.stack.push(true);
    Ok(())
}

fn push_false(exec: &mut Executor) -> EvalResult<()> {
    exec.stack.push(false);
    Ok(())
}

fn and(exec: &mut Executor) -> EvalResult<()> {
    let b = exec.stack.pop_bool()?;
    let a = exec.stack.pop_bool()?;
    exec.stack.push(a && b);
    Ok(())
}

fn or(exec: &mut Executor) -> EvalResult<()> {
    let b = exec.stack.pop_bool()?;
    let a = exec.stack.pop_bool()?;
    exec.stack.push(a || b);
    Ok(())
}

fn not(exec: &mut Executor) -> EvalResult<()> {
    let a = exec.stack.pop_bool()?;
    exec.stack.push(!a);
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        error::{Error, EvalError},
        exec::tests::{error_after, stack_after},
        value::ValKind,
    };

    #[test]
    fn integer_arithmetic() {
        assert_eq!(stack_after("7 2 -"), "[5]");
        assert_eq!(stack_after("7 2 /"), "[3]");
        assert_eq!(stack_after("7 2 %"), "[1]");
        assert_eq!(stack_after("3 neg 4 *"), "[-12]");
        assert_eq!(stack_after("0x7fffffffffffffff 1 +"), "[-9223372036854775808]");
    }

    #[test]
    fn mixed_arithmetic_is_float() {
        assert_eq!(stack_after("1 0.5 +"), "[1.5]");
        assert_eq!(stack_after("3.0 2 /"), "[1.5]");
        assert_eq!(stack_after("1.5 neg"), "[-1.5]");
    }

    #[test]
    fn division_by_zero() {
        assert!(matches!(error_after("1 0 /"), Error::Eval(EvalError::DivisionByZero)));
        assert!(matches!(error_after("1 0 %"), Error::Eval(EvalError::DivisionByZero)));
        assert_eq!(stack_after("1.0 0 / 0 >"), "[true]");
    }

    #[test]
    fn comparisons() {
        assert_eq!(stack_after("1 2 < 2 2 <= 3 2 > 1 2 >="), "[true true true false]");
        assert_eq!(stack_after("2 2.0 eq \"a\" \"a\" eq 1 \"1\" neq"), "[true true true]");
    }

    #[test]
    fn logic() {
        assert_eq!(stack_after("true false and true false or false not"), "[false true true]");
        match error_after("1 true and") {
            Error::Eval(EvalError::TypeMismatch { expected, found }) => {
                assert_eq!(expected, ValKind::Bool);
                assert_eq!(found, ValKind::Int);
            }
            e => panic!("unexpected {}", e),
        }
    }

    #[test]
    fn non_numbers_are_rejected() {
        assert!(matches!(
            error_after("1 'c' +"),
            Error::Eval(EvalError::TypeMismatch {
                expected: ValKind::Number,
                found: ValKind::Char
            })
        ));
    }
}
