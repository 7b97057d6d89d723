use std::rc::Rc;

use super::{builtins, Builtin};
use crate::{
    error::{EvalError, EvalResult},
    exec::Executor,
    function::{Function, FunctionRef},
};

pub const BUILTINS: &[Builtin] = builtins!(
    "apply" "([A -> B] -> B)" => apply,
    "dip" "(a [f] -> .. a)" => dip,
    "compose" "([f] [g] -> [f g])" => compose,
    "quote" "(a -> [a])" => quote,
    "if" "(bool [t] [f] -> ..)" => if_,
    "while" "([body] [cond] -> ..)" => while_,
    "repeat" "([f] int -> ..)" => repeat,
    "abort" "(string ->)" => abort,
);

fn apply(exec: &mut Executor) -> EvalResult<()> {
    let f = exec.stack.pop_function()?;
    exec.invoke(&f)
}

fn dip(exec: &mut Executor) -> EvalResult<()> {
    let f = exec.stack.pop_function()?;
    let kept = exec.stack.pop()?;
    exec.invoke(&f)?;
    exec.stack.push(kept);
    Ok(())
}

/// The functions a composed quotation runs for `f`
fn spliced(f: &FunctionRef) -> Vec<FunctionRef> {
    match &**f {
        Function::Defined(def) if def.name.is_empty() => f.sub_functions().to_vec(),
        _ => vec![Rc::clone(f)],
    }
}

fn compose(exec: &mut Executor) -> EvalResult<()> {
    let g = exec.stack.pop_function()?;
    let f = exec.stack.pop_function()?;
    let mut body = spliced(&f);
    body.extend(spliced(&g));
    exec.stack.push(Function::quotation(body.into()));
    Ok(())
}

fn quote(exec: &mut Executor) -> EvalResult<()> {
    let val = exec.stack.pop()?;
    exec.stack.push(Function::quotation(Rc::from(vec![Function::literal(val)])));
    Ok(())
}

fn if_(exec: &mut Executor) -> EvalResult<()> {
    let otherwise = exec.stack.pop_function()?;
    let then = exec.stack.pop_function()?;
    let condition = exec.stack.pop_bool()?;
    exec.invoke(if condition { &then } else { &otherwise })
}

fn while_(exec: &mut Executor) -> EvalResult<()> {
    let condition = exec.stack.pop_function()?;
    let body = exec.stack.pop_function()?;
    loop {
        exec.invoke(&condition)?;
        if !exec.stack.pop_bool()? {
            return Ok(());
        }
        exec.invoke(&body)?;
    }
}

fn repeat(exec: &mut Executor) -> EvalResult<()> {
    let times = exec.stack.pop_int()?;
    let f = exec.stack.pop_function()?;
    for _ in 0..times {
        exec.invoke(&f)?;
    }
    Ok(())
}

fn abort(exec: &mut Executor) -> EvalResult<()> {
    let message = exec.stack.pop_str()?;
    Err(EvalError::Aborted(message.to_string()))
}
