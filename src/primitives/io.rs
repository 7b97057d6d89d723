use std::rc::Rc;

use itertools::Itertools;

use super::{builtins, Builtin, PrimitiveDef, PrimitiveSet};
use crate::{
    console::Console,
    error::EvalResult,
    exec::Executor,
    function::{BoundFn, PrimitiveImpl},
};

pub const MODULE: &[Builtin] = builtins!(
    "load" "(string ->)" => load,
);

/// Failures inside the module are reported, not propagated
fn load(exec: &mut Executor) -> EvalResult<()> {
    let path = exec.stack.pop_str()?;
    exec.load_module(&*path);
    Ok(())
}

/// The output primitives, each writing to `console`
pub fn console_set(console: &Console) -> PrimitiveSet {
    let bound = |name, effect, f: BoundFn| PrimitiveDef {
        name,
        effect,
        imp: PrimitiveImpl::Bound(f),
    };
    let write = console.clone();
    let writeln = console.clone();
    let show = console.clone();
    PrimitiveSet {
        name: "console",
        defs: vec![
            bound(
                "write",
                "(a ->)",
                Rc::new(move |exec: &mut Executor| -> EvalResult<()> {
                    let val = exec.stack.pop()?;
                    write.write(&val.to_plain())?;
                    Ok(())
                }),
            ),
            bound(
                "writeln",
                "(a ->)",
                Rc::new(move |exec: &mut Executor| -> EvalResult<()> {
                    let val = exec.stack.pop()?;
                    writeln.writeln(&val.to_plain())?;
                    Ok(())
                }),
            ),
            bound(
                "show",
                "(A -> A)",
                Rc::new(move |exec: &mut Executor| -> EvalResult<()> {
                    show.writeln(&exec.stack.values().iter().join(" "))?;
                    Ok(())
                }),
            ),
        ],
    }
}
