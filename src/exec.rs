use std::{
    fs,
    ops::{Deref, DerefMut},
    path::Path,
    rc::Rc,
};

use crate::{
    ast::Program,
    compile::Context,
    console::Console,
    error::{BuildResult, Error, EvalResult},
    function::*,
    parse::parse,
    primitives,
    stack::Stack,
    value::Val,
};

/// If less than this much native stack remains, grow it
const RED_ZONE: usize = 100 * 1024;
/// How much native stack to add each time
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the native stack if it is nearly exhausted
///
/// Tail calls never recurse, but calls in other positions and quotations
/// invoked by primitives do.
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Print the stack after every successful submission
    pub verbose: bool,
    /// Print the declared type of every new definition
    pub show_types: bool,
    pub allow_redefinition: bool,
}

pub struct Executor {
    pub stack: Stack,
    pub ctx: Context,
    pub config: Config,
    pub console: Console,
    #[cfg(test)]
    depth: usize,
    #[cfg(test)]
    max_depth: usize,
}

impl Executor {
    pub fn new(config: Config) -> BuildResult<Self> {
        Executor::with_console(config, Console::stdio())
    }
    pub fn with_console(config: Config, console: Console) -> BuildResult<Self> {
        let mut ctx = Context::new(config.allow_redefinition);
        primitives::install(&mut ctx.registry, &console)?;
        Ok(Executor {
            stack: Stack::new(),
            ctx,
            config,
            console,
            #[cfg(test)]
            depth: 0,
            #[cfg(test)]
            max_depth: 0,
        })
    }
    /// The deepest nesting of sequence runs so far
    #[cfg(test)]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
    /// Run a sequence of functions
    ///
    /// When the last function of a sequence is a defined one, its body
    /// replaces the sequence instead of being run in a nested call.
    pub fn run(&mut self, seq: Seq) -> EvalResult<()> {
        #[cfg(test)]
        {
            self.depth += 1;
            self.max_depth = self.max_depth.max(self.depth);
        }
        let result = self.run_loop(seq);
        #[cfg(test)]
        {
            self.depth -= 1;
        }
        result
    }
    fn run_loop(&mut self, mut seq: Seq) -> EvalResult<()> {
        loop {
            let next = match seq.split_last() {
                None => return Ok(()),
                Some((last, init)) => {
                    for function in init {
                        self.eval(function)?;
                    }
                    match &**last {
                        Function::Defined(def) => def.body(),
                        _ => return self.eval(last),
                    }
                }
            };
            seq = next;
        }
    }
    /// Evaluate one function for its effect
    pub fn eval(&mut self, function: &FunctionRef) -> EvalResult<()> {
        match &**function {
            Function::Primitive(prim) => {
                tracing::trace!(name = prim.name, depth = self.stack.count(), "primitive");
                prim.call(self)
            }
            Function::Defined(def) => {
                let body = def.body();
                ensure_sufficient_stack(|| self.run(body))
            }
            Function::PushLiteral(val) => {
                self.stack.push(val.clone());
                Ok(())
            }
            Function::PushQuotation(quoted) => {
                self.stack.push(Val::Function(Rc::clone(quoted)));
                Ok(())
            }
        }
    }
    /// Call a function value taken off the stack
    pub fn invoke(&mut self, function: &FunctionRef) -> EvalResult<()> {
        self.eval(function)
    }
    /// Parse, convert and run one submission, returning any failure
    pub fn try_execute(&mut self, text: &str) -> Result<(), Error> {
        let tree = parse(text)?;
        let program = Program::from_tree(&tree)?;
        #[cfg(feature = "debug")]
        println!("{:#?}", program);
        let converted = self.ctx.nodes_to_fxns(&program.terms);
        self.show_definitions();
        let fxns = converted?;
        self.run(fxns.into())?;
        Ok(())
    }
    /// Parse, convert and run one submission
    ///
    /// Failures are reported on the console and never escape. Whatever the
    /// submission changed before failing stays changed.
    pub fn execute(&mut self, text: &str) -> bool {
        match self.try_execute(text) {
            Ok(()) => {
                if self.config.verbose {
                    self.show_stack();
                }
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "submission failed");
                self.console.error(&e.to_string());
                false
            }
        }
    }
    /// Execute a file with verbose output and type display switched off
    ///
    /// Failures are reported, never propagated.
    pub fn load_module(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading module");
        let mut quiet = self.quiet();
        let result = match fs::read_to_string(path) {
            Ok(text) => quiet.try_execute(&text),
            Err(e) => Err(Error::Eval(e.into())),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                quiet
                    .console
                    .error(&format!("in module {}: {}", path.display(), e));
                false
            }
        }
    }
    /// Switch off verbose output and type display until the guard drops
    pub fn quiet(&mut self) -> Quiet<'_> {
        let saved = self.config;
        self.config.verbose = false;
        self.config.show_types = false;
        Quiet { exec: self, saved }
    }
    pub fn show_stack(&self) {
        if let Err(e) = self.console.writeln(&self.stack.to_string()) {
            self.console.error(&e.to_string());
        }
    }
    fn show_definitions(&mut self) {
        let defined = self.ctx.take_defined();
        if !self.config.show_types {
            return;
        }
        for function in defined {
            if let Some(effect) = function.effect() {
                let line = format!("{} : {}", function.name(), effect);
                if let Err(e) = self.console.writeln(&line) {
                    self.console.error(&e.to_string());
                }
            }
        }
    }
}

/// Scoped override of the display settings
///
/// Restores them when dropped, including during unwinding.
pub struct Quiet<'a> {
    exec: &'a mut Executor,
    saved: Config,
}

impl Drop for Quiet<'_> {
    fn drop(&mut self) {
        self.exec.config.verbose = self.saved.verbose;
        self.exec.config.show_types = self.saved.show_types;
    }
}

impl Deref for Quiet<'_> {
    type Target = Executor;
    fn deref(&self) -> &Self::Target {
        self.exec
    }
}

impl DerefMut for Quiet<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.exec
    }
}
