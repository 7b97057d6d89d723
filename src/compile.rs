use std::{mem, rc::Rc};

use crate::{
    ast::*,
    error::{BuildError, BuildResult},
    function::*,
    macros::{MacroRule, MacroTable},
    resolve::Registry,
};

/// Everything a session knows: its functions and its macros
pub struct Context {
    pub registry: Registry,
    pub macros: MacroTable,
    defined: Vec<FunctionRef>,
}

impl Context {
    pub fn new(allow_redefinition: bool) -> Self {
        Context {
            registry: Registry::new(allow_redefinition),
            macros: MacroTable::new(),
            defined: Vec::new(),
        }
    }
    /// Definitions installed since the last call
    pub fn take_defined(&mut self) -> Vec<FunctionRef> {
        mem::take(&mut self.defined)
    }
    /// Turn a term sequence into the functions that evaluate it
    ///
    /// Definitions and macro declarations are installed as they are reached,
    /// so they are visible to everything after them. Each run of terms
    /// between them is macro-rewritten before conversion.
    pub fn nodes_to_fxns(&mut self, terms: &[Term]) -> BuildResult<Vec<FunctionRef>> {
        let mut fxns = Vec::new();
        let mut run = Vec::new();
        for term in terms {
            match &term.kind {
                TermKind::Definition(_) | TermKind::Macro(_) => {
                    self.compile_run(mem::take(&mut run), &mut fxns)?;
                    self.compile_term(term)?;
                }
                _ => run.push(term.clone()),
            }
        }
        self.compile_run(run, &mut fxns)?;
        Ok(fxns)
    }
    fn compile_run(&mut self, run: Vec<Term>, fxns: &mut Vec<FunctionRef>) -> BuildResult<()> {
        if run.is_empty() {
            return Ok(());
        }
        let run = self.macros.rewrite(run)?;
        for term in &run {
            fxns.extend(self.compile_term(term)?);
        }
        Ok(())
    }
    /// Convert one term. Declarations produce no function.
    pub fn compile_term(&mut self, term: &Term) -> BuildResult<Option<FunctionRef>> {
        Ok(Some(match &term.kind {
            TermKind::Name(name) => self.registry.throwing_lookup(name)?,
            TermKind::Literal(literal) => Function::literal(literal.value()?),
            TermKind::Quotation { terms, .. } => {
                let body = self.nodes_to_fxns(terms)?;
                Function::push_quotation(body.into())
            }
            TermKind::Definition(def) => {
                self.make_function(def)?;
                return Ok(None);
            }
            TermKind::Macro(decl) => {
                self.macros.add_macro(MacroRule::from((**decl).clone()))?;
                return Ok(None);
            }
            TermKind::TypeVar(name) => {
                return Err(BuildError::UnconvertibleNode(format!(
                    "type variable ${} outside a macro",
                    name
                )))
            }
            TermKind::StackVar(name) => {
                return Err(BuildError::UnconvertibleNode(format!(
                    "stack variable ${} outside a macro",
                    name
                )))
            }
        }))
    }
    /// Build and install a definition
    ///
    /// The function is registered before its body is converted so that the
    /// body can call it. If the body fails to convert, whatever was
    /// registered under the name before is put back.
    pub fn make_function(&mut self, def: &Definition) -> BuildResult<FunctionRef> {
        if !def.params.is_empty() {
            return Err(BuildError::UnconvertibleNode(format!(
                "definition {:?} with named parameters",
                def.name
            )));
        }
        let previous = self.registry.lookup(&def.name);
        let defined = Rc::new(Function::Defined(Defined::new(&def.name, def.ty.clone())));
        let function = self.registry.add_function(defined)?;
        let body = match self.nodes_to_fxns(&def.body) {
            Ok(body) => body,
            Err(e) => {
                self.registry.restore(&def.name, previous);
                return Err(e);
            }
        };
        if let Function::Defined(defined) = &*function {
            defined.set_body(body.into());
        }
        tracing::debug!(name = %def.name, "defined function");
        self.defined.push(Rc::clone(&function));
        Ok(function)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{parse::parse, value::Val};

    fn context() -> Context {
        let mut ctx = Context::new(false);
        fn plus(_: &mut crate::exec::Executor) -> crate::error::EvalResult<()> {
            Ok(())
        }
        ctx.registry
            .add_function(Function::primitive("+", "(int int -> int)", PrimitiveImpl::Free(plus)))
            .unwrap();
        ctx
    }

    fn compile(ctx: &mut Context, input: &str) -> BuildResult<Vec<FunctionRef>> {
        let program = Program::from_tree(&parse(input).unwrap()).unwrap();
        ctx.nodes_to_fxns(&program.terms)
    }

    fn shown(fxns: &[FunctionRef]) -> Vec<String> {
        fxns.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn literals_and_names() {
        let mut ctx = context();
        let fxns = compile(&mut ctx, "1 0x10 'c' \"s\" 2.5 +").unwrap();
        assert_eq!(shown(&fxns), vec!["1", "16", "'c'", "\"s\"", "2.5", "+"]);
        match &*fxns[1] {
            Function::PushLiteral(val) => assert_eq!(val, &Val::Int(16)),
            f => panic!("unexpected {:?}", f),
        }
    }

    #[test]
    fn quotations_nest() {
        let mut ctx = context();
        let fxns = compile(&mut ctx, "[1 [2 +]]").unwrap();
        assert_eq!(fxns.len(), 1);
        assert!(matches!(&*fxns[0], Function::PushQuotation(_)));
        assert_eq!(fxns[0].to_string(), "[1 [2 +]]");
    }

    #[test]
    fn definitions_install_and_contribute_nothing() {
        let mut ctx = context();
        let fxns = compile(&mut ctx, "define inc { 1 + } 5 inc").unwrap();
        assert_eq!(shown(&fxns), vec!["5", "inc"]);
        let inc = ctx.registry.lookup("inc").unwrap();
        assert_eq!(shown(&inc.sub_functions()), vec!["1", "+"]);
        assert!(Rc::ptr_eq(&inc, &fxns[1]));
        assert_eq!(ctx.take_defined().len(), 1);
    }

    #[test]
    fn definitions_see_themselves_and_earlier_names_only() {
        let mut ctx = context();
        compile(&mut ctx, "define loop { loop }").unwrap();
        let looped = ctx.registry.lookup("loop").unwrap();
        assert!(Rc::ptr_eq(&looped.sub_functions()[0], &looped));
        assert_eq!(
            compile(&mut ctx, "define early { later } define later { 1 }").unwrap_err(),
            BuildError::UnknownFunction("later".into())
        );
    }

    #[test]
    fn nested_definitions() {
        let mut ctx = context();
        compile(&mut ctx, "define outer { define inner { 2 } inner inner + }").unwrap();
        assert!(ctx.registry.contains("inner"));
        assert_eq!(
            shown(&ctx.registry.lookup("outer").unwrap().sub_functions()),
            vec!["inner", "inner", "+"]
        );
    }

    #[test]
    fn failed_definition_restores_previous() {
        let mut ctx = context();
        assert!(compile(&mut ctx, "define f { missing }").is_err());
        assert!(!ctx.registry.contains("f"));
        ctx.registry.allow_redefinition = true;
        compile(&mut ctx, "define f { 1 }").unwrap();
        let before = ctx.registry.lookup("f").unwrap();
        assert!(compile(&mut ctx, "define f { missing }").is_err());
        assert!(Rc::ptr_eq(&ctx.registry.lookup("f").unwrap(), &before));
    }

    #[test]
    fn duplicate_definition_denied() {
        let mut ctx = context();
        compile(&mut ctx, "define f { 1 }").unwrap();
        assert_eq!(
            compile(&mut ctx, "define f { 2 }").unwrap_err(),
            BuildError::DuplicateFunction("f".into())
        );
        assert_eq!(shown(&ctx.registry.lookup("f").unwrap().sub_functions()), vec!["1"]);
    }

    #[test]
    fn unconvertible_terms() {
        let mut ctx = context();
        assert!(matches!(
            compile(&mut ctx, "$a"),
            Err(BuildError::UnconvertibleNode(_))
        ));
        assert!(matches!(
            compile(&mut ctx, "define f(x) { x }"),
            Err(BuildError::UnconvertibleNode(_))
        ));
        assert!(matches!(
            compile(&mut ctx, "0b2"),
            Err(BuildError::Ast(crate::error::AstError::MalformedLiteral { .. }))
        ));
    }

    #[test]
    fn macros_rewrite_later_terms() {
        let mut ctx = context();
        assert_eq!(
            compile(&mut ctx, "1 incr macro { incr } => { 1 + }").unwrap_err(),
            BuildError::UnknownFunction("incr".into())
        );
        assert!(ctx.macros.is_empty());
        let fxns = compile(&mut ctx, "macro { incr } => { 1 + } 2 incr [incr]").unwrap();
        assert_eq!(shown(&fxns), vec!["2", "1", "+", "[1 +]"]);
        assert_eq!(ctx.macros.len(), 1);
        let fxns = compile(&mut ctx, "incr").unwrap();
        assert_eq!(shown(&fxns), vec!["1", "+"]);
    }
}
