//! Term rewriting
//!
//! A macro pairs a pattern with a template. Patterns match names and literals
//! exactly, `$a` against any single term and `$A` against any run of terms
//! (shortest first). A quotation in a pattern matches a quotation whose whole
//! body matches the inner pattern. Rewriting happens on term sequences right
//! before they are turned into functions.

use std::{collections::HashMap, rc::Rc};

use rpds::Vector;

use crate::{
    ast::{MacroDecl, Term, TermKind},
    error::{BuildError, BuildResult},
};

pub const MAX_REWRITES: usize = 10_000;
/// Match steps allowed in one scan of a sequence
pub const MAX_MATCH_STEPS: usize = 1_000_000;

/// What a pattern variable matched, borrowed from the terms being matched
#[derive(Debug, Clone, Copy)]
enum Binding<'t> {
    One(&'t Term),
    Run(&'t [Term]),
}

type Bindings<'p, 't> = HashMap<&'p str, Binding<'t>>;

#[derive(Debug, Clone, PartialEq)]
pub struct MacroRule {
    pub pattern: Vec<Term>,
    pub template: Vec<Term>,
}

impl From<MacroDecl> for MacroRule {
    fn from(decl: MacroDecl) -> Self {
        MacroRule {
            pattern: decl.pattern,
            template: decl.template,
        }
    }
}

impl MacroRule {
    fn validate(&self) -> BuildResult<()> {
        let anchored = self
            .pattern
            .iter()
            .any(|term| !matches!(term.kind, TermKind::StackVar(_)));
        if !anchored {
            return Err(BuildError::UnconvertibleNode(
                "a macro pattern made only of stack variables".into(),
            ));
        }
        let mut bound = Vec::new();
        collect_vars(&self.pattern, &mut bound);
        let mut used = Vec::new();
        collect_vars(&self.template, &mut used);
        if let Some(unbound) = used.iter().find(|var| !bound.contains(var)) {
            return Err(BuildError::UnconvertibleNode(format!(
                "a macro template using unbound variable ${}",
                unbound
            )));
        }
        Ok(())
    }
}

fn collect_vars(terms: &[Term], vars: &mut Vec<String>) {
    for term in terms {
        match &term.kind {
            TermKind::TypeVar(name) | TermKind::StackVar(name) => vars.push(name.clone()),
            TermKind::Quotation { terms: inner, .. } => collect_vars(inner, vars),
            _ => {}
        }
    }
}

/// Every macro declared so far, in declaration order
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    rules: Vector<Rc<MacroRule>>,
}

impl MacroTable {
    pub fn new() -> Self {
        MacroTable::default()
    }
    pub fn add_macro(&mut self, rule: MacroRule) -> BuildResult<()> {
        rule.validate()?;
        tracing::debug!(
            pattern = %rule.pattern.iter().map(ToString::to_string).collect::<Vec<_>>().join(" "),
            "registering macro"
        );
        self.rules.push_back_mut(Rc::new(rule));
        tracing::trace!(count = self.len(), "macro table grew");
        Ok(())
    }
    pub fn len(&self) -> usize {
        self.rules.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
    /// Rewrite until no rule matches anywhere
    pub fn rewrite(&self, mut terms: Vec<Term>) -> BuildResult<Vec<Term>> {
        if self.is_empty() {
            return Ok(terms);
        }
        let mut rewrites = 0;
        loop {
            let mut matcher = Matcher::default();
            let found = self.find_match(&terms, &mut matcher);
            if matcher.exhausted() {
                return Err(BuildError::MacroMatchLimit(MAX_MATCH_STEPS));
            }
            let (start, len, replacement) = match found {
                Some(found) => found,
                None => break,
            };
            rewrites += 1;
            if rewrites > MAX_REWRITES {
                return Err(BuildError::MacroExpansionLimit(MAX_REWRITES));
            }
            terms.splice(start..start + len, replacement);
        }
        Ok(terms)
    }
    /// The leftmost match of any rule, as (start, matched length, replacement)
    fn find_match(
        &self,
        terms: &[Term],
        matcher: &mut Matcher,
    ) -> Option<(usize, usize, Vec<Term>)> {
        (0..terms.len()).find_map(|start| {
            let rest = &terms[start..];
            self.rules.iter().find_map(|rule| {
                if !anchors_present(&rule.pattern, rest) {
                    return None;
                }
                matcher
                    .match_seq(&rule.pattern, rest, Bindings::new(), false)
                    .filter(|(len, _)| *len > 0)
                    .map(|(len, bindings)| (start, len, substitute(&rule.template, &bindings)))
            })
        })
    }
}

/// Whether every plain term of `pattern` occurs somewhere in `terms`
fn anchors_present(pattern: &[Term], terms: &[Term]) -> bool {
    pattern
        .iter()
        .filter(|term| is_plain(term))
        .all(|anchor| terms.iter().any(|term| anchor.same_shape(term)))
}

/// Names and literals, which only match themselves
fn is_plain(term: &Term) -> bool {
    matches!(term.kind, TermKind::Name(_) | TermKind::Literal(_))
}

/// Counts match steps during one scan for a match
#[derive(Default)]
struct Matcher {
    steps: usize,
}

impl Matcher {
    fn exhausted(&self) -> bool {
        self.steps >= MAX_MATCH_STEPS
    }
    /// Match `pattern` against a prefix of `terms`, or against all of them if
    /// `whole` is set. Returns the number of terms consumed.
    fn match_seq<'p, 't>(
        &mut self,
        pattern: &'p [Term],
        terms: &'t [Term],
        bindings: Bindings<'p, 't>,
        whole: bool,
    ) -> Option<(usize, Bindings<'p, 't>)> {
        if self.exhausted() {
            return None;
        }
        self.steps += 1;
        let (first, rest) = match pattern.split_first() {
            Some(split) => split,
            None if whole && !terms.is_empty() => return None,
            None => return Some((0, bindings)),
        };
        match &first.kind {
            TermKind::StackVar(name) => {
                if let Some(&Binding::Run(run)) = bindings.get(name.as_str()) {
                    let n = run.len();
                    if n > terms.len() || !same_run(run, &terms[..n]) {
                        return None;
                    }
                    return self
                        .match_seq(rest, &terms[n..], bindings, whole)
                        .map(|(m, b)| (n + m, b));
                }
                // A plain term right after the run can only match where it occurs
                let next = rest.first().filter(|next| is_plain(next));
                (0..=terms.len())
                    .filter(|&n| match next {
                        Some(next) => terms.get(n).map_or(false, |term| next.same_shape(term)),
                        None => true,
                    })
                    .find_map(|n| {
                        let mut attempt = bindings.clone();
                        attempt.insert(name.as_str(), Binding::Run(&terms[..n]));
                        self.match_seq(rest, &terms[n..], attempt, whole)
                            .map(|(m, b)| (n + m, b))
                    })
            }
            TermKind::TypeVar(name) => {
                let (term, remaining) = terms.split_first()?;
                let mut bindings = bindings;
                match bindings.get(name.as_str()) {
                    Some(Binding::One(bound)) if !bound.same_shape(term) => return None,
                    Some(Binding::One(_)) => {}
                    _ => {
                        bindings.insert(name.as_str(), Binding::One(term));
                    }
                }
                self.match_seq(rest, remaining, bindings, whole)
                    .map(|(m, b)| (1 + m, b))
            }
            TermKind::Quotation { terms: inner, .. } => {
                let (term, remaining) = terms.split_first()?;
                let body = match &term.kind {
                    TermKind::Quotation { terms: body, .. } => body,
                    _ => return None,
                };
                let (_, bindings) = self.match_seq(inner, body, bindings, true)?;
                self.match_seq(rest, remaining, bindings, whole)
                    .map(|(m, b)| (1 + m, b))
            }
            _ => {
                let (term, remaining) = terms.split_first()?;
                if !first.same_shape(term) {
                    return None;
                }
                self.match_seq(rest, remaining, bindings, whole)
                    .map(|(m, b)| (1 + m, b))
            }
        }
    }
}

fn same_run(a: &[Term], b: &[Term]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same_shape(b))
}

fn substitute(template: &[Term], bindings: &Bindings<'_, '_>) -> Vec<Term> {
    let mut terms = Vec::with_capacity(template.len());
    for term in template {
        match &term.kind {
            TermKind::TypeVar(name) | TermKind::StackVar(name) => match bindings.get(name.as_str()) {
                Some(Binding::One(bound)) => terms.push((*bound).clone()),
                Some(Binding::Run(run)) => terms.extend(run.iter().cloned()),
                None => terms.push(term.clone()),
            },
            TermKind::Quotation {
                comment,
                terms: inner,
            } => terms.push(Term {
                kind: TermKind::Quotation {
                    comment: comment.clone(),
                    terms: substitute(inner, bindings),
                },
                comment: term.comment.clone(),
            }),
            _ => terms.push(term.clone()),
        }
    }
    terms
}
