use std::fmt;

use derive_more::Display;
use itertools::Itertools;

use crate::{
    error::AstError,
    parse::{ParseTree, Rule},
    types::{FnType, TypeTerm},
    value::Val,
};

pub type AstResult<T> = Result<T, AstError>;

const INDENT: &str = "    ";

/// A whole source text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub comment: Option<String>,
    pub terms: Vec<Term>,
}

/// One term of a sequence, with the comment trailing it
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub kind: TermKind,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TermKind {
    Name(String),
    Literal(Literal),
    Quotation {
        /// Comment directly after the opening bracket
        comment: Option<String>,
        terms: Vec<Term>,
    },
    Definition(Box<Definition>),
    Macro(Box<MacroDecl>),
    /// `$a`: matches exactly one term in a macro pattern
    TypeVar(String),
    /// `$A`: matches a run of terms in a macro pattern
    StackVar(String),
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    #[display(fmt = "integer")]
    Int,
    #[display(fmt = "binary")]
    Bin,
    #[display(fmt = "hex")]
    Hex,
    #[display(fmt = "char")]
    Char,
    #[display(fmt = "string")]
    Str,
    #[display(fmt = "float")]
    Float,
}

/// A literal as written. Its value is only decoded on request.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub params: Vec<String>,
    pub ty: Option<FnType>,
    /// Comment directly after the opening brace
    pub comment: Option<String>,
    pub body: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroDecl {
    pub pattern: Vec<Term>,
    pub template: Vec<Term>,
}

/*
    Construction
*/

fn unrecognized(tree: &ParseTree) -> AstError {
    AstError::UnrecognizedNodeKind {
        label: tree.label(),
    }
}

fn expect_rule(tree: &ParseTree, rule: Rule) -> AstResult<()> {
    if tree.rule == rule {
        Ok(())
    } else {
        Err(AstError::malformed(
            tree.label(),
            format!("expected {:?}", rule),
        ))
    }
}

fn leaf_text(tree: &ParseTree) -> AstResult<&str> {
    match (&tree.text, tree.is_leaf()) {
        (Some(text), true) => Ok(text),
        _ => Err(AstError::malformed(tree.label(), "expected a leaf")),
    }
}

fn expect_leaf(tree: &ParseTree, rule: Rule) -> AstResult<&str> {
    expect_rule(tree, rule)?;
    leaf_text(tree)
}

fn comments_from_tree(tree: &ParseTree) -> AstResult<String> {
    expect_rule(tree, Rule::comments)?;
    if tree.children.is_empty() {
        return Err(AstError::malformed(tree.label(), "expected at least one comment"));
    }
    let mut lines = Vec::new();
    for child in &tree.children {
        let text = expect_leaf(child, Rule::comment)?;
        let line = text
            .strip_prefix("//")
            .ok_or_else(|| AstError::malformed(child.label(), "expected `//`"))?;
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

/// Split an optional leading `comments` node off a child list
fn leading_comment(children: &[ParseTree]) -> AstResult<(Option<String>, &[ParseTree])> {
    match children.split_first() {
        Some((first, rest)) if first.rule == Rule::comments => {
            Ok((Some(comments_from_tree(first)?), rest))
        }
        _ => Ok((None, children)),
    }
}

fn terms_from_trees(trees: &[ParseTree]) -> AstResult<Vec<Term>> {
    trees.iter().map(Term::from_tree).collect()
}

impl Program {
    pub fn from_tree(tree: &ParseTree) -> AstResult<Self> {
        expect_rule(tree, Rule::program)?;
        let (comment, rest) = leading_comment(&tree.children)?;
        let rest = match rest.split_last() {
            Some((last, init)) if last.rule == Rule::EOI => init,
            _ => rest,
        };
        Ok(Program {
            comment,
            terms: terms_from_trees(rest)?,
        })
    }
}

impl Term {
    #[cfg(test)]
    pub fn new(kind: TermKind) -> Self {
        Term {
            kind,
            comment: None,
        }
    }
    #[cfg(test)]
    pub fn name(name: impl Into<String>) -> Self {
        Term::new(TermKind::Name(name.into()))
    }
    pub fn from_tree(tree: &ParseTree) -> AstResult<Self> {
        expect_rule(tree, Rule::term)?;
        let (inner, comment) = match tree.children.as_slice() {
            [inner] => (inner, None),
            [inner, comments] => (inner, Some(comments_from_tree(comments)?)),
            children => {
                return Err(AstError::malformed(
                    tree.label(),
                    format!("expected 1 or 2 children, found {}", children.len()),
                ))
            }
        };
        let literal = |kind| -> AstResult<TermKind> {
            Ok(TermKind::Literal(Literal::new(kind, leaf_text(inner)?)))
        };
        let kind = match inner.rule {
            Rule::name => TermKind::Name(leaf_text(inner)?.into()),
            Rule::integer => literal(LiteralKind::Int)?,
            Rule::binary => literal(LiteralKind::Bin)?,
            Rule::hex => literal(LiteralKind::Hex)?,
            Rule::char => literal(LiteralKind::Char)?,
            Rule::string => literal(LiteralKind::Str)?,
            Rule::float => literal(LiteralKind::Float)?,
            Rule::quotation => {
                let (comment, terms) = leading_comment(&inner.children)?;
                TermKind::Quotation {
                    comment,
                    terms: terms_from_trees(terms)?,
                }
            }
            Rule::definition => TermKind::Definition(Definition::from_tree(inner)?.into()),
            Rule::macro_def => TermKind::Macro(MacroDecl::from_tree(inner)?.into()),
            Rule::type_var => TermKind::TypeVar(var_name(inner)?),
            Rule::stack_var => TermKind::StackVar(var_name(inner)?),
            _ => return Err(unrecognized(inner)),
        };
        Ok(Term { kind, comment })
    }
    /// Structural equality that ignores comments
    pub fn same_shape(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (TermKind::Quotation { terms: a, .. }, TermKind::Quotation { terms: b, .. }) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same_shape(b))
            }
            (a, b) => a == b,
        }
    }
}

fn var_name(tree: &ParseTree) -> AstResult<String> {
    let text = leaf_text(tree)?;
    text.strip_prefix('$')
        .filter(|name| !name.is_empty())
        .map(Into::into)
        .ok_or_else(|| AstError::malformed(tree.label(), "expected `$` and a name"))
}

impl Definition {
    pub fn from_tree(tree: &ParseTree) -> AstResult<Self> {
        expect_rule(tree, Rule::definition)?;
        let (name, params, ty, body) = match tree.children.as_slice() {
            [name, body] => (name, None, None, body),
            [name, extra, body] if extra.rule == Rule::params => (name, Some(extra), None, body),
            [name, extra, body] => (name, None, Some(extra), body),
            [name, params, ty, body] => (name, Some(params), Some(ty), body),
            children => {
                return Err(AstError::malformed(
                    tree.label(),
                    format!("expected 2 to 4 children, found {}", children.len()),
                ))
            }
        };
        let name = expect_leaf(name, Rule::name)?.to_owned();
        let params = match params {
            Some(params) => {
                expect_rule(params, Rule::params)?;
                params
                    .children
                    .iter()
                    .map(|param| expect_leaf(param, Rule::param).map(Into::into))
                    .collect::<AstResult<_>>()?
            }
            None => Vec::new(),
        };
        let ty = ty.map(fn_type_from_tree).transpose()?;
        expect_rule(body, Rule::body)?;
        let (comment, terms) = leading_comment(&body.children)?;
        Ok(Definition {
            name,
            params,
            ty,
            comment,
            body: terms_from_trees(terms)?,
        })
    }
}

fn fn_type_from_tree(tree: &ParseTree) -> AstResult<FnType> {
    expect_rule(tree, Rule::fn_type)?;
    match tree.children.as_slice() {
        [consumes, produces] => {
            expect_rule(consumes, Rule::consumes)?;
            expect_rule(produces, Rule::produces)?;
            Ok(FnType::new(
                type_terms_from_trees(&consumes.children)?,
                type_terms_from_trees(&produces.children)?,
            ))
        }
        children => Err(AstError::malformed(
            tree.label(),
            format!("expected 2 children, found {}", children.len()),
        )),
    }
}

fn type_terms_from_trees(trees: &[ParseTree]) -> AstResult<Vec<TypeTerm>> {
    trees
        .iter()
        .map(|tree| {
            Ok(match tree.rule {
                Rule::type_name => TypeTerm::Name(leaf_text(tree)?.into()),
                Rule::type_param => TypeTerm::Var(
                    leaf_text(tree)?
                        .strip_prefix('\'')
                        .ok_or_else(|| AstError::malformed(tree.label(), "expected `'`"))?
                        .into(),
                ),
                Rule::fn_type => TypeTerm::Function(fn_type_from_tree(tree)?),
                _ => return Err(unrecognized(tree)),
            })
        })
        .collect()
}

impl MacroDecl {
    pub fn from_tree(tree: &ParseTree) -> AstResult<Self> {
        expect_rule(tree, Rule::macro_def)?;
        match tree.children.as_slice() {
            [pattern, template] => {
                expect_rule(pattern, Rule::pattern)?;
                expect_rule(template, Rule::template)?;
                Ok(MacroDecl {
                    pattern: terms_from_trees(&pattern.children)?,
                    template: terms_from_trees(&template.children)?,
                })
            }
            children => Err(AstError::malformed(
                tree.label(),
                format!("expected 2 children, found {}", children.len()),
            )),
        }
    }
}

/*
    Literal values
*/

impl Literal {
    pub fn new(kind: LiteralKind, text: impl Into<String>) -> Self {
        Literal {
            kind,
            text: text.into(),
        }
    }
    pub fn value(&self) -> AstResult<Val> {
        Ok(match self.kind {
            LiteralKind::Int | LiteralKind::Bin | LiteralKind::Hex => Val::Int(self.as_int()?),
            LiteralKind::Float => Val::Float(
                self.text
                    .parse()
                    .map_err(|e| AstError::literal(&self.text, format!("{}", e)))?,
            ),
            LiteralKind::Char => {
                let s = self.unquote('\'')?;
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Val::Char(c),
                    _ => return Err(AstError::literal(&self.text, "expected exactly one char")),
                }
            }
            LiteralKind::Str => Val::from(self.unquote('"')?),
        })
    }
    pub fn as_int(&self) -> AstResult<i64> {
        let (digits, radix) = match self.kind {
            LiteralKind::Int => (self.text.as_str(), 10),
            LiteralKind::Bin => (self.strip("0b")?, 2),
            LiteralKind::Hex => (self.strip("0x")?, 16),
            kind => {
                return Err(AstError::literal(
                    &self.text,
                    format!("a {} literal is not an integer", kind),
                ))
            }
        };
        i64::from_str_radix(digits, radix).map_err(|e| {
            AstError::literal(&self.text, format!("invalid {} digits: {}", self.kind, e))
        })
    }
    fn strip(&self, prefix: &str) -> AstResult<&str> {
        self.text
            .strip_prefix(prefix)
            .ok_or_else(|| AstError::literal(&self.text, format!("expected {:?} prefix", prefix)))
    }
    fn unquote(&self, delim: char) -> AstResult<String> {
        let inner = self
            .text
            .strip_prefix(delim)
            .and_then(|s| s.strip_suffix(delim))
            .ok_or_else(|| AstError::literal(&self.text, "missing delimiters"))?;
        let mut s = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                s.push(c);
                continue;
            }
            s.push(match chars.next() {
                Some('0') => '\0',
                Some('r') => '\r',
                Some('t') => '\t',
                Some('n') => '\n',
                Some('\\') => '\\',
                Some('\'') => '\'',
                Some('"') => '"',
                Some(c) => return Err(AstError::literal(&self.text, format!("unknown escape \\{}", c))),
                None => return Err(AstError::literal(&self.text, "dangling escape")),
            });
        }
        Ok(s)
    }
}

/*
    Printing
*/

fn indent(f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn all_inline(terms: &[Term]) -> bool {
    terms.iter().all(Term::is_inline)
}

fn write_inline(f: &mut fmt::Formatter, terms: &[Term]) -> fmt::Result {
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        term.write(f, 0)?;
    }
    Ok(())
}

fn write_lines(f: &mut fmt::Formatter, terms: &[Term], depth: usize) -> fmt::Result {
    for term in terms {
        indent(f, depth)?;
        term.write(f, depth)?;
        writeln!(f)?;
    }
    Ok(())
}

/// Write a sequence as the inside of a block whose opening line is done
fn write_block_body(f: &mut fmt::Formatter, terms: &[Term], depth: usize) -> fmt::Result {
    if terms.is_empty() {
        Ok(())
    } else if all_inline(terms) {
        indent(f, depth)?;
        write_inline(f, terms)?;
        writeln!(f)
    } else {
        write_lines(f, terms, depth)
    }
}

/// Write comment lines. The first continues the current line.
fn write_comment(f: &mut fmt::Formatter, comment: &str, depth: usize) -> fmt::Result {
    for (i, line) in comment.split('\n').enumerate() {
        if i > 0 {
            writeln!(f)?;
            indent(f, depth)?;
        }
        write!(f, "//{}", line)?;
    }
    Ok(())
}

impl Term {
    /// Whether this term can share a line with its neighbors
    fn is_inline(&self) -> bool {
        self.comment.is_none()
            && match &self.kind {
                TermKind::Quotation {
                    comment: None,
                    terms,
                } => all_inline(terms),
                TermKind::Quotation { .. } => false,
                TermKind::Macro(decl) => all_inline(&decl.pattern) && all_inline(&decl.template),
                TermKind::Definition(_) => false,
                _ => true,
            }
    }
    fn write(&self, f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
        match &self.kind {
            TermKind::Name(name) => write!(f, "{}", name)?,
            TermKind::Literal(literal) => write!(f, "{}", literal)?,
            TermKind::TypeVar(name) | TermKind::StackVar(name) => write!(f, "${}", name)?,
            TermKind::Quotation {
                comment: None,
                terms,
            } if all_inline(terms) => {
                write!(f, "[")?;
                write_inline(f, terms)?;
                write!(f, "]")?;
            }
            TermKind::Quotation { comment, terms } => {
                write!(f, "[")?;
                if let Some(comment) = comment {
                    write!(f, " ")?;
                    write_comment(f, comment, depth + 1)?;
                }
                writeln!(f)?;
                write_lines(f, terms, depth + 1)?;
                indent(f, depth)?;
                write!(f, "]")?;
            }
            TermKind::Definition(def) => def.write(f, depth)?,
            TermKind::Macro(decl) => decl.write(f, depth)?,
        }
        if let Some(comment) = &self.comment {
            write!(f, " ")?;
            write_comment(f, comment, depth)?;
        }
        Ok(())
    }
}

impl Definition {
    fn write(&self, f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
        write!(f, "define {}", self.name)?;
        if !self.params.is_empty() {
            write!(f, "({})", self.params.iter().join(" "))?;
        }
        if let Some(ty) = &self.ty {
            write!(f, " : {}", ty)?;
        }
        write!(f, " {{")?;
        if let Some(comment) = &self.comment {
            write!(f, " ")?;
            write_comment(f, comment, depth + 1)?;
        }
        writeln!(f)?;
        write_block_body(f, &self.body, depth + 1)?;
        indent(f, depth)?;
        write!(f, "}}")
    }
}

impl MacroDecl {
    fn write(&self, f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
        write!(f, "macro ")?;
        write_macro_block(f, &self.pattern, depth)?;
        write!(f, " => ")?;
        write_macro_block(f, &self.template, depth)
    }
}

fn write_macro_block(f: &mut fmt::Formatter, terms: &[Term], depth: usize) -> fmt::Result {
    if all_inline(terms) {
        write!(f, "{{ ")?;
        write_inline(f, terms)?;
        if !terms.is_empty() {
            write!(f, " ")?;
        }
        write!(f, "}}")
    } else {
        writeln!(f, "{{")?;
        write_lines(f, terms, depth + 1)?;
        indent(f, depth)?;
        write!(f, "}}")
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write(f, 0)
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write(f, 0)
    }
}

impl fmt::Display for MacroDecl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write(f, 0)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(comment) = &self.comment {
            write_comment(f, comment, 0)?;
            writeln!(f)?;
        }
        write_block_body(f, &self.terms, 0)
    }
}
