use std::io;

use pest::error::Error as PestError;

use crate::{parse::Rule, value::ValKind};

/// Failures while building the typed tree from a parse tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AstError {
    #[error("Unrecognized node kind {label}")]
    UnrecognizedNodeKind { label: String },
    #[error("Malformed {label} node: {reason}")]
    MalformedNode { label: String, reason: String },
    #[error("Malformed literal {text}: {reason}")]
    MalformedLiteral { text: String, reason: String },
}

impl AstError {
    pub fn malformed(label: impl Into<String>, reason: impl Into<String>) -> Self {
        AstError::MalformedNode {
            label: label.into(),
            reason: reason.into(),
        }
    }
    pub fn literal(text: impl Into<String>, reason: impl Into<String>) -> Self {
        AstError::MalformedLiteral {
            text: text.into(),
            reason: reason.into(),
        }
    }
}

/// Failures while turning terms into functions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("Unknown function {0:?}")]
    UnknownFunction(String),
    #[error("Function {0:?} is already defined")]
    DuplicateFunction(String),
    #[error("Cannot convert {0}")]
    UnconvertibleNode(String),
    #[error("Macro expansion did not finish after {0} rewrites")]
    MacroExpansionLimit(usize),
    #[error("Macro matching gave up after {0} steps")]
    MacroMatchLimit(usize),
    #[error("{0}")]
    Ast(#[from] AstError),
}

/// Failures while evaluating against the stack
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("Stack underflow: needed {needed} value(s) but found {found}")]
    StackUnderflow { needed: usize, found: usize },
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ValKind, found: ValKind },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("Aborted: {0}")]
    Aborted(String),
    #[error("{0}")]
    Io(#[from] io::Error),
}

pub type EvalResult<T> = Result<T, EvalError>;
pub type BuildResult<T> = Result<T, BuildError>;

/// Any failure of one submission
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Parse(Box<PestError<Rule>>),
    #[error("{0}")]
    Ast(#[from] AstError),
    #[error("{0}")]
    Build(#[from] BuildError),
    #[error("{0}")]
    Eval(#[from] EvalError),
}

impl From<PestError<Rule>> for Error {
    fn from(error: PestError<Rule>) -> Self {
        Error::Parse(Box::new(error))
    }
}
