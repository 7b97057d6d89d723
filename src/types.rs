//! Declared function types
//!
//! These are written on definitions as `(consumed -> produced)` and handed to
//! the type checker untouched. The interpreter only carries and prints them.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTerm {
    Name(String),
    Var(String),
    Function(FnType),
}

impl fmt::Display for TypeTerm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeTerm::Name(name) => write!(f, "{}", name),
            TypeTerm::Var(name) => write!(f, "'{}", name),
            TypeTerm::Function(sig) => write!(f, "{}", sig),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FnType {
    pub consumes: Vec<TypeTerm>,
    pub produces: Vec<TypeTerm>,
}

impl FnType {
    pub fn new(consumes: Vec<TypeTerm>, produces: Vec<TypeTerm>) -> Self {
        FnType { consumes, produces }
    }
}

impl fmt::Display for FnType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for term in &self.consumes {
            write!(f, "{} ", term)?;
        }
        write!(f, "->")?;
        for term in &self.produces {
            write!(f, " {}", term)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let sig = FnType::new(
            vec![
                TypeTerm::Var("a".into()),
                TypeTerm::Function(FnType::new(
                    vec![TypeTerm::Var("a".into())],
                    vec![TypeTerm::Name("bool".into())],
                )),
            ],
            vec![],
        );
        assert_eq!(sig.to_string(), "('a ('a -> bool) ->)");
        assert_eq!(FnType::default().to_string(), "(->)");
    }
}
