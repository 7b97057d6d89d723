#![allow(clippy::upper_case_acronyms)]

use std::fmt;

use pest::{
    error::{Error as PestError, ErrorVariant},
    iterators::Pair,
    Parser, Position,
};

pub type ParseResult<T> = Result<T, PestError<Rule>>;

#[derive(pest_derive::Parser)]
#[grammar = "grammar.pest"]
struct CatenaParser;

/// A generic, label-tagged parse tree
///
/// This is the only thing the grammar hands to the rest of the interpreter.
/// Leaves carry their matched text; inner nodes carry only their children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    pub rule: Rule,
    pub text: Option<String>,
    pub children: Vec<ParseTree>,
}

impl ParseTree {
    pub fn leaf(rule: Rule, text: impl Into<String>) -> Self {
        ParseTree {
            rule,
            text: Some(text.into()),
            children: Vec::new(),
        }
    }
    pub fn node(rule: Rule, children: Vec<ParseTree>) -> Self {
        ParseTree {
            rule,
            text: None,
            children,
        }
    }
    pub fn label(&self) -> String {
        format!("{:?}", self.rule)
    }
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
    fn from_pair(pair: Pair<Rule>) -> Self {
        let rule = pair.as_rule();
        let text = pair.as_str().to_owned();
        let children: Vec<ParseTree> = pair.into_inner().map(ParseTree::from_pair).collect();
        if children.is_empty() {
            ParseTree::leaf(rule, text)
        } else {
            ParseTree::node(rule, children)
        }
    }
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{}({:?})", self.label(), text),
            None => {
                write!(f, "{}[", self.label())?;
                for (i, child) in self.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, "]")
            }
        }
    }
}

pub fn parse(input: &str) -> ParseResult<ParseTree> {
    let mut pairs = CatenaParser::parse(Rule::program, input)?;
    match pairs.next() {
        Some(pair) => Ok(ParseTree::from_pair(pair)),
        None => Err(PestError::new_from_pos(
            ErrorVariant::CustomError {
                message: "Empty parse".into(),
            },
            Position::from_start(input),
        )),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn terms(input: &str) -> Vec<ParseTree> {
        let tree = parse(input).unwrap();
        assert_eq!(tree.rule, Rule::program);
        tree.children
            .into_iter()
            .filter(|child| child.rule == Rule::term)
            .collect()
    }

    fn first_rules(input: &str) -> Vec<Rule> {
        terms(input).into_iter().map(|term| term.children[0].rule).collect()
    }

    #[test]
    fn literals() {
        assert_eq!(
            first_rules(r#"1 -2 3.5 0x1F 0b101 'a' "hi" + -"#),
            vec![
                Rule::integer,
                Rule::integer,
                Rule::float,
                Rule::hex,
                Rule::binary,
                Rule::char,
                Rule::string,
                Rule::name,
                Rule::name,
            ]
        );
    }

    #[test]
    fn tokens_need_a_boundary() {
        assert_eq!(first_rules("2dup"), vec![Rule::name]);
        assert_eq!(first_rules("definer"), vec![Rule::name]);
    }

    #[test]
    fn definitions_and_macros() {
        assert_eq!(
            first_rules("define inc : (int -> int) { 1 + } macro { dup swap } => { swap dup }"),
            vec![Rule::definition, Rule::macro_def]
        );
        let def = &terms("define f(x y) { x }")[0].children[0];
        let rules: Vec<Rule> = def.children.iter().map(|child| child.rule).collect();
        assert_eq!(rules, vec![Rule::name, Rule::params, Rule::body]);
    }

    #[test]
    fn trailing_comments() {
        let term = &terms("dup // copy it\n")[0];
        assert_eq!(term.children.len(), 2);
        assert_eq!(term.children[1].rule, Rule::comments);
        assert_eq!(
            term.children[1].children[0].text.as_deref(),
            Some("// copy it")
        );
    }

    #[test]
    fn quotations_take_a_leading_comment() {
        let quotation = &terms("[ // note\n 1 ]")[0].children[0];
        assert_eq!(quotation.rule, Rule::quotation);
        let rules: Vec<Rule> = quotation.children.iter().map(|child| child.rule).collect();
        assert_eq!(rules, vec![Rule::comments, Rule::term]);
    }

    #[test]
    fn unbalanced_input_fails() {
        assert!(parse("[1 2").is_err());
        assert!(parse("define { }").is_err());
    }
}
