mod ast;
mod compile;
mod console;
mod error;
mod exec;
mod function;
mod macros;
mod parse;
mod primitives;
mod resolve;
mod stack;
mod types;
mod value;

use std::{io::Write, path::PathBuf, process::exit};

use anyhow::Context as _;
use clap::{Args, Parser};
use itertools::Itertools;
use tracing_subscriber::EnvFilter;

use exec::{Config, Executor};

fn main() -> anyhow::Result<()> {
    color_backtrace::install();
    init_logging();

    let app = App::parse();
    let config = app.config();
    let mut exec = Executor::new(config).context("installing primitives")?;

    let succeeded = match app {
        App::Run { files, .. } => files
            .iter()
            .fold(true, |ok, file| exec.load_module(file) && ok),
        App::Eval { expr, .. } => {
            let ok = exec.execute(&expr);
            if ok && !exec.config.verbose {
                exec.show_stack();
            }
            ok
        }
        App::Repl { prelude, .. } => {
            for file in &prelude {
                exec.load_module(file);
            }
            exec.config.verbose = true;
            repl(&mut exec)?;
            true
        }
    };
    if !succeeded {
        exit(1);
    }
    Ok(())
}

/// `RUST_LOG` overrides the default filter
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Parser)]
#[clap(version, about = "A concatenative stack language")]
enum App {
    /// Load each file as a module
    #[clap(alias = "r")]
    Run {
        #[clap(required = true)]
        files: Vec<PathBuf>,
        #[clap(flatten)]
        config: ConfigArgs,
    },
    /// Start an interactive session, after loading any prelude files
    #[clap(alias = "i")]
    Repl {
        prelude: Vec<PathBuf>,
        #[clap(flatten)]
        config: ConfigArgs,
    },
    /// Execute one expression and print the stack
    #[clap(alias = "e")]
    Eval {
        expr: String,
        #[clap(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Print the stack after every submission
    #[clap(short, long)]
    verbose: bool,
    /// Print the declared type of each new definition
    #[clap(short = 't', long)]
    show_types: bool,
    /// Let definitions replace existing functions
    #[clap(short = 'r', long)]
    allow_redefinition: bool,
}

impl App {
    fn config(&self) -> Config {
        let (App::Run { config, .. } | App::Repl { config, .. } | App::Eval { config, .. }) = self;
        Config {
            verbose: config.verbose,
            show_types: config.show_types,
            allow_redefinition: config.allow_redefinition,
        }
    }
}

fn repl(exec: &mut Executor) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut pending = String::new();
    loop {
        print!("{}", if pending.is_empty() { "> " } else { ". " });
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            return Ok(());
        }
        if pending.is_empty() {
            match line.trim() {
                "#quit" | "#exit" => return Ok(()),
                "#words" => {
                    let words = exec.ctx.registry.names().sorted().join(" ");
                    exec.console.writeln(&words)?;
                    continue;
                }
                _ => {}
            }
        }
        pending.push_str(&line);
        if balanced(&pending) {
            exec.execute(&pending);
            pending.clear();
        }
    }
}

/// Whether every bracket opened in `text` has been closed
///
/// Brackets in strings, chars and comments don't count. Extra closing
/// brackets are left for the parser to report.
fn balanced(text: &str) -> bool {
    let mut depth = 0i32;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '[' | '{' | '(' => depth += 1,
            ']' | '}' | ')' => depth -= 1,
            '"' => {
                while let Some(d) = chars.next() {
                    match d {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            // A quote not closing a char literal starts a type parameter
            '\'' => {
                let rest = chars.as_str();
                let close = match rest.chars().next() {
                    Some('\\') => rest.char_indices().nth(2),
                    Some(_) => rest.char_indices().nth(1),
                    None => None,
                };
                if let Some((i, '\'')) = close {
                    chars = rest[i + 1..].chars();
                }
            }
            '/' if chars.as_str().starts_with('/') => {
                for d in chars.by_ref() {
                    if d == '\n' {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    depth <= 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance() {
        assert!(balanced("1 2 +"));
        assert!(!balanced("define f {"));
        assert!(balanced("define f {\n 1 }"));
        assert!(balanced("\"[\" 'c' '[' '\\''"));
        assert!(!balanced("define f : ('a -> 'a) {"));
        assert!(!balanced("[ \"]\""));
        assert!(balanced("1 // [ unclosed in a comment\n"));
        assert!(!balanced("[ // ]\n"));
        assert!(balanced("]"));
    }

    #[test]
    fn cli_flags() {
        let app = App::parse_from(["catena", "eval", "-v", "--allow-redefinition", "1 2 +"]);
        assert_eq!(
            app.config(),
            Config {
                verbose: true,
                show_types: false,
                allow_redefinition: true,
            }
        );
        let app = App::parse_from(["catena", "i", "prelude.ctn", "-t"]);
        assert!(matches!(&app, App::Repl { prelude, .. } if prelude.len() == 1));
        assert!(app.config().show_types);
    }
}
