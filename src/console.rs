use std::{
    cell::RefCell,
    fmt,
    io::{self, Write},
    rc::Rc,
};

use colored::Colorize;

/// Where program output and error reports go
///
/// Cloning a console shares its streams. The output primitives capture one of
/// these when they are installed.
#[derive(Clone)]
pub struct Console {
    out: Rc<RefCell<dyn Write>>,
    err: Rc<RefCell<dyn Write>>,
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Console")
    }
}

impl Console {
    pub fn stdio() -> Self {
        Console {
            out: Rc::new(RefCell::new(io::stdout())),
            err: Rc::new(RefCell::new(io::stderr())),
        }
    }
    /// A console writing both streams into one in-memory buffer
    #[cfg(test)]
    pub fn capture() -> (Self, Capture) {
        let capture = Capture::default();
        let shared: Rc<RefCell<dyn Write>> = Rc::new(RefCell::new(capture.clone()));
        (
            Console {
                out: shared.clone(),
                err: shared,
            },
            capture,
        )
    }
    pub fn write(&self, text: &str) -> io::Result<()> {
        let mut out = self.out.borrow_mut();
        write!(out, "{}", text)?;
        out.flush()
    }
    pub fn writeln(&self, text: &str) -> io::Result<()> {
        let mut out = self.out.borrow_mut();
        writeln!(out, "{}", text)?;
        out.flush()
    }
    /// Report a failure. Reporting must not itself fail.
    pub fn error(&self, message: &str) {
        let mut err = self.err.borrow_mut();
        let _ = writeln!(err, "{} {}", "error:".red().bold(), message);
        let _ = err.flush();
    }
}

/// Shared in-memory output
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

#[cfg(test)]
impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

#[cfg(test)]
impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
