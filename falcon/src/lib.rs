//! Falcon
//!
//! A small dynamically typed scripting language. Source text is compiled in a
//! single pass into three-address instructions, which an interpreter then
//! executes against a private copy of the program's memory.

pub mod builtins;
pub mod compiler;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod program;
pub mod span;
pub mod symtab;
pub mod value;

pub use compiler::compile;
pub use error::{ErrorKind, FalconError, Result};
pub use interp::{Interpreter, RunOptions};
pub use program::Program;
pub use span::Span;

use std::io::{BufRead, Write};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Compile `source` and run it once
pub fn run_source<R: BufRead, W: Write>(source: &str, input: R, output: W) -> Result<()> {
    let program = compile(source)?;
    let mut interpreter = Interpreter::new(&program, input, output);
    interpreter.run()
}

/// Send `tracing` events to stderr, filtered by `RUST_LOG`
///
/// With `RUST_LOG` unset or unparsable no subscriber is installed, so runs
/// print nothing extra. Later calls are no-ops.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::prelude::*;

        let Ok(filter) = tracing_subscriber::EnvFilter::try_from_default_env() else {
            return;
        };
        let events = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .without_time();
        // a host that already installed a global subscriber keeps it
        let _ = tracing_subscriber::registry().with(filter).with(events).try_init();
    });
}
