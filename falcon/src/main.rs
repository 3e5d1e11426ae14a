//! Falcon CLI

use clap::{Parser, Subcommand};
use falcon::error::report_error;
use falcon::{ErrorKind, FalconError, Interpreter, RunOptions};
use std::fs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "falcon", version, about = "Falcon scripting language interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile and execute a source file
    Run {
        /// Source file to run
        file: PathBuf,
        /// Abort after this many executed instructions
        #[arg(long, value_name = "N")]
        step_limit: Option<u64>,
    },
    /// Compile and dump the instruction listing (debug)
    Dump {
        /// Source file to compile
        file: PathBuf,
        /// Emit the program as JSON
        #[arg(long)]
        json: bool,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
}

fn main() {
    falcon::init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // help and version go to stdout and are not failures
            let code = if err.use_stderr() {
                ErrorKind::Runtime.exit_code()
            } else {
                0
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    let code = match cli.command {
        Command::Run { file, step_limit } => with_source(&file, |source| {
            run(source, RunOptions { step_limit })
        }),
        Command::Dump { file, json } => with_source(&file, |source| dump(source, json)),
        Command::Tokens { file } => with_source(&file, tokens),
    };
    process::exit(code);
}

/// Read `path`, hand its text to `action` and turn the outcome into an exit code
fn with_source(path: &Path, action: impl FnOnce(&str) -> falcon::Result<()>) -> i32 {
    let filename = path.display().to_string();
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {filename}: {err}");
            return ErrorKind::Internal.exit_code();
        }
    };

    match action(&source) {
        Ok(()) => 0,
        Err(err) => {
            if report_error(&filename, &source, &err).is_err() {
                eprintln!("{err}");
            }
            err.exit_code()
        }
    }
}

fn run(source: &str, options: RunOptions) -> falcon::Result<()> {
    let program = falcon::compile(source)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut interpreter =
        Interpreter::new(&program, stdin.lock(), BufWriter::new(stdout.lock()))
            .with_options(options);
    interpreter.run()
}

fn dump(source: &str, json: bool) -> falcon::Result<()> {
    let program = falcon::compile(source)?;
    if json {
        let text = serde_json::to_string_pretty(&program)
            .map_err(|err| FalconError::internal(format!("cannot serialize program: {err}")))?;
        println!("{text}");
    } else {
        print!("{program}");
    }
    Ok(())
}

fn tokens(source: &str) -> falcon::Result<()> {
    for lexeme in falcon::lexer::tokenize(source)? {
        println!("{:?} @ {}", lexeme.token, lexeme.span);
    }
    Ok(())
}
