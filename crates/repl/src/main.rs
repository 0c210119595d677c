//! Vau REPL
//!
//! The `vau` binary: evaluates files and `-e` expressions, or runs an
//! interactive read-eval-print loop against a fresh standard
//! environment. Errors print their `*ERROR*` report as they are
//! thrown; a non-continuable error ends the process with a failure
//! status, anything else returns to the prompt.

use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use vau_reader::{Reader, write_value};
use vau_runtime::{State, Value, env};

#[derive(Parser)]
#[command(name = "vau")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Kernel language interpreter", long_about = None)]
struct Cli {
    /// Source files to load and evaluate in order
    files: Vec<PathBuf>,

    /// Evaluate an expression and print its result
    #[arg(short = 'e', long = "eval", value_name = "EXPR")]
    eval: Option<String>,

    /// Suppress result printing (still prints what the program writes)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "vau", &mut std::io::stdout());
        return;
    }

    let mut st = State::new();
    let ground = st.ground_env;
    let std_env = env::make_table_environment(&mut st, ground);
    debug!("interpreter ready");

    let mut ran_something = false;

    for file in &cli.files {
        ran_something = true;
        let src = match std::fs::read_to_string(file) {
            Ok(src) => src,
            Err(e) => {
                eprintln!("vau: cannot read {}: {e}", file.display());
                process::exit(1);
            }
        };
        if let Err(code) = eval_source(&mut st, std_env, &src, true) {
            process::exit(code);
        }
    }

    if let Some(expr) = &cli.eval {
        ran_something = true;
        if let Err(code) = eval_source(&mut st, std_env, expr, cli.quiet) {
            process::exit(code);
        }
    }

    if !ran_something {
        interactive(&mut st, std_env, cli.quiet);
    }
}

/// Evaluate every datum in `src`. Returns the process exit code on a
/// fatal (non-continuable) error; read errors and recoverable runtime
/// errors end evaluation of this source but are not fatal.
fn eval_source(st: &mut State, env: Value, src: &str, quiet: bool) -> Result<(), i32> {
    let mut reader = Reader::new(src);
    loop {
        match reader.read(st) {
            Ok(None) => return Ok(()),
            Ok(Some(datum)) => match st.run(datum, env) {
                Ok(v) => {
                    if !quiet && !v.is_inert() {
                        println!("{}", write_value(&st.heap, v));
                    }
                }
                Err(e) if e.can_continue => return Ok(()),
                Err(_) => return Err(1),
            },
            Err(e) => {
                eprintln!("*ERROR*: read: {e}");
                return Ok(());
            }
        }
    }
}

fn history_path() -> Option<PathBuf> {
    home::home_dir().map(|d| d.join(".vau_history"))
}

fn interactive(st: &mut State, env: Value, quiet: bool) {
    let mut editor = match DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("vau: cannot start line editor: {e}");
            process::exit(1);
        }
    };
    let history = history_path();
    if let Some(path) = &history {
        let _ = editor.load_history(path);
    }

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "vau> " } else { "...> " };
        match editor.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');
                match read_buffered(st, &buffer) {
                    BufferState::Incomplete => continue,
                    BufferState::Ready(datums) => {
                        let _ = editor.add_history_entry(buffer.trim_end());
                        buffer.clear();
                        // later datums stay rooted while earlier ones run
                        for &datum in &datums {
                            st.push_root(datum);
                        }
                        let mut fatal = false;
                        for &datum in &datums {
                            match st.run(datum, env) {
                                Ok(v) => {
                                    if !quiet && !v.is_inert() {
                                        println!("{}", write_value(&st.heap, v));
                                    }
                                }
                                Err(e) if e.can_continue => break,
                                Err(_) => {
                                    fatal = true;
                                    break;
                                }
                            }
                        }
                        st.roots.discard(datums.len());
                        if fatal {
                            save_history(&mut editor, &history);
                            process::exit(1);
                        }
                    }
                    BufferState::Bad(msg) => {
                        let _ = editor.add_history_entry(buffer.trim_end());
                        buffer.clear();
                        eprintln!("*ERROR*: read: {msg}");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("vau: {e}");
                break;
            }
        }
    }
    save_history(&mut editor, &history);
}

enum BufferState {
    Ready(Vec<Value>),
    Incomplete,
    Bad(String),
}

fn read_buffered(st: &mut State, buffer: &str) -> BufferState {
    let mut reader = Reader::new(buffer);
    let mut datums = Vec::new();
    loop {
        match reader.read(st) {
            Ok(Some(d)) => {
                st.push_root(d);
                datums.push(d);
            }
            Ok(None) => break,
            Err(e) if e.incomplete => {
                st.roots.discard(datums.len());
                return BufferState::Incomplete;
            }
            Err(e) => {
                st.roots.discard(datums.len());
                return BufferState::Bad(e.to_string());
            }
        }
    }
    st.roots.discard(datums.len());
    BufferState::Ready(datums)
}

fn save_history(editor: &mut DefaultEditor, history: &Option<PathBuf>) {
    if let Some(path) = history {
        let _ = editor.save_history(path);
    }
}
