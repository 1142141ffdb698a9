mod balanced;
mod bytecode;
mod circ;
mod completion;
mod config;
mod editor;
mod env;
mod error;
mod grammar;
mod highlighter;
mod parser;
mod specfile;
mod value;

use clap::Parser as ClapParser;
use config::{WELCOME_MESSAGE, WELCOME_SUBTITLE};
use editor::ReplHelper;
use env::Package;
use rustyline::error::ReadlineError;
use rustyline::{Config, Editor};
use std::path::PathBuf;
use value::Value;

/// Reads and prints s-expressions — parsing only, no evaluation.
#[derive(ClapParser, Debug)]
#[command(name = "reader-core")]
#[command(version = config::VERSION)]
#[command(about = "Reader core for a Lisp-family language: parses, does not evaluate")]
struct CliArgs {
    /// Source file to read (optional — if not provided, starts the REPL)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Treat FILE as a compiled bytecode file (.tlo) and only print its
    /// descriptors, rather than reading it as Lisp source
    #[arg(long = "compiled")]
    compiled: bool,

    /// Parse a single string as a standalone regex literal body and print
    /// its parsed form, instead of reading a file or starting the REPL
    #[arg(long = "regex", value_name = "EXPR")]
    regex: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    if let Some(expr) = args.regex {
        let parsed = parser::regex_parse("<regex>", &expr)?;
        println!("{parsed}");
        return Ok(());
    }

    if let Some(path) = args.file {
        if args.compiled {
            return print_compiled_descriptors(&path);
        }
        return read_file(&path);
    }

    run_repl()
}

fn read_file(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let name = path.display().to_string();

    let mut count = 0;
    parser::read_all_forms(&name, &source, |form| {
        println!("{form}");
        count += 1;
    })?;

    Ok(())
}

fn print_compiled_descriptors(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let name = path.display().to_string();

    let mut forms = Vec::new();
    parser::read_all_forms(&name, &source, |form| forms.push(form))?;

    struct PrintHost;
    impl bytecode::VmHost for PrintHost {
        fn execute_toplevel(&mut self, desc: &bytecode::Descriptor) -> Result<(), error::BytecodeError> {
            println!(
                "descriptor: nlevels={} nregs={} bytecode_len={}",
                desc.nlevels,
                desc.nregs,
                desc.bytecode.len()
            );
            Ok(())
        }
    }
    let mut host = PrintHost;
    bytecode::load_compiled(&name, &forms, &mut host)?;

    Ok(())
}

fn run_repl() -> Result<(), Box<dyn std::error::Error>> {
    let package = Package::new("user");

    let rl_config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<ReplHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(rl_config)?;
    rl.set_helper(Some(ReplHelper::new(package.clone())));

    if let Some(history_path) = config::history_path() {
        let _ = rl.load_history(&history_path);
    }

    if let Some(rc_path) = config::rc_path() {
        match editor::load_rcfile(&rc_path, |_form| {}) {
            editor::RcLoadOutcome::SecurityRefused => {
                println!(
                    "** possible security problem: {} is writable to others",
                    rc_path.display()
                );
            }
            editor::RcLoadOutcome::ReadError(msg) => {
                println!("** error loading {}: {msg}", rc_path.display());
            }
            _ => {}
        }
    }

    println!("{WELCOME_MESSAGE}");
    println!("{WELCOME_SUBTITLE}");

    loop {
        let readline = rl.readline("reader> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                match parser::nread("<repl>", &line) {
                    Ok(form) => print_read_form(&form),
                    Err(e) => eprintln!("{e}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                eprintln!("{err}");
                break;
            }
        }
    }

    if let Some(history_path) = config::history_path() {
        let _ = rl.save_history(&history_path);
    }

    Ok(())
}

fn print_read_form(form: &Value) {
    println!("=> {form}");
}
