//! MaMa virtual machine CLI.
//!
//! Assembles and runs a MaMa assembly file. The top of stack at `halt` is
//! forwarded as the process exit code.
//!
//! # Usage
//! ```text
//! mama <FILE> [--list]
//! ```

use stackmach::log::{self, Level};
use stackmach::mama::assembler::assemble;
use stackmach::mama::isa;
use stackmach::mama::vm::MaMa;
use stackmach::report;
use stackmach::{error, info, warn};
use std::env;
use std::fs;
use std::process;

const USAGE: &str = "\
MaMa Virtual Machine

USAGE:
    {program} <FILE> [OPTIONS]

ARGS:
    <FILE>    Assembly source file to run

OPTIONS:
    --list       Print the assembled instruction listing to stderr
    -h, --help   Print this help message

ENVIRONMENT:
    STACKMACH_LOG    Log level: info, warn, or error (default: info)

The exit code of the executed program becomes the process exit code.
";

fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}

fn init_logging() {
    if let Ok(name) = env::var("STACKMACH_LOG") {
        match Level::from_name(&name) {
            Some(level) => log::init(level),
            None => warn!("unknown log level {name:?}, using info"),
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    init_logging();

    let path = &args[1];
    let mut list = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--list" => {
                list = true;
                i += 1;
            }
            other => {
                eprintln!("Unexpected argument: {other}\n");
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let source = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            error!("cannot open file {path}: {e}");
            process::exit(1);
        }
    };

    let code = match assemble(&source) {
        Ok(code) => code,
        Err(e) => {
            report::log_parse_error(path, &source, &e);
            process::exit(1);
        }
    };

    info!("loaded {} code bytes from {path}", code.len());
    if list {
        match isa::listing(&code) {
            Ok(text) => eprint!("{text}"),
            Err(e) => error!("cannot list code: {e}"),
        }
    }

    // The machine borrows the code stream; `code` stays alive until the
    // process exits below.
    let mut machine = MaMa::new(&code);
    match machine.run() {
        Ok(exit) => process::exit(exit as i32),
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}
