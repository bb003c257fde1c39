//! CMa virtual machine CLI.
//!
//! Assembles and runs a CMa assembly file. The program's result cell is
//! forwarded as the process exit code.
//!
//! # Usage
//! ```text
//! cma <FILE> [--list]
//! ```

use stackmach::cma::assembler::assemble;
use stackmach::cma::isa;
use stackmach::cma::vm::Cma;
use stackmach::log::{self, Level};
use stackmach::report;
use stackmach::{error, info, warn};
use std::env;
use std::fs;
use std::process;

const USAGE: &str = "\
CMa Virtual Machine

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

    let program = match assemble(&source) {
        Ok(program) => program,
        Err(e) => {
            report::log_parse_error(path, &source, &e);
            process::exit(1);
        }
    };

    info!("loaded {} instructions from {path}", program.len());
    if list {
        eprint!("{}", isa::listing(&program));
    }

    let mut machine = Cma::new(program);
    match machine.run() {
        Ok(exit) => process::exit(exit),
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}
