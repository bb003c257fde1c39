//! Stack-based teaching virtual machines.
//!
//! Two abstract machines from the compiler-construction curriculum share a
//! textual assembly front end:
//!
//! - [`cma`]: a C-like imperative machine over a flat 32-bit memory, with
//!   stack frames, dynamic heap allocation, and procedure calls.
//! - [`mama`]: a functional-language machine with boxed heap values, a
//!   global environment, and a dense byte-oriented code stream.
//!
//! Data flow: source text -> [`scanner`] -> per-machine assembler -> code
//! stream -> `run()` -> exit code and printed output.

pub mod cma;
pub mod errors;
pub mod log;
pub mod mama;
pub mod report;
pub mod scanner;
