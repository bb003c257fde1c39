use stackmach_derive::Error;

/// Errors raised while assembling or executing a program.
///
/// Parse-time variants carry enough context for [`crate::report`] to render
/// a source-anchored diagnostic; run-time variants describe the machine
/// state that made further progress impossible. None of these are
/// recoverable: the machines treat their input as trusted and the drivers
/// abort on any error.
#[derive(Debug, Error)]
pub enum VmError {
    // ==================== Parse-time ====================
    /// Mnemonic does not name any instruction of the target machine.
    #[error("unknown mnemonic: {name}")]
    UnknownMnemonic { name: String },
    /// A token started with a byte no grammar rule accepts.
    #[error("unexpected character {found:?}")]
    UnexpectedCharacter { found: char },
    /// Number literal did not parse as a 32-bit signed integer.
    #[error("malformed number: {literal}")]
    MalformedNumber { literal: String },
    /// Instruction requires an operand but none followed.
    #[error("missing operand for {mnemonic}")]
    MissingOperand { mnemonic: &'static str },
    /// Code offsets are unsigned; a negative literal cannot name one.
    #[error("negative code offset {value} for {mnemonic}")]
    NegativeOffset { mnemonic: &'static str, value: i32 },
    /// Label defined more than once.
    #[error("duplicate label: {label}")]
    DuplicateLabel { label: String },
    /// Label referenced but never defined.
    #[error("unknown label: {label}")]
    UnknownLabel { label: String },
    /// Parse failure wrapped with its source position.
    #[error("line {line}:{column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },

    // ==================== Run-time ====================
    /// Opcode byte does not decode to any instruction.
    #[error("invalid opcode {opcode:#04x} at code offset {offset}")]
    InvalidOpcode { opcode: u8, offset: usize },
    /// Code stream ended in the middle of an instruction.
    #[error("unexpected end of code at offset {offset} ({requested} bytes requested)")]
    UnexpectedEndOfCode { offset: usize, requested: usize },
    /// Code pointer left the instruction stream.
    #[error("code pointer {target} out of range (code size {size})")]
    CodeOutOfRange { target: usize, size: usize },
    /// Stack and heap regions collided.
    #[error("stack overflow: EP = {ep}, NP = {np}")]
    StackOverflow { ep: i64, np: i64 },
    /// Pop from an empty stack.
    #[error("stack underflow")]
    StackUnderflow,
    /// Memory cell index outside the machine's address space.
    #[error("memory access out of range: address {address}")]
    MemoryOutOfRange { address: i64 },
    /// Division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Heap node had the wrong variant for the instruction.
    #[error("bad heap tag: expected {expected}, found {found}")]
    BadHeapTag {
        expected: &'static str,
        found: &'static str,
    },
    /// Heap reference does not name an allocated node.
    #[error("dangling heap reference {reference}")]
    DanglingHeapRef { reference: usize },
    /// Global vector index out of range.
    #[error("global {index} out of range (environment holds {len})")]
    GlobalOutOfRange { index: usize, len: usize },
    /// Failure writing to the output sink.
    #[error("output error: {0}")]
    Output(String),
}

impl From<std::io::Error> for VmError {
    fn from(err: std::io::Error) -> Self {
        VmError::Output(err.to_string())
    }
}
