//! The MaMa execution engine.
//!
//! Executes the dense byte stream produced by the assembler over a typed
//! value stack, a global environment vector, and a tagged heap. Dispatch
//! is a tight fetch/decode loop with one handler per opcode; handlers read
//! their immediates byte-exact from the stream and advance the code
//! pointer past them before touching the stack.
//!
//! The code stream is borrowed for the lifetime of the machine; the caller
//! keeps the backing buffer alive. The stack starts as 1,024 zeroed slots
//! with SP resting on slot 0, so `halt` on an untouched stack exits with
//! 0; it grows on demand beyond the reserved slots.

use crate::errors::VmError;
use crate::mama::heap::{BasicValue, Heap, HeapValue};
use crate::mama::isa::{IMMEDIATE_SIZE, Opcode};
use std::fmt::Write as _;
use std::io::{self, Write};

/// Stack slots reserved up front.
pub const INITIAL_STACK_SIZE: usize = 1 << 10;

/// How many top-of-stack slots a `debug` dump shows.
const DEBUG_STACK_WINDOW: usize = 11;

/// Decodes an opcode's immediates and calls its handler.
macro_rules! dispatch {
    (
        vm = $vm:ident, op = $op:ident,
        { $( $variant:ident => $handler:ident $args:tt ),* $(,)? }
    ) => {
        match $op {
            $( Opcode::$variant => dispatch!(@call $vm, $handler, $args), )*
        }
    };

    (@call $vm:ident, $handler:ident, ()) => {
        $vm.$handler()
    };

    (@call $vm:ident, $handler:ident, ( $field:ident : $kind:ident )) => {{
        let $field = dispatch!(@read $vm, $kind)?;
        $vm.$handler($field)
    }};

    // 64-bit signed constant, little-endian.
    (@read $vm:ident, ImmI64) => {
        $vm.read_immediate().map(i64::from_le_bytes)
    };

    // 64-bit unsigned offset or index, little-endian.
    (@read $vm:ident, OffU64) => {
        $vm.read_immediate().map(u64::from_le_bytes)
    };
}

/// The MaMa virtual machine.
pub struct MaMa<'a, W> {
    /// Borrowed code stream.
    code: &'a [u8],
    /// Byte offset of the next opcode or immediate to read.
    cp: usize,
    /// Value stack; `sp` always names a valid slot.
    stack: Vec<BasicValue>,
    sp: usize,
    /// Frame pointer into the stack.
    fp: usize,
    /// Global environment indexed by `pushglob`.
    globals: Vec<BasicValue>,
    /// Boxed values.
    heap: Heap,
    /// Exit value once `halt` has executed.
    exit: Option<i64>,
    /// Sink for `print` and `debug` output.
    out: W,
}

impl<'a> MaMa<'a, io::Stdout> {
    /// Creates a machine writing `print`/`debug` output to stdout.
    pub fn new(code: &'a [u8]) -> Self {
        Self::with_output(code, io::stdout())
    }
}

impl<'a, W: Write> MaMa<'a, W> {
    /// Creates a machine with an injected output sink.
    pub fn with_output(code: &'a [u8], out: W) -> Self {
        Self {
            code,
            cp: 0,
            stack: vec![BasicValue::ZERO; INITIAL_STACK_SIZE],
            sp: 0,
            fp: 0,
            globals: Vec::new(),
            heap: Heap::new(),
            exit: None,
            out,
        }
    }

    /// Replaces the global environment that `pushglob` indexes.
    ///
    /// No opcode of the machine constructs globals; embedders provide
    /// them.
    pub fn set_globals(&mut self, globals: Vec<BasicValue>) {
        self.globals = globals;
    }

    /// Runs until `halt` and returns the program's exit value.
    ///
    /// A code pointer that leaves the stream without reaching `halt` is a
    /// fatal error.
    pub fn run(&mut self) -> Result<i64, VmError> {
        loop {
            if let Some(code) = self.exit {
                return Ok(code);
            }
            self.step()?;
        }
    }

    /// Fetches and executes a single instruction.
    pub fn step(&mut self) -> Result<(), VmError> {
        let offset = self.cp;
        let opcode = *self.code.get(offset).ok_or(VmError::CodeOutOfRange {
            target: offset,
            size: self.code.len(),
        })?;
        self.cp += 1;
        let op = Opcode::try_from(opcode).map_err(|_| VmError::InvalidOpcode { opcode, offset })?;
        self.exec(op)
    }

    fn exec(&mut self, op: Opcode) -> Result<(), VmError> {
        dispatch! {
            vm = self, op = op,
            {
                Debug => op_debug(),
                Print => op_print(),
                Loadc => op_loadc(value: ImmI64),
                Dup => op_dup(),
                Add => op_add(),
                Sub => op_sub(),
                Mul => op_mul(),
                Div => op_div(),
                Mod => op_mod(),
                And => op_and(),
                Or => op_or(),
                Xor => op_xor(),
                Eq => op_eq(),
                Neq => op_neq(),
                Le => op_le(),
                Leq => op_leq(),
                Gr => op_gr(),
                Geq => op_geq(),
                Not => op_not(),
                Neg => op_neg(),
                Halt => op_halt(),
                Jump => op_jump(target: OffU64),
                Jumpz => op_jumpz(target: OffU64),
                Getbasic => op_getbasic(),
                Mkbasic => op_mkbasic(),
                Pushloc => op_pushloc(offset: OffU64),
                Pushglob => op_pushglob(index: OffU64),
                Slide => op_slide(count: OffU64),
            }
        }
    }

    /// Reads the 8 immediate bytes at the code pointer and skips them.
    fn read_immediate(&mut self) -> Result<[u8; IMMEDIATE_SIZE], VmError> {
        let start = self.cp;
        let slice = self
            .code
            .get(start..start + IMMEDIATE_SIZE)
            .ok_or(VmError::UnexpectedEndOfCode {
                offset: start,
                requested: IMMEDIATE_SIZE,
            })?;
        let mut bytes = [0; IMMEDIATE_SIZE];
        bytes.copy_from_slice(slice);
        self.cp = start + IMMEDIATE_SIZE;
        Ok(bytes)
    }

    // ==================== Stack access ====================

    fn push(&mut self, value: BasicValue) {
        self.sp += 1;
        if self.sp == self.stack.len() {
            self.stack.push(value);
        } else {
            self.stack[self.sp] = value;
        }
    }

    fn pop(&mut self) -> Result<BasicValue, VmError> {
        if self.sp == 0 {
            return Err(VmError::StackUnderflow);
        }
        let value = self.stack[self.sp];
        self.sp -= 1;
        Ok(value)
    }

    fn top(&self) -> BasicValue {
        self.stack[self.sp]
    }

    fn set_top(&mut self, value: BasicValue) {
        self.stack[self.sp] = value;
    }

    /// Redirects the code pointer to an assembler-produced offset.
    fn jump_to(&mut self, target: u64) -> Result<(), VmError> {
        let target = usize::try_from(target).unwrap_or(usize::MAX);
        if target >= self.code.len() {
            return Err(VmError::CodeOutOfRange {
                target,
                size: self.code.len(),
            });
        }
        self.cp = target;
        Ok(())
    }

    /// Shared shape of the binary operators: operands in the two topmost
    /// slots, result replaces them.
    fn binary(
        &mut self,
        apply: impl FnOnce(i64, i64) -> Result<i64, VmError>,
    ) -> Result<(), VmError> {
        let b = self.pop()?.as_int();
        let a = self.top().as_int();
        self.set_top(BasicValue::from_int(apply(a, b)?));
        Ok(())
    }

    // ==================== Handlers ====================

    fn op_loadc(&mut self, value: i64) -> Result<(), VmError> {
        self.push(BasicValue::from_int(value));
        Ok(())
    }

    fn op_dup(&mut self) -> Result<(), VmError> {
        self.push(self.top());
        Ok(())
    }

    fn op_add(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| Ok(a.wrapping_add(b)))
    }

    fn op_sub(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| Ok(a.wrapping_sub(b)))
    }

    fn op_mul(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| Ok(a.wrapping_mul(b)))
    }

    fn op_div(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| match b {
            0 => Err(VmError::DivisionByZero),
            _ => Ok(a.wrapping_div(b)),
        })
    }

    fn op_mod(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| match b {
            0 => Err(VmError::DivisionByZero),
            _ => Ok(a.wrapping_rem(b)),
        })
    }

    fn op_and(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| Ok((a != 0 && b != 0) as i64))
    }

    fn op_or(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| Ok((a != 0 || b != 0) as i64))
    }

    fn op_xor(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| Ok(((a != 0) != (b != 0)) as i64))
    }

    fn op_eq(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| Ok((a == b) as i64))
    }

    fn op_neq(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| Ok((a != b) as i64))
    }

    fn op_le(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| Ok((a < b) as i64))
    }

    fn op_leq(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| Ok((a <= b) as i64))
    }

    fn op_gr(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| Ok((a > b) as i64))
    }

    fn op_geq(&mut self) -> Result<(), VmError> {
        self.binary(|a, b| Ok((a >= b) as i64))
    }

    fn op_not(&mut self) -> Result<(), VmError> {
        let x = self.top().as_int();
        self.set_top(BasicValue::from_int((x == 0) as i64));
        Ok(())
    }

    fn op_neg(&mut self) -> Result<(), VmError> {
        let x = self.top().as_int();
        self.set_top(BasicValue::from_int(x.wrapping_neg()));
        Ok(())
    }

    fn op_halt(&mut self) -> Result<(), VmError> {
        self.exit = Some(self.top().as_int());
        Ok(())
    }

    fn op_jump(&mut self, target: u64) -> Result<(), VmError> {
        self.jump_to(target)
    }

    fn op_jumpz(&mut self, target: u64) -> Result<(), VmError> {
        let x = self.pop()?;
        if x.as_int() == 0 {
            self.jump_to(target)?;
        }
        Ok(())
    }

    /// Unboxes the basic value behind the heap reference on top.
    ///
    /// Any other heap variant is a fatal type mismatch.
    fn op_getbasic(&mut self) -> Result<(), VmError> {
        let reference = self.top().to_ref();
        match self.heap.get(reference)? {
            HeapValue::Basic(value) => {
                let value = *value;
                self.set_top(value);
                Ok(())
            }
            other => Err(VmError::BadHeapTag {
                expected: "basic",
                found: other.tag(),
            }),
        }
    }

    /// Boxes the top into a fresh heap node and pushes its reference.
    fn op_mkbasic(&mut self) -> Result<(), VmError> {
        let value = self.top();
        let reference = self.heap.create(HeapValue::Basic(value));
        self.set_top(BasicValue::from_ref(reference));
        Ok(())
    }

    fn op_pushloc(&mut self, offset: u64) -> Result<(), VmError> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let index = self.sp.checked_sub(offset).ok_or(VmError::StackUnderflow)?;
        self.push(self.stack[index]);
        Ok(())
    }

    fn op_pushglob(&mut self, index: u64) -> Result<(), VmError> {
        let index = usize::try_from(index).unwrap_or(usize::MAX);
        let value = *self
            .globals
            .get(index)
            .ok_or(VmError::GlobalOutOfRange {
                index,
                len: self.globals.len(),
            })?;
        self.push(value);
        Ok(())
    }

    fn op_slide(&mut self, count: u64) -> Result<(), VmError> {
        let top = self.top();
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        self.sp = self.sp.checked_sub(count).ok_or(VmError::StackUnderflow)?;
        self.set_top(top);
        Ok(())
    }

    fn op_print(&mut self) -> Result<(), VmError> {
        let x = self.pop()?.as_int();
        writeln!(self.out, "{x}")?;
        Ok(())
    }

    fn op_debug(&mut self) -> Result<(), VmError> {
        writeln!(
            self.out,
            "MaMa state: SP = {}, CP = {}, FP = {}, globals = {}, heap = {}",
            self.sp,
            self.cp,
            self.fp,
            self.globals.len(),
            self.heap.len()
        )?;
        let mut line = String::from("    stack: ");
        let live = self.sp + 1;
        let shown = live.min(DEBUG_STACK_WINDOW);
        if live > shown {
            line.push_str("...   ");
        }
        for index in live - shown..live {
            let _ = write!(line, "{}   ", self.stack[index].as_int());
        }
        line.push_str("<- top");
        writeln!(self.out, "{line}")?;
        Ok(())
    }
}
