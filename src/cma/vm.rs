//! The CMa execution engine.
//!
//! A single flat memory of 32-bit cells holds both the stack, growing up
//! from cell 0, and the heap, growing down from the top. Procedure
//! activations use the frame-pointer / extreme-pointer / new-pointer
//! discipline: `mark` saves the caller's EP and FP, `call` swaps the entry
//! address on top with the return address, `enter` raises EP to the
//! activation's high-water mark and checks it against NP, and `return`
//! unwinds. The stack starts empty (`SP = -1`), so the first value a
//! program pushes lands in cell 0, which doubles as the result slot
//! [`run`](Cma::run) reports.
//!
//! `print` and `debug` write to an output sink injected at construction;
//! the default is standard output.

use crate::cma::isa::{Instr, Opcode};
use crate::errors::VmError;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Number of 32-bit cells in the machine's memory.
///
/// Fixed by design: the EP/NP stack-overflow check is defined against this
/// boundary, so the memory must not be resizable.
pub const MEMORY_SIZE: usize = 1 << 20;

/// How many top-of-stack cells a `debug` dump shows.
const DEBUG_STACK_WINDOW: usize = 11;

/// The CMa virtual machine.
pub struct Cma<W> {
    /// Program to execute.
    instructions: Vec<Instr>,
    /// Index of the next instruction to fetch.
    pc: usize,
    /// Flat memory holding stack and heap.
    memory: Vec<i32>,
    /// Index of the topmost live stack cell; -1 when the stack is empty.
    sp: i64,
    /// Index of the saved return-PC cell of the current activation.
    fp: i64,
    /// Highest stack cell the current activation may push to.
    ep: i64,
    /// Lowest heap-occupied cell minus one; next free slot from the top.
    np: i64,
    /// Sink for `print` and `debug` output.
    out: W,
}

impl Cma<io::Stdout> {
    /// Creates a machine writing `print`/`debug` output to stdout.
    pub fn new(instructions: Vec<Instr>) -> Self {
        Self::with_output(instructions, io::stdout())
    }
}

impl<W: Write> Cma<W> {
    /// Creates a machine with an injected output sink.
    pub fn with_output(instructions: Vec<Instr>, out: W) -> Self {
        Self {
            instructions,
            pc: 0,
            memory: vec![0; MEMORY_SIZE],
            sp: -1,
            fp: 0,
            ep: 0,
            np: MEMORY_SIZE as i64 - 1,
            out,
        }
    }

    /// Runs to completion and returns the program result in cell 0.
    ///
    /// Execution ends when the program counter leaves the instruction
    /// range: by running off the end, by a jump to an out-of-range target,
    /// or by `halt`.
    pub fn run(&mut self) -> Result<i32, VmError> {
        while self.pc < self.instructions.len() {
            self.step()?;
        }
        Ok(self.memory[0])
    }

    /// Fetches and executes a single instruction.
    pub fn step(&mut self) -> Result<(), VmError> {
        let instr = *self
            .instructions
            .get(self.pc)
            .ok_or(VmError::CodeOutOfRange {
                target: self.pc,
                size: self.instructions.len(),
            })?;
        self.pc += 1;
        self.exec(instr)
    }

    fn exec(&mut self, instr: Instr) -> Result<(), VmError> {
        let arg = instr.arg;
        match instr.op {
            Opcode::Debug => self.op_debug(),
            Opcode::Loadc => self.op_loadc(arg),
            Opcode::Add => self.binary(|a, b| Ok(a.wrapping_add(b))),
            Opcode::Sub => self.binary(|a, b| Ok(a.wrapping_sub(b))),
            Opcode::Mul => self.binary(|a, b| Ok(a.wrapping_mul(b))),
            Opcode::Div => self.binary(|a, b| match b {
                0 => Err(VmError::DivisionByZero),
                _ => Ok(a.wrapping_div(b)),
            }),
            Opcode::Mod => self.binary(|a, b| match b {
                0 => Err(VmError::DivisionByZero),
                _ => Ok(a.wrapping_rem(b)),
            }),
            Opcode::And => self.binary(|a, b| Ok((a != 0 && b != 0) as i32)),
            Opcode::Or => self.binary(|a, b| Ok((a != 0 || b != 0) as i32)),
            Opcode::Xor => self.binary(|a, b| Ok(((a != 0) != (b != 0)) as i32)),
            Opcode::Eq => self.binary(|a, b| Ok((a == b) as i32)),
            Opcode::Neq => self.binary(|a, b| Ok((a != b) as i32)),
            Opcode::Le => self.binary(|a, b| Ok((a < b) as i32)),
            Opcode::Leq => self.binary(|a, b| Ok((a <= b) as i32)),
            Opcode::Gr => self.binary(|a, b| Ok((a > b) as i32)),
            Opcode::Geq => self.binary(|a, b| Ok((a >= b) as i32)),
            Opcode::Not => self.op_not(),
            Opcode::Neg => self.op_neg(),
            Opcode::Load => self.op_load(arg),
            Opcode::Store => self.op_store(arg),
            Opcode::Loada => self.op_loada(arg),
            Opcode::Storea => self.op_storea(arg),
            Opcode::Pop => self.op_pop(arg),
            Opcode::Jump => self.op_jump(arg),
            Opcode::Jumpz => self.op_jumpz(arg),
            Opcode::Jumpi => self.op_jumpi(arg),
            Opcode::Dup => self.op_dup(),
            Opcode::Alloc => self.op_alloc(arg),
            Opcode::New => self.op_new(),
            Opcode::Mark => self.op_mark(),
            Opcode::Call => self.op_call(),
            Opcode::Slide => self.op_slide(arg),
            Opcode::Enter => self.op_enter(arg),
            Opcode::Return => self.op_return(),
            Opcode::Loadrc => self.op_loadrc(arg),
            Opcode::Loadr => self.op_loadr(arg),
            Opcode::Storer => self.op_storer(arg),
            Opcode::Halt => self.op_halt(),
            Opcode::Print => self.op_print(),
        }
    }

    // ==================== Memory and stack access ====================

    fn cell(&self, address: i64) -> Result<i32, VmError> {
        usize::try_from(address)
            .ok()
            .and_then(|index| self.memory.get(index))
            .copied()
            .ok_or(VmError::MemoryOutOfRange { address })
    }

    fn set_cell(&mut self, address: i64, value: i32) -> Result<(), VmError> {
        let slot = usize::try_from(address)
            .ok()
            .and_then(|index| self.memory.get_mut(index))
            .ok_or(VmError::MemoryOutOfRange { address })?;
        *slot = value;
        Ok(())
    }

    fn push(&mut self, value: i32) -> Result<(), VmError> {
        self.sp += 1;
        self.set_cell(self.sp, value)
    }

    fn pop(&mut self) -> Result<i32, VmError> {
        if self.sp < 0 {
            return Err(VmError::StackUnderflow);
        }
        let value = self.cell(self.sp)?;
        self.sp -= 1;
        Ok(value)
    }

    /// Checks SP after an opcode that moves it without touching memory.
    fn check_sp(&self) -> Result<(), VmError> {
        if self.sp < -1 {
            return Err(VmError::StackUnderflow);
        }
        if self.sp >= MEMORY_SIZE as i64 {
            return Err(VmError::MemoryOutOfRange { address: self.sp });
        }
        Ok(())
    }

    /// Redirects the program counter; out-of-range targets end the run.
    fn jump_to(&mut self, target: i32) {
        self.pc = usize::try_from(target).unwrap_or(usize::MAX);
    }

    // ==================== Handlers ====================

    fn op_loadc(&mut self, constant: i32) -> Result<(), VmError> {
        self.push(constant)
    }

    /// Shared shape of the binary operators: operands at SP-1 and SP,
    /// result replaces them.
    fn binary(
        &mut self,
        apply: impl FnOnce(i32, i32) -> Result<i32, VmError>,
    ) -> Result<(), VmError> {
        let b = self.pop()?;
        let a = self.cell(self.sp)?;
        self.set_cell(self.sp, apply(a, b)?)
    }

    fn op_not(&mut self) -> Result<(), VmError> {
        let x = self.cell(self.sp)?;
        self.set_cell(self.sp, (x == 0) as i32)
    }

    fn op_neg(&mut self) -> Result<(), VmError> {
        let x = self.cell(self.sp)?;
        self.set_cell(self.sp, x.wrapping_neg())
    }

    fn op_load(&mut self, count: i32) -> Result<(), VmError> {
        let source = i64::from(self.cell(self.sp)?);
        for offset in 0..i64::from(count) {
            let value = self.cell(source + offset)?;
            self.set_cell(self.sp + offset, value)?;
        }
        self.sp += i64::from(count) - 1;
        self.check_sp()
    }

    /// Writes the `count` cells below the address on top to that address.
    ///
    /// The source block stays on the stack; only the address is popped.
    fn op_store(&mut self, count: i32) -> Result<(), VmError> {
        let dest = i64::from(self.cell(self.sp)?);
        for offset in 0..i64::from(count) {
            let value = self.cell(self.sp - i64::from(count) + offset)?;
            self.set_cell(dest + offset, value)?;
        }
        self.sp -= 1;
        Ok(())
    }

    fn op_loada(&mut self, address: i32) -> Result<(), VmError> {
        let value = self.cell(i64::from(address))?;
        self.push(value)
    }

    fn op_storea(&mut self, address: i32) -> Result<(), VmError> {
        let value = self.cell(self.sp)?;
        self.set_cell(i64::from(address), value)
    }

    fn op_pop(&mut self, count: i32) -> Result<(), VmError> {
        self.sp -= i64::from(count);
        self.check_sp()
    }

    fn op_jump(&mut self, target: i32) -> Result<(), VmError> {
        self.jump_to(target);
        Ok(())
    }

    fn op_jumpz(&mut self, target: i32) -> Result<(), VmError> {
        let x = self.pop()?;
        if x == 0 {
            self.jump_to(target);
        }
        Ok(())
    }

    fn op_jumpi(&mut self, base: i32) -> Result<(), VmError> {
        let x = self.pop()?;
        self.jump_to(base.wrapping_add(x));
        Ok(())
    }

    fn op_dup(&mut self) -> Result<(), VmError> {
        let top = self.cell(self.sp)?;
        self.push(top)
    }

    fn op_alloc(&mut self, count: i32) -> Result<(), VmError> {
        self.sp += i64::from(count);
        self.check_sp()
    }

    /// Allocates from the heap region growing down from the top of memory.
    ///
    /// On exhaustion (or a negative size request) the 0 sentinel replaces
    /// the size and NP stays untouched.
    fn op_new(&mut self) -> Result<(), VmError> {
        let size = i64::from(self.cell(self.sp)?);
        if size < 0 || self.np - size <= self.ep {
            self.set_cell(self.sp, 0)
        } else {
            self.np -= size;
            self.set_cell(self.sp, self.np as i32)
        }
    }

    fn op_mark(&mut self) -> Result<(), VmError> {
        self.set_cell(self.sp + 1, self.ep as i32)?;
        self.set_cell(self.sp + 2, self.fp as i32)?;
        self.sp += 2;
        Ok(())
    }

    fn op_call(&mut self) -> Result<(), VmError> {
        let entry = self.cell(self.sp)?;
        self.set_cell(self.sp, self.pc as i32)?;
        self.fp = self.sp;
        self.jump_to(entry);
        Ok(())
    }

    fn op_slide(&mut self, count: i32) -> Result<(), VmError> {
        let top = self.cell(self.sp)?;
        self.sp -= i64::from(count);
        self.set_cell(self.sp, top)
    }

    fn op_enter(&mut self, max_depth: i32) -> Result<(), VmError> {
        self.ep = self.sp + i64::from(max_depth);
        if self.ep >= self.np {
            return Err(VmError::StackOverflow {
                ep: self.ep,
                np: self.np,
            });
        }
        Ok(())
    }

    fn op_return(&mut self) -> Result<(), VmError> {
        let return_pc = self.cell(self.fp)?;
        self.ep = i64::from(self.cell(self.fp - 2)?);
        if self.ep >= self.np {
            return Err(VmError::StackOverflow {
                ep: self.ep,
                np: self.np,
            });
        }
        self.sp = self.fp - 3;
        self.fp = i64::from(self.cell(self.sp + 2)?);
        self.jump_to(return_pc);
        Ok(())
    }

    fn op_loadrc(&mut self, offset: i32) -> Result<(), VmError> {
        self.push((self.fp + i64::from(offset)) as i32)
    }

    fn op_loadr(&mut self, offset: i32) -> Result<(), VmError> {
        let value = self.cell(self.fp + i64::from(offset))?;
        self.push(value)
    }

    fn op_storer(&mut self, offset: i32) -> Result<(), VmError> {
        let value = self.cell(self.sp)?;
        self.set_cell(self.fp + i64::from(offset), value)
    }

    fn op_halt(&mut self) -> Result<(), VmError> {
        self.pc = usize::MAX;
        Ok(())
    }

    fn op_print(&mut self) -> Result<(), VmError> {
        let x = self.pop()?;
        writeln!(self.out, "{x}")?;
        Ok(())
    }

    fn op_debug(&mut self) -> Result<(), VmError> {
        writeln!(
            self.out,
            "CMa state: SP = {}, PC = {}, FP = {}, EP = {}, NP = {}",
            self.sp, self.pc, self.fp, self.ep, self.np
        )?;
        let mut line = String::from("    stack: ");
        let live = if self.sp < 0 { 0 } else { self.sp as usize + 1 };
        let shown = live.min(DEBUG_STACK_WINDOW);
        if live > shown {
            line.push_str("...   ");
        }
        for index in live - shown..live {
            let _ = write!(line, "{}   ", self.memory[index]);
        }
        line.push_str("<- top");
        writeln!(self.out, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cma::assembler::assemble;

    fn run_machine(source: &str) -> (Cma<Vec<u8>>, i32) {
        let program = assemble(source).expect("assembly failed");
        let mut vm = Cma::with_output(program, Vec::new());
        let exit = vm.run().expect("vm run failed");
        (vm, exit)
    }

    fn run_output(source: &str) -> String {
        let (vm, _) = run_machine(source);
        String::from_utf8(vm.out).expect("output is utf-8")
    }

    fn run_exit(source: &str) -> i32 {
        run_machine(source).1
    }

    fn run_expect_err(source: &str) -> VmError {
        let program = assemble(source).expect("assembly failed");
        let mut vm = Cma::with_output(program, Vec::new());
        vm.run().expect_err("expected runtime error")
    }

    // ==================== Termination ====================

    #[test]
    fn empty_program() {
        assert_eq!(run_output(""), "");
        assert_eq!(run_exit(""), 0);
    }

    #[test]
    fn halt_only() {
        assert_eq!(run_output("halt"), "");
        assert_eq!(run_exit("halt"), 0);
    }

    #[test]
    fn running_off_the_end_terminates() {
        assert_eq!(run_exit("loadc 5"), 5);
    }

    #[test]
    fn out_of_range_jump_terminates() {
        assert_eq!(run_exit("loadc 9 jump 100"), 9);
        assert_eq!(run_exit("loadc 9 jump -5"), 9);
    }

    #[test]
    fn step_past_the_end_is_an_error() {
        let mut vm = Cma::with_output(Vec::new(), Vec::new());
        assert!(matches!(
            vm.step(),
            Err(VmError::CodeOutOfRange { target: 0, size: 0 })
        ));
    }

    // ==================== Arithmetic and logic ====================

    #[test]
    fn arithmetic() {
        assert_eq!(run_exit("loadc 2 loadc 3 add halt"), 5);
        assert_eq!(run_exit("loadc 10 loadc 4 sub halt"), 6);
        assert_eq!(run_exit("loadc 6 loadc 7 mul halt"), 42);
        assert_eq!(run_exit("loadc 7 loadc 2 div halt"), 3);
        assert_eq!(run_exit("loadc -7 loadc 2 div halt"), -3);
        assert_eq!(run_exit("loadc 7 loadc 2 mod halt"), 1);
        assert_eq!(run_exit("loadc -7 loadc 2 mod halt"), -1);
    }

    #[test]
    fn division_by_zero_is_fatal() {
        assert!(matches!(
            run_expect_err("loadc 1 loadc 0 div halt"),
            VmError::DivisionByZero
        ));
        assert!(matches!(
            run_expect_err("loadc 1 loadc 0 mod halt"),
            VmError::DivisionByZero
        ));
    }

    #[test]
    fn logical_connectives_normalize() {
        assert_eq!(run_exit("loadc 5 loadc -2 and halt"), 1);
        assert_eq!(run_exit("loadc 5 loadc 0 and halt"), 0);
        assert_eq!(run_exit("loadc 0 loadc 3 or halt"), 1);
        assert_eq!(run_exit("loadc 0 loadc 0 or halt"), 0);
    }

    #[test]
    fn xor_is_logical_not_bitwise() {
        assert_eq!(run_exit("loadc 5 loadc 3 xor halt"), 0);
        assert_eq!(run_exit("loadc 5 loadc 0 xor halt"), 1);
        assert_eq!(run_exit("loadc 0 loadc 3 xor halt"), 1);
        assert_eq!(run_exit("loadc 0 loadc 0 xor halt"), 0);
    }

    #[test]
    fn comparisons() {
        assert_eq!(run_exit("loadc 3 loadc 7 eq halt"), 0);
        assert_eq!(run_exit("loadc 7 loadc 7 eq halt"), 1);
        assert_eq!(run_exit("loadc 3 loadc 7 neq halt"), 1);
        assert_eq!(run_exit("loadc 3 loadc 7 le halt"), 1);
        assert_eq!(run_exit("loadc 7 loadc 7 le halt"), 0);
        assert_eq!(run_exit("loadc 7 loadc 7 leq halt"), 1);
        assert_eq!(run_exit("loadc 3 loadc 7 gr halt"), 0);
        assert_eq!(run_exit("loadc 7 loadc 3 gr halt"), 1);
        assert_eq!(run_exit("loadc 7 loadc 7 geq halt"), 1);
        assert_eq!(run_exit("loadc 3 loadc 7 geq halt"), 0);
    }

    #[test]
    fn unary_operators_work_in_place() {
        assert_eq!(run_exit("loadc 0 not halt"), 1);
        assert_eq!(run_exit("loadc 9 not halt"), 0);
        assert_eq!(run_exit("loadc 9 neg halt"), -9);
        assert_eq!(run_exit("loadc -9 neg halt"), 9);
    }

    #[test]
    fn binary_op_on_empty_stack_underflows() {
        assert!(matches!(run_expect_err("add"), VmError::StackUnderflow));
    }

    // ==================== Stack manipulation ====================

    #[test]
    fn dup_and_pop() {
        assert_eq!(run_exit("loadc 3 dup add halt"), 6);
        let (vm, exit) = run_machine("loadc 1 loadc 2 loadc 3 pop 2 halt");
        assert_eq!(exit, 1);
        assert_eq!(vm.sp, 0);
    }

    #[test]
    fn pop_below_empty_underflows() {
        assert!(matches!(
            run_expect_err("loadc 1 pop 3"),
            VmError::StackUnderflow
        ));
    }

    #[test]
    fn slide_keeps_the_top() {
        // 99 is dropped, 7 slides down into its slot.
        assert_eq!(run_exit("loadc 99 loadc 7 slide 1 halt"), 7);
    }

    // ==================== Absolute and relative addressing ====================

    #[test]
    fn storea_keeps_the_top_and_loada_reads_back() {
        let (vm, exit) = run_machine("loadc 9 storea 5 pop loada 5 halt");
        assert_eq!(exit, 9);
        assert_eq!(vm.memory[5], 9);
    }

    #[test]
    fn store_writes_a_block_and_leaves_the_source() {
        let (vm, exit) = run_machine("loadc 11 loadc 22 loadc 100 store 2 halt");
        assert_eq!(vm.memory[100..102], [11, 22]);
        // Only the address is popped; the source block stays below.
        assert_eq!(vm.sp, 1);
        assert_eq!(exit, 11);
    }

    #[test]
    fn load_copies_a_block_onto_the_stack() {
        let (vm, exit) =
            run_machine("loadc 11 loadc 22 loadc 100 store 2 pop pop loadc 100 load 2 halt");
        assert_eq!(exit, 11);
        assert_eq!(vm.sp, 1);
        assert_eq!(vm.memory[1], 22);
    }

    #[test]
    fn loadrc_pushes_a_frame_address() {
        assert_eq!(run_exit("loadrc 3 halt"), 3);
    }

    #[test]
    fn storer_keeps_the_top() {
        let (vm, exit) = run_machine("loadc 7 storer 2 halt");
        assert_eq!(vm.memory[2], 7);
        assert_eq!(exit, 7);
    }

    // ==================== Jumps ====================

    #[test]
    fn jumpz_pops_on_both_branches() {
        let (taken, _) = run_machine("loadc 0 jumpz l l: halt");
        assert_eq!(taken.sp, -1);
        let (fallen, _) = run_machine("loadc 1 jumpz l l: halt");
        assert_eq!(fallen.sp, -1);
    }

    // ==================== Heap allocation ====================

    #[test]
    fn new_carves_from_the_top_of_memory() {
        let (vm, exit) = run_machine("loadc 100 new halt");
        assert_eq!(exit, MEMORY_SIZE as i32 - 1 - 100);
        assert_eq!(vm.np, MEMORY_SIZE as i64 - 1 - 100);
    }

    #[test]
    fn new_returns_zero_when_the_heap_is_exhausted() {
        let (vm, exit) = run_machine("loadc 2000000 new halt");
        assert_eq!(exit, 0);
        assert_eq!(vm.np, MEMORY_SIZE as i64 - 1);
    }

    #[test]
    fn new_rejects_a_negative_size() {
        let (vm, exit) = run_machine("loadc -5 new halt");
        assert_eq!(exit, 0);
        assert_eq!(vm.np, MEMORY_SIZE as i64 - 1);
    }

    // ==================== Procedure calls ====================

    #[test]
    fn call_protocol_computes_through_a_frame() {
        let exit = run_exit(
            "       loadc 0
                    loadc 21
                    mark
                    loadc f
                    call
                    slide 1
                    halt
             f:     enter 5
                    loadr -3
                    loadr -3
                    add
                    storer -3
                    pop
                    return",
        );
        assert_eq!(exit, 42);
    }

    #[test]
    fn enter_detects_stack_overflow() {
        assert!(matches!(
            run_expect_err("enter 1048576"),
            VmError::StackOverflow { .. }
        ));
    }

    #[test]
    fn enter_at_the_boundary_is_fine() {
        assert_eq!(run_exit("enter 1048575 halt"), 0);
    }

    // ==================== Boundaries ====================

    #[test]
    fn stack_may_fill_the_whole_memory() {
        assert_eq!(run_exit("alloc 1048576 halt"), 0);
    }

    #[test]
    fn pushing_past_the_last_cell_is_fatal() {
        assert!(matches!(
            run_expect_err("alloc 1048576 dup halt"),
            VmError::MemoryOutOfRange { .. }
        ));
    }

    // ==================== Output ====================

    #[test]
    fn print_writes_decimal_lines() {
        assert_eq!(run_output("loadc 3 print loadc -4 print halt"), "3\n-4\n");
    }

    #[test]
    fn debug_on_the_initial_state() {
        assert_eq!(
            run_output("debug"),
            "CMa state: SP = -1, PC = 1, FP = 0, EP = 0, NP = 1048575\n\
             \x20   stack: <- top\n"
        );
    }

    #[test]
    fn debug_truncates_a_deep_stack() {
        let output = run_output(
            "       loadc 12
             loop:  dup
                    loadc 1
                    sub
                    dup
                    jumpz end
                    jump loop
             end:   debug",
        );
        assert_eq!(
            output,
            "CMa state: SP = 12, PC = 8, FP = 0, EP = 0, NP = 1048575\n\
             \x20   stack: ...   10   9   8   7   6   5   4   3   2   1   0   <- top\n"
        );
    }

    #[test]
    fn debug_after_alloc_shows_zeroed_cells() {
        let output = run_output("alloc 10 debug");
        assert_eq!(
            output,
            "CMa state: SP = 9, PC = 2, FP = 0, EP = 0, NP = 1048575\n\
             \x20   stack: 0   0   0   0   0   0   0   0   0   0   <- top\n"
        );
    }

    // ==================== End-to-end scenarios ====================

    #[test]
    fn count_down_loop() {
        let output = run_output(
            "       loadc 10
             loop:  loadc 1
                    sub
                    dup
                    print
                    dup
                    jumpz end
                    jump loop
             end:   halt",
        );
        assert_eq!(output, "9\n8\n7\n6\n5\n4\n3\n2\n1\n0\n");
    }

    #[test]
    fn jump_table_switch() {
        let output = run_output(
            "loadc 2 dup loadc 0 geq jumpz A dup loadc 3 le jumpz A jumpi B
             A: pop loadc 3 jumpi B
             C0: loadc 0 print jump D   C1: loadc 1 print jump D
             C2: loadc 2 print jump D   C3: loadc 3 print jump D
             B: jump C0 jump C1 jump C2 jump C3
             D: halt",
        );
        assert_eq!(output, "2\n");
    }

    #[test]
    fn conditional_skips_the_dead_branch() {
        let output = run_output("loadc 1 loadc 10 gr jumpz E loadc 0 print E: loadc 1 print halt");
        assert_eq!(output, "1\n");
    }

    #[test]
    fn heap_allocate_store_reload() {
        let output = run_output("loadc 100 new dup loadc 11 loada 0 store pop load print halt");
        assert_eq!(output, "11\n");
    }

    #[test]
    fn recursive_factorial() {
        let exit = run_exit(
            "       loadc 0
                    loadc 5
                    mark
                    loadc fac
                    call
                    slide 1
                    halt
             fac:   enter 8
                    loadr -3
                    loadc 2
                    le
                    jumpz recurse
                    loadc 1
                    storer -3
                    pop
                    return
             recurse:
                    loadr -3
                    loadr -3
                    loadc 1
                    sub
                    mark
                    loadc fac
                    call
                    mul
                    storer -3
                    pop
                    return",
        );
        assert_eq!(exit, 120);
    }
}
