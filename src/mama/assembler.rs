//! Single-pass assembler with backpatching for MaMa programs.
//!
//! Emits the dense byte stream directly: one opcode byte, then an 8-byte
//! little-endian immediate where the opcode carries one. A reference to a
//! label that is not defined yet emits a zero placeholder and lands on the
//! backpatch list; once the whole text has been read, every placeholder is
//! overwritten with the resolved byte offset. A label names the offset at
//! which the next instruction is emitted.

use crate::errors::VmError;
use crate::mama::isa::{IMMEDIATE_SIZE, ImmKind, Opcode};
use crate::scanner::Scanner;
use std::collections::HashMap;

/// Wraps an error with the source position it was raised at.
fn located(at: (usize, usize), err: VmError) -> VmError {
    VmError::ParseError {
        line: at.0,
        column: at.1,
        message: err.to_string(),
    }
}

/// Assembler state for one source text.
///
/// Label names are borrowed from the source, so the text must stay alive
/// while the assembler runs; the emitted code stream owns nothing.
struct Assembler<'a> {
    code: Vec<u8>,
    labels: HashMap<&'a str, usize>,
    /// Placeholder positions awaiting a label, with the use site for
    /// diagnostics.
    backpatches: Vec<(usize, &'a str, (usize, usize))>,
}

impl<'a> Assembler<'a> {
    fn new() -> Self {
        Self {
            code: Vec::new(),
            labels: HashMap::new(),
            backpatches: Vec::new(),
        }
    }

    fn assemble(mut self, source: &'a str) -> Result<Vec<u8>, VmError> {
        let mut scanner = Scanner::new(source);

        loop {
            scanner.skip();
            if scanner.at_end() {
                break;
            }
            let at = scanner.location();
            if !scanner.at_word() {
                return Err(located(
                    at,
                    VmError::UnexpectedCharacter {
                        found: scanner.peek() as char,
                    },
                ));
            }

            let word = scanner.read_word();
            if scanner.consume_colon() {
                self.define_label(word).map_err(|e| located(at, e))?;
            } else {
                self.emit_instruction(&mut scanner, word)?;
            }
        }

        self.patch_labels()?;
        Ok(self.code)
    }

    fn define_label(&mut self, name: &'a str) -> Result<(), VmError> {
        if self.labels.insert(name, self.code.len()).is_some() {
            return Err(VmError::DuplicateLabel {
                label: name.to_string(),
            });
        }
        Ok(())
    }

    fn emit_instruction(
        &mut self,
        scanner: &mut Scanner<'a>,
        word: &str,
    ) -> Result<(), VmError> {
        let at = scanner.location();
        let op = Opcode::from_mnemonic(word).map_err(|e| located(at, e))?;
        self.code.push(op as u8);

        let Some(kind) = op.immediate() else {
            return Ok(());
        };

        scanner.skip();
        let at = scanner.location();
        if scanner.at_word() {
            let label = scanner.read_word();
            match self.labels.get(label) {
                Some(&offset) => self.code.extend_from_slice(&(offset as u64).to_le_bytes()),
                None => {
                    self.backpatches.push((self.code.len(), label, at));
                    self.code.extend_from_slice(&0u64.to_le_bytes());
                }
            }
        } else if scanner.at_number() {
            let value = scanner.read_number().map_err(|e| located(at, e))?;
            let bytes = match kind {
                ImmKind::Int => i64::from(value).to_le_bytes(),
                ImmKind::Offset => u64::try_from(value)
                    .map_err(|_| {
                        located(
                            at,
                            VmError::NegativeOffset {
                                mnemonic: op.mnemonic(),
                                value,
                            },
                        )
                    })?
                    .to_le_bytes(),
            };
            self.code.extend_from_slice(&bytes);
        } else {
            return Err(located(
                at,
                VmError::MissingOperand {
                    mnemonic: op.mnemonic(),
                },
            ));
        }

        Ok(())
    }

    /// Overwrites every placeholder with its label's resolved offset.
    ///
    /// After this the backpatch list is empty and every recorded target
    /// lies inside the code stream.
    fn patch_labels(&mut self) -> Result<(), VmError> {
        let size = self.code.len();
        for (position, label, at) in self.backpatches.drain(..) {
            let offset = *self.labels.get(label).ok_or_else(|| {
                located(
                    at,
                    VmError::UnknownLabel {
                        label: label.to_string(),
                    },
                )
            })?;
            let slot = self
                .code
                .get_mut(position..position + IMMEDIATE_SIZE)
                .ok_or(VmError::CodeOutOfRange {
                    target: position,
                    size,
                })?;
            slot.copy_from_slice(&(offset as u64).to_le_bytes());
        }
        Ok(())
    }
}

/// Assembles MaMa source text into a code stream.
pub fn assemble(source: &str) -> Result<Vec<u8>, VmError> {
    Assembler::new().assemble(source)
}
