//! Two-pass assembler for CMa programs.
//!
//! Pass 1 walks the text only to record each label's instruction index;
//! pass 2 re-parses and emits instructions with every label operand
//! resolved through the table. Forward references therefore need no
//! backpatching.
//!
//! # Syntax
//!
//! ```text
//! // comment to end of line
//! entry:  loadc 5         // label definition, instruction with operand
//!         jump entry      // label reference
//!         pop             // optional operand defaults to 1
//! ```

use crate::cma::isa::{ArgPolicy, Instr, Opcode};
use crate::errors::VmError;
use crate::scanner::Scanner;
use std::collections::HashMap;

/// Which of the two walks over the source is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    GatherLabels,
    EmitInstructions,
}

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
/// while the assembler runs; the emitted instructions own nothing.
struct Assembler<'a> {
    source: &'a str,
    labels: HashMap<&'a str, i32>,
}

impl<'a> Assembler<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            labels: HashMap::new(),
        }
    }

    fn assemble(mut self) -> Result<Vec<Instr>, VmError> {
        self.run_pass(Pass::GatherLabels)?;
        self.run_pass(Pass::EmitInstructions)
    }

    fn run_pass(&mut self, pass: Pass) -> Result<Vec<Instr>, VmError> {
        let mut scanner = Scanner::new(self.source);
        let mut instructions = Vec::new();
        let mut instr_index: i32 = 0;

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
                if pass == Pass::GatherLabels {
                    self.define_label(word, instr_index).map_err(|e| located(at, e))?;
                }
            } else {
                let instr = self.parse_instruction(&mut scanner, word, pass)?;
                if pass == Pass::EmitInstructions {
                    instructions.push(instr);
                }
                instr_index += 1;
            }
        }

        Ok(instructions)
    }

    fn define_label(&mut self, name: &'a str, index: i32) -> Result<(), VmError> {
        if self.labels.insert(name, index).is_some() {
            return Err(VmError::DuplicateLabel {
                label: name.to_string(),
            });
        }
        Ok(())
    }

    /// Parses the operand (if any) of the instruction named by `word`.
    ///
    /// Label operands resolve through the table only in the emit pass; the
    /// gather pass just consumes the token.
    fn parse_instruction(
        &self,
        scanner: &mut Scanner<'a>,
        word: &str,
        pass: Pass,
    ) -> Result<Instr, VmError> {
        let at = scanner.location();
        let op = Opcode::from_mnemonic(word).map_err(|e| located(at, e))?;

        let arg = match op.arg_policy() {
            ArgPolicy::None => 0,
            ArgPolicy::Optional => {
                scanner.skip();
                if scanner.at_number() {
                    let at = scanner.location();
                    scanner.read_number().map_err(|e| located(at, e))?
                } else {
                    1
                }
            }
            ArgPolicy::Required => {
                scanner.skip();
                let at = scanner.location();
                if scanner.at_word() {
                    let label = scanner.read_word();
                    self.resolve_label(label, pass).map_err(|e| located(at, e))?
                } else if scanner.at_number() {
                    scanner.read_number().map_err(|e| located(at, e))?
                } else {
                    return Err(located(
                        at,
                        VmError::MissingOperand {
                            mnemonic: op.mnemonic(),
                        },
                    ));
                }
            }
        };

        Ok(Instr { op, arg })
    }

    fn resolve_label(&self, label: &str, pass: Pass) -> Result<i32, VmError> {
        if pass == Pass::GatherLabels {
            return Ok(0);
        }
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| VmError::UnknownLabel {
                label: label.to_string(),
            })
    }
}

/// Assembles CMa source text into an instruction vector.
pub fn assemble(source: &str) -> Result<Vec<Instr>, VmError> {
    Assembler::new(source).assemble()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cma::isa::listing;

    #[test]
    fn assemble_empty_source() {
        assert!(assemble("").unwrap().is_empty());
    }

    #[test]
    fn assemble_comments_and_blank_lines() {
        let source = "
            // this is a comment

            // another comment
        ";
        assert!(assemble(source).unwrap().is_empty());
    }

    #[test]
    fn assemble_single_instruction() {
        let program = assemble("loadc 42").unwrap();
        assert_eq!(
            program,
            vec![Instr {
                op: Opcode::Loadc,
                arg: 42,
            }]
        );
    }

    #[test]
    fn assemble_negative_and_signed_operands() {
        let program = assemble("loadc -7 loadc +9").unwrap();
        assert_eq!(program[0].arg, -7);
        assert_eq!(program[1].arg, 9);
    }

    #[test]
    fn assemble_is_case_insensitive() {
        let program = assemble("LOADC 1 LoadC 2 loadc 3").unwrap();
        assert!(program.iter().all(|i| i.op == Opcode::Loadc));
    }

    #[test]
    fn optional_operand_defaults_to_one() {
        let program = assemble("pop load store halt").unwrap();
        assert_eq!(program[0], Instr { op: Opcode::Pop, arg: 1 });
        assert_eq!(program[1], Instr { op: Opcode::Load, arg: 1 });
        assert_eq!(program[2], Instr { op: Opcode::Store, arg: 1 });
        assert_eq!(program[3], Instr { op: Opcode::Halt, arg: 0 });
    }

    #[test]
    fn optional_operand_consumes_numbers_and_signs() {
        let program = assemble("pop 3 pop -2").unwrap();
        assert_eq!(program[0].arg, 3);
        assert_eq!(program[1].arg, -2);
    }

    #[test]
    fn labels_resolve_backward_and_forward() {
        let program = assemble(
            "start: loadc 1
                    jump end
                    jump start
             end:   halt",
        )
        .unwrap();
        assert_eq!(program[1], Instr { op: Opcode::Jump, arg: 3 });
        assert_eq!(program[2], Instr { op: Opcode::Jump, arg: 0 });
    }

    #[test]
    fn label_names_the_next_instruction() {
        let program = assemble("loadc 0 here: loadc 1 jump here").unwrap();
        assert_eq!(program[2].arg, 1);
    }

    #[test]
    fn label_may_share_a_mnemonic_name() {
        let program = assemble("halt: jump halt").unwrap();
        assert_eq!(program, vec![Instr { op: Opcode::Jump, arg: 0 }]);
    }

    #[test]
    fn unknown_mnemonic_is_an_error() {
        let err = assemble("bogus 1").unwrap_err();
        assert!(matches!(
            err,
            VmError::ParseError { line: 1, .. }
        ));
        assert!(err.to_string().contains("unknown mnemonic: bogus"));
    }

    #[test]
    fn unknown_label_is_an_error() {
        let err = assemble("jump nowhere").unwrap_err();
        assert!(err.to_string().contains("unknown label: nowhere"));
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let err = assemble("l: loadc 1\nl: loadc 2").unwrap_err();
        assert!(matches!(err, VmError::ParseError { line: 2, .. }));
        assert!(err.to_string().contains("duplicate label: l"));
    }

    #[test]
    fn missing_mandatory_operand_is_an_error() {
        let err = assemble("loadc").unwrap_err();
        assert!(err.to_string().contains("missing operand for LOADC"));
    }

    #[test]
    fn stray_colon_is_an_error() {
        let err = assemble(": loadc 1").unwrap_err();
        assert!(err.to_string().contains("unexpected character ':'"));
    }

    #[test]
    fn number_in_mnemonic_position_is_an_error() {
        let err = assemble("42").unwrap_err();
        assert!(err.to_string().contains("unexpected character '4'"));
    }

    #[test]
    fn number_overflow_is_an_error() {
        let err = assemble("loadc 99999999999").unwrap_err();
        assert!(err.to_string().contains("malformed number"));
    }

    #[test]
    fn trailing_comment_without_newline_is_tolerated() {
        let program = assemble("halt // the end").unwrap();
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn assembling_a_listing_reproduces_the_program() {
        let program = assemble(
            "       loadc 10
             loop:  loadc 1
                    sub
                    dup
                    print
                    dup
                    jumpz end
                    jump loop
             end:   halt",
        )
        .unwrap();
        let round_tripped = assemble(&listing(&program)).unwrap();
        assert_eq!(round_tripped, program);
    }
}
