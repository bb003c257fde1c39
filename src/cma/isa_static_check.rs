//! Static checks for CMa ISA stability.
//!
//! Assembled programs are shared as text, but the opcode numbering, the
//! mnemonic table, and the operand policy are load-bearing for anyone
//! embedding the machine. Any change to them fails here first.

use crate::cma::isa::{ArgPolicy, Opcode};

#[test]
fn opcode_numbering_unchanged() {
    assert_eq!(Opcode::Debug as u8, 0);
    assert_eq!(Opcode::Loadc as u8, 1);
    assert_eq!(Opcode::Add as u8, 2);
    assert_eq!(Opcode::Sub as u8, 3);
    assert_eq!(Opcode::Mul as u8, 4);
    assert_eq!(Opcode::Div as u8, 5);
    assert_eq!(Opcode::Mod as u8, 6);
    assert_eq!(Opcode::And as u8, 7);
    assert_eq!(Opcode::Or as u8, 8);
    assert_eq!(Opcode::Xor as u8, 9);
    assert_eq!(Opcode::Eq as u8, 10);
    assert_eq!(Opcode::Neq as u8, 11);
    assert_eq!(Opcode::Le as u8, 12);
    assert_eq!(Opcode::Leq as u8, 13);
    assert_eq!(Opcode::Gr as u8, 14);
    assert_eq!(Opcode::Geq as u8, 15);
    assert_eq!(Opcode::Not as u8, 16);
    assert_eq!(Opcode::Neg as u8, 17);
    assert_eq!(Opcode::Load as u8, 18);
    assert_eq!(Opcode::Store as u8, 19);
    assert_eq!(Opcode::Loada as u8, 20);
    assert_eq!(Opcode::Storea as u8, 21);
    assert_eq!(Opcode::Pop as u8, 22);
    assert_eq!(Opcode::Jump as u8, 23);
    assert_eq!(Opcode::Jumpz as u8, 24);
    assert_eq!(Opcode::Jumpi as u8, 25);
    assert_eq!(Opcode::Dup as u8, 26);
    assert_eq!(Opcode::Alloc as u8, 27);
    assert_eq!(Opcode::New as u8, 28);
    assert_eq!(Opcode::Mark as u8, 29);
    assert_eq!(Opcode::Call as u8, 30);
    assert_eq!(Opcode::Slide as u8, 31);
    assert_eq!(Opcode::Enter as u8, 32);
    assert_eq!(Opcode::Return as u8, 33);
    assert_eq!(Opcode::Loadrc as u8, 34);
    assert_eq!(Opcode::Loadr as u8, 35);
    assert_eq!(Opcode::Storer as u8, 36);
    assert_eq!(Opcode::Halt as u8, 37);
    assert_eq!(Opcode::Print as u8, 38);
}

#[test]
fn mnemonics_unchanged() {
    assert_eq!(Opcode::Debug.mnemonic(), "DEBUG");
    assert_eq!(Opcode::Loadc.mnemonic(), "LOADC");
    assert_eq!(Opcode::Add.mnemonic(), "ADD");
    assert_eq!(Opcode::Sub.mnemonic(), "SUB");
    assert_eq!(Opcode::Mul.mnemonic(), "MUL");
    assert_eq!(Opcode::Div.mnemonic(), "DIV");
    assert_eq!(Opcode::Mod.mnemonic(), "MOD");
    assert_eq!(Opcode::And.mnemonic(), "AND");
    assert_eq!(Opcode::Or.mnemonic(), "OR");
    assert_eq!(Opcode::Xor.mnemonic(), "XOR");
    assert_eq!(Opcode::Eq.mnemonic(), "EQ");
    assert_eq!(Opcode::Neq.mnemonic(), "NEQ");
    assert_eq!(Opcode::Le.mnemonic(), "LE");
    assert_eq!(Opcode::Leq.mnemonic(), "LEQ");
    assert_eq!(Opcode::Gr.mnemonic(), "GR");
    assert_eq!(Opcode::Geq.mnemonic(), "GEQ");
    assert_eq!(Opcode::Not.mnemonic(), "NOT");
    assert_eq!(Opcode::Neg.mnemonic(), "NEG");
    assert_eq!(Opcode::Load.mnemonic(), "LOAD");
    assert_eq!(Opcode::Store.mnemonic(), "STORE");
    assert_eq!(Opcode::Loada.mnemonic(), "LOADA");
    assert_eq!(Opcode::Storea.mnemonic(), "STOREA");
    assert_eq!(Opcode::Pop.mnemonic(), "POP");
    assert_eq!(Opcode::Jump.mnemonic(), "JUMP");
    assert_eq!(Opcode::Jumpz.mnemonic(), "JUMPZ");
    assert_eq!(Opcode::Jumpi.mnemonic(), "JUMPI");
    assert_eq!(Opcode::Dup.mnemonic(), "DUP");
    assert_eq!(Opcode::Alloc.mnemonic(), "ALLOC");
    assert_eq!(Opcode::New.mnemonic(), "NEW");
    assert_eq!(Opcode::Mark.mnemonic(), "MARK");
    assert_eq!(Opcode::Call.mnemonic(), "CALL");
    assert_eq!(Opcode::Slide.mnemonic(), "SLIDE");
    assert_eq!(Opcode::Enter.mnemonic(), "ENTER");
    assert_eq!(Opcode::Return.mnemonic(), "RETURN");
    assert_eq!(Opcode::Loadrc.mnemonic(), "LOADRC");
    assert_eq!(Opcode::Loadr.mnemonic(), "LOADR");
    assert_eq!(Opcode::Storer.mnemonic(), "STORER");
    assert_eq!(Opcode::Halt.mnemonic(), "HALT");
    assert_eq!(Opcode::Print.mnemonic(), "PRINT");
}

#[test]
fn operand_policies_unchanged() {
    use ArgPolicy::{None, Optional, Required};

    assert_eq!(Opcode::Debug.arg_policy(), None);
    assert_eq!(Opcode::Loadc.arg_policy(), Required);
    assert_eq!(Opcode::Add.arg_policy(), None);
    assert_eq!(Opcode::Not.arg_policy(), None);
    assert_eq!(Opcode::Load.arg_policy(), Optional);
    assert_eq!(Opcode::Store.arg_policy(), Optional);
    assert_eq!(Opcode::Pop.arg_policy(), Optional);
    assert_eq!(Opcode::Loada.arg_policy(), Required);
    assert_eq!(Opcode::Storea.arg_policy(), Required);
    assert_eq!(Opcode::Jump.arg_policy(), Required);
    assert_eq!(Opcode::Jumpz.arg_policy(), Required);
    assert_eq!(Opcode::Jumpi.arg_policy(), Required);
    assert_eq!(Opcode::Dup.arg_policy(), None);
    assert_eq!(Opcode::Alloc.arg_policy(), Required);
    assert_eq!(Opcode::New.arg_policy(), None);
    assert_eq!(Opcode::Mark.arg_policy(), None);
    assert_eq!(Opcode::Call.arg_policy(), None);
    assert_eq!(Opcode::Slide.arg_policy(), Required);
    assert_eq!(Opcode::Enter.arg_policy(), Required);
    assert_eq!(Opcode::Return.arg_policy(), None);
    assert_eq!(Opcode::Loadrc.arg_policy(), Required);
    assert_eq!(Opcode::Loadr.arg_policy(), Required);
    assert_eq!(Opcode::Storer.arg_policy(), Required);
    assert_eq!(Opcode::Halt.arg_policy(), None);
    assert_eq!(Opcode::Print.arg_policy(), None);
}

#[test]
fn no_opcode_consumes_two_operand_tokens() {
    // Every policy admits at most one operand token.
    for op in Opcode::ALL {
        assert!(matches!(
            op.arg_policy(),
            ArgPolicy::None | ArgPolicy::Required | ArgPolicy::Optional
        ));
    }
}

#[test]
fn instruction_count_unchanged() {
    assert_eq!(Opcode::COUNT, 39);
    assert_eq!(Opcode::ALL.len(), 39);
}
