//! Static checks for MaMa ISA stability.
//!
//! The opcode byte values are baked into every assembled code stream, so
//! any renumbering silently breaks them. These tests pin the numbering,
//! the mnemonic table, and the immediate layout.

use crate::mama::isa::{ImmKind, Opcode};

#[test]
fn opcode_numbering_unchanged() {
    assert_eq!(Opcode::Debug as u8, 0x00);
    assert_eq!(Opcode::Print as u8, 0x01);
    assert_eq!(Opcode::Loadc as u8, 0x02);
    assert_eq!(Opcode::Dup as u8, 0x03);
    assert_eq!(Opcode::Add as u8, 0x04);
    assert_eq!(Opcode::Sub as u8, 0x05);
    assert_eq!(Opcode::Mul as u8, 0x06);
    assert_eq!(Opcode::Div as u8, 0x07);
    assert_eq!(Opcode::Mod as u8, 0x08);
    assert_eq!(Opcode::And as u8, 0x09);
    assert_eq!(Opcode::Or as u8, 0x0A);
    assert_eq!(Opcode::Xor as u8, 0x0B);
    assert_eq!(Opcode::Eq as u8, 0x0C);
    assert_eq!(Opcode::Neq as u8, 0x0D);
    assert_eq!(Opcode::Le as u8, 0x0E);
    assert_eq!(Opcode::Leq as u8, 0x0F);
    assert_eq!(Opcode::Gr as u8, 0x10);
    assert_eq!(Opcode::Geq as u8, 0x11);
    assert_eq!(Opcode::Not as u8, 0x12);
    assert_eq!(Opcode::Neg as u8, 0x13);
    assert_eq!(Opcode::Halt as u8, 0x14);
    assert_eq!(Opcode::Jump as u8, 0x15);
    assert_eq!(Opcode::Jumpz as u8, 0x16);
    assert_eq!(Opcode::Getbasic as u8, 0x17);
    assert_eq!(Opcode::Mkbasic as u8, 0x18);
    assert_eq!(Opcode::Pushloc as u8, 0x19);
    assert_eq!(Opcode::Pushglob as u8, 0x1A);
    assert_eq!(Opcode::Slide as u8, 0x1B);
}

#[test]
fn mnemonics_unchanged() {
    assert_eq!(Opcode::Debug.mnemonic(), "debug");
    assert_eq!(Opcode::Print.mnemonic(), "print");
    assert_eq!(Opcode::Loadc.mnemonic(), "loadc");
    assert_eq!(Opcode::Dup.mnemonic(), "dup");
    assert_eq!(Opcode::Add.mnemonic(), "add");
    assert_eq!(Opcode::Sub.mnemonic(), "sub");
    assert_eq!(Opcode::Mul.mnemonic(), "mul");
    assert_eq!(Opcode::Div.mnemonic(), "div");
    assert_eq!(Opcode::Mod.mnemonic(), "mod");
    assert_eq!(Opcode::And.mnemonic(), "and");
    assert_eq!(Opcode::Or.mnemonic(), "or");
    assert_eq!(Opcode::Xor.mnemonic(), "xor");
    assert_eq!(Opcode::Eq.mnemonic(), "eq");
    assert_eq!(Opcode::Neq.mnemonic(), "neq");
    assert_eq!(Opcode::Le.mnemonic(), "le");
    assert_eq!(Opcode::Leq.mnemonic(), "leq");
    assert_eq!(Opcode::Gr.mnemonic(), "gr");
    assert_eq!(Opcode::Geq.mnemonic(), "geq");
    assert_eq!(Opcode::Not.mnemonic(), "not");
    assert_eq!(Opcode::Neg.mnemonic(), "neg");
    assert_eq!(Opcode::Halt.mnemonic(), "halt");
    assert_eq!(Opcode::Jump.mnemonic(), "jump");
    assert_eq!(Opcode::Jumpz.mnemonic(), "jumpz");
    assert_eq!(Opcode::Getbasic.mnemonic(), "getbasic");
    assert_eq!(Opcode::Mkbasic.mnemonic(), "mkbasic");
    assert_eq!(Opcode::Pushloc.mnemonic(), "pushloc");
    assert_eq!(Opcode::Pushglob.mnemonic(), "pushglob");
    assert_eq!(Opcode::Slide.mnemonic(), "slide");
}

#[test]
fn immediate_layout_unchanged() {
    // Only loadc carries a signed constant.
    assert_eq!(Opcode::Loadc.immediate(), Some(ImmKind::Int));

    // Jumps and stack/global indices carry unsigned offsets.
    assert_eq!(Opcode::Jump.immediate(), Some(ImmKind::Offset));
    assert_eq!(Opcode::Jumpz.immediate(), Some(ImmKind::Offset));
    assert_eq!(Opcode::Pushloc.immediate(), Some(ImmKind::Offset));
    assert_eq!(Opcode::Pushglob.immediate(), Some(ImmKind::Offset));
    assert_eq!(Opcode::Slide.immediate(), Some(ImmKind::Offset));

    // Everything else is a bare opcode byte.
    let with_immediate = 6;
    let bare = Opcode::ALL
        .iter()
        .filter(|op| op.immediate().is_none())
        .count();
    assert_eq!(bare, Opcode::COUNT - with_immediate);
}

#[test]
fn instruction_count_unchanged() {
    const EXPECTED_COUNT: usize = 28;

    // Count by verifying decode succeeds for exactly the assigned bytes.
    let mut count = 0;
    for byte in 0..=0xFF_u8 {
        count += Opcode::try_from(byte).is_ok() as usize;
    }

    assert_eq!(count, EXPECTED_COUNT);
    assert_eq!(Opcode::COUNT, EXPECTED_COUNT);
}
