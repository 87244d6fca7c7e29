use mcs51_rs::{Catalog, Flow, Mnemonic, OperandKind};

#[test]
fn every_opcode_has_a_descriptor() {
    let catalog = Catalog::new();
    for opcode in 0..=u8::MAX {
        let d = catalog.lookup(opcode);
        assert_eq!(d.opcode, opcode);
        assert!((1..=3).contains(&d.length), "{d}");
    }
    assert_eq!(catalog.iter().count(), 256);
}

#[test]
fn flow_exits_are_jumps_and_returns() {
    let catalog = Catalog::new();
    let mut exits: Vec<u8> = catalog.iter().filter(|d| d.exits_flow()).map(|d| d.opcode).collect();
    exits.sort_unstable();
    assert_eq!(
        exits,
        vec![0x01, 0x02, 0x21, 0x22, 0x32, 0x41, 0x61, 0x73, 0x80, 0x81, 0xA1, 0xC1, 0xE1]
    );
}

#[test]
fn only_dptr_load_is_pointer_load() {
    let catalog = Catalog::new();
    let loads: Vec<u8> = catalog.iter().filter(|d| d.is_pointer_load()).map(|d| d.opcode).collect();
    assert_eq!(loads, vec![0x90]);
    assert_eq!(catalog.lookup(0x90).flow, Flow::POINTER_LOAD);
}

#[test]
fn listing_uses_operand_placeholders() {
    let catalog = Catalog::new();
    assert_eq!(catalog.lookup(0x00).to_string(), "00 (1) nop");
    assert_eq!(catalog.lookup(0x85).to_string(), "85 (3) mov <direct>, <direct>");
    assert_eq!(catalog.lookup(0xB4).to_string(), "B4 (3) cjne A, #<imm>, <rel>");
    assert_eq!(catalog.lookup(0xA0).to_string(), "A0 (2) orl C, /<bit>");
    assert_eq!(catalog.lookup(0x73).to_string(), "73 (1) jmp @A + DPTR");
    assert_eq!(catalog.lookup(0xDA).to_string(), "DA (2) djnz R2, <rel>");
    assert_eq!(catalog.lookup(0xF7).to_string(), "F7 (1) mov @R1, A");
}

#[test]
fn register_rows() {
    let catalog = Catalog::new();
    assert_eq!(catalog.lookup(0x0E).to_string(), "0E (1) inc R6");
    assert_eq!(catalog.lookup(0x27).to_string(), "27 (1) add A, @R1");
    assert_eq!(catalog.lookup(0xD6).to_string(), "D6 (1) xchd A, @R0");
    assert_eq!(catalog.lookup(0xE3).to_string(), "E3 (1) movx A, @R1");
    assert_eq!(catalog.lookup(0x7B).to_string(), "7B (2) mov R3, #<imm>");
    assert_eq!(catalog.lookup(0xBD).to_string(), "BD (3) cjne R5, #<imm>, <rel>");
}

#[test]
fn label_operands() {
    let catalog = Catalog::new();
    assert_eq!(catalog.lookup(0x02).operands, &[OperandKind::LongLabel]);
    assert_eq!(catalog.lookup(0x12).mnemonic, Mnemonic::Lcall);
    assert!(!catalog.lookup(0x12).exits_flow());
    assert_eq!(catalog.lookup(0x10).operands, &[OperandKind::Bit, OperandKind::RelLabel]);
    assert_eq!(catalog.lookup(0xF1).operands, &[OperandKind::PageLabel]);
}
