use mcs51_rs::disasm::{db_line, dw_line, fmt_decoded, NoNames, SymbolNames};
use mcs51_rs::{Catalog, Decoder, Mcs51Decoder};
use pretty_assertions::assert_eq;

struct Sfrs;

impl SymbolNames for Sfrs {
    fn direct(&self, addr: u8) -> Option<&str> {
        match addr {
            0x90 => Some("P1"),
            0xE0 => Some("ACC"),
            _ => None,
        }
    }
    fn bit(&self, addr: u8) -> Option<&str> {
        (addr == 0xD7).then_some("CY")
    }
    fn label(&self, addr: u16) -> Option<&str> {
        (addr == 0x0100).then_some("main")
    }
}

fn line(bytes: &[u8], names: &impl SymbolNames) -> String {
    let catalog = Catalog::new();
    let dec = Mcs51Decoder::new(&catalog, 0);
    fmt_decoded(&dec.decode(bytes, 0).unwrap(), names)
}

#[test]
fn immediate_with_hint() {
    assert_eq!(line(&[0x74, 0x41], &NoNames), "\tmov A, #41h\t;  65 'A'");
    assert_eq!(line(&[0x24, 0xFF], &NoNames), "\tadd A, #0FFh\t; 255   -1 'ÿ'");
}

#[test]
fn self_jump_marker() {
    assert_eq!(line(&[0x80, 0xFE], &NoNames), "\tsjmp $");
}

#[test]
fn bits_without_names_are_split() {
    assert_eq!(line(&[0xD2, 0x90], &NoNames), "\tsetb 90h.0");
    assert_eq!(line(&[0xC2, 0x10], &NoNames), "\tclr 22h.0");
    assert_eq!(line(&[0xD2, 0x91], &Sfrs), "\tsetb P1.1");
    assert_eq!(line(&[0xB2, 0xD7], &Sfrs), "\tcpl CY");
}

#[test]
fn mov_direct_direct_swaps() {
    assert_eq!(line(&[0x85, 0x30, 0x40], &NoNames), "\tmov 40h, 30h");
    assert_eq!(line(&[0x85, 0xE0, 0x90], &Sfrs), "\tmov P1, ACC");
}

#[test]
fn labels_use_names() {
    assert_eq!(line(&[0x12, 0x01, 0x00], &Sfrs), "\tlcall main");
    assert_eq!(line(&[0x12, 0x01, 0x02], &Sfrs), "\tlcall 0102h");
    assert_eq!(line(&[0x90, 0x01, 0x00], &Sfrs), "\tmov DPTR, #main");
    assert_eq!(line(&[0x43, 0x90, 0x0F], &Sfrs), "\torl P1, #0Fh\t;  15");
}

#[test]
fn data_lines() {
    assert_eq!(db_line(0x41, 0x1234), "\tdb 41h\t; [1234h]  65 'A'");
    assert_eq!(dw_line(0xABCD, 0x10), "\tdw 0ABCDh\t; [0010h]");
}
