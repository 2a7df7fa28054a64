//! 68020+ features: full extension words, bit fields, long multiply and
//! divide, CAS, LINK.L, TRAPcc, EXTB, variant gating.

mod common;

use common::boot;
use m680x0::{CpuType, Register};

#[test]
fn memory_indirect_preindexed_ea_resolves() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    // MOVE.L ([8,A0,D0.W*4]),D1
    // Full extension: D0.W, scale *4, base disp word 8, pre-indexed,
    // null outer displacement.
    bus.code(0x400, &[0x2230, 0x0521, 0x0008]);
    cpu.set_reg(Register::A0, 0x1000);
    cpu.set_reg(Register::D0, 2);
    // Intermediate = A0 + 8 + D0*4 = 0x1010 holds the pointer.
    bus.w32(0x1010, 0x0000_2000);
    bus.w32(0x2000, 0xDEAD_BEEF);

    cpu.step(&mut bus);

    assert_eq!(cpu.get_reg(Register::D1), 0xDEAD_BEEF);
    assert_eq!(cpu.get_reg(Register::Pc), 0x406);
}

#[test]
fn memory_indirect_postindexed_applies_index_outside() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    // MOVE.L ([8,A0],D0.W*4),D1: indirect first, then the scaled index.
    bus.code(0x400, &[0x2230, 0x0525, 0x0008]);
    cpu.set_reg(Register::A0, 0x1000);
    cpu.set_reg(Register::D0, 2);
    bus.w32(0x1008, 0x0000_2000);
    bus.w32(0x2008, 0xCAFE_F00D);

    cpu.step(&mut bus);

    assert_eq!(cpu.get_reg(Register::D1), 0xCAFE_F00D);
}

#[test]
fn brief_extension_scales_only_on_020() {
    // (d8,An,Dn.W*4) on the 68000 ignores the scale bits.
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.code(0x400, &[0x2230, 0x0400]); // MOVE.L (0,A0,D0.W*4),D1
    cpu.set_reg(Register::A0, 0x1000);
    cpu.set_reg(Register::D0, 4);
    bus.w32(0x1004, 0x1111_2222); // unscaled: A0 + 4
    bus.w32(0x1010, 0x3333_4444); // scaled: A0 + 16
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D1), 0x1111_2222);

    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    bus.code(0x400, &[0x2230, 0x0400]);
    cpu.set_reg(Register::A0, 0x1000);
    cpu.set_reg(Register::D0, 4);
    bus.w32(0x1010, 0x3333_4444);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D1), 0x3333_4444);
}

#[test]
fn bitfield_extract_and_insert() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    // BFEXTU D0{8:8},D1
    bus.code(0x400, &[0xE9C0, 0x1208]);
    cpu.set_reg(Register::D0, 0x00AB_0000);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D1), 0xAB);
    assert!(!cpu.flag_z());
    assert!(cpu.flag_n());

    // BFINS D2,D0{8:8}
    bus.code(0x404, &[0xEFC0, 0x2208]);
    cpu.set_reg(Register::D2, 0x5A);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D0), 0x005A_0000);
}

#[test]
fn bitfield_in_memory_spans_bytes() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    // BFSET (A0){4:8}
    bus.code(0x400, &[0xEED0, 0x0108]);
    cpu.set_reg(Register::A0, 0x2000);
    bus.mem[0x2000] = 0x00;
    bus.mem[0x2001] = 0x00;
    cpu.step(&mut bus);
    assert_eq!(bus.mem[0x2000], 0x0F);
    assert_eq!(bus.mem[0x2001], 0xF0);
}

#[test]
fn bitfield_ffo_reports_absolute_offset() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    // BFFFO D0{8:16},D1
    bus.code(0x400, &[0xEDC0, 0x1210]);
    cpu.set_reg(Register::D0, 0x0000_8000);
    cpu.step(&mut bus);
    // Field covers bits 8..23 of the register picture; first set bit is
    // at field position 8, so the result is 8 + 8.
    assert_eq!(cpu.get_reg(Register::D1), 16);
}

#[test]
fn bitfields_are_illegal_before_the_020() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.w32(4 * 4, 0x2000);
    bus.code(0x400, &[0xE9C0, 0x1208]);
    bus.code(0x2000, &[0x4E71]);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::Pc), 0x2000);
}

#[test]
fn long_multiply_and_divide() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    // MULU.L D1,D0 (32x32 -> 32)
    bus.code(0x400, &[0x4C01, 0x0000]);
    cpu.set_reg(Register::D0, 100_000);
    cpu.set_reg(Register::D1, 3);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D0), 300_000);

    // DIVSL.L D3,D4:D4 style: DIVS.L D3,D4 (quotient in D4)
    bus.code(0x404, &[0x4C43, 0x4804]);
    cpu.set_reg(Register::D3, 7);
    cpu.set_reg(Register::D4, 100);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D4), 14);
}

#[test]
fn cas_swaps_on_match_and_loads_on_mismatch() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    // CAS.W D1,D2,(A0)
    bus.code(0x400, &[0x0CD0, 0x0081]);
    cpu.set_reg(Register::A0, 0x2000);
    bus.w16(0x2000, 0x1234);
    cpu.set_reg(Register::D1, 0x1234); // compare matches
    cpu.set_reg(Register::D2, 0x5678); // update
    cpu.step(&mut bus);
    assert_eq!(bus.r16(0x2000), 0x5678);
    assert!(cpu.flag_z());

    // Mismatch: destination untouched, compare register loaded.
    bus.code(0x404, &[0x0CD0, 0x0081]);
    cpu.set_reg(Register::D1, 0x0000);
    cpu.step(&mut bus);
    assert_eq!(bus.r16(0x2000), 0x5678);
    assert_eq!(cpu.get_reg(Register::D1) & 0xFFFF, 0x5678);
    assert!(!cpu.flag_z());
}

#[test]
fn link_long_builds_frame() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    // LINK.L A6,#-0x100
    bus.code(0x400, &[0x480E, 0xFFFF, 0xFF00]);
    cpu.set_reg(Register::A6, 0xAA55_AA55);
    cpu.step(&mut bus);
    assert_eq!(bus.r32(0xFFC), 0xAA55_AA55);
    assert_eq!(cpu.get_reg(Register::A6), 0xFFC);
    assert_eq!(cpu.get_reg(Register::Sp), 0xFFC - 0x100);
}

#[test]
fn trapcc_traps_only_when_condition_holds() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    bus.w32(7 * 4, 0x2000);
    // TRAPEQ (no operand) twice around a flag change
    bus.code(0x400, &[0x57FC, 0x57FC]);
    bus.code(0x2000, &[0x4E71]);
    cpu.set_ccr(0x00); // Z clear
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::Pc), 0x402);
    cpu.set_ccr(0x04); // Z set
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::Pc), 0x2000);
}

#[test]
fn extb_sign_extends_byte_to_long() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    bus.code(0x400, &[0x49C0]); // EXTB.L D0
    cpu.set_reg(Register::D0, 0x80);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D0), 0xFFFF_FF80);
    assert!(cpu.flag_n());
}

#[test]
fn chk2_traps_outside_bounds() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    bus.w32(6 * 4, 0x2000);
    // CHK2.W (A0),D1: bounds pair at (A0)
    bus.code(0x400, &[0x02D0, 0x1800, 0x02D0, 0x1800]);
    bus.code(0x2000, &[0x4E71]);
    cpu.set_reg(Register::A0, 0x3000);
    bus.w16(0x3000, 0x0010); // lower
    bus.w16(0x3002, 0x0020); // upper
    cpu.set_reg(Register::D1, 0x0018);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::Pc), 0x404);
    assert!(!cpu.flag_c());

    cpu.set_reg(Register::D1, 0x0030);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::Pc), 0x2000);
}

#[test]
fn pack_and_unpk_convert_digit_pairs() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    // PACK D0,D1,#0
    bus.code(0x400, &[0x8340, 0x0000]);
    cpu.set_reg(Register::D0, 0x0402);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D1) & 0xFF, 0x42);

    // UNPK D1,D2,#0
    bus.code(0x404, &[0x8581, 0x0000]);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D2) & 0xFFFF, 0x0402);
}

#[test]
fn move16_copies_an_aligned_block() {
    let (mut cpu, mut bus) = boot(CpuType::M68040, 0x1000, 0x400);
    // MOVE16 (A0)+,(A1)+
    bus.code(0x400, &[0xF620, 0x9000]);
    cpu.set_reg(Register::A0, 0x2000);
    cpu.set_reg(Register::A1, 0x3000);
    for i in 0..16 {
        bus.mem[0x2000 + i] = i as u8;
    }
    cpu.step(&mut bus);
    for i in 0..16 {
        assert_eq!(bus.mem[0x3000 + i], i as u8);
    }
    assert_eq!(cpu.get_reg(Register::A0), 0x2010);
    assert_eq!(cpu.get_reg(Register::A1), 0x3010);
}

#[test]
fn movec_reads_and_writes_control_registers() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    // MOVEC D0,VBR; MOVEC VBR,D1
    bus.code(0x400, &[0x4E7B, 0x0801, 0x4E7A, 0x1801]);
    cpu.set_reg(Register::D0, 0x0001_0000);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::Vbr), 0x0001_0000);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D1), 0x0001_0000);
}

#[test]
fn movec_to_unimplemented_register_is_illegal() {
    let (mut cpu, mut bus) = boot(CpuType::M68010, 0x1000, 0x400);
    bus.w32(4 * 4, 0x2000);
    // CACR does not exist before the 68020.
    bus.code(0x400, &[0x4E7B, 0x0002]);
    bus.code(0x2000, &[0x4E71]);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::Pc), 0x2000);
}
