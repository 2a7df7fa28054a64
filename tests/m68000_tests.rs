//! 68000 behaviour: reset, flag arithmetic, round-trip laws, boundary
//! cases.

mod common;

use common::boot;
use m680x0::{Cpu, CpuType, Register};

#[test]
fn reset_loads_ssp_and_pc_from_vectors() {
    let (cpu, _bus) = boot(CpuType::M68000, 0x1000, 0x400);
    assert_eq!(cpu.get_reg(Register::Sp), 0x1000);
    assert_eq!(cpu.get_reg(Register::Pc), 0x400);
    assert_eq!(cpu.get_sr(), 0x2700);
}

#[test]
fn addi_long_sets_carry_zero_extend() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // ADDI.L #1,D0
    bus.code(0x400, &[0x0680, 0x0000, 0x0001]);
    cpu.set_reg(Register::D0, 0xFFFF_FFFF);

    let used = cpu.step(&mut bus);

    assert_eq!(cpu.get_reg(Register::D0), 0);
    assert!(cpu.flag_z());
    assert!(cpu.flag_c());
    assert!(cpu.flag_x());
    assert!(!cpu.flag_n());
    assert!(!cpu.flag_v());
    assert_eq!(used, cpu.instruction_cycles(0x0680) as i32);
}

#[test]
fn move_long_register_to_itself_only_touches_flags() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // MOVE.L D3,D3
    bus.code(0x400, &[0x2603]);
    cpu.set_reg(Register::D3, 0x8000_0001);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D3), 0x8000_0001);
    assert!(cpu.flag_n());
    assert!(!cpu.flag_z());
    assert_eq!(cpu.get_reg(Register::Pc), 0x402);
}

#[test]
fn swap_twice_restores_register() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // SWAP D2; SWAP D2
    bus.code(0x400, &[0x4842, 0x4842]);
    cpu.set_reg(Register::D2, 0x1234_ABCD);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D2), 0xABCD_1234);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D2), 0x1234_ABCD);
}

#[test]
fn neg_twice_restores_value() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // NEG.L D1; NEG.L D1
    bus.code(0x400, &[0x4481, 0x4481]);
    cpu.set_reg(Register::D1, 0x0000_1234);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D1), 0xFFFF_EDCC);
    assert!(cpu.flag_c());
    assert!(cpu.flag_x());
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D1), 0x0000_1234);
    assert!(cpu.flag_c());
}

#[test]
fn sub_flags_match_canonical_formulas() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // SUB.B D1,D0 with 0x00 - 0x01: borrow, negative
    bus.code(0x400, &[0x9001]);
    cpu.set_reg(Register::D0, 0x00);
    cpu.set_reg(Register::D1, 0x01);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D0) & 0xFF, 0xFF);
    assert!(cpu.flag_c());
    assert!(cpu.flag_n());
    assert!(!cpu.flag_z());
    assert!(!cpu.flag_v());
}

#[test]
fn add_overflow_when_sign_agrees_and_result_flips() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // ADD.W D1,D0: 0x7FFF + 1 overflows
    bus.code(0x400, &[0xD041]);
    cpu.set_reg(Register::D0, 0x7FFF);
    cpu.set_reg(Register::D1, 0x0001);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D0) & 0xFFFF, 0x8000);
    assert!(cpu.flag_v());
    assert!(cpu.flag_n());
    assert!(!cpu.flag_c());
}

#[test]
fn sr_writes_mask_unimplemented_bits() {
    let (mut cpu, _bus) = boot(CpuType::M68000, 0x1000, 0x400);
    cpu.set_sr(0xFFFF);
    // The 68000 implements T1, S, the mask and the five condition codes.
    assert_eq!(cpu.get_sr(), 0xFFFF & 0xA71F);
}

#[test]
fn sp_banking_swaps_on_supervisor_transition() {
    let (mut cpu, _bus) = boot(CpuType::M68000, 0x1000, 0x400);
    assert!(cpu.is_supervisor());
    cpu.set_reg(Register::Usp, 0x8000);
    cpu.set_reg(Register::Sp, 0x1000);

    // Drop to user mode: live SP becomes the USP value, SSP is banked.
    let sr = cpu.get_sr() & !0x2000;
    cpu.set_sr(sr);
    assert_eq!(cpu.get_reg(Register::Sp), 0x8000);
    assert_eq!(cpu.get_reg(Register::Isp), 0x1000);

    // And back again.
    cpu.set_sr(sr | 0x2000);
    assert_eq!(cpu.get_reg(Register::Sp), 0x1000);
    assert_eq!(cpu.get_reg(Register::Usp), 0x8000);
}

#[test]
fn register_roundtrip_through_host_surface() {
    let (mut cpu, _bus) = boot(CpuType::M68000, 0x1000, 0x400);
    for (reg, value) in [
        (Register::D0, 0xDEAD_BEEF),
        (Register::D7, 1),
        (Register::A0, 0x00FF_0000),
        (Register::A6, 0x1234),
        (Register::Pc, 0x00B0_0000 & 0x00FF_FFFF),
    ] {
        cpu.set_reg(reg, value);
        assert_eq!(cpu.get_reg(reg), value, "{reg:?}");
    }
}

#[test]
fn divide_by_zero_vectors_and_preserves_destination() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.w32(5 * 4, 0x2000); // zero divide vector
    // DIVU.W D1,D0 with D1 = 0
    bus.code(0x400, &[0x80C1]);
    bus.code(0x2000, &[0x4E71]);
    cpu.set_reg(Register::D0, 0x1234_5678);
    cpu.set_reg(Register::D1, 0);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::Pc), 0x2000);
    assert_eq!(cpu.get_reg(Register::D0), 0x1234_5678);
}

#[test]
fn chk_traps_only_out_of_bounds() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.w32(6 * 4, 0x2000);
    // CHK.W D1,D0 twice: in bounds, then above bound
    bus.code(0x400, &[0x4181, 0x4181]);
    bus.code(0x2000, &[0x4E71]);
    cpu.set_reg(Register::D0, 0x10);
    cpu.set_reg(Register::D1, 0x7F);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::Pc), 0x402);

    cpu.set_reg(Register::D0, 0x80);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::Pc), 0x2000);
}

#[test]
fn abcd_adds_decimal_digits_with_carry() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // ABCD D1,D0: 0x45 + 0x55 = 0x00 carry 1
    bus.code(0x400, &[0xC101]);
    cpu.set_reg(Register::D0, 0x45);
    cpu.set_reg(Register::D1, 0x55);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D0) & 0xFF, 0x00);
    assert!(cpu.flag_c());
    assert!(cpu.flag_x());
}

#[test]
fn bcd_with_illegal_nibbles_produces_architectural_result() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // ABCD D1,D0 with non-decimal digits runs the same adjust steps.
    bus.code(0x400, &[0xC101]);
    cpu.set_reg(Register::D0, 0x0F);
    cpu.set_reg(Register::D1, 0x0F);
    cpu.step(&mut bus);
    // 0xF + 0xF = 0x1E, low-nibble adjust +6 -> 0x24.
    assert_eq!(cpu.get_reg(Register::D0) & 0xFF, 0x24);
    assert_eq!(cpu.get_reg(Register::Pc), 0x402);
}

#[test]
fn dbcc_counts_words_and_falls_through() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // MOVEQ #3,D0; loop: DBF D0,loop
    bus.code(0x400, &[0x7003, 0x51C8, 0xFFFE]);
    cpu.execute(&mut bus, 200);
    assert_eq!(cpu.get_reg(Register::D0) & 0xFFFF, 0xFFFF);
    assert_eq!(cpu.get_reg(Register::Pc), 0x406);
}

#[test]
fn movem_predec_and_postinc_roundtrip() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // MOVEM.L D0-D1/A0,-(A7); MOVEM.L (A7)+,D2-D3/A1
    bus.code(0x400, &[0x48E7, 0xC080, 0x4CDF, 0x020C]);
    cpu.set_reg(Register::D0, 0x1111_1111);
    cpu.set_reg(Register::D1, 0x2222_2222);
    cpu.set_reg(Register::A0, 0x3333_3333);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::Sp), 0x1000 - 12);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::Sp), 0x1000);
    assert_eq!(cpu.get_reg(Register::D2), 0x1111_1111);
    assert_eq!(cpu.get_reg(Register::D3), 0x2222_2222);
    assert_eq!(cpu.get_reg(Register::A1), 0x3333_3333);
}

#[test]
fn context_roundtrip_preserves_architectural_state() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.code(0x400, &[0x7042]); // MOVEQ #0x42,D0
    cpu.step(&mut bus);
    let ctx = cpu.get_context();

    let mut other = Cpu::new(CpuType::M68010);
    other.set_context(&ctx);
    assert_eq!(other.cpu_type, CpuType::M68000);
    assert_eq!(other.get_reg(Register::D0), 0x42);
    assert_eq!(other.get_reg(Register::Pc), 0x402);
    assert_eq!(other.get_sr(), cpu.get_sr());
}
