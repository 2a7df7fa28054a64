//! Memory gateway behaviour: translation windows, instruction cache,
//! TAS write-back gating, misaligned split accesses.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::boot;
use m680x0::{CpuType, Register};

#[test]
fn read_window_short_circuits_the_host_bus() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // The window holds different bytes than the host RAM behind it.
    let window = Rc::new(RefCell::new(vec![0u8; 0x100]));
    window.borrow_mut()[0x10..0x14].copy_from_slice(&0x1234_5678u32.to_be_bytes());
    bus.w32(0x8010, 0xFFFF_FFFF);
    cpu.register_read_range(0x8000, 0x8100, Rc::clone(&window))
        .unwrap();

    // MOVE.L $8010,D0
    bus.code(0x400, &[0x2039, 0x0000, 0x8010]);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D0), 0x1234_5678);
}

#[test]
fn write_window_receives_stores() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    let window = Rc::new(RefCell::new(vec![0u8; 0x100]));
    cpu.register_write_range(0x8000, 0x8100, Rc::clone(&window))
        .unwrap();

    // MOVE.W D0,$8002
    bus.code(0x400, &[0x33C0, 0x0000, 0x8002]);
    cpu.set_reg(Register::D0, 0xBEEF);
    cpu.step(&mut bus);
    assert_eq!(&window.borrow()[2..4], &[0xBE, 0xEF][..]);
    // The host bus saw nothing.
    assert_eq!(bus.r16(0x8002), 0);
}

#[test]
fn window_registration_is_bounded() {
    let (mut cpu, _bus) = boot(CpuType::M68000, 0x1000, 0x400);
    for i in 0..8 {
        let w = Rc::new(RefCell::new(vec![0u8; 0x10]));
        cpu.register_read_range(i * 0x100, i * 0x100 + 0x10, w)
            .unwrap();
    }
    let w = Rc::new(RefCell::new(vec![0u8; 0x10]));
    assert!(cpu.register_read_range(0x9000, 0x9010, w).is_err());

    // Bounds must fit the buffer.
    let small = Rc::new(RefCell::new(vec![0u8; 4]));
    assert!(cpu.register_write_range(0, 0x100, small).is_err());
}

#[test]
fn icache_serves_stale_code_until_invalidated() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    // Enable the I-cache.
    cpu.set_reg(Register::Cacr, 0x0001);
    // MOVEQ #1,D0 at the loop address, executed once to fill the line.
    bus.code(0x400, &[0x7001, 0x4E71]);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D0), 1);

    // Patch memory behind the cache's back and re-run the same address.
    bus.code(0x400, &[0x7002]);
    cpu.set_reg(Register::Pc, 0x400);
    cpu.step(&mut bus);
    // The stale line still delivers MOVEQ #1.
    assert_eq!(cpu.get_reg(Register::D0), 1);

    // CACR.CI clears the cache; the patched opcode is now visible.
    cpu.set_reg(Register::Cacr, 0x0009);
    cpu.set_reg(Register::Pc, 0x400);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D0), 2);
}

#[test]
fn tas_writeback_can_be_vetoed_by_the_host() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.code(0x400, &[0x4AD0, 0x4AD0]); // TAS (A0) twice
    cpu.set_reg(Register::A0, 0x2000);
    bus.mem[0x2000] = 0x00;

    bus.tas_allow = false;
    cpu.step(&mut bus);
    assert_eq!(bus.mem[0x2000], 0x00);
    assert!(cpu.flag_z());

    bus.tas_allow = true;
    cpu.step(&mut bus);
    assert_eq!(bus.mem[0x2000], 0x80);
}

#[test]
fn misaligned_long_read_splits_on_020() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    bus.code(0x400, &[0x2010]); // MOVE.L (A0),D0
    cpu.set_reg(Register::A0, 0x2001);
    bus.mem[0x2001] = 0x11;
    bus.mem[0x2002] = 0x22;
    bus.mem[0x2003] = 0x33;
    bus.mem[0x2004] = 0x44;
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D0), 0x1122_3344);
}

#[test]
fn address_mask_truncates_to_24_bits_on_68000() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // MOVE.B $FF002000 (top byte ignored on a 24-bit bus)
    bus.code(0x400, &[0x1039, 0xFF00, 0x2000]);
    bus.mem[0x2000] = 0x7E;
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D0) & 0xFF, 0x7E);
}

#[test]
fn moves_transfers_through_alternate_function_codes() {
    let (mut cpu, mut bus) = boot(CpuType::M68010, 0x1000, 0x400);
    // MOVEC D0,DFC; MOVES.B D1,(A0)
    bus.code(0x400, &[0x4E7B, 0x0001, 0x0E10, 0x1800]);
    cpu.set_reg(Register::D0, 1); // user data space
    cpu.set_reg(Register::D1, 0xA5);
    cpu.set_reg(Register::A0, 0x2000);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(bus.mem[0x2000], 0xA5);
}

#[test]
fn movep_interleaves_bytes() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // MOVEP.L D0,0(A0)
    bus.code(0x400, &[0x01C8, 0x0000]);
    cpu.set_reg(Register::D0, 0xAABB_CCDD);
    cpu.set_reg(Register::A0, 0x2000);
    cpu.step(&mut bus);
    assert_eq!(bus.mem[0x2000], 0xAA);
    assert_eq!(bus.mem[0x2002], 0xBB);
    assert_eq!(bus.mem[0x2004], 0xCC);
    assert_eq!(bus.mem[0x2006], 0xDD);
}

#[test]
fn shift_family_flag_behaviour() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // ASL.B #1,D0 overflowing the sign bit
    bus.code(0x400, &[0xE300]);
    cpu.set_reg(Register::D0, 0x40);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D0) & 0xFF, 0x80);
    assert!(cpu.flag_v());
    assert!(!cpu.flag_c());

    // ROXR.W #1,D1 pulls the X flag into the top bit.
    bus.code(0x402, &[0xE251]);
    cpu.set_reg(Register::D1, 0x0000);
    let ccr = cpu.get_ccr() | 0x10; // set X
    cpu.set_ccr(ccr);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg(Register::D1) & 0xFFFF, 0x8000);
    assert!(!cpu.flag_x());
    assert!(!cpu.flag_c());
}

#[test]
fn reset_instruction_pulses_devices() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.code(0x400, &[0x4E70]); // RESET
    cpu.step(&mut bus);
    assert_eq!(bus.device_resets, 1);
    assert_eq!(cpu.get_reg(Register::Pc), 0x402);
}
