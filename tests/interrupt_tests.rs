//! Interrupt arbiter: masking, autovectors, device vectors, spurious,
//! NMI, STOP interaction.

mod common;

use common::boot;
use m680x0::core::memory::INT_ACK_SPURIOUS;
use m680x0::{CpuType, Register};

#[test]
fn autovector_interrupt_raises_mask_and_stacks_state() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.w32(0x74, 0x2000); // level 5 autovector (29)
    bus.code(0x400, &[0x4E71, 0x4E71]);
    bus.code(0x2000, &[0x4E71]);
    cpu.set_sr(0x2300); // mask 3
    let old_sr = cpu.get_sr();
    cpu.set_irq(5);

    cpu.execute(&mut bus, 60);

    assert_eq!(bus.acked_levels, vec![5]);
    assert!(cpu.is_supervisor());
    assert_eq!(cpu.get_sr() & 0x0700, 0x0500);
    assert!(cpu.get_reg(Register::Pc) >= 0x2000);
    // Old SR and return PC on the supervisor stack beneath the handler.
    let sp = 0x1000 - 6;
    assert_eq!(bus.r16(sp), old_sr);
    assert_eq!(bus.r32(sp + 2), 0x400);
}

#[test]
fn masked_interrupt_stays_pending() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.code(0x400, &[0x4E71]);
    cpu.set_sr(0x2700);
    cpu.set_irq(3);
    cpu.step(&mut bus);
    assert!(bus.acked_levels.is_empty());
    assert_eq!(cpu.get_reg(Register::Pc), 0x402);
}

#[test]
fn level_seven_cuts_through_the_mask_via_nmi() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.w32(0x7C, 0x2000); // level 7 autovector (31)
    bus.code(0x400, &[0x4E71]);
    bus.code(0x2000, &[0x4E71]);
    cpu.set_sr(0x2700);
    cpu.set_nmi();
    cpu.execute(&mut bus, 60);
    assert_eq!(bus.acked_levels, vec![7]);
    assert_eq!(cpu.get_sr() & 0x0700, 0x0700);
}

#[test]
fn device_vector_is_used_when_supplied() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.int_ack_response = 0x40;
    bus.w32(0x40 << 2, 0x2000);
    bus.code(0x400, &[0x4E71]);
    bus.code(0x2000, &[0x4E71]);
    cpu.set_sr(0x2000);
    cpu.set_irq(2);
    cpu.execute(&mut bus, 60);
    assert!(cpu.get_reg(Register::Pc) >= 0x2000);
}

#[test]
fn spurious_interrupt_takes_vector_24() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.int_ack_response = INT_ACK_SPURIOUS;
    bus.w32(24 << 2, 0x2000);
    bus.code(0x400, &[0x4E71]);
    bus.code(0x2000, &[0x4E71]);
    cpu.set_sr(0x2000);
    cpu.set_irq(1);
    cpu.execute(&mut bus, 60);
    assert!(cpu.get_reg(Register::Pc) >= 0x2000);
}

#[test]
fn stop_waits_until_interrupt_wakes_the_core() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    bus.w32(0x74, 0x2000);
    bus.code(0x400, &[0x4E72, 0x2300]); // STOP #$2300
    bus.code(0x2000, &[0x4E71]);

    // First slice executes STOP and idles the remainder away.
    let used = cpu.execute(&mut bus, 100);
    assert_eq!(used, 100);
    assert!(cpu.is_stopped());

    // Still stopped: the budget is consumed without progress.
    assert_eq!(cpu.execute(&mut bus, 50), 50);

    // An unmasked interrupt wakes it into the handler.
    cpu.set_irq(5);
    cpu.execute(&mut bus, 60);
    assert!(!cpu.is_stopped());
    assert_eq!(cpu.get_reg(Register::Pc) & !0xF, 0x2000);
}

#[test]
fn virq_lines_arbitrate_to_the_highest_level() {
    let (mut cpu, _bus) = boot(CpuType::M68000, 0x1000, 0x400);
    cpu.set_virq(2, true);
    cpu.set_virq(6, true);
    assert!(cpu.get_virq(2));
    cpu.set_virq(6, false);
    assert!(!cpu.get_virq(6));
    // Remaining line 2 is now the pending level; check it services.
    let mut bus = common::TestBus::new();
    bus.w32(0x68, 0x2000); // level 2 autovector (26)
    bus.code(0x2000, &[0x4E71]);
    bus.code(0x400, &[0x4E71]);
    cpu.set_reg(Register::Pc, 0x400);
    cpu.set_sr(0x2000);
    cpu.execute(&mut bus, 60);
    assert_eq!(bus.acked_levels, vec![2]);
}

#[test]
fn uninitialized_vector_falls_back_to_vector_15() {
    let (mut cpu, mut bus) = boot(CpuType::M68000, 0x1000, 0x400);
    // Level-1 autovector slot left zero; vector 15 carries the handler.
    bus.w32(15 << 2, 0x2000);
    bus.code(0x400, &[0x4E71]);
    bus.code(0x2000, &[0x4E71]);
    cpu.set_sr(0x2000);
    cpu.set_irq(1);
    cpu.execute(&mut bus, 60);
    assert!(cpu.get_reg(Register::Pc) >= 0x2000);
}

#[test]
fn interrupt_from_master_state_leaves_throwaway_frame_on_isp() {
    let (mut cpu, mut bus) = boot(CpuType::M68020, 0x1000, 0x400);
    bus.w32(0x74, 0x2000);
    bus.code(0x400, &[0x4E71, 0x4E71]);
    bus.code(0x2000, &[0x4E71]);
    // Enter master state with a separate master stack.
    cpu.set_reg(Register::Msp, 0x3000);
    cpu.set_sr(0x3000); // S | M
    assert_eq!(cpu.get_reg(Register::Sp), 0x3000);
    cpu.set_irq(5);

    cpu.execute(&mut bus, 80);

    // Main frame went to the master stack, throwaway to the ISP; the
    // core now runs on the interrupt stack.
    assert_eq!(cpu.get_sr() & 0x1000, 0);
    assert_eq!(cpu.get_reg(Register::Msp), 0x3000 - 8);
    assert_eq!(cpu.get_reg(Register::Sp), 0x1000 - 8);
    // Throwaway frame carries format 1.
    let isp_frame = 0x1000 - 8;
    assert_eq!(bus.r16(isp_frame + 6) >> 12, 1);
}
