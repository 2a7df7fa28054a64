//! Interrupt arbiter.
//!
//! Runs between instructions: NMI is serviced unconditionally, other
//! levels only when they exceed the mask. The host acknowledge hook picks
//! the vector (device-supplied, autovector, or spurious).

use super::cpu::{Cpu, STOP_LEVEL_STOP};
use super::exceptions::{INSTRUCTION_NO, vector};
use super::memory::{Bus, INT_ACK_AUTOVECTOR, INT_ACK_SPURIOUS};
use super::types::CpuType;

impl Cpu {
    /// Assert an interrupt priority level (0 clears). Level 7 is also
    /// reachable through [`Cpu::set_nmi`], which latches an edge.
    pub fn set_irq(&mut self, level: u8) {
        self.int_level = ((level & 7) as u32) << 8;
    }

    /// Latch a non-maskable interrupt; serviced at the next instruction
    /// boundary regardless of the mask.
    pub fn set_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Drive one virtual IRQ line. The highest asserted line becomes the
    /// pending IPL.
    pub fn set_virq(&mut self, level: u8, active: bool) {
        let bit = 1u32 << (level & 7);
        if active {
            self.virq_state |= bit;
        } else {
            self.virq_state &= !bit;
        }
        let mut highest = 0u32;
        for l in (1..8).rev() {
            if self.virq_state & (1 << l) != 0 {
                highest = l;
                break;
            }
        }
        self.int_level = highest << 8;
    }

    /// Read back a virtual IRQ line.
    pub fn get_virq(&self, level: u8) -> bool {
        self.virq_state & (1 << (level & 7)) != 0
    }

    /// Inter-instruction interrupt check.
    pub(crate) fn check_interrupts(&mut self, bus: &mut dyn Bus) {
        if self.nmi_pending {
            self.nmi_pending = false;
            self.exception_interrupt(bus, 7);
        } else if self.int_level > self.int_mask {
            let level = (self.int_level >> 8) as u8;
            self.exception_interrupt(bus, level);
        }
    }

    /// Service an interrupt at the given level.
    fn exception_interrupt(&mut self, bus: &mut dyn Bus, level: u8) {
        if self.cpu_type == CpuType::M68000 || self.cpu_type == CpuType::M68008 {
            self.instr_mode = INSTRUCTION_NO;
        }

        // An interrupt wakes STOP but not a double-fault halt.
        self.stopped &= !STOP_LEVEL_STOP;
        if self.stopped != 0 {
            return;
        }

        let vector = match bus.interrupt_acknowledge(level) {
            INT_ACK_AUTOVECTOR => vector::INTERRUPT_AUTOVECTOR + level as u32,
            INT_ACK_SPURIOUS => vector::SPURIOUS_INTERRUPT,
            v => v & 0xFF,
        };

        let sr = self.init_exception();
        self.int_mask = ((level & 7) as u32) << 8;

        // Fetch the handler address; an empty slot falls back to the
        // uninitialized interrupt vector.
        let mut new_pc = self.read_32(bus, (vector << 2).wrapping_add(self.vbr));
        if new_pc == 0 {
            new_pc = self.read_32(
                bus,
                (vector::UNINITIALIZED_INTERRUPT << 2).wrapping_add(self.vbr),
            );
        }

        self.frame_0000(bus, self.pc, sr, vector);
        if self.m_flag != 0 && self.cpu_type.is_020_plus() {
            // Interrupt taken from master state: drop to the interrupt
            // stack and leave a throwaway frame there.
            let s_only = self.s_flag;
            self.set_sm_flag(s_only);
            self.frame_0001(bus, self.pc, sr | 0x2000, vector);
        }

        self.jump(bus, new_pc);
        self.use_cycles(self.cyc_exception[(vector & 0xFF) as usize] as i32);
    }
}
