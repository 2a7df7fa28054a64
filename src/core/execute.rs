//! The execution loop and reset entry points.

use super::cpu::{Cpu, STOP_LEVEL_STOP};
use super::memory::Bus;

impl Cpu {
    /// Reset the CPU: supervisor mode, interrupts masked, trace off,
    /// caches invalidated, SSP and PC loaded from vectors 0 and 1.
    /// Recovers from both STOP and a double-fault HALT.
    pub fn pulse_reset(&mut self, bus: &mut dyn Bus) {
        self.stopped = 0;
        self.clear_fault();
        self.t1_flag = 0;
        self.t0_flag = 0;
        self.tracing = 0;
        self.tracing_t0 = 0;
        self.m_flag = 0;
        self.set_s_flag(super::cpu::SFLAG_SET);
        self.int_mask = 0x0700;
        self.int_level = 0;
        self.nmi_pending = false;
        self.vbr = 0;
        self.cacr = 0;
        self.caar = 0;
        self.ic_clear();
        self.pref_addr = !0;

        let ssp = self.read_32(bus, 0);
        self.dar[15] = ssp;
        self.sp[4] = ssp; // ISP bank
        self.sp[6] = ssp; // MSP bank, harmless before 68020
        let entry = self.read_32(bus, 4);
        self.jump(bus, entry);

        self.use_cycles(self.cyc_exception[0] as i32);
    }

    /// Run for a cycle budget; returns the cycles actually consumed
    /// (which may overshoot by the tail of the last instruction).
    ///
    /// Returns 0 immediately while the CPU is halted on a double fault;
    /// a STOP state consumes the whole budget idling.
    pub fn execute(&mut self, bus: &mut dyn Bus, num_cycles: i32) -> i32 {
        if self.is_halted() {
            return 0;
        }
        self.cycles_remaining = num_cycles;
        self.initial_cycles = num_cycles;

        // A pending interrupt may wake a STOP before any fetch.
        self.check_interrupts(bus);
        if self.stopped != 0 {
            self.use_all_cycles();
            return if self.is_halted() { 0 } else { num_cycles };
        }

        while self.cycles_remaining > 0 {
            self.ppc = self.pc;
            self.tracing = self.t1_flag;
            self.tracing_t0 = self.t0_flag;
            self.change_of_flow = false;
            self.in_instruction = false;
            bus.instruction_hook(self.pc);

            let opcode = self.read_imm_16(bus);
            if self.faulted() {
                // Fetch faulted; the exception is already stacked and
                // charged.
                self.clear_fault();
                if self.stopped != 0 {
                    break;
                }
                continue;
            }

            self.ir = opcode as u32;
            self.in_instruction = true;
            let handler = self.table[opcode as usize];
            handler(self, bus);
            self.use_cycles(self.cyc_instruction[opcode as usize] as i32);

            if self.faulted() {
                self.clear_fault();
                if self.stopped != 0 {
                    break;
                }
                continue;
            }

            // Trace armed at instruction start fires after it completes;
            // T0 only on a change of flow.
            if self.tracing != 0 || (self.tracing_t0 != 0 && self.change_of_flow) {
                self.exception_trace(bus);
            }

            if self.nmi_pending || self.int_level > self.int_mask {
                self.check_interrupts(bus);
            }

            if self.stopped != 0 {
                break;
            }
        }

        if self.stopped & STOP_LEVEL_STOP != 0 {
            self.use_all_cycles();
        }

        self.initial_cycles - self.cycles_remaining
    }

    /// Run a single instruction (a one-cycle budget always executes
    /// exactly one); returns the cycles it consumed.
    pub fn step(&mut self, bus: &mut dyn Bus) -> i32 {
        self.execute(bus, 1)
    }

    /// Enter the STOP state and absorb the rest of the timeslice.
    pub(crate) fn stop(&mut self) {
        self.stopped |= STOP_LEVEL_STOP;
        self.use_all_cycles();
    }
}
