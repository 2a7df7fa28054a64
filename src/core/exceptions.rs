//! Exception engine: stack frames, vectors, fault unwind.
//!
//! Frame writes go straight to the bus, bypassing the operand gateway, so
//! a misaligned supervisor stack cannot recurse into further address
//! errors; a bus fault during a frame write is a double fault and halts
//! the CPU until reset.

use super::cpu::{
    Cpu, RUN_MODE_FRAME_DONE, RUN_MODE_NORMAL, RUN_MODE_WRITING_FRAME, SFLAG_SET,
    STOP_LEVEL_HALT, STOP_LEVEL_STOP,
};
use super::memory::Bus;
use super::types::CpuType;

/// Exception vector numbers.
pub mod vector {
    pub const RESET_SSP: u32 = 0;
    pub const RESET_PC: u32 = 1;
    pub const BUS_ERROR: u32 = 2;
    pub const ADDRESS_ERROR: u32 = 3;
    pub const ILLEGAL_INSTRUCTION: u32 = 4;
    pub const ZERO_DIVIDE: u32 = 5;
    pub const CHK: u32 = 6;
    pub const TRAPV: u32 = 7;
    pub const PRIVILEGE_VIOLATION: u32 = 8;
    pub const TRACE: u32 = 9;
    pub const LINE_1010: u32 = 10;
    pub const LINE_1111: u32 = 11;
    pub const FORMAT_ERROR: u32 = 14;
    pub const UNINITIALIZED_INTERRUPT: u32 = 15;
    pub const SPURIOUS_INTERRUPT: u32 = 24;
    pub const INTERRUPT_AUTOVECTOR: u32 = 24;
    pub const TRAP_BASE: u32 = 32;
}

/// I/N values for the 68000 special status word.
pub(crate) const INSTRUCTION_YES: u32 = 0;
pub(crate) const INSTRUCTION_NO: u32 = 8;

impl Cpu {
    // ========== Raw frame pushes ==========

    fn frame_push_16(&mut self, bus: &mut dyn Bus, value: u16) {
        self.dar[15] = self.dar[15].wrapping_sub(2);
        let addr = self.mask_address(self.dar[15]);
        if bus.try_write_16(addr, value).is_err() {
            self.stopped |= STOP_LEVEL_HALT;
        }
    }

    fn frame_push_32(&mut self, bus: &mut dyn Bus, value: u32) {
        self.dar[15] = self.dar[15].wrapping_sub(4);
        let addr = self.mask_address(self.dar[15]);
        if bus.try_write_32(addr, value).is_err() {
            self.stopped |= STOP_LEVEL_HALT;
        }
    }

    /// Reserve frame space without a bus cycle (words real silicon leaves
    /// unwritten).
    #[inline]
    fn frame_skip_16(&mut self) {
        self.dar[15] = self.dar[15].wrapping_sub(2);
    }

    #[inline]
    fn frame_skip_32(&mut self) {
        self.dar[15] = self.dar[15].wrapping_sub(4);
    }

    // ========== Common prologue ==========

    /// Snapshot SR, clear trace state, enter supervisor mode.
    pub(crate) fn init_exception(&mut self) -> u16 {
        let sr = self.get_sr();
        self.t1_flag = 0;
        self.t0_flag = 0;
        self.tracing = 0;
        self.tracing_t0 = 0;
        self.set_s_flag(SFLAG_SET);
        sr
    }

    /// Exception cost, less the aborted instruction's base charge when
    /// the fault hit mid-instruction (the loop still applies that base).
    #[inline]
    fn charge_exception(&mut self, vector: u32) {
        let mut cost = self.cyc_exception[(vector & 0xFF) as usize] as i32;
        if self.in_instruction {
            cost -= self.cyc_instruction[(self.ir & 0xFFFF) as usize] as i32;
        }
        self.use_cycles(cost);
    }

    // ========== Frame formats ==========

    /// 68000 3-word frame: PC, SR.
    fn frame_3word(&mut self, bus: &mut dyn Bus, pc: u32, sr: u16) {
        self.frame_push_32(bus, pc);
        self.frame_push_16(bus, sr);
    }

    /// Format 0: vector word, PC, SR (the 68010+ standard frame).
    pub(crate) fn frame_0000(&mut self, bus: &mut dyn Bus, pc: u32, sr: u16, vector: u32) {
        if matches!(
            self.cpu_type,
            CpuType::M68000 | CpuType::M68008 | CpuType::Scc68070
        ) {
            self.frame_3word(bus, pc, sr);
            return;
        }
        self.frame_push_16(bus, (vector << 2) as u16);
        self.frame_push_32(bus, pc);
        self.frame_push_16(bus, sr);
    }

    /// Format 1: the 68020 throwaway frame stacked on the ISP after an
    /// interrupt taken from master state.
    pub(crate) fn frame_0001(&mut self, bus: &mut dyn Bus, pc: u32, sr: u16, vector: u32) {
        self.frame_push_16(bus, 0x1000 | ((vector << 2) & 0x0FFF) as u16);
        self.frame_push_32(bus, pc);
        self.frame_push_16(bus, sr);
    }

    /// Format 2: PPC, vector word, PC, SR (68020+ group 2 exceptions).
    fn frame_0010(&mut self, bus: &mut dyn Bus, sr: u16, vector: u32) {
        self.frame_push_32(bus, self.ppc);
        self.frame_push_16(bus, 0x2000 | ((vector << 2) & 0x0FFF) as u16);
        self.frame_push_32(bus, self.pc);
        self.frame_push_16(bus, sr);
    }

    /// 68000 bus/address error frame: PC, SR, IR, access address, special
    /// status word (R/W, I/N, FC).
    ///
    /// For flow-control opcodes the prefetch pipeline has already moved
    /// the PC away from the fault, so the stacked PC is PPC+2; the JSR
    /// family additionally pulls back the speculatively pushed return
    /// address.
    fn frame_buserr(&mut self, bus: &mut dyn Bus, sr: u16) {
        let opcode = (self.ir & 0xFFFF) as u16;
        let stacked_pc = match opcode {
            // RTS, JMP abs.l, RTE, TST.B -(A7)
            0x4E75 | 0x4EF9 | 0x4E73 | 0x4A2F => self.ppc.wrapping_add(2),
            // JMP (An)-family
            0x4ED0..=0x4EDF => self.ppc.wrapping_add(2),
            // JSR abs.l / (An) / d16(An): the return address was already
            // pushed when the fault hit; pull it back.
            0x4EB9 | 0x4E90 | 0x4EA8 => {
                if sr & 0x2000 != 0 {
                    self.dar[15] = self.dar[15].wrapping_add(4);
                } else {
                    self.sp[0] = self.sp[0].wrapping_add(4);
                }
                self.ppc.wrapping_add(2)
            }
            _ => self.pc,
        } & self.address_mask;

        self.frame_push_32(bus, stacked_pc);
        self.frame_push_16(bus, sr);
        self.frame_push_16(bus, opcode);
        self.frame_push_32(bus, self.aerr_address);
        self.frame_push_16(
            bus,
            (self.aerr_write_mode | self.instr_mode | self.aerr_fc) as u16,
        );
    }

    /// Format 8: the 68010 29-word bus/address error frame. The internal
    /// words are undefined on silicon and stay unwritten here; only the
    /// documented fields are stored.
    fn frame_1000(&mut self, bus: &mut dyn Bus, pc: u32, sr: u16, vector: u32) {
        for _ in 0..8 {
            self.frame_skip_32();
        }
        self.frame_push_16(bus, 0); // instruction input buffer
        self.frame_skip_16();
        self.frame_push_16(bus, 0); // data input buffer
        self.frame_skip_16();
        self.frame_push_16(bus, 0); // data output buffer
        self.frame_skip_16();
        self.frame_push_32(bus, self.aerr_address); // fault address
        self.frame_push_16(bus, 0); // special status word
        self.frame_push_16(bus, 0x8000 | ((vector << 2) & 0x0FFF) as u16);
        self.frame_push_32(bus, pc);
        self.frame_push_16(bus, sr);
    }

    /// Format A: 68020/68030 short bus fault frame (fault at an
    /// instruction boundary).
    fn frame_1010(&mut self, bus: &mut dyn Bus, sr: u16, vector: u32, pc: u32, fault: u32) {
        let ssw = 0x0100
            | (self.aerr_fc & 7) as u16
            | if self.aerr_write_mode != 0 { 0x40 } else { 0 };
        self.frame_push_32(bus, 0); // internal registers
        self.frame_push_32(bus, 0); // data output buffer
        self.frame_push_32(bus, 0); // internal registers
        self.frame_push_32(bus, fault); // data cycle fault address
        self.frame_push_32(bus, 0); // instruction pipe B/C
        self.frame_push_16(bus, ssw as u16);
        self.frame_push_16(bus, 0); // internal register
        self.frame_push_16(bus, 0xA000 | ((vector << 2) & 0x0FFF) as u16);
        self.frame_push_32(bus, pc);
        self.frame_push_16(bus, sr);
    }

    /// Format B: 68020/68030 long bus fault frame (fault mid-instruction).
    fn frame_1011(&mut self, bus: &mut dyn Bus, sr: u16, vector: u32, pc: u32, fault: u32) {
        let ssw = 0x0100
            | (self.aerr_fc & 7) as u16
            | if self.aerr_write_mode != 0 { 0x40 } else { 0 };
        for _ in 0..9 {
            self.frame_push_32(bus, 0); // internal registers
        }
        self.frame_push_16(bus, 0); // version / internal information
        self.frame_push_32(bus, 0);
        self.frame_push_16(bus, 0);
        self.frame_push_32(bus, 0); // data input buffer
        self.frame_push_32(bus, 0);
        self.frame_push_32(bus, 0); // stage B address
        self.frame_push_32(bus, 0);
        self.frame_push_32(bus, 0);
        self.frame_push_32(bus, 0); // data output buffer
        self.frame_push_32(bus, 0);
        self.frame_push_32(bus, fault); // data cycle fault address
        self.frame_push_32(bus, 0); // instruction pipe B/C
        self.frame_push_16(bus, ssw as u16);
        self.frame_push_16(bus, 0);
        self.frame_push_16(bus, 0xB000 | ((vector << 2) & 0x0FFF) as u16);
        self.frame_push_32(bus, pc);
        self.frame_push_16(bus, sr);
    }

    /// Format 7: the 68040 access fault frame (30 words).
    fn frame_0111(&mut self, bus: &mut dyn Bus, sr: u16, vector: u32, pc: u32, fault: u32) {
        let ssw = (self.aerr_fc & 7) as u16
            | if self.aerr_write_mode != 0 { 0x100 } else { 0 };
        for _ in 0..9 {
            self.frame_push_32(bus, 0); // internal registers
        }
        self.frame_push_32(bus, fault); // fault address
        self.frame_push_32(bus, 0); // internal registers
        self.frame_push_16(bus, 0);
        self.frame_push_16(bus, ssw); // special status register
        self.frame_push_32(bus, fault); // effective address
        self.frame_push_16(bus, 0x7000 | ((vector << 2) & 0x0FFF) as u16);
        self.frame_push_32(bus, pc);
        self.frame_push_16(bus, sr);
    }

    // ========== Group 1/2 exceptions ==========

    /// Group 2 exception (CHK, TRAPV, zero divide): format 2 on 020+.
    pub(crate) fn exception_group2(&mut self, bus: &mut dyn Bus, vector: u32) {
        let sr = self.init_exception();
        if self.cpu_type.is_010_or_less() {
            self.frame_0000(bus, self.pc, sr, vector);
        } else {
            self.frame_0010(bus, sr, vector);
        }
        self.jump_vector(bus, vector);
        self.charge_exception(vector);
    }

    /// TRAP #n: format 0 frame on every variant, stacking the next PC.
    pub(crate) fn exception_trap_n(&mut self, bus: &mut dyn Bus, vector: u32) {
        let sr = self.init_exception();
        self.frame_0000(bus, self.pc, sr, vector);
        self.jump_vector(bus, vector);
        self.charge_exception(vector);
    }

    pub(crate) fn exception_zero_divide(&mut self, bus: &mut dyn Bus) {
        self.exception_group2(bus, vector::ZERO_DIVIDE);
    }

    pub(crate) fn exception_chk(&mut self, bus: &mut dyn Bus) {
        self.exception_group2(bus, vector::CHK);
    }

    pub(crate) fn exception_trapv(&mut self, bus: &mut dyn Bus) {
        self.exception_group2(bus, vector::TRAPV);
    }

    /// Privilege violation: stacks the PC of the offending instruction.
    pub(crate) fn exception_privilege(&mut self, bus: &mut dyn Bus) {
        let sr = self.init_exception();
        if self.cpu_type == CpuType::M68000 || self.cpu_type == CpuType::M68008 {
            self.instr_mode = INSTRUCTION_NO;
        }
        self.frame_0000(bus, self.ppc, sr, vector::PRIVILEGE_VIOLATION);
        self.jump_vector(bus, vector::PRIVILEGE_VIOLATION);
        self.charge_exception(vector::PRIVILEGE_VIOLATION);
    }

    /// Illegal instruction. Consults the host intercept first; a claimed
    /// opcode raises nothing.
    pub(crate) fn exception_illegal(&mut self, bus: &mut dyn Bus) {
        if bus.illegal_instruction((self.ir & 0xFFFF) as u16) {
            return;
        }
        let sr = self.init_exception();
        if self.cpu_type == CpuType::M68000 || self.cpu_type == CpuType::M68008 {
            self.instr_mode = INSTRUCTION_NO;
        }
        self.frame_0000(bus, self.ppc, sr, vector::ILLEGAL_INSTRUCTION);
        self.jump_vector(bus, vector::ILLEGAL_INSTRUCTION);
        self.charge_exception(vector::ILLEGAL_INSTRUCTION);
    }

    /// A-line (1010) unimplemented instruction.
    pub(crate) fn exception_1010(&mut self, bus: &mut dyn Bus) {
        let sr = self.init_exception();
        self.frame_0000(bus, self.ppc, sr, vector::LINE_1010);
        self.jump_vector(bus, vector::LINE_1010);
        self.charge_exception(vector::LINE_1010);
    }

    /// F-line (1111) unimplemented instruction.
    pub(crate) fn exception_1111(&mut self, bus: &mut dyn Bus) {
        let sr = self.init_exception();
        self.frame_0000(bus, self.ppc, sr, vector::LINE_1111);
        self.jump_vector(bus, vector::LINE_1111);
        self.charge_exception(vector::LINE_1111);
    }

    /// RTE format word mismatch.
    pub(crate) fn exception_format_error(&mut self, bus: &mut dyn Bus) {
        let sr = self.init_exception();
        self.frame_0000(bus, self.pc, sr, vector::FORMAT_ERROR);
        self.jump_vector(bus, vector::FORMAT_ERROR);
        self.charge_exception(vector::FORMAT_ERROR);
    }

    /// Trace exception, taken after an instruction when tracing was armed
    /// at its start. Wakes a pending STOP so the trace can be serviced.
    pub(crate) fn exception_trace(&mut self, bus: &mut dyn Bus) {
        let sr = self.init_exception();
        if self.cpu_type == CpuType::M68000 || self.cpu_type == CpuType::M68008 {
            self.instr_mode = INSTRUCTION_NO;
        }
        self.stopped &= !STOP_LEVEL_STOP;
        if self.cpu_type.is_010_or_less() {
            self.frame_0000(bus, self.pc, sr, vector::TRACE);
        } else {
            self.frame_0010(bus, sr, vector::TRACE);
        }
        self.jump_vector(bus, vector::TRACE);
        self.use_cycles(self.cyc_exception[vector::TRACE as usize] as i32);
    }

    // ========== Bus and address errors ==========

    /// Record fault details and unwind with an address error. Becomes a
    /// double fault (HALT) if a frame write is already in progress.
    pub(crate) fn raise_address_error(
        &mut self,
        bus: &mut dyn Bus,
        address: u32,
        write: bool,
        fc: u32,
    ) {
        match self.run_mode {
            RUN_MODE_WRITING_FRAME => {
                self.stopped |= STOP_LEVEL_HALT;
                return;
            }
            RUN_MODE_FRAME_DONE => return,
            _ => {}
        }
        self.aerr_address = address;
        self.aerr_write_mode = if write { 0 } else { 0x10 };
        self.aerr_fc = fc & 7;
        self.run_mode = RUN_MODE_WRITING_FRAME;

        let sr = self.init_exception();
        self.build_fault_frame(bus, sr, vector::ADDRESS_ERROR);
        self.jump_vector(bus, vector::ADDRESS_ERROR);
        self.run_mode = RUN_MODE_FRAME_DONE;
        self.charge_exception(vector::ADDRESS_ERROR);
    }

    /// Record fault details and unwind with a bus error.
    pub(crate) fn raise_bus_error(
        &mut self,
        bus: &mut dyn Bus,
        address: u32,
        write: bool,
        instruction: bool,
    ) {
        match self.run_mode {
            RUN_MODE_WRITING_FRAME => {
                self.stopped |= STOP_LEVEL_HALT;
                return;
            }
            RUN_MODE_FRAME_DONE => return,
            _ => {}
        }
        self.aerr_address = address;
        self.aerr_write_mode = if write { 0 } else { 0x10 };
        self.aerr_fc = if instruction {
            self.program_fc() & 7
        } else {
            self.data_fc() & 7
        };
        self.run_mode = RUN_MODE_WRITING_FRAME;

        let sr = self.init_exception();
        self.build_fault_frame(bus, sr, vector::BUS_ERROR);
        self.jump_vector(bus, vector::BUS_ERROR);
        self.run_mode = RUN_MODE_FRAME_DONE;
        self.charge_exception(vector::BUS_ERROR);
    }

    /// Variant-appropriate bus/address error frame.
    fn build_fault_frame(&mut self, bus: &mut dyn Bus, sr: u16, vector: u32) {
        match self.cpu_type {
            CpuType::M68000 | CpuType::M68008 | CpuType::Scc68070 => {
                self.frame_buserr(bus, sr);
            }
            CpuType::M68010 => {
                self.frame_1000(bus, self.ppc, sr, vector);
            }
            t if t.is_040() && vector == vector::BUS_ERROR => {
                self.frame_0111(bus, sr, vector, self.ppc, self.aerr_address);
            }
            _ => {
                // Fault at an instruction boundary takes the short frame.
                if self.aerr_address == self.ppc {
                    self.frame_1010(bus, sr, vector, self.ppc, self.aerr_address);
                } else {
                    self.frame_1011(bus, sr, vector, self.ppc, self.aerr_address);
                }
            }
        }
    }

    // ========== Loop integration ==========

    /// Re-arm the run mode after the loop consumed a fault unwind.
    #[inline]
    pub(crate) fn clear_fault(&mut self) {
        self.run_mode = RUN_MODE_NORMAL;
        self.instr_mode = INSTRUCTION_YES;
    }
}
