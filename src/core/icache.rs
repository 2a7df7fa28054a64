//! Instruction fetch: prefetch shadow and the 68020 on-chip I-cache.
//!
//! Fetch order per word: code translation window, then the prefetch
//! shadow backed by the I-cache, then the host bus. The shadow holds the
//! word at `pref_addr` only; a faulting lookahead marks it invalid
//! (`pref_addr == !0`) rather than raising, so a fault is only taken when
//! the PC actually reaches the bad word.

use super::cpu::Cpu;
use super::memory::{Bus, BusFault};
use super::status::{CACR_CLEAR_I, CACR_ENABLE_I, CACR_FREEZE_I};

/// Cache slot count. Lookup uses a 1-of-64 select; the remaining slots
/// exist only so a saved context round-trips the whole array.
pub const IC_SIZE: usize = 128;

/// Tag bit distinguishing supervisor-mode lines.
const IC_SUPERVISOR_TAG: u32 = 0x0100_0000;

impl Cpu {
    /// Write CACR: honour the enable/freeze bits, action the clear bit.
    pub fn set_cacr(&mut self, value: u32) {
        if value & CACR_CLEAR_I != 0 {
            self.ic_clear();
        }
        // CI is a command, not state.
        self.cacr = value & !CACR_CLEAR_I;
    }

    /// Invalidate every cache line.
    pub fn ic_clear(&mut self) {
        self.ic_tag = [!0; IC_SIZE];
        self.ic_valid = [false; IC_SIZE];
    }

    /// Read one instruction word through the I-cache.
    ///
    /// On a miss with the cache enabled and not frozen, fills the line
    /// with a 32-bit read at `address & !3`; a fill that faults is retried
    /// uncached so the line never holds a partial fill.
    fn ic_read_16(&mut self, bus: &mut dyn Bus, address: u32) -> Result<u16, BusFault> {
        if self.cacr & CACR_ENABLE_I != 0 && self.cpu_type.is_020_plus() {
            let tag = (address >> 8) | if self.s_flag != 0 { IC_SUPERVISOR_TAG } else { 0 };
            let idx = ((address >> 2) & 0x3F) as usize;
            if !self.ic_valid[idx] || self.ic_tag[idx] != tag {
                if self.cacr & CACR_FREEZE_I != 0 {
                    return bus.read_instruction_16(address);
                }
                match bus.read_instruction_32(address & !3) {
                    Ok(data) => {
                        self.ic_tag[idx] = tag;
                        self.ic_data[idx] = data;
                        self.ic_valid[idx] = true;
                    }
                    Err(_) => return bus.read_instruction_16(address),
                }
            }
            let line = self.ic_data[idx];
            return Ok(if address & 2 != 0 {
                (line & 0xFFFF) as u16
            } else {
                (line >> 16) as u16
            });
        }
        bus.read_instruction_16(address)
    }

    /// Fetch the next instruction-stream word and advance the PC.
    pub(crate) fn read_imm_16(&mut self, bus: &mut dyn Bus) -> u16 {
        if self.faulted() {
            return 0;
        }
        let fc = self.program_fc();
        bus.set_fc(fc);
        let pc = self.pc;
        if pc & 1 != 0 {
            // Instruction fetches are word aligned on every family member.
            self.raise_address_error(bus, pc, false, fc);
            return 0;
        }
        let mut address = self.mask_address(pc);
        let Some(translated) = self.translate(bus, address, false) else {
            return 0;
        };
        address = translated;

        // Code window fast path bypasses prefetch and cache entirely.
        if self.code_cache.hit(address, 2) {
            let w = &self.read_windows[self.code_cache.index];
            let value = window_fetch_16(w, address);
            self.pc = self.pc.wrapping_add(2);
            return value;
        }
        for i in 0..self.read_windows.len() {
            let (lower, upper) = {
                let w = &self.read_windows[i];
                (w.lower, w.upper)
            };
            if address >= lower && address as u64 + 2 <= upper as u64 {
                let w = &self.read_windows[i];
                let value = window_fetch_16(w, address);
                self.code_cache.fill(&self.read_windows[i], i);
                self.pc = self.pc.wrapping_add(2);
                return value;
            }
        }

        // Prefetch shadow, valid only when it tracks the PC.
        let value = if self.pref_addr == pc {
            (self.pref_data & 0xFFFF) as u16
        } else {
            match self.ic_read_16(bus, address) {
                Ok(v) => v,
                Err(f) => {
                    self.raise_bus_error(bus, f.address, false, true);
                    return 0;
                }
            }
        };
        self.pc = self.pc.wrapping_add(2);

        // Lookahead refill. A fault here only invalidates the shadow; the
        // exception is taken if and when the PC reaches the bad word.
        let next = self.mask_address(self.pc);
        match self.ic_read_16(bus, next) {
            Ok(v) => {
                self.pref_addr = self.pc;
                self.pref_data = v as u32;
            }
            Err(_) => self.pref_addr = !0,
        }

        value
    }

    /// Fetch a long from the instruction stream (two word fetches, so the
    /// prefetch shadow stays coherent).
    pub(crate) fn read_imm_32(&mut self, bus: &mut dyn Bus) -> u32 {
        let hi = self.read_imm_16(bus) as u32;
        let lo = self.read_imm_16(bus) as u32;
        (hi << 16) | lo
    }

    /// Fetch a byte immediate (stored in the low half of a word).
    #[inline]
    pub(crate) fn read_imm_8(&mut self, bus: &mut dyn Bus) -> u8 {
        (self.read_imm_16(bus) & 0xFF) as u8
    }
}

#[inline]
fn window_fetch_16(w: &super::memory::TranslationWindow, address: u32) -> u16 {
    let mem = w.mem.borrow();
    let o = (address - w.lower) as usize;
    u16::from_be_bytes([mem[o], mem[o + 1]])
}
