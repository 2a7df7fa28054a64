//! The memory gateway: host bus trait, translation windows, FC-tagged access.
//!
//! Every operand access funnels through the `read_*_fc` / `write_*_fc`
//! methods here. Lookup order for each access: the matching one-entry
//! window cache, the registered translation windows (updating the one-entry
//! cache on hit), optional MMU translation, then the host bus callback.

use std::cell::RefCell;
use std::rc::Rc;

use super::cpu::Cpu;
use super::types::ConfigError;

/// A bus-level fault reported by the host (unmapped address, device error,
/// MMU translation failure). Distinct from the 68000 address error, which
/// the core raises itself for misaligned accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault {
    pub address: u32,
}

/// Host memory bus and optional host hooks.
///
/// Only the six plain access methods are required. The fallible variants
/// default to the infallible ones so a simple RAM bus never reports faults;
/// a host that models open bus implements `try_*` and returns `BusFault`.
/// All multi-byte values are big-endian on the wire.
pub trait Bus {
    fn read_8(&mut self, address: u32) -> u8;
    fn read_16(&mut self, address: u32) -> u16;
    fn read_32(&mut self, address: u32) -> u32;
    fn write_8(&mut self, address: u32, value: u8);
    fn write_16(&mut self, address: u32, value: u16);
    fn write_32(&mut self, address: u32, value: u32);

    #[inline]
    fn try_read_8(&mut self, address: u32) -> Result<u8, BusFault> {
        Ok(self.read_8(address))
    }
    #[inline]
    fn try_read_16(&mut self, address: u32) -> Result<u16, BusFault> {
        Ok(self.read_16(address))
    }
    #[inline]
    fn try_read_32(&mut self, address: u32) -> Result<u32, BusFault> {
        Ok(self.read_32(address))
    }
    #[inline]
    fn try_write_8(&mut self, address: u32, value: u8) -> Result<(), BusFault> {
        self.write_8(address, value);
        Ok(())
    }
    #[inline]
    fn try_write_16(&mut self, address: u32, value: u16) -> Result<(), BusFault> {
        self.write_16(address, value);
        Ok(())
    }
    #[inline]
    fn try_write_32(&mut self, address: u32, value: u32) -> Result<(), BusFault> {
        self.write_32(address, value);
        Ok(())
    }

    /// Long write with the predecrement quirk: the 68000 writes the high
    /// word first when storing through -(An). Hosts that care about write
    /// order (FIFO registers) override this.
    #[inline]
    fn write_32_predec(&mut self, address: u32, value: u32) -> Result<(), BusFault> {
        self.try_write_32(address, value)
    }

    /// Instruction-stream reads. Split out so a host can serve code from a
    /// different device than data (or skip side effects of data reads).
    #[inline]
    fn read_instruction_16(&mut self, address: u32) -> Result<u16, BusFault> {
        self.try_read_16(address)
    }
    #[inline]
    fn read_instruction_32(&mut self, address: u32) -> Result<u32, BusFault> {
        self.try_read_32(address)
    }

    // ---- Host hooks (all optional) ----

    /// Interrupt acknowledge. Return a device vector (0..=255),
    /// [`INT_ACK_AUTOVECTOR`], or [`INT_ACK_SPURIOUS`].
    #[inline]
    fn interrupt_acknowledge(&mut self, _level: u8) -> u32 {
        INT_ACK_AUTOVECTOR
    }

    /// BKPT #n acknowledge (68010+).
    #[inline]
    fn breakpoint_acknowledge(&mut self, _data: u32) {}

    /// The RESET instruction was executed (reset external devices).
    #[inline]
    fn reset_devices(&mut self) {}

    /// An RTE instruction completed.
    #[inline]
    fn rte_executed(&mut self) {}

    /// CMPI.L #imm,Dn was executed (some hosts key copy protection off it).
    #[inline]
    fn cmpi_l_executed(&mut self, _value: u32, _reg: u8) {}

    /// TAS write-back gate. Return `false` to suppress the write cycle,
    /// matching machines whose bus logic cancels the TAS read-modify-write.
    #[inline]
    fn tas_writeback(&mut self) -> bool {
        true
    }

    /// Illegal-instruction intercept. Return `true` to claim the opcode and
    /// suppress the illegal-instruction exception.
    #[inline]
    fn illegal_instruction(&mut self, _opcode: u16) -> bool {
        false
    }

    /// The PC was changed by a jump, branch, or exception.
    #[inline]
    fn pc_changed(&mut self, _new_pc: u32) {}

    /// The function code lines changed.
    #[inline]
    fn set_fc(&mut self, _fc: u32) {}

    /// Called before each instruction is dispatched.
    #[inline]
    fn instruction_hook(&mut self, _pc: u32) {}
}

/// Sentinel returned by `interrupt_acknowledge` to request an autovector.
pub const INT_ACK_AUTOVECTOR: u32 = 0xFFFF_FFFF;
/// Sentinel returned by `interrupt_acknowledge` for a spurious interrupt.
pub const INT_ACK_SPURIOUS: u32 = 0xFFFF_FFFE;

/// Shared big-endian byte buffer backing a translation window.
pub type WindowMem = Rc<RefCell<Vec<u8>>>;

/// A registered fast-path window: accesses inside `[lower, upper)` touch
/// the shared buffer directly instead of calling the host bus.
#[derive(Clone)]
pub struct TranslationWindow {
    pub lower: u32,
    pub upper: u32,
    pub mem: WindowMem,
}

/// One-entry cache in front of the window table. Holds the index of the
/// window that satisfied the last access of its kind.
#[derive(Clone, Copy, Default)]
pub struct WindowCache {
    pub lower: u32,
    pub upper: u32,
    pub index: usize,
    pub valid: bool,
}

impl WindowCache {
    #[inline]
    pub(crate) fn hit(&self, address: u32, len: u32) -> bool {
        self.valid
            && address >= self.lower
            && (address as u64 + len as u64) <= self.upper as u64
    }

    #[inline]
    pub(crate) fn fill(&mut self, window: &TranslationWindow, index: usize) {
        self.lower = window.lower;
        self.upper = window.upper;
        self.index = index;
        self.valid = true;
    }
}

pub const MAX_TRANSLATION_WINDOWS: usize = 8;

/// Function code values driven on the bus with each access.
pub const FC_USER_DATA: u32 = 1;
pub const FC_USER_PROGRAM: u32 = 2;
pub const FC_SUPERVISOR_DATA: u32 = 5;
pub const FC_SUPERVISOR_PROGRAM: u32 = 6;

#[inline]
fn window_covers(w: &TranslationWindow, address: u32, len: u32) -> bool {
    address >= w.lower && (address as u64 + len as u64) <= w.upper as u64
}

#[inline]
fn window_read_8(w: &TranslationWindow, address: u32) -> u8 {
    w.mem.borrow()[(address - w.lower) as usize]
}

#[inline]
fn window_read_16(w: &TranslationWindow, address: u32) -> u16 {
    let mem = w.mem.borrow();
    let o = (address - w.lower) as usize;
    u16::from_be_bytes([mem[o], mem[o + 1]])
}

#[inline]
fn window_read_32(w: &TranslationWindow, address: u32) -> u32 {
    let mem = w.mem.borrow();
    let o = (address - w.lower) as usize;
    u32::from_be_bytes([mem[o], mem[o + 1], mem[o + 2], mem[o + 3]])
}

#[inline]
fn window_write_8(w: &TranslationWindow, address: u32, value: u8) {
    w.mem.borrow_mut()[(address - w.lower) as usize] = value;
}

#[inline]
fn window_write_16(w: &TranslationWindow, address: u32, value: u16) {
    let mut mem = w.mem.borrow_mut();
    let o = (address - w.lower) as usize;
    mem[o..o + 2].copy_from_slice(&value.to_be_bytes());
}

#[inline]
fn window_write_32(w: &TranslationWindow, address: u32, value: u32) {
    let mut mem = w.mem.borrow_mut();
    let o = (address - w.lower) as usize;
    mem[o..o + 4].copy_from_slice(&value.to_be_bytes());
}

impl Cpu {
    /// Install a read fast-path window over `[lower, upper)`.
    ///
    /// The buffer holds big-endian bytes and must cover the full range. It
    /// stays shared with the host; writes the host makes to it are visible
    /// to the core immediately (and invisibly to the instruction cache, as
    /// on real hardware).
    pub fn register_read_range(
        &mut self,
        lower: u32,
        upper: u32,
        mem: WindowMem,
    ) -> Result<(), ConfigError> {
        if self.read_windows.len() >= MAX_TRANSLATION_WINDOWS {
            return Err(ConfigError::TooManyRanges);
        }
        if upper <= lower || mem.borrow().len() < (upper - lower) as usize {
            return Err(ConfigError::BadRangeBounds);
        }
        self.read_windows.push(TranslationWindow { lower, upper, mem });
        Ok(())
    }

    /// Install a write fast-path window over `[lower, upper)`.
    pub fn register_write_range(
        &mut self,
        lower: u32,
        upper: u32,
        mem: WindowMem,
    ) -> Result<(), ConfigError> {
        if self.write_windows.len() >= MAX_TRANSLATION_WINDOWS {
            return Err(ConfigError::TooManyRanges);
        }
        if upper <= lower || mem.borrow().len() < (upper - lower) as usize {
            return Err(ConfigError::BadRangeBounds);
        }
        self.write_windows.push(TranslationWindow { lower, upper, mem });
        Ok(())
    }

    /// Drop all registered windows and invalidate the one-entry caches.
    pub fn clear_ranges(&mut self) {
        self.read_windows.clear();
        self.write_windows.clear();
        self.code_cache.valid = false;
        self.fc_read_cache.valid = false;
        self.fc_write_cache.valid = false;
    }

    /// MMU translation step; converts a translation fault into a bus error.
    /// Returns `None` when the access must abort.
    #[inline]
    pub(crate) fn translate(&mut self, bus: &mut dyn Bus, address: u32, write: bool) -> Option<u32> {
        if !self.pmmu_enabled {
            return Some(address);
        }
        let Some(mmu) = self.mmu.as_mut() else {
            return Some(address);
        };
        match mmu.translate(bus, address, write, self.s_flag != 0) {
            Ok(physical) => Some(physical & self.address_mask),
            Err(fault) => {
                self.raise_bus_error(bus, fault.address, write, false);
                None
            }
        }
    }

    // ---- FC-tagged reads ----

    pub(crate) fn read_8_fc(&mut self, bus: &mut dyn Bus, address: u32, fc: u32) -> u8 {
        if self.faulted() {
            return 0;
        }
        bus.set_fc(fc);
        let address = self.mask_address(address);
        let Some(address) = self.translate(bus, address, false) else {
            return 0;
        };
        if self.fc_read_cache.hit(address, 1) {
            return window_read_8(&self.read_windows[self.fc_read_cache.index], address);
        }
        for (i, w) in self.read_windows.iter().enumerate() {
            if window_covers(w, address, 1) {
                self.fc_read_cache.fill(w, i);
                return window_read_8(w, address);
            }
        }
        match bus.try_read_8(address) {
            Ok(v) => v,
            Err(f) => {
                self.raise_bus_error(bus, f.address, false, false);
                0
            }
        }
    }

    pub(crate) fn read_16_fc(&mut self, bus: &mut dyn Bus, address: u32, fc: u32) -> u16 {
        if self.faulted() {
            return 0;
        }
        bus.set_fc(fc);
        let address = self.mask_address(address);
        if address & 1 != 0 {
            if self.cpu_type.is_010_or_less() {
                self.raise_address_error(bus, address, false, fc);
                return 0;
            }
            // 020+ splits the access, big-endian order.
            let hi = self.read_8_fc(bus, address, fc) as u16;
            let lo = self.read_8_fc(bus, address.wrapping_add(1), fc) as u16;
            return (hi << 8) | lo;
        }
        let Some(address) = self.translate(bus, address, false) else {
            return 0;
        };
        if self.fc_read_cache.hit(address, 2) {
            return window_read_16(&self.read_windows[self.fc_read_cache.index], address);
        }
        for (i, w) in self.read_windows.iter().enumerate() {
            if window_covers(w, address, 2) {
                self.fc_read_cache.fill(w, i);
                return window_read_16(w, address);
            }
        }
        match bus.try_read_16(address) {
            Ok(v) => v,
            Err(f) => {
                self.raise_bus_error(bus, f.address, false, false);
                0
            }
        }
    }

    pub(crate) fn read_32_fc(&mut self, bus: &mut dyn Bus, address: u32, fc: u32) -> u32 {
        if self.faulted() {
            return 0;
        }
        bus.set_fc(fc);
        let address = self.mask_address(address);
        if address & 1 != 0 {
            if self.cpu_type.is_010_or_less() {
                self.raise_address_error(bus, address, false, fc);
                return 0;
            }
            let hi = self.read_8_fc(bus, address, fc) as u32;
            let mid = self.read_16_fc(bus, address.wrapping_add(1), fc) as u32;
            let lo = self.read_8_fc(bus, address.wrapping_add(3), fc) as u32;
            return (hi << 24) | (mid << 8) | lo;
        }
        let Some(address) = self.translate(bus, address, false) else {
            return 0;
        };
        if self.fc_read_cache.hit(address, 4) {
            return window_read_32(&self.read_windows[self.fc_read_cache.index], address);
        }
        for (i, w) in self.read_windows.iter().enumerate() {
            if window_covers(w, address, 4) {
                self.fc_read_cache.fill(w, i);
                return window_read_32(w, address);
            }
        }
        match bus.try_read_32(address) {
            Ok(v) => v,
            Err(f) => {
                self.raise_bus_error(bus, f.address, false, false);
                0
            }
        }
    }

    // ---- FC-tagged writes ----

    pub(crate) fn write_8_fc(&mut self, bus: &mut dyn Bus, address: u32, fc: u32, value: u8) {
        if self.faulted() {
            return;
        }
        bus.set_fc(fc);
        let address = self.mask_address(address);
        let Some(address) = self.translate(bus, address, true) else {
            return;
        };
        if self.fc_write_cache.hit(address, 1) {
            window_write_8(&self.write_windows[self.fc_write_cache.index], address, value);
            return;
        }
        for (i, w) in self.write_windows.iter().enumerate() {
            if window_covers(w, address, 1) {
                self.fc_write_cache.fill(w, i);
                window_write_8(w, address, value);
                return;
            }
        }
        if let Err(f) = bus.try_write_8(address, value) {
            self.raise_bus_error(bus, f.address, true, false);
        }
    }

    pub(crate) fn write_16_fc(&mut self, bus: &mut dyn Bus, address: u32, fc: u32, value: u16) {
        if self.faulted() {
            return;
        }
        bus.set_fc(fc);
        let address = self.mask_address(address);
        if address & 1 != 0 {
            if self.cpu_type.is_010_or_less() {
                self.raise_address_error(bus, address, true, fc);
                return;
            }
            self.write_8_fc(bus, address, fc, (value >> 8) as u8);
            self.write_8_fc(bus, address.wrapping_add(1), fc, value as u8);
            return;
        }
        let Some(address) = self.translate(bus, address, true) else {
            return;
        };
        if self.fc_write_cache.hit(address, 2) {
            window_write_16(&self.write_windows[self.fc_write_cache.index], address, value);
            return;
        }
        for (i, w) in self.write_windows.iter().enumerate() {
            if window_covers(w, address, 2) {
                self.fc_write_cache.fill(w, i);
                window_write_16(w, address, value);
                return;
            }
        }
        if let Err(f) = bus.try_write_16(address, value) {
            self.raise_bus_error(bus, f.address, true, false);
        }
    }

    pub(crate) fn write_32_fc(&mut self, bus: &mut dyn Bus, address: u32, fc: u32, value: u32) {
        if self.faulted() {
            return;
        }
        bus.set_fc(fc);
        let address = self.mask_address(address);
        if address & 1 != 0 {
            if self.cpu_type.is_010_or_less() {
                self.raise_address_error(bus, address, true, fc);
                return;
            }
            self.write_8_fc(bus, address, fc, (value >> 24) as u8);
            self.write_16_fc(bus, address.wrapping_add(1), fc, (value >> 8) as u16);
            self.write_8_fc(bus, address.wrapping_add(3), fc, value as u8);
            return;
        }
        let Some(address) = self.translate(bus, address, true) else {
            return;
        };
        if self.fc_write_cache.hit(address, 4) {
            window_write_32(&self.write_windows[self.fc_write_cache.index], address, value);
            return;
        }
        for (i, w) in self.write_windows.iter().enumerate() {
            if window_covers(w, address, 4) {
                self.fc_write_cache.fill(w, i);
                window_write_32(w, address, value);
                return;
            }
        }
        if let Err(f) = bus.try_write_32(address, value) {
            self.raise_bus_error(bus, f.address, true, false);
        }
    }

    /// Long write through a predecremented address register: high word
    /// first, via the host's quirk hook when no window covers the address.
    pub(crate) fn write_32_fc_predec(
        &mut self,
        bus: &mut dyn Bus,
        address: u32,
        fc: u32,
        value: u32,
    ) {
        if self.faulted() {
            return;
        }
        bus.set_fc(fc);
        let address = self.mask_address(address);
        if address & 1 != 0 && self.cpu_type.is_010_or_less() {
            self.raise_address_error(bus, address, true, fc);
            return;
        }
        if self.fc_write_cache.hit(address, 4)
            || self.write_windows.iter().any(|w| window_covers(w, address, 4))
        {
            // Order is unobservable inside a window; reuse the plain path.
            self.write_32_fc(bus, address, fc, value);
            return;
        }
        let Some(address) = self.translate(bus, address, true) else {
            return;
        };
        if let Err(f) = bus.write_32_predec(address, value) {
            self.raise_bus_error(bus, f.address, true, false);
        }
    }

    // ---- Data-space convenience wrappers ----

    #[inline]
    pub(crate) fn data_fc(&self) -> u32 {
        self.s_flag | FC_USER_DATA
    }

    #[inline]
    pub(crate) fn program_fc(&self) -> u32 {
        self.s_flag | FC_USER_PROGRAM
    }

    #[inline]
    pub(crate) fn read_8(&mut self, bus: &mut dyn Bus, address: u32) -> u8 {
        let fc = self.data_fc();
        self.read_8_fc(bus, address, fc)
    }

    #[inline]
    pub(crate) fn read_16(&mut self, bus: &mut dyn Bus, address: u32) -> u16 {
        let fc = self.data_fc();
        self.read_16_fc(bus, address, fc)
    }

    #[inline]
    pub(crate) fn read_32(&mut self, bus: &mut dyn Bus, address: u32) -> u32 {
        let fc = self.data_fc();
        self.read_32_fc(bus, address, fc)
    }

    #[inline]
    pub(crate) fn write_8(&mut self, bus: &mut dyn Bus, address: u32, value: u8) {
        let fc = self.data_fc();
        self.write_8_fc(bus, address, fc, value);
    }

    #[inline]
    pub(crate) fn write_16(&mut self, bus: &mut dyn Bus, address: u32, value: u16) {
        let fc = self.data_fc();
        self.write_16_fc(bus, address, fc, value);
    }

    #[inline]
    pub(crate) fn write_32(&mut self, bus: &mut dyn Bus, address: u32, value: u32) {
        let fc = self.data_fc();
        self.write_32_fc(bus, address, fc, value);
    }
}
