//! Effective address engine.
//!
//! Resolves all addressing modes of the family, including the 68020 full
//! extension word (scaled index, base/outer displacement, pre-/post-indexed
//! memory indirection). PC-relative operands read through program space.

use super::cpu::{Cpu, RUN_MODE_FRAME_DONE};
use super::memory::Bus;
use super::timing::EA_IDX_CYCLE_TABLE;
use super::types::Size;

/// Addressing mode, decoded from the mode/register fields of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// Dn
    DataDirect(u8),
    /// An
    AddressDirect(u8),
    /// (An)
    Indirect(u8),
    /// (An)+
    PostInc(u8),
    /// -(An)
    PreDec(u8),
    /// (d16,An)
    Displacement(u8),
    /// (d8,An,Xn) and the full-extension forms
    Indexed(u8),
    /// (xxx).W
    AbsShort,
    /// (xxx).L
    AbsLong,
    /// (d16,PC)
    PcDisplacement,
    /// (d8,PC,Xn) and the full-extension forms
    PcIndexed,
    /// #imm
    Immediate,
}

impl AddrMode {
    /// Decode mode and register fields.
    pub fn decode(mode: u8, reg: u8) -> Option<Self> {
        match mode {
            0b000 => Some(Self::DataDirect(reg)),
            0b001 => Some(Self::AddressDirect(reg)),
            0b010 => Some(Self::Indirect(reg)),
            0b011 => Some(Self::PostInc(reg)),
            0b100 => Some(Self::PreDec(reg)),
            0b101 => Some(Self::Displacement(reg)),
            0b110 => Some(Self::Indexed(reg)),
            0b111 => match reg {
                0b000 => Some(Self::AbsShort),
                0b001 => Some(Self::AbsLong),
                0b010 => Some(Self::PcDisplacement),
                0b011 => Some(Self::PcIndexed),
                0b100 => Some(Self::Immediate),
                _ => None,
            },
            _ => None,
        }
    }

    /// Decode from the low six opcode bits.
    #[inline]
    pub fn from_opcode(opcode: u16) -> Option<Self> {
        Self::decode(((opcode >> 3) & 7) as u8, (opcode & 7) as u8)
    }

    #[inline]
    pub fn is_register(self) -> bool {
        matches!(self, Self::DataDirect(_) | Self::AddressDirect(_))
    }

    /// Modes a result may be stored through (data alterable, plus An).
    #[inline]
    pub fn is_alterable(self) -> bool {
        !matches!(
            self,
            Self::PcDisplacement | Self::PcIndexed | Self::Immediate
        )
    }

    /// Control addressing modes (valid for LEA/PEA/JMP/JSR/MOVEM source).
    #[inline]
    pub fn is_control(self) -> bool {
        matches!(
            self,
            Self::Indirect(_)
                | Self::Displacement(_)
                | Self::Indexed(_)
                | Self::AbsShort
                | Self::AbsLong
                | Self::PcDisplacement
                | Self::PcIndexed
        )
    }
}

/// A resolved operand location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ea {
    DataReg(u8),
    AddrReg(u8),
    /// Data-space memory operand.
    Memory(u32),
    /// Program-space memory operand (PC-relative modes).
    PcMemory(u32),
    /// Immediate operand, already fetched.
    Immediate(u32),
}

impl Cpu {
    /// Post-increment/pre-decrement step; byte accesses through A7 keep
    /// the stack word aligned.
    #[inline]
    fn addr_step(&self, reg: u8, size: Size) -> u32 {
        if reg == 7 && size == Size::Byte {
            2
        } else {
            size.bytes()
        }
    }

    /// Resolve an effective address, consuming any extension words and
    /// applying post-increment/pre-decrement side effects.
    pub(crate) fn resolve_ea(&mut self, bus: &mut dyn Bus, mode: AddrMode, size: Size) -> Ea {
        if self.faulted() {
            return Ea::Memory(0);
        }
        match mode {
            AddrMode::DataDirect(reg) => Ea::DataReg(reg),
            AddrMode::AddressDirect(reg) => Ea::AddrReg(reg),
            AddrMode::Indirect(reg) => Ea::Memory(self.a(reg as usize)),
            AddrMode::PostInc(reg) => {
                let addr = self.a(reg as usize);
                let step = self.addr_step(reg, size);
                self.set_a(reg as usize, addr.wrapping_add(step));
                Ea::Memory(addr)
            }
            AddrMode::PreDec(reg) => {
                let step = self.addr_step(reg, size);
                let addr = self.a(reg as usize).wrapping_sub(step);
                self.set_a(reg as usize, addr);
                Ea::Memory(addr)
            }
            AddrMode::Displacement(reg) => {
                let disp = self.read_imm_16(bus) as i16 as i32;
                Ea::Memory((self.a(reg as usize) as i32).wrapping_add(disp) as u32)
            }
            AddrMode::Indexed(reg) => {
                let base = self.a(reg as usize);
                Ea::Memory(self.indexed_address(bus, base))
            }
            AddrMode::AbsShort => Ea::Memory(self.read_imm_16(bus) as i16 as i32 as u32),
            AddrMode::AbsLong => Ea::Memory(self.read_imm_32(bus)),
            AddrMode::PcDisplacement => {
                let pc = self.pc;
                let disp = self.read_imm_16(bus) as i16 as i32;
                Ea::PcMemory((pc as i32).wrapping_add(disp) as u32)
            }
            AddrMode::PcIndexed => {
                let pc = self.pc;
                Ea::PcMemory(self.indexed_address(bus, pc))
            }
            AddrMode::Immediate => {
                let value = match size {
                    Size::Byte => self.read_imm_8(bus) as u32,
                    Size::Word => self.read_imm_16(bus) as u32,
                    Size::Long => self.read_imm_32(bus),
                };
                Ea::Immediate(value)
            }
        }
    }

    /// Indexed address from an extension word (brief on all variants,
    /// brief-with-scale and full on EC020+).
    fn indexed_address(&mut self, bus: &mut dyn Bus, base: u32) -> u32 {
        let ext = self.read_imm_16(bus);

        // Brief format: d8 + Xn(.W sign-extended | .L), scale on EC020+.
        if ext & 0x0100 == 0 || !self.cpu_type.is_020_plus() {
            let mut xn = self.dar[(ext >> 12) as usize & 15];
            if ext & 0x0800 == 0 {
                xn = xn as u16 as i16 as i32 as u32;
            }
            if self.cpu_type.is_020_plus() {
                xn <<= (ext >> 9) & 3;
            }
            let d8 = (ext & 0xFF) as u8 as i8 as i32;
            return (base as i32)
                .wrapping_add(xn as i32)
                .wrapping_add(d8) as u32;
        }

        // Full format. Charge the index-mode surcharge first.
        self.use_cycles(EA_IDX_CYCLE_TABLE[(ext & 0x3F) as usize] as i32);

        let bd_size = (ext >> 4) & 3;
        let index_suppress = ext & 0x0040 != 0;
        let iis = ext & 7;
        // Reserved encodings decode to nothing on real silicon. Poison
        // the rest of the instruction so the caller's operand accesses
        // become no-ops once the exception is stacked.
        if bd_size == 0
            || (!index_suppress && iis == 4)
            || (index_suppress && iis >= 4)
        {
            self.exception_illegal(bus);
            self.run_mode = RUN_MODE_FRAME_DONE;
            return 0;
        }

        let base = if ext & 0x0080 != 0 { 0 } else { base };
        let xn = if index_suppress {
            0
        } else {
            let mut xn = self.dar[(ext >> 12) as usize & 15];
            if ext & 0x0800 == 0 {
                xn = xn as u16 as i16 as i32 as u32;
            }
            (xn << ((ext >> 9) & 3)) as i32
        };

        let bd: i32 = match bd_size {
            2 => self.read_imm_16(bus) as i16 as i32,
            3 => self.read_imm_32(bus) as i32,
            _ => 0,
        };

        if iis == 0 {
            // No memory indirection.
            return (base as i32).wrapping_add(bd).wrapping_add(xn) as u32;
        }

        let od: i32 = match iis & 3 {
            2 => self.read_imm_16(bus) as i16 as i32,
            3 => self.read_imm_32(bus) as i32,
            _ => 0,
        };

        if iis & 4 != 0 {
            // Post-indexed: indirect first, index applied outside.
            let intermediate = (base as i32).wrapping_add(bd) as u32;
            let indirect = self.read_32(bus, intermediate) as i32;
            indirect.wrapping_add(xn).wrapping_add(od) as u32
        } else {
            // Pre-indexed.
            let intermediate = (base as i32).wrapping_add(bd).wrapping_add(xn) as u32;
            let indirect = self.read_32(bus, intermediate) as i32;
            indirect.wrapping_add(od) as u32
        }
    }

    /// Resolve a control-mode EA to its address (LEA/PEA/JMP/JSR/MOVEM).
    /// The caller has verified the mode is a control mode.
    pub(crate) fn ea_address(&mut self, bus: &mut dyn Bus, mode: AddrMode, size: Size) -> u32 {
        match self.resolve_ea(bus, mode, size) {
            Ea::Memory(addr) | Ea::PcMemory(addr) => addr,
            _ => 0,
        }
    }

    /// Read an operand through a resolved EA.
    pub(crate) fn ea_read(&mut self, bus: &mut dyn Bus, ea: Ea, size: Size) -> u32 {
        match ea {
            Ea::DataReg(reg) => self.d(reg as usize) & size.mask(),
            Ea::AddrReg(reg) => self.a(reg as usize) & size.mask(),
            Ea::Memory(addr) => {
                let fc = self.data_fc();
                self.read_ea_sized(bus, addr, fc, size)
            }
            Ea::PcMemory(addr) => {
                let fc = self.program_fc();
                self.read_ea_sized(bus, addr, fc, size)
            }
            Ea::Immediate(value) => value & size.mask(),
        }
    }

    fn read_ea_sized(&mut self, bus: &mut dyn Bus, addr: u32, fc: u32, size: Size) -> u32 {
        match size {
            Size::Byte => self.read_8_fc(bus, addr, fc) as u32,
            Size::Word => self.read_16_fc(bus, addr, fc) as u32,
            Size::Long => self.read_32_fc(bus, addr, fc),
        }
    }

    /// Write an operand through a resolved EA. Register destinations merge
    /// at operand width; PC-relative and immediate destinations are
    /// rejected by handlers before resolution.
    pub(crate) fn ea_write(&mut self, bus: &mut dyn Bus, ea: Ea, size: Size, value: u32) {
        match ea {
            Ea::DataReg(reg) => {
                let reg = reg as usize;
                let merged = (self.d(reg) & !size.mask()) | (value & size.mask());
                self.set_d(reg, merged);
            }
            Ea::AddrReg(reg) => {
                self.set_a(reg as usize, size.sign_extend(value));
            }
            Ea::Memory(addr) => match size {
                Size::Byte => self.write_8(bus, addr, value as u8),
                Size::Word => self.write_16(bus, addr, value as u16),
                Size::Long => self.write_32(bus, addr, value),
            },
            Ea::PcMemory(_) | Ea::Immediate(_) => {}
        }
    }
}
