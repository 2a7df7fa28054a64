//! Integer arithmetic: ADD, SUB, CMP families, NEG, CLR, EXT, TST.

use super::size_bits;
use crate::core::cpu::{CFLAG_SET, Cpu, NFLAG_SET, VFLAG_SET};
use crate::core::ea::{AddrMode, Ea};
use crate::core::memory::Bus;
use crate::core::types::Size;

impl Cpu {
    /// Flags for ADD at the operand width. Carry for the long width uses
    /// the majority formula since bit 32 is unobservable.
    pub(crate) fn set_add_flags(&mut self, src: u32, dst: u32, result: u32, size: Size) {
        let msb = size.msb_mask();
        self.n_flag = if result & msb != 0 { NFLAG_SET } else { 0 };
        self.not_z_flag = result & size.mask();
        let v = (src ^ result) & (dst ^ result) & msb;
        self.v_flag = if v != 0 { VFLAG_SET } else { 0 };
        let carry = match size {
            Size::Byte => result & 0x100 != 0,
            Size::Word => result & 0x1_0000 != 0,
            Size::Long => ((src & dst) | (!result & (src | dst))) & 0x8000_0000 != 0,
        };
        self.c_flag = if carry { CFLAG_SET } else { 0 };
        self.x_flag = self.c_flag;
    }

    /// Flags for SUB at the operand width.
    pub(crate) fn set_sub_flags(&mut self, src: u32, dst: u32, result: u32, size: Size) {
        self.set_cmp_flags(src, dst, result, size);
        self.x_flag = self.c_flag;
    }

    /// Flags for CMP: as SUB but X untouched.
    pub(crate) fn set_cmp_flags(&mut self, src: u32, dst: u32, result: u32, size: Size) {
        let msb = size.msb_mask();
        let mask = size.mask();
        let r = result & mask;
        let s = src & mask;
        let d = dst & mask;
        self.n_flag = if r & msb != 0 { NFLAG_SET } else { 0 };
        self.not_z_flag = r;
        let v = (s ^ d) & (r ^ d) & msb;
        self.v_flag = if v != 0 { VFLAG_SET } else { 0 };
        let borrow = match size {
            Size::Long => ((s & r) | (!d & (s | r))) & 0x8000_0000 != 0,
            _ => s > d,
        };
        self.c_flag = if borrow { CFLAG_SET } else { 0 };
    }
}

/// ADD `<ea>,Dn` / ADD `Dn,<ea>` (direction in bit 8).
pub(crate) fn add(cpu: &mut Cpu, bus: &mut dyn Bus) {
    binary_arith(cpu, bus, ArithOp::Add);
}

/// SUB `<ea>,Dn` / SUB `Dn,<ea>`.
pub(crate) fn sub(cpu: &mut Cpu, bus: &mut dyn Bus) {
    binary_arith(cpu, bus, ArithOp::Sub);
}

#[derive(Clone, Copy, PartialEq)]
enum ArithOp {
    Add,
    Sub,
}

fn binary_arith(cpu: &mut Cpu, bus: &mut dyn Bus, op: ArithOp) {
    let opcode = cpu.ir as u16;
    let size = size_bits(opcode);
    let reg = ((opcode >> 9) & 7) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if opcode & 0x0100 == 0 {
        // <ea> op Dn -> Dn
        if size == Size::Byte && matches!(mode, AddrMode::AddressDirect(_)) {
            return cpu.exception_illegal(bus);
        }
        let ea = cpu.resolve_ea(bus, mode, size);
        let src = cpu.ea_read(bus, ea, size);
        if cpu.faulted() {
            return;
        }
        let dst = cpu.d(reg) & size.mask();
        let result = match op {
            ArithOp::Add => {
                let r = src.wrapping_add(dst);
                cpu.set_add_flags(src, dst, r, size);
                r
            }
            ArithOp::Sub => {
                let r = dst.wrapping_sub(src);
                cpu.set_sub_flags(src, dst, r, size);
                r
            }
        };
        cpu.ea_write(bus, Ea::DataReg(reg as u8), size, result);
    } else {
        // Dn op <ea> -> <ea>, memory alterable only
        if mode.is_register() || !mode.is_alterable() {
            return cpu.exception_illegal(bus);
        }
        let ea = cpu.resolve_ea(bus, mode, size);
        let dst = cpu.ea_read(bus, ea, size);
        if cpu.faulted() {
            return;
        }
        let src = cpu.d(reg) & size.mask();
        let result = match op {
            ArithOp::Add => {
                let r = src.wrapping_add(dst);
                cpu.set_add_flags(src, dst, r, size);
                r
            }
            ArithOp::Sub => {
                let r = dst.wrapping_sub(src);
                cpu.set_sub_flags(src, dst, r, size);
                r
            }
        };
        cpu.ea_write(bus, ea, size, result);
    }
}

/// ADDA/SUBA `<ea>,An`: whole register, no flags, word source
/// sign-extended.
pub(crate) fn adda(cpu: &mut Cpu, bus: &mut dyn Bus) {
    addsuba(cpu, bus, ArithOp::Add);
}

pub(crate) fn suba(cpu: &mut Cpu, bus: &mut dyn Bus) {
    addsuba(cpu, bus, ArithOp::Sub);
}

fn addsuba(cpu: &mut Cpu, bus: &mut dyn Bus, op: ArithOp) {
    let opcode = cpu.ir as u16;
    let size = if opcode & 0x0100 != 0 {
        Size::Long
    } else {
        Size::Word
    };
    let reg = ((opcode >> 9) & 7) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    let ea = cpu.resolve_ea(bus, mode, size);
    let src = size.sign_extend(cpu.ea_read(bus, ea, size));
    if cpu.faulted() {
        return;
    }
    let dst = cpu.a(reg);
    let result = match op {
        ArithOp::Add => dst.wrapping_add(src),
        ArithOp::Sub => dst.wrapping_sub(src),
    };
    cpu.set_a(reg, result);
}

/// ADDI/SUBI/CMPI `#imm,<ea>`.
pub(crate) fn addi(cpu: &mut Cpu, bus: &mut dyn Bus) {
    imm_arith(cpu, bus, ImmOp::Add);
}

pub(crate) fn subi(cpu: &mut Cpu, bus: &mut dyn Bus) {
    imm_arith(cpu, bus, ImmOp::Sub);
}

pub(crate) fn cmpi(cpu: &mut Cpu, bus: &mut dyn Bus) {
    imm_arith(cpu, bus, ImmOp::Cmp);
}

#[derive(Clone, Copy, PartialEq)]
enum ImmOp {
    Add,
    Sub,
    Cmp,
}

fn imm_arith(cpu: &mut Cpu, bus: &mut dyn Bus, op: ImmOp) {
    let opcode = cpu.ir as u16;
    let size = size_bits(opcode);
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_) | AddrMode::Immediate) {
        return cpu.exception_illegal(bus);
    }
    // CMPI gained the PC-relative modes on the 68020.
    let pc_relative = matches!(mode, AddrMode::PcDisplacement | AddrMode::PcIndexed);
    if pc_relative && (op != ImmOp::Cmp || !cpu.cpu_type.is_020_plus()) {
        return cpu.exception_illegal(bus);
    }
    let src = match size {
        Size::Byte => cpu.read_imm_8(bus) as u32,
        Size::Word => cpu.read_imm_16(bus) as u32,
        Size::Long => cpu.read_imm_32(bus),
    };
    let ea = cpu.resolve_ea(bus, mode, size);
    let dst = cpu.ea_read(bus, ea, size);
    if cpu.faulted() {
        return;
    }
    match op {
        ImmOp::Add => {
            let r = src.wrapping_add(dst);
            cpu.set_add_flags(src, dst, r, size);
            cpu.ea_write(bus, ea, size, r);
        }
        ImmOp::Sub => {
            let r = dst.wrapping_sub(src);
            cpu.set_sub_flags(src, dst, r, size);
            cpu.ea_write(bus, ea, size, r);
        }
        ImmOp::Cmp => {
            let r = dst.wrapping_sub(src);
            cpu.set_cmp_flags(src, dst, r, size);
            if size == Size::Long {
                if let Ea::DataReg(reg) = ea {
                    bus.cmpi_l_executed(src, reg);
                }
            }
        }
    }
}

/// ADDQ/SUBQ `#1-8,<ea>`; address register destinations are untouched by
/// flags and always operate on the full register.
pub(crate) fn addq(cpu: &mut Cpu, bus: &mut dyn Bus) {
    quick_arith(cpu, bus, ArithOp::Add);
}

pub(crate) fn subq(cpu: &mut Cpu, bus: &mut dyn Bus) {
    quick_arith(cpu, bus, ArithOp::Sub);
}

fn quick_arith(cpu: &mut Cpu, bus: &mut dyn Bus, op: ArithOp) {
    let opcode = cpu.ir as u16;
    let size = size_bits(opcode);
    let mut data = ((opcode >> 9) & 7) as u32;
    if data == 0 {
        data = 8;
    }
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if let AddrMode::AddressDirect(reg) = mode {
        if size == Size::Byte {
            return cpu.exception_illegal(bus);
        }
        let reg = reg as usize;
        let value = match op {
            ArithOp::Add => cpu.a(reg).wrapping_add(data),
            ArithOp::Sub => cpu.a(reg).wrapping_sub(data),
        };
        cpu.set_a(reg, value);
        return;
    }
    if !mode.is_alterable() {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, size);
    let dst = cpu.ea_read(bus, ea, size);
    if cpu.faulted() {
        return;
    }
    let result = match op {
        ArithOp::Add => {
            let r = data.wrapping_add(dst);
            cpu.set_add_flags(data, dst, r, size);
            r
        }
        ArithOp::Sub => {
            let r = dst.wrapping_sub(data);
            cpu.set_sub_flags(data, dst, r, size);
            r
        }
    };
    cpu.ea_write(bus, ea, size, result);
}

/// ADDX/SUBX: register pairs or -(Ay),-(Ax); Z only ever cleared.
pub(crate) fn addx(cpu: &mut Cpu, bus: &mut dyn Bus) {
    extended_arith(cpu, bus, ArithOp::Add);
}

pub(crate) fn subx(cpu: &mut Cpu, bus: &mut dyn Bus) {
    extended_arith(cpu, bus, ArithOp::Sub);
}

fn extended_arith(cpu: &mut Cpu, bus: &mut dyn Bus, op: ArithOp) {
    let opcode = cpu.ir as u16;
    let size = size_bits(opcode);
    let rx = ((opcode >> 9) & 7) as usize;
    let ry = (opcode & 7) as usize;
    let memory = opcode & 0x0008 != 0;

    let (src, dst, dst_ea) = if memory {
        let src_ea = cpu.resolve_ea(bus, AddrMode::PreDec(ry as u8), size);
        let src = cpu.ea_read(bus, src_ea, size);
        let dst_ea = cpu.resolve_ea(bus, AddrMode::PreDec(rx as u8), size);
        let dst = cpu.ea_read(bus, dst_ea, size);
        if cpu.faulted() {
            return;
        }
        (src, dst, dst_ea)
    } else {
        (
            cpu.d(ry) & size.mask(),
            cpu.d(rx) & size.mask(),
            Ea::DataReg(rx as u8),
        )
    };

    let mask = size.mask();
    let msb = size.msb_mask();
    let x = if cpu.flag_x() { 1u64 } else { 0 };
    let s = (src & mask) as u64;
    let d = (dst & mask) as u64;
    let (r, carry, v) = match op {
        ArithOp::Add => {
            let sum = d + s + x;
            let r = (sum as u32) & mask;
            let v = (src ^ r) & (dst ^ r) & msb != 0;
            (r, sum > mask as u64, v)
        }
        ArithOp::Sub => {
            let sub = s + x;
            let r = (d.wrapping_sub(sub) as u32) & mask;
            let v = (src ^ dst) & (r ^ dst) & msb != 0;
            (r, sub > d, v)
        }
    };

    cpu.n_flag = if r & msb != 0 { NFLAG_SET } else { 0 };
    if r != 0 {
        cpu.not_z_flag = r;
    }
    cpu.v_flag = if v { VFLAG_SET } else { 0 };
    cpu.c_flag = if carry { CFLAG_SET } else { 0 };
    cpu.x_flag = cpu.c_flag;

    cpu.ea_write(bus, dst_ea, size, r);
}

/// CMP `<ea>,Dn`.
pub(crate) fn cmp(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = size_bits(opcode);
    let reg = ((opcode >> 9) & 7) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if size == Size::Byte && matches!(mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, size);
    let src = cpu.ea_read(bus, ea, size);
    if cpu.faulted() {
        return;
    }
    let dst = cpu.d(reg) & size.mask();
    let result = dst.wrapping_sub(src);
    cpu.set_cmp_flags(src, dst, result, size);
}

/// CMPA `<ea>,An`: always a 32-bit compare, word source sign-extended.
pub(crate) fn cmpa(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = if opcode & 0x0100 != 0 {
        Size::Long
    } else {
        Size::Word
    };
    let reg = ((opcode >> 9) & 7) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    let ea = cpu.resolve_ea(bus, mode, size);
    let src = size.sign_extend(cpu.ea_read(bus, ea, size));
    if cpu.faulted() {
        return;
    }
    let dst = cpu.a(reg);
    let result = dst.wrapping_sub(src);
    cpu.set_cmp_flags(src, dst, result, Size::Long);
}

/// CMPM `(Ay)+,(Ax)+`.
pub(crate) fn cmpm(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = size_bits(opcode);
    let rx = ((opcode >> 9) & 7) as u8;
    let ry = (opcode & 7) as u8;
    let src_ea = cpu.resolve_ea(bus, AddrMode::PostInc(ry), size);
    let src = cpu.ea_read(bus, src_ea, size);
    let dst_ea = cpu.resolve_ea(bus, AddrMode::PostInc(rx), size);
    let dst = cpu.ea_read(bus, dst_ea, size);
    if cpu.faulted() {
        return;
    }
    let result = dst.wrapping_sub(src);
    cpu.set_cmp_flags(src, dst, result, size);
}

/// NEG `<ea>`: 0 - dst.
pub(crate) fn neg(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = size_bits(opcode);
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) || !mode.is_alterable() {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, size);
    let dst = cpu.ea_read(bus, ea, size);
    if cpu.faulted() {
        return;
    }
    let result = 0u32.wrapping_sub(dst);
    cpu.set_sub_flags(dst, 0, result, size);
    cpu.ea_write(bus, ea, size, result);
}

/// NEGX `<ea>`: 0 - dst - X; Z only ever cleared.
pub(crate) fn negx(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = size_bits(opcode);
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) || !mode.is_alterable() {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, size);
    let dst = cpu.ea_read(bus, ea, size);
    if cpu.faulted() {
        return;
    }
    let mask = size.mask();
    let msb = size.msb_mask();
    let x = if cpu.flag_x() { 1u64 } else { 0 };
    let sub = (dst & mask) as u64 + x;
    let r = (0u64.wrapping_sub(sub) as u32) & mask;
    cpu.n_flag = if r & msb != 0 { NFLAG_SET } else { 0 };
    if r != 0 {
        cpu.not_z_flag = r;
    }
    cpu.v_flag = if (dst & r & msb) != 0 { VFLAG_SET } else { 0 };
    cpu.c_flag = if sub > 0 { CFLAG_SET } else { 0 };
    cpu.x_flag = cpu.c_flag;
    cpu.ea_write(bus, ea, size, r);
}

/// CLR `<ea>`: writes zero; N/V/C clear, Z set. The 68000 performs a read
/// cycle first, observable on the bus but not here.
pub(crate) fn clr(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = size_bits(opcode);
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) || !mode.is_alterable() {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, size);
    if cpu.faulted() {
        return;
    }
    cpu.n_flag = 0;
    cpu.not_z_flag = 0;
    cpu.v_flag = 0;
    cpu.c_flag = 0;
    cpu.ea_write(bus, ea, size, 0);
}

/// EXT.W / EXT.L / EXTB.L (EXTB on 68020+).
pub(crate) fn ext(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let reg = (opcode & 7) as usize;
    let value = cpu.d(reg);
    let (result, size) = match (opcode >> 6) & 7 {
        2 => (value as u8 as i8 as i16 as u16 as u32, Size::Word),
        3 => (value as u16 as i16 as i32 as u32, Size::Long),
        7 => {
            if !cpu.cpu_type.is_020_plus() {
                return cpu.exception_illegal(bus);
            }
            (value as u8 as i8 as i32 as u32, Size::Long)
        }
        _ => return cpu.exception_illegal(bus),
    };
    cpu.set_logic_flags(result, size);
    cpu.ea_write(bus, Ea::DataReg(reg as u8), size, result);
}

/// TST `<ea>`. An/PC-relative/immediate operands arrived with the 68020.
pub(crate) fn tst(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = size_bits(opcode);
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    let extended = matches!(
        mode,
        AddrMode::AddressDirect(_) | AddrMode::PcDisplacement | AddrMode::PcIndexed | AddrMode::Immediate
    );
    if extended && !cpu.cpu_type.is_020_plus() {
        return cpu.exception_illegal(bus);
    }
    if size == Size::Byte && matches!(mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, size);
    let value = cpu.ea_read(bus, ea, size);
    if cpu.faulted() {
        return;
    }
    cpu.set_logic_flags(value, size);
}
