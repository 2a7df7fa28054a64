//! Multiply and divide, word forms plus the 68020 long forms.

use crate::core::cpu::{Cpu, NFLAG_SET, VFLAG_SET};
use crate::core::ea::AddrMode;
use crate::core::memory::Bus;
use crate::core::types::Size;

/// MULU.W `<ea>,Dn`: 16x16 -> 32.
pub(crate) fn mulu(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let reg = ((opcode >> 9) & 7) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, Size::Word);
    let src = cpu.ea_read(bus, ea, Size::Word);
    if cpu.faulted() {
        return;
    }
    let result = (src & 0xFFFF) * (cpu.d(reg) & 0xFFFF);
    cpu.set_logic_flags(result, Size::Long);
    cpu.set_d(reg, result);
}

/// MULS.W `<ea>,Dn`: signed 16x16 -> 32.
pub(crate) fn muls(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let reg = ((opcode >> 9) & 7) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, Size::Word);
    let src = cpu.ea_read(bus, ea, Size::Word);
    if cpu.faulted() {
        return;
    }
    let result =
        ((src as u16 as i16 as i32) * (cpu.d(reg) as u16 as i16 as i32)) as u32;
    cpu.set_logic_flags(result, Size::Long);
    cpu.set_d(reg, result);
}

/// DIVU.W `<ea>,Dn`: 32/16 -> 16r:16q. Divide by zero traps without
/// touching the destination; quotient overflow just sets V.
pub(crate) fn divu(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let reg = ((opcode >> 9) & 7) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, Size::Word);
    let src = cpu.ea_read(bus, ea, Size::Word) & 0xFFFF;
    if cpu.faulted() {
        return;
    }
    if src == 0 {
        return cpu.exception_zero_divide(bus);
    }
    let dst = cpu.d(reg);
    let quotient = dst / src;
    let remainder = dst % src;
    if quotient > 0xFFFF {
        cpu.v_flag = VFLAG_SET;
        cpu.n_flag = NFLAG_SET;
        cpu.c_flag = 0;
        return;
    }
    cpu.set_logic_flags(quotient, Size::Word);
    cpu.set_d(reg, (remainder << 16) | (quotient & 0xFFFF));
}

/// DIVS.W `<ea>,Dn`: signed 32/16.
pub(crate) fn divs(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let reg = ((opcode >> 9) & 7) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, Size::Word);
    let src = cpu.ea_read(bus, ea, Size::Word) as u16 as i16 as i32;
    if cpu.faulted() {
        return;
    }
    if src == 0 {
        return cpu.exception_zero_divide(bus);
    }
    let dst = cpu.d(reg) as i32;
    // i32::MIN / -1 overflows in both senses.
    if dst == i32::MIN && src == -1 {
        cpu.v_flag = VFLAG_SET;
        cpu.n_flag = NFLAG_SET;
        cpu.c_flag = 0;
        return;
    }
    let quotient = dst / src;
    let remainder = dst % src;
    if quotient > 0x7FFF || quotient < -0x8000 {
        cpu.v_flag = VFLAG_SET;
        cpu.n_flag = NFLAG_SET;
        cpu.c_flag = 0;
        return;
    }
    cpu.set_logic_flags(quotient as u32, Size::Word);
    cpu.set_d(
        reg,
        ((remainder as u32) << 16) | (quotient as u32 & 0xFFFF),
    );
}

/// MULU.L/MULS.L (68020+): 32x32 -> 32 or 64.
pub(crate) fn mul_long(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_020_plus() {
        return cpu.exception_illegal(bus);
    }
    let opcode = cpu.ir as u16;
    let ext = cpu.read_imm_16(bus);
    if cpu.faulted() {
        return;
    }
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }
    let dl = ((ext >> 12) & 7) as usize;
    let dh = (ext & 7) as usize;
    let signed = ext & 0x0800 != 0;
    let wide = ext & 0x0400 != 0;

    let ea = cpu.resolve_ea(bus, mode, Size::Long);
    let src = cpu.ea_read(bus, ea, Size::Long);
    if cpu.faulted() {
        return;
    }
    let dst = cpu.d(dl);

    let product: u64 = if signed {
        ((src as i32 as i64) * (dst as i32 as i64)) as u64
    } else {
        (src as u64) * (dst as u64)
    };
    let low = product as u32;
    let high = (product >> 32) as u32;

    if wide {
        cpu.set_d(dh, high);
        cpu.set_d(dl, low);
        cpu.n_flag = if high & 0x8000_0000 != 0 { NFLAG_SET } else { 0 };
        cpu.not_z_flag = high | low;
        cpu.v_flag = 0;
        cpu.c_flag = 0;
    } else {
        cpu.set_d(dl, low);
        let overflow = if signed {
            product as i64 != low as i32 as i64
        } else {
            high != 0
        };
        cpu.n_flag = if low & 0x8000_0000 != 0 { NFLAG_SET } else { 0 };
        cpu.not_z_flag = low;
        cpu.v_flag = if overflow { VFLAG_SET } else { 0 };
        cpu.c_flag = 0;
    }
}

/// DIVU.L/DIVS.L (68020+): 32/32 or 64/32.
pub(crate) fn div_long(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_020_plus() {
        return cpu.exception_illegal(bus);
    }
    let opcode = cpu.ir as u16;
    let ext = cpu.read_imm_16(bus);
    if cpu.faulted() {
        return;
    }
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }
    let dq = ((ext >> 12) & 7) as usize;
    let dr = (ext & 7) as usize;
    let signed = ext & 0x0800 != 0;
    let wide = ext & 0x0400 != 0;

    let ea = cpu.resolve_ea(bus, mode, Size::Long);
    let divisor = cpu.ea_read(bus, ea, Size::Long);
    if cpu.faulted() {
        return;
    }
    if divisor == 0 {
        return cpu.exception_zero_divide(bus);
    }

    if signed {
        let divisor = divisor as i32 as i64;
        let dividend: i64 = if wide {
            ((cpu.d(dr) as u64) << 32 | cpu.d(dq) as u64) as i64
        } else {
            cpu.d(dq) as i32 as i64
        };
        if dividend == i64::MIN && divisor == -1 {
            cpu.v_flag = VFLAG_SET;
            cpu.c_flag = 0;
            return;
        }
        let quotient = dividend / divisor;
        let remainder = dividend % divisor;
        if quotient > i32::MAX as i64 || quotient < i32::MIN as i64 {
            cpu.v_flag = VFLAG_SET;
            cpu.c_flag = 0;
            return;
        }
        if dr != dq {
            cpu.set_d(dr, remainder as u32);
        }
        cpu.set_d(dq, quotient as u32);
        cpu.set_logic_flags(quotient as u32, Size::Long);
    } else {
        let divisor = divisor as u64;
        let dividend: u64 = if wide {
            (cpu.d(dr) as u64) << 32 | cpu.d(dq) as u64
        } else {
            cpu.d(dq) as u64
        };
        let quotient = dividend / divisor;
        let remainder = dividend % divisor;
        if quotient > u32::MAX as u64 {
            cpu.v_flag = VFLAG_SET;
            cpu.c_flag = 0;
            return;
        }
        if dr != dq {
            cpu.set_d(dr, remainder as u32);
        }
        cpu.set_d(dq, quotient as u32);
        cpu.set_logic_flags(quotient as u32, Size::Long);
    }
}
