//! Shift and rotate: ASL/ASR, LSL/LSR, ROL/ROR, ROXL/ROXR in register and
//! memory forms.

use super::size_bits;
use crate::core::cpu::{CFLAG_SET, Cpu, NFLAG_SET, VFLAG_SET, XFLAG_SET};
use crate::core::ea::AddrMode;
use crate::core::memory::Bus;
use crate::core::types::Size;

#[derive(Clone, Copy, PartialEq)]
enum ShiftOp {
    Arithmetic,
    Logical,
    RotateX,
    Rotate,
}

/// Register-form shifts: count from the opcode (1-8) or a data register
/// (mod 64). Charges the per-step surcharge.
pub(crate) fn shift_reg(cpu: &mut Cpu, _bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = size_bits(opcode);
    let reg = (opcode & 7) as usize;
    let left = opcode & 0x0100 != 0;
    let op = match (opcode >> 3) & 3 {
        0 => ShiftOp::Arithmetic,
        1 => ShiftOp::Logical,
        2 => ShiftOp::RotateX,
        _ => ShiftOp::Rotate,
    };
    let count = if opcode & 0x0020 != 0 {
        cpu.d(((opcode >> 9) & 7) as usize) & 63
    } else {
        let c = ((opcode >> 9) & 7) as u32;
        if c == 0 { 8 } else { c }
    };

    let value = cpu.d(reg) & size.mask();
    let result = perform(cpu, op, left, value, count, size);
    let surcharge = cpu.cyc_shift * count as i32;
    cpu.use_cycles(surcharge);
    let merged = (cpu.d(reg) & !size.mask()) | (result & size.mask());
    cpu.set_d(reg, merged);
}

/// Memory-form shifts: word operand, single step.
pub(crate) fn shift_mem(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let left = opcode & 0x0100 != 0;
    let op = match (opcode >> 9) & 3 {
        0 => ShiftOp::Arithmetic,
        1 => ShiftOp::Logical,
        2 => ShiftOp::RotateX,
        _ => ShiftOp::Rotate,
    };
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if mode.is_register() || !mode.is_alterable() {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, Size::Word);
    let value = cpu.ea_read(bus, ea, Size::Word);
    if cpu.faulted() {
        return;
    }
    let result = perform(cpu, op, left, value, 1, Size::Word);
    cpu.ea_write(bus, ea, Size::Word, result);
}

fn perform(cpu: &mut Cpu, op: ShiftOp, left: bool, value: u32, count: u32, size: Size) -> u32 {
    match op {
        ShiftOp::Arithmetic => {
            if left {
                asl(cpu, value, count, size)
            } else {
                asr(cpu, value, count, size)
            }
        }
        ShiftOp::Logical => {
            if left {
                lsl(cpu, value, count, size)
            } else {
                lsr(cpu, value, count, size)
            }
        }
        ShiftOp::RotateX => {
            if left {
                roxl(cpu, value, count, size)
            } else {
                roxr(cpu, value, count, size)
            }
        }
        ShiftOp::Rotate => {
            if left {
                rol(cpu, value, count, size)
            } else {
                ror(cpu, value, count, size)
            }
        }
    }
}

#[inline]
fn set_nz(cpu: &mut Cpu, result: u32, size: Size) {
    cpu.n_flag = if result & size.msb_mask() != 0 {
        NFLAG_SET
    } else {
        0
    };
    cpu.not_z_flag = result & size.mask();
}

fn asr(cpu: &mut Cpu, value: u32, count: u32, size: Size) -> u32 {
    let bits = size.bytes() * 8;
    let mask = size.mask();
    let sign = value & size.msb_mask() != 0;
    if count == 0 {
        set_nz(cpu, value, size);
        cpu.v_flag = 0;
        cpu.c_flag = 0;
        return value;
    }
    let (result, last_out) = if count >= bits {
        let r = if sign { mask } else { 0 };
        (r, sign)
    } else {
        let extended = size.sign_extend(value) as i32;
        let r = (extended >> count) as u32 & mask;
        let last = (extended >> (count - 1)) & 1 != 0;
        (r, last)
    };
    set_nz(cpu, result, size);
    cpu.v_flag = 0;
    cpu.c_flag = if last_out { CFLAG_SET } else { 0 };
    cpu.x_flag = cpu.c_flag;
    result
}

fn asl(cpu: &mut Cpu, value: u32, count: u32, size: Size) -> u32 {
    let bits = size.bytes() * 8;
    let mask = size.mask();
    let msb = size.msb_mask();
    if count == 0 {
        set_nz(cpu, value, size);
        cpu.v_flag = 0;
        cpu.c_flag = 0;
        return value;
    }
    let (result, last_out, overflow) = if count >= bits {
        // Every data bit passes through the sign position.
        let last = if count == bits { value & 1 != 0 } else { false };
        (0, last, value & mask != 0)
    } else {
        let r = (value << count) & mask;
        let last = value & (msb >> (count - 1)) != 0;
        // V set if the sign changed at any point during the shift.
        let sign_run_mask = (mask << (bits - count - 1)) & mask;
        let run = value & sign_run_mask;
        let overflow = run != 0 && run != sign_run_mask;
        (r, last, overflow)
    };
    set_nz(cpu, result, size);
    cpu.v_flag = if overflow { VFLAG_SET } else { 0 };
    cpu.c_flag = if last_out { CFLAG_SET } else { 0 };
    cpu.x_flag = cpu.c_flag;
    result
}

fn lsr(cpu: &mut Cpu, value: u32, count: u32, size: Size) -> u32 {
    if count == 0 {
        set_nz(cpu, value, size);
        cpu.v_flag = 0;
        cpu.c_flag = 0;
        return value;
    }
    let bits = size.bytes() * 8;
    let masked = value & size.mask();
    let (result, last_out) = if count > bits {
        (0, false)
    } else if count == bits {
        (0, masked & size.msb_mask() != 0)
    } else {
        (masked >> count, masked & (1 << (count - 1)) != 0)
    };
    set_nz(cpu, result, size);
    cpu.v_flag = 0;
    cpu.c_flag = if last_out { CFLAG_SET } else { 0 };
    cpu.x_flag = cpu.c_flag;
    result
}

fn lsl(cpu: &mut Cpu, value: u32, count: u32, size: Size) -> u32 {
    if count == 0 {
        set_nz(cpu, value, size);
        cpu.v_flag = 0;
        cpu.c_flag = 0;
        return value;
    }
    let bits = size.bytes() * 8;
    let masked = value & size.mask();
    let (result, last_out) = if count > bits {
        (0, false)
    } else if count == bits {
        (0, masked & 1 != 0)
    } else {
        (
            (masked << count) & size.mask(),
            masked & (size.msb_mask() >> (count - 1)) != 0,
        )
    };
    set_nz(cpu, result, size);
    cpu.v_flag = 0;
    cpu.c_flag = if last_out { CFLAG_SET } else { 0 };
    cpu.x_flag = cpu.c_flag;
    result
}

fn ror(cpu: &mut Cpu, value: u32, count: u32, size: Size) -> u32 {
    let bits = size.bytes() * 8;
    let masked = value & size.mask();
    if count == 0 {
        set_nz(cpu, masked, size);
        cpu.v_flag = 0;
        cpu.c_flag = 0;
        return masked;
    }
    let shift = count % bits;
    let result = if shift == 0 {
        masked
    } else {
        ((masked >> shift) | (masked << (bits - shift))) & size.mask()
    };
    set_nz(cpu, result, size);
    cpu.v_flag = 0;
    // C is the last bit rotated out of bit 0 (now the MSB of the result).
    cpu.c_flag = if result & size.msb_mask() != 0 {
        CFLAG_SET
    } else {
        0
    };
    result
}

fn rol(cpu: &mut Cpu, value: u32, count: u32, size: Size) -> u32 {
    let bits = size.bytes() * 8;
    let masked = value & size.mask();
    if count == 0 {
        set_nz(cpu, masked, size);
        cpu.v_flag = 0;
        cpu.c_flag = 0;
        return masked;
    }
    let shift = count % bits;
    let result = if shift == 0 {
        masked
    } else {
        ((masked << shift) | (masked >> (bits - shift))) & size.mask()
    };
    set_nz(cpu, result, size);
    cpu.v_flag = 0;
    cpu.c_flag = if result & 1 != 0 { CFLAG_SET } else { 0 };
    result
}

fn roxr(cpu: &mut Cpu, value: u32, count: u32, size: Size) -> u32 {
    let bits = size.bytes() * 8;
    let masked = value & size.mask();
    if count == 0 {
        set_nz(cpu, masked, size);
        cpu.v_flag = 0;
        cpu.c_flag = if cpu.flag_x() { CFLAG_SET } else { 0 };
        return masked;
    }
    // Rotation through X is over bits+1 positions.
    let count = count % (bits + 1);
    let mut result = masked;
    let mut x = cpu.flag_x();
    for _ in 0..count {
        let out = result & 1 != 0;
        result >>= 1;
        if x {
            result |= size.msb_mask();
        }
        x = out;
    }
    set_nz(cpu, result, size);
    cpu.v_flag = 0;
    cpu.x_flag = if x { XFLAG_SET } else { 0 };
    cpu.c_flag = if x { CFLAG_SET } else { 0 };
    result
}

fn roxl(cpu: &mut Cpu, value: u32, count: u32, size: Size) -> u32 {
    let bits = size.bytes() * 8;
    let masked = value & size.mask();
    if count == 0 {
        set_nz(cpu, masked, size);
        cpu.v_flag = 0;
        cpu.c_flag = if cpu.flag_x() { CFLAG_SET } else { 0 };
        return masked;
    }
    let count = count % (bits + 1);
    let mut result = masked;
    let mut x = cpu.flag_x();
    for _ in 0..count {
        let out = result & size.msb_mask() != 0;
        result = (result << 1) & size.mask();
        if x {
            result |= 1;
        }
        x = out;
    }
    set_nz(cpu, result, size);
    cpu.v_flag = 0;
    cpu.x_flag = if x { XFLAG_SET } else { 0 };
    cpu.c_flag = if x { CFLAG_SET } else { 0 };
    result
}
