//! 68020+ bit field operations.
//!
//! Register fields wrap modulo 32; memory fields address bits downward
//! from bit 7 of the base byte and may span up to five bytes.

use crate::core::cpu::{Cpu, NFLAG_SET};
use crate::core::ea::AddrMode;
use crate::core::memory::Bus;
use crate::core::types::Size;

#[derive(Clone, Copy, PartialEq)]
enum BfOp {
    Tst,
    Extu,
    Chg,
    Exts,
    Clr,
    Ffo,
    Set,
    Ins,
}

/// Dispatch for the eight 0xE8C0-0xEFC0 encodings.
pub(crate) fn bitfield(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_020_plus() {
        return cpu.exception_illegal(bus);
    }
    let opcode = cpu.ir as u16;
    let op = match (opcode >> 8) & 7 {
        0 => BfOp::Tst,
        1 => BfOp::Extu,
        2 => BfOp::Chg,
        3 => BfOp::Exts,
        4 => BfOp::Clr,
        5 => BfOp::Ffo,
        6 => BfOp::Set,
        _ => BfOp::Ins,
    };
    let ext = cpu.read_imm_16(bus);
    if cpu.faulted() {
        return;
    }
    let offset: i32 = if ext & 0x0800 != 0 {
        cpu.d(((ext >> 6) & 7) as usize) as i32
    } else {
        ((ext >> 6) & 31) as i32
    };
    let width: u32 = {
        let w = if ext & 0x0020 != 0 {
            cpu.d((ext & 7) as usize) & 31
        } else {
            (ext & 31) as u32
        };
        if w == 0 { 32 } else { w }
    };
    let dn = ((ext >> 12) & 7) as usize;

    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };

    let modifies = matches!(op, BfOp::Chg | BfOp::Clr | BfOp::Set | BfOp::Ins);

    match mode {
        AddrMode::DataDirect(reg) => {
            let reg = reg as usize;
            let value = cpu.d(reg);
            // Register fields rotate: offset is taken modulo 32.
            let rot = value.rotate_left((offset as u32) & 31);
            let field = if width == 32 { rot } else { rot >> (32 - width) };
            set_bf_flags(cpu, field, width);
            let result = match op {
                BfOp::Tst | BfOp::Extu | BfOp::Exts | BfOp::Ffo => {
                    bf_read_result(cpu, op, field, width, offset, dn);
                    return;
                }
                BfOp::Chg => bf_apply(rot, width, FieldWrite::Invert),
                BfOp::Clr => bf_apply(rot, width, FieldWrite::Clear),
                BfOp::Set => bf_apply(rot, width, FieldWrite::Set),
                BfOp::Ins => {
                    let ins = cpu.d(dn) & width_mask(width);
                    set_bf_flags(cpu, ins, width);
                    bf_apply_insert(rot, width, ins)
                }
            };
            cpu.set_d(reg, result.rotate_right((offset as u32) & 31));
        }
        m if m.is_control() && (m.is_alterable() || !modifies) => {
            let base = cpu.ea_address(bus, m, Size::Byte);
            if cpu.faulted() {
                return;
            }
            // Negative offsets walk backwards through memory.
            let byte_addr = (base as i64 + (offset as i64 >> 3)) as u32;
            let bit_offset = (offset & 7) as u32;
            let span_bytes = (bit_offset + width).div_ceil(8);

            let mut data: u64 = 0;
            for i in 0..span_bytes {
                data = (data << 8) | cpu.read_8(bus, byte_addr.wrapping_add(i)) as u64;
            }
            if cpu.faulted() {
                return;
            }
            let total_bits = span_bytes * 8;
            let shift = total_bits - bit_offset - width;
            let field = ((data >> shift) as u32) & width_mask(width);
            set_bf_flags(cpu, field, width);

            let new_field: u32 = match op {
                BfOp::Tst | BfOp::Extu | BfOp::Exts | BfOp::Ffo => {
                    bf_read_result(cpu, op, field, width, offset, dn);
                    return;
                }
                BfOp::Chg => !field & width_mask(width),
                BfOp::Clr => 0,
                BfOp::Set => width_mask(width),
                BfOp::Ins => {
                    let ins = cpu.d(dn) & width_mask(width);
                    set_bf_flags(cpu, ins, width);
                    ins
                }
            };
            let field_mask = (width_mask(width) as u64) << shift;
            let new_data = (data & !field_mask) | ((new_field as u64) << shift);
            for i in 0..span_bytes {
                let byte = (new_data >> ((span_bytes - 1 - i) * 8)) as u8;
                cpu.write_8(bus, byte_addr.wrapping_add(i), byte);
            }
        }
        _ => cpu.exception_illegal(bus),
    }
}

#[inline]
fn width_mask(width: u32) -> u32 {
    if width == 32 { !0 } else { (1 << width) - 1 }
}

fn set_bf_flags(cpu: &mut Cpu, field: u32, width: u32) {
    cpu.n_flag = if field & (1 << (width - 1)) != 0 {
        NFLAG_SET
    } else {
        0
    };
    cpu.not_z_flag = field;
    cpu.v_flag = 0;
    cpu.c_flag = 0;
}

/// Results of the read-style ops that target Dn.
fn bf_read_result(cpu: &mut Cpu, op: BfOp, field: u32, width: u32, offset: i32, dn: usize) {
    match op {
        BfOp::Extu => cpu.set_d(dn, field),
        BfOp::Exts => {
            let sign = 1u32 << (width - 1);
            let value = if field & sign != 0 {
                field | !width_mask(width)
            } else {
                field
            };
            cpu.set_d(dn, value);
        }
        BfOp::Ffo => {
            // Absolute field offset of the first set bit, from the MSB.
            let mut scan = width;
            for i in 0..width {
                if field & (1 << (width - 1 - i)) != 0 {
                    scan = i;
                    break;
                }
            }
            cpu.set_d(dn, (offset as u32).wrapping_add(scan));
        }
        _ => {}
    }
}

enum FieldWrite {
    Invert,
    Clear,
    Set,
}

/// Modify the top `width` bits of a rotated register value.
fn bf_apply(rot: u32, width: u32, write: FieldWrite) -> u32 {
    let mask = if width == 32 {
        !0
    } else {
        width_mask(width) << (32 - width)
    };
    match write {
        FieldWrite::Invert => rot ^ mask,
        FieldWrite::Clear => rot & !mask,
        FieldWrite::Set => rot | mask,
    }
}

fn bf_apply_insert(rot: u32, width: u32, ins: u32) -> u32 {
    if width == 32 {
        return ins;
    }
    let mask = width_mask(width) << (32 - width);
    (rot & !mask) | (ins << (32 - width))
}
