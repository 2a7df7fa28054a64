//! Data movement: MOVE and friends, MOVEM, LEA/PEA, EXG, SWAP, LINK/UNLK,
//! TAS, Scc, the SR/CCR/USP moves, MOVE16.

use crate::core::cpu::Cpu;
use crate::core::ea::{AddrMode, Ea};
use crate::core::memory::Bus;
use crate::core::timing::move_dst_cycles;
use crate::core::types::Size;

/// MOVE `<ea>,<ea>`: source read, flags, destination write. The
/// predecrement long destination keeps the high-word-first write order.
pub(crate) fn r#move(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = match (opcode >> 12) & 3 {
        1 => Size::Byte,
        3 => Size::Word,
        _ => Size::Long,
    };
    let Some(src_mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    let Some(dst_mode) = AddrMode::decode(((opcode >> 6) & 7) as u8, ((opcode >> 9) & 7) as u8)
    else {
        return cpu.exception_illegal(bus);
    };
    if size == Size::Byte && matches!(src_mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }
    if !dst_mode.is_alterable() || matches!(dst_mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }

    let src_ea = cpu.resolve_ea(bus, src_mode, size);
    let value = cpu.ea_read(bus, src_ea, size);
    if cpu.faulted() {
        return;
    }
    cpu.set_logic_flags(value, size);

    let dst_ea = cpu.resolve_ea(bus, dst_mode, size);
    if cpu.faulted() {
        return;
    }
    if size == Size::Long
        && matches!(dst_mode, AddrMode::PreDec(_))
        && matches!(dst_ea, Ea::Memory(_))
    {
        if let Ea::Memory(addr) = dst_ea {
            let fc = cpu.data_fc();
            cpu.write_32_fc_predec(bus, addr, fc, value);
            return;
        }
    }
    cpu.ea_write(bus, dst_ea, size, value);
}

/// MOVEA `<ea>,An`: no flags, word source sign-extended.
pub(crate) fn movea(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = if (opcode >> 12) & 3 == 3 {
        Size::Word
    } else {
        Size::Long
    };
    let reg = ((opcode >> 9) & 7) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    let ea = cpu.resolve_ea(bus, mode, size);
    let value = size.sign_extend(cpu.ea_read(bus, ea, size));
    if cpu.faulted() {
        return;
    }
    cpu.set_a(reg, value);
}

/// MOVEQ `#d8,Dn`.
pub(crate) fn moveq(cpu: &mut Cpu, _bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let reg = ((opcode >> 9) & 7) as usize;
    let value = opcode as u8 as i8 as i32 as u32;
    cpu.set_logic_flags(value, Size::Long);
    cpu.set_d(reg, value);
}

/// MOVEM registers to memory (control alterable or predecrement).
pub(crate) fn movem_to_mem(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = if opcode & 0x0040 != 0 {
        Size::Long
    } else {
        Size::Word
    };
    let mask = cpu.read_imm_16(bus);
    if cpu.faulted() {
        return;
    }
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };

    let step = size.bytes();
    let per_reg = if size == Size::Long {
        cpu.cyc_movem_l
    } else {
        cpu.cyc_movem_w
    };

    match mode {
        AddrMode::PreDec(areg) => {
            // Mask bit 0 = A7 ... bit 15 = D0; stored descending.
            let mut addr = cpu.a(areg as usize);
            for bit in 0..16usize {
                if mask & (1 << bit) == 0 {
                    continue;
                }
                let value = cpu.dar[15 - bit];
                addr = addr.wrapping_sub(step);
                match size {
                    Size::Word => cpu.write_16(bus, addr, value as u16),
                    _ => cpu.write_32(bus, addr, value),
                }
                if cpu.faulted() {
                    return;
                }
                cpu.use_cycles(per_reg);
            }
            cpu.set_a(areg as usize, addr);
        }
        m if m.is_control() && m.is_alterable() => {
            let mut addr = cpu.ea_address(bus, m, size);
            if cpu.faulted() {
                return;
            }
            for bit in 0..16usize {
                if mask & (1 << bit) == 0 {
                    continue;
                }
                let value = cpu.dar[bit];
                match size {
                    Size::Word => cpu.write_16(bus, addr, value as u16),
                    _ => cpu.write_32(bus, addr, value),
                }
                if cpu.faulted() {
                    return;
                }
                addr = addr.wrapping_add(step);
                cpu.use_cycles(per_reg);
            }
        }
        _ => cpu.exception_illegal(bus),
    }
}

/// MOVEM memory to registers (control or postincrement); words
/// sign-extend into the full register.
pub(crate) fn movem_to_reg(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = if opcode & 0x0040 != 0 {
        Size::Long
    } else {
        Size::Word
    };
    let mask = cpu.read_imm_16(bus);
    if cpu.faulted() {
        return;
    }
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };

    let step = size.bytes();
    let per_reg = if size == Size::Long {
        cpu.cyc_movem_l
    } else {
        cpu.cyc_movem_w
    };

    let (mut addr, postinc_reg) = match mode {
        AddrMode::PostInc(areg) => (cpu.a(areg as usize), Some(areg as usize)),
        m if m.is_control() => {
            let a = cpu.ea_address(bus, m, size);
            if cpu.faulted() {
                return;
            }
            (a, None)
        }
        _ => return cpu.exception_illegal(bus),
    };

    for bit in 0..16usize {
        if mask & (1 << bit) == 0 {
            continue;
        }
        let value = match size {
            Size::Word => cpu.read_16(bus, addr) as u16 as i16 as i32 as u32,
            _ => cpu.read_32(bus, addr),
        };
        if cpu.faulted() {
            return;
        }
        cpu.dar[bit] = value;
        addr = addr.wrapping_add(step);
        cpu.use_cycles(per_reg);
    }
    if let Some(areg) = postinc_reg {
        cpu.set_a(areg, addr);
    }
}

/// LEA `<ea>,An`.
pub(crate) fn lea(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let reg = ((opcode >> 9) & 7) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if !mode.is_control() {
        return cpu.exception_illegal(bus);
    }
    let addr = cpu.ea_address(bus, mode, Size::Long);
    if cpu.faulted() {
        return;
    }
    cpu.set_a(reg, addr);
}

/// PEA `<ea>`.
pub(crate) fn pea(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if !mode.is_control() {
        return cpu.exception_illegal(bus);
    }
    let addr = cpu.ea_address(bus, mode, Size::Long);
    if cpu.faulted() {
        return;
    }
    cpu.push_32(bus, addr);
}

/// EXG: swap two full registers, no flags.
pub(crate) fn exg(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let rx = ((opcode >> 9) & 7) as usize;
    let ry = (opcode & 7) as usize;
    match (opcode >> 3) & 0x1F {
        0x08 => cpu.dar.swap(rx, ry),
        0x09 => cpu.dar.swap(8 + rx, 8 + ry),
        0x11 => cpu.dar.swap(rx, 8 + ry),
        _ => cpu.exception_illegal(bus),
    }
}

/// SWAP Dn: exchange halves, flags on the 32-bit result.
pub(crate) fn swap(cpu: &mut Cpu, _bus: &mut dyn Bus) {
    let reg = (cpu.ir & 7) as usize;
    let value = cpu.d(reg).rotate_left(16);
    cpu.set_logic_flags(value, Size::Long);
    cpu.set_d(reg, value);
}

/// LINK.W `An,#d16`.
pub(crate) fn link_w(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let reg = (cpu.ir & 7) as usize;
    let disp = cpu.read_imm_16(bus) as i16 as i32;
    if cpu.faulted() {
        return;
    }
    let value = cpu.a(reg);
    cpu.push_32(bus, value);
    if cpu.faulted() {
        return;
    }
    cpu.set_a(reg, cpu.dar[15]);
    cpu.dar[15] = (cpu.dar[15] as i32).wrapping_add(disp) as u32;
}

/// LINK.L `An,#d32` (68020+).
pub(crate) fn link_l(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_020_plus() {
        return cpu.exception_illegal(bus);
    }
    let reg = (cpu.ir & 7) as usize;
    let disp = cpu.read_imm_32(bus) as i32;
    if cpu.faulted() {
        return;
    }
    let value = cpu.a(reg);
    cpu.push_32(bus, value);
    if cpu.faulted() {
        return;
    }
    cpu.set_a(reg, cpu.dar[15]);
    cpu.dar[15] = (cpu.dar[15] as i32).wrapping_add(disp) as u32;
}

/// UNLK `An`.
pub(crate) fn unlk(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let reg = (cpu.ir & 7) as usize;
    cpu.dar[15] = cpu.a(reg);
    let value = cpu.pull_32(bus);
    if cpu.faulted() {
        return;
    }
    cpu.set_a(reg, value);
}

/// TAS `<ea>`: test byte, then set bit 7 in a locked cycle. The host can
/// veto the write-back, as machines with open TAS bus logic do.
pub(crate) fn tas(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) || !mode.is_alterable() {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, Size::Byte);
    let value = cpu.ea_read(bus, ea, Size::Byte);
    if cpu.faulted() {
        return;
    }
    cpu.set_logic_flags(value, Size::Byte);
    let allow = if matches!(ea, Ea::DataReg(_)) {
        true
    } else {
        bus.tas_writeback()
    };
    if allow {
        cpu.ea_write(bus, ea, Size::Byte, value | 0x80);
    }
}

/// Scc `<ea>`: all-ones or all-zeros byte from the condition.
pub(crate) fn scc(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let cond = ((opcode >> 8) & 0xF) as u8;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) || !mode.is_alterable() {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, Size::Byte);
    if cpu.faulted() {
        return;
    }
    let truth = cpu.test_condition(cond);
    if truth && matches!(ea, Ea::DataReg(_)) {
        let surcharge = cpu.cyc_scc_r_true;
        cpu.use_cycles(surcharge);
    }
    cpu.ea_write(bus, ea, Size::Byte, if truth { 0xFF } else { 0 });
}

/// MOVE from SR: unprivileged on the 68000, privileged from the 68010 on.
pub(crate) fn move_from_sr(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if cpu.cpu_type.is_010_plus() && !cpu.is_supervisor() {
        return cpu.exception_privilege(bus);
    }
    let opcode = cpu.ir as u16;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) || !mode.is_alterable() {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, Size::Word);
    if cpu.faulted() {
        return;
    }
    let sr = cpu.get_sr();
    cpu.ea_write(bus, ea, Size::Word, sr as u32);
}

/// MOVE to SR (privileged).
pub(crate) fn move_to_sr(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.is_supervisor() {
        return cpu.exception_privilege(bus);
    }
    let opcode = cpu.ir as u16;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, Size::Word);
    let value = cpu.ea_read(bus, ea, Size::Word);
    if cpu.faulted() {
        return;
    }
    cpu.set_sr(value as u16);
}

/// MOVE from CCR (68010+).
pub(crate) fn move_from_ccr(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_010_plus() {
        return cpu.exception_illegal(bus);
    }
    let opcode = cpu.ir as u16;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) || !mode.is_alterable() {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, Size::Word);
    if cpu.faulted() {
        return;
    }
    let ccr = cpu.get_ccr();
    cpu.ea_write(bus, ea, Size::Word, ccr as u32);
}

/// MOVE to CCR.
pub(crate) fn move_to_ccr(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, Size::Word);
    let value = cpu.ea_read(bus, ea, Size::Word);
    if cpu.faulted() {
        return;
    }
    cpu.set_ccr(value as u8);
}

/// MOVE An,USP / MOVE USP,An (privileged).
pub(crate) fn move_usp(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.is_supervisor() {
        return cpu.exception_privilege(bus);
    }
    let opcode = cpu.ir as u16;
    let reg = (opcode & 7) as usize;
    if opcode & 0x0008 != 0 {
        // USP -> An
        let usp = cpu.sp[0];
        cpu.set_a(reg, usp);
    } else {
        cpu.sp[0] = cpu.a(reg);
    }
}

/// MOVE16 (68040): 16-byte aligned block transfer between (Ax)+/(Ay)+ or
/// a register pair and an absolute address.
pub(crate) fn move16(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_040() {
        return cpu.exception_illegal(bus);
    }
    let opcode = cpu.ir as u16;
    let reg = (opcode & 7) as usize;

    let (src, dst, postinc_regs): (u32, u32, [Option<usize>; 2]) = if opcode & 0x0020 != 0 {
        // (Ax)+,(Ay)+ form carries the second register in an extension.
        let ext = cpu.read_imm_16(bus);
        if cpu.faulted() {
            return;
        }
        let ry = ((ext >> 12) & 7) as usize;
        (
            cpu.a(reg) & !15,
            cpu.a(ry) & !15,
            [Some(reg), if ry == reg { None } else { Some(ry) }],
        )
    } else {
        let abs = cpu.read_imm_32(bus);
        if cpu.faulted() {
            return;
        }
        match (opcode >> 3) & 3 {
            0 => (cpu.a(reg) & !15, abs & !15, [Some(reg), None]), // (An)+ -> abs
            1 => (abs & !15, cpu.a(reg) & !15, [Some(reg), None]), // abs -> (An)+
            2 => (cpu.a(reg) & !15, abs & !15, [None, None]),      // (An) -> abs
            _ => (abs & !15, cpu.a(reg) & !15, [None, None]),      // abs -> (An)
        }
    };

    for i in 0..4 {
        let value = cpu.read_32(bus, src.wrapping_add(i * 4));
        cpu.write_32(bus, dst.wrapping_add(i * 4), value);
        if cpu.faulted() {
            return;
        }
    }
    for r in postinc_regs.into_iter().flatten() {
        let bumped = cpu.a(r).wrapping_add(16);
        cpu.set_a(r, bumped);
    }
}

/// Destination EA time for MOVE, exposed to the decode table builder.
pub(crate) fn move_dst_surcharge(opcode: u16, size: Size) -> u8 {
    move_dst_cycles(((opcode >> 6) & 7) as u8, ((opcode >> 9) & 7) as u8, size)
}
