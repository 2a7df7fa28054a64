//! System control: traps, STOP/RESET, MOVEC/MOVES, CHK, the 68020
//! compare-and-swap and bounds instructions, module call, line A/F.

use super::size_bits;
use crate::core::cpu::Cpu;
use crate::core::ea::{AddrMode, Ea};
use crate::core::exceptions::vector;
use crate::core::memory::Bus;
use crate::core::types::{CpuType, Size};

/// TRAP #n.
pub(crate) fn trap(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let n = (cpu.ir & 0xF) as u32;
    cpu.exception_trap_n(bus, vector::TRAP_BASE + n);
}

/// TRAPV.
pub(crate) fn trapv(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if cpu.flag_v() {
        cpu.exception_trapv(bus);
    }
}

/// TRAPcc / TRAPcc.W / TRAPcc.L (68020+).
pub(crate) fn trapcc(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_020_plus() {
        return cpu.exception_illegal(bus);
    }
    let opcode = cpu.ir as u16;
    match opcode & 7 {
        2 => {
            let _ = cpu.read_imm_16(bus);
        }
        3 => {
            let _ = cpu.read_imm_32(bus);
        }
        4 => {}
        _ => return cpu.exception_illegal(bus),
    }
    if cpu.faulted() {
        return;
    }
    let cond = ((opcode >> 8) & 0xF) as u8;
    if cpu.test_condition(cond) {
        cpu.exception_trapv(bus);
    }
}

/// ILLEGAL (0x4AFC).
pub(crate) fn illegal(cpu: &mut Cpu, bus: &mut dyn Bus) {
    cpu.exception_illegal(bus);
}

/// BKPT #n (68010+): acknowledge to the host, then take the illegal
/// instruction vector.
pub(crate) fn bkpt(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_010_plus() {
        return cpu.exception_illegal(bus);
    }
    bus.breakpoint_acknowledge(cpu.ir & 7);
    cpu.exception_illegal(bus);
}

/// STOP `#sr` (privileged): load SR and idle until an interrupt.
pub(crate) fn stop(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.is_supervisor() {
        return cpu.exception_privilege(bus);
    }
    let new_sr = cpu.read_imm_16(bus);
    if cpu.faulted() {
        return;
    }
    cpu.set_sr(new_sr);
    cpu.stop();
}

/// RESET (privileged): pulse the external reset line.
pub(crate) fn reset(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.is_supervisor() {
        return cpu.exception_privilege(bus);
    }
    bus.reset_devices();
    let surcharge = cpu.cyc_reset;
    cpu.use_cycles(surcharge);
}

/// MOVEC (68010+, privileged).
pub(crate) fn movec(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_010_plus() {
        return cpu.exception_illegal(bus);
    }
    if !cpu.is_supervisor() {
        return cpu.exception_privilege(bus);
    }
    let opcode = cpu.ir as u16;
    let ext = cpu.read_imm_16(bus);
    if cpu.faulted() {
        return;
    }
    let reg = ((ext >> 12) & 15) as usize;
    let control = ext & 0x0FFF;
    if opcode & 1 == 0 {
        // Control register to general register.
        match cpu.read_control_register(control) {
            Some(value) => cpu.dar[reg] = value,
            None => cpu.exception_illegal(bus),
        }
    } else {
        let value = cpu.dar[reg];
        if !cpu.write_control_register(control, value) {
            cpu.exception_illegal(bus);
        }
    }
}

/// MOVES (68010+, privileged): transfer through SFC/DFC space.
pub(crate) fn moves(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_010_plus() {
        return cpu.exception_illegal(bus);
    }
    if !cpu.is_supervisor() {
        return cpu.exception_privilege(bus);
    }
    let opcode = cpu.ir as u16;
    let size = size_bits(opcode);
    let ext = cpu.read_imm_16(bus);
    if cpu.faulted() {
        return;
    }
    let reg = ((ext >> 12) & 15) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if mode.is_register() || !mode.is_alterable() {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, size);
    let Ea::Memory(addr) = ea else {
        return cpu.exception_illegal(bus);
    };

    if ext & 0x0800 != 0 {
        // Register to memory through DFC.
        let value = cpu.dar[reg];
        let fc = cpu.dfc;
        match size {
            Size::Byte => cpu.write_8_fc(bus, addr, fc, value as u8),
            Size::Word => cpu.write_16_fc(bus, addr, fc, value as u16),
            Size::Long => cpu.write_32_fc(bus, addr, fc, value),
        }
    } else {
        // Memory to register through SFC.
        let fc = cpu.sfc;
        let value = match size {
            Size::Byte => cpu.read_8_fc(bus, addr, fc) as u32,
            Size::Word => cpu.read_16_fc(bus, addr, fc) as u32,
            Size::Long => cpu.read_32_fc(bus, addr, fc),
        };
        if cpu.faulted() {
            return;
        }
        if reg >= 8 {
            // Address registers sign-extend sub-long transfers.
            cpu.dar[reg] = size.sign_extend(value);
        } else {
            cpu.dar[reg] = (cpu.dar[reg] & !size.mask()) | (value & size.mask());
        }
    }
}

/// CHK.W / CHK.L `<ea>,Dn` (long form 68020+): trap when the register is
/// below zero or above the bound.
pub(crate) fn chk(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let opcode = cpu.ir as u16;
    let size = if opcode & 0x0080 != 0 {
        Size::Word
    } else {
        if !cpu.cpu_type.is_020_plus() {
            return cpu.exception_illegal(bus);
        }
        Size::Long
    };
    let reg = ((opcode >> 9) & 7) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if matches!(mode, AddrMode::AddressDirect(_)) {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, size);
    let bound = size.sign_extend(cpu.ea_read(bus, ea, size)) as i32;
    if cpu.faulted() {
        return;
    }
    let value = size.sign_extend(cpu.d(reg) & size.mask()) as i32;

    if value < 0 {
        cpu.n_flag = crate::core::cpu::NFLAG_SET;
        cpu.exception_chk(bus);
    } else if value > bound {
        cpu.n_flag = 0;
        cpu.exception_chk(bus);
    }
}

/// CMP2/CHK2 `<ea>,Rn` (68020+): bounds-pair compare, CHK2 traps out of
/// bounds.
pub(crate) fn cmp2_chk2(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_020_plus() {
        return cpu.exception_illegal(bus);
    }
    let opcode = cpu.ir as u16;
    let size = match (opcode >> 9) & 3 {
        0 => Size::Byte,
        1 => Size::Word,
        2 => Size::Long,
        _ => return cpu.exception_illegal(bus),
    };
    let ext = cpu.read_imm_16(bus);
    if cpu.faulted() {
        return;
    }
    let is_chk2 = ext & 0x0800 != 0;
    let rn = ((ext >> 12) & 15) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if !mode.is_control() {
        return cpu.exception_illegal(bus);
    }
    let addr = cpu.ea_address(bus, mode, size);
    let lower = cpu.ea_read(bus, Ea::Memory(addr), size);
    let upper = cpu.ea_read(bus, Ea::Memory(addr.wrapping_add(size.bytes())), size);
    if cpu.faulted() {
        return;
    }

    // Address registers compare as full sign-extended longs.
    let (compare, lower, upper) = if rn >= 8 {
        (
            cpu.dar[rn],
            size.sign_extend(lower),
            size.sign_extend(upper),
        )
    } else {
        (cpu.dar[rn] & size.mask(), lower, upper)
    };

    let in_z = compare == lower || compare == upper;
    let out_c = if lower <= upper {
        compare < lower || compare > upper
    } else {
        // Wrapped bounds select the complement range.
        compare > upper && compare < lower
    };
    cpu.not_z_flag = if in_z { 0 } else { 1 };
    cpu.c_flag = if out_c { crate::core::cpu::CFLAG_SET } else { 0 };

    if is_chk2 && out_c {
        cpu.exception_chk(bus);
    }
}

/// CAS `Dc,Du,<ea>` (68020+).
pub(crate) fn cas(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_020_plus() {
        return cpu.exception_illegal(bus);
    }
    let opcode = cpu.ir as u16;
    let size = match (opcode >> 9) & 3 {
        1 => Size::Byte,
        2 => Size::Word,
        3 => Size::Long,
        _ => return cpu.exception_illegal(bus),
    };
    let ext = cpu.read_imm_16(bus);
    if cpu.faulted() {
        return;
    }
    let dc = (ext & 7) as usize;
    let du = ((ext >> 6) & 7) as usize;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if mode.is_register() || !mode.is_alterable() {
        return cpu.exception_illegal(bus);
    }
    let ea = cpu.resolve_ea(bus, mode, size);
    let operand = cpu.ea_read(bus, ea, size);
    if cpu.faulted() {
        return;
    }
    let compare = cpu.d(dc) & size.mask();
    let result = operand.wrapping_sub(compare);
    cpu.set_cmp_flags(compare, operand, result, size);
    if cpu.flag_z() {
        let update = cpu.d(du);
        cpu.ea_write(bus, ea, size, update);
    } else {
        cpu.ea_write(bus, Ea::DataReg(dc as u8), size, operand);
    }
}

/// CAS2 `Dc1:Dc2,Du1:Du2,(Rn1):(Rn2)` (68020+).
pub(crate) fn cas2(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_020_plus() {
        return cpu.exception_illegal(bus);
    }
    let opcode = cpu.ir as u16;
    let size = if opcode & 0x0200 != 0 {
        Size::Long
    } else {
        Size::Word
    };
    let ext1 = cpu.read_imm_16(bus);
    let ext2 = cpu.read_imm_16(bus);
    if cpu.faulted() {
        return;
    }
    let addr1 = cpu.dar[((ext1 >> 12) & 15) as usize];
    let addr2 = cpu.dar[((ext2 >> 12) & 15) as usize];
    let dc1 = (ext1 & 7) as usize;
    let dc2 = (ext2 & 7) as usize;
    let du1 = ((ext1 >> 6) & 7) as usize;
    let du2 = ((ext2 >> 6) & 7) as usize;

    let op1 = cpu.ea_read(bus, Ea::Memory(addr1), size);
    let op2 = cpu.ea_read(bus, Ea::Memory(addr2), size);
    if cpu.faulted() {
        return;
    }
    let c1 = cpu.d(dc1) & size.mask();
    let c2 = cpu.d(dc2) & size.mask();

    let r1 = op1.wrapping_sub(c1);
    cpu.set_cmp_flags(c1, op1, r1, size);
    if cpu.flag_z() {
        let r2 = op2.wrapping_sub(c2);
        cpu.set_cmp_flags(c2, op2, r2, size);
        if cpu.flag_z() {
            let u1 = cpu.d(du1);
            let u2 = cpu.d(du2);
            cpu.ea_write(bus, Ea::Memory(addr1), size, u1);
            cpu.ea_write(bus, Ea::Memory(addr2), size, u2);
            return;
        }
    }
    cpu.ea_write(bus, Ea::DataReg(dc1 as u8), size, op1);
    cpu.ea_write(bus, Ea::DataReg(dc2 as u8), size, op2);
}

/// CALLM `#argc,<ea>` (68020 only): minimal module call, enough for the
/// supervisor software that probes for it.
pub(crate) fn callm(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !matches!(cpu.cpu_type, CpuType::M68EC020 | CpuType::M68020) {
        return cpu.exception_illegal(bus);
    }
    let opcode = cpu.ir as u16;
    let ext = cpu.read_imm_16(bus);
    let _argc = ext & 0xFF;
    let Some(mode) = AddrMode::from_opcode(opcode) else {
        return cpu.exception_illegal(bus);
    };
    if !mode.is_control() {
        return cpu.exception_illegal(bus);
    }
    let descriptor = cpu.ea_address(bus, mode, Size::Long);
    let entry = cpu.read_32(bus, descriptor.wrapping_add(4));
    if cpu.faulted() {
        return;
    }
    let ret = cpu.pc;
    cpu.push_32(bus, ret);
    cpu.push_32(bus, descriptor);
    if cpu.faulted() {
        return;
    }
    cpu.jump(bus, entry);
}

/// RTM `Rn` (68020 only).
pub(crate) fn rtm(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !matches!(cpu.cpu_type, CpuType::M68EC020 | CpuType::M68020) {
        return cpu.exception_illegal(bus);
    }
    let _descriptor = cpu.pull_32(bus);
    let target = cpu.pull_32(bus);
    if cpu.faulted() {
        return;
    }
    cpu.jump(bus, target);
}

/// A-line opcodes (0xAxxx).
pub(crate) fn aline(cpu: &mut Cpu, bus: &mut dyn Bus) {
    cpu.exception_1010(bus);
}

/// F-line opcodes with no coprocessor to claim them.
pub(crate) fn fline(cpu: &mut Cpu, bus: &mut dyn Bus) {
    cpu.exception_1111(bus);
}

/// 68040 CINV/CPUSH (privileged). The only cache modelled is the I-cache,
/// which any invalidating variant clears.
pub(crate) fn cache_ops(cpu: &mut Cpu, bus: &mut dyn Bus) {
    if !cpu.cpu_type.is_040() {
        return cpu.exception_1111(bus);
    }
    if !cpu.is_supervisor() {
        return cpu.exception_privilege(bus);
    }
    cpu.ic_clear();
}

/// PMMU opcode group (0xF000-0xF03F and PFLUSH/PTEST ranges) on the
/// MMU-capable parts. Table walking lives behind the MMU collaborator, so
/// the control transfers are accepted without further effect.
pub(crate) fn pmmu_ops(cpu: &mut Cpu, bus: &mut dyn Bus) {
    let has_pmmu = matches!(cpu.cpu_type, CpuType::M68030 | CpuType::M68040);
    if !has_pmmu {
        return cpu.exception_1111(bus);
    }
    if !cpu.is_supervisor() {
        return cpu.exception_privilege(bus);
    }
    // Consume the extension word carried by the PMOVE/PTEST encodings.
    let opcode = cpu.ir as u16;
    if opcode & 0xFFC0 == 0xF000 {
        let _modes = cpu.read_imm_16(bus);
    }
}
