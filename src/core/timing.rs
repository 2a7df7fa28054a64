//! Cycle tables.
//!
//! The per-opcode table (`cyc_instruction`) is produced by the decode table
//! builder from descriptor base cycles plus the 68000/68010 effective
//! address access times below. This module owns the per-vector exception
//! costs, the full-extension-word index surcharge table, and the
//! per-variant fudge values the Bcc/DBcc/Scc/MOVEM/shift handlers consult.

use super::cpu::Cpu;
use super::types::{CpuType, Size};

/// Index-mode surcharge for 68020 full extension words, indexed by
/// `ext & 0x3f` (base-displacement size in bits 5-4, indirection selector
/// in bits 2-0). Reserved encodings charge nothing; they never execute.
pub const EA_IDX_CYCLE_TABLE: [u8; 64] = [
    // bd reserved
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    // bd null: direct, then indirect with null/word/long outer
    0, 5, 7, 7, 0, 5, 7, 7, 0, 5, 7, 7, 0, 5, 7, 7,
    // bd word
    2, 7, 9, 9, 0, 7, 9, 9, 0, 7, 9, 9, 0, 7, 9, 9,
    // bd long
    6, 11, 13, 13, 0, 11, 13, 13, 0, 11, 13, 13, 0, 11, 13, 13,
];

/// Classic 68000 effective-address access time, added to the 000/010
/// columns when the decode table is built for an `<ea>`-general opcode.
pub(crate) fn ea_base_cycles(mode: u8, reg: u8, size: Size) -> u8 {
    let long = size == Size::Long;
    match mode {
        0 | 1 => 0,
        2 | 3 => {
            if long {
                8
            } else {
                4
            }
        }
        4 => {
            if long {
                10
            } else {
                6
            }
        }
        5 => {
            if long {
                12
            } else {
                8
            }
        }
        6 => {
            if long {
                14
            } else {
                10
            }
        }
        7 => match reg {
            0 => {
                if long {
                    12
                } else {
                    8
                }
            }
            1 => {
                if long {
                    16
                } else {
                    12
                }
            }
            2 => {
                if long {
                    12
                } else {
                    8
                }
            }
            3 => {
                if long {
                    14
                } else {
                    10
                }
            }
            4 => {
                if long {
                    8
                } else {
                    4
                }
            }
            _ => 0,
        },
        _ => 0,
    }
}

/// MOVE destination access time. The write side of MOVE overlaps with the
/// prefetch, so predecrement costs the same as postincrement here.
pub(crate) fn move_dst_cycles(mode: u8, reg: u8, size: Size) -> u8 {
    match mode {
        4 => {
            if size == Size::Long {
                8
            } else {
                4
            }
        }
        _ => ea_base_cycles(mode, reg, size),
    }
}

/// Per-vector exception costs for a CPU variant.
pub(crate) fn exception_cycles(cpu_type: CpuType) -> [u8; 256] {
    let mut t = [4u8; 256];
    match cpu_type.cycle_column() {
        0 => {
            t[0] = 40; // Reset - initial stack pointer
            t[2] = 50; // Bus error
            t[3] = 50; // Address error
            t[4] = 34; // Illegal instruction
            t[5] = 38; // Divide by zero
            t[6] = 40; // CHK
            t[7] = 34; // TRAPV
            t[8] = 34; // Privilege violation
            t[9] = 34; // Trace
            t[10] = 34; // Line-A
            t[11] = 34; // Line-F
            t[15] = 44; // Uninitialized interrupt
            for v in 24..32 {
                t[v] = 44; // Spurious + autovectors
            }
            for v in 32..48 {
                t[v] = 34; // TRAP #0-15
            }
        }
        1 => {
            t[0] = 40;
            t[2] = 126;
            t[3] = 126;
            t[4] = 38;
            t[5] = 44;
            t[6] = 44;
            t[7] = 34;
            t[8] = 38;
            t[9] = 38;
            t[15] = 44;
            for v in 24..32 {
                t[v] = 46;
            }
            for v in 32..48 {
                t[v] = 38;
            }
        }
        _ => {
            // 020/030/040 share one approximate column.
            t[2] = 50;
            t[3] = 50;
            t[4] = 20;
            t[5] = 38;
            t[6] = 40;
            t[7] = 20;
            t[8] = 34;
            t[9] = 25;
            t[10] = 20;
            t[11] = 20;
            t[15] = 30;
            for v in 24..32 {
                t[v] = 30;
            }
            for v in 32..48 {
                t[v] = 20;
            }
        }
    }
    t
}

/// Per-variant cycle fudge values.
pub(crate) fn configure_cycle_fudges(cpu: &mut Cpu) {
    match cpu.cpu_type.cycle_column() {
        0 => {
            cpu.cyc_bcc_notake_b = -2;
            cpu.cyc_bcc_notake_w = 2;
            cpu.cyc_dbcc_f_noexp = -2;
            cpu.cyc_dbcc_f_exp = 2;
            cpu.cyc_scc_r_true = 2;
            cpu.cyc_movem_w = 2;
            cpu.cyc_movem_l = 3;
            cpu.cyc_shift = 1;
            cpu.cyc_reset = 132;
        }
        1 => {
            cpu.cyc_bcc_notake_b = -4;
            cpu.cyc_bcc_notake_w = 0;
            cpu.cyc_dbcc_f_noexp = 0;
            cpu.cyc_dbcc_f_exp = 6;
            cpu.cyc_scc_r_true = 0;
            cpu.cyc_movem_w = 2;
            cpu.cyc_movem_l = 3;
            cpu.cyc_shift = 1;
            cpu.cyc_reset = 130;
        }
        _ => {
            cpu.cyc_bcc_notake_b = -2;
            cpu.cyc_bcc_notake_w = 0;
            cpu.cyc_dbcc_f_noexp = 0;
            cpu.cyc_dbcc_f_exp = 4;
            cpu.cyc_scc_r_true = 0;
            cpu.cyc_movem_w = 2;
            cpu.cyc_movem_l = 2;
            cpu.cyc_shift = 0;
            cpu.cyc_reset = 518;
        }
    }
}
