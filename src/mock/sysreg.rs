// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Named AArch64 system-register encodings and field constants.
// Author: Lukas Bower

//! Named AArch64 system-register encodings and field constants.
//!
//! Encodings use the `MRS`/`MSR` operand layout: `op0<<19 | op1<<16 | CRn<<12 |
//! CRm<<8 | op2<<5`.

use std::rc::Rc;

use crate::value::{expect_args, Command, Namespace, Value};

/// Pack a system-register operand tuple.
#[must_use]
pub const fn sys_reg(op0: u64, op1: u64, crn: u64, crm: u64, op2: u64) -> u64 {
    (op0 << 19) | (op1 << 16) | (crn << 12) | (crm << 8) | (op2 << 5)
}

/// Split an encoding back into `(op0, op1, CRn, CRm, op2)`.
#[must_use]
pub const fn sys_reg_fields(enc: u64) -> (u64, u64, u64, u64, u64) {
    (
        (enc >> 19) & 0x3,
        (enc >> 16) & 0x7,
        (enc >> 12) & 0xf,
        (enc >> 8) & 0xf,
        (enc >> 5) & 0x7,
    )
}

/// Known registers by name.
pub const REGISTERS: &[(&str, u64)] = &[
    ("MIDR_EL1", sys_reg(3, 0, 0, 0, 0)),
    ("MPIDR_EL1", sys_reg(3, 0, 0, 0, 5)),
    ("SCTLR_EL1", sys_reg(3, 0, 1, 0, 0)),
    ("ESR_EL1", sys_reg(3, 0, 5, 2, 0)),
    ("FAR_EL1", sys_reg(3, 0, 6, 0, 0)),
    ("VBAR_EL1", sys_reg(3, 0, 12, 0, 0)),
    ("CurrentEL", sys_reg(3, 0, 4, 2, 2)),
    ("HCR_EL2", sys_reg(3, 4, 1, 1, 0)),
    ("SYS_IMP_APL_HID0", sys_reg(3, 0, 15, 0, 0)),
    ("SYS_IMP_APL_HID1", sys_reg(3, 0, 15, 1, 0)),
    ("SYS_IMP_APL_HID3", sys_reg(3, 0, 15, 3, 0)),
    ("SYS_IMP_APL_HID4", sys_reg(3, 0, 15, 4, 0)),
    ("SYS_IMP_APL_EHID4", sys_reg(3, 0, 15, 4, 1)),
    ("SYS_IMP_APL_HID5", sys_reg(3, 0, 15, 5, 0)),
    ("SYS_IMP_APL_HID6", sys_reg(3, 0, 15, 6, 0)),
    ("SYS_IMP_APL_HID7", sys_reg(3, 0, 15, 7, 0)),
    ("SYS_IMP_APL_HID9", sys_reg(3, 0, 15, 9, 0)),
    ("SYS_IMP_APL_EHID9", sys_reg(3, 0, 15, 9, 1)),
    ("SYS_IMP_APL_EHID10", sys_reg(3, 0, 15, 10, 1)),
    ("SYS_IMP_APL_HID11", sys_reg(3, 0, 15, 11, 0)),
    ("SYS_IMP_APL_HID13", sys_reg(3, 0, 15, 14, 0)),
    ("SYS_IMP_APL_HID16", sys_reg(3, 0, 15, 15, 2)),
    ("SYS_IMP_APL_HID18", sys_reg(3, 0, 15, 11, 2)),
    ("SYS_IMP_APL_EHID20", sys_reg(3, 0, 15, 1, 2)),
    ("SYS_IMP_APL_HID21", sys_reg(3, 0, 15, 1, 3)),
    ("SYS_IMP_APL_PMCR0", sys_reg(3, 1, 15, 0, 0)),
    ("SYS_IMP_APL_LSU_ERR_STS", sys_reg(3, 3, 15, 0, 0)),
    ("SYS_IMP_APL_E_LSU_ERR_STS", sys_reg(3, 3, 15, 2, 0)),
    ("SYS_IMP_APL_L2C_ERR_STS", sys_reg(3, 3, 15, 8, 0)),
    ("SYS_IMP_APL_L2C_ERR_ADR", sys_reg(3, 3, 15, 9, 0)),
    ("SYS_IMP_APL_L2C_ERR_INF", sys_reg(3, 3, 15, 10, 0)),
    ("SYS_IMP_APL_FED_ERR_STS", sys_reg(3, 4, 15, 0, 0)),
    ("SYS_IMP_APL_E_FED_ERR_STS", sys_reg(3, 4, 15, 0, 2)),
    ("SYS_IMP_APL_ACC_CFG", sys_reg(3, 5, 15, 4, 0)),
    ("SYS_IMP_APL_CYC_OVRD", sys_reg(3, 5, 15, 5, 0)),
    ("SYS_IMP_APL_MMU_ERR_STS", sys_reg(3, 6, 15, 0, 0)),
    ("SYS_IMP_APL_E_MMU_ERR_STS", sys_reg(3, 6, 15, 2, 0)),
    ("SYS_IMP_APL_SPRR_CONFIG_EL1", sys_reg(3, 6, 15, 1, 0)),
    ("SYS_IMP_APL_GXF_CONFIG_EL1", sys_reg(3, 6, 15, 1, 2)),
    ("SYS_IMP_APL_SPRR_PERM_EL0", sys_reg(3, 6, 15, 1, 5)),
    ("SYS_IMP_APL_SPRR_PERM_EL1", sys_reg(3, 6, 15, 1, 6)),
    ("SYS_IMP_APL_GXF_STATUS", sys_reg(3, 6, 15, 8, 0)),
    ("SYS_IMP_APL_GXF_ENTER_EL1", sys_reg(3, 6, 15, 8, 1)),
    ("SYS_IMP_APL_GXF_ABORT_EL1", sys_reg(3, 6, 15, 8, 2)),
    ("SYS_IMP_APL_VBAR_GL12", sys_reg(3, 6, 15, 9, 2)),
    ("SYS_IMP_APL_SP_GL12", sys_reg(3, 6, 15, 10, 0)),
    ("SYS_IMP_APL_TPIDR_GL1", sys_reg(3, 6, 15, 10, 1)),
    ("SYS_IMP_APL_VBAR_GL1", sys_reg(3, 6, 15, 10, 2)),
    ("SYS_IMP_APL_SPSR_GL1", sys_reg(3, 6, 15, 10, 3)),
    ("SYS_IMP_APL_ASPSR_GL1", sys_reg(3, 6, 15, 10, 4)),
    ("SYS_IMP_APL_ESR_GL1", sys_reg(3, 6, 15, 10, 5)),
    ("SYS_IMP_APL_ELR_GL1", sys_reg(3, 6, 15, 10, 6)),
    ("SYS_IMP_APL_FAR_GL1", sys_reg(3, 6, 15, 10, 7)),
    ("SYS_IMP_APL_GXF_ENTER_EL12", sys_reg(3, 6, 15, 15, 2)),
    ("SYS_IMP_APL_GXF_ABORT_EL12", sys_reg(3, 6, 15, 15, 3)),
    ("SYS_IMP_APL_UPMCR0", sys_reg(3, 7, 15, 0, 4)),
    ("SYS_IMP_APL_UPMSR", sys_reg(3, 7, 15, 6, 4)),
];

/// Single-bit and mask field constants.
pub const FIELDS: &[(&str, u64)] = &[
    ("HID0_FETCH_WIDTH_DISABLE", 1 << 28),
    ("HID0_CACHE_FUSION_DISABLE", 1 << 36),
    ("HID0_SAME_PG_POWER_OPTIMIZATION", 1 << 45),
    ("HID1_TRAP_SMC", 1 << 54),
    ("HID3_DEV_PCIE_THROTTLE_ENABLE", 1 << 63),
    ("HID3_DISABLE_ARBITER_FIX_BIF_CRD", 1 << 44),
    ("HID4_DISABLE_DC_MVA", 1 << 11),
    ("HID4_DISABLE_DC_SW_L2_OPS", 1 << 44),
    ("HID4_STNT_COUNTER_THRESHOLD_MASK", 3 << 40),
    ("HID5_DISABLE_FILL_2C_MERGE", 1 << 61),
    ("HID6_UP_CRD_TKN_INIT_C2_MASK", 0x1f << 5),
    ("HID9_TSO_ALLOW_DC_ZVA_WC", 1 << 26),
    ("HID9_TSO_SERIALIZE_VLD_MICROOPS", 1 << 29),
    ("HID11_DISABLE_LD_NT_WIDGET", 1 << 59),
    ("HID13_PRE_CYCLES_MASK", 0xf << 14),
    ("HID18_HVC_SPECULATION_DISABLE", 1 << 14),
    ("EHID20_TRAP_SMC", 1 << 8),
    ("HID21_ENABLE_LDREX_FILL_REPLY", 1 << 19),
    ("PMCR0_IMODE_MASK", 7 << 8),
    ("PMCR0_IACT", 1 << 11),
    ("L2C_ERR_STS_RECURSIVE_FAULT", 1 << 1),
    ("L2C_ERR_STS_ACCESS_FAULT", 1 << 7),
    ("L2C_ERR_STS_ENABLE_W1C", 1 << 56),
    ("ACC_CFG_BP_SLEEP_MASK", 3 << 2),
    ("CYC_OVRD_FIQ_MODE_MASK", 3 << 20),
    ("CYC_OVRD_IRQ_MODE_MASK", 3 << 22),
    ("UPMCR0_IMODE_MASK", 7 << 16),
    ("UPMSR_IACT", 1 << 0),
    ("SPRR_CONFIG_EN", 1 << 0),
    ("SPRR_CONFIG_LOCK_CONFIG", 1 << 1),
    ("SPRR_CONFIG_LOCK_PERM", 1 << 4),
    ("SPRR_CONFIG_LOCK_KERNEL_PERM", 1 << 5),
    ("GXF_CONFIG_EN", 1 << 0),
    ("GXF_STATUS_GUARDED", 1 << 0),
];

/// Name of the register encoded as `enc`, or its generic `s<op0>_<op1>_c<n>_c<m>_<op2>` form.
#[must_use]
pub fn sysreg_name(enc: u64) -> String {
    if let Some((name, _)) = REGISTERS.iter().find(|(_, value)| *value == enc) {
        return (*name).to_owned();
    }
    let (op0, op1, crn, crm, op2) = sys_reg_fields(enc);
    format!("s{op0}_{op1}_c{crn}_c{crm}_{op2}")
}

/// Register table bound as `sysreg` and merged into the session scope.
#[derive(Clone)]
pub struct RegisterTable {
    entries: Rc<Vec<(String, Value)>>,
}

impl RegisterTable {
    /// Table of every known register and field constant plus `sysreg_name`.
    pub fn new() -> Self {
        let mut entries: Vec<(String, Value)> = REGISTERS
            .iter()
            .chain(FIELDS)
            .map(|(name, value)| ((*name).to_owned(), Value::from(*value)))
            .collect();
        let lookup = Command::new("sysreg_name", |_, args| {
            let [enc] = expect_args::<1>("sysreg_name", args)?;
            Ok(sysreg_name(enc.expect_u64("encoding")?).into())
        });
        entries.push(("sysreg_name".to_owned(), lookup.into()));
        Self {
            entries: Rc::new(entries),
        }
    }
}

impl Default for RegisterTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace for RegisterTable {
    fn type_name(&self) -> &str {
        "sysreg"
    }

    fn entries(&self) -> Vec<(String, Value)> {
        self.entries.as_ref().clone()
    }
}
