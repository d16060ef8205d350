// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! i.MX7D physical memory map, as far as the low-power idle path needs it.

use crate::pm_info::PhysAddr;
use bitflags::bitflags;

/// DDR controller.
pub const DDRC_BASE: PhysAddr = PhysAddr(0x307a_0000);
/// Clock control module.
pub const CCM_BASE: PhysAddr = PhysAddr(0x3038_0000);
/// Analog power and PLL block.
pub const ANATOP_BASE: PhysAddr = PhysAddr(0x3036_0000);
/// System reset controller.
pub const SRC_BASE: PhysAddr = PhysAddr(0x3039_0000);
/// IOMUX controller general purpose registers.
pub const IOMUXC_GPR_BASE: PhysAddr = PhysAddr(0x3034_0000);
/// General power controller.
pub const GPC_BASE: PhysAddr = PhysAddr(0x303a_0000);
/// GIC-400 distributor and CPU interface.
pub const GIC_BASE: PhysAddr = PhysAddr(0x3100_0000);

/// Offset of the A7 reset control register 1 within the SRC.
pub const SRC_A7RCR1: u32 = 0x8;

bitflags! {
    /// Bits of the SRC `A7RCR1` register.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct A7rcr1: u32 {
        /// Core 1 of the A7 cluster is enabled.
        const A7_CORE1_ENABLE = 1 << 1;
    }
}

/// Start of the OCRAM_S window that TrustZone reserves for the secure world. Its content is
/// retained while DRAM is in self-refresh.
pub const OCRAM_TZ_START: PhysAddr = PhysAddr(0x0018_0000);

/// Offset of the low-power idle area inside the TrustZone OCRAM window. The area below it is
/// used by system suspend.
pub const LOWPOWER_IDLE_OCRAM_OFFSET: u32 = 0x1000;

/// Size of the low-power idle area: the descriptor followed by the relocated firmware.
pub const LOWPOWER_IDLE_OCRAM_SIZE: usize = 0x1000;

/// Physical base of the low-power idle area.
pub const LOWPOWER_IDLE_OCRAM_BASE: PhysAddr = OCRAM_TZ_START.offset(LOWPOWER_IDLE_OCRAM_OFFSET);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_area_follows_suspend_area() {
        assert_eq!(LOWPOWER_IDLE_OCRAM_BASE, PhysAddr(0x0018_1000));
        assert_eq!(
            SRC_BASE.offset(SRC_A7RCR1),
            PhysAddr(0x3039_0008),
            "A7RCR1 is the third SRC register"
        );
    }
}
