// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The non-secure register context kept by the secure monitor, and core identification.

use crate::{
    pen_lock::CpuId,
    platform::{Platform, PlatformImpl},
};
use percore::Cores;

/// Implementation of the `Cores` trait to get the index of the current CPU core.
pub struct CoresImpl;

// SAFETY: This implementation never returns the same index for different cores because
// `core_position` is guaranteed not to.
unsafe impl Cores for CoresImpl {
    fn core_index() -> usize {
        PlatformImpl::core_position()
    }
}

/// Returns the pen lock identity of the calling core.
///
/// Panics if the platform reports a core other than 0 or 1, as the idle path only supports the
/// two A7 cores.
pub fn current_cpu() -> CpuId {
    let index = CoresImpl::core_index();
    u32::try_from(index)
        .ok()
        .and_then(|index| CpuId::try_from(index).ok())
        .unwrap_or_else(|| panic!("Low-power idle requested on unsupported core {index}"))
}

/// Banked registers of the non-secure processor modes.
///
/// Saved and restored by the secure monitor, the layout must match its assembly.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[repr(C)]
pub struct ModeRegs {
    /// User/System mode stack pointer.
    pub usr_sp: u32,
    /// User/System mode link register.
    pub usr_lr: u32,
    /// IRQ mode saved program status.
    pub irq_spsr: u32,
    /// IRQ mode stack pointer.
    pub irq_sp: u32,
    /// IRQ mode link register.
    pub irq_lr: u32,
    /// FIQ mode saved program status.
    pub fiq_spsr: u32,
    /// FIQ mode stack pointer.
    pub fiq_sp: u32,
    /// FIQ mode link register.
    pub fiq_lr: u32,
    /// Supervisor mode saved program status.
    pub svc_spsr: u32,
    /// Supervisor mode stack pointer.
    pub svc_sp: u32,
    /// Supervisor mode link register.
    pub svc_lr: u32,
    /// Abort mode saved program status.
    pub abt_spsr: u32,
    /// Abort mode stack pointer.
    pub abt_sp: u32,
    /// Abort mode link register.
    pub abt_lr: u32,
    /// Undefined mode saved program status.
    pub und_spsr: u32,
    /// Undefined mode stack pointer.
    pub und_sp: u32,
    /// Undefined mode link register.
    pub und_lr: u32,
}

/// The non-secure world's state as saved by the monitor on entry to the secure world.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[repr(C)]
pub struct NsecContext {
    /// Banked registers of the other modes.
    pub mode_regs: ModeRegs,
    /// r8 to r12.
    pub high_regs: [u32; 5],
    /// r0 to r7.
    pub low_regs: [u32; 8],
    /// Address the monitor returns to in the non-secure world.
    pub mon_lr: u32,
    /// Program status the monitor returns with.
    pub mon_spsr: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::test::with_state;
    use core::mem::{offset_of, size_of};
    use std::panic::catch_unwind;

    #[test]
    fn monitor_frame_layout() {
        assert_eq!(size_of::<ModeRegs>(), 17 * 4);
        assert_eq!(offset_of!(NsecContext, high_regs), 17 * 4);
        assert_eq!(offset_of!(NsecContext, low_regs), 22 * 4);
        assert_eq!(offset_of!(NsecContext, mon_lr), 30 * 4);
        assert_eq!(size_of::<NsecContext>(), 32 * 4);
    }

    #[test]
    fn current_cpu_follows_core_position() {
        with_state(|state| state.core = 1);
        assert_eq!(current_cpu(), CpuId::Cpu1);
        with_state(|state| state.core = 0);
        assert_eq!(current_cpu(), CpuId::Cpu0);
    }

    #[test]
    fn third_core_is_rejected() {
        let result = catch_unwind(|| {
            with_state(|state| state.core = 2);
            current_cpu()
        });
        assert!(result.is_err());
    }
}
