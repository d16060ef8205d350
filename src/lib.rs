// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Low-power idle for the two Cortex-A7 cores of the i.MX7Dual, run by the secure world.
//!
//! The secure monitor's PSCI dispatcher calls [`imx7d_lowpower_idle`] when a core asks for a
//! power-down idle state. The request is handed to a small position independent firmware image
//! which is relocated into OCRAM, next to a descriptor telling it where everything is, because it
//! runs while DRAM is in self-refresh and the caches and MMU are being turned off or on.

#![cfg_attr(not(test), no_std)]

mod arm;
mod context;
mod cpuidle;
mod debug;
mod init;
mod logger;
mod memory_map;
mod pen_lock;
mod platform;
mod pm_info;
mod psci;

pub use context::{ModeRegs, NsecContext};

use crate::{
    context::current_cpu,
    cpuidle::CpuIdle,
    init::InitError,
    platform::{Platform, PlatformImpl},
    psci::PowerState,
};
use log::{error, info, warn};
use spin::Once;

static CPUIDLE: Once<CpuIdle> = Once::new();

/// Returns the controller, creating it on first use.
///
/// Creation frees the pen lock, which is safe because no core can be holding it before the
/// controller exists.
fn cpuidle() -> Result<&'static CpuIdle, InitError> {
    CPUIDLE.try_call_once(CpuIdle::new)
}

/// Installs the logger and creates the low-power idle controller.
///
/// Called once from the boot core. Returns 0 on success or -1 if the idle area isn't usable, in
/// which case idle requests will halt the system.
#[unsafe(no_mangle)]
pub extern "C" fn imx7d_cpuidle_boot_init() -> i32 {
    if logger::init(PlatformImpl::log_sink()).is_err() {
        warn!("Logger already installed");
    }
    match cpuidle() {
        Ok(_) => {
            info!("Low-power idle ready");
            0
        }
        Err(e) => {
            error!("Low-power idle unavailable: {e}");
            -1
        }
    }
}

/// Populates the low-power idle area in OCRAM ahead of the first idle request.
///
/// Returns 0 on success or -1 on failure. This is optional, the first idle request does the same
/// if it hasn't been done.
#[unsafe(no_mangle)]
pub extern "C" fn imx7d_cpuidle_init() -> i32 {
    match cpuidle().and_then(|idle| idle.init(current_cpu())) {
        Ok(()) => 0,
        Err(e) => {
            error!("Failed to set up low-power idle: {e}");
            -1
        }
    }
}

/// Enters the power-down idle state described by `power_state` on the calling core.
///
/// Returns 0 once the core has been powered up again, with the monitor set to return to `entry`
/// in the non-secure world, or once the power-down has been abandoned because of a pending
/// interrupt. `context_id` is ignored. Halts the system if `power_state` isn't a power-down state.
///
/// # Safety
///
/// `nsec` must point to the calling core's non-secure context as saved by the monitor, and
/// nothing else may access it during the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imx7d_lowpower_idle(
    power_state: u32,
    entry: usize,
    _context_id: u32,
    nsec: *mut NsecContext,
) -> i32 {
    // SAFETY: The caller guarantees that `nsec` is valid and not accessed by anything else.
    let nsec = unsafe { &mut *nsec };
    let idle = cpuidle().unwrap_or_else(|e| panic!("Failed to set up low-power idle: {e}"));
    // Addresses are 32 bits wide on this SoC.
    idle.lowpower_idle(current_cpu(), PowerState(power_state), entry as u32, nsec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::test::{Call, with_state};

    // The only test using the global controller, as the fake platform state is per thread.
    #[test]
    fn exported_entry_points() {
        with_state(|state| {
            state.core = 1;
            state.set_a7rcr1(0x2);
        });

        assert_eq!(imx7d_cpuidle_boot_init(), 0);
        assert_eq!(imx7d_cpuidle_init(), 0);

        let mut nsec = NsecContext::default();
        // SAFETY: `nsec` is a valid local.
        let ret = unsafe { imx7d_lowpower_idle(0x0001_0000, 0x8000_8000, 0, &mut nsec) };

        assert_eq!(ret, 0);
        assert_eq!(nsec.mon_lr, 0x8000_8000);
        let calls = with_state(|state| state.take_calls());
        assert_eq!(
            calls
                .iter()
                .filter(|call| **call == Call::DcacheCleanInvL1)
                .count(),
            1
        );
        assert!(calls.contains(&Call::GicInitPrimary));
    }
}
