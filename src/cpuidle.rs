// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The low-power idle request handler.
//!
//! A core asking for a power-down idle state takes the pen lock, makes sure the idle area is set
//! up, accounts for itself in the descriptor and calls the relocated firmware through the monitor.
//! The firmware drops the lock while the core is really powered down and takes it again on the way
//! back, so from here the lock is held across the whole call.

use crate::{
    context::NsecContext,
    init::{InitError, init_lowpower_idle, locate_region},
    memory_map::{A7rcr1, SRC_A7RCR1, SRC_BASE},
    pen_lock::{CpuId, PenLock},
    platform::{Platform, PlatformImpl, mmio_read32},
    pm_info::PmInfoRegion,
    psci::{PowerState, PowerStateType},
};
use log::{debug, info};

/// State shared by both cores, only accessed with the pen lock held.
struct IdleState {
    region: PmInfoRegion,
    /// Whether the idle area has been populated.
    lowpoweridle_init: bool,
    /// Whether the last resume restored the whole GIC, so the next one only needs the core
    /// interface.
    gic_inited: bool,
}

impl IdleState {
    fn ensure_initialised(&mut self) -> Result<(), InitError> {
        if !self.lowpoweridle_init {
            init_lowpower_idle(&mut self.region)?;
            self.lowpoweridle_init = true;
        }
        Ok(())
    }
}

/// The low-power idle controller, one per system.
pub struct CpuIdle {
    state: PenLock<'static, IdleState>,
}

impl CpuIdle {
    /// Finds the idle area and frees the pen lock in it.
    ///
    /// Must be called once while no core is in low-power idle, i.e. during boot.
    pub fn new() -> Result<Self, InitError> {
        let region = locate_region()?;
        let words = region.lock_words();
        words.reset();
        info!(
            "Low-power idle area at {} ({}), {} bytes",
            region.va(),
            region.pa(),
            PmInfoRegion::SIZE
        );
        Ok(Self {
            state: PenLock::new(
                words,
                IdleState {
                    region,
                    lowpoweridle_init: false,
                    gic_inited: false,
                },
            ),
        })
    }

    /// Populates the idle area now rather than on the first idle request.
    pub fn init(&self, cpu: CpuId) -> Result<(), InitError> {
        self.state.lock(cpu).ensure_initialised()
    }

    /// Handles a power-down idle request from `cpu`.
    ///
    /// Returns once the core has been powered up again, with `nsec` set up to return to `entry`,
    /// or once the firmware has declined to power down, with `nsec` unchanged. Either way the
    /// result is 0.
    ///
    /// Panics if `power_state` isn't a power-down state or the idle area can't be set up.
    pub fn lowpower_idle(
        &self,
        cpu: CpuId,
        power_state: PowerState,
        entry: u32,
        nsec: &mut NsecContext,
    ) -> i32 {
        let mut state = self.state.lock(cpu);
        if let Err(e) = state.ensure_initialised() {
            panic!("Failed to set up low-power idle: {e}");
        }
        if power_state.state_type() != PowerStateType::PowerDown {
            panic!("Unsupported power state {power_state} for low-power idle");
        }

        let region = &mut state.region;
        region.set_num_online_cpus(online_cpus());
        region.set_num_lpi_cpus(region.num_lpi_cpus() + 1);

        PlatformImpl::save_mode_regs(&mut nsec.mode_regs);

        // SAFETY: The firmware has been relocated behind the descriptor and the caches maintained
        // by `ensure_initialised`.
        let ret = unsafe { PlatformImpl::cpu_suspend(region.va(), region.firmware_entry()) };
        if ret < 0 {
            region.set_num_lpi_cpus(region.num_lpi_cpus().saturating_sub(1));
            drop(state);
            debug!("Not suspended, GPC IRQ pending");
            return 0;
        }

        PlatformImpl::restore_mode_regs(&nsec.mode_regs);
        region.set_num_lpi_cpus(region.num_lpi_cpus().saturating_sub(1));
        nsec.mon_lr = entry;

        // The first core back restores the distributor and the TZASC, the other one only its own
        // GIC interface.
        if state.gic_inited {
            PlatformImpl::gic_init_secondary();
            state.gic_inited = false;
        } else {
            PlatformImpl::wakeup_late();
            PlatformImpl::gic_init_primary();
            state.gic_inited = true;
            debug!("Back from suspend on {cpu:?}");
        }
        0
    }
}

/// Returns how many of the two cores are enabled in the SRC.
fn online_cpus() -> i32 {
    let a7rcr1 = mmio_read32(SRC_BASE.offset(SRC_A7RCR1))
        .map(A7rcr1::from_bits_retain)
        .unwrap_or_else(|| panic!("SRC A7RCR1 is not mapped"));
    if a7rcr1.contains(A7rcr1::A7_CORE1_ENABLE) {
        2
    } else {
        1
    }
}
