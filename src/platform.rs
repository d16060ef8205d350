// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

macro_rules! select_platform {
    (platform = $condition:literal, $mod:ident::$plat_impl:ident) => {
        #[cfg(all(platform = $condition, not(test)))]
        mod $mod;

        #[cfg(all(platform = $condition, not(test)))]
        pub use $mod::$plat_impl as PlatformImpl;
    };
    (test, $mod:ident::$plat_impl:ident) => {
        #[cfg(test)]
        pub mod $mod;

        #[cfg(test)]
        pub use $mod::$plat_impl as PlatformImpl;
    };
}

select_platform!(platform = "imx7d", imx7d::Imx7d);
select_platform!(test, test::TestPlatform);

use crate::{
    context::ModeRegs,
    logger::LogSink,
    pm_info::{PhysAddr, VirtAddr},
};
use core::ptr::NonNull;

/// Type alias for convenience, to avoid having to use the complicated type name everywhere.
pub type LogSinkImpl = <PlatformImpl as Platform>::LogSinkImpl;

/// Memory attributes a physical address is mapped with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MemArea {
    /// Secure memory mapped coherently (uncached or with coherency maintained), used for the
    /// retained OCRAM shared with the low-power firmware.
    TeeCoherent,
    /// Secure device memory.
    IoSec,
}

/// The hooks implemented by all platforms.
///
/// These are the services of the surrounding secure environment that the low-power idle path
/// relies on but does not implement itself.
pub trait Platform {
    /// The number of CPU cores.
    const CORE_COUNT: usize;

    /// Platform dependent LogSink implementation type for Logger.
    type LogSinkImpl: LogSink;

    /// Creates the log sink to install in the logger.
    fn log_sink() -> Self::LogSinkImpl;

    /// Returns the linear index of the calling core.
    ///
    /// The implementation must never return the same index for two different cores, and must
    /// never return a value greater than or equal to `CORE_COUNT`.
    fn core_position() -> usize;

    /// Translates a physical address into the secure world's virtual address space.
    fn phys_to_virt(pa: PhysAddr, area: MemArea) -> Option<VirtAddr>;

    /// Translates a virtual address back to its physical address.
    fn virt_to_phys(va: VirtAddr) -> Option<PhysAddr>;

    /// Returns a pointer through which the memory mapped at `va` can be accessed.
    fn virt_to_ptr(va: VirtAddr) -> Option<NonNull<u8>>;

    /// Cleans and invalidates the whole level 1 data cache by set/way.
    fn dcache_clean_inv_level1();

    /// Cleans the data cache lines covering `len` bytes from `va` to the point of coherency.
    fn dcache_clean_range(va: VirtAddr, len: usize);

    /// Invalidates the entire instruction cache.
    fn icache_inv_all();

    /// Saves the calling core's banked non-secure mode registers.
    fn save_mode_regs(regs: &mut ModeRegs);

    /// Restores the calling core's banked non-secure mode registers.
    fn restore_mode_regs(regs: &ModeRegs);

    /// Saves the secure context and calls the firmware at `entry` with `arg`, with caches and MMU
    /// handled by the monitor's suspend path.
    ///
    /// Returns a negative value if the firmware returned without removing power (e.g. because
    /// an interrupt became pending), or zero or a positive value once the core has been powered
    /// up again and the secure context restored.
    ///
    /// # Safety
    ///
    /// `entry` must be the virtual address of a relocated copy of the low-power firmware whose
    /// caches have been maintained, and `arg` the virtual address of its descriptor.
    unsafe fn cpu_suspend(arg: VirtAddr, entry: VirtAddr) -> i32;

    /// Initialises the whole interrupt controller, distributor included.
    fn gic_init_primary();

    /// Initialises the calling core's interface of the interrupt controller.
    fn gic_init_secondary();

    /// Restores hardware configuration lost across suspend (e.g. the TZASC).
    fn wakeup_late();

    /// Returns the virtual address of the secure world's resume entry point.
    fn resume_entry() -> VirtAddr;

    /// Returns the position independent low-power firmware image to relocate into OCRAM.
    fn low_power_firmware() -> &'static [u8];
}

/// Reads a 32-bit device register at physical address `pa`, or returns `None` if it is not
/// mapped.
pub fn mmio_read32(pa: PhysAddr) -> Option<u32> {
    let va = PlatformImpl::phys_to_virt(pa, MemArea::IoSec)?;
    let register = PlatformImpl::virt_to_ptr(va)?.cast::<u32>();
    // SAFETY: The platform reports `va` as a device mapping of `pa`, and a volatile read of a
    // register has no side effects on Rust-visible memory.
    Some(unsafe { register.read_volatile() })
}
