// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The power-management descriptor shared with the relocated low-power firmware.
//!
//! The descriptor lives at the start of the low-power idle area in OCRAM and the firmware image
//! is copied right behind it. The firmware runs with the MMU and caches in transition, so it finds
//! everything it needs (its own location, the resume entry point and the bases of the hardware
//! blocks it programs) at the fixed offsets below. Changing the layout requires rebuilding the
//! firmware with matching offsets.

use crate::{init::InitError, memory_map::LOWPOWER_IDLE_OCRAM_SIZE, pen_lock::LockWords};
use core::{
    fmt::{self, Display, Formatter},
    mem::{offset_of, size_of},
    ptr::NonNull,
    slice,
    sync::atomic::AtomicU32,
};
use zerocopy::{FromBytes, Immutable, IntoBytes};

/// A physical address on the 32-bit SoC bus.
#[derive(
    Clone, Copy, Debug, Default, Eq, FromBytes, Immutable, IntoBytes, Ord, PartialEq,
    PartialOrd,
)]
#[repr(transparent)]
pub struct PhysAddr(pub u32);

impl PhysAddr {
    /// Returns the address `offset` bytes above this one.
    pub const fn offset(self, offset: u32) -> Self {
        Self(self.0 + offset)
    }
}

impl Display for PhysAddr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "PA {:#010x}", self.0)
    }
}

/// A virtual address in the secure world's translation regime.
#[derive(
    Clone, Copy, Debug, Default, Eq, FromBytes, Immutable, IntoBytes, Ord, PartialEq,
    PartialOrd,
)]
#[repr(transparent)]
pub struct VirtAddr(pub u32);

impl VirtAddr {
    /// Returns the address `offset` bytes above this one.
    pub const fn offset(self, offset: u32) -> Self {
        Self(self.0 + offset)
    }
}

impl Display for VirtAddr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "VA {:#010x}", self.0)
    }
}

/// Virtual and physical base of one memory-mapped hardware block.
#[derive(
    Clone, Copy, Debug, Default, Eq, FromBytes, Immutable, IntoBytes, PartialEq,
)]
#[repr(C)]
pub struct BlockBase {
    /// Base while the MMU is on.
    pub va: VirtAddr,
    /// Base while the MMU is off.
    pub pa: PhysAddr,
}

/// Value of `num_online_cpus` before the first suspend has counted the cores.
pub const NUM_ONLINE_CPUS_UNSET: i32 = -1;

/// The descriptor at the start of the low-power idle area.
#[derive(Clone, Debug, Default, Eq, FromBytes, Immutable, IntoBytes, PartialEq)]
#[repr(C)]
pub struct PmInfo {
    /// Virtual base of the idle area, i.e. of this descriptor.
    pub va_base: VirtAddr,
    /// Physical base of the idle area.
    pub pa_base: PhysAddr,
    /// Where the firmware jumps back into the secure world after power is restored.
    pub tee_resume: PhysAddr,
    /// Size of this descriptor; the firmware image starts this many bytes after `va_base`.
    pub pm_info_size: u32,
    /// Number of cores online when the last suspend started.
    pub num_online_cpus: i32,
    /// Number of cores currently inside the low-power idle window.
    pub num_lpi_cpus: u32,
    /// Pen lock turn word.
    pub val: u32,
    /// Pen lock intent flag of core 0.
    pub flag0: u32,
    /// Pen lock intent flag of core 1.
    pub flag1: u32,
    /// DDR controller.
    pub ddrc: BlockBase,
    /// Clock control module.
    pub ccm: BlockBase,
    /// Analog power block.
    pub anatop: BlockBase,
    /// System reset controller.
    pub src: BlockBase,
    /// IOMUX controller general purpose registers.
    pub iomuxc_gpr: BlockBase,
    /// General power controller.
    pub gpc: BlockBase,
    /// Interrupt controller.
    pub gic: BlockBase,
}

pub const PM_INFO_VA_BASE_OFFSET: usize = 0x00;
pub const PM_INFO_PA_BASE_OFFSET: usize = 0x04;
pub const PM_INFO_TEE_RESUME_OFFSET: usize = 0x08;
pub const PM_INFO_SIZE_OFFSET: usize = 0x0c;
pub const PM_INFO_NUM_ONLINE_CPUS_OFFSET: usize = 0x10;
pub const PM_INFO_NUM_LPI_CPUS_OFFSET: usize = 0x14;
pub const PM_INFO_VAL_OFFSET: usize = 0x18;
pub const PM_INFO_FLAG0_OFFSET: usize = 0x1c;
pub const PM_INFO_FLAG1_OFFSET: usize = 0x20;
pub const PM_INFO_DDRC_OFFSET: usize = 0x24;
pub const PM_INFO_CCM_OFFSET: usize = 0x2c;
pub const PM_INFO_ANATOP_OFFSET: usize = 0x34;
pub const PM_INFO_SRC_OFFSET: usize = 0x3c;
pub const PM_INFO_IOMUXC_GPR_OFFSET: usize = 0x44;
pub const PM_INFO_GPC_OFFSET: usize = 0x4c;
pub const PM_INFO_GIC_OFFSET: usize = 0x54;
/// Total size of [`PmInfo`] as seen by the firmware.
pub const PM_INFO_SIZE: usize = 0x5c;

const _: () = {
    assert!(offset_of!(PmInfo, va_base) == PM_INFO_VA_BASE_OFFSET);
    assert!(offset_of!(PmInfo, pa_base) == PM_INFO_PA_BASE_OFFSET);
    assert!(offset_of!(PmInfo, tee_resume) == PM_INFO_TEE_RESUME_OFFSET);
    assert!(offset_of!(PmInfo, pm_info_size) == PM_INFO_SIZE_OFFSET);
    assert!(offset_of!(PmInfo, num_online_cpus) == PM_INFO_NUM_ONLINE_CPUS_OFFSET);
    assert!(offset_of!(PmInfo, num_lpi_cpus) == PM_INFO_NUM_LPI_CPUS_OFFSET);
    assert!(offset_of!(PmInfo, val) == PM_INFO_VAL_OFFSET);
    assert!(offset_of!(PmInfo, flag0) == PM_INFO_FLAG0_OFFSET);
    assert!(offset_of!(PmInfo, flag1) == PM_INFO_FLAG1_OFFSET);
    assert!(offset_of!(PmInfo, ddrc) == PM_INFO_DDRC_OFFSET);
    assert!(offset_of!(PmInfo, ccm) == PM_INFO_CCM_OFFSET);
    assert!(offset_of!(PmInfo, anatop) == PM_INFO_ANATOP_OFFSET);
    assert!(offset_of!(PmInfo, src) == PM_INFO_SRC_OFFSET);
    assert!(offset_of!(PmInfo, iomuxc_gpr) == PM_INFO_IOMUXC_GPR_OFFSET);
    assert!(offset_of!(PmInfo, gpc) == PM_INFO_GPC_OFFSET);
    assert!(offset_of!(PmInfo, gic) == PM_INFO_GIC_OFFSET);
    assert!(size_of::<PmInfo>() == PM_INFO_SIZE);
    assert!(
        PM_INFO_SIZE < LOWPOWER_IDLE_OCRAM_SIZE,
        "The descriptor leaves no room for the low-power firmware."
    );
};

/// Handle on the low-power idle area: the descriptor followed by the firmware image.
///
/// No reference covering the whole descriptor is ever created, because the other core may be
/// polling the pen lock words at any time. Fields are accessed individually, the counters with
/// volatile accesses and the lock words atomically.
#[derive(Debug)]
pub struct PmInfoRegion {
    va: VirtAddr,
    pa: PhysAddr,
    base: NonNull<PmInfo>,
}

// SAFETY: The region is plain memory that is valid for the lifetime of the program. Mutable
// accesses go through `&mut self`, which the controller only obtains while holding the pen lock.
unsafe impl Send for PmInfoRegion {}

// SAFETY: The only accesses through `&self` are volatile reads and the atomic lock words.
unsafe impl Sync for PmInfoRegion {}

impl PmInfoRegion {
    /// Size of the whole area.
    pub const SIZE: usize = LOWPOWER_IDLE_OCRAM_SIZE;

    /// Bytes available for the firmware image behind the descriptor.
    pub const FIRMWARE_CAPACITY: usize = Self::SIZE - PM_INFO_SIZE;

    /// Creates a handle on the area at `base`, which the SoC sees at `va` and `pa`.
    ///
    /// # Safety
    ///
    /// `base` must point to `SIZE` bytes of memory which stay valid for the rest of the program
    /// and which are not accessed through any other Rust reference or pointer, other than the
    /// lock words returned by [`Self::lock_words`] and other handles on the same area that are
    /// only used while the pen lock is held.
    pub unsafe fn new(base: NonNull<u8>, va: VirtAddr, pa: PhysAddr) -> Result<Self, InitError> {
        let base = base.cast::<PmInfo>();
        if !base.as_ptr().is_aligned() {
            return Err(InitError::Misaligned(va));
        }
        Ok(Self { va, pa, base })
    }

    /// Virtual base of the area.
    pub fn va(&self) -> VirtAddr {
        self.va
    }

    /// Physical base of the area.
    pub fn pa(&self) -> PhysAddr {
        self.pa
    }

    /// Virtual address of the first instruction of the relocated firmware.
    pub fn firmware_entry(&self) -> VirtAddr {
        self.va.offset(PM_INFO_SIZE as u32)
    }

    /// Returns the pen lock words inside the descriptor.
    pub fn lock_words(&self) -> LockWords<'static> {
        let base = self.base.as_ptr();
        // SAFETY: The words are inside the area, which is valid and suitably aligned for the rest
        // of the program as required by `new`. They are only ever accessed atomically, here and by
        // the firmware.
        unsafe {
            LockWords::new(
                AtomicU32::from_ptr(&raw mut (*base).flag0),
                AtomicU32::from_ptr(&raw mut (*base).flag1),
                AtomicU32::from_ptr(&raw mut (*base).val),
            )
        }
    }

    /// Writes every descriptor field except the pen lock words, which may be in use.
    pub fn write_descriptor(&mut self, info: &PmInfo) {
        let base = self.base.as_ptr();
        // SAFETY: All fields are inside the area, which is valid as required by `new`. We hold
        // `&mut self`, so no other core reads these fields until the pen lock is released.
        unsafe {
            (&raw mut (*base).va_base).write_volatile(info.va_base);
            (&raw mut (*base).pa_base).write_volatile(info.pa_base);
            (&raw mut (*base).tee_resume).write_volatile(info.tee_resume);
            (&raw mut (*base).pm_info_size).write_volatile(info.pm_info_size);
            (&raw mut (*base).num_online_cpus).write_volatile(info.num_online_cpus);
            (&raw mut (*base).num_lpi_cpus).write_volatile(info.num_lpi_cpus);
            (&raw mut (*base).ddrc).write_volatile(info.ddrc);
            (&raw mut (*base).ccm).write_volatile(info.ccm);
            (&raw mut (*base).anatop).write_volatile(info.anatop);
            (&raw mut (*base).src).write_volatile(info.src);
            (&raw mut (*base).iomuxc_gpr).write_volatile(info.iomuxc_gpr);
            (&raw mut (*base).gpc).write_volatile(info.gpc);
            (&raw mut (*base).gic).write_volatile(info.gic);
        }
    }

    /// Number of cores currently inside the low-power idle window.
    pub fn num_lpi_cpus(&self) -> u32 {
        // SAFETY: The field is inside the area, which is valid as required by `new`.
        unsafe { (&raw const (*self.base.as_ptr()).num_lpi_cpus).read_volatile() }
    }

    /// Sets the number of cores inside the low-power idle window.
    pub fn set_num_lpi_cpus(&mut self, count: u32) {
        // SAFETY: The field is inside the area, which is valid as required by `new`.
        unsafe { (&raw mut (*self.base.as_ptr()).num_lpi_cpus).write_volatile(count) }
    }

    /// Number of cores online when the last suspend started, or [`NUM_ONLINE_CPUS_UNSET`].
    pub fn num_online_cpus(&self) -> i32 {
        // SAFETY: The field is inside the area, which is valid as required by `new`.
        unsafe { (&raw const (*self.base.as_ptr()).num_online_cpus).read_volatile() }
    }

    /// Records the number of cores online.
    pub fn set_num_online_cpus(&mut self, count: i32) {
        // SAFETY: The field is inside the area, which is valid as required by `new`.
        unsafe { (&raw mut (*self.base.as_ptr()).num_online_cpus).write_volatile(count) }
    }

    /// Returns the bytes behind the descriptor, where the firmware image is installed.
    pub fn firmware_area(&mut self) -> &mut [u8] {
        // SAFETY: The firmware area lies entirely inside the `SIZE` bytes required by `new` and
        // does not overlap the descriptor. We hold `&mut self`, so nothing else in Rust refers to
        // it for the lifetime of the returned slice.
        unsafe {
            slice::from_raw_parts_mut(
                self.base.as_ptr().cast::<u8>().add(PM_INFO_SIZE),
                Self::FIRMWARE_CAPACITY,
            )
        }
    }

    /// Reads back the whole descriptor.
    ///
    /// Only used from single-threaded tests, as the lock words are read non-atomically.
    #[cfg(test)]
    pub fn snapshot(&self) -> PmInfo {
        // SAFETY: The descriptor is inside the area, which is valid as required by `new`, and
        // nothing writes it while the slice is alive.
        let bytes = unsafe { slice::from_raw_parts(self.base.as_ptr().cast::<u8>(), PM_INFO_SIZE) };
        PmInfo::read_from_bytes(bytes).unwrap()
    }
}
