// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Population of the low-power idle area in OCRAM.

use crate::{
    memory_map::{
        ANATOP_BASE, CCM_BASE, DDRC_BASE, GIC_BASE, GPC_BASE, IOMUXC_GPR_BASE,
        LOWPOWER_IDLE_OCRAM_BASE, SRC_BASE,
    },
    platform::{MemArea, Platform, PlatformImpl},
    pm_info::{
        BlockBase, NUM_ONLINE_CPUS_UNSET, PM_INFO_SIZE, PhysAddr, PmInfo, PmInfoRegion, VirtAddr,
    },
};
use log::debug;
use thiserror::Error;

/// Reasons the low-power idle area can't be set up.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum InitError {
    /// The physical address has no mapping in the secure world.
    #[error("{0} is not mapped")]
    Unmapped(PhysAddr),
    /// The virtual address has no physical counterpart.
    #[error("{0} has no physical address")]
    UnmappedVirt(VirtAddr),
    /// The low-power firmware doesn't fit behind the descriptor.
    #[error("Low-power firmware is {size} bytes but only {capacity} bytes are available")]
    FirmwareTooLarge {
        /// Size of the firmware image in bytes.
        size: usize,
        /// Bytes available behind the descriptor.
        capacity: usize,
    },
    /// The idle area isn't suitably aligned for the descriptor.
    #[error("Low-power idle area at {0} is misaligned")]
    Misaligned(VirtAddr),
}

/// Finds the low-power idle area in the secure world's coherent OCRAM mapping.
pub fn locate_region() -> Result<PmInfoRegion, InitError> {
    let pa = LOWPOWER_IDLE_OCRAM_BASE;
    let va = PlatformImpl::phys_to_virt(pa, MemArea::TeeCoherent).ok_or(InitError::Unmapped(pa))?;
    let base = PlatformImpl::virt_to_ptr(va).ok_or(InitError::UnmappedVirt(va))?;
    // SAFETY: The platform maps the idle area at `va` for the whole lifetime of the secure world,
    // and nothing but the low-power idle path and its relocated firmware uses it.
    unsafe { PmInfoRegion::new(base, va, pa) }
}

fn io_block(pa: PhysAddr) -> Result<BlockBase, InitError> {
    let va = PlatformImpl::phys_to_virt(pa, MemArea::IoSec).ok_or(InitError::Unmapped(pa))?;
    Ok(BlockBase { va, pa })
}

/// Builds the descriptor for `region`, with both counters in their initial state.
fn describe(region: &PmInfoRegion) -> Result<PmInfo, InitError> {
    let resume = PlatformImpl::resume_entry();
    Ok(PmInfo {
        va_base: region.va(),
        pa_base: region.pa(),
        tee_resume: PlatformImpl::virt_to_phys(resume).ok_or(InitError::UnmappedVirt(resume))?,
        pm_info_size: PM_INFO_SIZE as u32,
        num_online_cpus: NUM_ONLINE_CPUS_UNSET,
        num_lpi_cpus: 0,
        ddrc: io_block(DDRC_BASE)?,
        ccm: io_block(CCM_BASE)?,
        anatop: io_block(ANATOP_BASE)?,
        src: io_block(SRC_BASE)?,
        iomuxc_gpr: io_block(IOMUXC_GPR_BASE)?,
        gpc: io_block(GPC_BASE)?,
        gic: io_block(GIC_BASE)?,
        ..Default::default()
    })
}

/// Writes the descriptor and relocates the low-power firmware behind it.
///
/// Everything that can fail is checked before the area is touched, so on error the area is left
/// as it was. Running this again writes the same values and the same image.
pub fn init_lowpower_idle(region: &mut PmInfoRegion) -> Result<(), InitError> {
    let firmware = PlatformImpl::low_power_firmware();
    if firmware.len() > PmInfoRegion::FIRMWARE_CAPACITY {
        return Err(InitError::FirmwareTooLarge {
            size: firmware.len(),
            capacity: PmInfoRegion::FIRMWARE_CAPACITY,
        });
    }
    let info = describe(region)?;

    PlatformImpl::dcache_clean_inv_level1();
    region.write_descriptor(&info);
    region.firmware_area()[..firmware.len()].copy_from_slice(firmware);

    // The firmware reads the area with its data cache off and executes from it.
    PlatformImpl::dcache_clean_range(region.va(), PmInfoRegion::SIZE);
    PlatformImpl::icache_inv_all();

    debug!(
        "Low-power idle area at {} ({}): {} byte descriptor, {} byte firmware at {}",
        region.va(),
        region.pa(),
        PM_INFO_SIZE,
        firmware.len(),
        region.firmware_entry()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory_map::LOWPOWER_IDLE_OCRAM_SIZE,
        platform::test::{Call, IO_VA_OFFSET, OCRAM_VA, TEE_RAM_PA, TEST_FIRMWARE, with_state},
    };

    #[test]
    fn populates_descriptor_and_firmware() {
        let mut region = locate_region().unwrap();
        init_lowpower_idle(&mut region).unwrap();

        let info = region.snapshot();
        assert_eq!(info.va_base, OCRAM_VA);
        assert_eq!(info.pa_base, LOWPOWER_IDLE_OCRAM_BASE);
        assert_eq!(info.tee_resume, TEE_RAM_PA.offset(0x0400));
        assert_eq!(info.pm_info_size, 0x5c);
        assert_eq!(info.num_lpi_cpus, 0);
        assert_eq!(info.num_online_cpus, -1);
        assert_eq!(
            info.gpc,
            BlockBase {
                va: VirtAddr(GPC_BASE.0 + IO_VA_OFFSET),
                pa: GPC_BASE,
            }
        );
        assert_eq!(info.gic.pa, GIC_BASE);
        assert_eq!(info.ddrc.pa, DDRC_BASE);

        with_state(|state| {
            let ocram = state.ocram();
            assert_eq!(&ocram[PM_INFO_SIZE..PM_INFO_SIZE + TEST_FIRMWARE.len()], &TEST_FIRMWARE);
            // Only the image is copied, not the rest of the capacity.
            assert_eq!(ocram[PM_INFO_SIZE + TEST_FIRMWARE.len()], 0xa5);
        });
    }

    #[test]
    fn cache_maintenance_brackets_the_writes() {
        let mut region = locate_region().unwrap();
        init_lowpower_idle(&mut region).unwrap();

        assert_eq!(
            with_state(|state| state.take_calls()),
            vec![
                Call::DcacheCleanInvL1,
                Call::DcacheCleanRange {
                    va: OCRAM_VA,
                    len: LOWPOWER_IDLE_OCRAM_SIZE,
                },
                Call::IcacheInvAll,
            ]
        );
    }

    #[test]
    fn firmware_starts_behind_descriptor() {
        let region = locate_region().unwrap();
        assert_eq!(
            region.firmware_entry(),
            OCRAM_VA.offset(size_of::<PmInfo>() as u32)
        );
    }

    #[test]
    fn second_run_is_idempotent() {
        let mut region = locate_region().unwrap();
        init_lowpower_idle(&mut region).unwrap();
        let first = region.snapshot();
        let first_bytes = with_state(|state| state.ocram().to_vec());

        // Another handle on the same area, as if the guard had raced.
        let mut again = locate_region().unwrap();
        init_lowpower_idle(&mut again).unwrap();

        assert_eq!(again.snapshot(), first);
        assert_eq!(with_state(|state| state.ocram().to_vec()), first_bytes);
    }

    #[test]
    fn oversized_firmware_is_rejected_untouched() {
        let capacity = LOWPOWER_IDLE_OCRAM_SIZE - PM_INFO_SIZE;
        with_state(|state| {
            state.firmware = Box::leak(vec![0xee; capacity + 1].into_boxed_slice());
        });
        let before = with_state(|state| state.ocram().to_vec());

        let mut region = locate_region().unwrap();
        assert_eq!(
            init_lowpower_idle(&mut region),
            Err(InitError::FirmwareTooLarge {
                size: capacity + 1,
                capacity,
            })
        );
        assert_eq!(with_state(|state| state.ocram().to_vec()), before);
        assert!(with_state(|state| state.take_calls()).is_empty());
    }

    #[test]
    fn firmware_filling_the_capacity_fits() {
        let capacity = LOWPOWER_IDLE_OCRAM_SIZE - PM_INFO_SIZE;
        with_state(|state| {
            state.firmware = Box::leak(vec![0xee; capacity].into_boxed_slice());
        });

        let mut region = locate_region().unwrap();
        init_lowpower_idle(&mut region).unwrap();
        with_state(|state| assert!(state.ocram()[PM_INFO_SIZE..].iter().all(|&b| b == 0xee)));
    }

    #[test]
    fn unmapped_block_is_reported() {
        with_state(|state| state.unmapped = Some(CCM_BASE));
        let mut region = locate_region().unwrap();
        assert_eq!(
            init_lowpower_idle(&mut region),
            Err(InitError::Unmapped(CCM_BASE))
        );
        assert!(with_state(|state| state.take_calls()).is_empty());
    }

    #[test]
    fn unmapped_region_is_reported() {
        with_state(|state| state.unmapped = Some(LOWPOWER_IDLE_OCRAM_BASE));
        assert_eq!(
            locate_region().unwrap_err(),
            InitError::Unmapped(LOWPOWER_IDLE_OCRAM_BASE)
        );
    }

    #[test]
    fn unmapped_resume_entry_is_reported() {
        with_state(|state| state.resume_entry = VirtAddr(0x4000_0000));
        let mut region = locate_region().unwrap();
        assert_eq!(
            init_lowpower_idle(&mut region),
            Err(InitError::UnmappedVirt(VirtAddr(0x4000_0000)))
        );
    }

    #[test]
    fn display() {
        assert_eq!(
            InitError::Unmapped(GIC_BASE).to_string(),
            "PA 0x31000000 is not mapped"
        );
        assert_eq!(
            InitError::FirmwareTooLarge {
                size: 5000,
                capacity: 4004,
            }
            .to_string(),
            "Low-power firmware is 5000 bytes but only 4004 bytes are available"
        );
        assert_eq!(
            InitError::UnmappedVirt(VirtAddr(0x4000_0000)).to_string(),
            "VA 0x40000000 has no physical address"
        );
        assert_eq!(
            InitError::Misaligned(VirtAddr(0x0090_1001)).to_string(),
            "Low-power idle area at VA 0x00901001 is misaligned"
        );
    }

    #[test]
    fn is_an_error() {
        let error: &dyn core::error::Error = &InitError::Unmapped(SRC_BASE);
        assert!(error.source().is_none());
    }
}
