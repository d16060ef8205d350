// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The i.MX7Dual running the secure world on its two Cortex-A7 cores.

use super::{MemArea, Platform};
use crate::{
    context::ModeRegs,
    logger::LockedWriter,
    pm_info::{PhysAddr, VirtAddr},
};
use core::{
    ffi::c_void,
    fmt::{self, Write},
    ptr::NonNull,
    slice,
};

/// `enum teecore_memtypes` values of the secure environment's MMU layer.
const MEM_AREA_TEE_COHERENT: u32 = 5;
const MEM_AREA_IO_SEC: u32 = 10;

/// `dcache_op_level1` operation cleaning and invalidating by set/way.
const DCACHE_OP_CLEAN_INV: u32 = 1;

unsafe extern "C" {
    /// Returns the linear index of the calling core, 0 or 1 on this SoC.
    safe fn get_core_pos() -> usize;

    /// Returns the virtual address mapping `pa` with the given memory type, or null.
    safe fn phys_to_virt(pa: u32, memory_type: u32) -> *mut c_void;

    /// Returns the physical address mapped at `va`, or 0.
    fn virt_to_phys(va: *mut c_void) -> u32;

    safe fn dcache_op_level1(op: u32);
    fn dcache_clean_range(va: *mut c_void, len: usize);
    safe fn icache_inv_all();

    fn sm_save_modes_regs(regs: *mut ModeRegs);
    fn sm_restore_modes_regs(regs: *const ModeRegs);

    /// Saves the secure context and calls `func(arg)` on the way down; see
    /// [`Platform::cpu_suspend`].
    fn sm_pm_cpu_suspend(arg: u32, func: unsafe extern "C" fn(u32) -> i32) -> i32;

    safe fn main_init_gic();
    safe fn main_secondary_init_gic();
    safe fn plat_cpu_wakeup_late();

    safe fn console_putc(ch: i32);

    /// The secure world's warm resume entry point. Only its address is used.
    fn v7_cpu_resume();

    // Bounds of the position independent low-power firmware, from its assembly source. These
    // aren't really variables, just symbols whose addresses we need.
    static imx7d_low_power_idle_start: u8;
    static imx7d_low_power_idle_end: u8;
}

/// The secure console.
pub struct Console;

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                console_putc(i32::from(b'\r'));
            }
            console_putc(i32::from(byte));
        }
        Ok(())
    }
}

/// The i.MX7D platform.
pub struct Imx7d;

impl Platform for Imx7d {
    const CORE_COUNT: usize = 2;

    type LogSinkImpl = LockedWriter<Console>;

    fn log_sink() -> Self::LogSinkImpl {
        LockedWriter::new(Console)
    }

    fn core_position() -> usize {
        get_core_pos()
    }

    fn phys_to_virt(pa: PhysAddr, area: MemArea) -> Option<VirtAddr> {
        let memory_type = match area {
            MemArea::TeeCoherent => MEM_AREA_TEE_COHERENT,
            MemArea::IoSec => MEM_AREA_IO_SEC,
        };
        let va = phys_to_virt(pa.0, memory_type);
        // Virtual addresses are 32 bits wide on this SoC.
        (!va.is_null()).then(|| VirtAddr(va as usize as u32))
    }

    fn virt_to_phys(va: VirtAddr) -> Option<PhysAddr> {
        // SAFETY: `virt_to_phys` only walks the translation tables and doesn't access `va`.
        let pa = unsafe { virt_to_phys(va.0 as usize as *mut c_void) };
        (pa != 0).then_some(PhysAddr(pa))
    }

    fn virt_to_ptr(va: VirtAddr) -> Option<NonNull<u8>> {
        NonNull::new(va.0 as usize as *mut u8)
    }

    fn dcache_clean_inv_level1() {
        dcache_op_level1(DCACHE_OP_CLEAN_INV);
    }

    fn dcache_clean_range(va: VirtAddr, len: usize) {
        // SAFETY: Cleaning only writes back dirty lines, it doesn't change the memory content as
        // seen by Rust.
        unsafe { dcache_clean_range(va.0 as usize as *mut c_void, len) }
    }

    fn icache_inv_all() {
        icache_inv_all();
    }

    fn save_mode_regs(regs: &mut ModeRegs) {
        // SAFETY: `regs` is a valid, exclusively borrowed `ModeRegs`, which matches the layout the
        // monitor writes.
        unsafe { sm_save_modes_regs(regs) }
    }

    fn restore_mode_regs(regs: &ModeRegs) {
        // SAFETY: `regs` is a valid `ModeRegs`, which the monitor only reads.
        unsafe { sm_restore_modes_regs(regs) }
    }

    unsafe fn cpu_suspend(arg: VirtAddr, entry: VirtAddr) -> i32 {
        // SAFETY: The caller guarantees that `entry` is the start of the relocated firmware, whose
        // entry point has this signature.
        let func = unsafe {
            core::mem::transmute::<usize, unsafe extern "C" fn(u32) -> i32>(entry.0 as usize)
        };
        // SAFETY: The monitor saves and restores everything the Rust code relies on around the
        // call, and `func` is valid as above.
        unsafe { sm_pm_cpu_suspend(arg.0, func) }
    }

    fn gic_init_primary() {
        main_init_gic();
    }

    fn gic_init_secondary() {
        main_secondary_init_gic();
    }

    fn wakeup_late() {
        plat_cpu_wakeup_late();
    }

    fn resume_entry() -> VirtAddr {
        VirtAddr(v7_cpu_resume as usize as u32)
    }

    fn low_power_firmware() -> &'static [u8] {
        let start = &raw const imx7d_low_power_idle_start;
        let end = &raw const imx7d_low_power_idle_end;
        // SAFETY: The two symbols delimit the firmware code in the read-only text section, which
        // is never written.
        unsafe { slice::from_raw_parts(start, end.addr() - start.addr()) }
    }
}
