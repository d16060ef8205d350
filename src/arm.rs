// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Barrier and hint instructions shared by ARMv7-A and AArch64.
//!
//! On other architectures (i.e. host unit tests) these are no-ops; the atomics they accompany
//! already provide the ordering the tests rely on.

#[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
use core::arch::asm;

/// Issues a data synchronization barrier (`dsb`) instruction for the full system (`sy`).
pub fn dsb_sy() {
    // SAFETY: `dsb` does not violate safe Rust guarantees.
    #[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
    unsafe {
        asm!("dsb sy", options(nostack));
    }
}

/// Waits for an interrupt (`wfi`).
#[cfg_attr(test, allow(unused))]
pub fn wfi() {
    // SAFETY: `wfi` does not violate safe Rust guarantees.
    #[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
    unsafe {
        asm!("wfi", options(nomem, nostack, preserves_flags));
    }
}
