// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Two-core software lock that works without the exclusive monitors.
//!
//! Load/store-exclusive based spinlocks need the caches and MMU to be fully enabled on every
//! participant. During a low-power transition one core may run with its data cache off, so the
//! idle path instead uses a Peterson style lock made of one intent flag per core and a shared
//! turn word, all kept in the power-management descriptor in OCRAM. The relocated firmware takes
//! and releases the same lock using the same words.
//!
//! The construction is only correct for two participants.

use crate::{
    arm::dsb_sy,
    platform::{Platform, PlatformImpl},
};
use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicU32, Ordering},
};
use num_enum::{IntoPrimitive, TryFromPrimitive};

const _: () = assert!(
    PlatformImpl::CORE_COUNT == 2,
    "The pen lock only supports exactly two cores."
);

const FREE: u32 = 0;
const BUSY: u32 = 1;

/// One of the two cores taking part in the pen lock.
#[derive(Clone, Copy, Debug, Eq, IntoPrimitive, PartialEq, TryFromPrimitive)]
#[repr(u32)]
pub enum CpuId {
    /// The primary core.
    Cpu0 = 0,
    /// The secondary core.
    Cpu1 = 1,
}

impl CpuId {
    /// Returns the other participant.
    pub fn other(self) -> Self {
        match self {
            Self::Cpu0 => Self::Cpu1,
            Self::Cpu1 => Self::Cpu0,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// The three words making up the lock state.
#[derive(Debug)]
pub struct LockWords<'a> {
    flags: [&'a AtomicU32; 2],
    turn: &'a AtomicU32,
}

impl<'a> LockWords<'a> {
    /// Creates lock words from the intent flags of core 0 and core 1 and the turn word.
    pub fn new(flag0: &'a AtomicU32, flag1: &'a AtomicU32, turn: &'a AtomicU32) -> Self {
        Self {
            flags: [flag0, flag1],
            turn,
        }
    }

    /// Marks the lock as free.
    ///
    /// Must only be called while neither core can be using the lock, i.e. at boot.
    pub fn reset(&self) {
        for flag in self.flags {
            flag.store(FREE, Ordering::SeqCst);
        }
        self.turn.store(CpuId::Cpu0.into(), Ordering::SeqCst);
        dsb_sy();
    }

    /// Returns the intent flag of the given core.
    pub fn flag(&self, cpu: CpuId) -> &AtomicU32 {
        self.flags[cpu.index()]
    }

    /// Returns whether the given core currently holds or is waiting for the lock.
    #[cfg(test)]
    pub fn is_busy(&self, cpu: CpuId) -> bool {
        self.flag(cpu).load(Ordering::Acquire) == BUSY
    }

    /// Spins until `cpu` owns the lock.
    ///
    /// The core announces its intent, then gives the turn away by writing its own id into the
    /// turn word. It may enter once the other core is not interested or the other core has
    /// written the turn word after it. The store of the flag must be ordered before the load of
    /// the other flag, so all accesses are sequentially consistent and followed by a barrier for
    /// observers running with their caches off.
    fn acquire(&self, cpu: CpuId) {
        self.flag(cpu).store(BUSY, Ordering::SeqCst);
        dsb_sy();
        self.turn.store(cpu.into(), Ordering::SeqCst);
        loop {
            dsb_sy();
            if self.flag(cpu.other()).load(Ordering::SeqCst) != BUSY
                || self.turn.load(Ordering::SeqCst) != u32::from(cpu)
            {
                break;
            }
            spin_loop();
        }
    }

    fn release(&self, cpu: CpuId) {
        dsb_sy();
        self.flag(cpu).store(FREE, Ordering::Release);
    }
}

/// A lock protecting `T` with [`LockWords`].
///
/// There is no timeout: if the other core never releases the lock, `lock` spins forever. Taking
/// the lock twice from the same core deadlocks.
pub struct PenLock<'a, T> {
    words: LockWords<'a>,
    data: UnsafeCell<T>,
}

// SAFETY: Access to `data` is serialised by the lock words, in the same way as `spin::Mutex`.
unsafe impl<T: Send> Sync for PenLock<'_, T> {}

impl<'a, T> PenLock<'a, T> {
    /// Creates a lock around `data` using the given words.
    pub fn new(words: LockWords<'a>, data: T) -> Self {
        Self {
            words,
            data: UnsafeCell::new(data),
        }
    }

    /// Returns the lock state words.
    #[cfg(test)]
    pub fn words(&self) -> &LockWords<'a> {
        &self.words
    }

    /// Spins until `cpu` owns the lock and returns a guard which releases it when dropped.
    pub fn lock(&self, cpu: CpuId) -> PenLockGuard<'_, T> {
        self.words.acquire(cpu);
        PenLockGuard {
            words: &self.words,
            // SAFETY: We hold the lock, so no other guard refers to the data until it is dropped.
            data: unsafe { &mut *self.data.get() },
            cpu,
        }
    }
}

/// Owned access to the data of a [`PenLock`], released on drop.
pub struct PenLockGuard<'l, T> {
    words: &'l LockWords<'l>,
    data: &'l mut T,
    cpu: CpuId,
}

impl<T> PenLockGuard<'_, T> {
    /// The core holding the lock.
    #[cfg(test)]
    pub fn cpu(&self) -> CpuId {
        self.cpu
    }
}

impl<T> Deref for PenLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data
    }
}

impl<T> DerefMut for PenLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}

impl<T> Drop for PenLockGuard<'_, T> {
    fn drop(&mut self) {
        self.words.release(self.cpu);
    }
}
