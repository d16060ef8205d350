// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Decoding of the PSCI `power_state` parameter in the original (non-extended) format.

use core::fmt::{self, Display, Formatter};

const STATE_ID_MASK: u32 = 0xffff;
const TYPE_SHIFT: u32 = 16;
const TYPE_MASK: u32 = 1 << TYPE_SHIFT;
const POWER_LEVEL_SHIFT: u32 = 24;
const POWER_LEVEL_MASK: u32 = 0x3 << POWER_LEVEL_SHIFT;

/// Coarse class of a requested power state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PowerStateType {
    /// The core keeps its context; execution resumes after the `wfi`.
    StandbyOrRetention,
    /// The core loses its context and restarts through the warm boot path.
    PowerDown,
}

/// A raw `power_state` value as passed to `CPU_SUSPEND`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PowerState(pub u32);

impl PowerState {
    /// Returns whether this is a power-down or standby request.
    pub fn state_type(self) -> PowerStateType {
        if self.0 & TYPE_MASK == 0 {
            PowerStateType::StandbyOrRetention
        } else {
            PowerStateType::PowerDown
        }
    }

    /// Returns the platform-specific state id.
    pub fn state_id(self) -> u16 {
        (self.0 & STATE_ID_MASK) as u16
    }

    /// Returns the highest affinity level affected by the request.
    pub fn power_level(self) -> u32 {
        (self.0 & POWER_LEVEL_MASK) >> POWER_LEVEL_SHIFT
    }
}

impl Display for PowerState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{:#010x} ({:?}, level {}, id {:#x})",
            self.0,
            self.state_type(),
            self.power_level(),
            self.state_id()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode() {
        let standby = PowerState(0x0000_0001);
        assert_eq!(standby.state_type(), PowerStateType::StandbyOrRetention);
        assert_eq!(standby.state_id(), 1);
        assert_eq!(standby.power_level(), 0);

        let cluster_off = PowerState(0x0101_0033);
        assert_eq!(cluster_off.state_type(), PowerStateType::PowerDown);
        assert_eq!(cluster_off.state_id(), 0x33);
        assert_eq!(cluster_off.power_level(), 1);
    }

    #[test]
    fn extended_format_bit_is_not_the_type() {
        // Bit 30 selects power-down only in the extended format, which this SoC does not use.
        assert_eq!(
            PowerState(1 << 30).state_type(),
            PowerStateType::StandbyOrRetention
        );
    }

    #[test]
    fn display() {
        assert_eq!(
            PowerState(0x0001_0000).to_string(),
            "0x00010000 (PowerDown, level 0, id 0x0)"
        );
    }
}
