//! Si5338 programmed over I2C with 8-bit registers behind a one-byte
//! sub-address; registers 256..351 sit in a second bank behind the
//! page-select register at 0xFF.
//!
//! I2C programming procedure (Si5338 datasheet, figure 9):
//! 1. Disable outputs: OEB_ALL = 1, reg230[4]
//! 2. Pause LOL: DIS_LOL = 1, reg241 = 0xE5
//! 3. Write the ClockBuilder Pro register map, honoring the per-register
//!    write-allowed mask (0x00 skip, 0xFF plain write, else read-modify-write)
//! 4. Wait for the input clocks to validate: reg218 & LOS_MASK == 0
//! 5. Configure the PLL for locking: FCAL_OVRD_EN = 0, reg49[7]
//! 6. Initiate locking: SOFT_RESET = 1, reg246[1], then wait at least 25 ms
//! 7. Restart LOL: reg241 = 0x65
//! 8. Wait for lock: reg218 & LOCK_MASK == 0
//! 9. Copy the FCAL result to the active registers:
//!    235 -> 45, 236 -> 46, 237[1:0] -> 47[1:0]
//! 10. Freeze calibration: FCAL_OVRD_EN = 1, reg49[7]
//! 11. Enable outputs: OEB_ALL = 0, reg230[4]
//!
//! The register map itself comes out of ClockBuilder Pro as an
//! (address, value, mask) table; this crate only sequences it.

#![no_std]

// defmt tracing is optional so the crate tests on the host without a
// global logger. The shims expand to nothing with the feature off.
macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::trace!($($arg)*);
    }};
}

macro_rules! info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::info!($($arg)*);
    }};
}

pub mod bus;
pub mod registers;
pub mod si5338;

pub use crate::bus::{I2cRegisterBus, RegisterBus, SubAddressMode};
pub use crate::registers::RegisterEntry;
pub use crate::si5338::{Error, PollBudget, Presence, Si5338, Stage, Timing};
