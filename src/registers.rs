//! Si5338 register addresses, bit masks and the ClockBuilder Pro
//! register-map entry type.
//!
//! Addresses and magic values are taken from the Si5338 datasheet's I2C
//! programming procedure. The part has 352 registers in two banks of 256;
//! the page-select register at 0xFF switches between them.

/// Si5338 I2C default device address.
pub const DEVICE_ADDRESS: u8 = 0x70;

/// Total register count across both banks.
pub const REGISTER_COUNT: usize = 352;

/// Registers per bank.
pub const PAGE_SIZE: usize = 256;

/// PAGE_SEL, bit 0 selects the bank exposed at sub-addresses 0..=255.
pub const PAGE_SELECT: u16 = 0xFF;

/// Output enable control; bit 4 is OEB_ALL.
pub const OUTPUT_ENABLE: u16 = 230;
pub const OEB_ALL: u8 = 0x10;

/// Loss-of-lock control. Whole-byte values per the programming procedure,
/// not bit merges: 0xE5 pauses LOL monitoring (DIS_LOL = 1), 0x65 resumes
/// it (DIS_LOL = 0).
pub const LOL_CONTROL: u16 = 241;
pub const LOL_PAUSED: u8 = 0xE5;
pub const LOL_RUNNING: u8 = 0x65;

/// Alarm status register.
pub const ALARM_STATUS: u16 = 218;
/// Loss-of-signal bits for the inputs used in the reference configuration
/// (xtal on IN1/IN2); adjust when monitoring other inputs.
pub const LOS_MASK: u8 = 0x04;
/// PLL_LOL, SYS_CAL and friends; all must clear for the PLL to be locked.
pub const LOCK_MASK: u8 = 0x15;

/// Calibration control; bit 7 is FCAL_OVRD_EN.
pub const FCAL_OVERRIDE: u16 = 49;
pub const FCAL_OVRD_EN: u8 = 0x80;

/// Soft reset trigger, written as a whole byte (SOFT_RESET, bit 1).
pub const SOFT_RESET: u16 = 246;
pub const SOFT_RESET_TRIGGER: u8 = 0x02;

/// FCAL result registers, filled in by the device during lock acquisition.
pub const FCAL_LOW: u16 = 235;
pub const FCAL_MID: u16 = 236;
pub const FCAL_HIGH: u16 = 237;

/// Active FCAL registers the result is copied into to freeze calibration.
pub const FCAL_ACTIVE_LOW: u16 = 45;
pub const FCAL_ACTIVE_MID: u16 = 46;
pub const FCAL_ACTIVE_HIGH: u16 = 47;
/// Bits of FCAL_HIGH that carry calibration data; the rest of
/// FCAL_ACTIVE_HIGH is left as the device had it.
pub const FCAL_HIGH_MASK: u8 = 0x03;

/// One row of a ClockBuilder Pro register map export.
///
/// `mask` marks the bits of `value` that may be written: 0x00 means the
/// register is fully reserved and must not be touched, 0xFF means a plain
/// overwrite, anything else calls for a read-modify-write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterEntry {
    pub address: u16,
    pub value: u8,
    pub mask: u8,
}

impl RegisterEntry {
    pub const fn new(address: u16, value: u8, mask: u8) -> Self {
        RegisterEntry {
            address,
            value,
            mask,
        }
    }

    /// Merge `value` into `current`, touching only the bits of `mask`.
    pub const fn merge(&self, current: u8) -> u8 {
        (current & !self.mask) | (self.value & self.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_selects_masked_bits() {
        // Per-bit oracle over the full input space: a mask bit takes the
        // new value's bit, a clear mask bit keeps the current bit.
        for current in 0..=255u8 {
            for value in 0..=255u8 {
                for mask in 0..=255u8 {
                    let entry = RegisterEntry::new(0, value, mask);
                    let merged = entry.merge(current);
                    for bit in 0..8 {
                        let select = 1u8 << bit;
                        let expected = if mask & select != 0 { value } else { current };
                        assert_eq!(
                            merged & select,
                            expected & select,
                            "current={:#04x} value={:#04x} mask={:#04x} bit={}",
                            current,
                            value,
                            mask,
                            bit
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn merge_identity_cases() {
        assert_eq!(RegisterEntry::new(7, 0x05, 0x0F).merge(0x3A), 0x35);
        assert_eq!(RegisterEntry::new(0, 0xAA, 0x00).merge(0x55), 0x55);
        assert_eq!(RegisterEntry::new(0, 0xAA, 0xFF).merge(0x55), 0xAA);
    }
}
