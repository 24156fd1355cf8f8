//! Si5338 bring-up sequencer.
//!
//! Drives the datasheet's I2C programming procedure against a ClockBuilder
//! Pro register map: disable outputs, pause LOL, apply the map, wait for a
//! valid input clock, soft-reset the PLL, wait for lock, freeze the FCAL
//! result, re-enable outputs.
//!
//! The sequence is not transactional. A transport error aborts immediately
//! and leaves the device in whatever state the last successful write
//! produced; retry from the top or leave the outputs disabled.

use embedded_hal::blocking::delay::DelayMs;

use crate::bus::{RegisterBus, SubAddressMode};
use crate::registers::{
    RegisterEntry, ALARM_STATUS, DEVICE_ADDRESS, FCAL_ACTIVE_HIGH, FCAL_ACTIVE_LOW,
    FCAL_ACTIVE_MID, FCAL_HIGH, FCAL_HIGH_MASK, FCAL_LOW, FCAL_MID, FCAL_OVERRIDE, FCAL_OVRD_EN,
    LOCK_MASK, LOL_CONTROL, LOL_PAUSED, LOL_RUNNING, LOS_MASK, OEB_ALL, OUTPUT_ENABLE, PAGE_SELECT,
    PAGE_SIZE, REGISTER_COUNT, SOFT_RESET, SOFT_RESET_TRIGGER,
};

/// Steps of the programming procedure, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    DisableOutputs,
    PauseLossOfLock,
    ApplyTable,
    WaitInputClockValid,
    DisableCalibrationOverride,
    TriggerSoftReset,
    ResumeLossOfLock,
    WaitLocked,
    CopyCalibrationBits,
    EnableCalibrationOverride,
    EnableOutputs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Bus transfer failed.
    Bus(E),
    /// A polling stage exhausted its [`PollBudget`].
    Timeout(Stage),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Bus(e)
    }
}

/// Result of a presence probe. An absent device is an answer, not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Presence {
    Present,
    Absent,
}

/// Bound on an alarm polling loop: up to `attempts` status reads, spaced
/// `interval_ms` apart. The datasheet gives no bound, so the caller must;
/// `attempts` of zero times out without touching the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollBudget {
    pub attempts: u32,
    pub interval_ms: u32,
}

/// Delay parameters for one programming run.
///
/// The settle delays are margin values from the datasheet, dependent on the
/// chip and bus speed, hence tunable. The poll budget has no default on
/// purpose: how long to wait for an input clock or for lock is a board
/// decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Delay after every register-map write.
    pub write_settle_ms: u32,
    /// Delay after triggering the PLL soft reset (datasheet: at least 25 ms).
    pub reset_settle_ms: u32,
    pub poll: PollBudget,
}

impl Timing {
    /// The reference margins: 200 ms per map write, 50 ms after soft reset.
    pub const fn datasheet(poll: PollBudget) -> Self {
        Timing {
            write_settle_ms: 200,
            reset_settle_ms: 50,
            poll,
        }
    }
}

/// Si5338 driver over a [`RegisterBus`] and a blocking delay.
///
/// Not re-entrant: the device's page-select state is shared, so run one
/// operation to completion before touching the same device from elsewhere.
pub struct Si5338<BUS, D> {
    bus: BUS,
    delay: D,
    address: u8,
}

impl<BUS, D> Si5338<BUS, D>
where
    BUS: RegisterBus,
    D: DelayMs<u32>,
{
    /// Driver at the default device address 0x70.
    pub fn new(bus: BUS, delay: D) -> Self {
        Si5338::with_address(bus, delay, DEVICE_ADDRESS)
    }

    pub fn with_address(bus: BUS, delay: D, address: u8) -> Self {
        Si5338 {
            bus,
            delay,
            address,
        }
    }

    /// Release the bus and delay.
    pub fn free(self) -> (BUS, D) {
        (self.bus, self.delay)
    }

    /// Check for the device with a one-byte read of register 0.
    pub fn probe(&mut self) -> Presence {
        let mut scratch = [0u8; 1];
        match self
            .bus
            .read(self.address, 0, SubAddressMode::OneByte, &mut scratch)
        {
            Ok(()) => {
                info!("device present at {=u8:#x}", self.address);
                Presence::Present
            }
            Err(_) => {
                info!("no device at {=u8:#x}", self.address);
                Presence::Absent
            }
        }
    }

    /// Read all 352 registers, in address order.
    ///
    /// Switches to the second bank for registers 256..352 and restores the
    /// page selector to 0 on both success and failure exit.
    pub fn dump_registers(
        &mut self,
        out: &mut [u8; REGISTER_COUNT],
    ) -> Result<(), Error<BUS::Error>> {
        self.read_block(0, &mut out[..PAGE_SIZE])?;

        self.write_register(PAGE_SELECT, 0x01)?;
        let mut bank1 = [0u8; PAGE_SIZE];
        let read = self.read_block(0, &mut bank1);
        let restore = self.write_register(PAGE_SELECT, 0x00);
        read?;
        restore?;

        out[PAGE_SIZE..].copy_from_slice(&bank1[..REGISTER_COUNT - PAGE_SIZE]);
        Ok(())
    }

    /// Apply a ClockBuilder Pro register map in table order.
    ///
    /// Entries with mask 0x00 are fully reserved and generate no bus
    /// traffic; mask 0xFF is a plain write; anything else reads the current
    /// value and merges. Every write is followed by the settle delay.
    pub fn apply_map(
        &mut self,
        map: &[RegisterEntry],
        settle_ms: u32,
    ) -> Result<(), Error<BUS::Error>> {
        for entry in map {
            match entry.mask {
                0x00 => continue,
                0xFF => self.write_register(entry.address, entry.value)?,
                _ => {
                    let current = self.read_register(entry.address)?;
                    self.write_register(entry.address, entry.merge(current))?;
                }
            }
            self.delay.delay_ms(settle_ms);
        }
        Ok(())
    }

    /// Run the full programming procedure.
    ///
    /// On success the outputs are enabled and the device holds the frozen
    /// calibration. On error the device is left partially configured.
    pub fn program(
        &mut self,
        map: &[RegisterEntry],
        timing: &Timing,
    ) -> Result<(), Error<BUS::Error>> {
        // OEB_ALL = 1
        self.write_register(OUTPUT_ENABLE, OEB_ALL)?;
        info!("outputs disabled");

        // DIS_LOL = 1
        self.write_register(LOL_CONTROL, LOL_PAUSED)?;

        self.apply_map(map, timing.write_settle_ms)?;

        self.wait_alarm_clear(LOS_MASK, Stage::WaitInputClockValid, &timing.poll)?;
        info!("input clock is valid");

        // FCAL_OVRD_EN = 0, the device performs its own calibration
        self.update_register(FCAL_OVERRIDE, FCAL_OVRD_EN, 0x00)?;

        // SOFT_RESET = 1 starts lock acquisition
        self.write_register(SOFT_RESET, SOFT_RESET_TRIGGER)?;
        info!("PLL locking initiated");
        self.delay.delay_ms(timing.reset_settle_ms);

        // DIS_LOL = 0
        self.write_register(LOL_CONTROL, LOL_RUNNING)?;

        self.wait_alarm_clear(LOCK_MASK, Stage::WaitLocked, &timing.poll)?;
        info!("PLL is locked");

        self.copy_calibration()?;

        // FCAL_OVRD_EN = 1, use the copied values from here on
        self.update_register(FCAL_OVERRIDE, FCAL_OVRD_EN, FCAL_OVRD_EN)?;

        // OEB_ALL = 0
        self.write_register(OUTPUT_ENABLE, 0x00)?;
        info!("outputs enabled");

        Ok(())
    }

    fn read_register(&mut self, address: u16) -> Result<u8, Error<BUS::Error>> {
        let mut scratch = [0u8; 1];
        self.bus
            .read(self.address, address, SubAddressMode::OneByte, &mut scratch)?;
        Ok(scratch[0])
    }

    fn read_block(&mut self, address: u16, buffer: &mut [u8]) -> Result<(), Error<BUS::Error>> {
        self.bus
            .read(self.address, address, SubAddressMode::OneByte, buffer)?;
        Ok(())
    }

    fn write_register(&mut self, address: u16, value: u8) -> Result<(), Error<BUS::Error>> {
        trace!("reg {=u16} <- {=u8:#x}", address, value);
        self.bus
            .write(self.address, address, SubAddressMode::OneByte, &[value])?;
        Ok(())
    }

    /// Read-modify-write the bits of `mask` to `value`.
    fn update_register(
        &mut self,
        address: u16,
        mask: u8,
        value: u8,
    ) -> Result<(), Error<BUS::Error>> {
        let current = self.read_register(address)?;
        self.write_register(address, (current & !mask) | (value & mask))
    }

    /// Poll the alarm status register until `mask` reads clear.
    fn wait_alarm_clear(
        &mut self,
        mask: u8,
        stage: Stage,
        poll: &PollBudget,
    ) -> Result<(), Error<BUS::Error>> {
        for attempt in 0..poll.attempts {
            if self.read_register(ALARM_STATUS)? & mask == 0 {
                return Ok(());
            }
            if attempt + 1 < poll.attempts {
                self.delay.delay_ms(poll.interval_ms);
            }
        }
        Err(Error::Timeout(stage))
    }

    /// Copy the FCAL result into the active registers:
    /// 235 -> 45, 236 -> 46, 237[1:0] -> 47[1:0] with 47[7:2] preserved.
    fn copy_calibration(&mut self) -> Result<(), Error<BUS::Error>> {
        let low = self.read_register(FCAL_LOW)?;
        self.write_register(FCAL_ACTIVE_LOW, low)?;

        let mid = self.read_register(FCAL_MID)?;
        self.write_register(FCAL_ACTIVE_MID, mid)?;

        let active = self.read_register(FCAL_ACTIVE_HIGH)?;
        let high = self.read_register(FCAL_HIGH)?;
        self.write_register(
            FCAL_ACTIVE_HIGH,
            (active & !FCAL_HIGH_MASK) | (high & FCAL_HIGH_MASK),
        )
    }
}
