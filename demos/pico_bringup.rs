//! # Si5338 bring-up
//!
//! This program brings up an Si5338 evaluation board using a
//! Raspberry Pi Pico, following the Enclustra reference example flow:
//! probe the device, run the programming procedure, dump the registers.
//!
//! ```text
//! Raspberry Pi Pico Pinout
//! ========================
//!
//! | Pin | Purpose  |
//! +-----+----------+
//! | 21  | I2C0 SDA |
//! | 22  | I2C0 SCL |
//! | 23  | GND      |
//! ```
//!
//! The Si5338's SDA/SCL need external pull-ups if the breakout doesn't
//! carry them. The device answers at 0x70.

#![no_std]
#![no_main]

// The macro for our start-up function
use cortex_m_rt::entry;

// info!() and error!() macros for printing information to the debug output
use defmt::*;
use defmt_rtt as _;
use panic_probe as _;

use embedded_hal::digital::v2::OutputPin;

// Pull in any important traits
use rp_pico::hal::prelude::*;

// Embed the `kHz` function/trait:
use embedded_time::rate::*;

// A shorter alias for the Peripheral Access Crate, which provides low-level
// register access
use rp_pico::hal::pac;

// Import the GPIO abstraction:
use rp_pico::hal::gpio;

// A shorter alias for the Hardware Abstraction Layer, which provides
// higher-level drivers.
use rp_pico::hal;

use si5338ctl::{
    registers::REGISTER_COUNT, I2cRegisterBus, PollBudget, Presence, RegisterEntry, Si5338, Timing,
};

/// Excerpt of a ClockBuilder Pro register map export (address, value, mask).
/// Replace with the full `Reg_Store` table generated for your board; the
/// order matters and must be kept as exported.
static REG_MAP: [RegisterEntry; 24] = [
    RegisterEntry::new(6, 0x08, 0x1D),
    RegisterEntry::new(27, 0x70, 0x80),
    RegisterEntry::new(28, 0x16, 0xFF),
    RegisterEntry::new(29, 0x90, 0xFF),
    RegisterEntry::new(30, 0x40, 0xFF),
    RegisterEntry::new(31, 0xC0, 0xFF),
    RegisterEntry::new(32, 0xC0, 0xFF),
    RegisterEntry::new(33, 0xC0, 0xFF),
    RegisterEntry::new(34, 0xC0, 0xFF),
    RegisterEntry::new(35, 0x00, 0xFF),
    RegisterEntry::new(36, 0x00, 0x1F),
    RegisterEntry::new(37, 0x00, 0x1F),
    RegisterEntry::new(38, 0x00, 0x1F),
    RegisterEntry::new(39, 0x00, 0x1F),
    RegisterEntry::new(40, 0x77, 0xFF),
    RegisterEntry::new(41, 0x0C, 0xFF),
    RegisterEntry::new(42, 0x23, 0xFF),
    RegisterEntry::new(45, 0x00, 0xFF),
    RegisterEntry::new(46, 0x00, 0xFF),
    RegisterEntry::new(47, 0x14, 0x3F),
    RegisterEntry::new(48, 0x2E, 0x7F),
    RegisterEntry::new(49, 0x90, 0x7F), // FCAL_OVRD_EN stays under sequencer control
    RegisterEntry::new(50, 0xDE, 0xC0),
    RegisterEntry::new(255, 0x00, 0xFF), // PAGE_SEL back to bank 0
];

#[entry]
fn main() -> ! {
    info!("Program start");

    // Grab our singleton objects
    let mut pac = pac::Peripherals::take().unwrap();
    let core = pac::CorePeripherals::take().unwrap();

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);

    // Configure the clocks
    //
    // The default is to generate a 125 MHz system clock
    let clocks = hal::clocks::init_clocks_and_plls(
        rp_pico::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    // The single-cycle I/O block controls our GPIO pins
    let sio = hal::Sio::new(pac.SIO);

    // Set the pins up according to their function on this particular board
    let pins = rp_pico::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // Set the LED to be an output
    let mut led_pin = pins.led.into_push_pull_output();

    // These are implicitly used by the i2c driver if they are in the correct mode
    let sda_pin = pins.gpio16.into_mode::<gpio::FunctionI2C>();
    let scl_pin = pins.gpio17.into_mode::<gpio::FunctionI2C>();

    // Create an I2C driver instance for the I2C0 device
    let i2c = hal::I2C::i2c0(
        pac.I2C0,
        sda_pin,
        scl_pin,
        400.kHz(),
        &mut pac.RESETS,
        clocks.peripheral_clock,
    );

    let delay = cortex_m::delay::Delay::new(core.SYST, clocks.system_clock.freq().integer());

    // Initialize the Si5338

    // Turn on the LED while we program
    led_pin.set_high().unwrap();

    let mut clkgen = Si5338::new(I2cRegisterBus::new(i2c), delay);

    if clkgen.probe() == Presence::Absent {
        error!("no Si5338 on the bus, giving up");
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // Lock can take a while on a slow reference; allow ten seconds.
    let timing = Timing::datasheet(PollBudget {
        attempts: 1000,
        interval_ms: 10,
    });

    match clkgen.program(&REG_MAP, &timing) {
        Ok(()) => info!("Si5338 programmed, outputs running"),
        Err(_) => {
            error!("bring-up failed");
            #[allow(clippy::empty_loop)]
            loop {}
        }
    }

    let mut dump = [0u8; REGISTER_COUNT];
    match clkgen.dump_registers(&mut dump) {
        Ok(()) => {
            for (address, value) in dump.iter().enumerate() {
                info!("Address: {=usize}; Content: {=u8:#x}", address, *value);
            }
        }
        Err(_) => error!("register dump failed"),
    }

    led_pin.set_low().unwrap();

    #[allow(clippy::empty_loop)]
    loop {}
}
