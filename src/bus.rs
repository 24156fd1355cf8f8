//! Register-oriented bus transport.
//!
//! The sequencer never talks to an I2C peripheral directly; it goes through
//! [`RegisterBus`], which models the usual "write sub-address, then data"
//! register access of I2C slave devices. [`I2cRegisterBus`] adapts any
//! `embedded-hal` blocking I2C implementation to it.

use embedded_hal::blocking::i2c::{Write, WriteRead};

/// Width of the register sub-address sent ahead of the data bytes.
///
/// The Si5338 uses one-byte sub-addresses; two-byte mode exists for larger
/// parts (e.g. EEPROMs) sharing the same bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubAddressMode {
    OneByte,
    TwoBytes,
}

impl SubAddressMode {
    fn encode(self, sub_address: u16, header: &mut [u8; 2]) -> usize {
        match self {
            SubAddressMode::OneByte => {
                header[0] = sub_address as u8;
                1
            }
            SubAddressMode::TwoBytes => {
                *header = sub_address.to_be_bytes();
                2
            }
        }
    }
}

/// Byte-oriented read/write-with-sub-address transport.
pub trait RegisterBus {
    type Error;

    /// Read `buffer.len()` bytes starting at `sub_address`.
    fn read(
        &mut self,
        device: u8,
        sub_address: u16,
        mode: SubAddressMode,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Write `bytes` starting at `sub_address`.
    fn write(
        &mut self,
        device: u8,
        sub_address: u16,
        mode: SubAddressMode,
        bytes: &[u8],
    ) -> Result<(), Self::Error>;
}

/// Largest data payload [`I2cRegisterBus`] can prefix with a sub-address
/// without allocating.
pub const MAX_WRITE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<E> {
    /// The underlying I2C transfer failed.
    I2c(E),
    /// Write payload larger than [`MAX_WRITE_LEN`].
    WriteTooLong,
}

/// [`RegisterBus`] over `embedded-hal` blocking I2C.
pub struct I2cRegisterBus<I2C> {
    i2c: I2C,
}

impl<I2C, E> I2cRegisterBus<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    pub fn new(i2c: I2C) -> Self {
        I2cRegisterBus { i2c }
    }

    /// Release the wrapped I2C peripheral.
    pub fn free(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> RegisterBus for I2cRegisterBus<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    type Error = BusError<E>;

    fn read(
        &mut self,
        device: u8,
        sub_address: u16,
        mode: SubAddressMode,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut header = [0u8; 2];
        let n = mode.encode(sub_address, &mut header);
        self.i2c
            .write_read(device, &header[..n], buffer)
            .map_err(BusError::I2c)
    }

    fn write(
        &mut self,
        device: u8,
        sub_address: u16,
        mode: SubAddressMode,
        bytes: &[u8],
    ) -> Result<(), Self::Error> {
        if bytes.len() > MAX_WRITE_LEN {
            return Err(BusError::WriteTooLong);
        }
        let mut header = [0u8; 2];
        let n = mode.encode(sub_address, &mut header);
        let mut frame = [0u8; 2 + MAX_WRITE_LEN];
        frame[..n].copy_from_slice(&header[..n]);
        frame[n..n + bytes.len()].copy_from_slice(bytes);
        self.i2c
            .write(device, &frame[..n + bytes.len()])
            .map_err(BusError::I2c)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec;
    use std::vec::Vec;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum Xfer {
        Write(u8, Vec<u8>),
        WriteRead(u8, Vec<u8>, usize),
    }

    #[derive(Default)]
    struct FakeI2c {
        xfers: Vec<Xfer>,
    }

    impl Write for FakeI2c {
        type Error = ();

        fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), ()> {
            self.xfers.push(Xfer::Write(addr, bytes.to_vec()));
            Ok(())
        }
    }

    impl WriteRead for FakeI2c {
        type Error = ();

        fn write_read(&mut self, addr: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), ()> {
            self.xfers
                .push(Xfer::WriteRead(addr, bytes.to_vec(), buffer.len()));
            Ok(())
        }
    }

    #[test]
    fn write_prefixes_one_byte_sub_address() {
        let mut bus = I2cRegisterBus::new(FakeI2c::default());
        bus.write(0x70, 230, SubAddressMode::OneByte, &[0x10]).unwrap();
        let i2c = bus.free();
        assert_eq!(i2c.xfers, vec![Xfer::Write(0x70, vec![230, 0x10])]);
    }

    #[test]
    fn write_prefixes_two_byte_sub_address_big_endian() {
        let mut bus = I2cRegisterBus::new(FakeI2c::default());
        bus.write(0x50, 0x0123, SubAddressMode::TwoBytes, &[0xAB, 0xCD])
            .unwrap();
        let i2c = bus.free();
        assert_eq!(i2c.xfers, vec![Xfer::Write(0x50, vec![0x01, 0x23, 0xAB, 0xCD])]);
    }

    #[test]
    fn read_sends_sub_address_then_reads() {
        let mut bus = I2cRegisterBus::new(FakeI2c::default());
        let mut buffer = [0u8; 4];
        bus.read(0x70, 218, SubAddressMode::OneByte, &mut buffer)
            .unwrap();
        let i2c = bus.free();
        assert_eq!(i2c.xfers, vec![Xfer::WriteRead(0x70, vec![218], 4)]);
    }

    #[test]
    fn oversized_write_is_rejected_without_traffic() {
        let mut bus = I2cRegisterBus::new(FakeI2c::default());
        let payload = [0u8; MAX_WRITE_LEN + 1];
        assert_eq!(
            bus.write(0x70, 0, SubAddressMode::OneByte, &payload),
            Err(BusError::WriteTooLong)
        );
        assert!(bus.free().xfers.is_empty());
    }
}
