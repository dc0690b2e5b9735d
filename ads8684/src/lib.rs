#![cfg_attr(not(test), no_std)]

//! TI ADS8684/ADS8688 command and program register access.
//!
//! The converter uses 32 clock frames: a 16 bit command word is shifted in
//! first and the result of the conversion started by the *previous* frame is
//! shifted out during the last 16 clocks. Manual channel select commands are
//! therefore pipelined by one frame: the result for a channel arrives in the
//! frame after the frame that selected it.
//!
//! The [Ads8684] driver covers the setup path (reset, ranges, power down) over
//! an [SpiDevice]. The acquisition path uses the raw command words from
//! [Channel::command] and [frame] directly on the bus registers.

use bitbybit::{bitenum, bitfield};
use embedded_hal::spi::{self, SpiDevice};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

/// Internal reference voltage.
pub const VREF: f32 = 4.096;

/// Number of bits in a full command/result frame.
pub const FRAME_BITS: u32 = 32;

/// Command register words.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Continue operation in the previous mode.
    NoOp,
    Standby,
    PowerDown,
    /// Reset all program registers to default.
    Reset,
    /// Auto sequence with reset to the first enabled channel.
    AutoReset,
    /// Manual channel select.
    Manual(Channel),
}

impl Command {
    pub const fn word(self) -> u16 {
        match self {
            Self::NoOp => 0x0000,
            Self::Standby => 0x8200,
            Self::PowerDown => 0x8300,
            Self::Reset => 0x8500,
            Self::AutoReset => 0xa000,
            Self::Manual(ch) => ch.command(),
        }
    }
}

/// Converter input channel.
///
/// The ADS8684 populates `Ch0..=Ch3`, the ADS8688 all eight.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum Channel {
    Ch0 = 0,
    Ch1 = 1,
    Ch2 = 2,
    Ch3 = 3,
    Ch4 = 4,
    Ch5 = 5,
    Ch6 = 6,
    Ch7 = 7,
    Aux = 8,
}

impl Channel {
    /// Manual channel select command word (`MAN_Ch_n`, `MAN_AUX`).
    pub const fn command(self) -> u16 {
        0xc000 | ((self as u16) << 10)
    }

    /// The range program register of the channel. AUX has a fixed range.
    pub fn range_register(self) -> Option<Addr> {
        Some(match self {
            Self::Ch0 => Addr::RangeCh0,
            Self::Ch1 => Addr::RangeCh1,
            Self::Ch2 => Addr::RangeCh2,
            Self::Ch3 => Addr::RangeCh3,
            Self::Ch4 => Addr::RangeCh4,
            Self::Ch5 => Addr::RangeCh5,
            Self::Ch6 => Addr::RangeCh6,
            Self::Ch7 => Addr::RangeCh7,
            Self::Aux => return None,
        })
    }
}

/// Position a command word in a full 32 bit frame.
pub const fn frame(command: u16) -> u32 {
    (command as u32) << 16
}

/// Extract the conversion result from a received 32 bit frame.
pub const fn result(word: u32) -> u16 {
    word as u16
}

/// Input range selection (multiples of [VREF]).
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum Range {
    /// ±2.5 × VREF
    #[default]
    Bipolar2V5 = 0b0000,
    /// ±1.25 × VREF
    Bipolar1V25 = 0b0001,
    /// ±0.625 × VREF
    Bipolar0V625 = 0b0010,
    /// 0 to 2.5 × VREF
    Unipolar2V5 = 0b0101,
    /// 0 to 1.25 × VREF
    Unipolar1V25 = 0b0110,
}

impl Range {
    /// Span of the range in volts.
    pub fn span(self) -> f32 {
        VREF * match self {
            Self::Bipolar2V5 => 5.0,
            Self::Bipolar1V25 | Self::Unipolar2V5 => 2.5,
            Self::Bipolar0V625 | Self::Unipolar1V25 => 1.25,
        }
    }

    /// Volts per LSB.
    pub fn scale(self) -> f32 {
        self.span() / (1u32 << 16) as f32
    }

    /// Voltage of code zero.
    pub fn offset(self) -> f32 {
        match self {
            Self::Bipolar2V5 | Self::Bipolar1V25 | Self::Bipolar0V625 => {
                -0.5 * self.span()
            }
            Self::Unipolar2V5 | Self::Unipolar1V25 => 0.0,
        }
    }

    /// Convert a raw straight binary code to volts.
    pub fn volts(self, code: u16) -> f32 {
        code as f32 * self.scale() + self.offset()
    }
}

#[bitenum(u7)]
#[derive(PartialEq, Debug)]
pub enum Addr {
    AutoSeqEn = 0x01,
    ChPwrDn = 0x02,
    FeatureSelect = 0x03,
    RangeCh0 = 0x05,
    RangeCh1 = 0x06,
    RangeCh2 = 0x07,
    RangeCh3 = 0x08,
    RangeCh4 = 0x09,
    RangeCh5 = 0x0a,
    RangeCh6 = 0x0b,
    RangeCh7 = 0x0c,
    CmdReadBack = 0x3f,
}

/// Program register access word.
#[bitfield(u16)]
#[derive(Debug, PartialEq)]
pub struct Program {
    #[bits(0..=7, rw)]
    data: u8,
    #[bit(8, rw)]
    write: bool,
    #[bits(9..=15, rw)]
    addr: Option<Addr>,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("SPI")]
    Bus(spi::ErrorKind),
    #[error("Readback mismatch at {0:?}: wrote {1:#04x}, read {2:#04x}")]
    Readback(Addr, u8, u8),
    #[error("Invalid range code {0:#04x}")]
    InvalidRange(u8),
    #[error("Channel {0:?} has no range register")]
    FixedRange(Channel),
}

impl<E: spi::Error> From<E> for Error {
    fn from(value: E) -> Self {
        Self::Bus(value.kind())
    }
}

#[derive(Clone, Debug)]
pub struct Ads8684<B> {
    bus: B,
}

impl<B: SpiDevice<u8>> Ads8684<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn free(self) -> B {
        self.bus
    }

    /// Issue a command frame and return the result word clocked out with it.
    pub fn command(&mut self, command: Command) -> Result<u16, Error> {
        let mut rx = [0; 4];
        self.bus
            .transfer(&mut rx, &frame(command.word()).to_be_bytes())?;
        Ok(result(u32::from_be_bytes(rx)))
    }

    fn program(&mut self, word: Program) -> Result<u8, Error> {
        let mut rx = [0; 4];
        let tx = word.raw_value().to_be_bytes();
        self.bus.transfer(&mut rx, &[tx[0], tx[1], 0, 0])?;
        // Register contents are shifted out in the 8 clocks after the
        // access word.
        Ok(rx[2])
    }

    fn write(&mut self, addr: Addr, data: u8) -> Result<(), Error> {
        let echo = self.program(
            Program::builder()
                .with_data(data)
                .with_write(true)
                .with_addr(addr)
                .build(),
        )?;
        if echo != data {
            return Err(Error::Readback(addr, data, echo));
        }
        Ok(())
    }

    fn read(&mut self, addr: Addr) -> Result<u8, Error> {
        self.program(
            Program::builder()
                .with_data(0)
                .with_write(false)
                .with_addr(addr)
                .build(),
        )
    }

    /// Reset all program registers to their defaults.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.command(Command::Reset)?;
        Ok(())
    }

    pub fn set_range(
        &mut self,
        channel: Channel,
        range: Range,
    ) -> Result<(), Error> {
        let addr = channel
            .range_register()
            .ok_or(Error::FixedRange(channel))?;
        self.write(addr, range as u8)
    }

    pub fn range(&mut self, channel: Channel) -> Result<Range, Error> {
        let addr = channel
            .range_register()
            .ok_or(Error::FixedRange(channel))?;
        let code = self.read(addr)?;
        Range::try_from(code).map_err(|_| Error::InvalidRange(code))
    }

    /// Power down the channels with their bit set in `mask`.
    pub fn set_power_down(&mut self, mask: u8) -> Result<(), Error> {
        self.write(Addr::ChPwrDn, mask)
    }

    /// Reset the converter, configure the ranges of the used channels and
    /// power down everything else.
    pub fn init(&mut self, channels: &[(Channel, Range)]) -> Result<(), Error> {
        self.reset()?;
        let mut used = 0u8;
        for &(channel, range) in channels.iter() {
            if channel.range_register().is_some() {
                self.set_range(channel, range)?;
                used |= 1 << channel as u8;
            }
        }
        self.set_power_down(!used)?;
        log::info!("ADS8684 initialized, channels {:#010b}", used);
        Ok(())
    }
}
