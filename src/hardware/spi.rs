//! Register level SPI1 access for the acquisition tick.
//!
//! After the converter has been configured through the HAL driver, SPI1 is
//! switched to 32 bit frames with an unlimited transfer size. Every write to
//! the transmit register then clocks out exactly one frame and the received
//! frame lands in the receive FIFO. Nothing here blocks.
use sampler::FifoBus;

use super::{hal, AdcSpi};

pub struct FifoSpi {
    _spi: AdcSpi,
}

impl FifoSpi {
    /// Take over SPI1 for pipelined frame exchange.
    ///
    /// # Args
    /// * `spi` - The byte oriented SPI1 used during converter setup. Its
    ///   kernel clock, mode and divider configuration are kept.
    pub fn new(spi: AdcSpi) -> Self {
        let fifo = Self { _spi: spi };
        let regs = fifo.regs();
        regs.cr1.modify(|_, w| w.spe().clear_bit());
        // Note(unsafe): 31 is a valid DSIZE encoding (32 bit frames).
        regs.cfg1.modify(|_, w| unsafe { w.dsize().bits(31) });
        // Unlimited transfer size: the master clocks whenever TXFIFO is not empty.
        regs.cr2.modify(|_, w| w.tsize().bits(0));
        regs.cr1.modify(|_, w| w.spe().set_bit());
        regs.cr1.modify(|_, w| w.cstart().set_bit());
        fifo
    }

    fn regs(&self) -> &hal::stm32::spi1::RegisterBlock {
        // Note(unsafe): SPI1 is owned by this structure through the HAL
        // object. It is not accessed through the HAL anymore.
        unsafe { &*hal::stm32::SPI1::ptr() }
    }
}

impl FifoBus for FifoSpi {
    #[inline(always)]
    fn read(&mut self) -> u32 {
        let regs = self.regs();
        // The first exchange after setup or a drain has nothing to read.
        if regs.sr.read().rxp().bit_is_clear() {
            return 0;
        }
        regs.rxdr.read().rxdr().bits()
    }

    #[inline(always)]
    fn write(&mut self, word: u32) {
        // Note(unsafe): Any 32 bit value is a valid frame.
        self.regs().txdr.write(|w| unsafe { w.txdr().bits(word) });
    }

    fn drain(&mut self) {
        let regs = self.regs();
        // Let the last frame complete.
        while regs.sr.read().txc().bit_is_clear() {}
        while regs.sr.read().rxp().bit_is_set() {
            regs.rxdr.read().rxdr().bits();
        }
    }
}
