use fugit::{HertzU32, NanosDurationU32};

use super::Error;

/// Duration of one pipelined bus exchange.
///
/// The check is coarse: it only covers the serial transfer of one word plus a
/// fixed overhead for FIFO latency and device select handling. It cannot
/// observe interrupt latency or preemption.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BusTiming {
    /// Bits clocked per exchange.
    pub word_bits: u32,
    /// Serial clock rate.
    pub sck: HertzU32,
    /// Fixed latency between queueing a word and the first clock edge plus
    /// device select setup.
    pub overhead: NanosDurationU32,
}

impl BusTiming {
    /// Time from queueing the transmit word to the end of the transfer.
    pub fn transaction(&self) -> NanosDurationU32 {
        let sck = self.sck.raw().max(1) as u64;
        let bits = self.word_bits as u64 * 1_000_000_000;
        NanosDurationU32::from_ticks(
            (bits.div_ceil(sck) + self.overhead.ticks() as u64)
                .min(u32::MAX as _) as _,
        )
    }

    /// Validate that one exchange fits into a sample period at `rate`.
    ///
    /// # Returns
    /// The sample period.
    pub fn check(&self, rate: HertzU32) -> Result<NanosDurationU32, Error> {
        if rate.raw() == 0 {
            return Err(Error::ZeroRate);
        }
        let period = 1_000_000_000 / rate.raw();
        let transaction = self.transaction().ticks();
        if transaction > period {
            return Err(Error::TimingOverrun {
                transaction,
                period,
            });
        }
        Ok(NanosDurationU32::from_ticks(period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fugit::RateExtU32;

    fn timing(sck: HertzU32) -> BusTiming {
        BusTiming {
            word_bits: 32,
            sck,
            overhead: NanosDurationU32::from_ticks(120),
        }
    }

    #[test]
    fn margin() {
        let t = timing(18.MHz());
        assert_eq!(t.transaction().ticks(), 1778 + 120);
        assert_eq!(t.check(500.kHz()).unwrap().ticks(), 2000);
        assert_eq!(t.check(1.Hz()).unwrap().ticks(), 1_000_000_000);
    }

    #[test]
    fn overrun() {
        assert_eq!(
            timing(17.MHz()).check(500.kHz()),
            Err(Error::TimingOverrun {
                transaction: 1883 + 120,
                period: 2000
            })
        );
        assert!(timing(17.MHz()).check(450.kHz()).is_ok());
        assert_eq!(timing(18.MHz()).check(0.Hz()), Err(Error::ZeroRate));
    }
}
