use fugit::{HertzU32, NanosDurationU32};
use rtic_core::Mutex;

use super::{BusTiming, Error, Pipeline, RunState, Sampler, Statistics};

/// Periodic interrupt source driving [Sampler::tick].
///
/// The handler binding and its priority are fixed at build time (e.g. by an
/// RTIC task), the trigger only controls whether and how often it fires.
pub trait Trigger {
    /// Start firing every `period`.
    fn arm(&mut self, period: NanosDurationU32);

    /// Stop firing. No tick may start after this returns.
    fn disarm(&mut self);
}

/// Caller side of the acquisition protocol.
pub struct Acquisition<'a, T> {
    trigger: T,
    state: &'a RunState,
    timing: BusTiming,
}

impl<'a, T: Trigger> Acquisition<'a, T> {
    /// # Args
    /// * `trigger` - The periodic trigger bound to the tick handler.
    /// * `state` - The state cell shared with the [Sampler].
    /// * `timing` - Bus exchange timing used to validate sample rates.
    pub fn new(trigger: T, state: &'a RunState, timing: BusTiming) -> Self {
        Self {
            trigger,
            state,
            timing,
        }
    }

    pub fn timing(&self) -> &BusTiming {
        &self.timing
    }

    /// Acquire `len` samples at `rate` and block until done.
    ///
    /// Rejects the request before arming the trigger if the samples do not fit
    /// the buffer or a bus exchange does not fit a sample period. A zero length
    /// returns immediately with empty results.
    ///
    /// # Args
    /// * `sampler` - Lock on the sampler shared with the tick handler. It is
    ///   only taken briefly, never while waiting.
    pub fn run<'s, M, P, const N: usize>(
        &mut self,
        sampler: &mut M,
        len: usize,
        rate: HertzU32,
    ) -> Result<Statistics, Error>
    where
        M: Mutex<T = Sampler<'s, P, N>>,
        P: Pipeline,
    {
        let period = self.timing.check(rate)?;
        sampler.lock(|s| s.prepare(len))?;
        if len == 0 {
            return Ok(sampler.lock(|s| s.statistics()));
        }

        log::debug!("Acquiring {} samples at {} Hz", len, rate.raw());
        self.trigger.arm(period);
        self.state.start();
        while !self.state.is_idle() {
            core::hint::spin_loop();
        }
        self.trigger.disarm();

        let stats = sampler.lock(|s| {
            s.finish();
            s.statistics()
        });
        log::debug!(
            "Acquired {} samples, mean {:.1}, std {:.2}",
            stats.count,
            stats.mean,
            stats.std
        );
        Ok(stats)
    }
}
