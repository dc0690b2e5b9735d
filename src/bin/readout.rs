#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

//! # Readout
//!
//! Periodic fast acquisition of a set of ADS8684 channels.
//!
//! TIM2 fires once per sample period. Its interrupt runs the acquisition tick
//! at the highest priority: one pipelined 32 bit SPI frame exchange that
//! reads the result of an earlier conversion and selects the next channel.
//! A low priority task repeatedly requests a run of `len` samples at `rate`,
//! waits for it to complete and reports the mean and standard deviation of
//! every channel in volts.
//!
//! The results of the first frames of a run belong to conversions selected
//! before the run and are discarded. The stored samples interleave the
//! channels in the configured order.

use ads8684::{Channel, Range};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    /// Channels and their input ranges in acquisition order.
    ///
    /// # Value
    /// Up to eight (channel, range) pairs.
    channels: heapless::Vec<(Channel, Range), { sampler::MAX_CHANNELS }>,

    /// Number of samples per run (all channels).
    len: usize,

    /// Sample rate in Hz.
    rate: u32,

    /// Pause between runs in milliseconds.
    interval: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let mut channels = heapless::Vec::new();
        channels.push((Channel::Ch0, Range::Bipolar2V5)).ok();
        channels.push((Channel::Ch1, Range::Bipolar1V25)).ok();
        Self {
            channels,
            len: 1 << 14,
            rate: 500_000,
            interval: 1000,
        }
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    let json: heapless::String<512> =
        serde_json_core::to_string(&Settings::default()).unwrap();
    println!("{}", json);
}

#[cfg(target_os = "none")]
#[cfg_attr(target_os = "none", rtic::app(device = fast_readout::hardware::hal::stm32, peripherals = true, dispatchers=[DCMI]))]
mod app {
    use fugit::{ExtU32 as _, RateExtU32 as _};
    use sampler::{Accumulator, Acquisition, ScaledStatistics};

    use fast_readout::hardware::{
        self, setup::AdcSampler, trigger::SampleTrigger, Systick,
    };

    use super::*;

    #[shared]
    struct Shared {
        sampler: AdcSampler,
    }

    #[local]
    struct Local {
        acquisition: Acquisition<'static, SampleTrigger>,
        settings: Settings,
    }

    #[init]
    fn init(c: init::Context) -> (Shared, Local) {
        let settings = Settings::default();

        // Configure the microcontroller
        let devices =
            hardware::setup::setup(c.core, c.device, &settings.channels);

        let acquisition =
            Acquisition::new(devices.trigger, devices.state, devices.timing);

        acquire::spawn().unwrap();

        (
            Shared {
                sampler: devices.sampler,
            },
            Local {
                acquisition,
                settings,
            },
        )
    }

    #[task(priority = 1, local=[acquisition, settings], shared=[sampler])]
    async fn acquire(mut c: acquire::Context) -> ! {
        let acquire::LocalResources {
            acquisition,
            settings,
            ..
        } = c.local;

        loop {
            Systick::delay(settings.interval.millis()).await;

            if let Err(err) = acquisition.run(
                &mut c.shared.sampler,
                settings.len,
                settings.rate.Hz(),
            ) {
                log::warn!("Acquisition rejected: {}", err);
                continue;
            }

            // The trigger is disarmed, the lock does not delay any tick.
            let stats: heapless::Vec<ScaledStatistics, { sampler::MAX_CHANNELS }> =
                c.shared.sampler.lock(|sampler| {
                    let samples = sampler.samples();
                    settings
                        .channels
                        .iter()
                        .enumerate()
                        .map(|(k, (_, range))| {
                            let mut accu = Accumulator::default();
                            samples.channel(k).for_each(|x| accu.update(x));
                            accu.get().scaled(range.scale(), range.offset())
                        })
                        .collect()
                });

            for ((channel, _), stat) in settings.channels.iter().zip(stats.iter()) {
                log::info!(
                    "{:?}: {} samples, mean {:.6} V, std {:.6} V",
                    channel,
                    stat.count,
                    stat.mean,
                    stat.std
                );
            }
        }
    }

    /// Acquisition tick.
    ///
    /// One frame exchange per sample period. This must complete well within
    /// the period as there is no recovery from a missed trigger.
    #[task(binds = TIM2, shared=[sampler], priority = 3)]
    fn tick(mut c: tick::Context) {
        SampleTrigger::clear();
        c.shared.sampler.lock(|sampler| sampler.tick());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_dump() {
        let json: heapless::String<512> =
            serde_json_core::to_string(&Settings::default()).unwrap();
        assert_eq!(
            json.as_str(),
            r#"{"channels":[["Ch0","Bipolar2V5"],["Ch1","Bipolar1V25"]],"len":16384,"rate":500000,"interval":1000}"#
        );
    }

    #[test]
    fn settings_load() {
        let (s, _): (Settings, _) = serde_json_core::from_str(
            r#"{"channels":[["Ch3","Unipolar2V5"]],"len":100,"rate":250000,"interval":10}"#,
        )
        .unwrap();
        assert_eq!(s.channels.len(), 1);
        assert_eq!(s.channels[0].0, Channel::Ch3);
        assert_eq!(s.len, 100);
        assert_eq!(s.rate, 250_000);
    }
}
