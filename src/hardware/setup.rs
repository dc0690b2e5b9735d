//! Board hardware configuration
//!
//! Clocks, logging, the ADS8684 SPI link and the sample trigger.
use core::sync::atomic::{AtomicBool, Ordering};
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_hal_compat::ForwardCompat;
use stm32h7xx_hal::{self as hal, gpio::Speed, prelude::*};

use ads8684::{Ads8684, Channel, Range};
use sampler::{BusTiming, Pipeliner, RunState, Sampler};

use super::{
    design_parameters, spi::FifoSpi, trigger::SampleTrigger, AdcCs, AdcSpi,
    Systick,
};

/// The ADS8684 acquisition pipeline: SPI1 FIFO access with a GPIO device
/// select.
pub type AdcPipeline = Pipeliner<FifoSpi, AdcCs>;

/// The acquisition state machine as shared with the tick handler.
pub type AdcSampler =
    Sampler<'static, AdcPipeline, { design_parameters::SAMPLE_BUFFER_SIZE }>;

#[link_section = ".axisram.buffers"]
static mut SAMPLE_BUFFER: [u16; design_parameters::SAMPLE_BUFFER_SIZE] =
    [0; design_parameters::SAMPLE_BUFFER_SIZE];

/// State cell shared between the tick handler and the acquisition task.
static RUN_STATE: RunState = RunState::new();

/// The configured hardware interfaces.
pub struct Devices {
    pub sampler: AdcSampler,
    pub trigger: SampleTrigger,
    pub state: &'static RunState,
    pub timing: BusTiming,
}

/// Bus timing of one pipelined ADS8684 frame exchange.
pub fn bus_timing() -> BusTiming {
    BusTiming {
        word_bits: ads8684::FRAME_BITS,
        sck: design_parameters::ADC_SCK,
        overhead: design_parameters::ADC_FRAME_OVERHEAD,
    }
}

/// Configure the hardware for operation.
///
/// # Args
/// * `core` - The cortex-m peripherals.
/// * `device` - The microcontroller peripherals to be configured.
/// * `channels` - The converter channels to acquire from and their input
///   ranges. The order is the acquisition sequence.
///
/// # Returns
/// The devices with the trigger disarmed and the converter configured.
pub fn setup(
    mut core: hal::stm32::CorePeripherals,
    device: hal::stm32::Peripherals,
    channels: &[(Channel, Range)],
) -> Devices {
    // Set up RTT logging
    {
        // Enable debug during WFE/WFI-induced sleep
        device.DBGMCU.cr.modify(|_, w| w.dbgsleep_d1().set_bit());

        // Set up RTT channel to use for `rprintln!()` as "best effort".
        // This removes a critical section around the logging and thus allows
        // high-prio tasks to always interrupt at low latency.
        // A message logged while another one is in progress is dropped.
        let channels = rtt_target::rtt_init_default!();
        // Note(unsafe): The closure we pass does not establish a critical section
        // as demanded but it does ensure synchronization and implements a lock.
        unsafe {
            rtt_target::set_print_channel_cs(
                channels.up.0,
                &((|arg, f| {
                    static LOCKED: AtomicBool = AtomicBool::new(false);
                    if LOCKED.compare_exchange_weak(
                        false,
                        true,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    ) == Ok(false)
                    {
                        f(arg);
                        LOCKED.store(false, Ordering::Release);
                    }
                }) as rtt_target::CriticalSectionFunc),
            );
        }

        static LOGGER: rtt_logger::RTTLogger =
            rtt_logger::RTTLogger::new(log::LevelFilter::Info);
        log::set_logger(&LOGGER)
            .map(|()| log::set_max_level(log::LevelFilter::Trace))
            .unwrap();
        log::info!("Starting");
    }

    if let Some(msg) = panic_persist::get_panic_message_utf8() {
        log::warn!("Previous panic: {}", msg);
    }

    let pwr = device.PWR.constrain();
    let vos = pwr.freeze();

    // Clear reset flags.
    device.RCC.rsr.write(|w| w.rmvf().set_bit());

    // Select the PLL for SPI1.
    device.RCC.d2ccip1r.modify(|_, w| w.spi123sel().pll2_p());

    let rcc = device.RCC.constrain();
    let ccdr = rcc
        .use_hse(8.MHz())
        .sysclk(design_parameters::SYSCLK.convert())
        .hclk(200.MHz())
        .pll2_p_ck(design_parameters::PLL2_P.convert())
        .freeze(vos, &device.SYSCFG);

    Systick::start(core.SYST, ccdr.clocks.sysclk().to_Hz());

    core.SCB.enable_icache();

    let gpioa = device.GPIOA.split(ccdr.peripheral.GPIOA);
    let gpiod = device.GPIOD.split(ccdr.peripheral.GPIOD);
    let gpiog = device.GPIOG.split(ccdr.peripheral.GPIOG);

    // Configure TIM2 as the sample trigger. The period is set when arming.
    let trigger = {
        // The timer frequency is manually adjusted below, so the 1KHz setting here is a
        // dont-care.
        let mut timer2 =
            device
                .TIM2
                .timer(1.kHz(), ccdr.peripheral.TIM2, &ccdr.clocks);

        // Configure the timer to count at the designed tick rate.
        timer2.pause();
        timer2.set_tick_freq(design_parameters::TIMER_FREQUENCY.convert());
        SampleTrigger::new(timer2)
    };

    // SPI1 to the ADS8684. The converter latches SDI on the falling SCLK
    // edge and drives SDO on the rising edge. Device select is a GPIO so that
    // it can frame a 32 bit word per tick independent of the FIFO.
    let mut spi: AdcSpi = {
        let mosi = gpiod.pd7.into_alternate().speed(Speed::VeryHigh);
        let miso = gpioa.pa6.into_alternate().speed(Speed::VeryHigh);
        let sck = gpiog.pg11.into_alternate().speed(Speed::VeryHigh);

        let config = hal::spi::Config::new(hal::spi::Mode {
            polarity: hal::spi::Polarity::IdleLow,
            phase: hal::spi::Phase::CaptureOnSecondTransition,
        });

        let spi: hal::spi::Spi<_, _, u8> = device.SPI1.spi(
            (sck, miso, mosi),
            config,
            design_parameters::ADC_SCK.convert(),
            ccdr.peripheral.SPI1,
            &ccdr.clocks,
        );
        spi.forward()
    };
    let mut cs: AdcCs = gpiog
        .pg10
        .into_push_pull_output()
        .speed(Speed::VeryHigh)
        .erase()
        .forward();

    {
        let mut adc =
            Ads8684::new(ExclusiveDevice::new_no_delay(&mut spi, &mut cs).unwrap());
        adc.init(channels).unwrap();
        for &(channel, _) in channels.iter() {
            if channel.range_register().is_some() {
                log::info!("{:?}: {:?}", channel, adc.range(channel).unwrap());
            }
        }
    }

    // Zero terminated. Excess channels are caught by the list construction.
    let mut codes = [0; sampler::MAX_CHANNELS + 1];
    for (code, (channel, _)) in codes.iter_mut().zip(channels.iter()) {
        *code = ads8684::frame(channel.command());
    }

    let sampler = Sampler::new(
        Pipeliner::new(FifoSpi::new(spi), cs),
        &RUN_STATE,
        // Note(unsafe): The buffer is only taken here and setup is called once.
        unsafe { &mut *core::ptr::addr_of_mut!(SAMPLE_BUFFER) },
        sampler::ChannelList::new(&codes).unwrap(),
    );

    log::info!("setup() complete");

    Devices {
        sampler,
        trigger,
        state: &RUN_STATE,
        timing: bus_timing(),
    }
}
