use fugit::{HertzU32 as Hertz, NanosDurationU32};

/// The system clock, used in various timer calculations
pub const SYSCLK: Hertz = Hertz::MHz(400);

/// The PLL2 P output feeding the SPI1/2/3 kernel clock.
pub const PLL2_P: Hertz = Hertz::MHz(72);

/// The ADC serial clock. PLL2_P / 4.
///
/// The ADS8684 accepts up to 17 MHz in its data sheet timing but the 32 bit
/// frames at 500 kS/s need at least 18 MHz to fit into the sample period.
pub const ADC_SCK: Hertz = Hertz::MHz(18);

/// Latency from writing the SPI transmit register to the first clock edge
/// plus the GPIO device select handling around it.
pub const ADC_FRAME_OVERHEAD: NanosDurationU32 = NanosDurationU32::from_ticks(120);

/// The counting frequency of the sampling trigger timer.
pub const TIMER_FREQUENCY: Hertz = Hertz::MHz(100);

/// The period of a trigger timer tick in nanoseconds.
pub const TIMER_PERIOD_NS: u32 = 1_000_000_000 / TIMER_FREQUENCY.raw();

/// The maximum number of samples in a run.
pub const SAMPLE_BUFFER_SIZE: usize = 1 << 15;
