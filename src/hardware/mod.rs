//! Module for all hardware-specific setup of the ADS8684 readout
pub use stm32h7xx_hal as hal;

use embedded_hal_compat::{markers::ForwardOutputPin, Forward};

pub mod design_parameters;
pub mod setup;
pub mod spi;
pub mod trigger;

rtic_monotonics::systick_monotonic!(Systick, 1_000);

/// SPI1 to the ADS8684 during converter setup.
pub type AdcSpi =
    Forward<hal::spi::Spi<hal::stm32::SPI1, hal::spi::Enabled, u8>>;

/// ADS8684 device select, active low.
pub type AdcCs = Forward<hal::gpio::ErasedPin<hal::gpio::Output>, ForwardOutputPin>;

#[cfg(target_os = "none")]
#[inline(never)]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    use core::{
        fmt::Write,
        sync::atomic::{AtomicBool, Ordering},
    };
    use cortex_m::asm;
    use rtt_target::{ChannelMode, UpChannel};

    cortex_m::interrupt::disable();

    // Recursion protection
    static PANICKED: AtomicBool = AtomicBool::new(false);
    while PANICKED.load(Ordering::Relaxed) {
        asm::bkpt();
    }
    PANICKED.store(true, Ordering::Relaxed);

    // Release the converter
    // Note(unsafe): We are about to reset and only set an output bit.
    let gpiog = unsafe { &*hal::stm32::GPIOG::ptr() };
    gpiog.bsrr.write(|w| w.bs10().set_bit());

    // Analogous to panic-rtt-target
    if let Some(mut channel) = unsafe { UpChannel::conjure(0) } {
        channel.set_mode(ChannelMode::BlockIfFull);
        writeln!(channel, "{}", info).ok();
    }

    panic_persist::report_panic_info(info);

    // Reset and report the persisted message at boot.
    cortex_m::peripheral::SCB::sys_reset();
}

#[cfg(target_os = "none")]
#[cortex_m_rt::exception]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    panic!("HardFault at {:#?}", ef);
}

#[cfg(target_os = "none")]
#[cortex_m_rt::exception]
unsafe fn DefaultHandler(irqn: i16) {
    panic!("Unhandled exception (IRQn = {})", irqn);
}
