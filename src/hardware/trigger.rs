//! TIM2 as the periodic sample trigger.
use fugit::NanosDurationU32;
use sampler::Trigger;

use super::{design_parameters::TIMER_PERIOD_NS, hal};

/// Update interrupt of TIM2 at the sample rate.
///
/// The interrupt handler must call [SampleTrigger::clear] first.
pub struct SampleTrigger {
    timer: hal::timer::Timer<hal::stm32::TIM2>,
}

impl SampleTrigger {
    /// Construct the trigger.
    ///
    /// # Args
    /// * `timer` - TIM2 counting at [super::design_parameters::TIMER_FREQUENCY].
    pub fn new(mut timer: hal::timer::Timer<hal::stm32::TIM2>) -> Self {
        timer.pause();
        timer.unlisten(hal::timer::Event::TimeOut);
        timer.clear_irq();
        Self { timer }
    }

    /// Acknowledge the update interrupt.
    #[inline(always)]
    pub fn clear() {
        // Note(unsafe): Only the update flag is cleared (rc_w0) which does not
        // interfere with the owner of the timer.
        let regs = unsafe { &*hal::stm32::TIM2::ptr() };
        regs.sr.modify(|_, w| w.uif().clear_bit());
    }
}

impl Trigger for SampleTrigger {
    fn arm(&mut self, period: NanosDurationU32) {
        let ticks = (period.ticks() / TIMER_PERIOD_NS).max(1);
        // Note(unsafe): TIM2 is a 32 bit timer, all reload values are valid.
        let regs = unsafe { &*hal::stm32::TIM2::ptr() };
        regs.arr.write(|w| w.arr().bits(ticks - 1));
        // Force the new period to take effect immediately.
        self.timer.apply_freq();
        self.timer.reset_counter();
        self.timer.clear_irq();
        self.timer.listen(hal::timer::Event::TimeOut);
        self.timer.resume();
    }

    fn disarm(&mut self) {
        self.timer.pause();
        self.timer.unlisten(hal::timer::Event::TimeOut);
        self.timer.clear_irq();
        cortex_m::peripheral::NVIC::unpend(hal::stm32::Interrupt::TIM2);
    }
}
