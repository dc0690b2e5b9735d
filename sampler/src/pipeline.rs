use embedded_hal::digital::OutputPin;

/// One bus exchange per tick for a converter with pipelined readback.
///
/// The word returned by [Pipeline::exchange] is the result belonging to the
/// channel selected [Pipeline::IN_FLIGHT] exchanges before the first one of a
/// run. The [crate::Sampler] uses this to discard stale results at run start.
pub trait Pipeline {
    /// Number of stale results in the pipeline when a run starts.
    const IN_FLIGHT: usize;

    /// End the previous conversion window, capture its result, start the next
    /// window and queue the `next` channel select code.
    fn exchange(&mut self, next: u32) -> u16;

    /// Release the bus after the trigger has been disarmed.
    fn finish(&mut self) {}
}

/// Register level access to a full duplex bus with transmit and receive FIFOs.
///
/// Implementations must not block: the methods are called from the tick
/// handler.
pub trait FifoBus {
    /// Read the received data register.
    fn read(&mut self) -> u32;

    /// Write the transmit data register, starting a word transfer.
    fn write(&mut self, word: u32);

    /// Discard everything left in the receive FIFO.
    fn drain(&mut self);
}

/// [Pipeline] over a [FifoBus] with a separately driven active low device
/// select line.
///
/// Raising device select ends the conversion window of the previous tick. The
/// receive register then holds the word clocked in during that tick which
/// carries the result of the conversion selected one tick earlier. With the
/// exchange of the `Starting` tick and the first `Running` tick this leaves
/// two stale results at run start.
pub struct Pipeliner<B, CS> {
    bus: B,
    cs: CS,
}

impl<B: FifoBus, CS: OutputPin> Pipeliner<B, CS> {
    pub fn new(bus: B, mut cs: CS) -> Self {
        cs.set_high().ok();
        Self { bus, cs }
    }

    pub fn free(self) -> (B, CS) {
        (self.bus, self.cs)
    }
}

impl<B: FifoBus, CS: OutputPin> Pipeline for Pipeliner<B, CS> {
    const IN_FLIGHT: usize = 2;

    #[inline(always)]
    fn exchange(&mut self, next: u32) -> u16 {
        // GPIO writes are infallible on the supported targets and bus faults
        // are not observable within the tick budget.
        self.cs.set_high().ok();
        let word = self.bus.read();
        self.cs.set_low().ok();
        self.bus.write(next);
        word as u16
    }

    fn finish(&mut self) {
        self.bus.drain();
        self.cs.set_high().ok();
    }
}
