use super::{Accumulator, ChannelList, Error, Pipeline, RunState, State, Statistics};

/// Acquisition state machine and its run data.
///
/// # Design
/// [Sampler::tick] is the body of the periodic trigger interrupt. It always
/// performs exactly one [Pipeline::exchange], transmitting the code of the
/// next channel in the [ChannelList], and then advances the state machine:
///
/// * `Idle`: nothing else.
/// * `Starting`: the result is stale. Restart the channel sequence and bias
///   the point counter by `-IN_FLIGHT` so that the results already queued in
///   the pipeline are skipped. Continue with `Running`.
/// * `Running`: store the result at the point counter if it is not negative,
///   accumulate it, advance the point counter and the channel index. Return to
///   `Idle` once the requested number of samples has been stored.
///
/// The stored sample `i` belongs to the `i % channels.len()`-th entry of the
/// channel list.
///
/// The tick handler never blocks, allocates or fails. All validation happens
/// in [Sampler::prepare] and [Sampler::configure].
pub struct Sampler<'a, P, const N: usize> {
    pipeline: P,
    state: &'a RunState,
    channels: ChannelList,
    // Index of the channel code transmitted at the next tick.
    next: usize,
    // Buffer index of the next result. Negative while priming.
    point: isize,
    len: usize,
    // Channel list length of the last prepared run.
    stride: usize,
    buffer: &'a mut [u16; N],
    accu: Accumulator,
}

impl<'a, P: Pipeline, const N: usize> Sampler<'a, P, N> {
    /// Construct the sampler.
    ///
    /// # Args
    /// * `pipeline` - The bus exchange used at every tick.
    /// * `state` - The state cell also polled by the caller.
    /// * `buffer` - Sample storage. Its contents are kept until overwritten
    ///   by the next run.
    /// * `channels` - The initial channel sequence.
    pub fn new(
        pipeline: P,
        state: &'a RunState,
        buffer: &'a mut [u16; N],
        channels: ChannelList,
    ) -> Self {
        Self {
            pipeline,
            state,
            stride: channels.len(),
            channels,
            next: 0,
            point: 0,
            len: 0,
            buffer,
            accu: Accumulator::default(),
        }
    }

    /// Sample buffer capacity.
    pub const CAPACITY: usize = N;

    /// Replace the channel sequence. Only possible while idle.
    pub fn configure(&mut self, channels: ChannelList) -> Result<(), Error> {
        if !self.state.is_idle() {
            return Err(Error::Busy);
        }
        self.channels = channels;
        self.next = 0;
        Ok(())
    }

    pub fn channels(&self) -> &ChannelList {
        &self.channels
    }

    /// Validate and reset the run parameters for a run of `len` samples.
    ///
    /// After this the caller arms the trigger and seeds the run with
    /// [RunState::start].
    pub fn prepare(&mut self, len: usize) -> Result<(), Error> {
        if !self.state.is_idle() {
            return Err(Error::Busy);
        }
        if len > N {
            return Err(Error::BufferOverrun { len, capacity: N });
        }
        self.len = len;
        self.stride = self.channels.len();
        self.point = 0;
        self.next = 0;
        self.accu = Accumulator::default();
        Ok(())
    }

    /// Advance the acquisition by one sample period.
    #[inline]
    pub fn tick(&mut self) {
        let result = self.pipeline.exchange(self.channels.code(self.next));

        match self.state.get() {
            State::Idle => {}
            State::Starting => {
                self.next = 0;
                self.point = -(P::IN_FLIGHT as isize);
                self.state.set(State::Running);
            }
            State::Running => {
                if self.point >= 0 {
                    self.buffer[self.point as usize] = result;
                    self.accu.update(result);
                }
                self.point += 1;
                if self.point >= self.len as isize {
                    self.state.set(State::Idle);
                }
                self.next = self.channels.advance(self.next);
            }
        }
    }

    /// Release the bus after the trigger was disarmed.
    pub fn finish(&mut self) {
        self.pipeline.finish();
    }

    pub fn state(&self) -> State {
        self.state.get()
    }

    /// The samples of the last completed run.
    ///
    /// They stay interleaved by the channel list of that run even if the list
    /// was reconfigured since.
    pub fn samples(&self) -> Samples<'_> {
        Samples {
            data: &self.buffer[..self.len],
            stride: self.stride,
        }
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accu
    }

    pub fn statistics(&self) -> Statistics {
        self.accu.get()
    }
}

/// Samples of a completed run in acquisition order.
#[derive(Copy, Clone, Debug)]
pub struct Samples<'a> {
    data: &'a [u16],
    stride: usize,
}

impl<'a> Samples<'a> {
    pub fn as_slice(&self) -> &'a [u16] {
        self.data
    }

    /// The samples taken from the `index`-th entry of the channel list.
    pub fn channel(&self, index: usize) -> impl Iterator<Item = u16> + 'a {
        self.data.iter().skip(index).step_by(self.stride).copied()
    }
}

impl core::ops::Deref for Samples<'_> {
    type Target = [u16];

    fn deref(&self) -> &[u16] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    const STALE: u16 = 0xdead;

    /// Returns the queued values in order, records the transmitted codes.
    struct Script {
        results: Vec<u16>,
        sent: Vec<u32>,
    }

    impl Script {
        fn new(results: &[u16]) -> Self {
            Self {
                results: results.iter().rev().copied().collect(),
                sent: Vec::new(),
            }
        }
    }

    impl Pipeline for Script {
        const IN_FLIGHT: usize = 2;

        fn exchange(&mut self, next: u32) -> u16 {
            self.sent.push(next);
            self.results.pop().unwrap_or(0)
        }
    }

    /// Emulates a converter that returns the code selected two exchanges
    /// earlier as the result.
    #[derive(Default)]
    struct Lagging<const D: usize> {
        queue: Vec<u16>,
    }

    impl<const D: usize> Pipeline for Lagging<D> {
        const IN_FLIGHT: usize = D;

        fn exchange(&mut self, next: u32) -> u16 {
            self.queue.insert(0, next as u16);
            if self.queue.len() > D {
                self.queue.pop().unwrap()
            } else {
                STALE
            }
        }
    }

    fn run<P: Pipeline, const N: usize>(s: &mut Sampler<'_, P, N>, len: usize) {
        s.prepare(len).unwrap();
        // Idle ticks before the run is requested.
        s.tick();
        s.state.start();
        for _ in 0..len + P::IN_FLIGHT + 1 {
            s.tick();
        }
        assert_eq!(s.state(), State::Idle);
    }

    #[test]
    fn scenario() {
        let state = RunState::new();
        let mut buf = [0; 16];
        let (x, y) = (0xc000_0000, 0xc400_0000);
        // idle, starting, then r0..r7
        let results = [STALE, STALE, 10, 11, 12, 13, 14, 15, 16, 17];
        let mut s = Sampler::new(
            Script::new(&results),
            &state,
            &mut buf,
            ChannelList::new(&[x, y]).unwrap(),
        );
        s.prepare(4).unwrap();
        s.tick();
        state.start();
        s.tick();
        assert_eq!(s.state(), State::Running);
        // Priming ticks
        s.tick();
        s.tick();
        assert_eq!(s.accumulator().count(), 0);
        for _ in 0..4 {
            assert_eq!(s.state(), State::Running);
            s.tick();
        }
        assert_eq!(s.state(), State::Idle);
        assert_eq!(&*s.samples(), &[12, 13, 14, 15]);
        assert_eq!(s.accumulator().count(), 4);
        assert_eq!(s.accumulator().sum(), 54.);
        assert_eq!(s.pipeline.sent, [x, x, x, y, x, y, x, y]);
        // Further ticks do not touch the buffer.
        s.tick();
        assert_eq!(&*s.samples(), &[12, 13, 14, 15]);
        assert_eq!(buf[4], 0);
    }

    #[test]
    fn priming_discarded() {
        let state = RunState::new();
        let mut buf = [0; 8];
        let mut s = Sampler::new(
            Script::new(&[1, 2, 0xffff, 0xfffe, 5, 6, 7]),
            &state,
            &mut buf,
            ChannelList::new(&[1]).unwrap(),
        );
        run(&mut s, 3);
        assert_eq!(&*s.samples(), &[5, 6, 7]);
        assert_eq!(s.statistics().mean, 6.);
    }

    #[test]
    fn channel_alignment() {
        let state = RunState::new();
        let mut buf = [0; 32];
        let (a, b, c) = (0xa, 0xb, 0xc);
        let mut s = Sampler::new(
            Lagging::<2>::default(),
            &state,
            &mut buf,
            ChannelList::new(&[a, b, c, 0]).unwrap(),
        );
        run(&mut s, 10);
        assert_eq!(&*s.samples(), &[0xa, 0xb, 0xc, 0xa, 0xb, 0xc, 0xa, 0xb, 0xc, 0xa]);
        assert!(s.samples().channel(0).all(|x| x == 0xa));
        assert!(s.samples().channel(1).all(|x| x == 0xb));
        assert_eq!(s.samples().channel(2).count(), 3);
    }

    #[test]
    fn deeper_pipeline() {
        let state = RunState::new();
        let mut buf = [0; 32];
        let mut s = Sampler::new(
            Lagging::<3>::default(),
            &state,
            &mut buf,
            ChannelList::new(&[1, 2, 3, 4, 5]).unwrap(),
        );
        run(&mut s, 7);
        assert_eq!(&*s.samples(), &[1, 2, 3, 4, 5, 1, 2]);
    }

    #[test]
    fn accumulators_exact() {
        let state = RunState::new();
        let mut buf = [0; 64];
        let values: Vec<u16> = (0..64u32)
            .map(|i| (i.wrapping_mul(0x9e37_79b9) >> 16) as u16)
            .collect();
        let mut results = std::vec![STALE, STALE, STALE, STALE];
        results.extend(&values);
        let mut s = Sampler::new(
            Script::new(&results),
            &state,
            &mut buf,
            ChannelList::new(&[1, 2, 3]).unwrap(),
        );
        run(&mut s, 64);
        let samples = s.samples();
        assert_eq!(&*samples, &values[..]);
        let sum: f64 = samples.iter().map(|&x| x as f64).sum();
        let sum2: f64 = samples.iter().map(|&x| x as f64 * x as f64).sum();
        assert_eq!(s.accumulator().sum(), sum);
        assert_eq!(s.accumulator().sum_of_squares(), sum2);
    }

    #[test]
    fn zero_length() {
        let state = RunState::new();
        let mut buf = [7; 4];
        let mut s = Sampler::new(
            Script::new(&[1, 2, 3, 4, 5]),
            &state,
            &mut buf,
            ChannelList::new(&[1]).unwrap(),
        );
        run(&mut s, 0);
        assert!(s.samples().is_empty());
        assert_eq!(s.accumulator().count(), 0);
        assert_eq!(s.accumulator().sum(), 0.);
        assert_eq!(buf, [7; 4]);
    }

    #[test]
    fn capacity() {
        let state = RunState::new();
        let mut buf = [0; 4];
        let mut s = Sampler::new(
            Script::new(&[]),
            &state,
            &mut buf,
            ChannelList::new(&[1]).unwrap(),
        );
        assert_eq!(
            s.prepare(5),
            Err(Error::BufferOverrun {
                len: 5,
                capacity: 4
            })
        );
        run(&mut s, 4);
    }

    #[test]
    fn reconfigured_after_run() {
        let state = RunState::new();
        let mut buf = [0; 16];
        let mut s = Sampler::new(
            Lagging::<2>::default(),
            &state,
            &mut buf,
            ChannelList::new(&[0xa, 0xb, 0xc]).unwrap(),
        );
        run(&mut s, 9);
        s.configure(ChannelList::new(&[0xd, 0xe]).unwrap()).unwrap();
        assert_eq!(s.channels().len(), 2);
        assert!(s.samples().channel(0).all(|x| x == 0xa));
        assert!(s.samples().channel(1).all(|x| x == 0xb));
        assert_eq!(s.samples().channel(2).collect::<Vec<_>>(), [0xc; 3]);
        run(&mut s, 4);
        assert_eq!(&*s.samples(), &[0xd, 0xe, 0xd, 0xe]);
        assert!(s.samples().channel(1).all(|x| x == 0xe));
    }

    #[test]
    fn busy() {
        let state = RunState::new();
        let mut buf = [0; 4];
        let mut s = Sampler::new(
            Script::new(&[]),
            &state,
            &mut buf,
            ChannelList::new(&[1]).unwrap(),
        );
        s.prepare(4).unwrap();
        state.start();
        assert_eq!(s.prepare(4), Err(Error::Busy));
        assert_eq!(
            s.configure(ChannelList::new(&[2]).unwrap()),
            Err(Error::Busy)
        );
    }

    #[test]
    fn buffer_kept_between_runs() {
        let state = RunState::new();
        let mut buf = [0; 8];
        let mut s = Sampler::new(
            Script::new(&[0, 0, 0, 0, 1, 2, 3, 4, 0, 0, 0, 0, 9]),
            &state,
            &mut buf,
            ChannelList::new(&[1]).unwrap(),
        );
        run(&mut s, 4);
        assert_eq!(&*s.samples(), &[1, 2, 3, 4]);
        run(&mut s, 1);
        assert_eq!(&*s.samples(), &[9]);
        assert_eq!(s.accumulator().sum(), 9.);
        assert_eq!(buf[..4], [9, 2, 3, 4]);
    }
}
