use core::sync::atomic::{AtomicU8, Ordering};

/// Acquisition state machine states.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    /// No run requested or the previous run finished.
    Idle = 0,
    /// Run requested, the next tick synchronizes.
    Starting = 1,
    /// Collecting samples.
    Running = 2,
}

/// Machine state shared between the tick handler and the caller.
///
/// The tick handler is the only writer except for [RunState::start] which the
/// caller uses to request a run while the machine is idle. The caller observes
/// completion by polling [RunState::is_idle]. Release/acquire ordering makes the
/// buffer and accumulator writes of the run visible once idle is observed.
#[derive(Debug, Default)]
pub struct RunState(AtomicU8);

impl RunState {
    pub const fn new() -> Self {
        Self(AtomicU8::new(State::Idle as u8))
    }

    #[inline(always)]
    pub fn get(&self) -> State {
        match self.0.load(Ordering::Acquire) {
            1 => State::Starting,
            2 => State::Running,
            _ => State::Idle,
        }
    }

    #[inline(always)]
    pub(crate) fn set(&self, state: State) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Request a run. Only valid while idle and after the run was prepared.
    pub fn start(&self) {
        self.set(State::Starting);
    }

    pub fn is_idle(&self) -> bool {
        self.get() == State::Idle
    }
}
