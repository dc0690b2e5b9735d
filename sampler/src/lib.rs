#![cfg_attr(not(test), no_std)]

//! Interrupt driven acquisition of a pipelined SPI ADC.
//!
//! A periodic trigger calls [Sampler::tick] once per sample period. Each tick
//! performs one full duplex bus exchange through a [Pipeline] which reads the
//! result of the previous conversion while selecting the next channel. The
//! [Sampler] state machine discards the results that were already in flight
//! when the run started, stores the rest and accumulates their statistics.
//!
//! [Acquisition::run] implements the blocking caller side: validate, arm the
//! trigger, seed [State::Starting], spin until [State::Idle], disarm.

mod channels;
pub use channels::*;
mod machine;
pub use machine::*;
mod pipeline;
pub use pipeline::*;
mod run;
pub use run::*;
mod state;
pub use state::*;
mod statistics;
pub use statistics::*;
mod timing;
pub use timing::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Empty channel list")]
    EmptyChannelList,
    #[error("Too many channels")]
    TooManyChannels,
    #[error("{len} samples exceed the buffer capacity of {capacity}")]
    BufferOverrun { len: usize, capacity: usize },
    #[error("Bus transaction takes {transaction} ns, sample period is {period} ns")]
    TimingOverrun { transaction: u32, period: u32 },
    #[error("Zero sample rate")]
    ZeroRate,
    #[error("Acquisition in progress")]
    Busy,
}
