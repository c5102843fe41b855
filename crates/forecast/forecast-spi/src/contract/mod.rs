//! Contract module containing trait definitions for forecast operations

mod decomposer;
mod forecaster;
mod progress_sink;

pub use decomposer::Decomposer;
pub use forecaster::{FitWindow, Forecaster};
pub use progress_sink::{ChannelSink, ProgressSink};
