//! Receiver of advisory progress reports

use std::sync::mpsc::Sender;

use crate::model::Progress;

/// Receives a [`Progress`] report each time an adapter finishes.
///
/// Reports are advisory: a sink that drops them does not affect the run.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn report(&self, progress: Progress) {
        self(progress)
    }
}

/// Streams progress over a channel
pub struct ChannelSink {
    sender: Sender<Progress>,
}

impl ChannelSink {
    pub fn new(sender: Sender<Progress>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelSink {
    fn report(&self, progress: Progress) {
        // Receiver may be gone; progress is advisory
        let _ = self.sender.send(progress);
    }
}
