use crate::domain::StreamMetadata;

/// Receives progress of a submission as it happens, for live display.
pub trait SubmissionObserver: Send {
    fn on_stream_started(&mut self, _metadata: &StreamMetadata) {}

    fn on_chunk(&mut self, _text: &str) {}

    fn on_fallback(&mut self) {}
}

/// Observer that ignores everything.
pub struct SilentObserver;

impl SubmissionObserver for SilentObserver {}
