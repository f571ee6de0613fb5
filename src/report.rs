use tokio::sync::mpsc;

use crate::types::ReportEvent;

/// Create a fresh report channel: a cloneable producer handle for the scan
/// workers and a polling consumer handle for the front-end.
pub fn channel() -> (Reporter, ReportReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Reporter { tx }, ReportReceiver { rx })
}

/// Producer side of the report channel. Cheap to clone, one per worker.
///
/// Sends never block; if the consumer went away the event is dropped
/// silently (a cancelled front-end is not the engine's problem).
#[derive(Clone, Debug)]
pub struct Reporter {
    tx: mpsc::UnboundedSender<ReportEvent>,
}

impl Reporter {
    pub fn send(&self, event: ReportEvent) {
        let _ = self.tx.send(event);
    }
}

/// Consumer side of the report channel, owned by exactly one front-end.
#[derive(Debug)]
pub struct ReportReceiver {
    rx: mpsc::UnboundedReceiver<ReportEvent>,
}

impl ReportReceiver {
    /// Non-blocking poll for the next event. `None` means nothing queued
    /// right now, not end-of-stream; the `Complete` event marks that.
    pub fn try_next(&mut self) -> Option<ReportEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&mut self) -> Vec<ReportEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            out.push(event);
        }
        out
    }

    /// Await the next event. `None` once all producers are gone.
    pub async fn recv(&mut self) -> Option<ReportEvent> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_fifo_order() {
        let (tx, mut rx) = channel();
        tx.send(ReportEvent::Progress(10.0));
        tx.send(ReportEvent::Progress(20.0));
        tx.send(ReportEvent::Complete);

        let events = rx.drain();
        assert_eq!(
            events,
            vec![
                ReportEvent::Progress(10.0),
                ReportEvent::Progress(20.0),
                ReportEvent::Complete,
            ]
        );
        assert_eq!(rx.try_next(), None);
    }

    #[test]
    fn send_after_consumer_drop_is_ignored() {
        let (tx, rx) = channel();
        drop(rx);
        tx.send(ReportEvent::Progress(50.0));
    }
}
