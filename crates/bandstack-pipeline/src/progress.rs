//! Monotone integer progress reporting.
//!
//! Progress is a whole percentage derived from frames read over the total
//! the container reported. Emissions are deduplicated and never decrease;
//! a natural completion always ends on exactly 100 even when the container
//! over- or under-reported its frame count.

use tokio::sync::mpsc;

/// Sending half of a progress channel.
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<u8>,
    last: Option<u8>,
}

/// Create a progress channel pair.
pub fn progress_channel() -> (ProgressSender, mpsc::UnboundedReceiver<u8>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx, last: None }, rx)
}

impl ProgressSender {
    /// Emit a percentage. Values are clamped to 100; repeats and
    /// regressions are dropped. A closed receiver is ignored.
    pub fn emit(&mut self, pct: u8) {
        let pct = pct.min(100);
        if let Some(last) = self.last {
            if pct <= last {
                return;
            }
        }
        self.last = Some(pct);
        let _ = self.tx.send(pct);
    }

    /// Emit the floor percentage of `done` over `total`.
    pub fn emit_ratio(&mut self, done: u64, total: u64) {
        let total = total.max(1);
        let pct = (done.saturating_mul(100) / total).min(100) as u8;
        self.emit(pct);
    }

    /// Last emitted percentage, 0 if nothing was emitted yet.
    pub fn last(&self) -> u8 {
        self.last.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<u8>) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(v) = rx.try_recv() {
            out.push(v);
        }
        out
    }

    #[tokio::test]
    async fn test_emissions_are_monotone_and_deduplicated() {
        let (mut tx, mut rx) = progress_channel();
        for pct in [0, 3, 3, 2, 7, 7, 100] {
            tx.emit(pct);
        }
        assert_eq!(drain(&mut rx), vec![0, 3, 7, 100]);
        assert_eq!(tx.last(), 100);
    }

    #[tokio::test]
    async fn test_ratio_floors_and_clamps() {
        let (mut tx, mut rx) = progress_channel();
        tx.emit_ratio(1, 3);
        tx.emit_ratio(2, 3);
        tx.emit_ratio(5, 3);
        assert_eq!(drain(&mut rx), vec![33, 66, 100]);
    }

    #[tokio::test]
    async fn test_first_emission_can_be_zero() {
        let (mut tx, mut rx) = progress_channel();
        tx.emit_ratio(0, 5400);
        assert_eq!(drain(&mut rx), vec![0]);
    }

    #[tokio::test]
    async fn test_closed_receiver_is_ignored() {
        let (mut tx, rx) = progress_channel();
        drop(rx);
        tx.emit(50);
        assert_eq!(tx.last(), 50);
    }
}
