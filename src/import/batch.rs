//! Fixed-size batching over a bounded channel

use tokio::sync::mpsc;

/// Groups items from a channel into batches of `size`
///
/// Every batch is full except possibly the last one, which is flushed when
/// the channel closes.
pub struct Batcher<T> {
    rx: mpsc::Receiver<T>,
    size: usize,
}

impl<T> Batcher<T> {
    pub fn new(rx: mpsc::Receiver<T>, size: usize) -> Self {
        Self { rx, size: size.max(1) }
    }

    pub fn batch_size(&self) -> usize {
        self.size
    }

    /// Wait for the next batch, `None` once the channel is closed and drained
    ///
    /// Cancelling this future drops any partially collected batch.
    pub async fn next_batch(&mut self) -> Option<Vec<T>> {
        let mut batch = Vec::with_capacity(self.size);
        while batch.len() < self.size {
            let remaining = self.size - batch.len();
            if self.rx.recv_many(&mut batch, remaining).await == 0 {
                break;
            }
        }

        if batch.is_empty() { None } else { Some(batch) }
    }

    /// Stop accepting items; pending senders fail from now on
    pub fn close(&mut self) {
        self.rx.close();
    }
}
