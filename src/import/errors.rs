//! Error aggregation for import workers
//!
//! Workers never return errors across task boundaries; they report them to
//! an `ErrorSink` and the orchestrator drains the `ErrorCollector` once
//! every worker has finished.

use tokio::sync::mpsc;

use crate::error::ImportError;

/// Create a connected sink/collector pair
pub fn error_channel() -> (ErrorSink, ErrorCollector) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ErrorSink { tx }, ErrorCollector { rx })
}

/// Cloneable reporting end, one clone per worker
#[derive(Clone)]
pub struct ErrorSink {
    tx: mpsc::UnboundedSender<ImportError>,
}

impl ErrorSink {
    pub fn report(&self, err: ImportError) {
        tracing::warn!("{}", err);
        if let Err(mpsc::error::SendError(err)) = self.tx.send(err) {
            tracing::error!("Error collector is gone, dropping error: {}", err);
        }
    }
}

/// Receiving end owned by the orchestrator
pub struct ErrorCollector {
    rx: mpsc::UnboundedReceiver<ImportError>,
}

impl ErrorCollector {
    /// All errors reported so far, in reporting order
    pub fn drain(mut self) -> Vec<ImportError> {
        let mut errors = Vec::new();
        while let Ok(err) = self.rx.try_recv() {
            errors.push(err);
        }
        errors
    }
}
