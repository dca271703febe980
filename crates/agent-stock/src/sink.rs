//! Where finished predictions go

use crate::error::{Result, StockError};
use crate::predictor::Prediction;
use async_trait::async_trait;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Receives every prediction the predictor produces
///
/// A failing sink is logged by the predictor and never fails the request.
#[async_trait]
pub trait PredictionSink: Send + Sync {
    async fn publish(&self, code: &str, prediction: &Prediction) -> Result<()>;
}

/// Writes one JSON object per prediction, one per line
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> PredictionSink for JsonLinesSink<W> {
    async fn publish(&self, _code: &str, prediction: &Prediction) -> Result<()> {
        let line = serde_json::to_string(prediction)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{line}")
            .and_then(|()| writer.flush())
            .map_err(|e| StockError::Other(format!("Failed to write prediction: {e}")))
    }
}
