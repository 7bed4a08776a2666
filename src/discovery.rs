//! Locating a complete `moov` box at the head of a source.
//!
//! The size of the movie box is unknown until it has been read, so the head
//! of the source is re-read from offset 0 with a doubling buffer until the
//! decoder reports a complete `moov` or the budget is exhausted.

use crate::config::ParserConfig;
use crate::source::SourceReader;
use hlsforge_media::{BoxDecoder, DecodedBoxes, Error, Result};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoovDiscovery {
    pub initial_read_size: usize,
    pub max_buffer_size: usize,
}

impl MoovDiscovery {
    pub fn new(initial_read_size: usize, max_buffer_size: usize) -> Self {
        Self {
            initial_read_size: initial_read_size.max(1),
            max_buffer_size: max_buffer_size.max(initial_read_size),
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(config.initial_read_size, config.max_buffer_size)
    }

    /// Read sizes attempted, in order. The last one is always the budget.
    pub fn attempt_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::new();
        let mut size = self.initial_read_size;
        loop {
            sizes.push(size);
            if size >= self.max_buffer_size {
                break;
            }
            size = size.saturating_mul(2).min(self.max_buffer_size);
        }
        sizes
    }

    /// Decode the source head until a complete `moov` is found.
    pub async fn discover(
        &self,
        reader: &dyn SourceReader,
        decoder: &dyn BoxDecoder,
    ) -> Result<DecodedBoxes> {
        let started = Instant::now();

        for (attempt, size) in self.attempt_sizes().into_iter().enumerate() {
            let data = reader.read(0, size).await;
            if data.is_empty() {
                tracing::warn!(
                    source = reader.source_id(),
                    attempt = attempt + 1,
                    size,
                    "Empty read while looking for moov"
                );
                continue;
            }

            let decoded = decoder.decode(&data)?;
            if decoded.complete_moov().is_some() {
                tracing::debug!(
                    source = reader.source_id(),
                    attempts = attempt + 1,
                    bytes = data.len(),
                    elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "profiling,metadata_retrieval"
                );
                return Ok(decoded);
            }

            if data.len() < size {
                // The whole source fits in the buffer; more reads cannot help
                tracing::debug!(
                    source = reader.source_id(),
                    len = data.len(),
                    "Source ended without a complete moov"
                );
                return Err(Error::MoovNotFound { budget: size });
            }
        }

        Err(Error::MoovNotFound {
            budget: self.max_buffer_size,
        })
    }
}

impl Default for MoovDiscovery {
    fn default() -> Self {
        Self::from_config(&ParserConfig::default())
    }
}
