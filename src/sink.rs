//! Destinations for episode summaries.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::{Writer, WriterBuilder};
use log::debug;

use crate::error::Result;
use crate::metrics::EpisodeSummary;

/// Receives one [`EpisodeSummary`] per finished episode.
pub trait EpisodeSink {
    fn record(&mut self, summary: &EpisodeSummary) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Tabular episode log: a fixed header, then one row per episode.
///
/// Every row is flushed as soon as it is written so the file can be tailed
/// while training runs.
pub struct CsvSink<W: Write> {
    writer: Writer<W>,
    rows: usize,
}

impl CsvSink<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        debug!("writing episode log to {}", path.as_ref().display());
        Self::new(file)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(inner);
        writer.write_record(EpisodeSummary::HEADER)?;
        writer.flush()?;
        Ok(CsvSink { writer, rows: 0 })
    }

    /// Rows written so far, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| err.into_error().into())
    }
}

impl<W: Write> EpisodeSink for CsvSink<W> {
    fn record(&mut self, summary: &EpisodeSummary) -> Result<()> {
        self.writer.serialize(summary)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes each summary to the `log` facade at debug level.
#[derive(Debug, Default)]
pub struct LogSink;

impl EpisodeSink for LogSink {
    fn record(&mut self, summary: &EpisodeSummary) -> Result<()> {
        debug!(
            "episode {}: reward {:.3} (avg {:.3}, min {:.3}, max {:.3}), {} steps in {:.2}s, \
             train steps {}, replay {}, meanq {:.4}, meancost {:.6}",
            summary.episode,
            summary.episode_reward,
            summary.average_reward,
            summary.min_reward,
            summary.max_reward,
            summary.episode_steps,
            summary.episode_time,
            summary.total_train_steps,
            summary.replay_memory_count,
            summary.meanq,
            summary.meancost,
        );
        Ok(())
    }
}
