//! Run-scoped experiment state: the result log and the round records.
//!
//! One [`ExperimentContext`] lives for exactly one run. It is handed to the
//! orchestrator explicitly and closed explicitly, which writes the run
//! summary next to the result file.
//!
//! # Result file
//!
//! ```text
//!  task = classification
//!  num_trial = 3
//!  ...
//! ========================================
//! Trial,Round,TestAcc
//! 0,0,0.412300
//! 0,1,0.538100
//! ```
//!
//! Every row is flushed as soon as it is written, so a crashed run keeps all
//! completed rounds.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::ActiveLearningConfig;
use crate::error::ALResult;
use crate::metrics::{RoundRecord, RunSummary};

/// Number of `=` characters in the header separator.
const SEPARATOR_WIDTH: usize = 40;

/// Append-only CSV-style log of per-round accuracy.
#[derive(Debug)]
pub struct ResultLog<W: Write> {
    writer: W,
    rows: usize,
}

impl<W: Write> ResultLog<W> {
    /// Writes the configuration header and the column header to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the header cannot be written.
    pub fn new(mut writer: W, header: &[(String, String)]) -> ALResult<Self> {
        for (key, value) in header {
            writeln!(writer, " {key} = {value}")?;
        }
        writeln!(writer, "{}", "=".repeat(SEPARATOR_WIDTH))?;
        writeln!(writer, "Trial,Round,TestAcc")?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    /// Appends one `trial,round,accuracy` row and flushes.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the row cannot be written.
    pub fn record(&mut self, trial: usize, round: usize, accuracy: f64) -> ALResult<()> {
        writeln!(self.writer, "{trial},{round},{accuracy:.6}")?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

/// Explicit owner of everything a run shares across trials.
#[derive(Debug)]
pub struct ExperimentContext<W: Write> {
    log: ResultLog<W>,
    output_dir: PathBuf,
    stamp: String,
    result_path: Option<PathBuf>,
    records: Vec<RoundRecord>,
    completed_trials: usize,
    aborted_trials: usize,
}

impl ExperimentContext<BufWriter<File>> {
    /// Creates `output_dir` and a timestamped result file inside it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or file cannot be created.
    pub fn create(config: &ActiveLearningConfig) -> ALResult<Self> {
        std::fs::create_dir_all(&config.output_dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let path = config.output_dir.join(format!("result_{stamp}.txt"));
        let file = BufWriter::new(File::create(&path)?);

        tracing::info!(path = %path.display(), "writing results");
        let mut context = Self::with_writer(file, config, stamp)?;
        context.result_path = Some(path);
        Ok(context)
    }
}

impl<W: Write> ExperimentContext<W> {
    /// Creates a context logging to `writer`; the summary still goes to
    /// `config.output_dir` on [`close`](Self::close).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the header cannot be written.
    pub fn with_writer(writer: W, config: &ActiveLearningConfig, stamp: impl Into<String>) -> ALResult<Self> {
        Ok(Self {
            log: ResultLog::new(writer, &config.summary_lines())?,
            output_dir: config.output_dir.clone(),
            stamp: stamp.into(),
            result_path: None,
            records: Vec::new(),
            completed_trials: 0,
            aborted_trials: 0,
        })
    }

    /// Logs and keeps a completed round.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the result row cannot be written.
    pub fn record_round(&mut self, record: RoundRecord) -> ALResult<()> {
        self.log.record(record.trial, record.round, record.accuracy)?;
        self.records.push(record);
        Ok(())
    }

    /// Attaches the indices queried at the end of the last recorded round.
    pub fn attach_queried(&mut self, queried: &[usize]) {
        if let Some(last) = self.records.last_mut() {
            last.queried = queried.to_vec();
        }
    }

    /// Marks a trial as finished.
    pub fn finish_trial(&mut self) {
        self.completed_trials += 1;
    }

    /// Marks a trial as abandoned by the divergence policy.
    pub fn abort_trial(&mut self) {
        self.aborted_trials += 1;
    }

    /// Round records so far.
    #[must_use]
    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    /// The result log.
    #[must_use]
    pub fn log(&self) -> &ResultLog<W> {
        &self.log
    }

    /// Path of the result file, if the context writes to one.
    #[must_use]
    pub fn result_path(&self) -> Option<&Path> {
        self.result_path.as_deref()
    }

    /// Directory for summaries and checkpoints.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Current run summary.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_records(&self.records, self.completed_trials, self.aborted_trials)
    }

    /// Ends the run: flushes the log and writes `summary_<stamp>.json`.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error if the summary cannot be
    /// written.
    pub fn close(mut self) -> ALResult<RunSummary> {
        self.log.writer.flush()?;
        let summary = self.summary();
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("summary_{}.json", self.stamp));
        std::fs::write(&path, summary.to_json()?)?;
        tracing::info!(path = %path.display(), "run summary written");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(trial: usize, round: usize, accuracy: f64) -> RoundRecord {
        RoundRecord {
            trial,
            round,
            num_labeled: 2,
            accuracy,
            queried: Vec::new(),
            retries: 0,
            final_task_loss: None,
        }
    }

    #[test]
    fn test_result_log_format() {
        let header = vec![("task".to_string(), "pose".to_string())];
        let mut log = ResultLog::new(Vec::new(), &header).unwrap();
        log.record(0, 1, 0.5).unwrap();
        let text = String::from_utf8(log.get_ref().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], " task = pose");
        assert_eq!(lines[1], "=".repeat(40));
        assert_eq!(lines[2], "Trial,Round,TestAcc");
        assert_eq!(lines[3], "0,1,0.500000");
        assert_eq!(log.rows(), 1);
    }

    #[test]
    fn test_close_writes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let config = ActiveLearningConfig::builder()
            .output_dir(dir.path())
            .build();
        let mut context = ExperimentContext::with_writer(Vec::new(), &config, "test").unwrap();
        context.record_round(record(0, 0, 0.25)).unwrap();
        context.record_round(record(0, 1, 0.75)).unwrap();
        context.finish_trial();

        let summary = context.close().unwrap();
        assert_eq!(summary.completed_trials, 1);
        assert!(dir.path().join("summary_test.json").exists());
    }

    #[test]
    fn test_create_names_result_file_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let config = ActiveLearningConfig::builder()
            .output_dir(dir.path().join("nested"))
            .build();
        let context = ExperimentContext::create(&config).unwrap();
        let path = context.result_path().unwrap().to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("result_") && name.ends_with(".txt"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Trial,Round,TestAcc"));
    }
}
