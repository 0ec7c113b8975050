//! Per-round checkpoints of the trained model and the pool.
//!
//! Two artifacts are written under `<output_dir>/checkpoints/`:
//!
//! - `trial{t}/model_round{r}.bin`: the task model after round `r`'s
//!   training, recorded with burn's full-precision binary file recorder
//! - `pool_trial{t}_round{r}.json`: the pool as round `r` started
//!
//! Together they let a crashed run restart at the last completed
//! `(trial, round)`: restore the pool, rebuild the model from its record,
//! and continue with the query step.
//!
//! The loss-prediction head is not checkpointed; it is rebuilt every round.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::config::CheckpointConfig;
use crate::error::{ALResult, ActiveLearningError};
use crate::pool::{Pool, PoolSnapshot};

/// Current pool checkpoint format version.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Pool state at the start of a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolCheckpoint {
    /// Format version.
    pub version: u32,
    /// Trial number.
    pub trial: usize,
    /// Round number.
    pub round: usize,
    /// Wall-clock timestamp (RFC 3339).
    pub timestamp: String,
    /// The pool.
    pub pool: PoolSnapshot,
}

impl PoolCheckpoint {
    /// Saves the checkpoint as JSON.
    ///
    /// # Errors
    ///
    /// Returns a checkpoint error if the file cannot be created or written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ALResult<()> {
        let file = File::create(path.as_ref()).map_err(|e| ActiveLearningError::Checkpoint {
            reason: format!("Failed to create pool checkpoint: {e}"),
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).map_err(|e| {
            ActiveLearningError::Checkpoint {
                reason: format!("Failed to serialize pool checkpoint: {e}"),
            }
        })
    }

    /// Loads a checkpoint and rebuilds the pool, re-validating it.
    ///
    /// # Errors
    ///
    /// Returns a checkpoint error for unreadable files or a version
    /// mismatch, and an invariant error for a corrupt pool.
    pub fn load<P: AsRef<Path>>(path: P) -> ALResult<(Self, Pool)> {
        let file = File::open(path.as_ref()).map_err(|e| ActiveLearningError::Checkpoint {
            reason: format!("Failed to open pool checkpoint: {e}"),
        })?;
        let checkpoint: Self = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            ActiveLearningError::Checkpoint {
                reason: format!("Failed to deserialize pool checkpoint: {e}"),
            }
        })?;

        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(ActiveLearningError::Checkpoint {
                reason: format!(
                    "Incompatible checkpoint version: {} (expected {CHECKPOINT_VERSION})",
                    checkpoint.version
                ),
            });
        }

        let pool = Pool::from_snapshot(checkpoint.pool.clone())?;
        Ok((checkpoint, pool))
    }
}

/// Writes round checkpoints according to [`CheckpointConfig`].
#[derive(Debug, Clone)]
pub struct RoundCheckpointer {
    dir: PathBuf,
    config: CheckpointConfig,
}

impl RoundCheckpointer {
    /// Creates a checkpointer writing under `<output_dir>/checkpoints`.
    #[must_use]
    pub fn new(output_dir: &Path, config: CheckpointConfig) -> Self {
        Self {
            dir: output_dir.join("checkpoints"),
            config,
        }
    }

    /// Checkpoint directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the model record for `(trial, round)`, including extension.
    #[must_use]
    pub fn model_path(&self, trial: usize, round: usize) -> PathBuf {
        self.model_stem(trial, round).with_extension("bin")
    }

    /// Path of the pool snapshot for `(trial, round)`.
    #[must_use]
    pub fn pool_path(&self, trial: usize, round: usize) -> PathBuf {
        self.dir.join(format!("pool_trial{trial}_round{round}.json"))
    }

    fn model_stem(&self, trial: usize, round: usize) -> PathBuf {
        self.dir.join(format!("trial{trial}")).join(format!("model_round{round}"))
    }

    /// Saves the pool as round `round` of `trial` starts.
    ///
    /// Returns the written path, or `None` when pool checkpoints are off.
    ///
    /// # Errors
    ///
    /// Returns a checkpoint error if the snapshot cannot be written.
    pub fn save_pool(&self, pool: &Pool, trial: usize, round: usize) -> ALResult<Option<PathBuf>> {
        if !(self.config.enabled && self.config.save_pool) {
            return Ok(None);
        }
        create_dir(&self.dir)?;
        let path = self.pool_path(trial, round);
        PoolCheckpoint {
            version: CHECKPOINT_VERSION,
            trial,
            round,
            timestamp: chrono::Utc::now().to_rfc3339(),
            pool: pool.snapshot(),
        }
        .save(&path)?;
        Ok(Some(path))
    }

    /// Records the trained task model of `(trial, round)`.
    ///
    /// Returns the written path, or `None` when checkpoints are off.
    ///
    /// # Errors
    ///
    /// Returns a checkpoint error if the record cannot be written.
    pub fn save_model<B, M>(&self, model: &M, trial: usize, round: usize) -> ALResult<Option<PathBuf>>
    where
        B: Backend,
        M: Module<B>,
    {
        if !self.config.enabled {
            return Ok(None);
        }
        let stem = self.model_stem(trial, round);
        if let Some(parent) = stem.parent() {
            create_dir(parent)?;
        }
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        model
            .clone()
            .save_file(stem, &recorder)
            .map_err(|e| ActiveLearningError::Checkpoint {
                reason: format!("Failed to record model: {e:?}"),
            })?;
        Ok(Some(self.model_path(trial, round)))
    }
}

/// Loads a model record written by [`RoundCheckpointer::save_model`] into
/// `model`.
///
/// # Errors
///
/// Returns a checkpoint error if the record is missing or does not match the
/// module structure.
pub fn load_model<B, M>(model: M, path: &Path, device: &B::Device) -> ALResult<M>
where
    B: Backend,
    M: Module<B>,
{
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .load_file(path.with_extension(""), &recorder, device)
        .map_err(|e| ActiveLearningError::Checkpoint {
            reason: format!("Failed to load model record {}: {e:?}", path.display()),
        })
}

fn create_dir(dir: &Path) -> ALResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| ActiveLearningError::Checkpoint {
        reason: format!("Failed to create checkpoint directory {}: {e}", dir.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_checkpoint_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = RoundCheckpointer::new(dir.path(), CheckpointConfig::default());

        let mut pool = Pool::initialize(30, 5, 1).unwrap();
        let next = *pool.unlabeled().iter().next().unwrap();
        pool.label(&[next]).unwrap();

        let path = checkpointer.save_pool(&pool, 2, 1).unwrap().unwrap();
        assert!(path.ends_with("pool_trial2_round1.json"));

        let (meta, restored) = PoolCheckpoint::load(&path).unwrap();
        assert_eq!((meta.trial, meta.round), (2, 1));
        assert_eq!(restored, pool);
    }

    #[test]
    fn test_disabled_checkpointer_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = CheckpointConfig {
            enabled: false,
            save_pool: true,
        };
        let checkpointer = RoundCheckpointer::new(dir.path(), config);
        let pool = Pool::initialize(4, 1, 0).unwrap();
        assert!(checkpointer.save_pool(&pool, 0, 0).unwrap().is_none());
        assert!(!checkpointer.dir().exists());
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        PoolCheckpoint {
            version: CHECKPOINT_VERSION + 1,
            trial: 0,
            round: 0,
            timestamp: String::new(),
            pool: Pool::initialize(3, 1, 0).unwrap().snapshot(),
        }
        .save(&path)
        .unwrap();
        assert!(matches!(
            PoolCheckpoint::load(&path),
            Err(ActiveLearningError::Checkpoint { .. })
        ));
    }
}
