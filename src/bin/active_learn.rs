//! Active learning experiment runner.
//!
//! Usage:
//!   active-learn [OPTIONS]
//!
//! Examples:
//!   # Five trials of classification with the default schedule
//!   active-learn --task classification --num-trial 5
//!
//!   # Short pose run from a config file, overriding the schedule
//!   active-learn --config runs/pose.toml --query-size 100,200,300 --num-epoch 50

use std::path::PathBuf;

use anyhow::Context;
use burn::backend::{Autodiff, NdArray};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use learning_loss_rs::config::{ActiveLearningConfig, DivergencePolicy, StrategyKind, TaskKind};
use learning_loss_rs::experiment::{run_experiment, SyntheticDataConfig};

#[derive(Parser)]
#[command(name = "active-learn")]
#[command(about = "Pool-based active learning with a learned loss-prediction head")]
#[command(version)]
struct Args {
    /// Task family (classification, detection, pose)
    #[arg(short = 't', long)]
    task: Option<String>,

    /// TOML configuration file; flags override its values
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Number of independent trials
    #[arg(long)]
    num_trial: Option<usize>,

    /// Epochs per round
    #[arg(long)]
    num_epoch: Option<usize>,

    /// Training minibatch size
    #[arg(short = 'b', long)]
    batch_size: Option<usize>,

    /// Cumulative labeled sizes, comma separated (e.g. 1000,2000,3000)
    #[arg(long, value_delimiter = ',')]
    query_size: Option<Vec<usize>>,

    /// Learning rate
    #[arg(short = 'l', long)]
    lr: Option<f64>,

    /// SGD momentum
    #[arg(long)]
    momentum: Option<f64>,

    /// Learning-rate decay factor at each milestone
    #[arg(long)]
    gamma: Option<f64>,

    /// Weight decay
    #[arg(long)]
    wdecay: Option<f32>,

    /// Learning-rate milestones, comma separated
    #[arg(long, value_delimiter = ',')]
    milestone: Option<Vec<usize>>,

    /// First epoch of the detached phase
    #[arg(long)]
    epoch_loss: Option<usize>,

    /// Ranking loss margin
    #[arg(long)]
    margin: Option<f32>,

    /// Ranking loss weight
    #[arg(long)]
    weights: Option<f32>,

    /// Score only a random subset of the unlabeled pool
    #[arg(long)]
    subset: Option<usize>,

    /// Use uniform random sampling instead of predicted loss
    #[arg(long)]
    random: bool,

    /// Retry a diverged round this many times before abandoning the trial
    #[arg(long)]
    max_retries: Option<usize>,

    /// Use --seed as the base seed instead of a clock-derived one
    #[arg(long)]
    fix_seed: bool,

    /// Base random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(short = 'o', long)]
    save_path: Option<PathBuf>,

    /// Skip model and pool checkpoints
    #[arg(long)]
    no_checkpoint: bool,

    /// Synthetic training-set size
    #[arg(long)]
    num_train: Option<usize>,

    /// Synthetic test-set size
    #[arg(long)]
    num_test: Option<usize>,

    /// Synthetic input width
    #[arg(long)]
    input_dim: Option<usize>,

    /// Seed of the synthetic data generator
    #[arg(long, default_value = "0")]
    data_seed: u64,
}

impl Args {
    fn apply(&self, config: &mut ActiveLearningConfig) -> anyhow::Result<()> {
        if let Some(task) = &self.task {
            config.task = TaskKind::parse(task)?;
        }
        if let Some(trials) = self.num_trial {
            config.num_trials = trials;
        }
        if let Some(schedule) = &self.query_size {
            config.schedule.clone_from(schedule);
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.fix_seed |= self.fix_seed;
        if let Some(dir) = &self.save_path {
            config.output_dir.clone_from(dir);
        }

        let training = &mut config.training;
        if let Some(epochs) = self.num_epoch {
            training.num_epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            training.batch_size = batch_size;
        }
        if let Some(epoch) = self.epoch_loss {
            training.epoch_loss_cutoff = epoch;
        }
        if let Some(margin) = self.margin {
            training.margin = margin;
        }
        if let Some(weight) = self.weights {
            training.weight = weight;
        }

        let optimizer = &mut config.optimizer;
        if let Some(lr) = self.lr {
            optimizer.lr = lr;
        }
        if let Some(momentum) = self.momentum {
            optimizer.momentum = momentum;
        }
        if let Some(gamma) = self.gamma {
            optimizer.gamma = gamma;
        }
        if let Some(wdecay) = self.wdecay {
            optimizer.weight_decay = wdecay;
        }
        if let Some(milestones) = &self.milestone {
            optimizer.milestones.clone_from(milestones);
        }

        if self.subset.is_some() {
            config.query.subset = self.subset;
        }
        if self.random {
            config.query.strategy = StrategyKind::Random;
        }
        if let Some(max_retries) = self.max_retries {
            config.divergence_policy = DivergencePolicy::RetryRound { max_retries };
        }
        if self.no_checkpoint {
            config.checkpoint.enabled = false;
            config.checkpoint.save_pool = false;
        }
        Ok(())
    }

    fn data(&self, config: &ActiveLearningConfig) -> SyntheticDataConfig {
        let mut data = SyntheticDataConfig {
            seed: self.data_seed,
            ..SyntheticDataConfig::default()
        };
        // The pool must be able to hold the final labeled set.
        let final_size = config.schedule.last().copied().unwrap_or(0);
        data.num_train = self.num_train.unwrap_or_else(|| data.num_train.max(final_size));
        if let Some(num_test) = self.num_test {
            data.num_test = num_test;
        }
        if let Some(input_dim) = self.input_dim {
            data.input_dim = input_dim;
        }
        data
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse()?)
                .add_directive("learning_loss_rs=debug".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => ActiveLearningConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ActiveLearningConfig::default(),
    };
    args.apply(&mut config)?;
    config.validate()?;
    let data = args.data(&config);

    tracing::info!("=== Learning Loss active learning ===");
    for (key, value) in config.summary_lines() {
        tracing::info!("{key}: {value}");
    }
    tracing::info!(
        "Synthetic data: {} train / {} test, input dim {}",
        data.num_train,
        data.num_test,
        data.input_dim
    );

    let device = Default::default();
    let outcome = run_experiment::<Autodiff<NdArray>>(&config, &data, &device)?;

    if let Some(path) = &outcome.result_path {
        tracing::info!("Results written to {}", path.display());
    }
    println!("{}", outcome.summary.summary());
    Ok(())
}
