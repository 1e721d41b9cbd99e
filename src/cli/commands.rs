// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `validation-test`
// and `test-batch`, and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    evaluate_use_case::{EvalConfig, EvalTask},
    train_use_case::TrainConfig,
};
use crate::domain::traits::ReconstructionThresholds;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the heatmap model on the "train" split
    Train(TrainArgs),

    /// Evaluate a checkpoint on the "val" split and report the loss
    ValidationTest(EvalArgs),

    /// Run a checkpoint on the "test" split and write reconstruction inputs
    TestBatch(EvalArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Root directory holding train/ val/ test/ splits
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Directory for checkpoints, train_config.json and loss_log.csv
    #[arg(long, default_value = "checkpoint")]
    pub checkpoint_dir: String,

    /// Directory for visualization snapshots
    #[arg(long, default_value = "visualization")]
    pub visualization_dir: String,

    #[arg(long, default_value_t = 1000)]
    pub epochs: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 2.5e-4)]
    pub lr: f64,

    /// Data-loading worker threads
    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,

    /// Batches the loaders may hold ready ahead of the training step
    #[arg(long, default_value_t = 8)]
    pub queue_capacity: usize,

    /// Shuffle seed; epoch e uses seed + e
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Save a numbered checkpoint every N epochs
    #[arg(long, default_value_t = 100)]
    pub checkpoint_period: usize,

    /// Emit a visualization every N steps (0 disables)
    #[arg(long, default_value_t = 500)]
    pub visualize_every: usize,

    #[arg(long, default_value_t = 256)]
    pub image_height: usize,

    #[arg(long, default_value_t = 256)]
    pub image_width: usize,

    /// Wall-corner slots; the corner head has this many + 12 channels
    #[arg(long, default_value_t = 13)]
    pub wall_corners: usize,

    #[arg(long, default_value_t = 15)]
    pub icon_classes: usize,

    #[arg(long, default_value_t = 12)]
    pub room_classes: usize,

    /// Width of the baseline network's conv trunk
    #[arg(long, default_value_t = 32)]
    pub hidden: usize,

    /// Number of 3x3 conv layers in the trunk
    #[arg(long, default_value_t = 3)]
    pub depth: usize,

    /// Continue from a saved checkpoint
    #[arg(long)]
    pub restore: bool,

    /// Checkpoint to continue from: "best" or an epoch number
    #[arg(long, default_value = "best")]
    pub restore_tag: String,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:          a.data_dir,
            checkpoint_dir:    a.checkpoint_dir,
            visualization_dir: a.visualization_dir,
            epochs:            a.epochs,
            batch_size:        a.batch_size,
            lr:                a.lr,
            num_workers:       a.num_workers,
            queue_capacity:    a.queue_capacity,
            seed:              a.seed,
            checkpoint_period: a.checkpoint_period,
            visualize_every:   a.visualize_every,
            image_height:      a.image_height,
            image_width:       a.image_width,
            wall_corners:      a.wall_corners,
            icon_classes:      a.icon_classes,
            room_classes:      a.room_classes,
            hidden:            a.hidden,
            depth:             a.depth,
            resume:            a.restore,
            resume_tag:        a.restore_tag,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Directory where training saved its checkpoints
    #[arg(long, default_value = "checkpoint")]
    pub checkpoint_dir: String,

    /// Checkpoint to evaluate: "best" or an epoch number
    #[arg(long, default_value = "best")]
    pub checkpoint_tag: String,

    /// Output directory for reconstruction inputs
    #[arg(long, default_value = "test")]
    pub test_dir: String,

    #[arg(long, default_value = "visualization")]
    pub visualization_dir: String,

    /// Use precomputed room heatmaps <dir>/<stem>.npy instead of the model's
    #[arg(long)]
    pub rooms_dir: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    #[arg(long, default_value_t = 4)]
    pub queue_capacity: usize,

    /// Emit a visualization every N batches (0 disables)
    #[arg(long, default_value_t = 500)]
    pub visualize_every: usize,

    /// Wall heatmap threshold passed to reconstruction
    #[arg(long)]
    pub wall_threshold: Option<f32>,

    /// Door heatmap threshold passed to reconstruction
    #[arg(long)]
    pub door_threshold: Option<f32>,

    /// Icon heatmap threshold passed to reconstruction
    #[arg(long)]
    pub icon_threshold: Option<f32>,

    /// Negative values leave the reconstruction default in place
    #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
    pub gap: f32,

    #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
    pub distance_threshold: f32,

    #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
    pub length_threshold: f32,

    /// Turn off the reconstruction stage's augmentation search
    #[arg(long)]
    pub no_augmentation: bool,
}

impl EvalArgs {
    pub fn into_config(self, task: EvalTask) -> EvalConfig {
        EvalConfig {
            task,
            data_dir:          self.data_dir,
            checkpoint_dir:    self.checkpoint_dir,
            checkpoint_tag:    self.checkpoint_tag,
            test_dir:          self.test_dir,
            visualization_dir: self.visualization_dir,
            rooms_dir:         self.rooms_dir,
            batch_size:        self.batch_size,
            num_workers:       self.num_workers,
            queue_capacity:    self.queue_capacity,
            visualize_every:   self.visualize_every,
            thresholds:        ReconstructionThresholds {
                wall_heatmap:        self.wall_threshold,
                door_heatmap:        self.door_threshold,
                icon_heatmap:        self.icon_threshold,
                gap:                 self.gap,
                distance:            self.distance_threshold,
                length:              self.length_threshold,
                enable_augmentation: !self.no_augmentation,
            },
        }
    }
}
