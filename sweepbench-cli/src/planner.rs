//! Sweep Planner
//!
//! Expands the grid axes into the ordered list of trials. Offload-layer
//! counts form the outer loop and thread counts the inner loop, so the plan
//! for `[0, 10] x [4, 8]` is `(0,4) (0,8) (10,4) (10,8)`.

use crate::config::SweepFile;
use sweepbench_core::TrialConfig;

/// Execution plan for a sweep
pub struct SweepPlan {
    /// Trials in execution order
    pub trials: Vec<TrialConfig>,
}

impl SweepPlan {
    /// Number of trials
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// True when either axis is empty
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

/// Build the plan described by a configuration file
pub fn build_plan(config: &SweepFile) -> SweepPlan {
    let grid = &config.grid;
    let template = TrialConfig::new(
        &config.target.cli_path,
        &config.target.model_path,
        0,
        0,
        grid.ctx_size,
    )
    .with_n_predict(grid.n_predict)
    .with_batch_size(grid.batch_size)
    .with_temperature(grid.temperature)
    .with_prompt(grid.prompt.clone());

    SweepPlan {
        trials: expand_grid(&template, &grid.gpu_layers, &grid.threads),
    }
}

/// Cross product of the two axes applied to `template`
pub fn expand_grid(template: &TrialConfig, gpu_layers: &[u32], threads: &[u32]) -> Vec<TrialConfig> {
    gpu_layers
        .iter()
        .flat_map(|&ngl| {
            threads.iter().map(move |&t| TrialConfig {
                n_gpu_layers: ngl,
                threads: t,
                ..template.clone()
            })
        })
        .collect()
}
