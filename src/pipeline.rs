use anyhow::{Context, Result};
use carbon_anomaly::PipelineConfig;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

type StepFn = Box<dyn Fn(&PipelineConfig) -> Result<()>>;

struct Step {
    name: &'static str,
    run: StepFn,
}

/// Runs steps in order and stops at the first failure.
#[derive(Default)]
pub struct PipelineRunner {
    steps: Vec<Step>,
}

impl PipelineRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step<F>(mut self, name: &'static str, run: F) -> Self
    where
        F: Fn(&PipelineConfig) -> Result<()> + 'static,
    {
        self.steps.push(Step {
            name,
            run: Box::new(run),
        });
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name).collect()
    }

    pub fn run(&self, config: &PipelineConfig) -> Result<()> {
        let pb = ProgressBar::new(self.steps.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?,
        );

        for step in &self.steps {
            pb.set_message(step.name);
            pb.println(format!("\n=== Running: {} ===", step.name));
            let start = Instant::now();

            if let Err(e) = (step.run)(config) {
                pb.abandon_with_message(format!("{} failed", step.name));
                log::error!("Step '{}' failed: {:#}", step.name, e);
                return Err(e).with_context(|| format!("pipeline step '{}' failed", step.name));
            }

            pb.println(format!("✅ {} completed in {:?}", step.name, start.elapsed()));
            pb.inc(1);
        }

        pb.finish_with_message("All pipeline steps completed");
        Ok(())
    }
}
