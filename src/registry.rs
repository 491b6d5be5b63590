//! Program registry: the baseline and variants of one benchmark run.
//!
//! Resolves the raw configuration once (inherited markers, thread variable,
//! launcher, sweep points) so the suite runner and the CLI work with ready
//! [`ProgramSpec`]s and [`Sweep`]s.

use crate::config::BenchConfig;
use crate::error::{HarnessError, Result};
use crate::measure::{ProgramSpec, Sweep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Baseline,
    Variant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Baseline => "baseline",
            Role::Variant => "variant",
        }
    }
}

/// A configured program, ready to run.
#[derive(Debug, Clone)]
pub struct RegisteredProgram {
    pub role: Role,
    pub spec: ProgramSpec,
    pub sweep: Sweep,
}

impl RegisteredProgram {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Total number of process launches this program costs.
    pub fn launches(&self) -> usize {
        self.sweep.points.len() * self.sweep.trials
    }
}

pub struct ProgramRegistry {
    baseline: RegisteredProgram,
    variants: Vec<RegisteredProgram>,
}

impl ProgramRegistry {
    /// Validate `config` and resolve every program in it.
    pub fn from_config(config: &BenchConfig) -> Result<Self> {
        config.validate()?;

        let baseline = RegisteredProgram {
            role: Role::Baseline,
            spec: config.spec_for(&config.baseline),
            sweep: Sweep::baseline(config.trials_for(&config.baseline)),
        };
        let variants = config
            .variants
            .iter()
            .map(|program| RegisteredProgram {
                role: Role::Variant,
                spec: config.spec_for(program),
                sweep: config.sweep_for(program),
            })
            .collect();

        Ok(Self { baseline, variants })
    }

    pub fn baseline(&self) -> &RegisteredProgram {
        &self.baseline
    }

    pub fn variants(&self) -> &[RegisteredProgram] {
        &self.variants
    }

    /// Baseline first, then variants in configuration order.
    pub fn all(&self) -> impl Iterator<Item = &RegisteredProgram> {
        std::iter::once(&self.baseline).chain(&self.variants)
    }

    /// Find a program by name
    pub fn find(&self, name: &str) -> Option<&RegisteredProgram> {
        self.all().find(|p| p.name() == name)
    }

    pub fn list_names(&self) -> Vec<&str> {
        self.all().map(|p| p.name()).collect()
    }

    /// Keep only the named variants. The baseline always stays.
    pub fn retain_variants(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        for name in names {
            if !self.variants.iter().any(|v| v.name() == name) {
                return Err(HarnessError::config(format!(
                    "unknown variant '{name}', available: {:?}",
                    self.variants.iter().map(|v| v.name()).collect::<Vec<_>>()
                )));
            }
        }
        self.variants.retain(|v| names.iter().any(|n| n == v.name()));
        Ok(())
    }

    /// Override the trial count of every program.
    pub fn set_trials(&mut self, trials: usize) {
        self.baseline.sweep.trials = trials;
        for variant in &mut self.variants {
            variant.sweep.trials = trials;
        }
    }

    pub fn total_launches(&self) -> usize {
        self.all().map(|p| p.launches()).sum()
    }
}
