//! Block and run averaging.
//!
//! Per-step samples are accumulated into block means; block means are
//! accumulated into run averages with a standard-error estimate. The set and
//! order of observables is fixed by [`AveragingEngine::run_begin`] and every
//! later call is checked against it.

use tracing::info;

use crate::error::{McError, Result};

/// How the samples of one observable are reduced at the end of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AveragingMethod {
    /// Plain mean of the samples.
    Average,
    /// Mean-squared deviation `<x^2> - <x>^2` of the samples within the block.
    Fluctuation,
}

/// A named scalar sample tagged with its averaging treatment.
#[derive(Debug, Clone, PartialEq)]
pub struct Observable {
    pub name: &'static str,
    pub value: f64,
    pub method: AveragingMethod,
    /// Printed in labelled snapshot reports.
    pub instant: bool,
    /// Constant added to every block value.
    pub offset: f64,
}

impl Observable {
    pub fn average(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value,
            method: AveragingMethod::Average,
            instant: true,
            offset: 0.0,
        }
    }

    pub fn fluctuation(name: &'static str, value: f64) -> Self {
        Self {
            method: AveragingMethod::Fluctuation,
            ..Self::average(name, value)
        }
    }

    /// Mark the observable as meaningless outside the sampling loop.
    pub fn not_instant(mut self) -> Self {
        self.instant = false;
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }
}

/// Log the instantaneous observables under a label such as "Initial values".
pub fn report_snapshot(label: &str, observables: &[Observable]) {
    info!("{label}");
    for obs in observables.iter().filter(|o| o.instant) {
        info!("  {:<15} {:>12.6}", obs.name, obs.value);
    }
}

#[derive(Debug, Clone, Default)]
struct BlockAccumulator {
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
    samples: usize,
}

impl BlockAccumulator {
    fn new(width: usize) -> Self {
        Self {
            sum: vec![0.0; width],
            sum_sq: vec![0.0; width],
            samples: 0,
        }
    }

    fn add(&mut self, observables: &[Observable]) {
        for (i, obs) in observables.iter().enumerate() {
            self.sum[i] += obs.value;
            self.sum_sq[i] += obs.value * obs.value;
        }
        self.samples += 1;
    }
}

#[derive(Debug, Clone, Default)]
struct RunAccumulator {
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
    blocks: usize,
}

impl RunAccumulator {
    fn new(width: usize) -> Self {
        Self {
            sum: vec![0.0; width],
            sum_sq: vec![0.0; width],
            blocks: 0,
        }
    }
}

/// Per-observable layout fixed for the lifetime of a run.
#[derive(Debug, Clone)]
struct Column {
    name: &'static str,
    method: AveragingMethod,
    offset: f64,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Run {
        block: Option<BlockAccumulator>,
        run: RunAccumulator,
    },
}

/// Block values reported at the end of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSummary {
    pub block: usize,
    pub names: Vec<&'static str>,
    pub values: Vec<f64>,
}

impl BlockSummary {
    pub fn value(&self, name: &str) -> Option<f64> {
        lookup(&self.names, &self.values, name)
    }
}

/// Run averages and standard errors over all blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub blocks: usize,
    pub names: Vec<&'static str>,
    pub averages: Vec<f64>,
    pub errors: Vec<f64>,
}

impl RunSummary {
    pub fn average(&self, name: &str) -> Option<f64> {
        lookup(&self.names, &self.averages, name)
    }

    pub fn error(&self, name: &str) -> Option<f64> {
        lookup(&self.names, &self.errors, name)
    }
}

fn lookup(names: &[&'static str], values: &[f64], name: &str) -> Option<f64> {
    names.iter().position(|n| *n == name).map(|i| values[i])
}

/// Two-level averaging state machine: `Idle -> Run(BlockIdle | BlockActive) -> Idle`.
#[derive(Debug)]
pub struct AveragingEngine {
    columns: Vec<Column>,
    phase: Phase,
}

impl Default for AveragingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AveragingEngine {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            phase: Phase::Idle,
        }
    }

    pub fn is_run_active(&self) -> bool {
        matches!(self.phase, Phase::Run { .. })
    }

    pub fn is_block_active(&self) -> bool {
        matches!(self.phase, Phase::Run { block: Some(_), .. })
    }

    /// Fix the observable layout for this run and log the column headers.
    pub fn run_begin(&mut self, observables: &[Observable]) -> Result<()> {
        if self.is_run_active() {
            return Err(McError::AveragingState("run_begin called during an active run"));
        }
        if observables.is_empty() {
            return Err(McError::AveragingState("run_begin needs at least one observable"));
        }

        self.columns = observables
            .iter()
            .map(|o| Column {
                name: o.name,
                method: o.method,
                offset: o.offset,
            })
            .collect();
        self.phase = Phase::Run {
            block: None,
            run: RunAccumulator::new(self.columns.len()),
        };

        let header: String = self
            .columns
            .iter()
            .map(|c| format!("{:>15}", c.name))
            .collect();
        info!("{:>8}{}", "Block", header);
        Ok(())
    }

    /// Zero the block accumulators.
    pub fn block_begin(&mut self) -> Result<()> {
        let width = self.columns.len();
        match &mut self.phase {
            Phase::Idle => Err(McError::AveragingState("block_begin called outside a run")),
            Phase::Run { block: Some(_), .. } => {
                Err(McError::AveragingState("block_begin called inside an open block"))
            }
            Phase::Run { block, .. } => {
                *block = Some(BlockAccumulator::new(width));
                Ok(())
            }
        }
    }

    /// Add one step's observables. The names must match the run layout exactly.
    pub fn block_add(&mut self, observables: &[Observable]) -> Result<()> {
        let matches = observables.len() == self.columns.len()
            && observables
                .iter()
                .zip(&self.columns)
                .all(|(o, c)| o.name == c.name);

        match &mut self.phase {
            Phase::Run {
                block: Some(block), ..
            } => {
                if !matches {
                    return Err(McError::ObservableMismatch {
                        expected: self.columns.iter().map(|c| c.name.to_string()).collect(),
                        found: observables.iter().map(|o| o.name.to_string()).collect(),
                    });
                }
                block.add(observables);
                Ok(())
            }
            _ => Err(McError::AveragingState("block_add called outside an open block")),
        }
    }

    /// Reduce the block, feed its values into the run accumulator and log them.
    pub fn block_end(&mut self, block_index: usize) -> Result<BlockSummary> {
        let (block, run) = match &mut self.phase {
            Phase::Run { block, run } => match block.take() {
                Some(b) => (b, run),
                None => {
                    return Err(McError::AveragingState("block_end called without an open block"))
                }
            },
            Phase::Idle => return Err(McError::AveragingState("block_end called outside a run")),
        };
        if block.samples == 0 {
            return Err(McError::EmptyBlock { block: block_index });
        }

        let norm = block.samples as f64;
        let values: Vec<f64> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let mean = block.sum[i] / norm;
                let value = match column.method {
                    AveragingMethod::Average => mean,
                    AveragingMethod::Fluctuation => (block.sum_sq[i] / norm - mean * mean).max(0.0),
                };
                value + column.offset
            })
            .collect();

        for (i, value) in values.iter().enumerate() {
            run.sum[i] += value;
            run.sum_sq[i] += value * value;
        }
        run.blocks += 1;

        let row: String = values.iter().map(|v| format!("{v:>15.6}")).collect();
        info!("{block_index:>8}{row}");

        Ok(BlockSummary {
            block: block_index,
            names: self.columns.iter().map(|c| c.name).collect(),
            values,
        })
    }

    /// Reduce the run accumulators, log averages and errors, and return to idle.
    pub fn run_end(&mut self) -> Result<RunSummary> {
        let run = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Run { block: None, run } => run,
            Phase::Run { block: Some(b), run } => {
                self.phase = Phase::Run { block: Some(b), run };
                return Err(McError::AveragingState("run_end called inside an open block"));
            }
            Phase::Idle => return Err(McError::AveragingState("run_end called outside a run")),
        };
        if run.blocks == 0 {
            return Err(McError::AveragingState("run_end called before any block completed"));
        }

        let norm = run.blocks as f64;
        let averages: Vec<f64> = run.sum.iter().map(|s| s / norm).collect();
        let errors: Vec<f64> = run
            .sum_sq
            .iter()
            .zip(&averages)
            .map(|(sq, avg)| {
                let variance = sq / norm - avg * avg;
                if variance > 0.0 {
                    (variance / norm).sqrt()
                } else {
                    0.0
                }
            })
            .collect();

        let rule = "-".repeat(8 + 15 * averages.len());
        info!("{rule}");
        let row: String = averages.iter().map(|v| format!("{v:>15.6}")).collect();
        info!("{:>8}{row}", "Run avg");
        let row: String = errors.iter().map(|v| format!("{v:>15.6}")).collect();
        info!("{:>8}{row}", "Run err");
        info!("{rule}");

        Ok(RunSummary {
            blocks: run.blocks,
            names: self.columns.iter().map(|c| c.name).collect(),
            averages,
            errors,
        })
    }
}
