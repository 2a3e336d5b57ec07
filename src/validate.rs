//! Structural validation of a parsed program.
//!
//! Checks run in a fixed class order and stop at the first class that
//! has violations, but every violation within that class is reported,
//! so one failing run yields a complete fix list for that class.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::program::{AssetMap, Program};

/// Whether a `next` reference may close a loop.
///
/// A repeating timer (last step pointing back to the first) is a
/// legitimate authoring pattern, so cycles are allowed by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePolicy {
    #[default]
    Allow,
    Forbid,
}

/// One structural rule violation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("duplicate step id '{id}'")]
    DuplicateStepId { id: String },
    #[error("step '{step}' references unknown next step '{next}'")]
    UnknownNextStep { step: String, next: String },
    #[error("step '{step}' references unknown asset '{reference}'")]
    UnknownAsset { step: String, reference: String },
    #[error("step '{step}' has negative duration {duration}")]
    NegativeDuration { step: String, duration: i64 },
    #[error("step '{step}' is part of a next-reference cycle")]
    NextCycle { step: String },
}

/// All violations found in the first failing class.
#[derive(Debug)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Check `program` (and its resolved assets) against the structural
/// invariants. Returns `Ok(())` when the program is valid.
pub fn validate(
    program: &Program,
    assets: &AssetMap,
    cycle_policy: CyclePolicy,
) -> Result<(), ValidationError> {
    let classes: [fn(&Program, &AssetMap) -> Vec<Violation>; 4] = [
        check_duplicate_ids,
        check_next_references,
        check_asset_references,
        check_durations,
    ];

    for check in classes {
        let violations = check(program, assets);
        if !violations.is_empty() {
            return Err(ValidationError { violations });
        }
    }

    if cycle_policy == CyclePolicy::Forbid {
        let violations = check_cycles(program);
        if !violations.is_empty() {
            return Err(ValidationError { violations });
        }
    }

    Ok(())
}

fn check_duplicate_ids(program: &Program, _assets: &AssetMap) -> Vec<Violation> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for step in &program.steps {
        *counts.entry(step.id.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| Violation::DuplicateStepId { id: id.to_string() })
        .collect()
}

fn check_next_references(program: &Program, _assets: &AssetMap) -> Vec<Violation> {
    let mut violations = Vec::new();
    for step in &program.steps {
        if let Some(next) = &step.next {
            if program.step_index(next).is_none() {
                violations.push(Violation::UnknownNextStep {
                    step: step.id.clone(),
                    next: next.clone(),
                });
            }
        }
    }
    violations
}

fn check_asset_references(program: &Program, assets: &AssetMap) -> Vec<Violation> {
    let mut violations = Vec::new();
    for step in &program.steps {
        for reference in &step.assets {
            if !assets.contains_key(reference) {
                violations.push(Violation::UnknownAsset {
                    step: step.id.clone(),
                    reference: reference.clone(),
                });
            }
        }
    }
    violations
}

fn check_durations(program: &Program, _assets: &AssetMap) -> Vec<Violation> {
    program
        .steps
        .iter()
        .filter(|step| step.duration < 0)
        .map(|step| Violation::NegativeDuration {
            step: step.id.clone(),
            duration: step.duration,
        })
        .collect()
}

/// Cycle detection over the successor graph.
///
/// Each step has at most one successor (explicit `next`, or the
/// following step in order), so the graph is functional and a
/// three-color walk over indices is enough. Only runs once next
/// references are known to resolve.
fn check_cycles(program: &Program) -> Vec<Violation> {
    const UNSEEN: u8 = 0;
    const IN_PROGRESS: u8 = 1;
    const DONE: u8 = 2;

    let successors: Vec<Option<usize>> = program
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| match &step.next {
            Some(next) => program.step_index(next),
            None if index + 1 < program.steps.len() => Some(index + 1),
            None => None,
        })
        .collect();

    let mut colors = vec![UNSEEN; program.steps.len()];
    let mut violations = Vec::new();

    for start in 0..program.steps.len() {
        if colors[start] != UNSEEN {
            continue;
        }

        let mut trail: Vec<usize> = Vec::new();
        let mut current = Some(start);
        while let Some(index) = current {
            match colors[index] {
                DONE => break,
                IN_PROGRESS => {
                    // Walked back into this pass's own trail: the tail
                    // of the trail from `index` onward is the cycle.
                    let entry = trail.iter().position(|&i| i == index).unwrap_or(0);
                    for &i in &trail[entry..] {
                        violations.push(Violation::NextCycle {
                            step: program.steps[i].id.clone(),
                        });
                    }
                    break;
                }
                _ => {
                    colors[index] = IN_PROGRESS;
                    trail.push(index);
                    current = successors[index];
                }
            }
        }

        for index in trail {
            colors[index] = DONE;
        }
    }

    violations
}
