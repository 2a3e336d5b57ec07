//! Timer program data model.
//!
//! A [`Program`] is an ordered list of [`Step`]s plus top-level metadata.
//! Both pipelines (script → container and container → script) build one
//! of these in memory and discard it when the command finishes; the
//! container file is the only thing that persists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current container schema version. Programs parsed without an explicit
/// `version` line get this value.
pub const SCHEMA_VERSION: u16 = 1;

/// What the player should do when a step's timer runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepAction {
    /// Wait for the user to advance.
    None,
    /// Ring/notify, then wait for the user.
    Alert,
    /// Advance to the next step without interaction.
    AutoAdvance,
}

impl StepAction {
    /// Keyword used in the script grammar and in `inspect` output.
    pub fn keyword(&self) -> &'static str {
        match self {
            StepAction::None => "none",
            StepAction::Alert => "alert",
            StepAction::AutoAdvance => "auto-advance",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "none" => Some(StepAction::None),
            "alert" => Some(StepAction::Alert),
            "auto-advance" => Some(StepAction::AutoAdvance),
            _ => None,
        }
    }
}

/// One timed unit of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Identifier, unique within the program.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Longer body text shown while the step runs. Empty if absent.
    pub body: String,
    /// Duration in whole seconds. Signed so the parser can stay
    /// permissive; the validator owns the non-negativity rule.
    pub duration: i64,
    /// Explicit successor. `None` means "the following step in order".
    pub next: Option<String>,
    /// Asset references, in declaration order. Each entry is an asset id
    /// (a normalized relative path).
    pub assets: Vec<String>,
    /// Timer-expiry behavior.
    pub action: StepAction,
}

/// An ordered timer program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub title: String,
    pub schema_version: u16,
    /// Fallback duration for steps that omit `duration` in the script.
    /// Resolved at parse time; kept so extraction can re-emit the line.
    pub default_duration: Option<i64>,
    pub steps: Vec<Step>,
}

impl Program {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            schema_version: SCHEMA_VERSION,
            default_duration: None,
            steps: Vec::new(),
        }
    }

    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Index of a step by id. Linear scan; programs are small.
    pub fn step_index(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    pub fn find_step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Distinct asset ids referenced by any step, in first-use order.
    pub fn referenced_assets(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for step in &self.steps {
            for reference in &step.assets {
                if !seen.contains(&reference.as_str()) {
                    seen.push(reference.as_str());
                }
            }
        }
        seen
    }
}

/// A binary resource bundled into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Stable identifier: the normalized relative path from the script.
    pub id: String,
    /// MIME type inferred from the file extension.
    pub content_type: String,
    /// Raw file content.
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Assets keyed by id. A `BTreeMap` so iteration order — and therefore
/// container bytes — are deterministic.
pub type AssetMap = BTreeMap<String, Asset>;

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str) -> Step {
        Step {
            id: id.to_string(),
            title: id.to_string(),
            body: String::new(),
            duration: 60,
            next: None,
            assets: Vec::new(),
            action: StepAction::None,
        }
    }

    #[test]
    fn step_lookup_by_id() {
        let mut program = Program::new("p");
        program.add_step(step("a"));
        program.add_step(step("b"));

        assert_eq!(program.step_index("b"), Some(1));
        assert!(program.find_step("c").is_none());
    }

    #[test]
    fn referenced_assets_dedupes_in_order() {
        let mut program = Program::new("p");
        let mut a = step("a");
        a.assets = vec!["x.wav".to_string(), "y.png".to_string()];
        let mut b = step("b");
        b.assets = vec!["x.wav".to_string()];
        program.add_step(a);
        program.add_step(b);

        assert_eq!(program.referenced_assets(), vec!["x.wav", "y.png"]);
    }

    #[test]
    fn action_keywords_round_trip() {
        for action in [StepAction::None, StepAction::Alert, StepAction::AutoAdvance] {
            assert_eq!(StepAction::from_keyword(action.keyword()), Some(action));
        }
        assert_eq!(StepAction::from_keyword("ring"), None);
    }
}
