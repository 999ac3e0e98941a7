//! Client onboarding pipeline.
//!
//! The pipeline is a fixed, ordered catalog of named steps
//! (discovery -> survey -> analysis -> proposal generation -> workflow
//! generation) walked one step at a time per client. Progress rows are
//! created lazily: a step with no row is implicitly pending.
//!
//! The catalog is global configuration, not a table. It ships with a
//! compiled-in default and can be overridden by a YAML file (see
//! `config/pipeline_steps.yaml`).
//!
//! Advancement is an at-least-once, unsynchronized mutation: there is no
//! concurrency guard against two simultaneous advance calls for the same
//! client. The expected call pattern is a single admin clicking through
//! steps sequentially.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "database")]
pub mod service;

/// Status of one pipeline step for one client and group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    /// Parse the database representation. Unknown strings map to pending
    /// rather than failing the whole status view.
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "in-progress" => Self::InProgress,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in the step catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDef {
    pub step_order: i32,
    pub step_name: String,
}

/// Errors loading a step catalog from configuration.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("invalid step catalog YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("step catalog is empty")]
    Empty,

    #[error("duplicate step_order {0} in catalog")]
    DuplicateOrder(i32),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    steps: Vec<StepDef>,
}

/// The fixed, ordered catalog of onboarding steps. Global, not per-client.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Vec<StepDef>,
}

impl Default for StepCatalog {
    fn default() -> Self {
        let steps = [
            (10, "discovery"),
            (20, "survey"),
            (30, "analysis"),
            (40, "proposal_generation"),
            (50, "workflow_generation"),
        ]
        .into_iter()
        .map(|(step_order, name)| StepDef {
            step_order,
            step_name: name.to_string(),
        })
        .collect();
        Self { steps }
    }
}

impl StepCatalog {
    /// Build a catalog from explicit steps, sorting by `step_order`.
    pub fn new(mut steps: Vec<StepDef>) -> Result<Self, CatalogError> {
        if steps.is_empty() {
            return Err(CatalogError::Empty);
        }
        steps.sort_by_key(|s| s.step_order);
        for pair in steps.windows(2) {
            if pair[0].step_order == pair[1].step_order {
                return Err(CatalogError::DuplicateOrder(pair[0].step_order));
            }
        }
        Ok(Self { steps })
    }

    /// Load a catalog from YAML (`steps: [{step_order, step_name}, ..]`).
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.steps)
    }

    pub fn steps(&self) -> &[StepDef] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Locate the lowest-order step whose progress entry (if any) is not
    /// completed. Returns `None` when every catalog step is completed.
    pub fn next_actionable(&self, progress: &[ProgressEntry]) -> Option<AdvanceTarget> {
        for step in &self.steps {
            let entry = progress.iter().find(|p| p.step_order == step.step_order);
            match entry {
                Some(e) if e.status == StepStatus::Completed => continue,
                Some(_) => {
                    return Some(AdvanceTarget {
                        step_order: step.step_order,
                        step_name: step.step_name.clone(),
                        has_row: true,
                    })
                }
                None => {
                    return Some(AdvanceTarget {
                        step_order: step.step_order,
                        step_name: step.step_name.clone(),
                        has_row: false,
                    })
                }
            }
        }
        None
    }

    /// Overlay progress entries onto the catalog, treating missing rows as
    /// pending. Output is in catalog order.
    pub fn overlay(&self, progress: &[ProgressEntry]) -> Vec<StepView> {
        self.steps
            .iter()
            .map(|step| {
                let status = progress
                    .iter()
                    .find(|p| p.step_order == step.step_order)
                    .map(|p| p.status)
                    .unwrap_or(StepStatus::Pending);
                StepView {
                    step_order: step.step_order,
                    step_name: step.step_name.clone(),
                    status,
                }
            })
            .collect()
    }

    /// Percentage of catalog steps completed, 0-100.
    pub fn percent_complete(&self, progress: &[ProgressEntry]) -> i32 {
        if self.steps.is_empty() {
            return 0;
        }
        let done = self
            .overlay(progress)
            .iter()
            .filter(|v| v.status == StepStatus::Completed)
            .count();
        (done * 100 / self.steps.len()) as i32
    }
}

/// Minimal progress view consumed by the pure advancement logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEntry {
    pub step_order: i32,
    pub status: StepStatus,
}

/// The step an advance call should act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvanceTarget {
    pub step_order: i32,
    pub step_name: String,
    /// Whether a progress row already exists (update) or not (insert).
    pub has_row: bool,
}

/// One catalog step joined with its effective status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub step_order: i32,
    pub step_name: String,
    pub status: StepStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(step_order: i32, status: StepStatus) -> ProgressEntry {
        ProgressEntry { step_order, status }
    }

    #[test]
    fn default_catalog_is_ordered() {
        let catalog = StepCatalog::default();
        assert_eq!(catalog.len(), 5);
        let orders: Vec<i32> = catalog.steps().iter().map(|s| s.step_order).collect();
        let mut sorted = orders.clone();
        sorted.sort();
        assert_eq!(orders, sorted);
        assert_eq!(catalog.steps()[0].step_name, "discovery");
        assert_eq!(catalog.steps()[4].step_name, "workflow_generation");
    }

    #[test]
    fn fresh_run_targets_first_step() {
        let catalog = StepCatalog::default();
        let target = catalog.next_actionable(&[]).unwrap();
        assert_eq!(target.step_order, 10);
        assert_eq!(target.step_name, "discovery");
        assert!(!target.has_row);
    }

    #[test]
    fn completed_steps_are_skipped_in_order() {
        let catalog = StepCatalog::default();
        let progress = vec![
            entry(10, StepStatus::Completed),
            entry(20, StepStatus::Completed),
        ];
        let target = catalog.next_actionable(&progress).unwrap();
        assert_eq!(target.step_order, 30);
        assert!(!target.has_row);
    }

    #[test]
    fn in_progress_step_is_the_target_and_has_a_row() {
        let catalog = StepCatalog::default();
        let progress = vec![
            entry(10, StepStatus::Completed),
            entry(20, StepStatus::InProgress),
        ];
        let target = catalog.next_actionable(&progress).unwrap();
        assert_eq!(target.step_order, 20);
        assert!(target.has_row);
    }

    #[test]
    fn gap_before_later_rows_still_targets_lowest_order() {
        // A later step was somehow completed first; the lowest
        // non-completed step still wins.
        let catalog = StepCatalog::default();
        let progress = vec![entry(30, StepStatus::Completed)];
        let target = catalog.next_actionable(&progress).unwrap();
        assert_eq!(target.step_order, 10);
    }

    #[test]
    fn fully_completed_run_has_no_target() {
        let catalog = StepCatalog::default();
        let progress: Vec<ProgressEntry> = catalog
            .steps()
            .iter()
            .map(|s| entry(s.step_order, StepStatus::Completed))
            .collect();
        assert!(catalog.next_actionable(&progress).is_none());
    }

    #[test]
    fn overlay_fills_missing_rows_as_pending() {
        let catalog = StepCatalog::default();
        let progress = vec![entry(10, StepStatus::Completed)];
        let view = catalog.overlay(&progress);
        assert_eq!(view.len(), 5);
        assert_eq!(view[0].status, StepStatus::Completed);
        assert!(view[1..].iter().all(|v| v.status == StepStatus::Pending));
    }

    #[test]
    fn percent_complete_rounds_down() {
        let catalog = StepCatalog::default();
        assert_eq!(catalog.percent_complete(&[]), 0);
        let progress = vec![entry(10, StepStatus::Completed)];
        assert_eq!(catalog.percent_complete(&progress), 20);
        let progress = vec![
            entry(10, StepStatus::Completed),
            entry(20, StepStatus::InProgress),
        ];
        assert_eq!(catalog.percent_complete(&progress), 20);
    }

    #[test]
    fn yaml_catalog_parses_and_sorts() {
        let yaml = r#"
steps:
  - step_order: 20
    step_name: survey
  - step_order: 10
    step_name: discovery
"#;
        let catalog = StepCatalog::from_yaml(yaml).unwrap();
        assert_eq!(catalog.steps()[0].step_name, "discovery");
        assert_eq!(catalog.steps()[1].step_name, "survey");
    }

    #[test]
    fn yaml_catalog_rejects_duplicates_and_empty() {
        let dup = r#"
steps:
  - step_order: 10
    step_name: a
  - step_order: 10
    step_name: b
"#;
        assert!(matches!(
            StepCatalog::from_yaml(dup),
            Err(CatalogError::DuplicateOrder(10))
        ));
        assert!(matches!(
            StepCatalog::from_yaml("steps: []"),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn status_round_trips_database_text() {
        for status in [
            StepStatus::Pending,
            StepStatus::InProgress,
            StepStatus::Completed,
        ] {
            assert_eq!(StepStatus::parse_lossy(status.as_str()), status);
        }
        assert_eq!(StepStatus::parse_lossy("garbage"), StepStatus::Pending);
    }
}
