use super::registry::StepOutcome;
use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// One entry of the results file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRecord {
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub results: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepRecord {
    pub fn succeeded(name: &str, outcome: StepOutcome) -> Self {
        StepRecord {
            name: name.to_string(),
            status: outcome.status.unwrap_or_else(|| "Done".to_string()),
            iterations: outcome.iterations,
            results: outcome.results,
            error: None,
        }
    }

    pub fn failed(name: &str, error: String) -> Self {
        StepRecord {
            name: name.to_string(),
            status: "Failed".to_string(),
            iterations: None,
            results: BTreeMap::new(),
            error: Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultsReport {
    pub steps: Vec<StepRecord>,
}

impl ResultsReport {
    pub fn push(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| s.is_failure()).count()
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_yml::to_string(self).wrap_err("Failed to serialize results")?;
        fs::write(path, text)
            .wrap_err_with(|| format!("Unable to write results file: {}", path.display()))?;
        info!("Results written to {}", path.display());
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .wrap_err_with(|| format!("Unable to read results file: {}", path.display()))?;
        serde_yml::from_str(&text).wrap_err("Failed to parse results file")
    }
}
