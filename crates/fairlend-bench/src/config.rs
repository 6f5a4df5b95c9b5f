use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_STEP_SIZE: f64 = 1.0;
const DEFAULT_INITIAL_THRESHOLD: f64 = 50.0;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root scenario configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    pub run_id: String,
    pub payoff: PayoffConfig,
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub search: SearchConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ScenarioConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: ScenarioConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.payoff.validate()?;
        validate_groups(&self.groups)?;
        self.search.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

/// Payoff per granted applicant: reward for a true positive, cost of a
/// false positive. Denied applicants carry no payoff either way.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct PayoffConfig {
    pub tpr_value: f64,
    pub fpr_value: f64,
}

impl PayoffConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for (label, value) in [
            ("payoff.tpr_value", self.tpr_value),
            ("payoff.fpr_value", self.fpr_value),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "payoff value must be finite".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// One sub-population: Gaussian-shaped score distributions for its
/// actually-good and actually-bad halves.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GroupConfig {
    pub name: String,
    pub positives: DistributionConfig,
    pub negatives: DistributionConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct DistributionConfig {
    pub count: u32,
    pub mean: f64,
    pub std_dev: f64,
}

impl DistributionConfig {
    fn validate(&self, field: &str) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::InvalidField {
                field: format!("{field}.count"),
                message: "count must be greater than zero".to_string(),
            });
        }
        if !self.mean.is_finite() {
            return Err(ValidationError::InvalidField {
                field: format!("{field}.mean"),
                message: "mean must be finite".to_string(),
            });
        }
        if !self.std_dev.is_finite() || self.std_dev <= 0.0 {
            return Err(ValidationError::InvalidField {
                field: format!("{field}.std_dev"),
                message: "standard deviation must be finite and positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Threshold-search configuration block.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    #[serde(default = "default_initial_threshold")]
    pub initial_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            step_size: DEFAULT_STEP_SIZE,
            initial_threshold: DEFAULT_INITIAL_THRESHOLD,
        }
    }
}

impl SearchConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(ValidationError::InvalidField {
                field: "search.step_size".to_string(),
                message: "step size must be finite and positive".to_string(),
            });
        }
        if !self.initial_threshold.is_finite() {
            return Err(ValidationError::InvalidField {
                field: "search.initial_threshold".to_string(),
                message: "initial threshold must be finite".to_string(),
            });
        }
        Ok(())
    }
}

fn default_step_size() -> f64 {
    DEFAULT_STEP_SIZE
}

fn default_initial_threshold() -> f64 {
    DEFAULT_INITIAL_THRESHOLD
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_groups(groups: &[GroupConfig]) -> Result<(), ValidationError> {
    if groups.len() != 2 {
        return Err(ValidationError::InvalidField {
            field: "groups".to_string(),
            message: format!("exactly two groups are required, found {}", groups.len()),
        });
    }

    for (index, group) in groups.iter().enumerate() {
        if group.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: format!("groups[{index}].name"),
                message: "group name must not be empty".to_string(),
            });
        }
        group.positives.validate(&format!("groups[{index}].positives"))?;
        group.negatives.validate(&format!("groups[{index}].negatives"))?;
    }

    if groups[0].name == groups[1].name {
        return Err(ValidationError::InvalidField {
            field: "groups".to_string(),
            message: format!("group name '{}' defined more than once", groups[0].name),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "lending_demo"
payoff:
  tpr_value: 300
  fpr_value: -700
groups:
  - name: "blue"
    positives: { count: 100, mean: 63, std_dev: 10 }
    negatives: { count: 100, mean: 47, std_dev: 10 }
  - name: "orange"
    positives: { count: 100, mean: 57, std_dev: 10 }
    negatives: { count: 100, mean: 33, std_dev: 10 }
outputs:
  jsonl: "bench/out/{run_id}/strategies.jsonl"
  summary_md: "bench/out/{run_id}/summary.md"
  plots_dir: "bench/out/{run_id}/plots"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: ScenarioConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.search.step_size, DEFAULT_STEP_SIZE);
        assert_eq!(cfg.search.initial_threshold, DEFAULT_INITIAL_THRESHOLD);
        assert!(cfg.logging.enable_structured);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.jsonl,
            PathBuf::from("bench/out/lending_demo/strategies.jsonl")
        );
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("lending_demo", "lending demo");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn rejects_single_group() {
        let yaml = BASIC_YAML.replace(
            "  - name: \"orange\"\n    positives: { count: 100, mean: 57, std_dev: 10 }\n    negatives: { count: 100, mean: 33, std_dev: 10 }\n",
            "",
        );
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("one group should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "groups"
        ));
    }

    #[test]
    fn rejects_duplicate_group_names() {
        let yaml = BASIC_YAML.replace("\"orange\"", "\"blue\"");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("duplicate names should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "groups"
        ));
    }

    #[test]
    fn rejects_zero_step_size() {
        let yaml = format!("{BASIC_YAML}search:\n  step_size: 0\n");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("zero step should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "search.step_size"
        ));
    }

    #[test]
    fn rejects_degenerate_distribution() {
        let yaml = BASIC_YAML.replace(
            "positives: { count: 100, mean: 63, std_dev: 10 }",
            "positives: { count: 0, mean: 63, std_dev: 10 }",
        );
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("zero count should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "groups[0].positives.count"
        ));
    }

    #[test]
    fn outputs_resolve_template_multiple_occurrences() {
        let yaml = BASIC_YAML.replace(
            "bench/out/{run_id}/plots",
            "bench/out/{run_id}/{run_id}/plots",
        );
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.plots_dir,
            PathBuf::from("bench/out/lending_demo/lending_demo/plots")
        );
    }
}
