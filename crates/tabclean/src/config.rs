//! Configuration types for the cleaning pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup. The step order itself is fixed;
//! only the parameters of each step are configurable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default threshold above which a column is dropped for missingness.
pub const DEFAULT_DROP_THRESHOLD: f64 = 0.6;

/// Default number of rows kept per column in categorical value counts.
pub const DEFAULT_TOP_N: usize = 10;

/// Default number of equal-width bins for binned rates.
pub const DEFAULT_BINS: usize = 10;

/// Casing applied to a text column after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CasePolicy {
    /// Lower-case every value
    #[default]
    Lower,
    /// Upper-case every value
    Upper,
    /// Keep the original casing (whitespace is still trimmed)
    Preserve,
}

impl CasePolicy {
    /// Apply the policy to an already trimmed value.
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::Lower => value.to_lowercase(),
            Self::Upper => value.to_uppercase(),
            Self::Preserve => value.to_string(),
        }
    }
}

/// Parameters of the [`crate::cleaner::TabularCleaner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanerConfig {
    /// Columns whose missing fraction is strictly greater than this are
    /// dropped. Must be within 0.0 - 1.0.
    /// Default: 0.6
    pub drop_threshold: f64,

    /// Columns to treat as categorical text; every other column is numeric.
    /// If None, the kinds are inferred once from the loaded dtypes.
    /// Default: None
    pub text_columns: Option<Vec<String>>,

    /// Casing used for text columns without an override.
    /// Default: Lower
    pub default_case: CasePolicy,

    /// Per-column casing overrides (e.g. `Ticket` upper-cased).
    pub case_overrides: BTreeMap<String, CasePolicy>,

    /// Treat values that are empty after trimming as missing.
    /// Default: true
    pub blank_as_missing: bool,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            drop_threshold: DEFAULT_DROP_THRESHOLD,
            text_columns: None,
            default_case: CasePolicy::default(),
            case_overrides: BTreeMap::new(),
            blank_as_missing: true,
        }
    }
}

impl CleanerConfig {
    /// Casing for the given column.
    pub fn case_for(&self, column: &str) -> CasePolicy {
        self.case_overrides
            .get(column)
            .copied()
            .unwrap_or(self.default_case)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.drop_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "drop_threshold".to_string(),
                value: self.drop_threshold,
            });
        }
        Ok(())
    }
}

/// Parameters of the exploratory analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaConfig {
    /// Rows kept per categorical column in value counts.
    pub top_n: usize,

    /// Number of equal-width bins for the binned rate table.
    pub bins: usize,

    /// Column whose groups are compared (matched case-insensitively).
    pub group_column: String,

    /// 0/1 outcome column whose mean is reported per group and per bin.
    pub rate_column: String,

    /// Numeric column that is binned.
    pub binned_column: String,
}

impl Default for EdaConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            bins: DEFAULT_BINS,
            group_column: "sex".to_string(),
            rate_column: "survived".to_string(),
            binned_column: "age".to_string(),
        }
    }
}

impl EdaConfig {
    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.top_n == 0 {
            return Err(ConfigValidationError::InvalidCount {
                field: "top_n".to_string(),
                value: self.top_n,
            });
        }
        if self.bins == 0 {
            return Err(ConfigValidationError::InvalidCount {
                field: "bins".to_string(),
                value: self.bins,
            });
        }
        Ok(())
    }
}

/// Configuration for the whole pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use tabclean::config::{CasePolicy, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .drop_threshold(0.6)
///     .case_override("Ticket", CasePolicy::Upper)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Cleaning parameters.
    pub cleaner: CleanerConfig,

    /// Analysis parameters.
    pub eda: EdaConfig,

    /// Output directory for the cleaned table and reports.
    /// Default: "outputs"
    pub output_dir: PathBuf,

    /// File stem of the cleaned CSV and JSON report.
    /// If None, "cleaned_dataset" is used.
    pub output_name: Option<String>,

    /// Whether to write the cleaned table and reports to disk.
    /// When false, results are kept in memory only.
    /// Default: true
    pub save_to_disk: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cleaner: CleanerConfig::default(),
            eda: EdaConfig::default(),
            output_dir: PathBuf::from("outputs"),
            output_name: None,
            save_to_disk: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the nested configurations.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.cleaner.validate()?;
        self.eda.validate()
    }

    /// Stem used for output file names.
    pub fn output_stem(&self) -> &str {
        self.output_name.as_deref().unwrap_or("cleaned_dataset")
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid value for '{field}': {value} (must be at least 1)")]
    InvalidCount { field: String, value: usize },
}

impl From<ConfigValidationError> for crate::error::TabcleanError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::TabcleanError::InvalidInput(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    drop_threshold: Option<f64>,
    text_columns: Option<Vec<String>>,
    default_case: Option<CasePolicy>,
    case_overrides: BTreeMap<String, CasePolicy>,
    blank_as_missing: Option<bool>,
    top_n: Option<usize>,
    bins: Option<usize>,
    group_column: Option<String>,
    rate_column: Option<String>,
    binned_column: Option<String>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
    save_to_disk: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Set the missing fraction above which a column is dropped.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.6 = 60%)
    pub fn drop_threshold(mut self, threshold: f64) -> Self {
        self.drop_threshold = Some(threshold);
        self
    }

    /// Declare the categorical text columns explicitly.
    pub fn text_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the casing used for text columns without an override.
    pub fn default_case(mut self, policy: CasePolicy) -> Self {
        self.default_case = Some(policy);
        self
    }

    /// Override the casing of a single text column.
    pub fn case_override(mut self, column: impl Into<String>, policy: CasePolicy) -> Self {
        self.case_overrides.insert(column.into(), policy);
        self
    }

    /// Enable or disable blank-to-missing normalization.
    pub fn blank_as_missing(mut self, enable: bool) -> Self {
        self.blank_as_missing = Some(enable);
        self
    }

    /// Set the number of rows kept per column in value counts.
    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    /// Set the number of bins for the binned rate table.
    pub fn bins(mut self, bins: usize) -> Self {
        self.bins = Some(bins);
        self
    }

    /// Set the grouping column for group rates.
    pub fn group_column(mut self, column: impl Into<String>) -> Self {
        self.group_column = Some(column.into());
        self
    }

    /// Set the outcome column averaged in group and binned rates.
    pub fn rate_column(mut self, column: impl Into<String>) -> Self {
        self.rate_column = Some(column.into());
        self
    }

    /// Set the numeric column that is binned.
    pub fn binned_column(mut self, column: impl Into<String>) -> Self {
        self.binned_column = Some(column.into());
        self
    }

    /// Set the output directory for the cleaned table and reports.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set a custom output file stem (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Enable or disable saving outputs to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let eda_defaults = EdaConfig::default();
        let config = PipelineConfig {
            cleaner: CleanerConfig {
                drop_threshold: self.drop_threshold.unwrap_or(DEFAULT_DROP_THRESHOLD),
                text_columns: self.text_columns,
                default_case: self.default_case.unwrap_or_default(),
                case_overrides: self.case_overrides,
                blank_as_missing: self.blank_as_missing.unwrap_or(true),
            },
            eda: EdaConfig {
                top_n: self.top_n.unwrap_or(DEFAULT_TOP_N),
                bins: self.bins.unwrap_or(DEFAULT_BINS),
                group_column: self.group_column.unwrap_or(eda_defaults.group_column),
                rate_column: self.rate_column.unwrap_or(eda_defaults.rate_column),
                binned_column: self.binned_column.unwrap_or(eda_defaults.binned_column),
            },
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("outputs")),
            output_name: self.output_name,
            save_to_disk: self.save_to_disk.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
