//! Trigger screener
//!
//! Rule-based pre-filter that decides which assets justify a full (and
//! expensive) council evaluation. Conditions are supplied externally as a
//! table of predicate expressions, compiled once at load; screening itself
//! is pure, deterministic, and free of I/O: identical inputs always produce
//! identical output, including the skip report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sdk::errors::ConclaveError;

pub mod expr;

use expr::Predicate;

/// Bundled default condition table.
const DEFAULT_TRIGGERS: &str = include_str!("../../config/triggers.toml");

/// Priority tier of a trigger condition. Ordinal: `High > Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Medium,
    High,
}

impl Priority {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// Externally supplied trigger condition row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Unique condition id
    pub id: String,

    /// Predicate expression over named metrics (see [`expr`])
    pub expression: String,

    /// Personas best suited to evaluate assets matching this condition
    #[serde(default)]
    pub relevant_personas: Vec<String>,

    /// Priority tier
    pub priority: Priority,
}

/// TOML condition file: a sequence of `[[trigger]]` tables.
#[derive(Debug, Deserialize)]
struct TriggerFile {
    #[serde(default)]
    trigger: Vec<TriggerSpec>,
}

/// A compiled trigger condition.
#[derive(Debug, Clone)]
pub struct TriggerCondition {
    /// Unique condition id
    pub id: String,

    /// Personas best suited to evaluate matching assets
    pub relevant_personas: Vec<String>,

    /// Priority tier
    pub priority: Priority,

    predicate: Predicate,
}

/// Named metrics for one asset in the scan universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetrics {
    /// Asset symbol
    pub symbol: String,

    /// Metric name to value
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl AssetMetrics {
    /// New empty metric set for a symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            metrics: BTreeMap::new(),
        }
    }

    /// Builder-style metric insertion.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Why this entry cannot be screened, if anything.
    fn malformed_reason(&self) -> Option<String> {
        if self.symbol.trim().is_empty() {
            return Some("empty symbol".to_string());
        }
        for (name, value) in &self.metrics {
            if !value.is_finite() {
                return Some(format!("metric '{name}' is not finite"));
            }
        }
        None
    }
}

/// An asset that matched at least one trigger condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredAsset {
    /// Asset symbol
    pub symbol: String,

    /// Ids of every condition that matched, in table order
    pub matched_condition_ids: Vec<String>,

    /// Highest priority among the matched conditions
    pub priority: Priority,

    /// Union of the matched conditions' relevant personas, first occurrence
    /// first
    pub relevant_personas: Vec<String>,
}

/// A universe entry that could not be screened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedAsset {
    /// Position in the input universe
    pub index: usize,

    /// Symbol as supplied, possibly empty
    pub symbol: String,

    /// Why the entry was skipped
    pub reason: String,
}

/// Outcome of screening a universe.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    /// Triggered assets, in universe order
    pub triggered: Vec<TriggeredAsset>,

    /// Skipped entries, in universe order
    pub skipped: Vec<SkippedAsset>,
}

/// The trigger screener: a compiled, read-only condition table.
#[derive(Debug, Clone)]
pub struct Screener {
    conditions: Vec<TriggerCondition>,
}

impl Screener {
    /// Compile a condition table. Any unparseable expression or duplicate id
    /// is fatal; a partially loaded screener is never produced.
    pub fn from_specs(specs: Vec<TriggerSpec>) -> Result<Self, ConclaveError> {
        let mut conditions = Vec::with_capacity(specs.len());
        let mut seen = std::collections::HashSet::new();

        for spec in specs {
            if spec.id.trim().is_empty() {
                return Err(ConclaveError::InvalidTrigger {
                    id: spec.id,
                    reason: "id must be non-empty".to_string(),
                });
            }
            if !seen.insert(spec.id.clone()) {
                return Err(ConclaveError::InvalidTrigger {
                    id: spec.id,
                    reason: "duplicate condition id".to_string(),
                });
            }
            let predicate = Predicate::parse(&spec.expression).map_err(|e| {
                ConclaveError::InvalidTrigger {
                    id: spec.id.clone(),
                    reason: e.to_string(),
                }
            })?;
            conditions.push(TriggerCondition {
                id: spec.id,
                relevant_personas: spec.relevant_personas,
                priority: spec.priority,
                predicate,
            });
        }

        Ok(Self { conditions })
    }

    /// Compile a condition table from TOML text (`[[trigger]]` tables).
    pub fn from_toml(text: &str) -> Result<Self, ConclaveError> {
        let file: TriggerFile =
            toml::from_str(text).map_err(|e| ConclaveError::Config(e.to_string()))?;
        Self::from_specs(file.trigger)
    }

    /// Compile a condition table from a TOML file.
    pub fn load_file(path: &std::path::Path) -> Result<Self, ConclaveError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// The bundled default condition table.
    pub fn bundled() -> Result<Self, ConclaveError> {
        Self::from_toml(DEFAULT_TRIGGERS)
    }

    /// Loaded conditions, in table order.
    pub fn conditions(&self) -> &[TriggerCondition] {
        &self.conditions
    }

    /// Evaluate every condition against one asset's metrics.
    ///
    /// Returns `None` when nothing matches. Pure: no I/O, no side effects,
    /// identical metrics always yield identical output.
    pub fn evaluate(&self, metrics: &AssetMetrics) -> Option<TriggeredAsset> {
        let mut matched_condition_ids = Vec::new();
        let mut priority = None;
        let mut relevant_personas: Vec<String> = Vec::new();

        for condition in &self.conditions {
            if !condition.predicate.evaluate(&metrics.metrics) {
                continue;
            }
            matched_condition_ids.push(condition.id.clone());
            priority = Some(match priority {
                Some(current) if current >= condition.priority => current,
                _ => condition.priority,
            });
            for persona in &condition.relevant_personas {
                if !relevant_personas.contains(persona) {
                    relevant_personas.push(persona.clone());
                }
            }
        }

        let priority = priority?;
        Some(TriggeredAsset {
            symbol: metrics.symbol.clone(),
            matched_condition_ids,
            priority,
            relevant_personas,
        })
    }

    /// Screen a whole universe, in input order.
    ///
    /// Malformed entries are recorded in the skip report and never abort the
    /// scan. Referentially transparent: repeated calls on the same universe
    /// produce identical reports.
    pub fn scan(&self, universe: &[AssetMetrics]) -> ScanReport {
        let mut report = ScanReport::default();

        for (index, entry) in universe.iter().enumerate() {
            if let Some(reason) = entry.malformed_reason() {
                debug!(index, symbol = %entry.symbol, %reason, "skipping malformed universe entry");
                report.skipped.push(SkippedAsset {
                    index,
                    symbol: entry.symbol.clone(),
                    reason,
                });
                continue;
            }
            if let Some(triggered) = self.evaluate(entry) {
                report.triggered.push(triggered);
            }
        }

        report
    }
}
