//! Canonical prediction schema and the adapter that normalizes every
//! historical response shape of the Prediction Service into it.
//!
//! Two generations of responses are accepted:
//! - legacy: `predictions.{ann,random_forest,xgboost,knn}` and a top-level
//!   `thingspeak_data` channel description
//! - current: `predictions.{base_1..base_4,meta}` and `metadata.thingspeak`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::{SampleBatch, SensorSample};
use crate::error::{DashboardError, Result};

/// Position of a model in the stacked ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelSlot {
    Base(u8),
    Meta,
}

impl ModelSlot {
    /// Resolve a response key, accepting both masked and legacy model names
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "base_1" | "ann" => Some(Self::Base(1)),
            "base_2" | "random_forest" => Some(Self::Base(2)),
            "base_3" | "xgboost" => Some(Self::Base(3)),
            "base_4" | "knn" => Some(Self::Base(4)),
            "meta" => Some(Self::Meta),
            _ => None,
        }
    }

    fn is_legacy_key(key: &str) -> bool {
        matches!(key, "ann" | "random_forest" | "xgboost" | "knn")
    }
}

impl fmt::Display for ModelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base(n) => write!(f, "base_{}", n),
            Self::Meta => f.write_str("meta"),
        }
    }
}

impl From<ModelSlot> for String {
    fn from(slot: ModelSlot) -> Self {
        slot.to_string()
    }
}

impl TryFrom<String> for ModelSlot {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_key(&value).ok_or_else(|| format!("unknown model slot: {}", value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub slot: ModelSlot,
    pub class_id: Option<i64>,
    pub class_label: String,
    pub probability: Option<f64>,
}

/// Where the classified readings came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedInfo {
    pub records_fetched: Option<u64>,
    pub latest_entry_time: Option<String>,
    pub api_key: Option<String>,
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
    pub updated_at: Option<String>,
    pub last_entry_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionMetadata {
    pub timestamp: Option<String>,
    pub sensor_names: Vec<String>,
    pub feed: Option<FeedInfo>,
    pub model_versions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPayload {
    pub base_models: Vec<ModelPrediction>,
    pub meta: Option<ModelPrediction>,
    pub metadata: PredictionMetadata,
    pub input: Option<SensorSample>,
    pub batch: Option<SampleBatch>,
}

impl PredictionPayload {
    /// Normalize a raw Prediction Service body
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawPayload = serde_json::from_value(value)?;
        raw.normalize()
    }

    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let raw: RawPayload = serde_json::from_slice(body)?;
        raw.normalize()
    }

    pub fn model(&self, slot: ModelSlot) -> Option<&ModelPrediction> {
        match slot {
            ModelSlot::Meta => self.meta.as_ref(),
            ModelSlot::Base(_) => self.base_models.iter().find(|m| m.slot == slot),
        }
    }

    /// Label every base model agrees on, if they agree
    pub fn agreement(&self) -> Option<&str> {
        let first = self.base_models.first()?;
        self.base_models
            .iter()
            .all(|m| m.class_label == first.class_label)
            .then_some(first.class_label.as_str())
    }

    pub fn records_fetched(&self) -> Option<u64> {
        self.metadata.feed.as_ref().and_then(|f| f.records_fetched)
    }

    /// Batch to replay, if the response carried a non-empty one
    pub fn sample_batch(&self) -> Option<&SampleBatch> {
        self.batch.as_ref().filter(|b| !b.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default)]
    predictions: BTreeMap<String, RawModelResult>,
    #[serde(default)]
    metadata: Option<RawMetadata>,
    #[serde(default)]
    input_data: Option<Vec<f64>>,
    #[serde(default)]
    sensor_arrays: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    thingspeak_data: Option<RawFeedChannel>,
}

#[derive(Debug, Deserialize)]
struct RawModelResult {
    #[serde(default)]
    class_id: Option<i64>,
    #[serde(default)]
    class_label: Option<Value>,
    #[serde(default)]
    probability: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    sensor_names: Vec<String>,
    #[serde(default)]
    thingspeak: Option<RawFeedSummary>,
    #[serde(default)]
    model_versions: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawFeedSummary {
    #[serde(default)]
    records_fetched: Option<u64>,
    #[serde(default)]
    latest_entry_time: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFeedChannel {
    #[serde(default)]
    channel_id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    last_entry_id: Option<u64>,
}

impl RawPayload {
    fn normalize(self) -> Result<PredictionPayload> {
        let mut models: BTreeMap<ModelSlot, ModelPrediction> = BTreeMap::new();

        for (key, raw) in self.predictions {
            let Some(slot) = ModelSlot::from_key(&key) else {
                log::debug!("Ignoring unknown model '{}' in prediction response", key);
                continue;
            };
            // Masked names win when a response carries both generations
            if ModelSlot::is_legacy_key(&key) && models.contains_key(&slot) {
                continue;
            }
            let class_label = raw
                .class_label
                .as_ref()
                .and_then(label_text)
                .ok_or_else(|| DashboardError::Parse(format!("model '{}' has no class_label", key)))?;
            models.insert(
                slot,
                ModelPrediction {
                    slot,
                    class_id: raw.class_id,
                    class_label,
                    probability: raw.probability,
                },
            );
        }

        let meta = models.remove(&ModelSlot::Meta);
        let base_models = models.into_values().collect();

        let raw_meta = self.metadata.unwrap_or_default();
        let feed = match (raw_meta.thingspeak, self.thingspeak_data) {
            (Some(summary), _) => Some(FeedInfo {
                records_fetched: summary.records_fetched,
                latest_entry_time: summary.latest_entry_time,
                api_key: summary.api_key,
                ..FeedInfo::default()
            }),
            (None, Some(channel)) => Some(FeedInfo {
                channel_id: channel.channel_id.as_ref().and_then(label_text),
                channel_name: channel.name,
                updated_at: channel.updated_at,
                last_entry_id: channel.last_entry_id,
                ..FeedInfo::default()
            }),
            (None, None) => None,
        };

        let model_versions = raw_meta
            .model_versions
            .into_iter()
            .map(|(key, version)| match ModelSlot::from_key(&key) {
                Some(slot) => (slot.to_string(), version),
                None => (key, version),
            })
            .collect();

        let input = self
            .input_data
            .as_deref()
            .map(SensorSample::from_slice)
            .transpose()
            .map_err(|e| DashboardError::Parse(format!("input_data: {}", e)))?;

        let batch = self
            .sensor_arrays
            .as_deref()
            .map(SampleBatch::from_rows)
            .transpose()
            .map_err(|e| DashboardError::Parse(format!("sensor_arrays: {}", e)))?;

        Ok(PredictionPayload {
            base_models,
            meta,
            metadata: PredictionMetadata {
                timestamp: raw_meta.timestamp,
                sensor_names: raw_meta.sensor_names,
                feed,
                model_versions,
            },
            input,
            batch,
        })
    }
}

fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
