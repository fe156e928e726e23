use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DashboardError, Result};

/// Number of sensor channels carried by every sample
pub const CHANNEL_COUNT: usize = 4;

/// Sensor channels in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    GasA,
    GasB,
    Temperature,
    Humidity,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::GasA,
        Channel::GasB,
        Channel::Temperature,
        Channel::Humidity,
    ];

    pub fn index(self) -> usize {
        match self {
            Channel::GasA => 0,
            Channel::GasB => 1,
            Channel::Temperature => 2,
            Channel::Humidity => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Hardware sensor name reported by the telemetry feed
    pub fn sensor_name(self) -> &'static str {
        match self {
            Channel::GasA => "MQ136",
            Channel::GasB => "MQ137",
            Channel::Temperature => "TEMP",
            Channel::Humidity => "HUMI",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sensor_name())
    }
}

/// One reading across all four channels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorSample([f64; CHANNEL_COUNT]);

impl SensorSample {
    pub fn new(values: [f64; CHANNEL_COUNT]) -> Self {
        Self(values)
    }

    /// Build from an untyped row, rejecting anything that is not exactly four values
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let array: [f64; CHANNEL_COUNT] = values.try_into().map_err(|_| {
            DashboardError::length_mismatch(
                format!(
                    "sensor sample must have exactly {} values, got {}",
                    CHANNEL_COUNT,
                    values.len()
                ),
                CHANNEL_COUNT,
                values.len(),
            )
        })?;
        Ok(Self(array))
    }

    pub fn get(&self, channel: Channel) -> f64 {
        self.0[channel.index()]
    }

    pub fn values(&self) -> &[f64; CHANNEL_COUNT] {
        &self.0
    }
}

/// Ordered samples delivered by one prediction fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleBatch {
    samples: Vec<SensorSample>,
}

impl SampleBatch {
    pub fn new(samples: Vec<SensorSample>) -> Self {
        Self { samples }
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let samples = rows
            .iter()
            .map(|row| SensorSample::from_slice(row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SensorSample> {
        self.samples.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorSample> {
        self.samples.iter()
    }
}

impl From<Vec<SensorSample>> for SampleBatch {
    fn from(samples: Vec<SensorSample>) -> Self {
        Self::new(samples)
    }
}

/// Single plotted value with its display label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

impl ChartPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}
