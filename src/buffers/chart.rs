use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{Channel, ChartPoint, SensorSample, CHANNEL_COUNT};

pub const DEFAULT_CAPACITY: usize = 15;

/// Bounded FIFO of chart points for one channel
#[derive(Debug, Clone)]
pub struct ChannelBuffer {
    points: VecDeque<ChartPoint>,
    capacity: usize,
}

impl ChannelBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append at the tail, evicting from the head while over capacity
    pub fn push(&mut self, point: ChartPoint) {
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    pub fn average(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().map(|p| p.value).sum::<f64>() / self.points.len() as f64
    }

    pub fn latest(&self) -> Option<&ChartPoint> {
        self.points.back()
    }

    pub fn points(&self) -> impl Iterator<Item = &ChartPoint> {
        self.points.iter()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Four channel buffers that always grow together
#[derive(Debug, Clone)]
pub struct ChartBufferStore {
    channels: [ChannelBuffer; CHANNEL_COUNT],
    capacity: usize,
}

impl ChartBufferStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: std::array::from_fn(|_| ChannelBuffer::new(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Append a point to a single channel.
    ///
    /// Prefer [`push_sample`](Self::push_sample) when inserting readings;
    /// appending to one channel alone leaves the buffers at different lengths.
    pub fn append(&mut self, channel: Channel, point: ChartPoint) {
        self.channels[channel.index()].push(point);
    }

    /// Insert all four readings of a sample under one label
    pub fn push_sample(&mut self, label: &str, sample: &SensorSample) {
        for channel in Channel::ALL {
            self.channels[channel.index()].push(ChartPoint::new(label, sample.get(channel)));
        }
    }

    pub fn current_averages(&self) -> [f64; CHANNEL_COUNT] {
        std::array::from_fn(|i| self.channels[i].average())
    }

    pub fn channel(&self, channel: Channel) -> &ChannelBuffer {
        &self.channels[channel.index()]
    }

    /// Number of points held per channel
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        for buffer in self.channels.iter_mut() {
            buffer.clear();
        }
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        let labels = self.channels[0].points().map(|p| p.label.clone()).collect();
        let series = Channel::ALL
            .iter()
            .map(|&channel| ChannelSeries {
                channel,
                values: self.channel(channel).values(),
                average: self.channel(channel).average(),
            })
            .collect();
        ChartSnapshot { labels, series }
    }
}

impl Default for ChartBufferStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Point-in-time copy of the store handed to the display side
#[derive(Debug, Clone, Serialize)]
pub struct ChartSnapshot {
    pub labels: Vec<String>,
    pub series: Vec<ChannelSeries>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelSeries {
    pub channel: Channel,
    pub values: Vec<f64>,
    pub average: f64,
}

/// Store shared between the streamer (writer) and display readers
#[derive(Debug, Clone)]
pub struct SharedChartStore {
    inner: Arc<RwLock<ChartBufferStore>>,
}

impl SharedChartStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ChartBufferStore::new(capacity))),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, ChartBufferStore> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ChartBufferStore> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push_sample(&self, label: &str, sample: &SensorSample) {
        self.write().push_sample(label, sample);
    }

    pub fn current_averages(&self) -> [f64; CHANNEL_COUNT] {
        self.read().current_averages()
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        self.read().snapshot()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn reset(&self) {
        self.write().reset();
    }
}

impl Default for SharedChartStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
