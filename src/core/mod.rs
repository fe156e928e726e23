pub mod payload;
pub mod sample;

pub use payload::{FeedInfo, ModelPrediction, ModelSlot, PredictionMetadata, PredictionPayload};
pub use sample::{Channel, ChartPoint, SampleBatch, SensorSample, CHANNEL_COUNT};
