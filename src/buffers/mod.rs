pub mod chart;

pub use chart::{
    ChannelBuffer, ChannelSeries, ChartBufferStore, ChartSnapshot, SharedChartStore,
    DEFAULT_CAPACITY,
};
