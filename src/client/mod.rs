pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpPredictionClient;
pub use mock::ScriptedPredictionSource;
pub use traits::PredictionSource;
