pub mod refresh;
pub mod session;
pub mod state;
pub mod streamer;

pub use refresh::RefreshLoop;
pub use session::{DashboardSession, SessionSnapshot};
pub use state::{LoopState, StreamState};
pub use streamer::{wall_clock_label, LabelFn, SampleStreamer, StreamOutcome};
