use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use enose::buffers::SharedChartStore;
use enose::client::mock::ramp_batch;
use enose::config::OverlapPolicy;
use enose::core::{Channel, SampleBatch};
use enose::engine::{LabelFn, SampleStreamer, StreamOutcome, StreamState};
use enose::observability::DashboardMetrics;

const PERIOD: Duration = Duration::from_secs(3);

fn streamer(policy: OverlapPolicy) -> (SampleStreamer, SharedChartStore, Arc<DashboardMetrics>) {
    let store = SharedChartStore::new(15);
    let metrics = Arc::new(DashboardMetrics::new());
    let streamer = SampleStreamer::new(store.clone(), PERIOD, policy, metrics.clone());
    (streamer, store, metrics)
}

fn gas_a(store: &SharedChartStore) -> Vec<f64> {
    store.read().channel(Channel::GasA).values()
}

#[tokio::test(start_paused = true)]
async fn test_first_sample_inserted_immediately() {
    let (streamer, store, _) = streamer(OverlapPolicy::QueueLatest);

    let outcome = streamer.begin_stream(ramp_batch(0.0, 5));

    assert_eq!(outcome, StreamOutcome::Started);
    assert_eq!(store.len(), 1);
    assert_eq!(streamer.state(), StreamState::Streaming);
    assert_eq!(streamer.cursor(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_replays_one_sample_per_period() {
    let (streamer, store, metrics) = streamer(OverlapPolicy::QueueLatest);
    streamer.begin_stream(ramp_batch(0.0, 5));

    sleep(Duration::from_millis(2_900)).await;
    assert_eq!(store.len(), 1);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(store.len(), 2);

    sleep(Duration::from_secs(12)).await;
    assert_eq!(gas_a(&store), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(streamer.state(), StreamState::Idle);
    assert_eq!(metrics.samples_inserted(), 5);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(store.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_insertions_are_spaced_by_period() {
    let start = Instant::now();
    let label: LabelFn = Arc::new(move || start.elapsed().as_millis().to_string());
    let (streamer, store, _) = streamer(OverlapPolicy::QueueLatest);
    let streamer = streamer.with_label_fn(label);

    streamer.begin_stream(ramp_batch(0.0, 4));
    sleep(Duration::from_secs(10)).await;

    let labels: Vec<u128> = store
        .snapshot()
        .labels
        .iter()
        .map(|l| l.parse().unwrap())
        .collect();
    assert_eq!(labels.len(), 4);
    for pair in labels.windows(2) {
        assert!(pair[1] - pair[0] >= 3_000, "labels too close: {:?}", labels);
    }
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_batch_queued_until_drained() {
    let (streamer, store, metrics) = streamer(OverlapPolicy::QueueLatest);

    assert_eq!(streamer.begin_stream(ramp_batch(0.0, 10)), StreamOutcome::Started);
    assert_eq!(streamer.begin_stream(ramp_batch(10.0, 10)), StreamOutcome::Queued);
    assert!(streamer.has_pending());

    sleep(Duration::from_secs(60)).await;

    let expected: Vec<f64> = (5..20).map(|v| v as f64).collect();
    assert_eq!(gas_a(&store), expected);
    assert_eq!(streamer.state(), StreamState::Idle);
    assert_eq!(metrics.batches_started(), 2);
    assert_eq!(metrics.batches_queued(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_newest_queued_batch_replaces_older() {
    let (streamer, store, metrics) = streamer(OverlapPolicy::QueueLatest);

    streamer.begin_stream(ramp_batch(0.0, 2));
    streamer.begin_stream(ramp_batch(100.0, 2));
    streamer.begin_stream(ramp_batch(200.0, 2));

    sleep(Duration::from_secs(20)).await;

    assert_eq!(gas_a(&store), vec![0.0, 1.0, 200.0, 201.0]);
    assert_eq!(metrics.batches_queued(), 2);
    assert_eq!(metrics.batches_started(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_drop_policy_discards_overlap() {
    let (streamer, store, metrics) = streamer(OverlapPolicy::Drop);

    streamer.begin_stream(ramp_batch(0.0, 3));
    assert_eq!(streamer.begin_stream(ramp_batch(50.0, 3)), StreamOutcome::Dropped);
    assert!(!streamer.has_pending());

    sleep(Duration::from_secs(20)).await;

    assert_eq!(gas_a(&store), vec![0.0, 1.0, 2.0]);
    assert_eq!(metrics.batches_dropped(), 1);

    // Accepted again once idle
    assert_eq!(streamer.begin_stream(ramp_batch(50.0, 1)), StreamOutcome::Started);
    assert_eq!(store.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_insertions() {
    let (streamer, store, _) = streamer(OverlapPolicy::QueueLatest);
    streamer.begin_stream(ramp_batch(0.0, 10));
    streamer.begin_stream(ramp_batch(10.0, 10));

    sleep(Duration::from_millis(6_100)).await;
    assert_eq!(store.len(), 3);

    assert!(streamer.stop());
    assert_eq!(streamer.state(), StreamState::Idle);
    assert_eq!(streamer.cursor(), 0);
    assert!(!streamer.has_pending());

    sleep(Duration::from_secs(60)).await;
    assert_eq!(store.len(), 3);
    assert!(!streamer.stop());
}

#[tokio::test(start_paused = true)]
async fn test_empty_batch_is_ignored() {
    let (streamer, store, metrics) = streamer(OverlapPolicy::QueueLatest);

    let outcome = streamer.begin_stream(SampleBatch::new(Vec::new()));

    assert_eq!(outcome, StreamOutcome::Empty);
    assert_eq!(streamer.state(), StreamState::Idle);
    assert!(store.is_empty());
    assert_eq!(metrics.batches_started(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_single_sample_batch_goes_idle_at_once() {
    let (streamer, store, _) = streamer(OverlapPolicy::QueueLatest);

    streamer.begin_stream(ramp_batch(7.0, 1));

    assert_eq!(store.len(), 1);
    assert_eq!(streamer.state(), StreamState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop_begins_at_first_sample() {
    let (streamer, store, _) = streamer(OverlapPolicy::QueueLatest);
    streamer.begin_stream(ramp_batch(0.0, 5));
    sleep(Duration::from_millis(3_100)).await;
    streamer.stop();
    store.reset();

    streamer.begin_stream(ramp_batch(40.0, 5));

    assert_eq!(gas_a(&store), vec![40.0]);
    assert_eq!(streamer.cursor(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_replay() {
    let store = SharedChartStore::new(15);
    let insertions = Arc::new(Mutex::new(0usize));
    let counter = insertions.clone();
    let label: LabelFn = Arc::new(move || {
        *counter.lock().unwrap() += 1;
        String::new()
    });

    {
        let streamer = SampleStreamer::new(
            store.clone(),
            PERIOD,
            OverlapPolicy::QueueLatest,
            Arc::new(DashboardMetrics::new()),
        )
        .with_label_fn(label);
        streamer.begin_stream(ramp_batch(0.0, 10));
    }

    sleep(Duration::from_secs(30)).await;
    assert_eq!(*insertions.lock().unwrap(), 1);
    assert_eq!(store.len(), 1);
}
