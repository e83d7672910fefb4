//! Synthetic demo data.
//!
//! Shown only while no data source is configured, and only ever paired with
//! [`ConnectivityState::Demo`](crate::model::ConnectivityState::Demo). The
//! shape is fixed; the values are random and regenerated on every call.

use chrono::{DateTime, Duration, Local};
use rand::Rng;

use crate::model::{DashboardPayload, EndpointStat, GeoSample, MetricSample};

/// Number of hourly intervals in the demo series (yields 25 samples).
pub const DEMO_POINTS: usize = 24;

/// Probability that a sample carries a traffic spike.
const SPIKE_PROBABILITY: f64 = 0.1;

/// Extra visitors added by a spike.
const SPIKE_VISITORS: f64 = 2000.0;

/// Extra latency added by a spike, in milliseconds.
const SPIKE_LATENCY_MS: f64 = 300.0;

/// Build a complete demo payload.
pub fn demo_payload() -> DashboardPayload {
    DashboardPayload {
        metrics: generate_time_series(DEMO_POINTS),
        endpoints: demo_endpoints(),
        geo: demo_geo(),
    }
}

/// `points + 1` hourly samples ending at the current hour.
pub fn generate_time_series(points: usize) -> Vec<MetricSample> {
    generate_time_series_with(points, Local::now(), &mut rand::thread_rng())
}

/// Deterministic-shape generator with an explicit clock and RNG.
///
/// Samples are spaced one hour apart, the last one at `now`. Each sample has
/// a base visitor count in `[500, 1500)`; roughly one in ten gets a spike that
/// inflates visitors, page views and latency together.
pub fn generate_time_series_with<R: Rng>(
    points: usize,
    now: DateTime<Local>,
    rng: &mut R,
) -> Vec<MetricSample> {
    (0..=points)
        .rev()
        .map(|hours_ago| {
            let time = now - Duration::hours(hours_ago as i64);
            let base_visitors = 500.0 + rng.gen_range(0.0..1000.0);
            let spiked = rng.gen_bool(SPIKE_PROBABILITY);
            let spike = if spiked { SPIKE_VISITORS } else { 0.0 };
            let visitors = base_visitors + spike;

            MetricSample {
                timestamp: time.format("%H:%M").to_string(),
                visitors: visitors.floor() as u64,
                page_views: (visitors * (1.5 + rng.gen_range(0.0..1.0))).floor() as u64,
                errors: rng.gen_range(0..15),
                latency_ms: (100.0
                    + rng.gen_range(0.0..200.0)
                    + if spiked { SPIKE_LATENCY_MS } else { 0.0 })
                .floor() as u64,
            }
        })
        .collect()
}

fn demo_endpoints() -> Vec<EndpointStat> {
    vec![
        EndpointStat {
            path: "/api/demo/users".to_string(),
            calls: 120,
            avg_latency_ms: 120,
            status_code: 200,
        },
        EndpointStat {
            path: "/api/demo/products".to_string(),
            calls: 89,
            avg_latency_ms: 145,
            status_code: 200,
        },
    ]
}

fn demo_geo() -> Vec<GeoSample> {
    vec![GeoSample {
        city: "Demo City".to_string(),
        country: "Turkey".to_string(),
        lat: 41.0082,
        lng: 28.9784,
        users: 10,
    }]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
