//! Response validation for data-source bodies.
//!
//! The only fail-closed check is structural: the body must be JSON and its
//! `metrics` field must be an array. Records inside the arrays are decoded one
//! by one; a record with a missing field, a wrong type, a negative or
//! fractional counter, or out-of-range coordinates is dropped and counted.
//! Records that decode are kept exactly as received.

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{DashboardPayload, EndpointStat, GeoSample, MetricSample};

/// A validated payload plus the number of records that were discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub payload: DashboardPayload,
    pub dropped: usize,
}

/// Parse and validate a response body.
pub fn decode_payload(body: &str) -> Result<Decoded> {
    let root: Value = serde_json::from_str(body).context("response body is not valid JSON")?;

    let Some(metrics) = root.get("metrics") else {
        bail!("response has no `metrics` field");
    };
    let Some(metrics) = metrics.as_array() else {
        bail!("response `metrics` field is not an array");
    };

    let mut dropped = 0;
    let metrics = decode_records::<MetricSample>(metrics, |_| true, &mut dropped);
    let endpoints =
        decode_records::<EndpointStat>(optional_array(&root, "endpoints"), |_| true, &mut dropped);
    let geo = decode_records::<GeoSample>(
        optional_array(&root, "geoData"),
        GeoSample::has_valid_coordinates,
        &mut dropped,
    );

    Ok(Decoded {
        payload: DashboardPayload {
            metrics,
            endpoints,
            geo,
        },
        dropped,
    })
}

/// The array under `key`, or an empty slice when it is missing or not an array.
fn optional_array<'a>(root: &'a Value, key: &str) -> &'a [Value] {
    root.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn decode_records<T: DeserializeOwned>(
    items: &[Value],
    keep: impl Fn(&T) -> bool,
    dropped: &mut usize,
) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(record) if keep(&record) => Some(record),
            _ => {
                *dropped += 1;
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
