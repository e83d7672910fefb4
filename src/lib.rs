//! metrix: analytics dashboard with live, demo and disconnected modes.
//!
//! A configured HTTP data source is polled for metrics, endpoint and
//! location records. Without a configured source the dashboard shows
//! synthetic demo data; when the source fails it shows nothing and says so.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod insight;
pub mod model;
pub mod refresh;
pub mod source;
pub mod synthetic;
pub mod web;
