use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
        latency: Duration,
    },
    Timeout,
    ConnectionRefused,
    DnsFailure {
        message: String,
    },
    OtherError {
        message: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn latency(&self) -> Option<Duration> {
        match self {
            Outcome::Success { latency } => Some(*latency),
            _ => None,
        }
    }
}

/// One connection trial within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeAttempt {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    /// The address actually dialed, when resolution got that far.
    pub remote_addr: Option<SocketAddr>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Latency figures over successful attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencyStats {
    #[serde(rename = "min_ms", serialize_with = "serialize_millis")]
    pub min: Duration,
    #[serde(rename = "avg_ms", serialize_with = "serialize_millis")]
    pub avg: Duration,
    #[serde(rename = "max_ms", serialize_with = "serialize_millis")]
    pub max: Duration,
    #[serde(rename = "stddev_ms", serialize_with = "serialize_millis")]
    pub stddev: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub sent: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub loss_percent: f64,
    /// Absent when no attempt succeeded.
    pub latency: Option<LatencyStats>,
}

/// Derives the summary from the attempt list alone.
pub fn summarize(attempts: &[ProbeAttempt]) -> Summary {
    let latencies: Vec<Duration> = attempts
        .iter()
        .filter_map(|a| match a.outcome {
            Outcome::Success { latency } => Some(latency),
            Outcome::Timeout
            | Outcome::ConnectionRefused
            | Outcome::DnsFailure { .. }
            | Outcome::OtherError { .. } => None,
        })
        .collect();

    let sent = attempts.len() as u64;
    let succeeded = latencies.len() as u64;
    let failed = sent - succeeded;

    Summary {
        sent,
        succeeded,
        failed,
        loss_percent: if sent > 0 {
            (failed as f64 / sent as f64) * 100.0
        } else {
            0.0
        },
        latency: latency_stats(&latencies),
    }
}

fn latency_stats(latencies: &[Duration]) -> Option<LatencyStats> {
    let min = *latencies.iter().min()?;
    let max = *latencies.iter().max()?;

    let total: u128 = latencies.iter().map(Duration::as_nanos).sum();
    let avg_nanos = total / latencies.len() as u128;

    let mean = total as f64 / latencies.len() as f64;
    let variance = latencies
        .iter()
        .map(|d| {
            let diff = d.as_nanos() as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / latencies.len() as f64;

    Some(LatencyStats {
        min,
        avg: Duration::from_nanos(avg_nanos as u64),
        max,
        stddev: Duration::from_nanos(variance.sqrt().round() as u64),
    })
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}
