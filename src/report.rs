//! Rendering of attempts and summaries for the terminal.

use std::time::Duration;

use serde::Serialize;

use crate::probe::{Outcome, ProbeAttempt, Summary};
use crate::target::Target;

/// Output style selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    /// One JSON object per line.
    Json,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Record<'a> {
    Attempt {
        target: String,
        #[serde(flatten)]
        attempt: &'a ProbeAttempt,
    },
    Summary {
        target: String,
        #[serde(flatten)]
        summary: &'a Summary,
    },
}

pub fn format_millis(d: Duration) -> String {
    format!("{:.2}ms", d.as_secs_f64() * 1000.0)
}

pub fn render_attempt(
    format: Format,
    target: &Target,
    attempt: &ProbeAttempt,
    limit: Duration,
) -> serde_json::Result<String> {
    match format {
        Format::Text => Ok(attempt_line(target, attempt, limit)),
        Format::Json => serde_json::to_string(&Record::Attempt {
            target: target.to_string(),
            attempt,
        }),
    }
}

pub fn render_summary(
    format: Format,
    target: &Target,
    summary: &Summary,
) -> serde_json::Result<String> {
    match format {
        Format::Text => Ok(summary_block(target, summary)),
        Format::Json => serde_json::to_string(&Record::Summary {
            target: target.to_string(),
            summary,
        }),
    }
}

pub fn attempt_line(target: &Target, attempt: &ProbeAttempt, limit: Duration) -> String {
    let dialed = attempt
        .remote_addr
        .map(|addr| format!(" ({addr})"))
        .unwrap_or_default();
    let result = match &attempt.outcome {
        Outcome::Success { latency } => format!("time={}", format_millis(*latency)),
        Outcome::Timeout => format!("timed out after {}", format_millis(limit)),
        Outcome::ConnectionRefused => "connection refused".to_string(),
        Outcome::DnsFailure { message } => format!("DNS failure: {message}"),
        Outcome::OtherError { message } => format!("error: {message}"),
    };
    format!(
        "Connecting to {target}{dialed}: seq={} {result}",
        attempt.seq
    )
}

pub fn summary_block(target: &Target, summary: &Summary) -> String {
    let latency = match &summary.latency {
        Some(stats) => format!(
            "minimum = {}, maximum = {}, average = {}, stddev = {}",
            format_millis(stats.min),
            format_millis(stats.max),
            format_millis(stats.avg),
            format_millis(stats.stddev),
        ),
        None => "no successful connections".to_string(),
    };
    format!(
        "\n--- {target} tcping statistics ---\n\
         {} connections, {} succeeded, {} failed, {:.2}% loss\n\
         {latency}",
        summary.sent, summary.succeeded, summary.failed, summary.loss_percent,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::summarize;
    use chrono::Utc;

    fn target() -> Target {
        Target::new("example.com", 80).unwrap()
    }

    fn attempt(seq: u64, outcome: Outcome) -> ProbeAttempt {
        ProbeAttempt {
            seq,
            timestamp: Utc::now(),
            remote_addr: Some("192.0.2.1:80".parse().unwrap()),
            outcome,
        }
    }

    #[test]
    fn success_line_shows_address_and_time() {
        let line = attempt_line(
            &target(),
            &attempt(
                1,
                Outcome::Success {
                    latency: Duration::from_micros(12_340),
                },
            ),
            Duration::from_secs(5),
        );
        assert_eq!(line, "Connecting to example.com:80 (192.0.2.1:80): seq=1 time=12.34ms");
    }

    #[test]
    fn failure_lines() {
        let limit = Duration::from_secs(5);
        assert!(attempt_line(&target(), &attempt(2, Outcome::Timeout), limit)
            .ends_with("seq=2 timed out after 5000.00ms"));
        assert!(
            attempt_line(&target(), &attempt(3, Outcome::ConnectionRefused), limit)
                .ends_with("seq=3 connection refused")
        );

        let dns = ProbeAttempt {
            remote_addr: None,
            ..attempt(
                4,
                Outcome::DnsFailure {
                    message: "no such host".into(),
                },
            )
        };
        assert_eq!(
            attempt_line(&target(), &dns, limit),
            "Connecting to example.com:80: seq=4 DNS failure: no such host"
        );
    }

    #[test]
    fn summary_without_successes() {
        let summary = summarize(&[attempt(1, Outcome::ConnectionRefused)]);
        let block = summary_block(&target(), &summary);
        assert!(block.contains("--- example.com:80 tcping statistics ---"));
        assert!(block.contains("1 connections, 0 succeeded, 1 failed, 100.00% loss"));
        assert!(block.ends_with("no successful connections"));
    }

    #[test]
    fn summary_with_latency() {
        let summary = summarize(&[attempt(
            1,
            Outcome::Success {
                latency: Duration::from_millis(2),
            },
        )]);
        let block = summary_block(&target(), &summary);
        assert!(block.contains("0.00% loss"));
        assert!(block.ends_with(
            "minimum = 2.00ms, maximum = 2.00ms, average = 2.00ms, stddev = 0.00ms"
        ));
    }

    #[test]
    fn json_records_are_tagged() {
        let a = attempt(1, Outcome::Timeout);
        let line = render_attempt(Format::Json, &target(), &a, Duration::from_secs(1)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "attempt");
        assert_eq!(value["target"], "example.com:80");
        assert_eq!(value["outcome"], "timeout");
        assert_eq!(value["remote_addr"], "192.0.2.1:80");

        let line = render_summary(Format::Json, &target(), &summarize(&[a])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "summary");
        assert_eq!(value["sent"], 1);
        assert!(value["latency"].is_null());
    }
}
