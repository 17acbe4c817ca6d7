//! TCP connection latency probing.
//!
//! A [`ProbeSession`] repeatedly opens TCP connections to a [`Target`] and
//! records one [`ProbeAttempt`] per try; [`summarize`] derives loss and
//! latency figures from that record.

pub mod config;
pub mod dns_cache;
pub mod error;
pub mod probe;
pub mod probe_executor;
pub mod report;
pub mod session;
pub mod target;

pub use config::ProbeConfig;
pub use error::{ProbeError, Result};
pub use probe::{LatencyStats, Outcome, ProbeAttempt, Summary, summarize};
pub use session::ProbeSession;
pub use target::{AddressFamily, Target};
