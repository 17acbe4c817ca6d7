use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use log::debug;
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};

use crate::dns_cache::Resolver;
use crate::probe::{Outcome, ProbeAttempt};
use crate::target::Target;

pub struct ProbeExecutor;

impl ProbeExecutor {
    /// Resolves the target and times one TCP handshake against it.
    ///
    /// Resolution and the connect are each bounded by `limit`. Latency covers
    /// only the connect, from initiation to handshake completion or failure.
    /// The stream is dropped as soon as it is established.
    pub async fn run_attempt(
        seq: u64,
        target: &Target,
        resolver: &mut Resolver,
        limit: Duration,
    ) -> ProbeAttempt {
        let timestamp = Utc::now();

        let addr = match timeout(limit, resolver.resolve(target)).await {
            Ok(Ok(addr)) => addr,
            Ok(Err(message)) => {
                debug!("seq={seq} {target}: resolution failed: {message}");
                return ProbeAttempt {
                    seq,
                    timestamp,
                    remote_addr: None,
                    outcome: Outcome::DnsFailure { message },
                };
            }
            Err(_) => {
                return ProbeAttempt {
                    seq,
                    timestamp,
                    remote_addr: None,
                    outcome: Outcome::DnsFailure {
                        message: format!("resolution timed out after {limit:?}"),
                    },
                };
            }
        };

        let outcome = Self::connect(addr, limit).await;
        debug!("seq={seq} {target} ({addr}): {outcome:?}");
        ProbeAttempt {
            seq,
            timestamp,
            remote_addr: Some(addr),
            outcome,
        }
    }

    /// Times a single connect to an already resolved address.
    pub async fn connect(addr: SocketAddr, limit: Duration) -> Outcome {
        let started = Instant::now();
        match timeout(limit, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                let latency = started.elapsed();
                drop(stream);
                Outcome::Success { latency }
            }
            Ok(Err(e)) => Self::classify(&e),
            Err(_) => Outcome::Timeout,
        }
    }

    fn classify(err: &io::Error) -> Outcome {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Outcome::ConnectionRefused,
            io::ErrorKind::TimedOut => Outcome::Timeout,
            _ => Outcome::OtherError {
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::AddressFamily;
    use tokio::net::{TcpListener, TcpSocket};

    const LIMIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn connects_to_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let outcome = ProbeExecutor::connect(addr, LIMIT).await;
        assert!(outcome.is_success(), "{outcome:?}");
        assert!(outcome.latency().unwrap() < LIMIT);
    }

    #[tokio::test]
    async fn closed_port_is_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert_eq!(
            ProbeExecutor::connect(addr, LIMIT).await,
            Outcome::ConnectionRefused
        );
    }

    #[tokio::test]
    async fn unanswered_handshake_times_out() {
        // A listener that never accepts, with its backlog already full
        let socket = TcpSocket::new_v4().unwrap();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let listener = socket.listen(0).unwrap();
        let addr = listener.local_addr().unwrap();
        let _queued = TcpStream::connect(addr).await.unwrap();

        assert_eq!(
            ProbeExecutor::connect(addr, Duration::from_millis(300)).await,
            Outcome::Timeout
        );
    }

    #[tokio::test]
    async fn attempt_records_dialed_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let target = Target::new("127.0.0.1", u32::from(port)).unwrap();
        let mut resolver = Resolver::new(Duration::ZERO, AddressFamily::Any);

        let attempt = ProbeExecutor::run_attempt(3, &target, &mut resolver, LIMIT).await;
        assert_eq!(attempt.seq, 3);
        assert_eq!(attempt.remote_addr, Some(listener.local_addr().unwrap()));
        assert!(attempt.outcome.is_success());
    }

    #[tokio::test]
    async fn dns_failure_never_dials() {
        let target = Target::new("no-such-host.invalid", 80).unwrap();
        let mut resolver = Resolver::new(Duration::ZERO, AddressFamily::Any);

        let attempt = ProbeExecutor::run_attempt(1, &target, &mut resolver, LIMIT).await;
        assert!(matches!(attempt.outcome, Outcome::DnsFailure { .. }));
        assert_eq!(attempt.remote_addr, None);
    }

    #[test]
    fn classifies_io_errors() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(ProbeExecutor::classify(&refused), Outcome::ConnectionRefused);

        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(ProbeExecutor::classify(&timed_out), Outcome::Timeout);

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(
            ProbeExecutor::classify(&denied),
            Outcome::OtherError { .. }
        ));
    }
}
