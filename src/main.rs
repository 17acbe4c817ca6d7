mod cli;

use std::pin::pin;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use log::{info, warn};
use ting::config::{ProbeConfig, Settings, duration_from_secs};
use ting::report::{Format, render_attempt, render_summary};
use ting::session::ProbeSession;
use ting::target::{AddressFamily, Target};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ting: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = Settings::load();
    let target = Target::parse(&cli.host, cli.port)?;
    let config = build_config(&cli, &settings)?;

    if cli.save_defaults {
        let defaults = Settings {
            count: config.count.unwrap_or(settings.count),
            interval_secs: config.interval.as_secs_f64(),
            timeout_secs: config.timeout.as_secs_f64(),
        };
        let path = defaults.save().context("failed to save defaults")?;
        info!("saved defaults to {}", path.display());
    }

    let format = if cli.json { Format::Json } else { Format::Text };

    let mut session = ProbeSession::start(target.clone(), config)?;
    let limit = session.config().effective_timeout();
    let mut updates = session
        .take_updates()
        .context("attempt feed is not available")?;
    let mut interrupted = pin!(shutdown_signal());

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(attempt) => println!("{}", render_attempt(format, &target, &attempt, limit)?),
                None => break,
            },
            _ = &mut interrupted => {
                info!("interrupted, stopping session");
                session.stop().await;
                break;
            }
        }
    }

    // Attempts recorded just before an interrupt are still queued
    while let Ok(attempt) = updates.try_recv() {
        println!("{}", render_attempt(format, &target, &attempt, limit)?);
    }
    session.join().await;

    let summary = session.summary();
    println!("{}", render_summary(format, &target, &summary)?);

    if summary.sent > 0 && summary.succeeded == 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Merges flags over saved defaults. Flags win.
fn build_config(cli: &Cli, settings: &Settings) -> ting::Result<ProbeConfig> {
    let interval = duration_from_secs("interval", cli.interval.unwrap_or(settings.interval_secs))?;
    let timeout = duration_from_secs("timeout", cli.timeout.unwrap_or(settings.timeout_secs))?;
    let dns_ttl = duration_from_secs("dns-ttl", cli.dns_ttl)?;

    let family = match (cli.ipv4, cli.ipv6) {
        (true, _) => AddressFamily::V4,
        (_, true) => AddressFamily::V6,
        _ => AddressFamily::Any,
    };

    let config = ProbeConfig {
        count: if cli.forever {
            None
        } else {
            Some(cli.count.unwrap_or(settings.count))
        },
        interval,
        timeout,
        family,
        dns_ttl,
    };
    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use ting::ProbeError;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ting").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_saved_defaults() {
        let settings = Settings {
            count: 9,
            interval_secs: 2.0,
            timeout_secs: 3.0,
        };
        let config = build_config(&parse(&["example.com", "-i", "0.25"]), &settings).unwrap();
        assert_eq!(config.count, Some(9));
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn forever_means_unbounded() {
        let config = build_config(&parse(&["example.com", "-t"]), &Settings::default()).unwrap();
        assert_eq!(config.count, None);
    }

    #[test]
    fn zero_or_negative_interval_is_fatal() {
        for value in ["0", "-1"] {
            let result = build_config(&parse(&["example.com", "-i", value]), &Settings::default());
            assert!(matches!(result, Err(ProbeError::InvalidConfig(_))), "{value}");
        }
    }

    #[test]
    fn selects_address_family() {
        let config = build_config(&parse(&["example.com", "-6"]), &Settings::default()).unwrap();
        assert_eq!(config.family, AddressFamily::V6);
    }
}
