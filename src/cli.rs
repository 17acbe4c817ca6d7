use clap::Parser;

/// ting, yet another tcping.
///
/// Measures how long it takes to establish a TCP connection to HOST:PORT,
/// once per interval, and prints a summary at the end. Useful where ICMP
/// ping is filtered.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ting",
    version = env!("TING_VERSION"),
    about = "Yet another tcping: measure TCP connection latency",
    long_about = None,
)]
pub struct Cli {
    /// Host name or IP address to probe. May carry the port as `host:port` or `[v6]:port`.
    #[arg(value_name = "HOST")]
    pub host: String,

    /// TCP port to connect to. Defaults to 80.
    #[arg(value_name = "PORT")]
    pub port: Option<u32>,

    // ── Session ──────────────────────────────────────────────────────────────

    /// Number of attempts. Defaults to the saved default, or 5.
    #[arg(short = 'c', long = "count", value_name = "N", conflicts_with = "forever")]
    pub count: Option<u64>,

    /// Keep probing until interrupted with Ctrl+C.
    #[arg(short = 't', long = "forever")]
    pub forever: bool,

    /// Seconds from the start of one attempt to the start of the next.
    #[arg(short = 'i', long = "interval", value_name = "SECS", allow_negative_numbers = true)]
    pub interval: Option<f64>,

    /// Per-attempt timeout in seconds. 0 selects the default of 5.
    #[arg(short = 'w', long = "timeout", value_name = "SECS", allow_negative_numbers = true)]
    pub timeout: Option<f64>,

    // ── Resolution ───────────────────────────────────────────────────────────

    /// Only connect over IPv4.
    #[arg(short = '4', long = "ipv4", conflicts_with = "ipv6")]
    pub ipv4: bool,

    /// Only connect over IPv6.
    #[arg(short = '6', long = "ipv6")]
    pub ipv6: bool,

    /// Reuse a resolved address for this many seconds instead of resolving on every attempt.
    #[arg(long = "dns-ttl", value_name = "SECS", default_value_t = 0.0)]
    pub dns_ttl: f64,

    // ── Output ───────────────────────────────────────────────────────────────

    /// Emit newline-delimited JSON: one object per attempt, then the summary.
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    /// Store the effective count, interval and timeout as the new defaults.
    #[arg(long = "save-defaults")]
    pub save_defaults: bool,

    /// Log debug details to stderr.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
