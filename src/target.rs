use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};

pub const DEFAULT_PORT: u16 = 80;

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Which address family a probe may connect over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    #[default]
    Any,
    V4,
    V6,
}

impl AddressFamily {
    pub fn accepts(self, ip: IpAddr) -> bool {
        match self {
            AddressFamily::Any => true,
            AddressFamily::V4 => ip.is_ipv4(),
            AddressFamily::V6 => ip.is_ipv6(),
        }
    }
}

/// A host and port to probe. The host is kept as given; resolution happens per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    host: String,
    port: u16,
}

impl Target {
    /// Validates host and port syntax. Does not touch the network.
    pub fn new(host: &str, port: u32) -> Result<Self> {
        let host = host.trim();
        validate_host(host)?;
        let port = validate_port(port)?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Parses a host argument that may carry its own port (`host:port`, `[v6]:port`),
    /// combined with an optional separately given port.
    pub fn parse(host_arg: &str, port: Option<u32>) -> Result<Self> {
        let (host, embedded) = split_host_port(host_arg.trim())?;
        let port = match (embedded, port) {
            (Some(_), Some(_)) => {
                return Err(ProbeError::InvalidTarget(format!(
                    "port given twice for `{host_arg}`"
                )));
            }
            (Some(p), None) | (None, Some(p)) => p,
            (None, None) => u32::from(DEFAULT_PORT),
        };
        Self::new(&host, port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The host as an IP address, when it is a literal rather than a name.
    pub fn ip_literal(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }

    /// Rejects an IP literal that can never satisfy the requested family.
    pub fn check_family(&self, family: AddressFamily) -> Result<()> {
        match self.ip_literal() {
            Some(ip) if !family.accepts(ip) => Err(ProbeError::InvalidTarget(format!(
                "{ip} is not an {} address",
                match family {
                    AddressFamily::V6 => "IPv6",
                    _ => "IPv4",
                }
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Picks the address to dial: always the first one, in resolver order, that
/// matches `family`. Two runs against a stable record dial the same address.
pub fn select_address<I>(addrs: I, family: AddressFamily) -> Option<SocketAddr>
where
    I: IntoIterator<Item = SocketAddr>,
{
    addrs.into_iter().find(|addr| family.accepts(addr.ip()))
}

fn validate_port(port: u32) -> Result<u16> {
    match u16::try_from(port) {
        Ok(p) if p != 0 => Ok(p),
        _ => Err(ProbeError::InvalidTarget(format!(
            "port {port} is out of range (1-65535)"
        ))),
    }
}

fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(ProbeError::InvalidTarget("host is empty".to_string()));
    }
    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    if host.len() > MAX_HOSTNAME_LEN {
        return Err(ProbeError::InvalidTarget(format!(
            "host name is longer than {MAX_HOSTNAME_LEN} characters"
        )));
    }

    let name = host.strip_suffix('.').unwrap_or(host);
    for label in name.split('.') {
        let valid = !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ProbeError::InvalidTarget(format!(
                "`{host}` is not a valid host name or IP address"
            )));
        }
    }
    Ok(())
}

fn split_host_port(arg: &str) -> Result<(String, Option<u32>)> {
    if let Some(rest) = arg.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(|| {
            ProbeError::InvalidTarget(format!("missing `]` in `{arg}`"))
        })?;
        if host.parse::<Ipv6Addr>().is_err() {
            return Err(ProbeError::InvalidTarget(format!(
                "only IPv6 addresses may be bracketed, got `{host}`"
            )));
        }
        return match tail {
            "" => Ok((host.to_string(), None)),
            _ => match tail.strip_prefix(':') {
                Some(port) => Ok((host.to_string(), Some(parse_port(port)?))),
                None => Err(ProbeError::InvalidTarget(format!(
                    "unexpected `{tail}` after `]`"
                ))),
            },
        };
    }

    match arg.matches(':').count() {
        1 => {
            let (host, port) = arg.split_once(':').unwrap_or((arg, ""));
            Ok((host.to_string(), Some(parse_port(port)?)))
        }
        // Bare IPv6 literals carry no port
        _ => Ok((arg.to_string(), None)),
    }
}

fn parse_port(s: &str) -> Result<u32> {
    s.parse()
        .map_err(|_| ProbeError::InvalidTarget(format!("`{s}` is not a port number")))
}
