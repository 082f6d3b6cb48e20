use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Where a BINRPC server listens.
///
/// Parsed from `unix:/path`, `tcp:host:port`, `udp:host:port`, or a bare
/// absolute path (treated as a Unix stream socket).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Unix domain stream socket at a filesystem path.
    Unix(PathBuf),
    /// TCP `host:port`.
    Tcp(String),
    /// UDP `host:port`.
    Udp(String),
}

impl Endpoint {
    /// Short name of the endpoint kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Endpoint::Unix(_) => "unix",
            Endpoint::Tcp(_) => "tcp",
            Endpoint::Udp(_) => "udp",
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| TransportError::InvalidEndpoint {
            input: input.to_string(),
            reason,
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("endpoint must not be empty"));
        }

        if trimmed.starts_with('/') {
            return Ok(Endpoint::Unix(PathBuf::from(trimmed)));
        }

        let (scheme, rest) = trimmed
            .split_once(':')
            .ok_or_else(|| invalid("expected <scheme>:<address>"))?;

        match scheme {
            "unix" => {
                if rest.is_empty() {
                    return Err(invalid("unix endpoint requires a path"));
                }
                Ok(Endpoint::Unix(PathBuf::from(rest)))
            }
            "tcp" | "udp" => {
                let (host, port) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| invalid("expected host:port"))?;
                if host.is_empty() {
                    return Err(invalid("host must not be empty"));
                }
                port.parse::<u16>()
                    .map_err(|_| invalid("port must be a number in 0..=65535"))?;
                if scheme == "tcp" {
                    Ok(Endpoint::Tcp(rest.to_string()))
                } else {
                    Ok(Endpoint::Udp(rest.to_string()))
                }
            }
            _ => Err(invalid("unknown scheme (expected unix, tcp or udp)")),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp:{addr}"),
            Endpoint::Udp(addr) => write!(f, "udp:{addr}"),
        }
    }
}
