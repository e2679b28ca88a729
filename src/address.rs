//! Nameserver addresses as they appear on `nameserver` lines.
//!
//! Accepted forms:
//!
//! ```text
//! 192.0.2.1            IPv4
//! 192.0.2.1:5353       IPv4 with port
//! 2001:db8::1          IPv6
//! fe80::1%2            IPv6 with interface scope (index)
//! fe80::1%eth0         IPv6 with interface scope (name, resolved to index)
//! [2001:db8::1]:5353   IPv6 with port
//! [fe80::1%2]:5353     IPv6 with scope and port
//! ```
//!
//! Port 53 is the default and is dropped on parse, so `192.0.2.1` and
//! `192.0.2.1:53` are the same server.

use crate::error::{ResolvConfError, Result};
use crate::util::interface_index;
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

/// Standard DNS port, never stored explicitly.
pub const DNS_PORT: u16 = 53;

/// A DNS server address. Equality is the identity used for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    ip: IpAddr,
    port: Option<u16>,
    scope: Option<u32>,
}

impl ServerAddress {
    /// Creates an address on the default port with no scope.
    #[must_use]
    pub const fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            port: None,
            scope: None,
        }
    }

    /// Sets a non-default port. Port 53 is normalized away.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = if port == DNS_PORT { None } else { Some(port) };
        self
    }

    /// Sets the interface scope. Ignored for IPv4.
    #[must_use]
    pub const fn with_scope(mut self, ifindex: u32) -> Self {
        if self.ip.is_ipv6() && ifindex != 0 {
            self.scope = Some(ifindex);
        }
        self
    }

    /// The IP address without port or scope.
    #[must_use]
    pub const fn ip(&self) -> IpAddr {
        self.ip
    }

    /// The port to query, `53` unless overridden.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DNS_PORT)
    }

    /// The IPv6 zone as an interface index, if any.
    #[must_use]
    pub const fn scope(&self) -> Option<u32> {
        self.scope
    }
}

impl From<IpAddr> for ServerAddress {
    fn from(ip: IpAddr) -> Self {
        Self::new(ip)
    }
}

impl FromStr for ServerAddress {
    type Err = ResolvConfError;

    fn from_str(s: &str) -> Result<Self> {
        let input = s;
        let s = s.trim();
        if s.is_empty() {
            return Err(ResolvConfError::address(input, "empty address"));
        }

        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| ResolvConfError::address(input, "unterminated '['"))?;
            let port = match tail {
                "" => None,
                _ => Some(parse_port(
                    input,
                    tail.strip_prefix(':')
                        .ok_or_else(|| ResolvConfError::address(input, "expected ':' after ']'"))?,
                )?),
            };
            let (ip, scope) = parse_ipv6_scoped(input, host)?;
            return Ok(build(ip.into(), port, scope));
        }

        if s.contains('%') {
            let (ip, scope) = parse_ipv6_scoped(input, s)?;
            return Ok(build(ip.into(), None, scope));
        }

        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(ServerAddress::new(ip));
        }

        // A single colon can only be IPv4 with a port; bare IPv6 failed above.
        match s.split_once(':') {
            Some((host, port)) if !port.contains(':') => {
                let ip = host
                    .parse::<std::net::Ipv4Addr>()
                    .map_err(|_| ResolvConfError::address(input, "not an IP address"))?;
                Ok(build(ip.into(), Some(parse_port(input, port)?), None))
            }
            _ => Err(ResolvConfError::address(input, "not an IP address")),
        }
    }
}

/// Assembles an address, leaving unset parts at their defaults.
fn build(ip: IpAddr, port: Option<u16>, scope: Option<u32>) -> ServerAddress {
    let mut address = ServerAddress::new(ip);
    if let Some(port) = port {
        address = address.with_port(port);
    }
    if let Some(scope) = scope {
        address = address.with_scope(scope);
    }
    address
}

/// Parses a non-zero port number.
fn parse_port(input: &str, port: &str) -> Result<u16> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(ResolvConfError::address(input, "invalid port")),
        Ok(port) => Ok(port),
    }
}

/// Splits `addr%zone`; the zone is an index or an interface name.
fn parse_ipv6_scoped(input: &str, host: &str) -> Result<(Ipv6Addr, Option<u32>)> {
    let (addr, scope) = match host.split_once('%') {
        Some((addr, scope)) => (addr, Some(scope)),
        None => (host, None),
    };
    let ip = addr
        .parse::<Ipv6Addr>()
        .map_err(|_| ResolvConfError::address(input, "not an IPv6 address"))?;
    let scope = match scope {
        None => None,
        Some("") => return Err(ResolvConfError::address(input, "empty interface scope")),
        Some(scope) => Some(match scope.parse::<u32>() {
            Ok(0) => return Err(ResolvConfError::address(input, "invalid interface index")),
            Ok(index) => index,
            Err(_) => interface_index(scope)
                .ok_or_else(|| ResolvConfError::address(input, "unknown interface"))?,
        }),
    };
    Ok((ip, scope))
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ip, self.port, self.scope) {
            (IpAddr::V4(ip), None, _) => write!(f, "{ip}"),
            (IpAddr::V4(ip), Some(port), _) => write!(f, "{ip}:{port}"),
            (IpAddr::V6(ip), None, None) => write!(f, "{ip}"),
            (IpAddr::V6(ip), None, Some(scope)) => write!(f, "{ip}%{scope}"),
            (IpAddr::V6(ip), Some(port), None) => write!(f, "[{ip}]:{port}"),
            (IpAddr::V6(ip), Some(port), Some(scope)) => write!(f, "[{ip}%{scope}]:{port}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::LOOPBACK;
    use std::net::Ipv4Addr;

    fn parse(s: &str) -> ServerAddress {
        s.parse().unwrap()
    }

    #[test]
    fn plain_addresses() {
        let a = parse("192.0.2.1");
        assert_eq!(a.ip(), IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(a.port(), 53);
        assert_eq!(a.scope(), None);
        assert_eq!(a.to_string(), "192.0.2.1");

        assert_eq!(parse("2001:db8::1").to_string(), "2001:db8::1");
        assert_eq!(parse("  ::1 ").to_string(), "::1");
    }

    #[test]
    fn ports_and_scopes() {
        assert_eq!(parse("192.0.2.1:5353").to_string(), "192.0.2.1:5353");
        assert_eq!(parse("[2001:db8::1]:5353").to_string(), "[2001:db8::1]:5353");
        assert_eq!(parse("fe80::1%2").to_string(), "fe80::1%2");
        assert_eq!(parse("[fe80::1%2]:5353").to_string(), "[fe80::1%2]:5353");
        assert_eq!(parse("[2001:db8::1]").to_string(), "2001:db8::1");
    }

    #[test]
    fn default_port_is_same_server() {
        assert_eq!(parse("192.0.2.1:53"), parse("192.0.2.1"));
        assert_eq!(parse("[::1]:53"), parse("::1"));
        assert_ne!(parse("fe80::1%2"), parse("fe80::1%3"));
    }

    #[test]
    fn interface_names_resolve() {
        let lo = interface_index(LOOPBACK).unwrap();
        assert_eq!(parse(&format!("fe80::1%{LOOPBACK}")).scope(), Some(lo));
    }

    #[test]
    fn rejects_garbage() {
        for bad in [
            "",
            "   ",
            "example.com",
            "192.0.2.1 extra",
            "192.0.2.256",
            "192.0.2.1:0",
            "192.0.2.1:99999",
            "192.0.2.1%2",
            "[::1",
            "[::1]5353",
            "fe80::1%",
            "fe80::1%0",
            "fe80::1%no-such-iface0",
        ] {
            assert!(bad.parse::<ServerAddress>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn display_round_trips() {
        for s in ["10.0.0.1", "10.0.0.1:8053", "::1", "fe80::1%7", "[::1]:8053", "[fe80::1%7]:8053"] {
            assert_eq!(parse(s).to_string(), s);
            assert_eq!(parse(&parse(s).to_string()), parse(s));
        }
    }
}
