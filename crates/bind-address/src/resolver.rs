use std::net::{IpAddr, Ipv6Addr};

use cidr::{IpCidr, IpInet};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::interfaces::{InterfaceSource, LocalInterface, SystemInterfaces};

/// Specs that mean "every interface" and are handed back untouched.
const WILDCARD_SPECS: [&str; 3] = ["0/0", "0.0.0.0/0", "0.0.0.0"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Family {
    V4,
    V6,
}

impl Family {
    fn of_literal(literal: &str) -> Self {
        if literal.contains(':') {
            Self::V6
        } else {
            Self::V4
        }
    }

    fn of_network(network: &IpCidr) -> Self {
        if network.is_ipv4() { Self::V4 } else { Self::V6 }
    }
}

/// Turns an interface spec into the local address this node should bind to.
///
/// A spec is one of:
///
/// - the name of a local interface, e.g. `eth0`
/// - a wildcard, `0/0`, `0.0.0.0/0` or `0.0.0.0`, returned as-is
/// - a CIDR range, e.g. `10.0.0.0/24`, matched against every local address
///
/// Resolution is computed from scratch on every call.
#[derive(Clone, Debug, Default)]
pub struct AddressResolver<S = SystemInterfaces> {
    source: S,
}

impl AddressResolver<SystemInterfaces> {
    /// Creates a resolver over the interfaces of the running host.
    #[must_use]
    pub const fn system() -> Self {
        Self {
            source: SystemInterfaces,
        }
    }
}

impl<S> AddressResolver<S>
where
    S: InterfaceSource,
{
    /// Creates a resolver over the given interface source.
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Resolves `spec` to a single address.
    ///
    /// An exact interface name wins over everything else. If that interface
    /// has no usable address the spec is tried as a wildcard and then as a
    /// CIDR range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSpec`] if the spec is not a known interface,
    /// wildcard or CIDR range, [`Error::NoMatchingInterface`] if no local
    /// address falls in the range, and [`Error::Enumerate`] if the interfaces
    /// cannot be listed.
    pub fn resolve(&self, spec: &str) -> Result<String> {
        let interfaces = self.source.interfaces()?;

        if let Some(interface) = interfaces.iter().find(|i| i.name == spec) {
            if let Some(address) = first_address_of(interface) {
                info!("resolved interface {spec} to {address}");
                return Ok(address.to_string());
            }

            debug!("interface {spec} has no usable address");
        }

        if WILDCARD_SPECS.contains(&spec) {
            return Ok(spec.to_string());
        }

        let network = parse_network(spec).ok_or_else(|| Error::InvalidSpec(spec.to_string()))?;

        if network.first_address().is_unspecified() {
            return Ok(spec.to_string());
        }

        let family = Family::of_network(&network);

        for interface in &interfaces {
            for literal in interface
                .addresses
                .iter()
                .filter(|a| Family::of_literal(a) == family)
            {
                let Some(address) = validate(literal) else {
                    continue;
                };

                if network.contains(&address) {
                    info!(
                        "resolved {spec} to {literal} on interface {}",
                        interface.name
                    );
                    return Ok(literal.clone());
                }
            }
        }

        Err(Error::NoMatchingInterface(spec.to_string()))
    }
}

/// First valid address of an interface, IPv4 before IPv6.
fn first_address_of(interface: &LocalInterface) -> Option<&str> {
    [Family::V4, Family::V6].into_iter().find_map(|family| {
        interface
            .addresses
            .iter()
            .filter(|a| Family::of_literal(a) == family)
            .find(|a| validate(a).is_some())
            .map(String::as_str)
    })
}

/// Strictly parses an address literal, logging the ones worth knowing about.
fn validate(literal: &str) -> Option<IpAddr> {
    match literal.parse::<IpAddr>() {
        Ok(address) => Some(address),
        Err(_) => {
            if !is_link_local(literal) {
                warn!(
                    "got an unexpected parse failure for address {literal}, continuing to search for a valid interface"
                );
            }
            None
        }
    }
}

/// Whether the literal is in `fe80::/10`, ignoring any zone suffix.
fn is_link_local(literal: &str) -> bool {
    let unscoped = literal.split('%').next().unwrap_or(literal);

    match unscoped.parse::<Ipv6Addr>() {
        Ok(address) => address.segments()[0] & 0xffc0 == 0xfe80,
        Err(_) => unscoped
            .get(..4)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("fe80")),
    }
}

/// Parses `address[/length]` into the network it belongs to.
///
/// Host bits are allowed, so `10.0.0.5/24` denotes `10.0.0.0/24`. A bare
/// address denotes a single-host network.
fn parse_network(spec: &str) -> Option<IpCidr> {
    let (address, length) = match spec.split_once('/') {
        Some((address, length)) => (address, Some(length)),
        None => (spec, None),
    };

    let address: IpAddr = address.parse().ok()?;
    let length = match length {
        Some(length) if !length.is_empty() && length.bytes().all(|b| b.is_ascii_digit()) => {
            length.parse().ok()?
        }
        Some(_) => return None,
        None if address.is_ipv4() => 32,
        None => 128,
    };

    IpInet::new(address, length).ok().map(|inet| inet.network())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::interfaces::StaticInterfaces;

    use assert_matches::assert_matches;
    use tracing_test::traced_test;

    fn resolver(source: StaticInterfaces) -> AddressResolver<StaticInterfaces> {
        AddressResolver::new(source)
    }

    fn host() -> StaticInterfaces {
        StaticInterfaces::new()
            .with_interface("lo", ["127.0.0.1", "::1"])
            .with_interface("eth0", ["10.0.0.5", "fe80::a00:27ff:fe4e:66a1%eth0"])
            .with_interface("eth1", ["192.168.1.20", "fd00::20"])
    }

    #[test]
    fn test_wildcards_pass_through() {
        let resolver = resolver(StaticInterfaces::new());

        for spec in ["0/0", "0.0.0.0/0", "0.0.0.0", "0.0.0.0/8", "::/0", "::"] {
            assert_eq!(resolver.resolve(spec).unwrap(), spec);
        }
    }

    #[test]
    fn test_cidr_containment() {
        let resolver = resolver(host());

        assert_eq!(resolver.resolve("10.0.0.0/24").unwrap(), "10.0.0.5");
        assert_eq!(resolver.resolve("192.168.0.0/16").unwrap(), "192.168.1.20");
        assert_eq!(resolver.resolve("fd00::/8").unwrap(), "fd00::20");
    }

    #[test]
    fn test_cidr_with_host_bits() {
        let resolver = resolver(host());

        assert_eq!(resolver.resolve("10.0.0.77/24").unwrap(), "10.0.0.5");
        assert_eq!(resolver.resolve("10.0.0.5").unwrap(), "10.0.0.5");
    }

    #[test]
    fn test_interface_name_wins_over_cidr() {
        let source = StaticInterfaces::new()
            .with_interface("eth0", ["10.0.0.5"])
            .with_interface("10.0.0.0/24", ["172.16.0.9"]);

        assert_eq!(resolver(source).resolve("10.0.0.0/24").unwrap(), "172.16.0.9");
    }

    #[test]
    fn test_interface_name_prefers_ipv4() {
        let source = StaticInterfaces::new().with_interface("eth0", ["fd00::5", "10.0.0.5"]);

        assert_eq!(resolver(source).resolve("eth0").unwrap(), "10.0.0.5");
    }

    #[test]
    fn test_interface_name_falls_back_to_ipv6() {
        let source = StaticInterfaces::new().with_interface("eth0", ["fd00::5"]);

        assert_eq!(resolver(source).resolve("eth0").unwrap(), "fd00::5");
    }

    #[test]
    fn test_unusable_interface_falls_through() {
        let source = StaticInterfaces::new().with_interface("0.0.0.0", ["fe80::1%0.0.0.0"]);

        assert_eq!(resolver(source).resolve("0.0.0.0").unwrap(), "0.0.0.0");
    }

    #[test]
    fn test_unusable_interface_then_invalid_spec() {
        let source = StaticInterfaces::new().with_interface("eth0", ["fe80::1%eth0"]);

        assert_matches!(resolver(source).resolve("eth0"), Err(Error::InvalidSpec(s)) if s == "eth0");
    }

    #[test]
    fn test_no_matching_interface() {
        assert_matches!(
            resolver(host()).resolve("192.168.99.0/24"),
            Err(Error::NoMatchingInterface(s)) if s == "192.168.99.0/24"
        );
    }

    #[test]
    fn test_family_must_match() {
        let source = StaticInterfaces::new().with_interface("eth0", ["10.0.0.5"]);

        assert_matches!(
            resolver(source).resolve("fd00::/8"),
            Err(Error::NoMatchingInterface(_))
        );
    }

    #[test]
    fn test_invalid_specs() {
        let resolver = resolver(host());

        for spec in ["", "eth9", "10.0.0.0/33", "10.0.0.0/", "10.0.0.0/+8", "10/8", "0/8"] {
            assert_matches!(resolver.resolve(spec), Err(Error::InvalidSpec(_)), "{spec}");
        }
    }

    #[traced_test]
    #[test]
    fn test_link_local_skipped_silently() {
        let source = StaticInterfaces::new()
            .with_interface("eth0", ["fe80::a00:27ff:fe4e:66a1%eth0", "fd00::5"]);

        assert_eq!(resolver(source).resolve("fd00::/8").unwrap(), "fd00::5");
        assert!(!logs_contain("unexpected parse failure"));
    }

    #[traced_test]
    #[test]
    fn test_invalid_literal_warns_and_continues() {
        let source = StaticInterfaces::new()
            .with_interface("eth0", ["10.0.0.999"])
            .with_interface("eth1", ["10.0.0.6"]);

        assert_eq!(resolver(source).resolve("10.0.0.0/24").unwrap(), "10.0.0.6");
        assert!(logs_contain("10.0.0.999"));
    }

    #[test]
    fn test_is_link_local() {
        assert!(is_link_local("fe80::1"));
        assert!(is_link_local("fe80::1%eth0"));
        assert!(is_link_local("FE80::1%eth0"));
        assert!(is_link_local("febf::1"));
        assert!(!is_link_local("fec0::1"));
        assert!(!is_link_local("fd00::1"));
        assert!(!is_link_local("10.0.0.1"));
    }

    #[test]
    fn test_system_resolves_loopback() {
        let resolver = AddressResolver::system();

        assert_eq!(resolver.resolve("127.0.0.0/8").unwrap(), "127.0.0.1");
        assert_eq!(resolver.resolve("0.0.0.0").unwrap(), "0.0.0.0");
    }
}
