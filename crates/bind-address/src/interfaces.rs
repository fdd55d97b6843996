use std::net::IpAddr;

use tracing::trace;

use crate::error::{Error, Result};

/// A local network interface and the address literals configured on it.
///
/// Addresses are kept as text, in the order the operating system reports
/// them, because the resolver validates them strictly before use. Scoped
/// IPv6 addresses carry their zone, e.g. `fe80::1%eth0`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalInterface {
    /// Interface name, e.g. `eth0`.
    pub name: String,

    /// Address literals configured on the interface.
    pub addresses: Vec<String>,
}

impl LocalInterface {
    /// Creates an interface entry.
    pub fn new<I, A>(name: impl Into<String>, addresses: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            name: name.into(),
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }
}

/// Something that can list the local network interfaces.
pub trait InterfaceSource {
    /// Lists the interfaces, each with all of its addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the interfaces cannot be enumerated.
    fn interfaces(&self) -> Result<Vec<LocalInterface>>;
}

/// Lists the interfaces of the running host that are up.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> Result<Vec<LocalInterface>> {
        let mut interfaces: Vec<LocalInterface> = Vec::new();

        for interface in netif::up().map_err(Error::Enumerate)? {
            let address = match (interface.address(), interface.scope_id()) {
                (IpAddr::V6(addr), Some(scope)) if scope != 0 => {
                    format!("{addr}%{}", interface.name())
                }
                (addr, _) => addr.to_string(),
            };

            trace!("found address {} on {}", address, interface.name());

            match interfaces.iter_mut().find(|i| i.name == interface.name()) {
                Some(existing) => existing.addresses.push(address),
                None => interfaces.push(LocalInterface::new(interface.name(), [address])),
            }
        }

        Ok(interfaces)
    }
}

/// A fixed interface table.
///
/// Useful when the host layout is already known, and in tests.
#[derive(Clone, Debug, Default)]
pub struct StaticInterfaces {
    interfaces: Vec<LocalInterface>,
}

impl StaticInterfaces {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            interfaces: Vec::new(),
        }
    }

    /// Adds an interface with the given addresses.
    #[must_use]
    pub fn with_interface<I, A>(mut self, name: &str, addresses: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.interfaces.push(LocalInterface::new(name, addresses));
        self
    }
}

impl From<Vec<LocalInterface>> for StaticInterfaces {
    fn from(interfaces: Vec<LocalInterface>) -> Self {
        Self { interfaces }
    }
}

impl InterfaceSource for StaticInterfaces {
    fn interfaces(&self) -> Result<Vec<LocalInterface>> {
        Ok(self.interfaces.clone())
    }
}

impl<S: InterfaceSource + ?Sized> InterfaceSource for &S {
    fn interfaces(&self) -> Result<Vec<LocalInterface>> {
        (**self).interfaces()
    }
}
