use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use crate::error::{BrowseError, Result};

/// An IPv4 address with its netmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Net {
    pub addr: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

impl Ipv4Net {
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let mask = u32::from(self.netmask);
        u32::from(self.addr) & mask == u32::from(ip) & mask
    }
}

/// A network interface with all of its addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub name: String,
    pub index: Option<u32>,
    pub ipv4: Vec<Ipv4Net>,
    pub ipv6: Vec<Ipv6Addr>,
}

impl NetworkInterface {
    /// An interface with no addresses, identified only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
            ipv4: Vec::new(),
            ipv6: Vec::new(),
        }
    }

    /// Whether a datagram from `from` was received over this interface:
    /// IPv4 senders by subnet, IPv6 senders by scope id.
    pub fn owns(&self, from: &SocketAddr) -> bool {
        match from {
            SocketAddr::V4(v4) => self.ipv4.iter().any(|net| net.contains(*v4.ip())),
            SocketAddr::V6(v6) => {
                (v6.scope_id() != 0 && self.index == Some(v6.scope_id()))
                    || self.ipv6.contains(v6.ip())
            }
        }
    }
}

/// One address row as reported by the OS.
#[derive(Debug, Clone)]
struct Address {
    name: String,
    index: Option<u32>,
    ip: IpAddr,
    netmask: IpAddr,
    loopback: bool,
}

/// Non-loopback interfaces, restricted to `filter` when it is not empty.
pub fn resolve_interfaces(filter: &[String]) -> Result<Vec<NetworkInterface>> {
    let addresses = if_addrs::get_if_addrs()?
        .into_iter()
        .map(|iface| {
            let loopback = iface.is_loopback();
            let (ip, netmask) = match &iface.addr {
                if_addrs::IfAddr::V4(v4) => (IpAddr::V4(v4.ip), IpAddr::V4(v4.netmask)),
                if_addrs::IfAddr::V6(v6) => (IpAddr::V6(v6.ip), IpAddr::V6(v6.netmask)),
            };
            Address {
                name: iface.name,
                index: iface.index,
                ip,
                netmask,
                loopback,
            }
        })
        .collect();

    group(addresses, filter)
}

fn group(addresses: Vec<Address>, filter: &[String]) -> Result<Vec<NetworkInterface>> {
    let mut interfaces: Vec<NetworkInterface> = Vec::new();

    for address in addresses {
        if address.loopback {
            continue;
        }
        if !filter.is_empty() && !filter.contains(&address.name) {
            continue;
        }

        let pos = match interfaces.iter().position(|i| i.name == address.name) {
            Some(pos) => pos,
            None => {
                interfaces.push(NetworkInterface {
                    name: address.name.clone(),
                    index: address.index,
                    ipv4: Vec::new(),
                    ipv6: Vec::new(),
                });
                interfaces.len() - 1
            }
        };

        let iface = &mut interfaces[pos];
        if iface.index.is_none() {
            iface.index = address.index;
        }
        match (address.ip, address.netmask) {
            (IpAddr::V4(addr), IpAddr::V4(netmask)) => iface.ipv4.push(Ipv4Net { addr, netmask }),
            (IpAddr::V6(addr), _) => iface.ipv6.push(addr),
            _ => {}
        }
    }

    for name in filter {
        if !interfaces.iter().any(|i| &i.name == name) {
            tracing::warn!("Interface {} not found or not usable", name);
        }
    }

    if interfaces.is_empty() {
        return Err(BrowseError::NoInterfaces);
    }

    tracing::debug!(
        "Using interfaces: {}",
        interfaces.iter().map(|i| i.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    Ok(interfaces)
}
