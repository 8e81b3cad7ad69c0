use std::net::{Ipv4Addr, Ipv6Addr};

/// Multicast DNS UDP port
pub const MDNS_PORT: u16 = 5353;

/// IPv4 mDNS link-local multicast group
pub const MDNS_IPV4_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// IPv6 mDNS link-local multicast group
pub const MDNS_IPV6_GROUP: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// Domain used when a service type is given without one
pub const DEFAULT_DOMAIN: &str = "local";

/// API path prefix
pub const API_PREFIX: &str = "/v1";
