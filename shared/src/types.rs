use std::collections::HashMap;
use std::net::IpAddr;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// A discovered service instance as seen on one network interface.
///
/// One entry exists per (instance name, interface) pair; the same instance
/// reachable over two interfaces yields two entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseEntry {
    /// Addresses of the instance's host that are valid on `iface_name`
    pub ips: Vec<IpAddr>,

    /// Target host, e.g. "nas.local."
    pub host: String,

    /// Service port
    pub port: u16,

    /// Interface the instance was discovered on, e.g. "en0"
    pub iface_name: String,

    /// Unescaped instance label, e.g. "Living Room"
    pub name: String,

    /// Service type, e.g. "_http._tcp"
    pub service_type: String,

    /// Domain, e.g. "local"
    pub domain: String,

    /// TXT record key-value pairs
    pub text: HashMap<String, String>,
}

impl BrowseEntry {
    /// Instance name in the form `<instance>.<service>.<domain>.` with the
    /// instance label escaped, suitable for protocol messages.
    pub fn escaped_service_instance_name(&self) -> String {
        format!("{}.{}.{}.", escape_label(&self.name), self.service_type, self.domain)
    }

    /// Same as [`escaped_service_instance_name`](Self::escaped_service_instance_name)
    /// without escape characters, for display.
    pub fn service_instance_name(&self) -> String {
        format!("{}.{}.{}.", self.name, self.service_type, self.domain)
    }
}

/// An entry together with the time it was first announced.
/// This is the shape served to external consumers of a browse session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: BrowseEntry,

    /// First time this entry was announced
    pub first_seen: DateTime<Utc>,
}

/// Escape characters that would otherwise split or end a DNS label.
pub fn escape_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if matches!(c, '\\' | '.' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn test_entry(name: &str) -> BrowseEntry {
        BrowseEntry {
            ips: vec![IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))],
            host: "nas.local.".to_string(),
            port: 8080,
            iface_name: "en0".to_string(),
            name: name.to_string(),
            service_type: "_http._tcp".to_string(),
            domain: "local".to_string(),
            text: HashMap::new(),
        }
    }

    #[test]
    fn test_instance_names() {
        let entry = test_entry("Living Room 2.0");
        assert_eq!(entry.service_instance_name(), "Living Room 2.0._http._tcp.local.");
        assert_eq!(
            entry.escaped_service_instance_name(),
            "Living\\ Room\\ 2\\.0._http._tcp.local."
        );
    }

    #[test]
    fn test_escape_backslash() {
        assert_eq!(escape_label("a\\b"), "a\\\\b");
        assert_eq!(escape_label("plain"), "plain");
    }

    #[test]
    fn test_entry_view_flattens() {
        let view = EntryView { entry: test_entry("foo"), first_seen: Utc::now() };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["name"], "foo");
        assert_eq!(json["iface_name"], "en0");
        assert!(json.get("first_seen").is_some());
    }
}
