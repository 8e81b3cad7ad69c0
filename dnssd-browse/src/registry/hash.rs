use std::collections::BTreeMap;
use std::net::IpAddr;
use serde::Serialize;
use sha2::{Sha256, Digest};
use shared::types::EntryView;

/// Hash only what identifies and describes an entry; `first_seen` is
/// excluded so re-announcing the same set yields the same fingerprint.
#[derive(Serialize)]
struct HashView<'a> {
    name: &'a str,
    service_type: &'a str,
    domain: &'a str,
    iface_name: &'a str,
    host: &'a str,
    port: u16,
    ips: Vec<IpAddr>,
    text: BTreeMap<&'a str, &'a str>,
}

/// SHA-256 fingerprint of the entry list, independent of input order.
pub fn compute_hash(entries: &[EntryView]) -> String {
    let mut views: Vec<HashView<'_>> = entries
        .iter()
        .map(|view| {
            let e = &view.entry;
            let mut ips = e.ips.clone();
            ips.sort();
            HashView {
                name: &e.name,
                service_type: &e.service_type,
                domain: &e.domain,
                iface_name: &e.iface_name,
                host: &e.host,
                port: e.port,
                ips,
                text: e.text.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect(),
            }
        })
        .collect();
    views.sort_by(|a, b| (a.name, a.iface_name).cmp(&(b.name, b.iface_name)));

    let json = serde_json::to_string(&views)
        .expect("Failed to serialize entries for hashing");

    let hash = Sha256::digest(json.as_bytes());
    hex::encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::Ipv4Addr;
    use chrono::Utc;
    use shared::types::BrowseEntry;

    fn test_view(name: &str, iface: &str) -> EntryView {
        EntryView {
            entry: BrowseEntry {
                ips: vec![IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))],
                host: "test.local.".to_string(),
                port: 8080,
                iface_name: iface.to_string(),
                name: name.to_string(),
                service_type: "_http._tcp".to_string(),
                domain: "local".to_string(),
                text: HashMap::from([
                    ("path".to_string(), "/api".to_string()),
                    ("v".to_string(), "2".to_string()),
                ]),
            },
            first_seen: Utc::now(),
        }
    }

    #[test]
    fn test_hash_deterministic() {
        let a = test_view("a", "en0");
        let b = test_view("b", "en0");
        let b1 = test_view("b", "en1");

        let hash1 = compute_hash(&[a.clone(), b.clone(), b1.clone()]);
        let hash2 = compute_hash(&[b1, b, a]);

        assert_eq!(hash1, hash2, "Hash should be same regardless of input order");
    }

    #[test]
    fn test_hash_changes_on_modification() {
        let view1 = test_view("a", "en0");
        let mut view2 = test_view("a", "en0");

        let hash1 = compute_hash(&[view1]);

        view2.entry.port = 9090;
        let hash2 = compute_hash(&[view2]);

        assert_ne!(hash1, hash2, "Hash should change when entry changes");
    }

    #[test]
    fn test_hash_stable_across_timestamps() {
        let view1 = test_view("a", "en0");
        let mut view2 = test_view("a", "en0");
        view2.first_seen = Utc::now() - chrono::Duration::seconds(60);

        assert_eq!(compute_hash(&[view1]), compute_hash(&[view2]));
    }

    #[test]
    fn test_empty_list_has_stable_hash() {
        assert_eq!(compute_hash(&[]), compute_hash(&[]));
        assert_eq!(compute_hash(&[]).len(), 64);
    }
}
