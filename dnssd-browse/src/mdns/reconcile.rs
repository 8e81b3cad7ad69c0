use std::net::IpAddr;
use shared::types::BrowseEntry;
use crate::cache::records::ServiceRecord;
use crate::mdns::service_type::ServiceType;

/// Outcome of one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reconciliation {
    /// The announced set after this pass
    pub announced: Vec<BrowseEntry>,
    pub added: Vec<BrowseEntry>,
    pub removed: Vec<BrowseEntry>,
}

/// Compare `announced` with `snapshot` for one service type.
///
/// An entry exists per (instance, interface) on which the instance has
/// addresses. Additions are (instance, interface) pairs in the snapshot
/// but not yet announced; removals are announced pairs the snapshot no
/// longer resolves on that interface. Changes to port, host or TXT data
/// of an already announced pair are not reported.
pub fn reconcile(
    snapshot: &[ServiceRecord],
    service: &ServiceType,
    announced: Vec<BrowseEntry>,
) -> Reconciliation {
    let matching: Vec<&ServiceRecord> = snapshot
        .iter()
        .filter(|srv| service.matches(&srv.service_type, &srv.domain))
        .collect();

    let mut added = Vec::new();
    for srv in &matching {
        let fqdn = srv.service_instance_name();
        for (iface, ips) in &srv.iface_ips {
            if ips.is_empty() {
                continue;
            }
            let known = announced
                .iter()
                .chain(added.iter())
                .any(|e| same_instance(e, &fqdn) && e.iface_name == *iface);
            if !known {
                added.push(entry_for(srv, iface, ips));
            }
        }
    }

    let (mut kept, removed): (Vec<_>, Vec<_>) = announced.into_iter().partition(|e| {
        let fqdn = e.service_instance_name();
        matching.iter().any(|srv| {
            srv.service_instance_name().eq_ignore_ascii_case(&fqdn)
                && srv.iface_ips.get(&e.iface_name).is_some_and(|ips| !ips.is_empty())
        })
    });

    kept.extend(added.iter().cloned());

    Reconciliation {
        announced: kept,
        added,
        removed,
    }
}

fn same_instance(entry: &BrowseEntry, fqdn: &str) -> bool {
    entry.service_instance_name().eq_ignore_ascii_case(fqdn)
}

fn entry_for(srv: &ServiceRecord, iface: &str, ips: &[IpAddr]) -> BrowseEntry {
    BrowseEntry {
        ips: ips.to_vec(),
        host: srv.host.clone(),
        port: srv.port,
        iface_name: iface.to_string(),
        name: srv.name.clone(),
        service_type: srv.service_type.clone(),
        domain: srv.domain.clone(),
        text: srv.text.clone(),
    }
}
