use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::time::Duration;
use hickory_proto::op::MessageType;
use hickory_proto::rr::{RData, Record};
use tokio::time::Instant;
use crate::mdns::message::{InboundMessage, InstanceName};

/// A service instance assembled from PTR, SRV, TXT and address records.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRecord {
    /// Unescaped instance label
    pub name: String,
    /// `_service._proto`
    pub service_type: String,
    pub domain: String,
    pub host: String,
    pub port: u16,
    /// Addresses of `host`, keyed by the interface they were learned on
    pub iface_ips: BTreeMap<String, Vec<IpAddr>>,
    pub text: HashMap<String, String>,
    /// TTL and expiration of the earliest-expiring PTR, SRV or address record
    pub ttl: Duration,
    pub expiration: Instant,
}

impl ServiceRecord {
    /// `<instance>.<service>.<domain>.`
    pub fn service_instance_name(&self) -> String {
        format!("{}.{}.{}.", self.name, self.service_type, self.domain)
    }

    pub fn instance(&self) -> InstanceName {
        InstanceName {
            name: self.name.clone(),
            service: self.service_type.clone(),
            domain: self.domain.clone(),
        }
    }

    /// Lifetime left at `now`; zero once expired.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.expiration.saturating_duration_since(now)
    }
}

#[derive(Debug, Clone)]
struct Lifetime {
    ttl: Duration,
    expiration: Instant,
}

impl Lifetime {
    fn new(ttl_secs: u32, now: Instant) -> Self {
        let ttl = Duration::from_secs(u64::from(ttl_secs));
        Self { ttl, expiration: now + ttl }
    }

    fn alive(&self, now: Instant) -> bool {
        now <= self.expiration
    }
}

#[derive(Debug, Clone)]
struct Srv {
    host: String,
    port: u16,
    lifetime: Lifetime,
}

#[derive(Debug, Clone)]
struct Instance {
    id: InstanceName,
    ptr: Option<Lifetime>,
    srv: Option<Srv>,
    text: HashMap<String, String>,
}

impl Instance {
    /// PTR lifetime governs the instance; SRV stands in until a PTR is seen.
    fn lifetime(&self) -> Option<&Lifetime> {
        self.ptr.as_ref().or(self.srv.as_ref().map(|srv| &srv.lifetime))
    }

    fn alive(&self, now: Instant) -> bool {
        self.lifetime().is_some_and(|l| l.alive(now))
            && self.srv.as_ref().map_or(true, |srv| srv.lifetime.alive(now))
    }
}

/// Cache of instances and host addresses, fed from inbound responses.
///
/// Owned by exactly one browse loop; not shared across tasks.
#[derive(Debug, Default)]
pub struct RecordCache {
    instances: HashMap<String, Instance>,
    /// host (lowercase) -> interface -> address -> lifetime
    hosts: HashMap<String, BTreeMap<String, BTreeMap<IpAddr, Lifetime>>>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, inbound: &InboundMessage) {
        self.ingest_at(inbound, Instant::now());
    }

    /// Merge the records of a response received on `inbound.iface`.
    /// Queries are ignored; their answer sections hold other queriers'
    /// known answers, not authoritative data.
    pub fn ingest_at(&mut self, inbound: &InboundMessage, now: Instant) {
        self.purge(now);

        if inbound.message.message_type() != MessageType::Response {
            return;
        }

        let records = inbound
            .message
            .answers()
            .iter()
            .chain(inbound.message.name_servers())
            .chain(inbound.message.additionals());

        for record in records {
            self.apply(&inbound.iface, record, now);
        }
    }

    fn apply(&mut self, iface: &str, record: &Record, now: Instant) {
        let ttl = record.ttl();
        match record.data() {
            Some(RData::PTR(ptr)) => {
                let Some(id) = InstanceName::from_name(&ptr.0) else {
                    return;
                };
                let owner = record.name().to_ascii().to_lowercase();
                if owner != format!("{}.{}.", id.service, id.domain).to_lowercase() {
                    return;
                }
                if ttl == 0 {
                    tracing::debug!("Goodbye for {}", id.key());
                    self.instances.remove(&id.key());
                    return;
                }
                self.instance_mut(id).ptr = Some(Lifetime::new(ttl, now));
            }
            Some(RData::SRV(srv)) => {
                let Some(id) = InstanceName::from_name(record.name()) else {
                    return;
                };
                if ttl == 0 {
                    tracing::debug!("SRV goodbye for {}", id.key());
                    self.instances.remove(&id.key());
                    return;
                }
                self.instance_mut(id).srv = Some(Srv {
                    host: srv.target().to_ascii(),
                    port: srv.port(),
                    lifetime: Lifetime::new(ttl, now),
                });
            }
            Some(RData::TXT(txt)) => {
                let Some(id) = InstanceName::from_name(record.name()) else {
                    return;
                };
                if ttl == 0 {
                    return;
                }
                self.instance_mut(id).text = parse_txt(txt.txt_data());
            }
            Some(RData::A(a)) => self.apply_address(iface, record, IpAddr::V4(a.0), now),
            Some(RData::AAAA(aaaa)) => self.apply_address(iface, record, IpAddr::V6(aaaa.0), now),
            _ => {}
        }
    }

    fn apply_address(&mut self, iface: &str, record: &Record, ip: IpAddr, now: Instant) {
        let host = record.name().to_ascii().to_lowercase();
        if record.ttl() == 0 {
            if let Some(addrs) = self.hosts.get_mut(&host).and_then(|m| m.get_mut(iface)) {
                addrs.remove(&ip);
            }
            return;
        }
        self.hosts
            .entry(host)
            .or_default()
            .entry(iface.to_string())
            .or_default()
            .insert(ip, Lifetime::new(record.ttl(), now));
    }

    fn instance_mut(&mut self, id: InstanceName) -> &mut Instance {
        self.instances.entry(id.key()).or_insert_with(|| Instance {
            id,
            ptr: None,
            srv: None,
            text: HashMap::new(),
        })
    }

    fn purge(&mut self, now: Instant) {
        self.instances.retain(|_, instance| instance.alive(now));
        for ifaces in self.hosts.values_mut() {
            for addrs in ifaces.values_mut() {
                addrs.retain(|_, lifetime| lifetime.alive(now));
            }
            ifaces.retain(|_, addrs| !addrs.is_empty());
        }
        self.hosts.retain(|_, ifaces| !ifaces.is_empty());
    }

    pub fn snapshot(&self) -> Vec<ServiceRecord> {
        self.snapshot_at(Instant::now())
    }

    /// Complete (SRV-resolved), unexpired services at `now`, ordered by
    /// instance name.
    pub fn snapshot_at(&self, now: Instant) -> Vec<ServiceRecord> {
        let mut services: Vec<ServiceRecord> = self
            .instances
            .values()
            .filter(|instance| instance.alive(now))
            .filter_map(|instance| {
                let srv = instance.srv.as_ref()?;
                let lifetime = instance
                    .ptr
                    .iter()
                    .chain(std::iter::once(&srv.lifetime))
                    .chain(self.address_lifetimes(&srv.host, now))
                    .min_by_key(|lifetime| lifetime.expiration)?;
                Some(ServiceRecord {
                    name: instance.id.name.clone(),
                    service_type: instance.id.service.clone(),
                    domain: instance.id.domain.clone(),
                    host: srv.host.clone(),
                    port: srv.port,
                    iface_ips: self.addresses(&srv.host, now),
                    text: instance.text.clone(),
                    ttl: lifetime.ttl,
                    expiration: lifetime.expiration,
                })
            })
            .collect();

        services.sort_by(|a, b| a.service_instance_name().cmp(&b.service_instance_name()));
        services
    }

    fn address_lifetimes<'a>(&'a self, host: &str, now: Instant) -> impl Iterator<Item = &'a Lifetime> {
        self.hosts
            .get(&host.to_lowercase())
            .into_iter()
            .flat_map(|ifaces| ifaces.values())
            .flat_map(|addrs| addrs.values())
            .filter(move |lifetime| lifetime.alive(now))
    }

    fn addresses(&self, host: &str, now: Instant) -> BTreeMap<String, Vec<IpAddr>> {
        let Some(ifaces) = self.hosts.get(&host.to_lowercase()) else {
            return BTreeMap::new();
        };
        ifaces
            .iter()
            .map(|(iface, addrs)| {
                let ips: Vec<IpAddr> = addrs
                    .iter()
                    .filter(|(_, lifetime)| lifetime.alive(now))
                    .map(|(ip, _)| *ip)
                    .collect();
                (iface.clone(), ips)
            })
            .filter(|(_, ips)| !ips.is_empty())
            .collect()
    }
}

/// `key=value` strings; a bare `key` maps to an empty value and the first
/// occurrence of a key wins.
fn parse_txt(data: &[Box<[u8]>]) -> HashMap<String, String> {
    let mut text = HashMap::new();
    for item in data {
        let raw = String::from_utf8_lossy(item);
        let entry: &str = raw.as_ref();
        if entry.is_empty() {
            continue;
        }
        let (key, value) = entry.split_once('=').unwrap_or((entry, ""));
        if key.is_empty() {
            continue;
        }
        text.entry(key.to_string()).or_insert_with(|| value.to_string());
    }
    text
}
