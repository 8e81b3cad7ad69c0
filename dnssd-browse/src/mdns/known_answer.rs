use hickory_proto::rr::Record;
use tokio::time::Instant;
use crate::cache::records::ServiceRecord;
use crate::mdns::message;
use crate::mdns::service_type::ServiceType;

/// PTR records for instances of `service` we already know and that are
/// still fresh: more than half of their TTL remains. Stale ones are left
/// out so responders refresh them. Ordered by instance name.
pub fn select(snapshot: &[ServiceRecord], service: &ServiceType, now: Instant) -> Vec<Record> {
    let mut fresh: Vec<&ServiceRecord> = snapshot
        .iter()
        .filter(|srv| service.matches(&srv.service_type, &srv.domain))
        .filter(|srv| srv.remaining(now) > srv.ttl / 2)
        .collect();
    fresh.sort_by_key(|srv| srv.service_instance_name());

    fresh
        .into_iter()
        .filter_map(|srv| {
            let ttl = u32::try_from(srv.remaining(now).as_secs()).unwrap_or(u32::MAX);
            match message::instance_ptr(service, &srv.instance(), ttl) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping known answer {}: {}", srv.service_instance_name(), e);
                    None
                }
            }
        })
        .collect()
}
