use std::net::SocketAddr;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::PTR;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use crate::error::Result;
use crate::mdns::service_type::ServiceType;

/// A decoded message tagged with the interface it arrived on.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub iface: String,
    pub from: SocketAddr,
    pub message: Message,
}

impl InboundMessage {
    pub fn new(iface: impl Into<String>, from: SocketAddr, message: Message) -> Self {
        Self { iface: iface.into(), from, message }
    }
}

/// The three parts of a service instance name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceName {
    /// Unescaped instance label
    pub name: String,
    /// `_service._proto`
    pub service: String,
    pub domain: String,
}

impl InstanceName {
    /// Split `<instance>.<_service>.<_proto>.<domain...>`.
    /// Returns `None` for names that are not service instance names.
    pub fn from_name(name: &Name) -> Option<Self> {
        let labels: Vec<String> = name
            .iter()
            .map(|label| String::from_utf8_lossy(label).into_owned())
            .collect();

        if labels.len() < 4 || !labels[1].starts_with('_') || !labels[2].starts_with('_') {
            return None;
        }

        Some(Self {
            name: labels[0].clone(),
            service: labels[1..3].join("."),
            domain: labels[3..].join("."),
        })
    }

    /// Lowercased `<instance>.<service>.<domain>.`, used as a cache key.
    pub fn key(&self) -> String {
        format!("{}.{}.{}.", self.name, self.service, self.domain).to_lowercase()
    }

    fn to_name(&self) -> Result<Name> {
        let mut labels: Vec<&[u8]> = vec![self.name.as_bytes()];
        labels.extend(self.service.split('.').map(str::as_bytes));
        labels.extend(self.domain.split('.').map(str::as_bytes));
        Ok(Name::from_labels(labels)?)
    }
}

/// Build the PTR question used to browse for `service`.
pub fn browse_query(service: &ServiceType) -> Result<Message> {
    let mut query = Query::query(Name::from_ascii(service.fqdn())?, RecordType::PTR);
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new();
    message
        .set_id(0)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(false)
        .add_query(query);
    Ok(message)
}

/// PTR record pointing from the service type to one of its instances.
pub fn instance_ptr(service: &ServiceType, instance: &InstanceName, ttl: u32) -> Result<Record> {
    let owner = Name::from_ascii(service.fqdn())?;
    let mut record = Record::from_rdata(owner, ttl, RData::PTR(PTR(instance.to_name()?)));
    record.set_dns_class(DNSClass::IN);
    Ok(record)
}

pub fn encode(message: &Message) -> Result<Vec<u8>> {
    Ok(message.to_vec()?)
}

pub fn decode(bytes: &[u8]) -> Result<Message> {
    Ok(Message::from_vec(bytes)?)
}
