#![allow(dead_code)]

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use hickory_proto::op::{Message, MessageType};
use hickory_proto::rr::rdata::{A, PTR, SRV, TXT};
use hickory_proto::rr::{Name, RData, Record};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use dnssd_browse::mdns::message::InboundMessage;
use dnssd_browse::mdns::transport::{QueryTask, Transport};
use dnssd_browse::{BrowseEntry, BrowseError, FnHandler, Result};

/// Transport fed from a test-held channel; records every query sent.
pub struct FakeTransport {
    source: Mutex<Option<mpsc::Receiver<InboundMessage>>>,
    sent: mpsc::UnboundedSender<QueryTask>,
    fail_sends: bool,
    pub reader_alive: Arc<AtomicBool>,
}

impl FakeTransport {
    pub fn new(fail_sends: bool) -> (Self, mpsc::Sender<InboundMessage>, mpsc::UnboundedReceiver<QueryTask>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(16);
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let transport = Self {
            source: Mutex::new(Some(inbound_rx)),
            sent: sent_tx,
            fail_sends,
            reader_alive: Arc::new(AtomicBool::new(false)),
        };
        (transport, inbound_tx, sent_rx)
    }
}

impl Transport for FakeTransport {
    fn read(&self, tasks: &TaskTracker, cancel: CancellationToken) -> mpsc::Receiver<InboundMessage> {
        let mut source = self.source.lock().unwrap().take().expect("read called twice");
        let alive = Arc::clone(&self.reader_alive);
        let (tx, rx) = mpsc::channel(16);

        alive.store(true, Ordering::SeqCst);
        tasks.spawn(async move {
            loop {
                tokio::select! {
                    msg = source.recv() => match msg {
                        Some(msg) => {
                            if tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                    _ = cancel.cancelled() => break,
                }
            }
            alive.store(false, Ordering::SeqCst);
        });
        rx
    }

    fn send_query(&self, query: &QueryTask) -> Result<()> {
        let _ = self.sent.send(query.clone());
        if self.fail_sends {
            return Err(BrowseError::Transport(io::Error::new(
                io::ErrorKind::NetworkUnreachable,
                "network is unreachable",
            )));
        }
        Ok(())
    }

    fn close(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Add(String, String),
    Remove(String, String),
}

pub fn add(name: &str, iface: &str) -> Event {
    Event::Add(name.to_string(), iface.to_string())
}

pub fn remove(name: &str, iface: &str) -> Event {
    Event::Remove(name.to_string(), iface.to_string())
}

/// Handler forwarding events to a channel.
pub fn recording_handler() -> (
    FnHandler<impl FnMut(BrowseEntry), impl FnMut(BrowseEntry)>,
    mpsc::UnboundedReceiver<Event>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let add_tx = tx.clone();
    let handler = FnHandler::new(
        move |e: BrowseEntry| {
            let _ = add_tx.send(Event::Add(e.name, e.iface_name));
        },
        move |e: BrowseEntry| {
            let _ = tx.send(Event::Remove(e.name, e.iface_name));
        },
    );
    (handler, rx)
}

fn name(s: &str) -> Name {
    Name::from_ascii(s).unwrap()
}

/// Response announcing `<instance>._http._tcp.local.` with one address.
pub fn announcement(instance: &str, ip: Ipv4Addr, ttl: u32) -> Message {
    announcement_with_ttls(instance, ip, ttl, ttl)
}

/// Like [`announcement`], with a PTR TTL separate from the SRV, TXT and
/// address TTL.
pub fn announcement_with_ttls(instance: &str, ip: Ipv4Addr, ptr_ttl: u32, ttl: u32) -> Message {
    let fqdn = format!("{}._http._tcp.local.", instance);
    let host = format!("{}-host.local.", instance);
    let mut message = Message::new();
    message.set_message_type(MessageType::Response);
    message.add_answer(Record::from_rdata(
        name("_http._tcp.local."),
        ptr_ttl,
        RData::PTR(PTR(name(&fqdn))),
    ));
    message.add_additional(Record::from_rdata(
        name(&fqdn),
        ttl,
        RData::SRV(SRV::new(0, 0, 80, name(&host))),
    ));
    message.add_additional(Record::from_rdata(
        name(&fqdn),
        ttl,
        RData::TXT(TXT::new(vec!["path=/".to_string()])),
    ));
    message.add_additional(Record::from_rdata(name(&host), ttl, RData::A(A(ip))));
    message
}

/// Response withdrawing `<instance>._http._tcp.local.`
pub fn goodbye(instance: &str) -> Message {
    let mut message = Message::new();
    message.set_message_type(MessageType::Response);
    message.add_answer(Record::from_rdata(
        name("_http._tcp.local."),
        0,
        RData::PTR(PTR(name(&format!("{}._http._tcp.local.", instance)))),
    ));
    message
}

pub fn inbound(iface: &str, message: Message) -> InboundMessage {
    InboundMessage::new(iface, SocketAddr::from(([192, 168, 1, 20], 5353)), message)
}

/// PTR targets (instance labels) in a query's answer section.
pub fn known_answers(query: &QueryTask) -> Vec<String> {
    query
        .message
        .answers()
        .iter()
        .filter_map(|r| match r.data() {
            Some(RData::PTR(ptr)) => ptr.0.iter().next().map(|l| String::from_utf8_lossy(l).into_owned()),
            _ => None,
        })
        .collect()
}
