use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6};
use std::sync::Arc;
use hickory_proto::op::Message;
use shared::protocol::{MDNS_IPV4_GROUP, MDNS_IPV6_GROUP, MDNS_PORT};
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use crate::error::{BrowseError, Result};
use crate::mdns::interfaces::NetworkInterface;
use crate::mdns::message::{self, InboundMessage};

/// Largest mDNS message we accept (RFC 6762 section 17).
const MDNS_BUFFER_SIZE: usize = 9000;

const READ_CHANNEL_CAPACITY: usize = 64;

/// Consecutive receive errors after which a reader gives up.
const MAX_RECV_ERRORS: u32 = 16;

/// An outgoing query bound to one interface.
#[derive(Debug, Clone)]
pub struct QueryTask {
    pub iface: NetworkInterface,
    pub message: Message,
}

impl QueryTask {
    pub fn new(iface: NetworkInterface, message: Message) -> Self {
        Self { iface, message }
    }

    pub fn iface_name(&self) -> &str {
        &self.iface.name
    }
}

/// Message transport used by a browse session.
pub trait Transport {
    /// Start receiving. Reader tasks are spawned on `tasks` and stop when
    /// `cancel` fires; the returned channel closes once all readers stop.
    fn read(&self, tasks: &TaskTracker, cancel: CancellationToken) -> mpsc::Receiver<InboundMessage>;

    /// Best-effort multicast of `query` on its interface.
    fn send_query(&self, query: &QueryTask) -> Result<()>;

    fn close(&self);
}

/// IPv4 and IPv6 mDNS sockets joined on a set of interfaces.
pub struct MulticastTransport {
    v4: Option<Arc<UdpSocket>>,
    v6: Option<Arc<UdpSocket>>,
    interfaces: Arc<Vec<NetworkInterface>>,
    closed: CancellationToken,
}

impl MulticastTransport {
    /// Open the sockets. Fails only if neither address family is usable.
    /// Must be called from within a tokio runtime.
    pub fn open(interfaces: &[NetworkInterface]) -> Result<Self> {
        let v4 = open_v4(interfaces)
            .map_err(|e| tracing::warn!("IPv4 mDNS socket unavailable: {}", e))
            .ok();
        let v6 = open_v6(interfaces)
            .map_err(|e| tracing::warn!("IPv6 mDNS socket unavailable: {}", e))
            .ok();

        if v4.is_none() && v6.is_none() {
            return Err(BrowseError::Transport(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no mDNS socket could be opened",
            )));
        }

        tracing::info!(
            "Opened mDNS transport (ipv4: {}, ipv6: {})",
            v4.is_some(),
            v6.is_some()
        );

        Ok(Self {
            v4: v4.map(Arc::new),
            v6: v6.map(Arc::new),
            interfaces: Arc::new(interfaces.to_vec()),
            closed: CancellationToken::new(),
        })
    }
}

impl Transport for MulticastTransport {
    fn read(&self, tasks: &TaskTracker, cancel: CancellationToken) -> mpsc::Receiver<InboundMessage> {
        let (tx, rx) = mpsc::channel(READ_CHANNEL_CAPACITY);
        for socket in [&self.v4, &self.v6].into_iter().flatten() {
            tasks.spawn(read_loop(
                Arc::clone(socket),
                Arc::clone(&self.interfaces),
                tx.clone(),
                cancel.clone(),
                self.closed.clone(),
            ));
        }
        rx
    }

    fn send_query(&self, query: &QueryTask) -> Result<()> {
        let bytes = message::encode(&query.message)?;
        let mut sent = false;
        let mut last_error = None;

        if let (Some(socket), Some(net)) = (&self.v4, query.iface.ipv4.first()) {
            match send_v4(socket, net.addr, &bytes) {
                Ok(()) => sent = true,
                Err(e) => last_error = Some(e),
            }
        }

        if let (Some(socket), Some(index), false) =
            (&self.v6, query.iface.index, query.iface.ipv6.is_empty())
        {
            match send_v6(socket, index, &bytes) {
                Ok(()) => sent = true,
                Err(e) => last_error = Some(e),
            }
        }

        match (sent, last_error) {
            (true, _) => Ok(()),
            (false, Some(e)) => Err(e.into()),
            (false, None) => Err(BrowseError::Transport(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no usable address on {}", query.iface_name()),
            ))),
        }
    }

    fn close(&self) {
        self.closed.cancel();
    }
}

fn send_v4(socket: &UdpSocket, iface_addr: Ipv4Addr, bytes: &[u8]) -> io::Result<()> {
    SockRef::from(socket).set_multicast_if_v4(&iface_addr)?;
    socket.try_send_to(bytes, SocketAddr::from((MDNS_IPV4_GROUP, MDNS_PORT)))?;
    Ok(())
}

fn send_v6(socket: &UdpSocket, index: u32, bytes: &[u8]) -> io::Result<()> {
    SockRef::from(socket).set_multicast_if_v6(index)?;
    let group = SocketAddrV6::new(MDNS_IPV6_GROUP, MDNS_PORT, 0, index);
    socket.try_send_to(bytes, SocketAddr::V6(group))?;
    Ok(())
}

fn reusable_socket(domain: Domain) -> io::Result<Socket> {
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

fn open_v4(interfaces: &[NetworkInterface]) -> io::Result<UdpSocket> {
    let socket = reusable_socket(Domain::IPV4)?;
    socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, MDNS_PORT)).into())?;
    socket.set_multicast_ttl_v4(255)?;
    socket.set_multicast_loop_v4(true)?;

    let mut joined = 0;
    for iface in interfaces {
        let Some(net) = iface.ipv4.first() else {
            continue;
        };
        match socket.join_multicast_v4(&MDNS_IPV4_GROUP, &net.addr) {
            Ok(()) => joined += 1,
            Err(e) => tracing::warn!("Failed to join {} on {}: {}", MDNS_IPV4_GROUP, iface.name, e),
        }
    }
    if joined == 0 {
        return Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "no IPv4 interface joined"));
    }

    UdpSocket::from_std(socket.into())
}

fn open_v6(interfaces: &[NetworkInterface]) -> io::Result<UdpSocket> {
    let socket = reusable_socket(Domain::IPV6)?;
    socket.set_only_v6(true)?;
    socket.bind(&SocketAddr::from((Ipv6Addr::UNSPECIFIED, MDNS_PORT)).into())?;
    socket.set_multicast_hops_v6(255)?;
    socket.set_multicast_loop_v6(true)?;

    let mut joined = 0;
    for iface in interfaces {
        let Some(index) = iface.index.filter(|_| !iface.ipv6.is_empty()) else {
            continue;
        };
        match socket.join_multicast_v6(&MDNS_IPV6_GROUP, index) {
            Ok(()) => joined += 1,
            Err(e) => tracing::warn!("Failed to join {} on {}: {}", MDNS_IPV6_GROUP, iface.name, e),
        }
    }
    if joined == 0 {
        return Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "no IPv6 interface joined"));
    }

    UdpSocket::from_std(socket.into())
}

async fn read_loop(
    socket: Arc<UdpSocket>,
    interfaces: Arc<Vec<NetworkInterface>>,
    tx: mpsc::Sender<InboundMessage>,
    cancel: CancellationToken,
    closed: CancellationToken,
) {
    let mut buf = vec![0u8; MDNS_BUFFER_SIZE];
    let mut errors = 0u32;

    loop {
        let received = tokio::select! {
            received = socket.recv_from(&mut buf) => received,
            _ = cancel.cancelled() => break,
            _ = closed.cancelled() => break,
        };

        let (len, from) = match received {
            Ok(received) => {
                errors = 0;
                received
            }
            Err(e) => {
                errors += 1;
                tracing::warn!("mDNS receive error ({}/{}): {}", errors, MAX_RECV_ERRORS, e);
                if errors >= MAX_RECV_ERRORS {
                    break;
                }
                continue;
            }
        };

        let Some(iface) = interfaces.iter().find(|iface| iface.owns(&from)) else {
            tracing::trace!("Ignoring datagram from {} outside browsed interfaces", from);
            continue;
        };

        let message = match message::decode(&buf[..len]) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Dropping malformed message from {}: {}", from, e);
                continue;
            }
        };

        let inbound = InboundMessage::new(iface.name.clone(), from, message);
        tokio::select! {
            sent = tx.send(inbound) => {
                if sent.is_err() {
                    break;
                }
            }
            _ = cancel.cancelled() => break,
        }
    }

    tracing::debug!("mDNS reader on {:?} stopped", socket.local_addr().ok());
}
