use crate::context::{BrowseContext, StopReason};
use crate::error::Result;
use crate::mdns::browser;
use crate::mdns::handler::BrowseHandler;
use crate::mdns::interfaces::resolve_interfaces;
use crate::mdns::service_type::ServiceType;
use crate::mdns::transport::{MulticastTransport, Transport};

/// Parameters of a browse session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseOptions {
    /// Service type, e.g. `_http._tcp` or `_http._tcp.local.`
    pub service: String,
    /// Keep re-querying with exponential backoff instead of querying once
    pub continuous: bool,
    /// Interface names to browse on; empty means all
    pub interfaces: Vec<String>,
}

impl BrowseOptions {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            continuous: false,
            interfaces: Vec::new(),
        }
    }
}

/// Browse according to `options` until `ctx` is cancelled.
///
/// Invalid service types, missing interfaces and sockets that cannot be
/// opened are reported before any query is sent.
pub async fn browse<H>(ctx: &BrowseContext, options: &BrowseOptions, handler: &mut H) -> Result<StopReason>
where
    H: BrowseHandler + ?Sized,
{
    let service = ServiceType::parse(&options.service)?;
    let interfaces = resolve_interfaces(&options.interfaces)?;
    let transport = MulticastTransport::open(&interfaces)?;

    let result = browser::run(ctx, &service, &transport, handler, options.continuous, interfaces).await;
    transport.close();
    result
}

/// Query once on all interfaces, then keep listening until cancelled.
pub async fn lookup_type<H>(ctx: &BrowseContext, service: &str, handler: &mut H) -> Result<StopReason>
where
    H: BrowseHandler + ?Sized,
{
    browse(ctx, &BrowseOptions::new(service), handler).await
}

/// Like [`lookup_type`], restricted to the named interfaces.
pub async fn lookup_type_at_interfaces<H>(
    ctx: &BrowseContext,
    service: &str,
    handler: &mut H,
    interfaces: &[&str],
) -> Result<StopReason>
where
    H: BrowseHandler + ?Sized,
{
    let options = BrowseOptions {
        interfaces: interfaces.iter().map(|name| name.to_string()).collect(),
        ..BrowseOptions::new(service)
    };
    browse(ctx, &options, handler).await
}

/// Query on all interfaces with exponential backoff until cancelled.
pub async fn lookup_type_continuously<H>(
    ctx: &BrowseContext,
    service: &str,
    handler: &mut H,
) -> Result<StopReason>
where
    H: BrowseHandler + ?Sized,
{
    let options = BrowseOptions {
        continuous: true,
        ..BrowseOptions::new(service)
    };
    browse(ctx, &options, handler).await
}
