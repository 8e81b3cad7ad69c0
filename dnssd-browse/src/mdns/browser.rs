use shared::types::BrowseEntry;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::task::TaskTracker;
use crate::cache::records::RecordCache;
use crate::context::{BrowseContext, StopReason};
use crate::error::{BrowseError, Result};
use crate::mdns::handler::BrowseHandler;
use crate::mdns::interfaces::NetworkInterface;
use crate::mdns::known_answer;
use crate::mdns::message;
use crate::mdns::reconcile::reconcile;
use crate::mdns::scheduler::QueryScheduler;
use crate::mdns::service_type::ServiceType;
use crate::mdns::transport::{QueryTask, Transport};

const TRIGGER_CHANNEL_CAPACITY: usize = 32;

/// Browse for `service` over `transport` until `ctx` is cancelled.
///
/// The record cache and the announced entries live on this task only. The
/// query scheduler and the transport's readers run as tasks scoped to this
/// call: they are stopped and awaited before it returns. If the returned
/// future is dropped early they are cancelled but not awaited.
///
/// Returns the context's stop reason on cancellation. Fails if the
/// transport's read stream ends on its own. Failed sends are logged.
pub async fn run<T, H>(
    ctx: &BrowseContext,
    service: &ServiceType,
    transport: &T,
    handler: &mut H,
    continuous: bool,
    interfaces: Vec<NetworkInterface>,
) -> Result<StopReason>
where
    T: Transport + ?Sized,
    H: BrowseHandler + ?Sized,
{
    tracing::info!(
        "Browsing for {} on {} interface(s){}",
        service,
        interfaces.len(),
        if continuous { " continuously" } else { "" }
    );

    let question = message::browse_query(service)?;
    let mut cache = RecordCache::new();
    let mut announced: Vec<BrowseEntry> = Vec::new();

    let session = ctx.token().child_token();
    let _stop_on_drop = session.clone().drop_guard();
    let tasks = TaskTracker::new();

    let (trigger_tx, mut triggers) = mpsc::channel(TRIGGER_CHANNEL_CAPACITY);
    tasks.spawn(QueryScheduler::new(continuous, interfaces).run(trigger_tx, session.clone()));
    let mut inbound = transport.read(&tasks, session.clone());
    tasks.close();

    let result = loop {
        tokio::select! {
            biased;

            _ = ctx.cancelled() => {
                break Ok(ctx.reason().unwrap_or(StopReason::Cancelled));
            }

            Some(trigger) = triggers.recv() => {
                let mut query = QueryTask::new(trigger.iface, question.clone());
                let answers = known_answer::select(&cache.snapshot(), service, Instant::now());
                tracing::debug!(
                    "Sending browse query on {} with {} known answer(s)",
                    query.iface_name(),
                    answers.len()
                );
                query.message.insert_answers(answers);

                if let Err(e) = transport.send_query(&query) {
                    tracing::warn!("Failed to send query on {}: {}", query.iface_name(), e);
                }
            }

            received = inbound.recv() => {
                let Some(msg) = received else {
                    break Err(BrowseError::ReadClosed);
                };
                tracing::debug!(
                    "Received message on {} from {} ({} answers, {} additionals)",
                    msg.iface,
                    msg.from,
                    msg.message.answers().len(),
                    msg.message.additionals().len()
                );

                cache.ingest(&msg);
                let diff = reconcile(&cache.snapshot(), service, std::mem::take(&mut announced));
                announced = diff.announced;

                for entry in diff.added {
                    tracing::info!("Added {} on {}", entry.service_instance_name(), entry.iface_name);
                    handler.on_add(entry);
                }
                for entry in diff.removed {
                    tracing::info!("Removed {} on {}", entry.service_instance_name(), entry.iface_name);
                    handler.on_remove(entry);
                }
            }
        }
    };

    session.cancel();
    tasks.wait().await;

    match &result {
        Ok(reason) => tracing::info!("Browsing for {} stopped: {}", service, reason),
        Err(e) => tracing::error!("Browsing for {} failed: {}", service, e),
    }
    result
}
