pub mod hash;

use anyhow::Result;
use chrono::Utc;
use shared::types::{BrowseEntry, EntryView};
use tokio::sync::{mpsc, oneshot, watch};
use crate::mdns::handler::BrowseHandler;

/// Commands sent to the registry task
#[derive(Debug)]
pub enum RegistryCommand {
    Added(BrowseEntry),
    Removed(BrowseEntry),
    GetAll(oneshot::Sender<Vec<EntryView>>),
    GetInstance(String, oneshot::Sender<Vec<EntryView>>),
    Shutdown,
}

/// Handle to the registry task.
///
/// Plugs into a browse session as its [`BrowseHandler`]; notifications are
/// queued without blocking the session and applied in order.
#[derive(Clone)]
pub struct RegistryHandle {
    tx: mpsc::UnboundedSender<RegistryCommand>,
}

impl RegistryHandle {
    /// Spawn the registry task. The fingerprint of the entry list is
    /// published on `hash_tx` after every change.
    pub fn spawn(hash_tx: watch::Sender<String>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<RegistryCommand>();

        tokio::spawn(async move {
            let mut entries: Vec<EntryView> = Vec::new();

            while let Some(cmd) = rx.recv().await {
                match cmd {
                    RegistryCommand::Added(entry) => {
                        if !entries.iter().any(|v| same_entry(&v.entry, &entry)) {
                            entries.push(EntryView { entry, first_seen: Utc::now() });
                            hash_tx.send_replace(hash::compute_hash(&entries));
                        }
                    }
                    RegistryCommand::Removed(entry) => {
                        let before = entries.len();
                        entries.retain(|v| !same_entry(&v.entry, &entry));
                        if entries.len() != before {
                            hash_tx.send_replace(hash::compute_hash(&entries));
                        }
                    }
                    RegistryCommand::GetAll(reply) => {
                        let _ = reply.send(entries.clone());
                    }
                    RegistryCommand::GetInstance(instance, reply) => {
                        let matching = entries
                            .iter()
                            .filter(|v| v.entry.service_instance_name().eq_ignore_ascii_case(&instance))
                            .cloned()
                            .collect();
                        let _ = reply.send(matching);
                    }
                    RegistryCommand::Shutdown => {
                        tracing::info!("Entry registry shutting down");
                        break;
                    }
                }
            }
        });

        Self { tx }
    }

    /// All announced entries
    pub async fn get_all(&self) -> Result<Vec<EntryView>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(RegistryCommand::GetAll(reply))?;
        Ok(rx.await?)
    }

    /// Entries of one instance, by unescaped `<instance>.<service>.<domain>.`
    pub async fn get_instance(&self, instance: String) -> Result<Vec<EntryView>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(RegistryCommand::GetInstance(instance, reply))?;
        Ok(rx.await?)
    }

    /// Stop the registry task
    pub fn shutdown(&self) -> Result<()> {
        self.tx.send(RegistryCommand::Shutdown)?;
        Ok(())
    }
}

impl BrowseHandler for RegistryHandle {
    fn on_add(&mut self, entry: BrowseEntry) {
        if let Err(e) = self.tx.send(RegistryCommand::Added(entry)) {
            tracing::warn!("Registry gone, dropping add: {}", e);
        }
    }

    fn on_remove(&mut self, entry: BrowseEntry) {
        if let Err(e) = self.tx.send(RegistryCommand::Removed(entry)) {
            tracing::warn!("Registry gone, dropping remove: {}", e);
        }
    }
}

fn same_entry(a: &BrowseEntry, b: &BrowseEntry) -> bool {
    a.iface_name == b.iface_name
        && a.service_instance_name().eq_ignore_ascii_case(&b.service_instance_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_entry(name: &str, iface: &str) -> BrowseEntry {
        BrowseEntry {
            ips: vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))],
            host: "h.local.".to_string(),
            port: 80,
            iface_name: iface.to_string(),
            name: name.to_string(),
            service_type: "_http._tcp".to_string(),
            domain: "local".to_string(),
            text: HashMap::new(),
        }
    }

    fn spawn() -> (RegistryHandle, watch::Receiver<String>) {
        let (hash_tx, hash_rx) = watch::channel(hash::compute_hash(&[]));
        (RegistryHandle::spawn(hash_tx), hash_rx)
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let (mut registry, _hash_rx) = spawn();

        registry.on_add(test_entry("foo", "en0"));
        registry.on_add(test_entry("foo", "en1"));
        registry.on_add(test_entry("foo", "en0"));
        assert_eq!(registry.get_all().await.unwrap().len(), 2);

        registry.on_remove(test_entry("foo", "en0"));
        let remaining = registry.get_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].entry.iface_name, "en1");
    }

    #[tokio::test]
    async fn test_get_instance() {
        let (mut registry, _hash_rx) = spawn();
        registry.on_add(test_entry("foo", "en0"));
        registry.on_add(test_entry("bar", "en0"));

        let found = registry
            .get_instance("foo._http._tcp.local.".to_string())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entry.name, "foo");

        let missing = registry
            .get_instance("baz._http._tcp.local.".to_string())
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_hash_follows_changes() {
        let (mut registry, hash_rx) = spawn();
        let empty = hash_rx.borrow().clone();

        registry.on_add(test_entry("foo", "en0"));
        registry.get_all().await.unwrap();
        let with_foo = hash_rx.borrow().clone();
        assert_ne!(empty, with_foo);

        registry.on_remove(test_entry("foo", "en0"));
        registry.get_all().await.unwrap();
        assert_eq!(*hash_rx.borrow(), empty);
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let (registry, _hash_rx) = spawn();
        registry.shutdown().unwrap();
        assert!(registry.get_all().await.is_err());
    }
}
