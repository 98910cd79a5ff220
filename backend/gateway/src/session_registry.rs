//! Connected client registry.
//!
//! Tracks connected clients and routes events to them.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::ws_protocol::{ClientId, ServerEvent};

pub type ClientSender = mpsc::UnboundedSender<ServerEvent>;

/// Manages the outbound queues of connected clients.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<ClientId, ClientSender>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, client_id: ClientId, sender: ClientSender) {
        let mut w = self.clients.write().await;
        w.insert(client_id, sender);
    }

    pub async fn unregister(&self, client_id: &ClientId) {
        let mut w = self.clients.write().await;
        w.remove(client_id);
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn sender(&self, client_id: &ClientId) -> Option<ClientSender> {
        self.clients.read().await.get(client_id).cloned()
    }

    /// Send to one client. Returns false if it is gone.
    pub async fn send_to(&self, client_id: &ClientId, event: ServerEvent) -> bool {
        let r = self.clients.read().await;
        if let Some(sender) = r.get(client_id) {
            sender.send(event).is_ok()
        } else {
            false
        }
    }

    /// Send to every client.
    pub async fn broadcast(&self, event: ServerEvent) {
        let r = self.clients.read().await;
        for sender in r.values() {
            let _ = sender.send(event.clone());
        }
    }

    /// Send to every client except `sender_id`.
    pub async fn broadcast_except(&self, sender_id: &ClientId, event: ServerEvent) {
        let r = self.clients.read().await;
        for (id, sender) in r.iter() {
            if id != sender_id {
                let _ = sender.send(event.clone());
            }
        }
    }
}
