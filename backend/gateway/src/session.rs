//! The whiteboard session shared by every connected client.
//!
//! Owns the shape store and the run driver. Instructions go through the
//! driver's run slot, so at most one runs at a time; direct edits are applied
//! immediately, last writer wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use whiteboard_agent::{RunDriver, RunOutcome};
use whiteboard_core::{Shape, ShapeStore, ShapeUpdate};

use crate::session_registry::{ClientRegistry, ClientSender};
use crate::ws_protocol::{ClientEvent, ClientId, CursorPosition, CursorRelay, ServerEvent};

/// Sent to a client whose instruction arrives while another is running.
pub const BUSY_NOTICE: &str = "A command is already running";

pub struct Session {
    store: Arc<RwLock<ShapeStore>>,
    driver: RunDriver,
    clients: ClientRegistry,
    started_at: DateTime<Utc>,
}

impl Session {
    /// `store` must be the same store the driver was connected with.
    pub fn new(store: Arc<RwLock<ShapeStore>>, driver: RunDriver) -> Arc<Self> {
        Arc::new(Self {
            store,
            driver,
            clients: ClientRegistry::new(),
            started_at: Utc::now(),
        })
    }

    pub fn store(&self) -> &Arc<RwLock<ShapeStore>> {
        &self.store
    }

    pub fn driver(&self) -> &RunDriver {
        &self.driver
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Register a client, send it the canvas, and announce it to the others.
    ///
    /// The snapshot is read after registering, so any edit whose delta the
    /// client misses is already in it.
    pub async fn join(&self, client_id: ClientId, sender: ClientSender) {
        self.clients.register(client_id, sender.clone()).await;
        let snapshot = self.snapshot().await;
        let _ = sender.send(ServerEvent::Snapshot(snapshot));
        self.clients
            .broadcast_except(&client_id, ServerEvent::UserEntered(client_id))
            .await;
        info!(client_id = %client_id, "Client joined");
    }

    pub async fn leave(&self, client_id: ClientId) {
        self.clients.unregister(&client_id).await;
        self.clients.broadcast(ServerEvent::UserExited(client_id)).await;
        info!(client_id = %client_id, "Client left");
    }

    pub async fn handle_event(self: &Arc<Self>, client_id: ClientId, event: ClientEvent) {
        match event {
            ClientEvent::HandleUserPrompt(instruction) => {
                if let Some(task) = self.handle_user_prompt(client_id, instruction).await {
                    tokio::spawn(watch_run(task));
                }
            }
            ClientEvent::CreateShape(shape) => self.create_shape(client_id, shape).await,
            ClientEvent::UpdateShape(update) => self.update_shape(client_id, update).await,
            ClientEvent::CursorPosition(position) => self.relay_cursor(client_id, position).await,
        }
    }

    /// Start a run for `instruction` unless one is already in flight.
    ///
    /// Progress goes to the issuing client only; the final snapshot goes to
    /// everyone. Returns the run task, or `None` if the instruction was refused.
    pub async fn handle_user_prompt(
        self: &Arc<Self>,
        client_id: ClientId,
        instruction: String,
    ) -> Option<JoinHandle<RunOutcome>> {
        let reply = self.clients.sender(&client_id).await;

        let Some(guard) = self.driver.try_begin() else {
            warn!(client_id = %client_id, "Instruction refused, run already active");
            if let Some(reply) = reply {
                let _ = reply.send(ServerEvent::Updates(BUSY_NOTICE.to_string()));
            }
            return None;
        };

        info!(client_id = %client_id, "Instruction accepted");
        let session = Arc::clone(self);
        Some(tokio::spawn(async move {
            let notify = move |text: String| {
                if let Some(reply) = &reply {
                    let _ = reply.send(ServerEvent::Updates(text));
                }
            };
            let outcome = session.driver.drive(guard, &instruction, &notify).await;
            session.broadcast_snapshot().await;
            outcome
        }))
    }

    pub async fn create_shape(&self, client_id: ClientId, shape: Shape) {
        let result = self.store.write().await.append(shape).map(|s| s.id);
        match result {
            Ok(id) => {
                debug!(client_id = %client_id, id, "Shape created by client");
                self.broadcast_snapshot().await;
            }
            Err(e) => self.reject(client_id, e.to_string()).await,
        }
    }

    pub async fn update_shape(&self, client_id: ClientId, update: ShapeUpdate) {
        let result = self
            .store
            .write()
            .await
            .mutate(update.id, &update.patch)
            .cloned();
        match result {
            Ok(shape) => {
                debug!(client_id = %client_id, id = shape.id, "Shape updated by client");
                self.clients
                    .broadcast_except(&client_id, ServerEvent::UpdateShape(shape))
                    .await;
            }
            Err(e) => self.reject(client_id, e.to_string()).await,
        }
    }

    pub async fn relay_cursor(&self, client_id: ClientId, position: CursorPosition) {
        let relay = CursorRelay {
            id: client_id,
            x: position.x,
            y: position.y,
        };
        self.clients
            .broadcast_except(&client_id, ServerEvent::CursorPosition(relay))
            .await;
    }

    pub async fn snapshot(&self) -> Vec<Shape> {
        self.store.read().await.snapshot().to_vec()
    }

    pub async fn broadcast_snapshot(&self) {
        let snapshot = self.snapshot().await;
        self.clients.broadcast(ServerEvent::Snapshot(snapshot)).await;
    }

    async fn reject(&self, client_id: ClientId, reason: String) {
        warn!(client_id = %client_id, reason = %reason, "Edit rejected");
        self.clients
            .send_to(&client_id, ServerEvent::Updates(format!("Edit rejected: {reason}")))
            .await;
    }
}

/// Wait for a run task and log how it ended. `None` if the task panicked or
/// was cancelled.
pub async fn watch_run(task: JoinHandle<RunOutcome>) -> Option<RunOutcome> {
    match task.await {
        Ok(outcome) => {
            debug!(completed = outcome.is_completed(), "Run task finished");
            Some(outcome)
        }
        Err(e) => {
            error!(error = %e, "Run task did not finish");
            None
        }
    }
}
