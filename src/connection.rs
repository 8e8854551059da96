use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::envelope::Envelope;

/// One client session. Fan-out enqueues batches from many producers; a
/// single long poll drains them. Envelopes that arrive while no poll is
/// attached wait in the catch-up buffer.
#[derive(Debug)]
pub struct Connection {
    pub id: Uuid,
    pub username: String,
    pub channels: BTreeSet<String>,
    queue: Option<mpsc::UnboundedSender<Vec<Envelope>>>,
    catchup: Vec<Envelope>,
    last_active: DateTime<Utc>,
}

impl Connection {
    pub fn new(id: Uuid, username: &str) -> Self {
        Connection {
            id,
            username: username.to_string(),
            channels: BTreeSet::new(),
            queue: None,
            catchup: Vec::new(),
            last_active: Utc::now(),
        }
    }

    /// Push a batch toward the client, waking any waiting poll. Falls back
    /// to the catch-up buffer when no poll is attached, or when the last one
    /// went away mid-wait.
    pub fn enqueue(&mut self, batch: Vec<Envelope>) {
        if let Some(tx) = &self.queue {
            match tx.send(batch) {
                Ok(()) => {}
                Err(mpsc::error::SendError(batch)) => {
                    self.queue = None;
                    self.catchup.extend(batch);
                }
            }
        } else {
            self.catchup.extend(batch);
        }
    }

    /// Attach a fresh delivery queue for an incoming long poll, flushing the
    /// catch-up buffer into it as the first batch. Replaces any previous
    /// queue; batches stranded in an abandoned one are lost (at-most-once).
    pub fn attach_queue(&mut self) -> mpsc::UnboundedReceiver<Vec<Envelope>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queue = Some(tx);
        self.deliver_catchup_messages();
        rx
    }

    /// Move the catch-up buffer into the delivery queue as a single batch.
    pub fn deliver_catchup_messages(&mut self) {
        if self.catchup.is_empty() {
            return;
        }
        if let Some(tx) = &self.queue {
            let batch = std::mem::take(&mut self.catchup);
            if let Err(mpsc::error::SendError(batch)) = tx.send(batch) {
                self.queue = None;
                self.catchup = batch;
            }
        }
    }

    pub fn mark_activity(&mut self) {
        self.last_active = Utc::now();
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }
}
