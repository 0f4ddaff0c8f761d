//! Remote-callback lifecycle.
//!
//! A client-side callback function is tracked server-side by a stub that
//! must be reclaimed once the client can no longer reach it. Rather than
//! polling a weak-reference table for collected functions, this registry
//! leans on something Rust offers directly: [`Drop`] runs deterministically
//! and exactly once per value, at the point the last owner releases it. A
//! [`CallbackHandle`]'s `Drop` impl enqueues the same "freed" notification a
//! finalizer would have, with no bounded-probe latency and no possibility
//! of a handle outliving its own reclamation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::message::CallbackCall;

pub type CallbackId = u64;

/// Sent by a dropped [`CallbackHandle`] to notify the registry its stub is
/// no longer reachable.
#[derive(Debug, Clone, Copy)]
pub struct CallbackFreed(pub CallbackId);

/// A stable handle to one remote callback argument. Cloning shares the same
/// underlying id; the server-side stub is dropped only once every clone
/// (and the registry's own internal strong reference) is gone.
pub struct CallbackHandle {
    id: CallbackId,
    sender: mpsc::UnboundedSender<CallbackFreed>,
    calls: mpsc::UnboundedSender<CallbackCall>,
    released: std::sync::atomic::AtomicBool,
}

impl CallbackHandle {
    pub fn id(&self) -> CallbackId {
        self.id
    }

    /// Emits a `callbackCall` message to the client.
    pub fn invoke(&self, call_id: u64, args: Vec<crate::codec::ExtValue>) -> Result<(), mpsc::error::SendError<CallbackCall>> {
        self.calls.send(CallbackCall { call_id, callback_id: self.id, args })
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            let _ = self.sender.send(CallbackFreed(self.id));
        }
    }
}

/// Maps stable callback ids to their client-side function identity and
/// hands out [`CallbackHandle`]s. One instance per [`crate::connection::SocketConnection`].
///
/// Resource-bounded by construction: the map only ever grows through
/// [`Self::intern`], and every `CallbackHandle` issued from it notifies
/// [`Self::reap`] on drop, so a connection's callback table cannot outlive
/// its callbacks.
pub struct CallbackRegistry {
    /// Client-assigned identity (an opaque string the client chose to name
    /// its function, stable across repeated sends of the same function
    /// object) to the id we handed out.
    by_identity: DashMap<String, CallbackId>,
    next_id: AtomicU64,
    freed_tx: mpsc::UnboundedSender<CallbackFreed>,
    call_tx: mpsc::UnboundedSender<CallbackCall>,
}

impl CallbackRegistry {
    pub fn new(call_tx: mpsc::UnboundedSender<CallbackCall>) -> (Arc<Self>, mpsc::UnboundedReceiver<CallbackFreed>) {
        let (freed_tx, freed_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(CallbackRegistry {
            by_identity: DashMap::new(),
            next_id: AtomicU64::new(1),
            freed_tx,
            call_tx,
        });
        (registry, freed_rx)
    }

    /// Returns the same id for the same client-side identity every time,
    /// materializing a fresh [`CallbackHandle`] whenever the caller needs
    /// one.
    pub fn intern(&self, client_identity: &str) -> CallbackHandle {
        let id = *self.by_identity
            .entry(client_identity.to_owned())
            .or_insert_with(|| self.next_id.fetch_add(1, Ordering::Relaxed));

        CallbackHandle {
            id,
            sender: self.freed_tx.clone(),
            calls: self.call_tx.clone(),
            released: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Removes the stub for `identity`, if still registered. Called after
    /// receiving the corresponding [`CallbackFreed`] notification.
    pub fn reap(&self, id: CallbackId) {
        self.by_identity.retain(|_, v| *v != id);
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }
}
