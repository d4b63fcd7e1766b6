//! Payload dispatch table.
//!
//! Maps each [`PayloadKind`] to one handler. The node registers its
//! handlers once at construction and routes every decoded payload through
//! [`DispatchTable::dispatch`].

use std::collections::HashMap;
use std::fmt;

use super::message::{Payload, PayloadKind};
use crate::identity::PeerId;

/// Receives the transport-level sender and the payload.
pub type PayloadHandler = Box<dyn Fn(&PeerId, Payload) + Send + Sync>;

#[derive(Default)]
pub struct DispatchTable {
    handlers: HashMap<PayloadKind, PayloadHandler>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `kind`, returning the one it replaces.
    pub fn register<F>(&mut self, kind: PayloadKind, handler: F) -> Option<PayloadHandler>
    where
        F: Fn(&PeerId, Payload) + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler))
    }

    pub fn is_registered(&self, kind: PayloadKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Route `payload` to its handler. Returns false if none is registered.
    pub fn dispatch(&self, from: &PeerId, payload: Payload) -> bool {
        match self.handlers.get(&payload.kind()) {
            Some(handler) => {
                handler(from, payload);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.handlers.keys().map(PayloadKind::as_str).collect();
        f.debug_struct("DispatchTable").field("kinds", &kinds).finish()
    }
}
