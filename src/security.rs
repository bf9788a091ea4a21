use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::id::new_uuid_v7;

/// Anti-forgery tokens are scoped to an operation family, so a token minted
/// for the client-list grid cannot authorize a trip submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonceFamily {
    ClientList,
    SubmitTrip,
}

/// The host platform owns sessions and brings its own implementation;
/// verification failure is treated as an authorization failure upstream.
pub trait NonceVerifier: Send + Sync {
    fn verify(&self, family: NonceFamily, token: &str) -> bool;
}

/// Issuing verifier backed by process memory. Used by tests and the smoke
/// binary; not a substitute for the host's session-scoped tokens.
#[derive(Default)]
pub struct InMemoryNonces {
    issued: Mutex<HashMap<NonceFamily, HashSet<String>>>,
}

impl InMemoryNonces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, family: NonceFamily) -> String {
        let token = new_uuid_v7();
        let mut issued = self.issued.lock().unwrap_or_else(|e| e.into_inner());
        issued.entry(family).or_default().insert(token.clone());
        token
    }
}

impl NonceVerifier for InMemoryNonces {
    fn verify(&self, family: NonceFamily, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        let issued = self.issued.lock().unwrap_or_else(|e| e.into_inner());
        issued
            .get(&family)
            .map(|tokens| tokens.contains(token))
            .unwrap_or(false)
    }
}
