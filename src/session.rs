//! Bearer-token session store.
//!
//! One opaque random token per login, bound to `(identity, role)`. The
//! store is an explicit object with a load/clear lifecycle; the logged-in
//! actor is never ambient process state.

use std::collections::HashMap;
use std::sync::Mutex;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

use crate::models::Actor;

const TOKEN_BYTES: usize = 32;

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Actor>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh opaque token for the actor.
    pub fn issue(&self, actor: Actor) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        self.lock().insert(token.clone(), actor);
        tracing::debug!(actor_id = %actor.id, role = %actor.role, "session issued");
        token
    }

    /// Resolve a presented token to its actor, if the session is live.
    pub fn resolve(&self, token: &str) -> Option<Actor> {
        self.lock().get(token).copied()
    }

    /// Drop a single session (logout). Unknown tokens are a no-op.
    pub fn revoke(&self, token: &str) {
        self.lock().remove(token);
    }

    /// Drop every session (process shutdown, credential rotation).
    pub fn clear_all(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Actor>> {
        // A poisoned session map is unrecoverable state; vacating all
        // sessions via panic is the safe failure mode.
        self.sessions.lock().expect("session store lock poisoned")
    }
}
