use std::fmt;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordVerifier};
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::medium::StorageMedium;

/// Session key recording a successful unlock.
pub const UNLOCK_KEY: &str = "justme_unlocked";
const UNLOCK_FLAG: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Unlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Unlocked,
    Rejected,
    AlreadyUnlocked,
}

/// The shared passphrase, either as plain text or an Argon2 PHC string.
pub enum Secret {
    Plain(String),
    Argon2(String),
}

impl Secret {
    pub fn argon2(phc: &str) -> Result<Self> {
        PasswordHash::new(phc).map_err(|e| anyhow!("Bad secret hash: {e}"))?;
        Ok(Self::Argon2(phc.to_string()))
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            Secret::Plain(secret) => secret == candidate,
            Secret::Argon2(phc) => match PasswordHash::new(phc) {
                Ok(parsed) => Argon2::default()
                    .verify_password(candidate.as_bytes(), &parsed)
                    .is_ok(),
                Err(e) => {
                    warn!(error = %e, "stored secret hash is unusable");
                    false
                }
            },
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Secret::Plain(_) => f.write_str("Secret::Plain(..)"),
            Secret::Argon2(_) => f.write_str("Secret::Argon2(..)"),
        }
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        match self {
            Secret::Plain(s) | Secret::Argon2(s) => s.zeroize(),
        }
    }
}

/// Single-secret session unlock.
///
/// Starts `Unlocked` when the session medium already carries the unlock
/// flag. Guesses are unlimited.
pub struct Gate {
    state: GateState,
    secret: Option<Secret>,
    session: Option<Rc<dyn StorageMedium>>,
}

impl Gate {
    pub fn new(secret: Secret, session: Rc<dyn StorageMedium>) -> Self {
        let state = if session.get(UNLOCK_KEY).as_deref() == Some(UNLOCK_FLAG) {
            GateState::Unlocked
        } else {
            GateState::Locked
        };
        Self {
            state,
            secret: Some(secret),
            session: Some(session),
        }
    }

    /// A gate that is open from the start and never touches a session.
    pub fn disabled() -> Self {
        Self {
            state: GateState::Unlocked,
            secret: None,
            session: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == GateState::Unlocked
    }

    /// Checks `input` against the secret exactly as typed. A rejected
    /// guess is wiped from `input`.
    pub fn submit(&mut self, input: &mut String) -> GateOutcome {
        if self.is_unlocked() {
            return GateOutcome::AlreadyUnlocked;
        }
        let accepted = self
            .secret
            .as_ref()
            .is_some_and(|secret| secret.matches(input));
        if !accepted {
            input.zeroize();
            return GateOutcome::Rejected;
        }

        if let Some(session) = &self.session {
            if let Err(e) = session.set(UNLOCK_KEY, UNLOCK_FLAG) {
                warn!(error = %e, "could not record unlock for this session");
            }
        }
        self.state = GateState::Unlocked;
        info!("dashboard unlocked");
        GateOutcome::Unlocked
    }
}
