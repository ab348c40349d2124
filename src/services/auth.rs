//! Admin authorization and dashboard passcode verification.
//!
//! - `AdminGate` holds the admin identities fixed at startup.
//! - `PasscodeVerifier` is the capability the admin API uses to check a
//!   presented passcode. The configured value may be plaintext or an argon2
//!   PHC string; callers never learn which.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{Error as PasswordHashError, SaltString},
};
use rand::rngs::OsRng;
use std::{collections::HashSet, fmt, sync::Arc};
use subtle::ConstantTimeEq;
use tracing::warn;

/// Immutable set of identities allowed to register and delete files.
#[derive(Clone, Debug, Default)]
pub struct AdminGate {
    admins: Arc<HashSet<i64>>,
}

impl AdminGate {
    pub fn new(admins: impl IntoIterator<Item = i64>) -> Self {
        Self {
            admins: Arc::new(admins.into_iter().collect()),
        }
    }

    pub fn allows(&self, identity: i64) -> bool {
        self.admins.contains(&identity)
    }

    /// Whether `caller` may perform administrative actions.
    pub fn admits(&self, caller: &Caller) -> bool {
        match caller {
            Caller::Sender(id) => self.allows(*id),
            Caller::Dashboard(_) => true,
        }
    }
}

/// Who is asking for an administrative action.
#[derive(Clone, Debug)]
pub enum Caller {
    /// A messaging-side identity, checked against the admin set.
    Sender(i64),
    /// A dashboard request whose passcode was already verified.
    Dashboard(DashboardSession),
}

/// Proof that a dashboard passcode was verified. Only
/// [`DashboardSession::verify`] constructs it.
#[derive(Clone, Debug)]
pub struct DashboardSession {
    _verified: (),
}

impl DashboardSession {
    pub fn verify(verifier: &dyn PasscodeVerifier, candidate: &str) -> Option<Self> {
        verifier
            .verify(candidate)
            .then_some(Self { _verified: () })
    }
}

/// Checks a candidate passcode.
pub trait PasscodeVerifier: Send + Sync {
    fn verify(&self, candidate: &str) -> bool;
}

/// Compares against a plaintext passcode in constant time.
pub struct PlaintextPasscode(String);

impl PlaintextPasscode {
    pub fn new(passcode: impl Into<String>) -> Self {
        Self(passcode.into())
    }
}

impl PasscodeVerifier for PlaintextPasscode {
    fn verify(&self, candidate: &str) -> bool {
        bool::from(self.0.as_bytes().ct_eq(candidate.as_bytes()))
    }
}

impl fmt::Debug for PlaintextPasscode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlaintextPasscode(..)")
    }
}

/// Verifies against an argon2 PHC hash string.
#[derive(Debug)]
pub struct Argon2Passcode {
    hash: String,
}

impl Argon2Passcode {
    /// Validates the PHC string up front so a malformed hash fails at startup.
    pub fn new(hash: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = hash.into();
        PasswordHash::new(&hash)?;
        Ok(Self { hash })
    }
}

impl PasscodeVerifier for Argon2Passcode {
    fn verify(&self, candidate: &str) -> bool {
        match PasswordHash::new(&self.hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(candidate.as_bytes(), &parsed)
                .is_ok(),
            Err(err) => {
                warn!("stored passcode hash is invalid: {}", err);
                false
            }
        }
    }
}

/// Build the verifier for a configured passcode value.
///
/// Values starting with `$argon2` are treated as PHC hashes, anything else as
/// plaintext.
pub fn passcode_verifier(
    configured: &str,
) -> Result<Arc<dyn PasscodeVerifier>, PasswordHashError> {
    if configured.starts_with("$argon2") {
        Ok(Arc::new(Argon2Passcode::new(configured)?))
    } else {
        Ok(Arc::new(PlaintextPasscode::new(configured)))
    }
}

/// Hash a passcode into an argon2 PHC string suitable for configuration.
pub fn hash_passcode(plain: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(plain.as_bytes(), &salt)?;
    Ok(hash.to_string())
}
