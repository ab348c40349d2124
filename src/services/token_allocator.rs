//! Shareable token generation.
//!
//! Tokens are 128 random bits encoded as unpadded base64url (22 characters),
//! safe to embed in a deep-link start parameter as-is.

use crate::services::record_store::{RecordStore, StoreResult};
use base64::{Engine as _, engine::general_purpose};
use rand::{RngCore, rngs::OsRng};
use std::sync::Arc;
use tracing::warn;

/// Number of candidates tried before giving up.
pub const MAX_TOKEN_ATTEMPTS: usize = 5;

const TOKEN_BYTES: usize = 16;

/// Source of candidate tokens.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Cryptographically random tokens from the OS RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokens;

impl TokenGenerator for RandomTokens {
    fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }
}

/// Produces token candidates that were not issued before, as far as the
/// store can tell at the time of the check.
#[derive(Clone)]
pub struct TokenAllocator {
    generator: Arc<dyn TokenGenerator>,
    max_attempts: usize,
}

impl Default for TokenAllocator {
    fn default() -> Self {
        Self::new(Arc::new(RandomTokens))
    }
}

impl TokenAllocator {
    pub fn new(generator: Arc<dyn TokenGenerator>) -> Self {
        Self {
            generator,
            max_attempts: MAX_TOKEN_ATTEMPTS,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Draw candidates until one is not yet issued, spending at most
    /// `budget` attempts. Returns the candidate and the attempts used, or
    /// `None` when every candidate was already taken.
    pub async fn allocate(
        &self,
        store: &RecordStore,
        budget: usize,
    ) -> StoreResult<Option<(String, usize)>> {
        for attempt in 1..=budget {
            let candidate = self.generator.generate();
            if !store.token_issued(&candidate).await? {
                return Ok(Some((candidate, attempt)));
            }
            warn!(attempt, "generated token already issued, retrying");
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_tokens_are_url_safe() {
        let token = RandomTokens.generate();
        assert_eq!(token.len(), 22);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn random_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| RandomTokens.generate()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
