//! Credledger Wallet
//!
//! Prepares and signs ledger requests on behalf of a requester identity.

use std::sync::atomic::{AtomicU64, Ordering};

use credledger_core::{Identifier, Request, Result, SignedRequest};
use sha3::{Digest, Sha3_256};
use zeroize::Zeroize;

/// Signing capability consumed by the request correlator
pub trait Wallet: Send + Sync {
    /// Identity used as the requester of every request
    fn default_id(&self) -> &Identifier;

    /// Assign a request id and sign the request
    fn prepare_request(&self, request: Request) -> Result<SignedRequest>;
}

/// In-process wallet holding a single signing secret
pub struct SimpleWallet {
    /// Signing secret
    secret: [u8; 32],

    /// Identifier derived from the secret
    identifier: Identifier,

    /// Last request id handed out
    last_req_id: AtomicU64,
}

impl SimpleWallet {
    /// Create a new wallet with a random secret
    pub fn new() -> Self {
        use rand::RngCore;
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);

        Self::with_secret(secret)
    }

    /// Create a wallet with a specific secret
    pub fn with_secret(secret: [u8; 32]) -> Self {
        let digest: [u8; 32] = Sha3_256::digest(secret).into();
        let identifier = Identifier::new(hex::encode(&digest[..16]));

        Self {
            secret,
            identifier,
            last_req_id: AtomicU64::new(0),
        }
    }

    /// Check a signature produced by this wallet
    pub fn verify(&self, request: &SignedRequest) -> bool {
        match SignedRequest::signing_bytes(&request.identifier, request.req_id, &request.operation)
        {
            Ok(bytes) => self.sign(&bytes) == request.signature,
            Err(_) => false,
        }
    }

    /// Next request id: strictly increasing, seeded from wall-clock microseconds
    fn next_req_id(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_micros().max(0) as u64;
        let prev = self
            .last_req_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(prev + 1)
    }

    fn sign(&self, bytes: &[u8]) -> String {
        let mut hasher = Sha3_256::new();
        hasher.update(self.secret);
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }
}

impl Default for SimpleWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SimpleWallet {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl Wallet for SimpleWallet {
    fn default_id(&self) -> &Identifier {
        &self.identifier
    }

    fn prepare_request(&self, request: Request) -> Result<SignedRequest> {
        let req_id = self.next_req_id();
        let bytes = SignedRequest::signing_bytes(&request.identifier, req_id, &request.operation)?;
        let signature = self.sign(&bytes);

        tracing::debug!(
            "Prepared request ({}, {}) of type {}",
            request.identifier,
            req_id,
            request.operation.txn_type
        );

        Ok(SignedRequest {
            identifier: request.identifier,
            req_id,
            operation: request.operation,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credledger_core::{LedgerOperation, TxnType};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn request(wallet: &SimpleWallet) -> Request {
        Request::new(
            wallet.default_id().clone(),
            LedgerOperation::new(TxnType::GetClaimDef).with("dest", "issuer-1"),
        )
    }

    #[test]
    fn test_wallet_creation() {
        let wallet = SimpleWallet::new();
        assert!(!wallet.secret.iter().all(|&b| b == 0));
        assert_eq!(wallet.default_id().as_str().len(), 32);
    }

    #[test]
    fn test_identifier_is_stable_for_secret() {
        let a = SimpleWallet::with_secret([7u8; 32]);
        let b = SimpleWallet::with_secret([7u8; 32]);
        assert_eq!(a.default_id(), b.default_id());
    }

    #[test]
    fn test_req_ids_strictly_increase() {
        let wallet = SimpleWallet::new();
        let first = wallet.prepare_request(request(&wallet)).unwrap();
        let second = wallet.prepare_request(request(&wallet)).unwrap();
        assert!(second.req_id > first.req_id);
        assert_eq!(first.key().identifier, *wallet.default_id());
    }

    #[test]
    fn test_signature_verifies_and_detects_tampering() {
        let wallet = SimpleWallet::new();
        let mut signed = wallet.prepare_request(request(&wallet)).unwrap();
        assert!(wallet.verify(&signed));

        signed.operation = signed.operation.with("dest", "someone-else");
        assert!(!wallet.verify(&signed));
    }

    #[test]
    fn test_concurrent_req_ids_unique() {
        let wallet = Arc::new(SimpleWallet::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let wallet = wallet.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| wallet.prepare_request(request(&wallet)).unwrap().req_id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate req_id {}", id);
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
