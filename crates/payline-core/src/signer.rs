//! Signing capability and key lookup.
//!
//! A [`Signer`] is the only thing in Payline that touches private keys. Every
//! other component receives one at construction time. Key custody itself is
//! the job of a [`Keystore`]; [`MemoryKeystore`] is the in-process variant.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use k256::ecdsa::SigningKey;

use crate::crypto::{Address, Keccak256Hash, Signature};
use crate::error::{CoreError, Result, SignerError};

/// Produces recoverable signatures for one identity.
///
/// `sign` hashes the message with Keccak-256 and signs the digest. It may be
/// slow (hardware or passphrase-locked keys). Cancellation and timeouts are
/// reported as [`SignerError`] and must be passed through unchanged.
pub trait Signer: Send + Sync {
    /// The identity this signer signs for.
    fn address(&self) -> Address;

    /// Sign a message.
    fn sign(&self, message: &[u8]) -> std::result::Result<Signature, SignerError>;
}

impl<T: Signer + ?Sized> Signer for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    fn sign(&self, message: &[u8]) -> std::result::Result<Signature, SignerError> {
        (**self).sign(message)
    }
}

impl<T: Signer + ?Sized> Signer for &T {
    fn address(&self) -> Address {
        (**self).address()
    }

    fn sign(&self, message: &[u8]) -> std::result::Result<Signature, SignerError> {
        (**self).sign(message)
    }
}

/// A signer holding a secp256k1 key in memory.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl LocalSigner {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self::from_key(SigningKey::random(&mut rng))
    }

    /// Create from a 32-byte secret scalar.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        let key = SigningKey::from_slice(secret).map_err(|_| CoreError::InvalidKey)?;
        Ok(Self::from_key(key))
    }

    /// Create from a hex encoded secret scalar.
    pub fn from_hex(secret: &str) -> Result<Self> {
        let bytes = hex::decode(secret.strip_prefix("0x").unwrap_or(secret))
            .map_err(|_| CoreError::InvalidKey)?;
        let key = SigningKey::from_slice(&bytes).map_err(|_| CoreError::InvalidKey)?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = Address::from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    /// Sign an already computed digest.
    pub fn sign_prehash(
        &self,
        digest: &Keccak256Hash,
    ) -> std::result::Result<Signature, SignerError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_bytes())
            .map_err(|e| SignerError::Backend(e.to_string()))?;
        Ok(Signature::from_parts(&signature, recovery_id))
    }
}

impl Signer for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, message: &[u8]) -> std::result::Result<Signature, SignerError> {
        self.sign_prehash(&Keccak256Hash::hash(message))
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalSigner({})", self.address)
    }
}

/// Looks up the signing capability for an identity.
pub trait Keystore: Send + Sync {
    /// Get a signer for `identity`, or `None` if no key is held for it.
    fn signer_for(&self, identity: &Address) -> Option<Arc<dyn Signer>>;

    /// All identities with a key in this store.
    fn identities(&self) -> Vec<Address>;
}

impl<T: Keystore + ?Sized> Keystore for Arc<T> {
    fn signer_for(&self, identity: &Address) -> Option<Arc<dyn Signer>> {
        (**self).signer_for(identity)
    }

    fn identities(&self) -> Vec<Address> {
        (**self).identities()
    }
}

/// A keystore holding [`LocalSigner`]s in memory.
///
/// Keys are added unlocked. A locked key still resolves to a signer, but
/// every signature attempt fails with [`SignerError::Locked`].
#[derive(Default)]
pub struct MemoryKeystore {
    keys: RwLock<HashMap<Address, KeyEntry>>,
}

#[derive(Clone)]
struct KeyEntry {
    signer: LocalSigner,
    unlocked: Arc<AtomicBool>,
}

impl MemoryKeystore {
    /// Create an empty keystore.
    pub fn new() -> Self {
        Self::default()
    }

    // A panic under the lock cannot leave the map half-updated.
    fn read_keys(&self) -> RwLockReadGuard<'_, HashMap<Address, KeyEntry>> {
        self.keys.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_keys(&self) -> RwLockWriteGuard<'_, HashMap<Address, KeyEntry>> {
        self.keys.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a key and return its identity.
    pub fn insert(&self, signer: LocalSigner) -> Address {
        let address = signer.address();
        let entry = KeyEntry {
            signer,
            unlocked: Arc::new(AtomicBool::new(true)),
        };
        self.write_keys().insert(address, entry);
        address
    }

    /// Generate a fresh key and return its identity.
    pub fn create(&self) -> Address {
        self.insert(LocalSigner::generate())
    }

    /// Lock an identity. Returns `false` if it is unknown.
    pub fn lock(&self, identity: &Address) -> bool {
        self.set_unlocked(identity, false)
    }

    /// Unlock an identity. Returns `false` if it is unknown.
    pub fn unlock(&self, identity: &Address) -> bool {
        self.set_unlocked(identity, true)
    }

    fn set_unlocked(&self, identity: &Address, unlocked: bool) -> bool {
        match self.read_keys().get(identity) {
            Some(entry) => {
                entry.unlocked.store(unlocked, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

impl Keystore for MemoryKeystore {
    fn signer_for(&self, identity: &Address) -> Option<Arc<dyn Signer>> {
        self.read_keys().get(identity).map(|entry| {
            Arc::new(KeystoreSigner {
                signer: entry.signer.clone(),
                unlocked: Arc::clone(&entry.unlocked),
            }) as Arc<dyn Signer>
        })
    }

    fn identities(&self) -> Vec<Address> {
        let mut ids: Vec<Address> = self.read_keys().keys().copied().collect();
        ids.sort();
        ids
    }
}

/// Signer handed out by [`MemoryKeystore`]; honours the lock flag.
struct KeystoreSigner {
    signer: LocalSigner,
    unlocked: Arc<AtomicBool>,
}

impl Signer for KeystoreSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    fn sign(&self, message: &[u8]) -> std::result::Result<Signature, SignerError> {
        if !self.unlocked.load(Ordering::SeqCst) {
            return Err(SignerError::Locked(self.signer.address()));
        }
        self.signer.sign(message)
    }
}
