//! The PromiseKeeper: the payee side of the promise protocol.
//!
//! Verifies incoming promises against the expected payer, counter-signs them
//! with the local identity and appends them to the ledger, checking channel
//! order in the same critical section as the write.

use payline_core::{
    verify_received, Address, CoreError, IssuedPromise, ReceivedPromise, Signer,
};
use payline_store::Ledger;

use crate::config::PaylineConfig;
use crate::error::{PaylineError, Result};

/// Receives, verifies and stores promises for one local identity.
pub struct PromiseKeeper<S, L> {
    /// The local identity; counter-signs every accepted promise.
    signer: S,
    /// The promise ledger.
    ledger: L,
    config: PaylineConfig,
}

impl<S: Signer, L: Ledger<ReceivedPromise>> PromiseKeeper<S, L> {
    /// Create a keeper over an existing ledger.
    pub fn new(signer: S, ledger: L, config: PaylineConfig) -> Self {
        Self {
            signer,
            ledger,
            config,
        }
    }

    /// The local identity.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the ledger reference.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &PaylineConfig {
        &self.config
    }

    /// Accept a promise signed by `expected_issuer` and counter-sign it.
    ///
    /// The issuer is recovered from the signature, never taken from the
    /// message. The promise must pay the local identity. Returns the receipt
    /// that was stored.
    pub async fn receive(
        &self,
        issued: IssuedPromise,
        expected_issuer: &Address,
    ) -> Result<ReceivedPromise> {
        let issuer = issued.issuer_address().map_err(|e| self.reject(e.into()))?;
        if &issuer != expected_issuer {
            return Err(self.reject(
                CoreError::SignerMismatch {
                    expected: *expected_issuer,
                    actual: issuer,
                }
                .into(),
            ));
        }

        let local = self.address();
        let receiver = issued.promise().receiver;
        if receiver != local {
            return Err(self.reject(PaylineError::WrongReceiver {
                expected: local,
                actual: receiver,
            }));
        }

        let received = issued.sign_by_receiver(&self.signer)?;
        self.append(&issuer, &received).await?;
        Ok(received)
    }

    /// Store a promise that already carries both signatures.
    ///
    /// The issuer signature must recover to `expected_issuer`. With
    /// `verify_receiver` set, the receiver signature must recover to the
    /// local identity.
    pub async fn accept(
        &self,
        received: &ReceivedPromise,
        expected_issuer: &Address,
    ) -> Result<()> {
        let checked = if self.config.verify_receiver {
            verify_received(received, expected_issuer, &self.address())
        } else {
            received.issuer_address().and_then(|issuer| {
                if &issuer == expected_issuer {
                    Ok(())
                } else {
                    Err(CoreError::SignerMismatch {
                        expected: *expected_issuer,
                        actual: issuer,
                    })
                }
            })
        };
        checked.map_err(|e| self.reject(e.into()))?;

        self.append(expected_issuer, received).await
    }

    /// Every promise stored for `issuer`, oldest first.
    pub async fn history(&self, issuer: &Address) -> Result<Vec<ReceivedPromise>> {
        Ok(self.ledger.get_all(issuer).await?)
    }

    /// The latest promise from `issuer` to the local identity.
    pub async fn latest(&self, issuer: &Address) -> Result<Option<ReceivedPromise>> {
        Ok(self.ledger.last(issuer, &self.address()).await?)
    }

    /// Every issuer with stored promises.
    pub async fn issuers(&self) -> Result<Vec<Address>> {
        Ok(self.ledger.issuers().await?)
    }

    /// Remove a promise after it has been settled on-chain.
    ///
    /// The channel keeps its position, so the same promise is rejected if it
    /// is presented again.
    pub async fn settle(&self, issuer: &Address, record: &ReceivedPromise) -> Result<()> {
        self.ledger.delete(issuer, record).await?;
        tracing::info!(
            %issuer,
            seq_no = record.promise().seq_no,
            amount = record.promise().amount,
            "settled promise removed from ledger"
        );
        Ok(())
    }

    /// Close the ledger.
    pub async fn close(&self) -> Result<()> {
        Ok(self.ledger.close().await?)
    }

    async fn append(&self, issuer: &Address, received: &ReceivedPromise) -> Result<()> {
        let stored = if self.config.enforce_monotonic {
            self.ledger.store_next(issuer, received).await
        } else {
            self.ledger.store(issuer, received).await
        };
        stored.map_err(|e| self.reject(e.into()))?;

        tracing::info!(
            %issuer,
            seq_no = received.promise().seq_no,
            amount = received.promise().amount,
            "accepted promise"
        );
        Ok(())
    }

    fn reject(&self, err: PaylineError) -> PaylineError {
        tracing::warn!(local = %self.address(), error = %err, "rejected promise");
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payline_core::{Extra, LocalSigner, Promise, ReplayError};
    use payline_store::{MemoryLedger, StoreError};
    use payline_testkit::fixtures::{issued, received, Party};

    fn keeper(payee: &Party) -> PromiseKeeper<LocalSigner, MemoryLedger> {
        keeper_with(payee, PaylineConfig::default())
    }

    fn keeper_with(
        payee: &Party,
        config: PaylineConfig,
    ) -> PromiseKeeper<LocalSigner, MemoryLedger> {
        PromiseKeeper::new(payee.signer.clone(), MemoryLedger::new(), config)
    }

    #[tokio::test]
    async fn test_receive_counter_signs_and_stores() {
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let keeper = keeper(&payee);

        let receipt = keeper
            .receive(issued(&payer, payee.address(), 1, 100), &payer.address())
            .await
            .unwrap();

        assert_eq!(receipt.receiver_address().unwrap(), payee.address());
        assert_eq!(keeper.history(&payer.address()).await.unwrap(), vec![receipt.clone()]);
        assert_eq!(keeper.latest(&payer.address()).await.unwrap(), Some(receipt));
        assert_eq!(keeper.issuers().await.unwrap(), vec![payer.address()]);
    }

    #[tokio::test]
    async fn test_receive_wrong_issuer() {
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let impostor = Party::seeded(3);
        let keeper = keeper(&payee);

        let err = keeper
            .receive(issued(&impostor, payee.address(), 1, 100), &payer.address())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaylineError::Core(CoreError::SignerMismatch { actual, .. })
                if actual == impostor.address()
        ));
        assert!(keeper.history(&payer.address()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_receive_wrong_receiver() {
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let keeper = keeper(&payee);
        let elsewhere = Address::from_bytes([0xaa; 20]);

        let err = keeper
            .receive(issued(&payer, elsewhere, 1, 100), &payer.address())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaylineError::WrongReceiver { actual, .. } if actual == elsewhere
        ));
    }

    #[tokio::test]
    async fn test_receive_replay() {
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let keeper = keeper(&payee);

        keeper
            .receive(issued(&payer, payee.address(), 1, 100), &payer.address())
            .await
            .unwrap();
        let err = keeper
            .receive(issued(&payer, payee.address(), 1, 50), &payer.address())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaylineError::Replay(ReplayError::StaleSequence { last: 1, got: 1 })
        ));
        assert_eq!(keeper.history(&payer.address()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_monotonic_check_can_be_disabled() {
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let keeper = keeper_with(
            &payee,
            PaylineConfig {
                enforce_monotonic: false,
                ..Default::default()
            },
        );

        for _ in 0..2 {
            keeper
                .receive(issued(&payer, payee.address(), 1, 100), &payer.address())
                .await
                .unwrap();
        }
        assert_eq!(keeper.history(&payer.address()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_receive_corrupt_signature() {
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let keeper = keeper(&payee);

        let mut wire = serde_json::to_value(issued(&payer, payee.address(), 1, 1)).unwrap();
        wire["issuer_signature"] = serde_json::Value::String("00".repeat(65));
        let forged: IssuedPromise = serde_json::from_value(wire).unwrap();

        let err = keeper.receive(forged, &payer.address()).await.unwrap_err();
        assert!(matches!(err, PaylineError::Core(CoreError::Recovery(_))));
    }

    #[tokio::test]
    async fn test_accept() {
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let keeper = keeper(&payee);

        let receipt = received(&payer, &payee, 1, 10);
        keeper.accept(&receipt, &payer.address()).await.unwrap();

        // Counter-signed by someone else.
        let other = received(&payer, &Party::seeded(3), 2, 20);
        let err = keeper.accept(&other, &payer.address()).await.unwrap_err();
        assert!(matches!(
            err,
            PaylineError::Core(CoreError::SignerMismatch { .. })
        ));

        // Without receiver verification only the issuer is checked.
        let relaxed = keeper_with(
            &payee,
            PaylineConfig {
                verify_receiver: false,
                ..Default::default()
            },
        );
        relaxed.accept(&other, &payer.address()).await.unwrap();
        let err = relaxed
            .accept(&other, &Party::seeded(4).address())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaylineError::Core(CoreError::SignerMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_settle() {
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let keeper = keeper(&payee);

        let promise = Promise::new(Extra::from_data(b"session"), payee.address(), 1, 5);
        let issued = payer.issue(promise);
        let receipt = keeper
            .receive(issued.clone(), &payer.address())
            .await
            .unwrap();

        keeper.settle(&payer.address(), &receipt).await.unwrap();
        assert!(keeper.history(&payer.address()).await.unwrap().is_empty());

        let err = keeper.settle(&payer.address(), &receipt).await.unwrap_err();
        assert!(matches!(err, PaylineError::Store(StoreError::NotFound(_))));

        // A settled promise stays spent.
        let err = keeper
            .receive(issued, &payer.address())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaylineError::Replay(ReplayError::StaleSequence { last: 1, got: 1 })
        ));
        assert!(keeper.history(&payer.address()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close() {
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let keeper = keeper(&payee);

        keeper.close().await.unwrap();
        let err = keeper
            .receive(issued(&payer, payee.address(), 1, 1), &payer.address())
            .await
            .unwrap_err();
        assert!(matches!(err, PaylineError::Store(StoreError::Closed)));
    }
}
