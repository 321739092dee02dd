//! Consumer-side checks on received promises.

use serde::{Deserialize, Serialize};

use crate::crypto::Address;
use crate::error::{CoreError, ReplayError, Result};
use crate::promise::{ExtraData, ReceivedPromise};

/// The position of a promise within its (issuer, receiver) channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelPosition {
    pub seq_no: u64,
    pub amount: u64,
}

impl ChannelPosition {
    /// The furthest a channel has reached after also seeing `other`.
    ///
    /// Each field takes its maximum, so a mark raised this way never moves
    /// back, whatever order positions arrive in.
    pub fn raise(self, other: ChannelPosition) -> ChannelPosition {
        ChannelPosition {
            seq_no: self.seq_no.max(other.seq_no),
            amount: self.amount.max(other.amount),
        }
    }
}

/// Check that `next` advances a channel whose last accepted promise is `last`.
///
/// `seq_no` must strictly increase and `amount` must not decrease. The first
/// promise of a channel (`last == None`) is always accepted.
pub fn check_monotonic(
    last: Option<ChannelPosition>,
    next: ChannelPosition,
) -> std::result::Result<(), ReplayError> {
    let Some(last) = last else {
        return Ok(());
    };
    if next.seq_no <= last.seq_no {
        return Err(ReplayError::StaleSequence {
            last: last.seq_no,
            got: next.seq_no,
        });
    }
    if next.amount < last.amount {
        return Err(ReplayError::DecreasingAmount {
            last: last.amount,
            got: next.amount,
        });
    }
    Ok(())
}

/// Verify both signatures of a received promise.
///
/// The issuer signature must recover to `expected_issuer` and the receiver
/// signature to `expected_receiver`. Ordering against earlier promises is
/// checked separately, together with the ledger write.
pub fn verify_received<E: ExtraData>(
    received: &ReceivedPromise<E>,
    expected_issuer: &Address,
    expected_receiver: &Address,
) -> Result<()> {
    let issuer = received.issuer_address()?;
    if &issuer != expected_issuer {
        return Err(CoreError::SignerMismatch {
            expected: *expected_issuer,
            actual: issuer,
        });
    }

    let receiver = received.receiver_address()?;
    if &receiver != expected_receiver {
        return Err(CoreError::SignerMismatch {
            expected: *expected_receiver,
            actual: receiver,
        });
    }

    Ok(())
}
