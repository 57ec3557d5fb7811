//! Staker and epoch assembly from SFC accessors.
//!
//! A staker is stitched together from up to three contract reads. Only the
//! base record is mandatory; the delegation limits and the lock window are
//! best effort and stay zeroed when their reads fail.

use std::sync::Arc;

use alloy_primitives::{I256, U256};

use opera_api_types::staking::{STATUS_CHEATER_BIT, STATUS_OFFLINE_BIT};
use opera_api_types::{Epoch, Staker, StakerKey};

use crate::error::{ChainError, ChainResult};
use crate::traits::{LockWindow, SfcReader, StakerRecord};

/// Denominator of the SFC delegation ratio.
pub const RATIO_UNIT: u64 = 1_000_000;

/// Compute `(total_delegated_limit, delegated_limit)` for a staker.
///
/// The total limit is `floor(stake * ratio / RATIO_UNIT)`; the remaining limit
/// subtracts what is already delegated and goes negative when over-delegated.
pub fn delegation_limits(stake: U256, delegated_me: U256, ratio: U256) -> (U256, I256) {
    let total = stake.saturating_mul(ratio) / U256::from(RATIO_UNIT);
    let allowed = I256::try_from(total).unwrap_or(I256::MAX);
    let delegated = I256::try_from(delegated_me).unwrap_or(I256::MAX);
    (total, allowed.saturating_sub(delegated))
}

/// Builds [`Staker`] and [`Epoch`] entities from an [`SfcReader`].
pub struct StakingAssembler<S: ?Sized> {
    sfc: Arc<S>,
}

impl<S: ?Sized> Clone for StakingAssembler<S> {
    fn clone(&self) -> Self {
        Self {
            sfc: Arc::clone(&self.sfc),
        }
    }
}

impl<S: SfcReader + ?Sized> StakingAssembler<S> {
    pub fn new(sfc: Arc<S>) -> Self {
        Self { sfc }
    }

    pub async fn staker(&self, key: StakerKey) -> ChainResult<Staker> {
        let record = self.sfc.staker_record(key).await.map_err(|err| {
            tracing::error!(staker = %key, error = %err, "staker record not available");
            err
        })?;
        let Some(status) = record.status else {
            return Err(ChainError::not_found(format_args!("staker {key}")));
        };

        let mut staker = base_staker(&record, status);

        match self.sfc.max_delegated_ratio().await {
            Ok(ratio) => {
                let (total, remaining) =
                    delegation_limits(staker.stake, staker.delegated_me, ratio);
                staker.total_delegated_limit = total;
                staker.delegated_limit = remaining;
            }
            Err(err) => {
                tracing::warn!(staker = staker.id, error = %err, "delegation ratio not available");
            }
        }

        match self.sfc.locked_stake(staker.id).await {
            Ok(LockWindow {
                from_epoch: Some(from_epoch),
                end_time: Some(end_time),
            }) => {
                staker.locked_from_epoch = from_epoch;
                staker.locked_until = end_time;
            }
            Ok(_) => {
                tracing::debug!(staker = staker.id, "stake lock not set");
            }
            Err(err) => {
                tracing::warn!(staker = staker.id, error = %err, "stake lock not available");
            }
        }

        apply_flags(&mut staker);
        Ok(staker)
    }

    pub async fn epoch(&self, id: u64) -> ChainResult<Epoch> {
        self.sfc.epoch_snapshot(id).await
    }
}

fn base_staker(record: &StakerRecord, status: u64) -> Staker {
    Staker {
        id: record.id,
        address: record.address,
        stake: record.stake,
        delegated_me: record.delegated_me,
        total_stake: record.stake.saturating_add(record.delegated_me),
        status,
        created_epoch: record.created_epoch,
        created_time: record.created_time,
        deactivated_epoch: record.deactivated_epoch,
        deactivated_time: record.deactivated_time,
        paid_until_epoch: record.paid_until_epoch,
        ..Staker::default()
    }
}

fn apply_flags(staker: &mut Staker) {
    let deactivated = staker.deactivated_epoch != 0;
    staker.is_cheater = staker.status & STATUS_CHEATER_BIT != 0;
    staker.is_offline = staker.status & STATUS_OFFLINE_BIT != 0;
    staker.is_active = staker.status == 0 && !deactivated;
    staker.is_validator = !deactivated;
    staker.is_locked = staker.locked_until > 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockSfc {
        record: Option<StakerRecord>,
        ratio: Option<U256>,
        lock: Mutex<Option<ChainResult<LockWindow>>>,
    }

    impl MockSfc {
        fn with_record(record: StakerRecord) -> Self {
            Self {
                record: Some(record),
                ratio: Some(U256::from(16_000_000u64)),
                lock: Mutex::new(Some(Ok(LockWindow {
                    from_epoch: Some(100),
                    end_time: Some(1_700_000_000),
                }))),
            }
        }

        fn fail_lock(&self) {
            *self.lock.lock().unwrap() =
                Some(Err(ChainError::Transport("connection reset".to_string())));
        }
    }

    fn transport() -> ChainError {
        ChainError::Transport("unreachable".to_string())
    }

    #[async_trait]
    impl SfcReader for MockSfc {
        async fn sfc_version(&self) -> ChainResult<u64> {
            Ok(0x020004)
        }
        async fn current_epoch(&self) -> ChainResult<u64> {
            Ok(11)
        }
        async fn current_sealed_epoch(&self) -> ChainResult<u64> {
            Ok(10)
        }
        async fn last_staker_id(&self) -> ChainResult<u64> {
            Ok(3)
        }
        async fn stakers_num(&self) -> ChainResult<u64> {
            Ok(3)
        }
        async fn staker_record(&self, _key: StakerKey) -> ChainResult<StakerRecord> {
            self.record.clone().ok_or_else(transport)
        }
        async fn max_delegated_ratio(&self) -> ChainResult<U256> {
            self.ratio.ok_or_else(transport)
        }
        async fn locked_stake(&self, _staker_id: u64) -> ChainResult<LockWindow> {
            self.lock
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Ok(LockWindow::default()))
        }
        async fn epoch_snapshot(&self, id: u64) -> ChainResult<Epoch> {
            Ok(Epoch {
                id,
                total_supply: U256::from(1_000u64),
                ..Epoch::default()
            })
        }
    }

    fn record(status: Option<u64>) -> StakerRecord {
        StakerRecord {
            id: 1,
            address: Address::repeat_byte(0x01),
            status,
            stake: U256::from(1_000u64),
            delegated_me: U256::from(500u64),
            created_epoch: 1,
            created_time: 1_577_419_000,
            ..StakerRecord::default()
        }
    }

    fn assembler(sfc: MockSfc) -> StakingAssembler<MockSfc> {
        StakingAssembler::new(Arc::new(sfc))
    }

    #[tokio::test]
    async fn test_staker_full_assembly() {
        let staker = assembler(MockSfc::with_record(record(Some(0))))
            .staker(StakerKey::Id(1))
            .await
            .unwrap();

        assert_eq!(staker.total_stake, U256::from(1_500u64));
        assert_eq!(staker.total_delegated_limit, U256::from(16_000u64));
        assert_eq!(staker.delegated_limit, I256::try_from(15_500i64).unwrap());
        assert_eq!(staker.locked_from_epoch, 100);
        assert_eq!(staker.locked_until, 1_700_000_000);
        assert!(staker.is_active);
        assert!(staker.is_validator);
        assert!(staker.is_locked);
        assert!(!staker.is_cheater);
        assert!(!staker.is_offline);
    }

    #[tokio::test]
    async fn test_staker_without_status_is_not_found() {
        let err = assembler(MockSfc::with_record(record(None)))
            .staker(StakerKey::Address(Address::repeat_byte(0x09)))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_base_record_failure_is_fatal() {
        let err = assembler(MockSfc::default())
            .staker(StakerKey::Id(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Transport(_)));
    }

    #[tokio::test]
    async fn test_lock_failure_degrades_gracefully() {
        let sfc = MockSfc::with_record(record(Some(0)));
        sfc.fail_lock();
        let staker = assembler(sfc).staker(StakerKey::Id(1)).await.unwrap();

        assert_eq!(staker.locked_from_epoch, 0);
        assert_eq!(staker.locked_until, 0);
        assert!(!staker.is_locked);
        assert_eq!(staker.total_stake, U256::from(1_500u64));
        assert_eq!(staker.total_delegated_limit, U256::from(16_000u64));
    }

    #[tokio::test]
    async fn test_partial_lock_window_is_ignored() {
        let sfc = MockSfc::with_record(record(Some(0)));
        *sfc.lock.lock().unwrap() = Some(Ok(LockWindow {
            from_epoch: Some(5),
            end_time: None,
        }));
        let staker = assembler(sfc).staker(StakerKey::Id(1)).await.unwrap();
        assert_eq!(staker.locked_from_epoch, 0);
        assert!(!staker.is_locked);
    }

    #[tokio::test]
    async fn test_ratio_failure_leaves_limits_zero() {
        let mut sfc = MockSfc::with_record(record(Some(0)));
        sfc.ratio = None;
        let staker = assembler(sfc).staker(StakerKey::Id(1)).await.unwrap();
        assert_eq!(staker.total_delegated_limit, U256::ZERO);
        assert_eq!(staker.delegated_limit, I256::ZERO);
        assert_eq!(staker.total_stake, U256::from(1_500u64));
    }

    #[tokio::test]
    async fn test_status_flags() {
        let mut rec = record(Some(STATUS_CHEATER_BIT | STATUS_OFFLINE_BIT));
        rec.deactivated_epoch = 9;
        let staker = assembler(MockSfc::with_record(rec))
            .staker(StakerKey::Id(1))
            .await
            .unwrap();
        assert!(staker.is_cheater);
        assert!(staker.is_offline);
        assert!(!staker.is_active);
        assert!(!staker.is_validator);
    }

    #[tokio::test]
    async fn test_epoch_is_direct_mapping() {
        let epoch = assembler(MockSfc::default()).epoch(10).await.unwrap();
        assert_eq!(epoch.id, 10);
        assert_eq!(epoch.total_supply, U256::from(1_000u64));
    }

    #[test]
    fn test_over_delegated_limit_is_negative() {
        // 100 * 1.5 = 150 allowed, 200 delegated.
        let (total, remaining) =
            delegation_limits(U256::from(100u64), U256::from(200u64), U256::from(1_500_000u64));
        assert_eq!(total, U256::from(150u64));
        assert_eq!(remaining, I256::try_from(-50i64).unwrap());
    }

    proptest! {
        #[test]
        fn prop_delegation_limits_match_integer_math(
            stake in 0u64..u64::MAX / 2,
            delegated in 0u64..u64::MAX / 2,
            ratio in 0u64..20_000_000,
        ) {
            let (total, remaining) =
                delegation_limits(U256::from(stake), U256::from(delegated), U256::from(ratio));

            let expected_total = u128::from(stake) * u128::from(ratio) / u128::from(RATIO_UNIT);
            prop_assert_eq!(total, U256::from(expected_total));

            let expected_remaining = expected_total as i128 - i128::from(delegated);
            prop_assert_eq!(remaining, I256::try_from(expected_remaining).unwrap());
        }
    }
}
