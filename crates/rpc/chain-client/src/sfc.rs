//! SFC contract bindings and the mapping of its return tuples.
#![cfg_attr(test, allow(clippy::indexing_slicing))]

use alloy_primitives::{address, Address, FixedBytes, U256};
use alloy_sol_types::sol;

use opera_api_types::Epoch;

use crate::traits::{LockWindow, StakerRecord};

/// Address the SFC contract is deployed at on every Opera network.
pub const SFC_ADDRESS: Address = address!("fc00face00000000000000000000000000000000");

sol! {
    interface ISfc {
        function version() external pure returns (bytes3);

        function currentEpoch() external view returns (uint256);

        function currentSealedEpoch() external view returns (uint256);

        function stakersLastID() external view returns (uint256);

        function stakersNum() external view returns (uint256);

        function maxDelegatedRatio() external pure returns (uint256);

        function getStakerID(address addr) external view returns (uint256);

        function stakers(uint256 stakerID) external view returns (
            uint256 status,
            uint256 createdEpoch,
            uint256 createdTime,
            uint256 deactivatedEpoch,
            uint256 deactivatedTime,
            uint256 stakeAmount,
            uint256 paidUntilEpoch,
            uint256 delegatedMe,
            address dagAddress,
            address sfcAddress
        );

        function lockedStakes(uint256 stakerID) external view returns (
            uint256 fromEpoch,
            uint256 endTime,
            uint256 duration
        );

        function epochSnapshots(uint256 epoch) external view returns (
            uint256 endTime,
            uint256 duration,
            uint256 epochFee,
            uint256 totalBaseRewardWeight,
            uint256 totalTxRewardWeight,
            uint256 baseRewardPerSecond,
            uint256 stakeTotalAmount,
            uint256 delegationsTotalAmount,
            uint256 totalSupply
        );
    }
}

/// Pack the `bytes3` version as `major << 16 | minor << 8 | patch`.
pub fn pack_version(version: FixedBytes<3>) -> u64 {
    version
        .iter()
        .fold(0u64, |packed, byte| (packed << 8) | u64::from(*byte))
}

/// Map a `stakers(id)` result; a zero creation epoch means no record.
pub fn staker_record(id: u64, ret: ISfc::stakersReturn) -> StakerRecord {
    let exists = !ret.createdEpoch.is_zero();
    StakerRecord {
        id,
        address: ret.sfcAddress,
        status: exists.then(|| ret.status.saturating_to()),
        stake: ret.stakeAmount,
        delegated_me: ret.delegatedMe,
        created_epoch: ret.createdEpoch.saturating_to(),
        created_time: ret.createdTime.saturating_to(),
        deactivated_epoch: ret.deactivatedEpoch.saturating_to(),
        deactivated_time: ret.deactivatedTime.saturating_to(),
        paid_until_epoch: ret.paidUntilEpoch.saturating_to(),
    }
}

/// Map a `lockedStakes(id)` result; zero values mean the field is unset.
pub fn lock_window(ret: ISfc::lockedStakesReturn) -> LockWindow {
    let non_zero = |value: U256| (!value.is_zero()).then(|| value.saturating_to());
    LockWindow {
        from_epoch: non_zero(ret.fromEpoch),
        end_time: non_zero(ret.endTime),
    }
}

pub fn epoch_snapshot(id: u64, ret: ISfc::epochSnapshotsReturn) -> Epoch {
    Epoch {
        id,
        end_time: ret.endTime,
        duration: ret.duration,
        epoch_fee: ret.epochFee,
        total_base_reward_weight: ret.totalBaseRewardWeight,
        total_tx_reward_weight: ret.totalTxRewardWeight,
        base_reward_per_second: ret.baseRewardPerSecond,
        stake_total_amount: ret.stakeTotalAmount,
        delegations_total_amount: ret.delegationsTotalAmount,
        total_supply: ret.totalSupply,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::fixed_bytes;
    use alloy_sol_types::SolCall;

    fn stakers_return(created_epoch: u64) -> ISfc::stakersReturn {
        ISfc::stakersReturn {
            status: U256::from(1u64 << 8),
            createdEpoch: U256::from(created_epoch),
            createdTime: U256::from(1_600_000_000u64),
            deactivatedEpoch: U256::ZERO,
            deactivatedTime: U256::ZERO,
            stakeAmount: U256::from(3_175_000u64),
            paidUntilEpoch: U256::from(42u64),
            delegatedMe: U256::from(10u64),
            dagAddress: Address::repeat_byte(0x0d),
            sfcAddress: Address::repeat_byte(0x5f),
        }
    }

    #[test]
    fn test_pack_version() {
        assert_eq!(pack_version(fixed_bytes!("020004")), (2 << 16) | 4);
        assert_eq!(pack_version(fixed_bytes!("000000")), 0);
    }

    #[test]
    fn test_staker_record_without_creation_has_no_status() {
        assert_eq!(staker_record(9, stakers_return(0)).status, None);

        let record = staker_record(9, stakers_return(3));
        assert_eq!(record.status, Some(1 << 8));
        assert_eq!(record.address, Address::repeat_byte(0x5f));
        assert_eq!(record.stake, U256::from(3_175_000u64));
        assert_eq!(record.paid_until_epoch, 42);
    }

    #[test]
    fn test_lock_window_treats_zero_as_unset() {
        let window = lock_window(ISfc::lockedStakesReturn {
            fromEpoch: U256::from(7u64),
            endTime: U256::ZERO,
            duration: U256::ZERO,
        });
        assert_eq!(window.from_epoch, Some(7));
        assert_eq!(window.end_time, None);
    }

    #[test]
    fn test_call_selector_targets_stakers() {
        let data = ISfc::stakersCall {
            stakerID: U256::from(1u64),
        }
        .abi_encode();
        assert_eq!(&data[..4], ISfc::stakersCall::SELECTOR.as_slice());
        assert_eq!(data.len(), 4 + 32);
    }
}
