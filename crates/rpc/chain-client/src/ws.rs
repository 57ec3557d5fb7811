//! Chain client over a jsonrpsee WebSocket connection.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use futures::StreamExt;
use jsonrpsee::core::client::{ClientT, Subscription, SubscriptionClientT};
use jsonrpsee::core::ClientError;
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use tokio::sync::Mutex;

use opera_api_types::{
    Block, BlockNumberOrTag, CallRequest, Epoch, RpcBlock, RpcReceipt, RpcTransaction, StakerKey,
    Transaction,
};

use crate::error::{ChainError, ChainResult};
use crate::sfc::{self, ISfc, SFC_ADDRESS};
use crate::traits::{
    ChainReader, ChainSubscriber, ChainWriter, LockWindow, NotificationStream, SfcReader,
    StakerRecord,
};

/// A `null` result means the node has no such entity.
fn found<T>(value: Option<T>, what: impl std::fmt::Display) -> ChainResult<T> {
    value.ok_or_else(|| ChainError::not_found(what))
}

/// Errors of a submission; the node answering about a missing resource is
/// still a rejection of the transaction.
fn rejection(err: ClientError) -> ChainError {
    match ChainError::from(err) {
        ChainError::NotFound(msg) => ChainError::Rejected(msg),
        other => other,
    }
}

/// Complete a transaction with its receipt.
fn merge_receipt(tx: RpcTransaction, receipt: Option<RpcReceipt>) -> ChainResult<Transaction> {
    Ok(tx.try_into_transaction(receipt)?)
}

/// Pending transactions may leave the pool before they are resolved; such
/// announcements are dropped from the feed.
fn skip_vanished(resolved: ChainResult<Transaction>) -> Option<ChainResult<Transaction>> {
    match resolved {
        Err(ChainError::NotFound(what)) => {
            tracing::debug!(%what, "announced transaction vanished before lookup");
            None
        }
        other => Some(other),
    }
}

/// Connection settings of [`WsChainClient`].
#[derive(Debug, Clone)]
pub struct WsClientConfig {
    pub url: String,
    pub request_timeout: Duration,
    pub sfc_address: Address,
}

impl WsClientConfig {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            request_timeout,
            sfc_address: SFC_ADDRESS,
        }
    }
}

struct Inner {
    config: WsClientConfig,
    client: Mutex<Arc<WsClient>>,
}

/// Full-node client; cheap to clone.
///
/// The underlying connection is re-established on the next request after the
/// node drops it, so a resubscription after a disconnect reaches a live
/// socket.
#[derive(Clone)]
pub struct WsChainClient {
    inner: Arc<Inner>,
}

impl WsChainClient {
    pub async fn connect(config: WsClientConfig) -> ChainResult<Self> {
        let client = Self::dial(&config).await?;
        tracing::info!(url = %config.url, "connected to full node");
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                client: Mutex::new(Arc::new(client)),
            }),
        })
    }

    async fn dial(config: &WsClientConfig) -> ChainResult<WsClient> {
        WsClientBuilder::default()
            .request_timeout(config.request_timeout)
            .build(&config.url)
            .await
            .map_err(ChainError::from)
    }

    /// Current connection, redialing if the previous one was lost.
    async fn connection(&self) -> ChainResult<Arc<WsClient>> {
        let mut guard = self.inner.client.lock().await;
        if !guard.is_connected() {
            tracing::warn!(url = %self.inner.config.url, "full node connection lost, redialing");
            *guard = Arc::new(Self::dial(&self.inner.config).await?);
        }
        Ok(Arc::clone(&guard))
    }

    async fn call_sfc<C: SolCall + Send>(&self, call: C) -> ChainResult<C::Return> {
        let request = CallRequest::new(self.inner.config.sfc_address, call.abi_encode());
        let client = self.connection().await?;
        let data: Bytes = client
            .request("eth_call", rpc_params![request, BlockNumberOrTag::default()])
            .await?;
        Ok(C::abi_decode_returns(&data, true)?)
    }

    async fn receipt(&self, hash: B256) -> ChainResult<Option<RpcReceipt>> {
        let client = self.connection().await?;
        Ok(client
            .request("eth_getTransactionReceipt", rpc_params![hash])
            .await?)
    }
}

#[async_trait]
impl ChainReader for WsChainClient {
    async fn block_height(&self) -> ChainResult<u64> {
        let client = self.connection().await?;
        let height: U64 = client.request("eth_blockNumber", rpc_params![]).await?;
        Ok(height.to::<u64>())
    }

    async fn block_by_number(&self, number: Option<u64>) -> ChainResult<Block> {
        let client = self.connection().await?;
        let block: Option<RpcBlock> = client
            .request(
                "eth_getBlockByNumber",
                rpc_params![BlockNumberOrTag::from(number), false],
            )
            .await?;
        let block = match number {
            Some(n) => found(block, format_args!("block #{n}"))?,
            None => found(block, "latest block")?,
        };
        Ok(Block::from(block))
    }

    async fn block_by_hash(&self, hash: B256) -> ChainResult<Block> {
        let client = self.connection().await?;
        let block: Option<RpcBlock> = client
            .request("eth_getBlockByHash", rpc_params![hash, false])
            .await?;
        found(block, format_args!("block {hash}")).map(Block::from)
    }

    async fn transaction(&self, hash: B256) -> ChainResult<Transaction> {
        let client = self.connection().await?;
        let tx: Option<RpcTransaction> = client
            .request("eth_getTransactionByHash", rpc_params![hash])
            .await?;
        let tx = found(tx, format_args!("transaction {hash}"))?;

        let receipt = if tx.block_hash.is_some() {
            self.receipt(hash).await?
        } else {
            None
        };
        merge_receipt(tx, receipt)
    }

    async fn balance(&self, address: Address) -> ChainResult<U256> {
        let client = self.connection().await?;
        Ok(client
            .request(
                "eth_getBalance",
                rpc_params![address, BlockNumberOrTag::default()],
            )
            .await?)
    }

    async fn nonce(&self, address: Address) -> ChainResult<u64> {
        let client = self.connection().await?;
        let nonce: U64 = client
            .request(
                "eth_getTransactionCount",
                rpc_params![address, BlockNumberOrTag::default()],
            )
            .await?;
        Ok(nonce.to::<u64>())
    }

    async fn gas_price(&self) -> ChainResult<U256> {
        let client = self.connection().await?;
        Ok(client.request("eth_gasPrice", rpc_params![]).await?)
    }
}

#[async_trait]
impl ChainWriter for WsChainClient {
    async fn send_raw_transaction(&self, raw: Bytes) -> ChainResult<B256> {
        let client = self.connection().await?;
        client
            .request("eth_sendRawTransaction", rpc_params![raw])
            .await
            .map_err(rejection)
    }
}

#[async_trait]
impl ChainSubscriber for WsChainClient {
    async fn subscribe_blocks(&self) -> ChainResult<NotificationStream<Block>> {
        let client = self.connection().await?;
        let heads: Subscription<RpcBlock> = client
            .subscribe("eth_subscribe", rpc_params!["newHeads"], "eth_unsubscribe")
            .await?;
        Ok(Box::pin(heads.map(|head| {
            head.map(Block::from).map_err(ChainError::from)
        })))
    }

    async fn subscribe_transactions(&self) -> ChainResult<NotificationStream<Transaction>> {
        let client = self.connection().await?;
        let hashes: Subscription<B256> = client
            .subscribe(
                "eth_subscribe",
                rpc_params!["newPendingTransactions"],
                "eth_unsubscribe",
            )
            .await?;

        let this = self.clone();
        let resolved = hashes.then(move |hash| {
            let this = this.clone();
            async move { this.transaction(hash?).await }
        });
        Ok(Box::pin(resolved.filter_map(|tx| async move { skip_vanished(tx) })))
    }
}

#[async_trait]
impl SfcReader for WsChainClient {
    async fn sfc_version(&self) -> ChainResult<u64> {
        let ret = self.call_sfc(ISfc::versionCall {}).await?;
        Ok(sfc::pack_version(ret._0))
    }

    async fn current_epoch(&self) -> ChainResult<u64> {
        let ret = self.call_sfc(ISfc::currentEpochCall {}).await?;
        Ok(ret._0.saturating_to())
    }

    async fn current_sealed_epoch(&self) -> ChainResult<u64> {
        let ret = self.call_sfc(ISfc::currentSealedEpochCall {}).await?;
        Ok(ret._0.saturating_to())
    }

    async fn last_staker_id(&self) -> ChainResult<u64> {
        let ret = self.call_sfc(ISfc::stakersLastIDCall {}).await?;
        Ok(ret._0.saturating_to())
    }

    async fn stakers_num(&self) -> ChainResult<u64> {
        let ret = self.call_sfc(ISfc::stakersNumCall {}).await?;
        Ok(ret._0.saturating_to())
    }

    async fn staker_record(&self, key: StakerKey) -> ChainResult<StakerRecord> {
        let id = match key {
            StakerKey::Id(id) => id,
            StakerKey::Address(addr) => {
                let ret = self.call_sfc(ISfc::getStakerIDCall { addr }).await?;
                if ret._0.is_zero() {
                    return Ok(StakerRecord::default());
                }
                ret._0.saturating_to()
            }
        };
        let ret = self
            .call_sfc(ISfc::stakersCall {
                stakerID: U256::from(id),
            })
            .await?;
        Ok(sfc::staker_record(id, ret))
    }

    async fn max_delegated_ratio(&self) -> ChainResult<U256> {
        let ret = self.call_sfc(ISfc::maxDelegatedRatioCall {}).await?;
        Ok(ret._0)
    }

    async fn locked_stake(&self, staker_id: u64) -> ChainResult<LockWindow> {
        let ret = self
            .call_sfc(ISfc::lockedStakesCall {
                stakerID: U256::from(staker_id),
            })
            .await?;
        Ok(sfc::lock_window(ret))
    }

    async fn epoch_snapshot(&self, id: u64) -> ChainResult<Epoch> {
        let ret = self
            .call_sfc(ISfc::epochSnapshotsCall {
                epoch: U256::from(id),
            })
            .await?;
        Ok(sfc::epoch_snapshot(id, ret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use jsonrpsee::types::ErrorObjectOwned;
    use opera_api_types::TxStatus;

    fn call_error(code: i32, message: &str) -> ClientError {
        ClientError::Call(ErrorObjectOwned::owned::<()>(code, message, None))
    }

    fn mined_tx(index: &str) -> RpcTransaction {
        serde_json::from_value(serde_json::json!({
            "hash": format!("0x{}", "11".repeat(32)),
            "nonce": "0x3",
            "blockHash": format!("0x{}", "22".repeat(32)),
            "blockNumber": "0xa",
            "transactionIndex": index,
            "from": format!("0x{}", "01".repeat(20)),
            "to": null,
            "value": "0x5",
            "gas": "0x5208",
            "gasPrice": "0x3b9aca00",
            "input": "0x"
        }))
        .unwrap()
    }

    #[test]
    fn test_null_result_is_not_found() {
        let err = found(None::<RpcBlock>, format_args!("block #{}", 9)).unwrap_err();
        assert_eq!(err, ChainError::NotFound("block #9".to_string()));
        assert_eq!(found(Some(3u8), "anything"), Ok(3));
    }

    #[test]
    fn test_resource_not_found_code_maps_to_not_found_on_reads() {
        let err = ChainError::from(call_error(codes::RESOURCE_NOT_FOUND, "unknown block"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_submission_errors_are_rejections() {
        assert_eq!(
            rejection(call_error(codes::RESOURCE_NOT_FOUND, "unknown account")),
            ChainError::Rejected("unknown account".to_string())
        );
        assert_eq!(
            rejection(call_error(codes::TRANSACTION_REJECTED, "nonce too low")),
            ChainError::Rejected("nonce too low".to_string())
        );
        assert!(rejection(ClientError::RequestTimeout).is_transport());
    }

    #[test]
    fn test_receipt_is_merged_into_mined_transaction() {
        let receipt: RpcReceipt = serde_json::from_value(serde_json::json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockHash": format!("0x{}", "22".repeat(32)),
            "blockNumber": "0xa",
            "contractAddress": format!("0x{}", "33".repeat(20)),
            "status": "0x0"
        }))
        .unwrap();

        let tx = merge_receipt(mined_tx("0x2"), Some(receipt)).unwrap();
        assert_eq!(tx.status, Some(TxStatus::Failure));
        assert_eq!(tx.contract_address, Some(Address::repeat_byte(0x33)));
        assert_eq!(tx.block_number, Some(10));
        assert_eq!(tx.index, Some(2));
        assert_eq!(tx.gas_price, U256::from(1_000_000_000u64));

        let without = merge_receipt(mined_tx("0x2"), None).unwrap();
        assert_eq!(without.status, Some(TxStatus::Unknown));
        assert_eq!(without.contract_address, None);
    }

    #[test]
    fn test_unencodable_position_is_a_decode_error() {
        let err = merge_receipt(mined_tx("0x10000"), None).unwrap_err();
        assert!(matches!(err, ChainError::Decode(_)));
    }

    #[test]
    fn test_vanished_pending_transactions_are_skipped() {
        assert!(skip_vanished(Err(ChainError::not_found("transaction 0x01"))).is_none());

        let transport = skip_vanished(Err(ChainError::Transport("closed".to_string())));
        assert!(matches!(transport, Some(Err(ChainError::Transport(_)))));
    }
}
