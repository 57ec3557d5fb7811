//! In-crate test doubles for the full node.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use futures::stream;
use parking_lot::Mutex;

use opera_api_types::{
    Block, Contract, ContractMetadata, Epoch, Page, PageRequest, StakerKey, Transaction,
};
use opera_chain_client::{
    ChainError, ChainReader, ChainResult, ChainSubscriber, ChainWriter, LockWindow,
    NotificationStream, SfcReader, StakerRecord,
};

use crate::error::{StoreError, StoreResult};
use crate::index::{BalanceSource, DocumentStore, SqliteDocumentStore};

/// Scripted full node.
///
/// Subscriptions hand out the queued scripts in order; once the queue is
/// empty a subscription stays open without yielding anything.
#[derive(Default)]
pub struct MockChain {
    pub height: Mutex<u64>,
    pub blocks: Mutex<BTreeMap<u64, Block>>,
    pub transactions: Mutex<BTreeMap<B256, Transaction>>,
    pub balances: Mutex<BTreeMap<Address, U256>>,
    pub nonces: Mutex<BTreeMap<Address, u64>>,
    pub block_scripts: Mutex<VecDeque<ChainResult<Vec<ChainResult<Block>>>>>,
    pub tx_scripts: Mutex<VecDeque<ChainResult<Vec<ChainResult<Transaction>>>>>,
    pub submitted: Mutex<Vec<Bytes>>,
    pub sealed_epoch: Mutex<u64>,
    pub epochs: Mutex<BTreeMap<u64, Epoch>>,
    pub stakers: Mutex<BTreeMap<u64, StakerRecord>>,
    pub fail_transaction: Mutex<Option<ChainError>>,
    pub fail_send: Mutex<Option<ChainError>>,
    pub transaction_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub epoch_calls: AtomicUsize,
    pub block_subscriptions: AtomicUsize,
    pub tx_subscriptions: AtomicUsize,
}

impl MockChain {
    fn take_failure(slot: &Mutex<Option<ChainError>>) -> Option<ChainError> {
        slot.lock().take()
    }

    pub fn insert_block(&self, block: Block) {
        let mut height = self.height.lock();
        *height = (*height).max(block.number);
        self.blocks.lock().insert(block.number, block);
    }

    pub fn insert_transaction(&self, tx: Transaction) {
        self.transactions.lock().insert(tx.hash, tx);
    }

    pub fn script_blocks(&self, items: Vec<ChainResult<Block>>) {
        self.block_scripts.lock().push_back(Ok(items));
    }

    pub fn script_transactions(&self, items: Vec<ChainResult<Transaction>>) {
        self.tx_scripts.lock().push_back(Ok(items));
    }

    fn scripted<T: Send + 'static>(
        scripts: &Mutex<VecDeque<ChainResult<Vec<ChainResult<T>>>>>,
    ) -> ChainResult<NotificationStream<T>> {
        match scripts.lock().pop_front() {
            Some(script) => Ok(Box::pin(stream::iter(script?))),
            None => Ok(Box::pin(stream::pending())),
        }
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn block_height(&self) -> ChainResult<u64> {
        Ok(*self.height.lock())
    }

    async fn block_by_number(&self, number: Option<u64>) -> ChainResult<Block> {
        let number = number.unwrap_or(*self.height.lock());
        self.blocks
            .lock()
            .get(&number)
            .cloned()
            .ok_or_else(|| ChainError::not_found(format_args!("block #{number}")))
    }

    async fn block_by_hash(&self, hash: B256) -> ChainResult<Block> {
        self.blocks
            .lock()
            .values()
            .find(|b| b.hash == hash)
            .cloned()
            .ok_or_else(|| ChainError::not_found(format_args!("block {hash}")))
    }

    async fn transaction(&self, hash: B256) -> ChainResult<Transaction> {
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = Self::take_failure(&self.fail_transaction) {
            return Err(err);
        }
        self.transactions
            .lock()
            .get(&hash)
            .cloned()
            .ok_or_else(|| ChainError::not_found(format_args!("transaction {hash}")))
    }

    async fn balance(&self, address: Address) -> ChainResult<U256> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .balances
            .lock()
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn nonce(&self, address: Address) -> ChainResult<u64> {
        Ok(self.nonces.lock().get(&address).copied().unwrap_or_default())
    }

    async fn gas_price(&self) -> ChainResult<U256> {
        Ok(U256::from(1_000_000_000u64))
    }
}

#[async_trait]
impl ChainWriter for MockChain {
    async fn send_raw_transaction(&self, raw: Bytes) -> ChainResult<B256> {
        if let Some(err) = Self::take_failure(&self.fail_send) {
            return Err(err);
        }
        let hash = B256::right_padding_from(raw.as_ref());
        self.submitted.lock().push(raw);
        Ok(hash)
    }
}

#[async_trait]
impl ChainSubscriber for MockChain {
    async fn subscribe_blocks(&self) -> ChainResult<NotificationStream<Block>> {
        self.block_subscriptions.fetch_add(1, Ordering::SeqCst);
        Self::scripted(&self.block_scripts)
    }

    async fn subscribe_transactions(&self) -> ChainResult<NotificationStream<Transaction>> {
        self.tx_subscriptions.fetch_add(1, Ordering::SeqCst);
        Self::scripted(&self.tx_scripts)
    }
}

#[async_trait]
impl SfcReader for MockChain {
    async fn sfc_version(&self) -> ChainResult<u64> {
        Ok(0x020004)
    }

    async fn current_epoch(&self) -> ChainResult<u64> {
        Ok(*self.sealed_epoch.lock() + 1)
    }

    async fn current_sealed_epoch(&self) -> ChainResult<u64> {
        Ok(*self.sealed_epoch.lock())
    }

    async fn last_staker_id(&self) -> ChainResult<u64> {
        Ok(self.stakers.lock().keys().next_back().copied().unwrap_or_default())
    }

    async fn stakers_num(&self) -> ChainResult<u64> {
        Ok(self.stakers.lock().len() as u64)
    }

    async fn staker_record(&self, key: StakerKey) -> ChainResult<StakerRecord> {
        let stakers = self.stakers.lock();
        let found = match key {
            StakerKey::Id(id) => stakers.get(&id).cloned(),
            StakerKey::Address(address) => {
                stakers.values().find(|s| s.address == address).cloned()
            }
        };
        Ok(found.unwrap_or_default())
    }

    async fn max_delegated_ratio(&self) -> ChainResult<U256> {
        Ok(U256::from(15_000_000u64))
    }

    async fn locked_stake(&self, _staker_id: u64) -> ChainResult<LockWindow> {
        Err(ChainError::Transport("lock window unavailable".to_string()))
    }

    async fn epoch_snapshot(&self, id: u64) -> ChainResult<Epoch> {
        self.epoch_calls.fetch_add(1, Ordering::SeqCst);
        self.epochs
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| ChainError::not_found(format_args!("epoch {id}")))
    }
}

/// In-memory store whose next block or transaction append can be made to
/// fail once.
pub struct FlakyStore {
    pub inner: SqliteDocumentStore,
    pub fail_block: Mutex<Option<u64>>,
    pub fail_transaction: Mutex<Option<B256>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteDocumentStore::in_memory().unwrap(),
            fail_block: Mutex::new(None),
            fail_transaction: Mutex::new(None),
        }
    }

    fn injected(what: impl std::fmt::Display) -> StoreError {
        StoreError::Sqlite(format!("injected failure for {what}"))
    }
}

impl DocumentStore for FlakyStore {
    fn append_block(&self, block: &Block) -> StoreResult<()> {
        let mut slot = self.fail_block.lock();
        if *slot == Some(block.number) {
            *slot = None;
            return Err(Self::injected(format_args!("block #{}", block.number)));
        }
        drop(slot);
        self.inner.append_block(block)
    }

    fn append_transaction(&self, block: Option<&Block>, tx: &Transaction) -> StoreResult<()> {
        let mut slot = self.fail_transaction.lock();
        if *slot == Some(tx.hash) {
            *slot = None;
            return Err(Self::injected(tx.hash));
        }
        drop(slot);
        self.inner.append_transaction(block, tx)
    }

    fn append_contract(&self, tx: &Transaction, timestamp: u64) -> StoreResult<()> {
        self.inner.append_contract(tx, timestamp)
    }

    fn update_contract_metadata(
        &self,
        address: Address,
        metadata: &ContractMetadata,
    ) -> StoreResult<bool> {
        self.inner.update_contract_metadata(address, metadata)
    }

    fn latest_block_number(&self) -> StoreResult<Option<u64>> {
        self.inner.latest_block_number()
    }

    fn block_by_number(&self, number: u64) -> StoreResult<Option<Block>> {
        self.inner.block_by_number(number)
    }

    fn block_by_hash(&self, hash: B256) -> StoreResult<Option<Block>> {
        self.inner.block_by_hash(hash)
    }

    fn transaction(&self, hash: B256) -> StoreResult<Option<Transaction>> {
        self.inner.transaction(hash)
    }

    fn contract(&self, address: Address) -> StoreResult<Option<Contract>> {
        self.inner.contract(address)
    }

    fn blocks(&self, request: PageRequest) -> StoreResult<Page<Block>> {
        self.inner.blocks(request)
    }

    fn transactions(&self, request: PageRequest) -> StoreResult<Page<Transaction>> {
        self.inner.transactions(request)
    }

    fn account_transactions(
        &self,
        address: Address,
        request: PageRequest,
    ) -> StoreResult<Page<Transaction>> {
        self.inner.account_transactions(address, request)
    }

    fn contracts(&self, validated_only: bool, request: PageRequest) -> StoreResult<Page<Contract>> {
        self.inner.contracts(validated_only, request)
    }

    fn blocks_count(&self) -> StoreResult<u64> {
        self.inner.blocks_count()
    }

    fn transactions_count(&self) -> StoreResult<u64> {
        self.inner.transactions_count()
    }

    fn accounts_active(&self) -> StoreResult<u64> {
        self.inner.accounts_active()
    }

    fn contracts_count(&self, validated_only: bool) -> StoreResult<u64> {
        self.inner.contracts_count(validated_only)
    }

    fn set_balance_source(&self, source: Arc<dyn BalanceSource>) {
        self.inner.set_balance_source(source)
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
