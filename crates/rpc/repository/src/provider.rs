//! Repository facade.
//!
//! `Repository` is the single entry point of the query layer. It decides per
//! lookup which source answers it:
//!
//! - hot single entities (confirmed transactions, the last sealed epoch,
//!   warmed balances) are looked up in the cache first and written back on a miss
//! - paginated collections and aggregates come from the document store
//! - everything else is read live from the full node
//!
//! The surface is split into capability traits ([`EntityReader`],
//! [`CollectionReader`], [`TransactionSubmitter`], [`FeedRegistry`]) so that
//! each consumer only depends on what it uses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use opera_api_types::{
    Account, Block, Contract, CurrentState, Cursor, Epoch, Page, PageRequest, Staker, StakerKey,
    Transaction,
};
use opera_chain_client::{ChainClient, ChainReader, StakingAssembler};
use opera_operations::ShutdownAware;

use crate::cache::CacheBridge;
use crate::error::{RepositoryError, RepositoryResult};
use crate::feeds::{FeedConfig, FeedSubscription, LiveFeeds};
use crate::index::{BalanceSource, DocumentStore};
use crate::orchestrator::Orchestrator;
use crate::retry::RetryConfig;

/// Largest page served per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub max_transactions: u32,
    pub max_blocks: u32,
    pub max_contracts: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_transactions: 50,
            max_blocks: 50,
            max_contracts: 50,
        }
    }
}

/// Balance warming workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmerConfig {
    pub workers: usize,
    /// Addresses waiting for a worker; further ones are dropped.
    pub queue_capacity: usize,
}

impl Default for WarmerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
        }
    }
}

/// Repository configuration.
#[derive(Debug, Clone, Default)]
pub struct RepositoryConfig {
    pub pagination: PaginationConfig,
    pub feeds: FeedConfig,
    pub retry: RetryConfig,
    pub warmer: WarmerConfig,
}

/// Single-entity lookups.
#[async_trait]
pub trait EntityReader: Send + Sync {
    /// Account view; every address has one.
    async fn account(&self, address: Address) -> RepositoryResult<Account>;

    async fn account_balance(&self, address: Address) -> RepositoryResult<U256>;

    async fn account_nonce(&self, address: Address) -> RepositoryResult<u64>;

    /// Staker registered for `address`, if any.
    async fn account_staker(&self, address: Address) -> RepositoryResult<Option<Staker>>;

    /// Current height reported by the node.
    async fn block_height(&self) -> RepositoryResult<u64>;

    /// Highest block in the document store.
    async fn last_known_block(&self) -> RepositoryResult<u64>;

    /// Block by number; `None` is the latest block.
    async fn block_by_number(&self, number: Option<u64>) -> RepositoryResult<Block>;

    async fn block_by_hash(&self, hash: B256) -> RepositoryResult<Block>;

    async fn transaction(&self, hash: B256) -> RepositoryResult<Transaction>;

    async fn contract(&self, address: Address) -> RepositoryResult<Contract>;

    async fn current_epoch(&self) -> RepositoryResult<u64>;

    async fn current_sealed_epoch(&self) -> RepositoryResult<Epoch>;

    async fn epoch(&self, id: u64) -> RepositoryResult<Epoch>;

    async fn sfc_version(&self) -> RepositoryResult<u64>;

    async fn last_staker_id(&self) -> RepositoryResult<u64>;

    async fn stakers_num(&self) -> RepositoryResult<u64>;

    async fn staker(&self, id: u64) -> RepositoryResult<Staker>;

    async fn staker_by_address(&self, address: Address) -> RepositoryResult<Staker>;

    /// Every staker from id 1 to the last assigned id; ids without a record
    /// are left out.
    async fn stakers(&self) -> RepositoryResult<Vec<Staker>>;

    async fn current_state(&self) -> RepositoryResult<CurrentState>;

    /// Gas price suggested by the node, in wei.
    async fn gas_price(&self) -> RepositoryResult<U256>;
}

/// Paginated collections and their aggregates.
///
/// A positive `count` pages toward older entries, a negative one toward newer
/// entries; `|count|` is clamped to the collection maximum.
#[async_trait]
pub trait CollectionReader: Send + Sync {
    async fn blocks(&self, cursor: Option<Cursor>, count: i32) -> RepositoryResult<Page<Block>>;

    async fn blocks_count(&self) -> RepositoryResult<u64>;

    async fn transactions(
        &self,
        cursor: Option<Cursor>,
        count: i32,
    ) -> RepositoryResult<Page<Transaction>>;

    async fn transactions_count(&self) -> RepositoryResult<u64>;

    async fn account_transactions(
        &self,
        address: Address,
        cursor: Option<Cursor>,
        count: i32,
    ) -> RepositoryResult<Page<Transaction>>;

    async fn accounts_active(&self) -> RepositoryResult<u64>;

    async fn contracts(
        &self,
        validated_only: bool,
        cursor: Option<Cursor>,
        count: i32,
    ) -> RepositoryResult<Page<Contract>>;

    async fn contracts_count(&self, validated_only: bool) -> RepositoryResult<u64>;
}

/// Raw transaction submission.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Submit a signed transaction and return it as the node now reports it.
    async fn send_transaction(&self, raw: Bytes) -> RepositoryResult<Transaction>;
}

/// Registration on the live feeds.
pub trait FeedRegistry: Send + Sync {
    fn subscribe_blocks(&self) -> FeedSubscription<Block>;

    fn subscribe_transactions(&self) -> FeedSubscription<Transaction>;

    fn unsubscribe_blocks(&self, id: u64) -> bool;

    fn unsubscribe_transactions(&self, id: u64) -> bool;
}

/// Warms the balance cache for addresses touched by indexing.
///
/// Addresses go through a bounded queue served by a fixed set of workers. An
/// address arriving while the queue is full is dropped.
struct BalanceWarmer {
    queue: Mutex<Option<mpsc::Sender<Address>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl BalanceWarmer {
    fn new(queue: mpsc::Sender<Address>, workers: Vec<JoinHandle<()>>) -> Self {
        Self {
            queue: Mutex::new(Some(queue)),
            workers: Mutex::new(workers),
            dropped: AtomicU64::new(0),
        }
    }

    fn spawn<C, K>(
        chain: Arc<C>,
        cache: Arc<K>,
        config: WarmerConfig,
        runtime: &tokio::runtime::Handle,
    ) -> Self
    where
        C: ChainReader + ?Sized + 'static,
        K: CacheBridge + ?Sized + 'static,
    {
        let (queue, rx) = mpsc::channel::<Address>(config.queue_capacity.max(1));
        let shared_rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..config.workers.max(1))
            .map(|_| {
                let rx = Arc::clone(&shared_rx);
                let chain = Arc::clone(&chain);
                let cache = Arc::clone(&cache);
                runtime.spawn(async move {
                    loop {
                        let next = {
                            let mut guard = rx.lock().await;
                            guard.recv().await
                        };
                        let Some(address) = next else { break };

                        match chain.balance(address).await {
                            Ok(balance) => {
                                if let Err(err) = cache.push_balance(&address, balance) {
                                    tracing::debug!(%address, error = %err, "balance not cached");
                                }
                            }
                            Err(err) => {
                                tracing::debug!(%address, error = %err, "balance warming failed");
                            }
                        }
                    }
                })
            })
            .collect();

        Self::new(queue, workers)
    }

    /// Stop accepting addresses and wait for the workers to drain the queue.
    async fn close(&self) {
        drop(self.queue.lock().take());
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if let Err(err) = worker.await {
                tracing::error!(error = %err, "balance warming worker failed");
            }
        }
    }
}

impl BalanceSource for BalanceWarmer {
    fn balances_touched(&self, addresses: &[Address]) {
        let queue = self.queue.lock();
        let Some(queue) = queue.as_ref() else {
            return;
        };

        let mut unique = addresses.to_vec();
        unique.sort_unstable();
        unique.dedup();

        for address in unique {
            match queue.try_send(address) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::debug!(%address, dropped, "balance warming queue full");
                }
                Err(TrySendError::Closed(_)) => return,
            }
        }
    }
}

/// Cache-aside facade over the full node, the document store and the cache.
pub struct Repository<C: ?Sized, S: ?Sized, K: ?Sized> {
    chain: Arc<C>,
    store: Arc<S>,
    cache: Arc<K>,
    staking: StakingAssembler<C>,
    feeds: LiveFeeds,
    config: RepositoryConfig,
    orchestrator: Mutex<Option<Arc<Orchestrator>>>,
    warmer: Option<Arc<BalanceWarmer>>,
}

impl<C, S, K> Repository<C, S, K>
where
    C: ChainClient + ?Sized + 'static,
    S: DocumentStore + ?Sized + 'static,
    K: CacheBridge + ?Sized + 'static,
{
    /// Build the facade and register its balance warmer with the store.
    ///
    /// The warmer only runs when built inside a tokio runtime.
    /// Synchronization is not started until [`Repository::start_sync`].
    pub fn new(chain: Arc<C>, store: Arc<S>, cache: Arc<K>, config: RepositoryConfig) -> Self {
        let warmer = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let warmer = Arc::new(BalanceWarmer::spawn(
                    Arc::clone(&chain),
                    Arc::clone(&cache),
                    config.warmer,
                    &runtime,
                ));
                store.set_balance_source(Arc::clone(&warmer) as Arc<dyn BalanceSource>);
                Some(warmer)
            }
            Err(_) => {
                tracing::warn!("no runtime available, balance warming disabled");
                None
            }
        };

        Self {
            staking: StakingAssembler::new(Arc::clone(&chain)),
            feeds: LiveFeeds::new(config.feeds),
            chain,
            store,
            cache,
            config,
            orchestrator: Mutex::new(None),
            warmer,
        }
    }

    /// Start following the node. Calling it again returns the running
    /// orchestrator.
    pub fn start_sync(&self) -> Arc<Orchestrator> {
        let mut slot = self.orchestrator.lock();
        if let Some(running) = slot.as_ref() {
            return Arc::clone(running);
        }
        let orchestrator = Arc::new(Orchestrator::spawn(
            Arc::clone(&self.chain),
            Arc::clone(&self.store),
            Arc::clone(&self.cache),
            self.feeds.clone(),
            self.config.retry.clone(),
        ));
        *slot = Some(Arc::clone(&orchestrator));
        orchestrator
    }

    /// Stop synchronization and balance warming, then end every feed
    /// subscription. Idempotent.
    pub async fn close(&self) {
        let orchestrator = self.orchestrator.lock().take();
        if let Some(orchestrator) = orchestrator {
            orchestrator.close().await;
        }
        if let Some(warmer) = &self.warmer {
            warmer.close().await;
        }
        self.feeds.close();
    }

    fn page_request(cursor: Option<Cursor>, count: i32, max: u32) -> RepositoryResult<PageRequest> {
        let after = match cursor {
            Some(cursor) => Some(
                cursor
                    .ordinal()
                    .ok_or_else(|| RepositoryError::NotFound(format!("cursor {cursor}")))?,
            ),
            None => None,
        };
        Ok(PageRequest::new(after, count, max))
    }
}

#[async_trait]
impl<C, S, K> EntityReader for Repository<C, S, K>
where
    C: ChainClient + ?Sized + 'static,
    S: DocumentStore + ?Sized + 'static,
    K: CacheBridge + ?Sized + 'static,
{
    async fn account(&self, address: Address) -> RepositoryResult<Account> {
        let contract = self.store.contract(address)?;
        Ok(Account {
            address,
            contract_tx: contract.map(|c| c.transaction_hash),
        })
    }

    async fn account_balance(&self, address: Address) -> RepositoryResult<U256> {
        if let Some(balance) = self.cache.pull_balance(&address) {
            tracing::debug!(%address, "balance cache hit");
            return Ok(balance);
        }
        Ok(self.chain.balance(address).await?)
    }

    async fn account_nonce(&self, address: Address) -> RepositoryResult<u64> {
        Ok(self.chain.nonce(address).await?)
    }

    async fn account_staker(&self, address: Address) -> RepositoryResult<Option<Staker>> {
        match self.staking.staker(StakerKey::Address(address)).await {
            Ok(staker) => Ok(Some(staker)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn block_height(&self) -> RepositoryResult<u64> {
        Ok(self.chain.block_height().await?)
    }

    async fn last_known_block(&self) -> RepositoryResult<u64> {
        self.store
            .latest_block_number()?
            .ok_or_else(|| RepositoryError::NotFound("no block indexed yet".to_string()))
    }

    async fn block_by_number(&self, number: Option<u64>) -> RepositoryResult<Block> {
        Ok(self.chain.block_by_number(number).await?)
    }

    async fn block_by_hash(&self, hash: B256) -> RepositoryResult<Block> {
        Ok(self.chain.block_by_hash(hash).await?)
    }

    async fn transaction(&self, hash: B256) -> RepositoryResult<Transaction> {
        if let Some(tx) = self.cache.pull_transaction(&hash) {
            tracing::debug!(%hash, "transaction cache hit");
            return Ok(tx);
        }
        tracing::debug!(%hash, "transaction cache miss");

        let tx = self.chain.transaction(hash).await?;
        if tx.is_confirmed() {
            if let Err(err) = self.cache.push_transaction(&tx) {
                tracing::warn!(%hash, error = %err, "transaction not cached");
            }
        }
        Ok(tx)
    }

    async fn contract(&self, address: Address) -> RepositoryResult<Contract> {
        self.store
            .contract(address)?
            .ok_or_else(|| RepositoryError::NotFound(format!("contract {address}")))
    }

    async fn current_epoch(&self) -> RepositoryResult<u64> {
        Ok(self.chain.current_epoch().await?)
    }

    async fn current_sealed_epoch(&self) -> RepositoryResult<Epoch> {
        if let Some(epoch) = self.cache.pull_last_epoch() {
            tracing::debug!(epoch = epoch.id, "sealed epoch cache hit");
            return Ok(epoch);
        }

        let id = self.chain.current_sealed_epoch().await?;
        let epoch = self.staking.epoch(id).await?;
        if let Err(err) = self.cache.push_last_epoch(&epoch) {
            tracing::warn!(epoch = id, error = %err, "sealed epoch not cached");
        }
        Ok(epoch)
    }

    async fn epoch(&self, id: u64) -> RepositoryResult<Epoch> {
        Ok(self.staking.epoch(id).await?)
    }

    async fn sfc_version(&self) -> RepositoryResult<u64> {
        Ok(self.chain.sfc_version().await?)
    }

    async fn last_staker_id(&self) -> RepositoryResult<u64> {
        Ok(self.chain.last_staker_id().await?)
    }

    async fn stakers_num(&self) -> RepositoryResult<u64> {
        Ok(self.chain.stakers_num().await?)
    }

    async fn staker(&self, id: u64) -> RepositoryResult<Staker> {
        Ok(self.staking.staker(StakerKey::Id(id)).await?)
    }

    async fn staker_by_address(&self, address: Address) -> RepositoryResult<Staker> {
        Ok(self.staking.staker(StakerKey::Address(address)).await?)
    }

    async fn stakers(&self) -> RepositoryResult<Vec<Staker>> {
        let last = self.chain.last_staker_id().await?;
        let mut stakers = Vec::new();
        for id in 1..=last {
            match self.staking.staker(StakerKey::Id(id)).await {
                Ok(staker) => stakers.push(staker),
                Err(err) if err.is_not_found() => {
                    tracing::debug!(id, "staker id without record");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(stakers)
    }

    async fn current_state(&self) -> RepositoryResult<CurrentState> {
        Ok(CurrentState {
            sealed_epoch: self.current_sealed_epoch().await?,
            blocks: self.chain.block_height().await?,
            transactions: self.store.transactions_count()?,
            validators: self.chain.stakers_num().await?,
            accounts: self.store.accounts_active()?,
            sfc_version: self.chain.sfc_version().await?,
        })
    }

    async fn gas_price(&self) -> RepositoryResult<U256> {
        Ok(self.chain.gas_price().await?)
    }
}

#[async_trait]
impl<C, S, K> CollectionReader for Repository<C, S, K>
where
    C: ChainClient + ?Sized + 'static,
    S: DocumentStore + ?Sized + 'static,
    K: CacheBridge + ?Sized + 'static,
{
    async fn blocks(&self, cursor: Option<Cursor>, count: i32) -> RepositoryResult<Page<Block>> {
        let request = Self::page_request(cursor, count, self.config.pagination.max_blocks)?;
        if request.is_empty() {
            return Ok(Page::empty(0));
        }
        Ok(self.store.blocks(request)?)
    }

    async fn blocks_count(&self) -> RepositoryResult<u64> {
        Ok(self.store.blocks_count()?)
    }

    async fn transactions(
        &self,
        cursor: Option<Cursor>,
        count: i32,
    ) -> RepositoryResult<Page<Transaction>> {
        let request = Self::page_request(cursor, count, self.config.pagination.max_transactions)?;
        if request.is_empty() {
            return Ok(Page::empty(0));
        }
        Ok(self.store.transactions(request)?)
    }

    async fn transactions_count(&self) -> RepositoryResult<u64> {
        Ok(self.store.transactions_count()?)
    }

    async fn account_transactions(
        &self,
        address: Address,
        cursor: Option<Cursor>,
        count: i32,
    ) -> RepositoryResult<Page<Transaction>> {
        let request = Self::page_request(cursor, count, self.config.pagination.max_transactions)?;
        if request.is_empty() {
            return Ok(Page::empty(0));
        }
        Ok(self.store.account_transactions(address, request)?)
    }

    async fn accounts_active(&self) -> RepositoryResult<u64> {
        Ok(self.store.accounts_active()?)
    }

    async fn contracts(
        &self,
        validated_only: bool,
        cursor: Option<Cursor>,
        count: i32,
    ) -> RepositoryResult<Page<Contract>> {
        let request = Self::page_request(cursor, count, self.config.pagination.max_contracts)?;
        if request.is_empty() {
            return Ok(Page::empty(0));
        }
        Ok(self.store.contracts(validated_only, request)?)
    }

    async fn contracts_count(&self, validated_only: bool) -> RepositoryResult<u64> {
        Ok(self.store.contracts_count(validated_only)?)
    }
}

#[async_trait]
impl<C, S, K> TransactionSubmitter for Repository<C, S, K>
where
    C: ChainClient + ?Sized + 'static,
    S: DocumentStore + ?Sized + 'static,
    K: CacheBridge + ?Sized + 'static,
{
    async fn send_transaction(&self, raw: Bytes) -> RepositoryResult<Transaction> {
        let hash = self.chain.send_raw_transaction(raw).await?;
        tracing::info!(%hash, "transaction submitted");
        Ok(self.chain.transaction(hash).await?)
    }
}

impl<C, S, K> FeedRegistry for Repository<C, S, K>
where
    C: ChainClient + ?Sized + 'static,
    S: DocumentStore + ?Sized + 'static,
    K: CacheBridge + ?Sized + 'static,
{
    fn subscribe_blocks(&self) -> FeedSubscription<Block> {
        self.feeds.blocks.subscribe()
    }

    fn subscribe_transactions(&self) -> FeedSubscription<Transaction> {
        self.feeds.transactions.subscribe()
    }

    fn unsubscribe_blocks(&self, id: u64) -> bool {
        self.feeds.blocks.unsubscribe(id)
    }

    fn unsubscribe_transactions(&self, id: u64) -> bool {
        self.feeds.transactions.unsubscribe(id)
    }
}

#[async_trait]
impl<C, S, K> ShutdownAware for Repository<C, S, K>
where
    C: ChainClient + ?Sized + 'static,
    S: DocumentStore + ?Sized + 'static,
    K: CacheBridge + ?Sized + 'static,
{
    fn name(&self) -> &str {
        "repository"
    }

    async fn shutdown(&self, timeout: Duration) {
        if tokio::time::timeout(timeout, self.close()).await.is_err() {
            tracing::warn!(?timeout, "repository did not close in time");
        }
    }
}
