//! Synchronization orchestrator.
//!
//! Two long-lived tasks follow the full node. The block task receives new
//! heads, fetches each full block, persists it and indexes its transactions
//! in block order. The transaction task announces transactions entering the
//! pool. Each task resubscribes with bounded exponential backoff when its
//! stream ends or its connection fails. Observed entities are persisted to
//! the document store and published on the live feeds.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use opera_api_types::{Block, Transaction};
use opera_chain_client::{ChainReader, ChainResult, ChainSubscriber, NotificationStream};
use opera_operations::ShutdownAware;

use crate::cache::CacheBridge;
use crate::feeds::{FeedHub, LiveFeeds};
use crate::index::DocumentStore;
use crate::retry::{Backoff, RetryConfig};

/// One subscription-driven loop.
#[async_trait]
trait FeedWorker: Send + 'static {
    type Item: Send + 'static;

    const NAME: &'static str;

    async fn subscribe(&self) -> ChainResult<NotificationStream<Self::Item>>;

    async fn handle(&mut self, item: Self::Item);
}

/// Writes confirmed transactions to the store and the cache.
struct TxIndexer<S: ?Sized, K: ?Sized> {
    store: Arc<S>,
    cache: Arc<K>,
}

impl<S, K> TxIndexer<S, K>
where
    S: DocumentStore + ?Sized,
    K: CacheBridge + ?Sized,
{
    /// Index `tx`, mined in `block` when known. Failures are logged.
    fn index(&self, block: Option<&Block>, tx: &Transaction) {
        if let Err(err) = self.store.append_transaction(block, tx) {
            tracing::error!(tx = %tx.hash, error = %err, "failed to persist transaction");
        }

        if tx.is_deployment() {
            let timestamp = block.map_or(0, |b| b.timestamp);
            if let Err(err) = self.store.append_contract(tx, timestamp) {
                tracing::error!(tx = %tx.hash, error = %err, "failed to persist contract");
            }
        }

        if let Err(err) = self.cache.push_transaction(tx) {
            tracing::debug!(tx = %tx.hash, error = %err, "transaction not cached");
        }
    }
}

struct BlockWorker<C: ?Sized, S: ?Sized, K: ?Sized> {
    chain: Arc<C>,
    indexer: Arc<TxIndexer<S, K>>,
    blocks: Arc<FeedHub<Block>>,
    transactions: Arc<FeedHub<Transaction>>,
    /// Highest block number processed so far.
    highest: Option<u64>,
}

impl<C, S, K> BlockWorker<C, S, K>
where
    C: ChainReader + ?Sized,
    S: DocumentStore + ?Sized,
    K: CacheBridge + ?Sized,
{
    /// Resolve and index the transactions of `block` in block order.
    async fn index_transactions(&self, block: &Block) {
        for hash in &block.transactions {
            let tx = match self.chain.transaction(*hash).await {
                Ok(tx) => tx,
                Err(err) => {
                    tracing::warn!(
                        number = block.number,
                        tx = %hash,
                        error = %err,
                        "cannot resolve mined transaction"
                    );
                    continue;
                }
            };
            if tx.block_hash != Some(block.hash) {
                tracing::warn!(
                    number = block.number,
                    tx = %hash,
                    "transaction no longer in this block, skipped"
                );
                continue;
            }
            self.indexer.index(Some(block), &tx);
            self.transactions.publish(&tx);
        }
    }
}

#[async_trait]
impl<C, S, K> FeedWorker for BlockWorker<C, S, K>
where
    C: ChainReader + ChainSubscriber + ?Sized + 'static,
    S: DocumentStore + ?Sized + 'static,
    K: CacheBridge + ?Sized + 'static,
{
    type Item = Block;

    const NAME: &'static str = "blocks";

    async fn subscribe(&self) -> ChainResult<NotificationStream<Block>> {
        self.chain.subscribe_blocks().await
    }

    async fn handle(&mut self, head: Block) {
        if self.highest.is_some_and(|highest| head.number <= highest) {
            tracing::debug!(
                number = head.number,
                highest = ?self.highest,
                "skipping stale block"
            );
            return;
        }

        // Heads carry no transaction list.
        let block = match self.chain.block_by_hash(head.hash).await {
            Ok(block) => block,
            Err(err) => {
                tracing::warn!(
                    number = head.number,
                    hash = %head.hash,
                    error = %err,
                    "cannot fetch announced block"
                );
                return;
            }
        };
        self.highest = Some(block.number);

        if let Err(err) = self.indexer.store.append_block(&block) {
            tracing::error!(number = block.number, error = %err, "failed to persist block");
        }
        self.index_transactions(&block).await;
        self.blocks.publish(&block);
    }
}

struct TxWorker<C: ?Sized, S: ?Sized, K: ?Sized> {
    chain: Arc<C>,
    indexer: Arc<TxIndexer<S, K>>,
    feed: Arc<FeedHub<Transaction>>,
}

#[async_trait]
impl<C, S, K> FeedWorker for TxWorker<C, S, K>
where
    C: ChainReader + ChainSubscriber + ?Sized + 'static,
    S: DocumentStore + ?Sized + 'static,
    K: CacheBridge + ?Sized + 'static,
{
    type Item = Transaction;

    const NAME: &'static str = "transactions";

    async fn subscribe(&self) -> ChainResult<NotificationStream<Transaction>> {
        self.chain.subscribe_transactions().await
    }

    async fn handle(&mut self, tx: Transaction) {
        // Announced transactions are usually still pending; one already mined
        // by the time it is resolved is indexed here as well.
        if let Some(hash) = tx.block_hash {
            let block = match self.chain.block_by_hash(hash).await {
                Ok(block) => Some(block),
                Err(err) => {
                    tracing::warn!(
                        tx = %tx.hash,
                        block = %hash,
                        error = %err,
                        "containing block not available, indexing without timestamp"
                    );
                    None
                }
            };
            self.indexer.index(block.as_ref(), &tx);
        }
        self.feed.publish(&tx);
    }
}

/// Drive `worker` until `stop` fires or the retry budget is spent.
async fn supervise<W: FeedWorker>(
    mut worker: W,
    retry: RetryConfig,
    mut stop: watch::Receiver<bool>,
) {
    let mut backoff = Backoff::new(retry);

    loop {
        if *stop.borrow() {
            return;
        }

        let subscribed = tokio::select! {
            biased;
            _ = stop.changed() => return,
            result = worker.subscribe() => result,
        };

        match subscribed {
            Ok(mut stream) => {
                backoff.reset();
                tracing::debug!(feed = W::NAME, "subscribed");
                loop {
                    tokio::select! {
                        biased;
                        _ = stop.changed() => return,
                        next = stream.next() => match next {
                            Some(Ok(item)) => worker.handle(item).await,
                            Some(Err(err)) if err.is_transport() => {
                                tracing::warn!(feed = W::NAME, error = %err, "subscription failed");
                                break;
                            }
                            Some(Err(err)) => {
                                tracing::warn!(feed = W::NAME, error = %err, "skipping notification");
                            }
                            None => {
                                tracing::info!(feed = W::NAME, "subscription closed by node");
                                break;
                            }
                        },
                    }
                }
            }
            Err(err) => {
                tracing::warn!(feed = W::NAME, error = %err, "cannot subscribe");
            }
        }

        let Some(delay) = backoff.next_delay() else {
            tracing::error!(
                feed = W::NAME,
                attempts = backoff.attempts(),
                "resubscription attempts exhausted, loop terminated"
            );
            return;
        };
        tracing::debug!(feed = W::NAME, attempt = backoff.attempts(), ?delay, "resubscribing");

        tokio::select! {
            biased;
            _ = stop.changed() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Owner of the two synchronization tasks.
pub struct Orchestrator {
    stop: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Start the block and transaction loops on the current tokio runtime.
    ///
    /// Blocks at or below the store's latest block are treated as already
    /// processed.
    pub fn spawn<C, S, K>(
        chain: Arc<C>,
        store: Arc<S>,
        cache: Arc<K>,
        feeds: LiveFeeds,
        retry: RetryConfig,
    ) -> Self
    where
        C: ChainReader + ChainSubscriber + ?Sized + 'static,
        S: DocumentStore + ?Sized + 'static,
        K: CacheBridge + ?Sized + 'static,
    {
        let highest = store.latest_block_number().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "latest stored block unknown, accepting any block");
            None
        });
        let (stop, stop_rx) = watch::channel(false);

        let indexer = Arc::new(TxIndexer { store, cache });

        let blocks = BlockWorker {
            chain: Arc::clone(&chain),
            indexer: Arc::clone(&indexer),
            blocks: Arc::clone(&feeds.blocks),
            transactions: Arc::clone(&feeds.transactions),
            highest,
        };
        let transactions = TxWorker {
            chain,
            indexer,
            feed: Arc::clone(&feeds.transactions),
        };

        let tasks = vec![
            tokio::spawn(supervise(blocks, retry.clone(), stop_rx.clone())),
            tokio::spawn(supervise(transactions, retry, stop_rx)),
        ];
        tracing::info!(highest = ?highest, "synchronization started");

        Self {
            stop,
            tasks: Mutex::new(tasks),
        }
    }

    /// Stop both loops and wait for them to finish.
    ///
    /// Once this returns nothing more is written or published. Calling it
    /// again is a no-op.
    pub async fn close(&self) {
        self.stop.send_replace(true);
        let mut tasks = self.tasks.lock().await;
        if tasks.is_empty() {
            return;
        }
        for task in tasks.drain(..) {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "synchronization task failed");
            }
        }
        tracing::info!("synchronization stopped");
    }

    pub fn is_closed(&self) -> bool {
        *self.stop.borrow()
    }
}

#[async_trait]
impl ShutdownAware for Orchestrator {
    fn name(&self) -> &str {
        "sync-orchestrator"
    }

    async fn shutdown(&self, timeout: Duration) {
        if tokio::time::timeout(timeout, self.close()).await.is_err() {
            tracing::warn!(?timeout, "synchronization tasks did not stop in time");
        }
    }
}
