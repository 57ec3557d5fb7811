//! Document store bridge and its SQLite implementation.
//!
//! The `DocumentStore` trait is the durable index behind the repository: it
//! persists blocks, confirmed transactions and contracts, and serves them back
//! in cursor-paginated pages ordered newest first. `SqliteDocumentStore`
//! implements it with a connection pool (r2d2) for concurrent reads and a
//! dedicated writer connection.
#![cfg_attr(test, allow(clippy::indexing_slicing))]

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use parking_lot::{Mutex, RwLock};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use opera_api_types::{
    Block, Contract, ContractMetadata, Cursor, Page, PageRequest, Transaction, TxStatus,
};

use crate::error::{StoreError, StoreResult};

/// Receives the addresses touched by newly indexed transactions.
///
/// Implementations must return immediately; the store calls this on its
/// write path.
pub trait BalanceSource: Send + Sync {
    fn balances_touched(&self, addresses: &[Address]);
}

/// Durable index of chain data.
///
/// All methods are synchronous; SQLite calls are short and are made inline
/// from async callers. Appends are idempotent by primary key.
pub trait DocumentStore: Send + Sync {
    fn append_block(&self, block: &Block) -> StoreResult<()>;

    /// Store a confirmed transaction; pending transactions are ignored.
    fn append_transaction(&self, block: Option<&Block>, tx: &Transaction) -> StoreResult<()>;

    /// Store the contract deployed by `tx`, if any.
    fn append_contract(&self, tx: &Transaction, timestamp: u64) -> StoreResult<()>;

    /// Attach validated source details; `false` if the contract is unknown.
    fn update_contract_metadata(
        &self,
        address: Address,
        metadata: &ContractMetadata,
    ) -> StoreResult<bool>;

    /// Highest block number ever appended.
    fn latest_block_number(&self) -> StoreResult<Option<u64>>;

    fn block_by_number(&self, number: u64) -> StoreResult<Option<Block>>;

    fn block_by_hash(&self, hash: B256) -> StoreResult<Option<Block>>;

    fn transaction(&self, hash: B256) -> StoreResult<Option<Transaction>>;

    fn contract(&self, address: Address) -> StoreResult<Option<Contract>>;

    fn blocks(&self, request: PageRequest) -> StoreResult<Page<Block>>;

    fn transactions(&self, request: PageRequest) -> StoreResult<Page<Transaction>>;

    /// Transactions sent by, sent to, or deploying `address`.
    fn account_transactions(
        &self,
        address: Address,
        request: PageRequest,
    ) -> StoreResult<Page<Transaction>>;

    fn contracts(&self, validated_only: bool, request: PageRequest) -> StoreResult<Page<Contract>>;

    fn blocks_count(&self) -> StoreResult<u64>;

    fn transactions_count(&self) -> StoreResult<u64>;

    /// Distinct addresses seen as sender or recipient.
    fn accounts_active(&self) -> StoreResult<u64>;

    fn contracts_count(&self, validated_only: bool) -> StoreResult<u64>;

    fn set_balance_source(&self, source: Arc<dyn BalanceSource>);
}

/// Settings of [`SqliteDocumentStore`].
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    pub path: std::path::PathBuf,
    pub read_pool_size: u32,
}

const BLOCK_COLUMNS: &str =
    "number, hash, parent_hash, timestamp, gas_limit, gas_used, transactions";
const TX_COLUMNS: &str = "hash, from_addr, to_addr, contract_address, value, gas, gas_price, \
                          nonce, input, block_hash, block_number, tx_index, status";
const CONTRACT_COLUMNS: &str = "address, transaction_hash, ordinal, timestamp, metadata";

/// Document store backed by SQLite.
///
/// Uses a connection pool for concurrent reads and a dedicated writer
/// connection for serialized writes. WAL mode lets readers proceed without
/// blocking the writer and vice versa.
pub struct SqliteDocumentStore {
    /// Connection pool for read operations (concurrent).
    read_pool: Pool<SqliteConnectionManager>,
    /// Dedicated connection for write operations (serialized).
    writer: Mutex<Connection>,
    balance_source: RwLock<Option<Arc<dyn BalanceSource>>>,
}

/// Configure a connection with standard PRAGMAs for WAL mode.
fn configure_connection(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;",
    )
}

impl SqliteDocumentStore {
    /// Open (or create) an on-disk store.
    pub fn open(config: &SqliteStoreConfig) -> StoreResult<Self> {
        let writer = Connection::open(&config.path)?;
        configure_connection(&writer)?;

        let manager = SqliteConnectionManager::file(&config.path)
            .with_flags(
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_init(|conn| configure_connection(conn));
        let read_pool = Pool::builder()
            .max_size(config.read_pool_size.max(1))
            .build(manager)?;

        let store = Self::with_connections(read_pool, writer)?;
        let path = config.path.display();
        match store.latest_block_number()? {
            Some(latest) => tracing::info!(%path, latest, "document store opened"),
            None => tracing::info!(%path, "document store opened (empty)"),
        }
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// In-memory SQLite DBs are per-connection, so all connections share one
    /// named database through a shared-cache URI.
    pub fn in_memory() -> StoreResult<Self> {
        let uri = format!("file:opera_store_{}?mode=memory&cache=shared", unique_id());
        let writer = Connection::open(&uri)?;
        configure_connection(&writer)?;

        let manager =
            SqliteConnectionManager::file(&uri).with_init(|conn| configure_connection(conn));
        let read_pool = Pool::builder().max_size(2).build(manager)?;

        Self::with_connections(read_pool, writer)
    }

    fn with_connections(
        read_pool: Pool<SqliteConnectionManager>,
        writer: Connection,
    ) -> StoreResult<Self> {
        let store = Self {
            read_pool,
            writer: Mutex::new(writer),
            balance_source: RwLock::new(None),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Get a read connection from the pool.
    fn read_conn(&self) -> StoreResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.read_pool.get()?)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.writer.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS blocks (
                 number INTEGER PRIMARY KEY,
                 hash BLOB NOT NULL UNIQUE,
                 parent_hash BLOB NOT NULL,
                 timestamp INTEGER NOT NULL,
                 gas_limit INTEGER NOT NULL,
                 gas_used INTEGER NOT NULL,
                 transactions BLOB NOT NULL
             );

             CREATE TABLE IF NOT EXISTS transactions (
                 hash BLOB PRIMARY KEY,
                 ordinal INTEGER NOT NULL,
                 block_number INTEGER NOT NULL,
                 block_hash BLOB NOT NULL,
                 tx_index INTEGER NOT NULL,
                 from_addr BLOB NOT NULL,
                 to_addr BLOB,
                 contract_address BLOB,
                 value BLOB NOT NULL,
                 gas INTEGER NOT NULL,
                 gas_price BLOB NOT NULL,
                 nonce INTEGER NOT NULL,
                 input BLOB NOT NULL,
                 status INTEGER NOT NULL,
                 timestamp INTEGER
             );
             CREATE INDEX IF NOT EXISTS idx_tx_ordinal ON transactions(ordinal);
             CREATE INDEX IF NOT EXISTS idx_tx_from ON transactions(from_addr, ordinal);
             CREATE INDEX IF NOT EXISTS idx_tx_to ON transactions(to_addr, ordinal);
             CREATE INDEX IF NOT EXISTS idx_tx_contract ON transactions(contract_address);

             CREATE TABLE IF NOT EXISTS contracts (
                 address BLOB PRIMARY KEY,
                 transaction_hash BLOB NOT NULL,
                 ordinal INTEGER NOT NULL,
                 timestamp INTEGER NOT NULL,
                 metadata TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_contracts_ordinal ON contracts(ordinal);

             CREATE TABLE IF NOT EXISTS metadata (
                 key TEXT PRIMARY KEY,
                 value INTEGER NOT NULL
             );",
        )?;
        Ok(())
    }

    fn warm_balances(&self, tx: &Transaction) {
        let Some(source) = self.balance_source.read().clone() else {
            return;
        };
        let mut addresses = vec![tx.from];
        addresses.extend(tx.to.iter().chain(tx.contract_address.iter()).copied());
        source.balances_touched(&addresses);
    }

    fn count(&self, sql: &str) -> StoreResult<u64> {
        let conn = self.read_conn()?;
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn row_to_block(row: &Row<'_>) -> rusqlite::Result<Block> {
        let number: i64 = row.get(0)?;
        let hash_bytes: Vec<u8> = row.get(1)?;
        let parent_hash_bytes: Vec<u8> = row.get(2)?;
        let timestamp: i64 = row.get(3)?;
        let gas_limit: i64 = row.get(4)?;
        let gas_used: i64 = row.get(5)?;
        let tx_bytes: Vec<u8> = row.get(6)?;

        Ok(Block {
            number: number as u64,
            hash: b256_from_row(&hash_bytes, 1)?,
            parent_hash: b256_from_row(&parent_hash_bytes, 2)?,
            timestamp: timestamp as u64,
            gas_limit: gas_limit as u64,
            gas_used: gas_used as u64,
            transactions: hashes_from_row(&tx_bytes, 6)?,
        })
    }

    fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
        let hash_bytes: Vec<u8> = row.get(0)?;
        let from_bytes: Vec<u8> = row.get(1)?;
        let to_bytes: Option<Vec<u8>> = row.get(2)?;
        let contract_bytes: Option<Vec<u8>> = row.get(3)?;
        let value_bytes: Vec<u8> = row.get(4)?;
        let gas: i64 = row.get(5)?;
        let gas_price_bytes: Vec<u8> = row.get(6)?;
        let nonce: i64 = row.get(7)?;
        let input_bytes: Vec<u8> = row.get(8)?;
        let block_hash_bytes: Vec<u8> = row.get(9)?;
        let block_number: i64 = row.get(10)?;
        let tx_index: i64 = row.get(11)?;
        let status: i64 = row.get(12)?;

        let to = to_bytes
            .as_deref()
            .map(|b| address_from_row(b, 2))
            .transpose()?;
        let contract_address = contract_bytes
            .as_deref()
            .map(|b| address_from_row(b, 3))
            .transpose()?;

        Ok(Transaction {
            hash: b256_from_row(&hash_bytes, 0)?,
            from: address_from_row(&from_bytes, 1)?,
            to,
            contract_address,
            value: U256::from_be_slice(&value_bytes),
            gas: gas as u64,
            gas_price: U256::from_be_slice(&gas_price_bytes),
            nonce: nonce as u64,
            input: Bytes::from(input_bytes),
            block_hash: Some(b256_from_row(&block_hash_bytes, 9)?),
            block_number: Some(block_number as u64),
            index: Some(tx_index as u32),
            status: Some(TxStatus::from_code(status as u64)),
        })
    }

    fn row_to_contract(row: &Row<'_>) -> rusqlite::Result<Contract> {
        let address_bytes: Vec<u8> = row.get(0)?;
        let tx_hash_bytes: Vec<u8> = row.get(1)?;
        let ordinal: i64 = row.get(2)?;
        let timestamp: i64 = row.get(3)?;
        let metadata_json: Option<String> = row.get(4)?;

        let metadata = metadata_json
            .map(|json| {
                serde_json::from_str::<ContractMetadata>(&json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })
            })
            .transpose()?;

        Ok(Contract {
            address: address_from_row(&address_bytes, 0)?,
            transaction_hash: b256_from_row(&tx_hash_bytes, 1)?,
            ordinal: ordinal as u64,
            timestamp: timestamp as u64,
            metadata,
        })
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn append_block(&self, block: &Block) -> StoreResult<()> {
        let tx_bytes: Vec<u8> = block.transactions.iter().flat_map(|h| h.0).collect();

        let mut conn = self.writer.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO blocks
             (number, hash, parent_hash, timestamp, gas_limit, gas_used, transactions)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                block.number as i64,
                block.hash.as_slice(),
                block.parent_hash.as_slice(),
                block.timestamp as i64,
                block.gas_limit as i64,
                block.gas_used as i64,
                tx_bytes,
            ],
        )?;
        // The latest block marker only ever moves forward.
        tx.execute(
            "INSERT INTO metadata (key, value) VALUES ('latest_block', ?1)
             ON CONFLICT(key) DO UPDATE SET value = MAX(value, excluded.value)",
            params![block.number as i64],
        )?;
        tx.commit()?;

        tracing::debug!(number = block.number, hash = %block.hash, "stored block");
        Ok(())
    }

    fn append_transaction(&self, block: Option<&Block>, tx: &Transaction) -> StoreResult<()> {
        let (Some(block_hash), Some(block_number), Some(index)) =
            (tx.block_hash, tx.block_number, tx.index)
        else {
            tracing::debug!(hash = %tx.hash, "skipping pending transaction");
            return Ok(());
        };
        let ordinal = tx.ordinal().ok_or_else(|| {
            StoreError::OutOfRange(format!(
                "transaction {} at block {block_number} index {index}",
                tx.hash
            ))
        })?;
        let status = tx.status.unwrap_or(TxStatus::Unknown);

        let inserted = {
            let conn = self.writer.lock();
            conn.execute(
                "INSERT OR IGNORE INTO transactions
                 (hash, ordinal, block_number, block_hash, tx_index, from_addr, to_addr,
                  contract_address, value, gas, gas_price, nonce, input, status, timestamp)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    tx.hash.as_slice(),
                    ordinal as i64,
                    block_number as i64,
                    block_hash.as_slice(),
                    i64::from(index),
                    tx.from.as_slice(),
                    tx.to.as_ref().map(|a| a.as_slice()),
                    tx.contract_address.as_ref().map(|a| a.as_slice()),
                    &tx.value.to_be_bytes::<32>() as &[u8],
                    tx.gas as i64,
                    &tx.gas_price.to_be_bytes::<32>() as &[u8],
                    tx.nonce as i64,
                    tx.input.as_ref(),
                    i64::from(status.code()),
                    block.map(|b| b.timestamp as i64),
                ],
            )?
        };

        if inserted > 0 {
            tracing::debug!(hash = %tx.hash, ordinal, "stored transaction");
            self.warm_balances(tx);
        }
        Ok(())
    }

    fn append_contract(&self, tx: &Transaction, timestamp: u64) -> StoreResult<()> {
        let (Some(address), Some(ordinal)) = (tx.contract_address, tx.ordinal()) else {
            return Ok(());
        };

        let conn = self.writer.lock();
        conn.execute(
            "INSERT OR IGNORE INTO contracts (address, transaction_hash, ordinal, timestamp)
             VALUES (?, ?, ?, ?)",
            params![
                address.as_slice(),
                tx.hash.as_slice(),
                ordinal as i64,
                timestamp as i64,
            ],
        )?;
        tracing::debug!(%address, tx = %tx.hash, "stored contract");
        Ok(())
    }

    fn update_contract_metadata(
        &self,
        address: Address,
        metadata: &ContractMetadata,
    ) -> StoreResult<bool> {
        let json = serde_json::to_string(metadata)?;
        let conn = self.writer.lock();
        let updated = conn.execute(
            "UPDATE contracts SET metadata = ? WHERE address = ?",
            params![json, address.as_slice()],
        )?;
        Ok(updated > 0)
    }

    fn latest_block_number(&self) -> StoreResult<Option<u64>> {
        let conn = self.read_conn()?;
        let latest: Option<i64> = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'latest_block'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(latest.map(|n| n as u64))
    }

    fn block_by_number(&self, number: u64) -> StoreResult<Option<Block>> {
        let conn = self.read_conn()?;
        let sql = format!("SELECT {BLOCK_COLUMNS} FROM blocks WHERE number = ?");
        Ok(conn
            .query_row(&sql, params![number as i64], Self::row_to_block)
            .optional()?)
    }

    fn block_by_hash(&self, hash: B256) -> StoreResult<Option<Block>> {
        let conn = self.read_conn()?;
        let sql = format!("SELECT {BLOCK_COLUMNS} FROM blocks WHERE hash = ?");
        Ok(conn
            .query_row(&sql, params![hash.as_slice()], Self::row_to_block)
            .optional()?)
    }

    fn transaction(&self, hash: B256) -> StoreResult<Option<Transaction>> {
        let conn = self.read_conn()?;
        let sql = format!("SELECT {TX_COLUMNS} FROM transactions WHERE hash = ?");
        Ok(conn
            .query_row(&sql, params![hash.as_slice()], Self::row_to_transaction)
            .optional()?)
    }

    fn contract(&self, address: Address) -> StoreResult<Option<Contract>> {
        let conn = self.read_conn()?;
        let sql = format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE address = ?");
        Ok(conn
            .query_row(&sql, params![address.as_slice()], Self::row_to_contract)
            .optional()?)
    }

    fn blocks(&self, request: PageRequest) -> StoreResult<Page<Block>> {
        let total = self.blocks_count()?;
        let conn = self.read_conn()?;
        let source = PageSource::new("blocks", BLOCK_COLUMNS, "number");
        load_page(&conn, &source, request, total, Self::row_to_block, |b| {
            b.number
        })
    }

    fn transactions(&self, request: PageRequest) -> StoreResult<Page<Transaction>> {
        let total = self.transactions_count()?;
        let conn = self.read_conn()?;
        let source = PageSource::new("transactions", TX_COLUMNS, "ordinal");
        load_page(
            &conn,
            &source,
            request,
            total,
            Self::row_to_transaction,
            tx_ordinal,
        )
    }

    fn account_transactions(
        &self,
        address: Address,
        request: PageRequest,
    ) -> StoreResult<Page<Transaction>> {
        let conn = self.read_conn()?;
        let filter = "(from_addr = ?1 OR to_addr = ?1 OR contract_address = ?1)";
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM transactions WHERE {filter}"),
            params![address.as_slice()],
            |row| row.get(0),
        )?;
        let source = PageSource::new("transactions", TX_COLUMNS, "ordinal")
            .filtered(filter, vec![Value::Blob(address.to_vec())]);
        load_page(
            &conn,
            &source,
            request,
            total as u64,
            Self::row_to_transaction,
            tx_ordinal,
        )
    }

    fn contracts(&self, validated_only: bool, request: PageRequest) -> StoreResult<Page<Contract>> {
        let total = self.contracts_count(validated_only)?;
        let conn = self.read_conn()?;
        let mut source = PageSource::new("contracts", CONTRACT_COLUMNS, "ordinal");
        if validated_only {
            source = source.filtered("metadata IS NOT NULL", Vec::new());
        }
        load_page(&conn, &source, request, total, Self::row_to_contract, |c| {
            c.ordinal
        })
    }

    fn blocks_count(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM blocks")
    }

    fn transactions_count(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM transactions")
    }

    fn accounts_active(&self) -> StoreResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM (
                 SELECT from_addr FROM transactions
                 UNION
                 SELECT to_addr FROM transactions WHERE to_addr IS NOT NULL
             )",
        )
    }

    fn contracts_count(&self, validated_only: bool) -> StoreResult<u64> {
        if validated_only {
            self.count("SELECT COUNT(*) FROM contracts WHERE metadata IS NOT NULL")
        } else {
            self.count("SELECT COUNT(*) FROM contracts")
        }
    }

    fn set_balance_source(&self, source: Arc<dyn BalanceSource>) {
        *self.balance_source.write() = Some(source);
    }
}

/// A paginated collection: table, selected columns, sort key and filter.
struct PageSource<'a> {
    table: &'a str,
    columns: &'a str,
    ordinal: &'a str,
    filter: &'a str,
    args: Vec<Value>,
}

impl<'a> PageSource<'a> {
    fn new(table: &'a str, columns: &'a str, ordinal: &'a str) -> Self {
        Self {
            table,
            columns,
            ordinal,
            filter: "1 = 1",
            args: Vec::new(),
        }
    }

    /// Restrict the collection; `?1..?n` in `filter` bind to `args`.
    fn filtered(mut self, filter: &'a str, args: Vec<Value>) -> Self {
        self.filter = filter;
        self.args = args;
        self
    }

    fn next_param(&self) -> usize {
        self.args.len() + 1
    }

    /// Whether any entry satisfies `ordinal <op> value`.
    fn exists(&self, conn: &Connection, op: &str, value: u64) -> StoreResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} AND {} {op} ?{})",
            self.table,
            self.filter,
            self.ordinal,
            self.next_param()
        );
        let mut args = self.args.clone();
        args.push(Value::Integer(value as i64));
        Ok(conn.query_row(&sql, params_from_iter(args), |row| row.get(0))?)
    }
}

/// Load one page of `source`.
///
/// A forward request (toward older entries) scans descending from the cursor;
/// a backward one scans ascending from it and is reversed, so the page is
/// always newest first. The cursor entry itself is never part of the page.
fn load_page<T>(
    conn: &Connection,
    source: &PageSource<'_>,
    request: PageRequest,
    total: u64,
    map_row: fn(&Row<'_>) -> rusqlite::Result<T>,
    ordinal_of: fn(&T) -> u64,
) -> StoreResult<Page<T>> {
    let (bound, order) = if request.toward_older {
        ("<", "DESC")
    } else {
        (">", "ASC")
    };

    let mut args = source.args.clone();
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {}",
        source.columns, source.table, source.filter
    );
    if let Some(after) = request.after {
        let after = i64::try_from(after)
            .map_err(|_| StoreError::OutOfRange(format!("cursor ordinal {after:#x}")))?;
        args.push(Value::Integer(after));
        sql.push_str(&format!(" AND {} {bound} ?{}", source.ordinal, args.len()));
    }
    args.push(Value::Integer(i64::from(request.limit)));
    sql.push_str(&format!(
        " ORDER BY {} {order} LIMIT ?{}",
        source.ordinal,
        args.len()
    ));

    let mut stmt = conn.prepare(&sql)?;
    let mut items = stmt
        .query_map(params_from_iter(args), map_row)?
        .collect::<rusqlite::Result<Vec<T>>>()?;
    if !request.toward_older {
        items.reverse();
    }

    let newest = items.first().map(ordinal_of);
    let oldest = items.last().map(ordinal_of);
    let (first, last, has_next, has_previous) = match (newest, oldest) {
        (Some(newest), Some(oldest)) => (
            Some(Cursor::from_ordinal(newest)),
            Some(Cursor::from_ordinal(oldest)),
            source.exists(conn, "<", oldest)?,
            source.exists(conn, ">", newest)?,
        ),
        // Nothing past the cursor in the requested direction; the entries on
        // the other side are reachable by turning around.
        _ => match request.after {
            Some(cursor) if request.toward_older => {
                (None, None, false, source.exists(conn, ">=", cursor)?)
            }
            Some(cursor) => (None, None, source.exists(conn, "<=", cursor)?, false),
            None => (None, None, false, false),
        },
    };

    Ok(Page {
        items,
        first,
        last,
        has_next,
        has_previous,
        total,
    })
}

fn tx_ordinal(tx: &Transaction) -> u64 {
    tx.ordinal().unwrap_or_default()
}

/// Generate a unique ID for in-memory shared-cache SQLite databases.
fn unique_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

fn b256_from_row(bytes: &[u8], col: usize) -> rusqlite::Result<B256> {
    if bytes.len() != 32 {
        return Err(rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Blob,
            format!("expected 32 bytes for B256, got {}", bytes.len()).into(),
        ));
    }
    Ok(B256::from_slice(bytes))
}

fn hashes_from_row(bytes: &[u8], col: usize) -> rusqlite::Result<Vec<B256>> {
    if bytes.len() % 32 != 0 {
        return Err(rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Blob,
            format!("hash list of {} bytes is not a multiple of 32", bytes.len()).into(),
        ));
    }
    Ok(bytes.chunks_exact(32).map(B256::from_slice).collect())
}

fn address_from_row(bytes: &[u8], col: usize) -> rusqlite::Result<Address> {
    if bytes.len() != 20 {
        return Err(rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Blob,
            format!("expected 20 bytes for Address, got {}", bytes.len()).into(),
        ));
    }
    Ok(Address::from_slice(bytes))
}
