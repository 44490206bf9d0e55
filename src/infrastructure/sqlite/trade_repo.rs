use crate::domain::entities::trade::TradeEntry;
use crate::domain::error::DomainError;
use crate::domain::ports::trade_recorder::{TradeFilter, TradeRecorder};
use crate::domain::values::allocation::BuyMode;
use crate::infrastructure::sqlite::migrations::run_migrations;
use crate::infrastructure::sqlite::{parse_timestamp, timestamp};
use rusqlite::{params, Connection};
use std::sync::Mutex;
use tracing::warn;

const COLUMNS: &str =
    "id, mode, code, name, price, quantity, total, fee, order_id, memo, created_at";

/// SQLite-backed trade ledger. `":memory:"` gives a throwaway ledger.
pub struct SqliteTradeRecorder {
    conn: Mutex<Connection>,
}

impl SqliteTradeRecorder {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open (or create) the ledger at `db_path` and apply migrations.
    pub fn open(db_path: &str) -> Result<Self, DomainError> {
        let conn = Connection::open(db_path)
            .map_err(|e| DomainError::Database(format!("DB error: {e}")))?;
        if db_path != ":memory:" {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(|e| DomainError::Database(format!("WAL error: {e}")))?;
        }
        run_migrations(&conn)?;
        Ok(Self::new(conn))
    }

    fn row_to_trade(row: &rusqlite::Row) -> Result<TradeEntry, rusqlite::Error> {
        let mode_str: String = row.get(1)?;
        let quantity: i64 = row.get(5)?;
        let created_str: String = row.get(10)?;

        Ok(TradeEntry {
            id: row.get(0)?,
            mode: mode_str.parse().unwrap_or_else(|_| {
                warn!(mode = %mode_str, "invalid mode in trade row, defaulting to REGULAR");
                BuyMode::Regular
            }),
            code: row.get(2)?,
            name: row.get(3)?,
            price: row.get(4)?,
            quantity: u64::try_from(quantity).unwrap_or(0),
            total: row.get(6)?,
            fee: row.get(7)?,
            order_id: row.get(8)?,
            memo: row.get(9)?,
            created_at: parse_timestamp(&created_str),
        })
    }
}

impl TradeRecorder for SqliteTradeRecorder {
    fn record(&self, trade: &TradeEntry) -> Result<(), DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let quantity = i64::try_from(trade.quantity)
            .map_err(|_| DomainError::InvalidInput(format!("quantity too large: {}", trade.quantity)))?;
        conn.execute(
            &format!("INSERT INTO trades ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                trade.id,
                trade.mode.to_string(),
                trade.code,
                trade.name,
                trade.price,
                quantity,
                trade.total,
                trade.fee,
                trade.order_id,
                trade.memo,
                timestamp(&trade.created_at),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to record trade: {e}")))?;
        Ok(())
    }

    fn list(&self, filter: &TradeFilter) -> Result<Vec<TradeEntry>, DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let mut sql = format!("SELECT {COLUMNS} FROM trades WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(since) = &filter.since {
            sql.push_str(&format!(" AND created_at >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(timestamp(since)));
        }
        if let Some(mode) = filter.mode {
            sql.push_str(&format!(" AND mode = ?{}", param_values.len() + 1));
            param_values.push(Box::new(mode.to_string()));
        }
        sql.push_str(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT ?{}", param_values.len() + 1));
            param_values.push(Box::new(limit as i64));
        }

        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let trades = stmt
            .query_map(params_refs.as_slice(), Self::row_to_trade)
            .map_err(|e| DomainError::Database(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(trades)
    }
}
