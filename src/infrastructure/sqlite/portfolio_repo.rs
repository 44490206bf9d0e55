use crate::domain::error::DomainError;
use crate::domain::ports::portfolio_store::{PortfolioStore, PriceHistoryFilter};
use crate::domain::values::dip::PriceStatus;
use crate::domain::values::portfolio::{HoldingRow, PortfolioSummary, PriceRecord};
use crate::infrastructure::sqlite::migrations::run_migrations;
use crate::infrastructure::sqlite::{parse_timestamp, timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::Mutex;
use tracing::warn;

const HOLDING_COLS: &str =
    "code, name, quantity, avg_price, current_price, invested, valuation, profit_loss, profit_rate, updated_at";
const PRICE_COLS: &str =
    "code, name, current_price, reference_high, reference_low, previous_close, drop_rate, status, recorded_at";

pub struct SqlitePortfolioStore {
    conn: Mutex<Connection>,
}

impl SqlitePortfolioStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

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

    fn row_to_holding(row: &rusqlite::Row) -> Result<(HoldingRow, String), rusqlite::Error> {
        let quantity: i64 = row.get(2)?;
        let updated_str: String = row.get(9)?;
        Ok((
            HoldingRow {
                code: row.get(0)?,
                name: row.get(1)?,
                quantity: u64::try_from(quantity).unwrap_or(0),
                avg_price: row.get(3)?,
                current_price: row.get(4)?,
                invested: row.get(5)?,
                valuation: row.get(6)?,
                profit_loss: row.get(7)?,
                profit_rate: row.get(8)?,
            },
            updated_str,
        ))
    }

    fn row_to_price(row: &rusqlite::Row) -> Result<PriceRecord, rusqlite::Error> {
        let status_str: String = row.get(7)?;
        let recorded_str: String = row.get(8)?;
        Ok(PriceRecord {
            code: row.get(0)?,
            name: row.get(1)?,
            current_price: row.get(2)?,
            reference_high: row.get(3)?,
            reference_low: row.get(4)?,
            previous_close: row.get(5)?,
            drop_rate: row.get(6)?,
            status: status_str.parse().unwrap_or_else(|_| {
                warn!(status = %status_str, "invalid status in price row, defaulting to normal");
                PriceStatus::Normal
            }),
            recorded_at: parse_timestamp(&recorded_str),
        })
    }
}

impl PortfolioStore for SqlitePortfolioStore {
    fn save_portfolio(&self, summary: &PortfolioSummary) -> Result<(), DomainError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM portfolio", [])?;
        let updated_at = timestamp(&summary.updated_at);
        for h in &summary.holdings {
            let quantity = i64::try_from(h.quantity).map_err(|_| {
                DomainError::InvalidInput(format!("quantity too large: {}", h.quantity))
            })?;
            tx.execute(
                &format!("INSERT INTO portfolio ({HOLDING_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
                params![
                    h.code,
                    h.name,
                    quantity,
                    h.avg_price,
                    h.current_price,
                    h.invested,
                    h.valuation,
                    h.profit_loss,
                    h.profit_rate,
                    updated_at,
                ],
            )
            .map_err(|e| DomainError::Database(format!("Failed to save holding: {e}")))?;
        }
        tx.commit()?;
        Ok(())
    }

    fn load_portfolio(&self) -> Result<Option<PortfolioSummary>, DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {HOLDING_COLS} FROM portfolio ORDER BY valuation DESC"
            ))
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let rows: Vec<(HoldingRow, String)> = stmt
            .query_map([], Self::row_to_holding)
            .map_err(|e| DomainError::Database(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();

        let Some(updated_at) = rows.iter().map(|(_, ts)| ts.as_str()).max() else {
            return Ok(None);
        };
        let updated_at: DateTime<Utc> = parse_timestamp(updated_at);
        let holdings = rows.into_iter().map(|(h, _)| h).collect();
        Ok(Some(PortfolioSummary::from_rows(holdings, updated_at)))
    }

    fn record_prices(&self, records: &[PriceRecord]) -> Result<(), DomainError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let tx = conn.transaction()?;
        for r in records {
            tx.execute(
                &format!("INSERT INTO price_history ({PRICE_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                params![
                    r.code,
                    r.name,
                    r.current_price,
                    r.reference_high,
                    r.reference_low,
                    r.previous_close,
                    r.drop_rate,
                    r.status.to_string(),
                    timestamp(&r.recorded_at),
                ],
            )
            .map_err(|e| DomainError::Database(format!("Failed to record price: {e}")))?;
        }
        tx.commit()?;
        Ok(())
    }

    fn price_history(&self, filter: &PriceHistoryFilter) -> Result<Vec<PriceRecord>, DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let mut sql = format!("SELECT {PRICE_COLS} FROM price_history WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(code) = &filter.code {
            sql.push_str(&format!(" AND code = ?{}", param_values.len() + 1));
            param_values.push(Box::new(code.clone()));
        }
        if let Some(since) = &filter.since {
            sql.push_str(&format!(" AND recorded_at >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(timestamp(since)));
        }
        sql.push_str(" ORDER BY recorded_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT ?{}", param_values.len() + 1));
            param_values.push(Box::new(limit as i64));
        }

        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let records = stmt
            .query_map(params_refs.as_slice(), Self::row_to_price)
            .map_err(|e| DomainError::Database(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::holding::Holding;

    #[test]
    fn test_save_replaces_previous_portfolio() {
        let store = SqlitePortfolioStore::open(":memory:").unwrap();
        assert!(store.load_portfolio().unwrap().is_none());

        let first = PortfolioSummary::from_holdings(
            &[
                Holding {
                    code: "A".into(),
                    name: "Alpha".into(),
                    quantity: 3,
                    avg_price: 100.0,
                    current_price: 120.0,
                },
                Holding {
                    code: "B".into(),
                    name: "Beta".into(),
                    quantity: 1,
                    avg_price: 50.0,
                    current_price: 40.0,
                },
            ],
            Utc::now(),
        );
        store.save_portfolio(&first).unwrap();

        let second = PortfolioSummary::from_holdings(
            &[Holding {
                code: "A".into(),
                name: "Alpha".into(),
                quantity: 4,
                avg_price: 105.0,
                current_price: 120.0,
            }],
            Utc::now(),
        );
        store.save_portfolio(&second).unwrap();

        let loaded = store.load_portfolio().unwrap().unwrap();
        assert_eq!(loaded.holdings.len(), 1);
        assert_eq!(loaded.holdings[0].quantity, 4);
        assert_eq!(loaded.total_invested, 420.0);
        assert_eq!(loaded.total_valuation, 480.0);
    }
}
