use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS trades (
            id TEXT PRIMARY KEY,
            mode TEXT NOT NULL,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            quantity INTEGER NOT NULL,
            total REAL NOT NULL,
            fee REAL NOT NULL DEFAULT 0,
            order_id TEXT,
            memo TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_trades_created ON trades(created_at);
        CREATE INDEX IF NOT EXISTS idx_trades_code ON trades(code);
        CREATE INDEX IF NOT EXISTS idx_trades_mode ON trades(mode);

        CREATE TABLE IF NOT EXISTS portfolio (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            avg_price REAL NOT NULL,
            current_price REAL NOT NULL,
            invested REAL NOT NULL,
            valuation REAL NOT NULL,
            profit_loss REAL NOT NULL,
            profit_rate REAL NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS price_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            current_price REAL NOT NULL,
            reference_high REAL NOT NULL,
            reference_low REAL NOT NULL,
            previous_close REAL NOT NULL,
            drop_rate REAL NOT NULL,
            status TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_price_history_code ON price_history(code, recorded_at);
        ",
    )
    .map_err(|e| format!("Migration failed: {e}"))
}
