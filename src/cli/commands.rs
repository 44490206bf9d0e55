use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "etf-autobuy", about = "Scheduled ETF accumulation with dip buying")]
pub struct Cli {
    /// Path to the JSON config (default: $ETF_AUTOBUY_CONFIG or ./config.json)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the scheduler loop until Ctrl-C
    Run,
    /// Run the regular monthly buy now
    Regular {
        /// Ignore the buy-day check
        #[arg(long)]
        force: bool,
    },
    /// Scan for dips and buy (or announce) the flagged instruments
    Dip,
    /// Scan for dips without planning or buying
    Scan,
    /// Dry plan with live prices; never submits orders
    Plan {
        #[arg(long)]
        amount: f64,
        /// regular or dip
        #[arg(long, default_value = "regular")]
        mode: String,
    },
    /// Current prices against 52-week highs, plus cash balance
    Snapshot,
    /// List recorded trades, newest first
    Trades {
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Only trades at or after this date (YYYY-MM-DD or RFC3339)
        #[arg(long)]
        since: Option<String>,
        /// regular or dip
        #[arg(long)]
        mode: Option<String>,
    },
    /// Trade totals over the trailing window
    Summary {
        #[arg(long, default_value = "7")]
        days: i64,
    },
    /// Holdings with valuation and profit/loss
    Portfolio {
        /// Re-price and store holdings instead of printing the last update
        #[arg(long)]
        refresh: bool,
    },
    /// Recorded morning prices, newest first
    Prices {
        #[arg(long)]
        code: Option<String>,
        /// Only prices at or after this date (YYYY-MM-DD or RFC3339)
        #[arg(long)]
        since: Option<String>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Re-fetch 52-week highs and print what was cached
    RefreshHighs,
    /// Validate the config file and print the resolved universe
    CheckConfig,
}
