use chrono::{Duration, Utc};
use etf_autobuy::application::trade_summary::TradeSummaryUseCase;
use etf_autobuy::domain::entities::trade::TradeEntry;
use etf_autobuy::domain::ports::trade_recorder::{TradeFilter, TradeRecorder};
use etf_autobuy::domain::values::allocation::BuyMode;
use etf_autobuy::infrastructure::sqlite::trade_repo::SqliteTradeRecorder;
use std::sync::Arc;

fn trade(mode: BuyMode, code: &str, price: f64, qty: u64, days_ago: i64) -> TradeEntry {
    let mut t = TradeEntry::new(mode, code.into(), format!("{code} ETF"), price, qty, None);
    t.created_at = Utc::now() - Duration::days(days_ago);
    t
}

#[test]
fn test_list_is_newest_first_with_filters() {
    let repo = SqliteTradeRecorder::open(":memory:").unwrap();
    repo.record(&trade(BuyMode::Regular, "A", 100.0, 1, 20)).unwrap();
    repo.record(&trade(BuyMode::Dip, "B", 50.0, 2, 3)).unwrap();
    repo.record(&trade(BuyMode::Regular, "A", 110.0, 1, 1)).unwrap();

    let all = repo.list(&TradeFilter::default()).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].price, 110.0);
    assert_eq!(all[2].price, 100.0);

    let recent = repo
        .list(&TradeFilter {
            since: Some(Utc::now() - Duration::days(7)),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(recent.len(), 2);

    let dips = repo
        .list(&TradeFilter {
            mode: Some(BuyMode::Dip),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(dips.len(), 1);
    assert_eq!(dips[0].code, "B");

    let limited = repo
        .list(&TradeFilter {
            limit: Some(1),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn test_ledger_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let path = path.to_str().unwrap();

    {
        let repo = SqliteTradeRecorder::open(path).unwrap();
        repo.record(&trade(BuyMode::Regular, "A", 100.0, 3, 0)).unwrap();
    }

    let repo = SqliteTradeRecorder::open(path).unwrap();
    let trades = repo.list(&TradeFilter::default()).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].total, 300.0);
}

#[test]
fn test_weekly_summary_from_ledger() {
    let repo = Arc::new(SqliteTradeRecorder::open(":memory:").unwrap());
    repo.record(&trade(BuyMode::Regular, "A", 100.0, 2, 2)).unwrap();
    repo.record(&trade(BuyMode::Dip, "A", 90.0, 1, 1)).unwrap();
    repo.record(&trade(BuyMode::Dip, "B", 40.0, 5, 1)).unwrap();
    repo.record(&trade(BuyMode::Regular, "C", 10.0, 1, 30)).unwrap();

    let summary = TradeSummaryUseCase::new(repo).last_days(7).unwrap();
    assert_eq!(summary.regular_count, 1);
    assert_eq!(summary.regular_total, 200.0);
    assert_eq!(summary.dip_count, 2);
    assert_eq!(summary.dip_total, 290.0);
    assert_eq!(summary.total_invested, 490.0);
    assert_eq!(summary.by_instrument.len(), 2);
    assert_eq!(summary.by_instrument[0].code, "A");
    assert_eq!(summary.by_instrument[0].quantity, 3);
}
