use crate::domain::entities::holding::Holding;
use crate::domain::entities::trade::TradeEntry;
use crate::domain::error::DomainError;
use crate::domain::ports::brokerage::{BalanceSource, HoldingsSource, OrderExecutor, OrderReceipt};
use crate::domain::ports::price_source::PriceSource;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Debug, Default, Clone, Copy)]
struct Position {
    quantity: u64,
    cost: f64,
    last_price: f64,
}

impl Position {
    fn add(&mut self, quantity: u64, price: f64) {
        self.quantity += quantity;
        self.cost += price * quantity as f64;
        self.last_price = price;
    }
}

#[derive(Debug, Default)]
struct Wallet {
    cash: f64,
    positions: BTreeMap<String, Position>,
}

/// Simulated brokerage. Fills market buys at the current quote and keeps
/// cash and positions in memory. [`PaperBroker::replay`] rebuilds that state
/// from the trade ledger so separate runs share one account.
pub struct PaperBroker {
    prices: Arc<dyn PriceSource>,
    wallet: Mutex<Wallet>,
}

impl PaperBroker {
    pub fn new(initial_cash: f64, prices: Arc<dyn PriceSource>) -> Self {
        Self {
            prices,
            wallet: Mutex::new(Wallet {
                cash: initial_cash,
                positions: BTreeMap::new(),
            }),
        }
    }

    /// Apply past fills, oldest first: debit cash and credit positions.
    pub fn replay(&self, trades: &[TradeEntry]) -> Result<(), DomainError> {
        let mut wallet = self.lock()?;
        for trade in trades {
            wallet.cash -= trade.total;
            wallet
                .positions
                .entry(trade.code.clone())
                .or_default()
                .add(trade.quantity, trade.price);
        }
        debug!(trades = trades.len(), cash = wallet.cash, "paper wallet replayed");
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Wallet>, DomainError> {
        self.wallet
            .lock()
            .map_err(|e| DomainError::OrderSubmission {
                code: String::new(),
                reason: format!("paper wallet poisoned: {e}"),
            })
    }
}

#[async_trait]
impl BalanceSource for PaperBroker {
    async fn get_cash_balance(&self) -> Result<f64, DomainError> {
        Ok(self.lock()?.cash)
    }
}

#[async_trait]
impl OrderExecutor for PaperBroker {
    async fn submit_buy(&self, code: &str, quantity: u64) -> Result<OrderReceipt, DomainError> {
        if quantity == 0 {
            return Ok(OrderReceipt::rejected("quantity must be positive"));
        }

        let quote = self.prices.get_price(code).await?;
        let cost = quote.current_price * quantity as f64;

        let mut wallet = self.lock()?;
        if cost > wallet.cash {
            return Ok(OrderReceipt::rejected(format!(
                "insufficient cash: need {cost:.0}, have {:.0}",
                wallet.cash
            )));
        }
        wallet.cash -= cost;
        wallet
            .positions
            .entry(code.to_string())
            .or_default()
            .add(quantity, quote.current_price);

        let order_id = uuid::Uuid::new_v4().to_string();
        info!(code, quantity, price = quote.current_price, %order_id, "paper fill");
        Ok(OrderReceipt::accepted(
            order_id,
            format!("filled {quantity} @ {:.0}", quote.current_price),
        ))
    }
}

#[async_trait]
impl HoldingsSource for PaperBroker {
    /// Names are the codes; the brokerage knows nothing else about a fund.
    async fn get_holdings(&self) -> Result<Vec<Holding>, DomainError> {
        let wallet = self.lock()?;
        Ok(wallet
            .positions
            .iter()
            .filter(|(_, p)| p.quantity > 0)
            .map(|(code, p)| Holding {
                code: code.clone(),
                name: code.clone(),
                quantity: p.quantity,
                avg_price: p.cost / p.quantity as f64,
                current_price: p.last_price,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::price_source::Quote;
    use crate::domain::values::allocation::BuyMode;

    struct Fixed(f64);

    #[async_trait]
    impl PriceSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn get_price(&self, _code: &str) -> Result<Quote, DomainError> {
            Ok(Quote {
                current_price: self.0,
                reference_high: self.0,
                reference_low: self.0,
                previous_close: self.0,
            })
        }
    }

    #[tokio::test]
    async fn test_fill_debits_cash_and_credits_position() {
        let broker = PaperBroker::new(1_000.0, Arc::new(Fixed(300.0)));
        let receipt = broker.submit_buy("A", 3).await.unwrap();
        assert!(receipt.success);
        assert!(receipt.order_id.is_some());
        assert_eq!(broker.get_cash_balance().await.unwrap(), 100.0);

        let holdings = broker.get_holdings().await.unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].quantity, 3);
        assert_eq!(holdings[0].avg_price, 300.0);
    }

    #[tokio::test]
    async fn test_replay_restores_cash_and_average_price() {
        let broker = PaperBroker::new(10_000.0, Arc::new(Fixed(0.0)));
        broker
            .replay(&[
                TradeEntry::new(BuyMode::Regular, "A".into(), "Alpha".into(), 100.0, 10, None),
                TradeEntry::new(BuyMode::Dip, "A".into(), "Alpha".into(), 70.0, 10, None),
            ])
            .unwrap();

        assert_eq!(broker.get_cash_balance().await.unwrap(), 8_300.0);
        let holdings = broker.get_holdings().await.unwrap();
        assert_eq!(holdings[0].quantity, 20);
        assert_eq!(holdings[0].avg_price, 85.0);
        assert_eq!(holdings[0].current_price, 70.0);
    }

    #[tokio::test]
    async fn test_rejects_when_cash_short_or_zero_quantity() {
        let broker = PaperBroker::new(500.0, Arc::new(Fixed(300.0)));
        assert!(!broker.submit_buy("A", 2).await.unwrap().success);
        assert!(!broker.submit_buy("A", 0).await.unwrap().success);
        assert_eq!(broker.get_cash_balance().await.unwrap(), 500.0);
    }
}
