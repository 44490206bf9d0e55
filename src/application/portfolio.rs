//! Portfolio tracking: marks brokerage positions to market after the
//! close and keeps the morning price history.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::application::snapshot::MarketSnapshot;
use crate::domain::entities::instrument::Instrument;
use crate::domain::error::DomainError;
use crate::domain::ports::brokerage::HoldingsSource;
use crate::domain::ports::portfolio_store::{PortfolioStore, PriceHistoryFilter};
use crate::domain::ports::price_source::PriceSource;
use crate::domain::values::portfolio::{PortfolioSummary, PriceRecord};

/// Where positions come from and where portfolio state is kept.
#[derive(Clone)]
pub struct PortfolioPorts {
    pub holdings: Arc<dyn HoldingsSource>,
    pub store: Arc<dyn PortfolioStore>,
}

pub struct PortfolioUseCase {
    holdings: Arc<dyn HoldingsSource>,
    prices: Arc<dyn PriceSource>,
    store: Arc<dyn PortfolioStore>,
}

impl PortfolioUseCase {
    pub fn new(ports: PortfolioPorts, prices: Arc<dyn PriceSource>) -> Self {
        Self {
            holdings: ports.holdings,
            prices,
            store: ports.store,
        }
    }

    /// Re-price every position, replace the stored portfolio and return it.
    /// A failed quote keeps the brokerage's own mark for that position.
    pub async fn update(&self, universe: &[Instrument]) -> Result<PortfolioSummary, DomainError> {
        let mut holdings = self.holdings.get_holdings().await?;

        for holding in holdings.iter_mut() {
            match self.prices.get_price(&holding.code).await {
                Ok(quote) => holding.current_price = quote.current_price,
                Err(e) => {
                    warn!(
                        code = %holding.code,
                        error = %e,
                        "quote unavailable, keeping brokerage mark"
                    );
                }
            }
            if let Some(instrument) = universe.iter().find(|i| i.code == holding.code) {
                holding.name = instrument.name.clone();
            }
        }

        let summary = PortfolioSummary::from_holdings(&holdings, Utc::now());
        self.store.save_portfolio(&summary)?;
        info!(
            positions = summary.holdings.len(),
            valuation = summary.total_valuation,
            profit_rate = summary.profit_rate,
            "portfolio updated"
        );
        Ok(summary)
    }

    pub fn latest(&self) -> Result<Option<PortfolioSummary>, DomainError> {
        self.store.load_portfolio()
    }

    /// Append the snapshot's quotes to the price history.
    pub fn record_prices(&self, snapshot: &MarketSnapshot) -> Result<usize, DomainError> {
        let records = snapshot.price_records();
        self.store.record_prices(&records)?;
        Ok(records.len())
    }

    pub fn price_history(
        &self,
        filter: &PriceHistoryFilter,
    ) -> Result<Vec<PriceRecord>, DomainError> {
        self.store.price_history(filter)
    }
}
