use serde::{Deserialize, Serialize};

/// A position held at the brokerage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub code: String,
    pub name: String,
    pub quantity: u64,
    pub avg_price: f64,
    pub current_price: f64,
}

impl Holding {
    pub fn invested(&self) -> f64 {
        self.avg_price * self.quantity as f64
    }

    pub fn valuation(&self) -> f64 {
        self.current_price * self.quantity as f64
    }

    pub fn profit_loss(&self) -> f64 {
        self.valuation() - self.invested()
    }

    /// Percent of the amount invested. Zero for a free position.
    pub fn profit_rate(&self) -> f64 {
        let invested = self.invested();
        if invested > 0.0 {
            self.profit_loss() / invested * 100.0
        } else {
            0.0
        }
    }
}
