//! Quantity resolver: turns money allocations into whole-unit orders.
//!
//! Each line is truncated to whole units at its live price. The per-line
//! remainders are pooled and handed back out in a single forward pass over
//! the priority list; whatever the pass cannot place is reported as unspent.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::domain::error::DomainError;
use crate::domain::values::allocation::{AllocationLine, RedistributionPolicy};
use crate::domain::values::buy_order::{BuyOrder, ResolvedPlan, SkipReason, Skipped};

#[derive(Debug, Clone, Copy, Default)]
pub struct QuantityResolver {
    policy: RedistributionPolicy,
}

impl QuantityResolver {
    pub fn new(policy: RedistributionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RedistributionPolicy {
        self.policy
    }

    /// Resolve `lines` against `prices` (code -> price).
    ///
    /// Lines without a price are skipped and reported. A non-positive price
    /// is a contract violation and fails the whole call.
    pub fn resolve(
        &self,
        lines: &[AllocationLine],
        prices: &HashMap<String, f64>,
    ) -> Result<ResolvedPlan, DomainError> {
        let mut orders = Vec::with_capacity(lines.len());
        let mut skipped = Vec::new();
        let mut total_remainder = 0.0;

        for line in lines {
            let Some(&price) = prices.get(&line.code) else {
                warn!(code = %line.code, name = %line.name, "no price, skipping");
                skipped.push(Skipped {
                    code: line.code.clone(),
                    reason: SkipReason::MissingPrice,
                });
                continue;
            };
            if !(price.is_finite() && price > 0.0) {
                return Err(DomainError::InvalidPrice {
                    code: line.code.clone(),
                    price,
                });
            }

            let order = BuyOrder::from_line(line, price);
            total_remainder += order.remainder;
            orders.push(order);
        }

        orders.sort_by_key(|o| o.priority);

        let unspent = if total_remainder > 0.0 {
            self.redistribute(&mut orders, total_remainder)
        } else {
            total_remainder
        };

        Ok(ResolvedPlan {
            orders,
            skipped,
            unspent,
        })
    }

    /// Grant extra units from the pooled remainder in priority order.
    /// Returns what is left.
    fn redistribute(&self, orders: &mut [BuyOrder], mut remainder: f64) -> f64 {
        info!(remainder, policy = %self.policy, "redistributing remainder");

        for order in orders.iter_mut() {
            let price = order.current_price;
            if remainder < price {
                match self.policy {
                    RedistributionPolicy::StopAtFirst => break,
                    RedistributionPolicy::SkipUnaffordable => continue,
                }
            }

            let additional = (remainder / price).floor() as u64;
            if additional == 0 {
                continue;
            }
            let additional_amount = additional as f64 * price;
            order.grant(additional);
            remainder -= additional_amount;
            debug!(
                code = %order.code,
                additional,
                additional_amount,
                "granted units from remainder"
            );
        }

        if remainder > 0.0 {
            info!(unspent = remainder, "remainder left unspent");
        }
        remainder
    }
}
