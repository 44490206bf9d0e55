//! Plain-text rendering shared by the notification sinks.

use crate::application::snapshot::MarketSnapshot;
use crate::application::trade_summary::TradeSummary;
use crate::domain::entities::trade::TradeEntry;
use crate::domain::values::allocation::BuyMode;
use crate::domain::values::buy_order::{BuyOrder, ResolvedPlan};
use crate::domain::values::dip::DipOpportunity;
use crate::domain::values::portfolio::PortfolioSummary;

pub fn plan(plan: &ResolvedPlan, mode: BuyMode) -> String {
    let summary = plan.summary();
    let mut lines = vec![format!(
        "[{mode}] buy plan: {} instruments, {:.0} of {:.0} invested ({:.1}%)",
        summary.instrument_count, summary.total_invested, summary.total_allocated, summary.efficiency
    )];
    for order in &plan.orders {
        lines.push(format!(
            "- {} {}: {} @ {:.0} = {:.0}",
            order.code, order.name, order.quantity, order.current_price, order.actual_amount
        ));
    }
    for skipped in &plan.skipped {
        lines.push(format!("- {} skipped: {}", skipped.code, skipped.reason));
    }
    if plan.unspent > 0.0 {
        lines.push(format!("unspent: {:.0}", plan.unspent));
    }
    lines.join("\n")
}

pub fn opportunity(opportunity: &DipOpportunity, recommended: Option<&BuyOrder>) -> String {
    let mut text = format!(
        "Dip alert {} {}: {:.0} vs 52w high {:.0} ({:+.2}%)",
        opportunity.code,
        opportunity.name,
        opportunity.current_price,
        opportunity.reference_high,
        opportunity.drop_rate
    );
    if let Some(order) = recommended {
        text.push_str(&format!(
            "\nrecommended: {} units, {:.0}",
            order.quantity, order.actual_amount
        ));
    }
    text
}

pub fn trade(trade: &TradeEntry) -> String {
    format!(
        "[{}] bought {} {} x{} @ {:.0} = {:.0}{}",
        trade.mode,
        trade.code,
        trade.name,
        trade.quantity,
        trade.price,
        trade.total,
        trade
            .order_id
            .as_deref()
            .map(|id| format!(" (order {id})"))
            .unwrap_or_default()
    )
}

pub fn failure(order: &BuyOrder, reason: &str) -> String {
    format!(
        "Order failed {} {} x{}: {reason}",
        order.code, order.name, order.quantity
    )
}

pub fn shortage(required: f64, available: f64) -> String {
    format!(
        "Insufficient funds: need {required:.0}, have {available:.0} (short {:.0})",
        required - available
    )
}

pub fn snapshot(snapshot: &MarketSnapshot) -> String {
    let mut lines = vec![format!(
        "Market snapshot {} (threshold {:.1}%), cash {:.0}",
        snapshot.taken_at.format("%Y-%m-%d %H:%M"),
        snapshot.threshold_percent,
        snapshot.cash_balance
    )];
    for i in &snapshot.instruments {
        lines.push(format!(
            "- {} {}: {:.0} ({:+.2}% day), {:+.2}% from high [{}]",
            i.code, i.name, i.current_price, i.change_rate, i.drop_rate, i.status
        ));
    }
    for s in &snapshot.skipped {
        lines.push(format!("- {} unavailable: {}", s.code, s.reason));
    }
    lines.join("\n")
}

pub fn trade_summary(summary: &TradeSummary) -> String {
    let mut lines = vec![
        format!("Trade summary ({})", summary.label),
        format!(
            "regular: {} trades, {:.0}",
            summary.regular_count, summary.regular_total
        ),
        format!("dip: {} trades, {:.0}", summary.dip_count, summary.dip_total),
        format!("total invested: {:.0}", summary.total_invested),
    ];
    for i in &summary.by_instrument {
        lines.push(format!("- {} {}: {} units, {:.0}", i.code, i.name, i.quantity, i.total));
    }
    lines.join("\n")
}

pub fn portfolio(summary: &PortfolioSummary) -> String {
    let mut lines = vec![
        format!("Portfolio ({})", summary.updated_at.format("%Y-%m-%d %H:%M")),
        format!(
            "invested {:.0}, valued {:.0}, P/L {:+.0} ({:+.2}%)",
            summary.total_invested, summary.total_valuation, summary.profit_loss, summary.profit_rate
        ),
    ];
    for h in &summary.holdings {
        lines.push(format!(
            "- {} {}: {} units @ {:.0} avg, now {:.0} ({:+.2}%)",
            h.code, h.name, h.quantity, h.avg_price, h.current_price, h.profit_rate
        ));
    }
    lines.join("\n")
}
