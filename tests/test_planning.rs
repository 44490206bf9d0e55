use etf_autobuy::application::allocation::AllocationEngine;
use etf_autobuy::application::quantity::QuantityResolver;
use etf_autobuy::domain::entities::instrument::{enabled_universe, Instrument};
use etf_autobuy::domain::error::DomainError;
use etf_autobuy::domain::values::allocation::{
    AllocationMethod, BuyMode, CategoryLimit, CategoryLimits, DipAllocationMethod,
    RedistributionPolicy,
};
use std::collections::HashMap;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn engine(method: AllocationMethod, limits: CategoryLimits) -> AllocationEngine {
    AllocationEngine::new(method, DipAllocationMethod::Focus, limits)
}

fn scenario_universe() -> Vec<Instrument> {
    vec![
        Instrument::new("A", "Alpha").with_weight(2.0).with_priority(1),
        Instrument::new("B", "Beta").with_weight(1.0).with_priority(2),
    ]
}

fn scenario_prices() -> HashMap<String, f64> {
    HashMap::from([("A".to_string(), 150_000.0), ("B".to_string(), 40_000.0)])
}

#[test]
fn test_equal_allocation_splits_evenly() {
    let universe: Vec<Instrument> = (0..4)
        .map(|i| Instrument::new(format!("E{i}"), "Fund"))
        .collect();
    let lines = engine(AllocationMethod::Equal, CategoryLimits::new())
        .allocate(1_000_000.0, BuyMode::Regular, &universe)
        .unwrap();
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().all(|l| close(l.allocated_amount, 250_000.0)));
    assert!(close(lines.iter().map(|l| l.ratio).sum::<f64>(), 1.0));
}

#[test]
fn test_weighted_allocation_conserves_total() {
    let lines = engine(AllocationMethod::Weighted, CategoryLimits::new())
        .allocate(300_000.0, BuyMode::Regular, &scenario_universe())
        .unwrap();
    assert!(close(lines[0].allocated_amount, 200_000.0));
    assert!(close(lines[1].allocated_amount, 100_000.0));
    assert!(close(lines.iter().map(|l| l.allocated_amount).sum::<f64>(), 300_000.0));
    assert!(close(lines[0].ratio / lines[1].ratio, 2.0));
}

#[test]
fn test_custom_ratios_normalize_when_off() {
    for (a, b) in [(0.5, 0.35), (0.65, 0.5)] {
        let universe = vec![
            Instrument::new("A", "Alpha").with_custom_ratio(a),
            Instrument::new("B", "Beta").with_custom_ratio(b),
        ];
        let lines = engine(AllocationMethod::Custom, CategoryLimits::new())
            .allocate(100_000.0, BuyMode::Regular, &universe)
            .unwrap();
        assert!(close(lines.iter().map(|l| l.ratio).sum::<f64>(), 1.0));
        assert!(close(lines[0].allocated_amount, 100_000.0 * a / (a + b)));
    }
}

#[test]
fn test_category_cap_only_shrinks() {
    let universe = vec![
        Instrument::new("A", "Alpha").with_category("EQUITY").with_weight(3.0),
        Instrument::new("B", "Beta").with_category("BOND").with_weight(1.0),
    ];
    let limits = HashMap::from([(
        "EQUITY".to_string(),
        CategoryLimit {
            max_allocation_ratio: 0.5,
        },
    )]);

    let capped = engine(AllocationMethod::Weighted, limits)
        .allocate(100_000.0, BuyMode::Regular, &universe)
        .unwrap();
    let uncapped = engine(AllocationMethod::Weighted, CategoryLimits::new())
        .allocate(100_000.0, BuyMode::Regular, &universe)
        .unwrap();

    assert!(close(capped[0].allocated_amount, 50_000.0));
    assert!(capped[0].allocated_amount <= uncapped[0].allocated_amount);
    assert!(close(capped[1].allocated_amount, uncapped[1].allocated_amount));
    assert!(capped.iter().map(|l| l.allocated_amount).sum::<f64>() < 100_000.0);
}

#[test]
fn test_dip_mode_uses_dip_method_on_narrowed_universe() {
    let universe = scenario_universe();
    let engine = AllocationEngine::new(
        AllocationMethod::Weighted,
        DipAllocationMethod::Equal,
        CategoryLimits::new(),
    );
    let flagged: Vec<Instrument> = universe.iter().filter(|i| i.code == "B").cloned().collect();
    let lines = engine.allocate(500_000.0, BuyMode::Dip, &flagged).unwrap();
    assert_eq!(lines.len(), 1);
    assert!(close(lines[0].allocated_amount, 500_000.0));
    assert_eq!(universe.len(), 2);
}

#[test]
fn test_empty_universe_is_configuration_error() {
    let universe = vec![Instrument::new("A", "Alpha").disabled()];
    let err = enabled_universe(&universe).unwrap_err();
    assert!(err.is_configuration());

    let err = engine(AllocationMethod::Equal, CategoryLimits::new())
        .allocate(1_000.0, BuyMode::Regular, &[])
        .unwrap_err();
    assert!(matches!(err, DomainError::EmptyUniverse));
}

#[test]
fn test_end_to_end_stop_at_first() {
    let lines = engine(AllocationMethod::Weighted, CategoryLimits::new())
        .allocate(300_000.0, BuyMode::Regular, &scenario_universe())
        .unwrap();
    let plan = QuantityResolver::new(RedistributionPolicy::StopAtFirst)
        .resolve(&lines, &scenario_prices())
        .unwrap();

    let a = plan.find("A").unwrap();
    let b = plan.find("B").unwrap();
    assert_eq!(a.quantity, 1);
    assert!(close(a.remainder, 50_000.0));
    assert_eq!(b.quantity, 2);
    assert!(close(b.remainder, 20_000.0));
    // A cannot take another unit, so redistribution stops there.
    assert!(close(plan.unspent, 70_000.0));
}

#[test]
fn test_end_to_end_skip_unaffordable() {
    let lines = engine(AllocationMethod::Weighted, CategoryLimits::new())
        .allocate(300_000.0, BuyMode::Regular, &scenario_universe())
        .unwrap();
    let plan = QuantityResolver::new(RedistributionPolicy::SkipUnaffordable)
        .resolve(&lines, &scenario_prices())
        .unwrap();

    let a = plan.find("A").unwrap();
    let b = plan.find("B").unwrap();
    assert_eq!(a.quantity, 1);
    assert!(close(a.actual_amount, 150_000.0));
    assert_eq!(b.quantity, 3);
    assert_eq!(b.redistributed_quantity, 1);
    assert!(close(b.actual_amount, 120_000.0));
    assert!(close(plan.unspent, 30_000.0));
}

#[test]
fn test_money_is_conserved_and_runs_are_deterministic() {
    let universe = vec![
        Instrument::new("A", "Alpha").with_weight(1.3).with_priority(2),
        Instrument::new("B", "Beta").with_weight(0.7).with_priority(1),
        Instrument::new("C", "Gamma").with_weight(2.1).with_priority(3),
    ];
    let prices = HashMap::from([
        ("A".to_string(), 12_345.0),
        ("B".to_string(), 9_870.0),
        ("C".to_string(), 55_500.0),
    ]);

    for policy in [RedistributionPolicy::StopAtFirst, RedistributionPolicy::SkipUnaffordable] {
        let resolver = QuantityResolver::new(policy);
        let lines = engine(AllocationMethod::Weighted, CategoryLimits::new())
            .allocate(777_777.0, BuyMode::Regular, &universe)
            .unwrap();
        let first = resolver.resolve(&lines, &prices).unwrap();
        let second = resolver.resolve(&lines, &prices).unwrap();

        let allocated: f64 = lines.iter().map(|l| l.allocated_amount).sum();
        let invested: f64 = first.orders.iter().map(|o| o.actual_amount).sum();
        assert!((invested + first.unspent - allocated).abs() < 1e-4);
        assert!(first.unspent >= 0.0);

        let q1: Vec<u64> = first.orders.iter().map(|o| o.quantity).collect();
        let q2: Vec<u64> = second.orders.iter().map(|o| o.quantity).collect();
        assert_eq!(q1, q2);
        assert_eq!(first.orders[0].code, "B");
    }
}

#[test]
fn test_plan_summary_efficiency() {
    let lines = engine(AllocationMethod::Weighted, CategoryLimits::new())
        .allocate(300_000.0, BuyMode::Regular, &scenario_universe())
        .unwrap();
    let plan = QuantityResolver::new(RedistributionPolicy::SkipUnaffordable)
        .resolve(&lines, &scenario_prices())
        .unwrap();
    let summary = plan.summary();
    assert_eq!(summary.total_units, 4);
    assert_eq!(summary.instrument_count, 2);
    assert!(close(summary.total_invested, 270_000.0));
    assert!(close(summary.efficiency, 90.0));
}
