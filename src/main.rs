use clap::Parser;
use etf_autobuy::cli::commands::{Cli, Commands};
use etf_autobuy::config::AppConfig;
use etf_autobuy::domain::values::allocation::BuyMode;
use etf_autobuy::AutoInvestor;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = AppConfig::resolve_path(cli.config.as_deref());

    let config = match AppConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading {config_path}: {e}");
            std::process::exit(1);
        }
    };

    if let Commands::CheckConfig = cli.command {
        print_config(&config);
        return;
    }

    let investor = match AutoInvestor::new(config) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("Error initializing: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_command(investor, cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn print_config(config: &AppConfig) {
    let enabled: Vec<_> = config
        .instruments
        .iter()
        .filter(|i| i.enabled)
        .map(|i| serde_json::json!({ "code": i.code, "name": i.name, "category": i.category, "priority": i.priority }))
        .collect();
    let report = serde_json::json!({
        "valid": true,
        "allocation_method": config.strategy.allocation_method,
        "dip_allocation_method": config.strategy.dip_allocation_method,
        "redistribution": config.strategy.redistribution,
        "auto_trade": config.advanced.auto_trade,
        "buy_day": config.strategy.buy_day,
        "dip_threshold": config.strategy.dip_threshold,
        "enabled_instruments": enabled,
        "categories": config.category_counts(),
        "webhook_configured": config.notifications.webhook_url.is_some(),
        "database_path": config.database_path,
    });
    println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_command(
    mut investor: AutoInvestor,
    cmd: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    let today = chrono::Local::now().date_naive();

    match cmd {
        Commands::Run => investor.run().await?,
        Commands::Regular { force } => {
            investor.refresh_reference_highs().await;
            print_json(&investor.run_regular(today, force).await?)?;
        }
        Commands::Dip => {
            investor.refresh_reference_highs().await;
            print_json(&investor.run_dip().await?)?;
        }
        Commands::Scan => {
            investor.refresh_reference_highs().await;
            print_json(&investor.scan().await)?;
        }
        Commands::Plan { amount, mode } => {
            let mode: BuyMode = mode.parse()?;
            let plan = investor.plan(amount, mode).await?;
            print_json(&serde_json::json!({
                "mode": mode,
                "plan": plan,
                "summary": plan.summary(),
            }))?;
        }
        Commands::Snapshot => {
            investor.refresh_reference_highs().await;
            print_json(&investor.snapshot().await?)?;
        }
        Commands::Trades { limit, since, mode } => {
            let since_dt = parse_date(&since)?;
            let mode = mode.map(|m| m.parse::<BuyMode>()).transpose()?;
            print_json(&investor.trades(Some(limit), since_dt, mode)?)?;
        }
        Commands::Summary { days } => {
            print_json(&investor.trade_summary(days)?)?;
        }
        Commands::Portfolio { refresh } => {
            if refresh {
                print_json(&investor.update_portfolio().await?)?;
            } else {
                match investor.portfolio()? {
                    Some(summary) => print_json(&summary)?,
                    None => println!("No portfolio recorded yet; run with --refresh"),
                }
            }
        }
        Commands::Prices { code, since, limit } => {
            let since_dt = parse_date(&since)?;
            print_json(&investor.price_history(code, since_dt, Some(limit))?)?;
        }
        Commands::RefreshHighs => {
            let skipped = investor.refresh_reference_highs().await;
            let highs = investor.decision().reference_highs();
            let cached: Vec<_> = investor
                .decision()
                .universe()
                .iter()
                .filter_map(|i| highs.get(&i.code).map(|h| serde_json::json!({ "code": i.code, "reference_high": h })))
                .collect();
            print_json(&serde_json::json!({
                "refreshed_at": highs.refreshed_at(),
                "cached": cached,
                "skipped": skipped,
            }))?;
        }
        Commands::CheckConfig => print_config(investor.config()),
    }
    Ok(())
}

fn parse_date(s: &Option<String>) -> Result<Option<chrono::DateTime<chrono::Utc>>, String> {
    match s {
        None => Ok(None),
        Some(s) => {
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                return Ok(Some(dt.with_timezone(&chrono::Utc)));
            }
            if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                    return Ok(Some(chrono::DateTime::from_naive_utc_and_offset(
                        dt,
                        chrono::Utc,
                    )));
                }
            }
            Err(format!("Invalid date format: {s}. Use YYYY-MM-DD or RFC3339"))
        }
    }
}
