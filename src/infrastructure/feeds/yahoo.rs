use crate::domain::error::DomainError;
use crate::domain::ports::price_source::{PriceSource, Quote};
use async_trait::async_trait;
use tracing::debug;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Quote source backed by the Yahoo Finance v8 chart API (no auth required).
///
/// Instrument codes are exchange-local (e.g. "069500"); `symbol_suffix`
/// turns them into Yahoo symbols ("069500.KS").
pub struct YahooPriceSource {
    symbol_suffix: String,
    base_url: String,
    client: reqwest::Client,
}

impl YahooPriceSource {
    pub fn new(symbol_suffix: impl Into<String>) -> Self {
        Self::with_base_url(symbol_suffix, BASE_URL)
    }

    pub fn with_base_url(symbol_suffix: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            symbol_suffix: symbol_suffix.into(),
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .user_agent(
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                     AppleWebKit/537.36 (KHTML, like Gecko) \
                     Chrome/120.0.0.0 Safari/537.36",
                )
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn symbol(&self, code: &str) -> String {
        if self.symbol_suffix.is_empty() || code.ends_with(&self.symbol_suffix) {
            code.to_string()
        } else {
            format!("{code}{}", self.symbol_suffix)
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, serde::Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, serde::Deserialize)]
struct ChartData {
    meta: ChartMeta,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
    #[serde(default)]
    fifty_two_week_high: Option<f64>,
    #[serde(default)]
    fifty_two_week_low: Option<f64>,
}

fn quote_from_chart(code: &str, data: ChartResponse) -> Result<Quote, DomainError> {
    let parse_err = |reason: String| DomainError::PriceFetch {
        code: code.to_string(),
        reason,
    };

    if let Some(err) = data.chart.error {
        return Err(parse_err(format!("Yahoo error: {err}")));
    }
    let results = data
        .chart
        .result
        .ok_or_else(|| parse_err("no chart results".into()))?;
    let meta = &results
        .first()
        .ok_or_else(|| parse_err("empty chart results".into()))?
        .meta;

    let price = meta
        .regular_market_price
        .ok_or_else(|| parse_err("no market price".into()))?;

    Ok(Quote {
        current_price: price,
        reference_high: meta.fifty_two_week_high.unwrap_or(0.0),
        reference_low: meta.fifty_two_week_low.unwrap_or(0.0),
        previous_close: meta.chart_previous_close.unwrap_or(price),
    })
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    async fn get_price(&self, code: &str) -> Result<Quote, DomainError> {
        let symbol = self.symbol(code);
        let url = format!("{}/{symbol}?range=1d&interval=1d", self.base_url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(DomainError::PriceFetch {
                code: code.to_string(),
                reason: format!("Yahoo API returned {} for {symbol}", resp.status()),
            });
        }

        let data: ChartResponse = resp
            .json()
            .await
            .map_err(|e| DomainError::Parse(e.to_string()))?;

        let quote = quote_from_chart(code, data)?;
        debug!(code, price = quote.current_price, high = quote.reference_high, "quote");
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_suffix() {
        let source = YahooPriceSource::new(".KS");
        assert_eq!(source.symbol("069500"), "069500.KS");
        assert_eq!(source.symbol("069500.KS"), "069500.KS");
        assert_eq!(YahooPriceSource::new("").symbol("SPY"), "SPY");
        assert_eq!(source.name(), "yahoo_finance");
    }

    #[test]
    fn test_quote_from_chart_meta() {
        let body = r#"{"chart":{"result":[{"meta":{
            "regularMarketPrice":95.0,
            "chartPreviousClose":100.0,
            "fiftyTwoWeekHigh":110.0,
            "fiftyTwoWeekLow":80.0}}],"error":null}}"#;
        let data: ChartResponse = serde_json::from_str(body).unwrap();
        let quote = quote_from_chart("A", data).unwrap();
        assert_eq!(quote.current_price, 95.0);
        assert_eq!(quote.reference_high, 110.0);
        assert_eq!(quote.change(), -5.0);
    }

    #[test]
    fn test_quote_from_chart_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found"}}}"#;
        let data: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            quote_from_chart("A", data),
            Err(DomainError::PriceFetch { .. })
        ));
    }
}
