//! Stock quote tool — twelvedata time series.

use async_trait::async_trait;
use serde::Deserialize;
use toolweave_core::error::ToolError;
use toolweave_core::tool::Tool;

use crate::http::HttpClient;
use crate::parse_args;

const NAME: &str = "getStockData";
const INTERVALS: &[&str] = &["1min", "5min", "15min", "30min", "1h", "1day", "1week", "1month"];

pub struct StockDataTool {
    http: HttpClient,
    api_key: String,
}

impl StockDataTool {
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }
}

#[derive(Deserialize)]
struct Input {
    symbol: String,
    #[serde(default)]
    interval: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimeSeries {
    #[serde(default)]
    pub meta: Option<SeriesMeta>,
    #[serde(default)]
    pub values: Option<Vec<Bar>>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeriesMeta {
    pub symbol: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Bar {
    pub datetime: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    #[serde(default)]
    pub volume: Option<String>,
}

#[async_trait]
impl Tool for StockDataTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get real-time stock market data for any publicly traded company"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "Stock ticker symbol (e.g., AAPL, GOOGL, MSFT)"
                },
                "interval": {
                    "type": "string",
                    "enum": INTERVALS,
                    "description": "Time interval for data points"
                }
            },
            "required": ["symbol"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let input: Input = parse_args(arguments)?;
        let interval = input.interval.unwrap_or_else(|| "1day".into());
        if !INTERVALS.contains(&interval.as_str()) {
            return Err(ToolError::InvalidArguments(format!("unsupported interval {interval:?}")));
        }
        let symbol = input.symbol.trim().to_uppercase();

        let url = reqwest::Url::parse_with_params(
            "https://api.twelvedata.com/time_series",
            &[
                ("symbol", symbol.as_str()),
                ("interval", interval.as_str()),
                ("outputsize", "5"),
                ("apikey", self.api_key.as_str()),
            ],
        )
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let series: TimeSeries = self.http.get_json(NAME, url.as_str()).await?;

        Ok(serde_json::Value::String(format_series(&symbol, &interval, &series)))
    }
}

pub fn format_series(symbol: &str, interval: &str, series: &TimeSeries) -> String {
    let values = match &series.values {
        Some(v) if !v.is_empty() && series.status.as_deref() != Some("error") => v,
        _ => {
            return format!(
                "❌ Unable to fetch data for symbol \"{symbol}\". Please check the ticker symbol and try again."
            );
        }
    };

    let latest = &values[0];
    let change = values.get(1).and_then(|previous| {
        let now: f64 = latest.close.parse().ok()?;
        let before: f64 = previous.close.parse().ok()?;
        (before != 0.0).then(|| (now - before, (now - before) / before * 100.0))
    });

    let (emoji, change_text) = match change {
        Some((abs, pct)) => (
            if abs >= 0.0 { "📈" } else { "📉" },
            format!("${abs:.2} ({pct:.2}%)"),
        ),
        None => ("➖", "N/A".to_string()),
    };

    let meta = series.meta.as_ref();
    let mut lines = vec![format!(
        "💹 **Stock Data: {}**",
        meta.map_or(symbol, |m| m.symbol.as_str())
    )];
    if let Some(exchange) = meta.and_then(|m| m.exchange.as_deref()) {
        lines.push(format!("🏦 Exchange: {exchange}"));
    }
    if let Some(currency) = meta.and_then(|m| m.currency.as_deref()) {
        lines.push(format!("💵 Currency: {currency}"));
    }
    lines.push(String::new());
    lines.push(format!("📊 **Latest ({})**", latest.datetime));
    lines.push(format!("- Open: ${}", latest.open));
    lines.push(format!("- High: ${}", latest.high));
    lines.push(format!("- Low: ${}", latest.low));
    lines.push(format!("- Close: ${}", latest.close));
    if let Some(volume) = &latest.volume {
        lines.push(format!("- Volume: {volume}"));
    }
    lines.push(String::new());
    lines.push(format!("{emoji} **Change:** {change_text}"));
    lines.push(String::new());
    lines.push(format!("📉 **Recent History ({interval} intervals):**"));
    lines.extend(values.iter().take(5).map(|v| format!("- {}: ${}", v.datetime, v.close)));

    lines.join("\n")
}
