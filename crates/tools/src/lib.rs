//! Data-source adapters for Toolweave.
//!
//! Each adapter is an automatic [`Tool`](toolweave_core::Tool) that takes
//! typed JSON input and returns a markdown string. Network calls go through
//! one shared [`HttpClient`]; the markdown rendering of every adapter is a
//! pure function over the decoded API payload.

pub mod chart;
pub mod color_palette;
pub mod country_info;
pub mod http;
pub mod local_time;
pub mod nasa_apod;
pub mod random_fact;
pub mod stock_data;
pub mod weather;

use serde::de::DeserializeOwned;
use std::sync::Arc;
use toolweave_config::ToolsConfig;
use toolweave_core::error::ToolError;
use toolweave_core::tool::ToolRegistry;

pub use http::HttpClient;

/// Create the registry with all eight adapters.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let http = HttpClient::new(config.http_timeout_secs);
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(weather::WeatherTool::new(http.clone())));
    registry.register(Arc::new(local_time::LocalTimeTool::new(http.clone())));
    registry.register(Arc::new(random_fact::RandomFactTool::new(http.clone())));
    registry.register(Arc::new(color_palette::ColorPaletteTool::new(http.clone())));
    registry.register(Arc::new(nasa_apod::NasaApodTool::new(
        http.clone(),
        config.nasa_api_key.clone(),
    )));
    registry.register(Arc::new(stock_data::StockDataTool::new(
        http.clone(),
        config.stock_api_key.clone(),
    )));
    registry.register(Arc::new(country_info::CountryInfoTool::new(http)));
    registry.register(Arc::new(chart::ChartTool));
    registry
}

/// Decode tool arguments into the adapter's input struct.
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// `1234567` → `"1,234,567"`.
pub(crate) fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_all_adapters() {
        let registry = default_registry(&ToolsConfig::default());
        assert_eq!(
            registry.names(),
            vec![
                "generateChart",
                "generateColorPalette",
                "getCountryInfo",
                "getLocalTime",
                "getNasaAPOD",
                "getRandomFact",
                "getStockData",
                "getWeatherInformation",
            ]
        );
        assert!(registry.names().iter().all(|n| {
            !registry.get(n).unwrap().requires_confirmation()
        }));
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(125_836_021), "125,836,021");
    }

    #[test]
    fn parse_args_reports_invalid_input() {
        #[derive(serde::Deserialize, Debug)]
        #[allow(dead_code)]
        struct Input {
            city: String,
        }
        let err = parse_args::<Input>(serde_json::json!({"town": "x"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
