//! Country facts from restcountries v3.1.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use toolweave_core::error::ToolError;
use toolweave_core::tool::Tool;

use crate::http::HttpClient;
use crate::{group_thousands, parse_args};

const NAME: &str = "getCountryInfo";

pub struct CountryInfoTool {
    http: HttpClient,
}

impl CountryInfoTool {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[derive(Deserialize)]
struct Input {
    country: String,
}

#[derive(Debug, Deserialize)]
pub struct Country {
    pub name: CountryName,
    pub population: u64,
    pub region: String,
    #[serde(default)]
    pub subregion: Option<String>,
    #[serde(default)]
    pub capital: Vec<String>,
    #[serde(default)]
    pub languages: BTreeMap<String, String>,
    #[serde(default)]
    pub currencies: BTreeMap<String, Currency>,
    pub flags: Flags,
    pub area: f64,
    #[serde(default)]
    pub timezones: Vec<String>,
    #[serde(default)]
    pub continents: Vec<String>,
    #[serde(default)]
    pub maps: Option<Maps>,
}

#[derive(Debug, Deserialize)]
pub struct CountryName {
    pub common: String,
    pub official: String,
}

#[derive(Debug, Deserialize)]
pub struct Currency {
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Flags {
    pub png: String,
}

#[derive(Debug, Deserialize)]
pub struct Maps {
    #[serde(rename = "googleMaps")]
    pub google_maps: String,
}

#[async_trait]
impl Tool for CountryInfoTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get detailed information about any country including population, currency, flags, and more"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "country": {
                    "type": "string",
                    "description": "Country name or code (e.g., Japan, USA, FR)"
                }
            },
            "required": ["country"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let Input { country } = parse_args(arguments)?;
        let query = country.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("country must not be empty".into()));
        }

        let mut url = reqwest::Url::parse("https://restcountries.com/v3.1/name/")
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ToolError::InvalidArguments("bad base url".into()))?
            .pop_if_empty()
            .push(query);

        let found: Option<Vec<Country>> = self.http.get_json_opt(NAME, url.as_str()).await?;
        let text = match found.as_deref() {
            Some([first, ..]) => format_country(first),
            _ => format!("❌ Country \"{query}\" not found. Please check the spelling and try again."),
        };
        Ok(serde_json::Value::String(text))
    }
}

fn format_area(area: f64) -> String {
    let rounded = (area.max(0.0) * 100.0).round() / 100.0;
    let whole = group_thousands(rounded.trunc() as u64);
    if rounded.fract() == 0.0 {
        return whole;
    }
    let fixed = format!("{rounded:.2}");
    let decimals = fixed.rsplit('.').next().unwrap_or_default().trim_end_matches('0');
    format!("{whole}.{decimals}")
}

pub fn format_country(c: &Country) -> String {
    let or_na = |s: String| if s.is_empty() { "N/A".to_string() } else { s };

    let currencies = or_na(
        c.currencies
            .values()
            .map(|cur| match &cur.symbol {
                Some(symbol) => format!("{} ({symbol})", cur.name),
                None => cur.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", "),
    );
    let languages = or_na(c.languages.values().cloned().collect::<Vec<_>>().join(", "));
    let capital = or_na(c.capital.join(", "));
    let region = match &c.subregion {
        Some(sub) => format!("{} ({sub})", c.region),
        None => c.region.clone(),
    };

    let mut text = format!(
        "🌍 **{common}**\n📜 Official Name: {official}\n\n\
         ![Flag of {common}]({flag})\n\n\
         📊 **Statistics:**\n\
         - 👥 Population: {population}\n\
         - 📏 Area: {area} km²\n\
         - 🌎 Region: {region}\n\
         - 🏛️ Capital: {capital}\n\n\
         💰 **Economic & Cultural:**\n\
         - 💵 Currencies: {currencies}\n\
         - 🗣️ Languages: {languages}\n\n\
         🕐 **Timezones:** {timezones}\n\
         🌐 **Continents:** {continents}",
        common = c.name.common,
        official = c.name.official,
        flag = c.flags.png,
        population = group_thousands(c.population),
        area = format_area(c.area),
        timezones = c.timezones.join(", "),
        continents = c.continents.join(", "),
    );
    if let Some(maps) = &c.maps {
        text.push_str(&format!("\n\n🗺️ Maps: {}", maps.google_maps));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAPAN: &str = r#"[{
        "name": {"common": "Japan", "official": "Japan"},
        "population": 125836021,
        "region": "Asia",
        "subregion": "Eastern Asia",
        "capital": ["Tokyo"],
        "languages": {"jpn": "Japanese"},
        "currencies": {"JPY": {"name": "Japanese yen", "symbol": "¥"}},
        "flags": {"png": "https://flagcdn.com/w320/jp.png", "svg": "https://flagcdn.com/jp.svg"},
        "area": 377930.0,
        "timezones": ["UTC+09:00"],
        "continents": ["Asia"],
        "maps": {"googleMaps": "https://goo.gl/maps/NGTLSCSrA8bMrvnX9"}
    }]"#;

    #[test]
    fn formats_japan() {
        let countries: Vec<Country> = serde_json::from_str(JAPAN).unwrap();
        let text = format_country(&countries[0]);
        assert!(text.starts_with("🌍 **Japan**\n📜 Official Name: Japan"));
        assert!(text.contains("- 👥 Population: 125,836,021"));
        assert!(text.contains("- 📏 Area: 377,930 km²"));
        assert!(text.contains("- 🌎 Region: Asia (Eastern Asia)"));
        assert!(text.contains("- 💵 Currencies: Japanese yen (¥)"));
        assert!(text.contains("🗺️ Maps: https://goo.gl/maps/NGTLSCSrA8bMrvnX9"));
    }

    #[test]
    fn missing_optional_fields_read_na() {
        let country: Country = serde_json::from_str(
            r#"{"name":{"common":"Antarctica","official":"Antarctica"},"population":1000,
                "region":"Antarctic","flags":{"png":"https://flag/aq.png"},"area":14000000,
                "timezones":["UTC-03:00"],"continents":["Antarctica"]}"#,
        )
        .unwrap();
        let text = format_country(&country);
        assert!(text.contains("- 🏛️ Capital: N/A"));
        assert!(text.contains("- 💵 Currencies: N/A"));
        assert!(text.contains("- 🗣️ Languages: N/A"));
        assert!(!text.contains("Maps:"));
    }

    #[test]
    fn fractional_area() {
        assert_eq!(format_area(1234.5), "1,234.5");
        assert_eq!(format_area(2.0), "2");
    }
}
