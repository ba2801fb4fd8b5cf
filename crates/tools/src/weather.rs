//! Weather tool — Open-Meteo geocoding followed by the current forecast.

use async_trait::async_trait;
use serde::Deserialize;
use toolweave_core::error::ToolError;
use toolweave_core::tool::Tool;

use crate::http::HttpClient;
use crate::parse_args;

const NAME: &str = "getWeatherInformation";

pub struct WeatherTool {
    http: HttpClient,
}

impl WeatherTool {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[derive(Deserialize)]
struct Input {
    city: String,
}

#[derive(Debug, Deserialize)]
pub struct GeoResponse {
    #[serde(default)]
    pub results: Option<Vec<GeoLocation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    #[serde(default)]
    pub admin1: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub current: CurrentWeather,
}

#[derive(Debug, Deserialize)]
pub struct CurrentWeather {
    pub temperature_2m: f64,
    pub relative_humidity_2m: f64,
    pub apparent_temperature: f64,
    pub precipitation: f64,
    pub weather_code: u32,
    pub wind_speed_10m: f64,
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get current weather information for any city in the world"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The city name to get weather for"
                }
            },
            "required": ["city"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let Input { city } = parse_args(arguments)?;

        let geo_url = reqwest::Url::parse_with_params(
            "https://geocoding-api.open-meteo.com/v1/search",
            &[("name", city.as_str()), ("count", "1"), ("language", "en"), ("format", "json")],
        )
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let geo: GeoResponse = self.http.get_json(NAME, geo_url.as_str()).await?;

        let Some(location) = geo.results.and_then(|r| r.into_iter().next()) else {
            return Ok(serde_json::Value::String(format!(
                "❌ Unable to find location: {city}. Please try a different city name."
            )));
        };

        let forecast_url = format!(
            "https://api.open-meteo.com/v1/forecast?latitude={}&longitude={}\
             &current=temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,weather_code,wind_speed_10m\
             &temperature_unit=fahrenheit&wind_speed_unit=mph&timezone=auto",
            location.latitude, location.longitude
        );
        let forecast: ForecastResponse = self.http.get_json(NAME, &forecast_url).await?;

        Ok(serde_json::Value::String(format_weather(&location, &forecast.current)))
    }
}

/// WMO weather interpretation code → label.
pub fn describe_weather_code(code: u32) -> &'static str {
    match code {
        0 => "☀️ Clear sky",
        1 => "🌤️ Mainly clear",
        2 => "⛅ Partly cloudy",
        3 => "☁️ Overcast",
        45 => "🌫️ Foggy",
        48 => "🌫️ Depositing rime fog",
        51 => "🌧️ Light drizzle",
        53 => "🌧️ Moderate drizzle",
        55 => "🌧️ Dense drizzle",
        61 => "🌧️ Slight rain",
        63 => "🌧️ Moderate rain",
        65 => "🌧️ Heavy rain",
        71 => "❄️ Slight snow",
        73 => "❄️ Moderate snow",
        75 => "❄️ Heavy snow",
        77 => "❄️ Snow grains",
        80 => "🌦️ Slight rain showers",
        81 => "🌦️ Moderate rain showers",
        82 => "⛈️ Violent rain showers",
        85 => "🌨️ Slight snow showers",
        86 => "🌨️ Heavy snow showers",
        95 => "⛈️ Thunderstorm",
        96 => "⛈️ Thunderstorm with slight hail",
        99 => "⛈️ Thunderstorm with heavy hail",
        _ => "Unknown conditions",
    }
}

pub fn format_weather(location: &GeoLocation, current: &CurrentWeather) -> String {
    let place = match &location.admin1 {
        Some(region) => format!("{}, {}, {}", location.name, region, location.country),
        None => format!("{}, {}", location.name, location.country),
    };

    format!(
        "🌍 Weather in **{place}**:\n\
         - {}\n\
         - 🌡️ Temperature: {}°F (feels like {}°F)\n\
         - 💧 Humidity: {}%\n\
         - 💨 Wind Speed: {} mph\n\
         - 🌧️ Precipitation: {} mm",
        describe_weather_code(current.weather_code),
        current.temperature_2m,
        current.apparent_temperature,
        current.relative_humidity_2m,
        current.wind_speed_10m,
        current.precipitation,
    )
}
