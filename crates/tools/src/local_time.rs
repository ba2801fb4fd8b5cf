//! Local time tool — worldtimeapi timezone lookup.
//!
//! Upstream failures never surface as tool errors; the tool answers with the
//! current UTC time instead.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use toolweave_core::error::ToolError;
use toolweave_core::tool::Tool;
use tracing::warn;

use crate::http::HttpClient;
use crate::parse_args;

const NAME: &str = "getLocalTime";
const API: &str = "https://worldtimeapi.org/api/timezone";

pub struct LocalTimeTool {
    http: HttpClient,
}

impl LocalTimeTool {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn lookup(&self, location: &str) -> Result<String, ToolError> {
        let zones: Vec<String> = self.http.get_json(NAME, API).await?;
        let zone = match_timezone(&zones, location);
        let time: TimeResponse = self.http.get_json(NAME, &format!("{API}/{zone}")).await?;
        let at = DateTime::parse_from_rfc3339(&time.datetime).map_err(|e| {
            crate::http::failed(NAME, format!("bad datetime {:?}: {e}", time.datetime))
        })?;
        Ok(format_local_time(location, &time.timezone, at))
    }
}

#[derive(Deserialize)]
struct Input {
    location: String,
}

#[derive(Debug, Deserialize)]
pub struct TimeResponse {
    pub datetime: String,
    pub timezone: String,
}

#[async_trait]
impl Tool for LocalTimeTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get the current local time for any city, country, or timezone"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city, country, or timezone to get the time for"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let Input { location } = parse_args(arguments)?;

        let text = match self.lookup(&location).await {
            Ok(text) => text,
            Err(e) => {
                warn!(tool = NAME, error = %e, "Timezone lookup failed, answering in UTC");
                fallback_text(&location, Utc::now())
            }
        };
        Ok(serde_json::Value::String(text))
    }
}

/// Pick the IANA zone for a free-form location, `"UTC"` when nothing matches.
///
/// `"New York"` is normalized to `new_york` and matches `America/New_York`.
pub fn match_timezone(zones: &[String], location: &str) -> String {
    let wanted = location
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    if wanted.is_empty() {
        return "UTC".into();
    }

    zones
        .iter()
        .find(|zone| {
            let zone = zone.to_lowercase();
            let city = zone.split('/').nth(1).filter(|c| !c.is_empty());
            zone.contains(&wanted)
                || city.is_some_and(|c| wanted.contains(c))
                || zone.split('/').any(|part| part == wanted)
        })
        .cloned()
        .unwrap_or_else(|| "UTC".into())
}

pub fn format_local_time(location: &str, timezone: &str, at: DateTime<FixedOffset>) -> String {
    format!(
        "🕐 **{location}** ({timezone})\n⏰ Current Time: {}\n📅 Date: {}",
        at.format("%-I:%M:%S %p"),
        at.format("%A, %B %-d, %Y"),
    )
}

pub fn fallback_text(location: &str, now: DateTime<Utc>) -> String {
    format!(
        "⚠️ Unable to determine exact timezone for \"{location}\". Current UTC time is {}. \
         Please try with a more specific location or major city name.",
        now.format("%-I:%M %p")
    )
}
