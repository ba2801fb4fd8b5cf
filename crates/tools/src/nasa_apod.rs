//! NASA Astronomy Picture of the Day.

use async_trait::async_trait;
use serde::Deserialize;
use toolweave_core::error::ToolError;
use toolweave_core::tool::Tool;

use crate::http::HttpClient;
use crate::parse_args;

const NAME: &str = "getNasaAPOD";

pub struct NasaApodTool {
    http: HttpClient,
    api_key: String,
}

impl NasaApodTool {
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }
}

#[derive(Deserialize)]
struct Input {
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Apod {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub hdurl: Option<String>,
    pub explanation: String,
    pub date: String,
    pub media_type: String,
    #[serde(default)]
    pub copyright: Option<String>,
}

#[async_trait]
impl Tool for NasaApodTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get NASA's Astronomy Picture of the Day - a daily space photo with scientific explanation"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "date": {
                    "type": "string",
                    "description": "Optional date in YYYY-MM-DD format. If not provided, returns today's picture"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let input: Input = parse_args(arguments)?;

        let mut params = vec![("api_key", self.api_key.as_str())];
        if let Some(date) = input.date.as_deref() {
            chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| ToolError::InvalidArguments(format!("date must be YYYY-MM-DD, got {date:?}")))?;
            params.push(("date", date));
        }

        let url = reqwest::Url::parse_with_params("https://api.nasa.gov/planetary/apod", &params)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let apod: Apod = self.http.get_json(NAME, url.as_str()).await?;

        Ok(serde_json::Value::String(format_apod(&apod)))
    }
}

pub fn format_apod(apod: &Apod) -> String {
    if apod.media_type != "image" {
        return format!(
            "🎥 **{}**\n📅 Date: {}\n\nThis is a video! Watch it here: {}\n\n📝 {}",
            apod.title, apod.date, apod.url, apod.explanation
        );
    }

    let image = apod.hdurl.as_deref().unwrap_or(&apod.url);
    let mut text = format!(
        "🌌 **NASA Astronomy Picture of the Day**\n\n📸 **{}**\n📅 Date: {}\n\n![{}]({image})\n\n📝 **Explanation:**\n{}",
        apod.title, apod.date, apod.title, apod.explanation
    );
    if let Some(copyright) = &apod.copyright {
        text.push_str(&format!("\n\n📷 Copyright: {}", copyright.trim()));
    }
    text
}
