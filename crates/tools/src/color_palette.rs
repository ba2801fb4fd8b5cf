//! Color palette tool — colormind API with mood fallbacks.

use async_trait::async_trait;
use serde::Deserialize;
use toolweave_core::error::ToolError;
use toolweave_core::tool::Tool;
use tracing::warn;

use crate::http::HttpClient;
use crate::parse_args;

const NAME: &str = "generateColorPalette";
const API: &str = "http://colormind.io/api/";

pub struct ColorPaletteTool {
    http: HttpClient,
}

impl ColorPaletteTool {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[derive(Deserialize)]
struct Input {
    #[serde(default)]
    mood: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaletteResponse {
    pub result: Vec<[u8; 3]>,
}

#[async_trait]
impl Tool for ColorPaletteTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Generate a beautiful color palette for design projects"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "mood": {
                    "type": "string",
                    "enum": ["warm", "cool", "pastel", "vibrant", "monochrome", "random"],
                    "description": "The mood/style of the color palette"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let input: Input = parse_args(arguments)?;
        let mood = input.mood.unwrap_or_else(|| "random".into());

        let body = serde_json::json!({ "model": "default" });
        let colors: Vec<String> = match self.http.post_json::<PaletteResponse>(NAME, API, &body).await {
            Ok(palette) => palette.result.iter().map(|rgb| to_hex(*rgb)).collect(),
            Err(e) => {
                warn!(tool = NAME, error = %e, "Color API failed, using fallback palette");
                fallback_palette(&mood).iter().map(|c| c.to_string()).collect()
            }
        };
        Ok(serde_json::Value::String(format_palette(&mood, &colors)))
    }
}

pub fn to_hex([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

pub fn fallback_palette(mood: &str) -> [&'static str; 5] {
    match mood {
        "warm" => ["#FF6B6B", "#FFA07A", "#FFD93D", "#F4A460", "#FF8C42"],
        "cool" => ["#6C5CE7", "#74B9FF", "#00B894", "#00CEC9", "#A29BFE"],
        "pastel" => ["#FFB3BA", "#FFDFBA", "#FFFFBA", "#BAFFC9", "#BAE1FF"],
        "vibrant" => ["#E94B3C", "#6F4C9B", "#00A8E8", "#00FF87", "#FFB400"],
        "monochrome" => ["#0A0A0A", "#404040", "#757575", "#BFBFBF", "#F0F0F0"],
        _ => ["#FF6B9D", "#C44569", "#FFC048", "#3F72AF", "#112D4E"],
    }
}

pub fn format_palette(mood: &str, colors: &[String]) -> String {
    let lines: Vec<String> = colors
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {c} ████", i + 1))
        .collect();
    format!(
        "🎨 **Generated Color Palette** ({mood} style):\n\n{}\n\nPerfect for your next design project! 🖌️",
        lines.join("\n")
    )
}
