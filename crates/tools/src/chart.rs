//! Chart tool — builds a Chart.js config and a QuickChart image URL.
//!
//! Pure: no request is made, the client renders the returned image link.

use async_trait::async_trait;
use serde::Deserialize;
use toolweave_core::error::ToolError;
use toolweave_core::tool::Tool;

use crate::parse_args;

const NAME: &str = "generateChart";
const CHART_TYPES: &[&str] = &["bar", "line", "pie", "doughnut", "radar", "polarArea"];

pub struct ChartTool;

#[derive(Debug, Deserialize)]
pub struct ChartInput {
    #[serde(rename = "type")]
    pub chart_type: String,
    pub labels: Vec<String>,
    pub data: Vec<f64>,
    #[serde(default)]
    pub title: Option<String>,
}

#[async_trait]
impl Tool for ChartTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Generate a chart image (bar, line, pie, etc.) from data using QuickChart API"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "enum": CHART_TYPES,
                    "description": "Type of chart to generate"
                },
                "labels": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Labels for the data points"
                },
                "data": {
                    "type": "array",
                    "items": { "type": "number" },
                    "description": "Data values corresponding to the labels"
                },
                "title": {
                    "type": "string",
                    "description": "Chart title"
                }
            },
            "required": ["type", "labels", "data"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let input: ChartInput = parse_args(arguments)?;
        if !CHART_TYPES.contains(&input.chart_type.as_str()) {
            return Err(ToolError::InvalidArguments(format!(
                "unsupported chart type {:?}",
                input.chart_type
            )));
        }
        tracing::debug!(chart_type = %input.chart_type, points = input.data.len(), "Building chart");
        Ok(serde_json::Value::String(render_chart(&input)?))
    }
}

pub fn chart_config(input: &ChartInput) -> serde_json::Value {
    serde_json::json!({
        "type": input.chart_type,
        "data": {
            "labels": input.labels,
            "datasets": [{
                "label": input.title.as_deref().unwrap_or("Dataset"),
                "data": input.data,
            }]
        },
        "options": {
            "plugins": {
                "title": {
                    "display": input.title.is_some(),
                    "text": input.title.as_deref().unwrap_or(""),
                }
            }
        }
    })
}

pub fn chart_url(input: &ChartInput) -> Result<reqwest::Url, ToolError> {
    let config = chart_config(input).to_string();
    reqwest::Url::parse_with_params(
        "https://quickchart.io/chart",
        &[("c", config.as_str()), ("width", "600"), ("height", "400")],
    )
    .map_err(|e| ToolError::ExecutionFailed {
        tool_name: NAME.into(),
        reason: e.to_string(),
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn render_chart(input: &ChartInput) -> Result<String, ToolError> {
    let url = chart_url(input)?;
    let data: Vec<String> = input.data.iter().map(|d| d.to_string()).collect();
    let title_line = input
        .title
        .as_ref()
        .map(|t| format!("📈 Title: {t}\n"))
        .unwrap_or_default();

    Ok(format!(
        "📊 **Chart Generated Successfully!**\n\n\
         {title_line}🎨 Type: {} Chart\n\
         📝 Labels: {}\n\
         🔢 Data: {}\n\n\
         ![{}]({url})\n\n\
         💡 **Tip:** Right-click and save the image, or [click here]({url}) to open it in a new tab!",
        capitalize(&input.chart_type),
        input.labels.join(", "),
        data.join(", "),
        input.title.as_deref().unwrap_or("Chart"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sales() -> ChartInput {
        ChartInput {
            chart_type: "bar".into(),
            labels: vec!["Q1".into(), "Q2".into()],
            data: vec![10.0, 12.5],
            title: Some("Sales".into()),
        }
    }

    #[test]
    fn url_round_trips_the_config() {
        let url = chart_url(&sales()).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        let config: serde_json::Value = serde_json::from_str(&params["c"]).unwrap();
        assert_eq!(config, chart_config(&sales()));
        assert_eq!(params["width"], "600");
        assert_eq!(config["options"]["plugins"]["title"]["display"], true);
    }

    #[test]
    fn untitled_chart_uses_dataset_label() {
        let input = ChartInput {
            title: None,
            ..sales()
        };
        let config = chart_config(&input);
        assert_eq!(config["data"]["datasets"][0]["label"], "Dataset");
        assert_eq!(config["options"]["plugins"]["title"]["display"], false);
    }

    #[tokio::test]
    async fn execute_renders_markdown() {
        let out = ChartTool
            .execute(json!({"type": "polarArea", "labels": ["a", "b"], "data": [1, 2]}))
            .await
            .unwrap();
        let text = out.as_str().unwrap();
        assert!(text.contains("🎨 Type: PolarArea Chart"));
        assert!(text.contains("🔢 Data: 1, 2"));
        assert!(text.contains("![Chart](https://quickchart.io/chart?c="));
        assert!(!text.contains("Title:"));
    }

    #[tokio::test]
    async fn rejects_unknown_chart_type() {
        let err = ChartTool
            .execute(json!({"type": "scatter3d", "labels": [], "data": []}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
