use anyhow::Result;
use serde::Deserialize;
use std::fmt::Write as _;
use tracing::info;

const NO_MODELS: &str = "No models found or an error occurred.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListModelsResponse {
    #[serde(default)]
    pub model_summaries: Option<Vec<ModelSummary>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSummary {
    pub model_id: String,
    pub model_name: String,
    pub provider_name: String,
    pub input_modalities: Vec<String>,
    pub output_modalities: Vec<String>,
    pub inference_types_supported: Vec<String>,
    pub model_lifecycle: Option<ModelLifecycle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelLifecycle {
    pub status: String,
}

impl ModelSummary {
    pub fn lifecycle_status(&self) -> &str {
        self.model_lifecycle
            .as_ref()
            .map(|lifecycle| lifecycle.status.as_str())
            .unwrap_or("UNKNOWN")
    }
}

/// Anything that can enumerate hosted foundation models.
pub trait ModelCatalog {
    fn list_foundation_models(&self) -> Result<ListModelsResponse>;
}

pub fn render_model_report(response: &ListModelsResponse) -> String {
    let Some(models) = response.model_summaries.as_ref() else {
        return format!("{}\n", NO_MODELS);
    };

    let mut out = String::new();
    for model in models {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "Model ID: {}", model.model_id);
        let _ = writeln!(out, "Model Name: {}", model.model_name);
        let _ = writeln!(out, "Provider: {}", model.provider_name);
        let _ = writeln!(out, "Input Modalities: {}", format_list(&model.input_modalities));
        let _ = writeln!(out, "Output Modalities: {}", format_list(&model.output_modalities));
        let _ = writeln!(
            out,
            "Inference Types Supported: {}",
            format_list(&model.inference_types_supported)
        );
        let _ = writeln!(out, "Model Lifecycle Status: {}", model.lifecycle_status());
        let _ = writeln!(out, "{}", "-".repeat(40));
    }
    out
}

/// Fetches the catalog and prints the report to stdout.
pub fn list_available_models(catalog: &impl ModelCatalog) -> Result<()> {
    let response = catalog.list_foundation_models()?;
    let count = response.model_summaries.as_ref().map_or(0, Vec::len);
    info!(models = count, "model catalog fetched");
    print!("{}", render_model_report(&response));
    Ok(())
}

fn format_list(values: &[String]) -> String {
    format!("[{}]", values.join(", "))
}
