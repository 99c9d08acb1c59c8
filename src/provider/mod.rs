mod catalog;
mod client;
mod config;

pub use catalog::{
    list_available_models, render_model_report, ListModelsResponse, ModelCatalog,
    ModelLifecycle, ModelSummary,
};
pub use client::{
    load_model, probe_model, BedrockChatModel, BedrockClient, ChatModel, InvocationError,
    MockChatModel, Prompt,
};
pub use config::ProviderConfig;
