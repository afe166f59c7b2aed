//! Validated model registry
//!
//! The registry is constructed whole or not at all: every validation problem
//! in the file is collected and reported in one aggregated configuration
//! error. After construction it is immutable and safe to share across
//! request tasks without synchronization.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use secrecy::SecretString;

use crate::config::model::{BaseModel, DeepModel, ModelFile, Provider, ProviderKind};
use crate::error::GatewayError;

/// Everything needed to call one upstream model.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    pub model_id: String,
    pub base_url: String,
    pub api_key: SecretString,
    pub kind: ProviderKind,
    pub use_proxy: bool,
}

/// The two upstream halves of a deep model.
#[derive(Debug, Clone)]
pub struct ResolvedDeepModel {
    pub reason: UpstreamTarget,
    pub answer: UpstreamTarget,
    pub is_origin_reasoning: bool,
}

/// Read-only index over the validated configuration.
#[derive(Debug)]
pub struct ModelRegistry {
    providers: Vec<Provider>,
    base_models: Vec<BaseModel>,
    deep_models: Vec<DeepModel>,
    provider_index: HashMap<String, usize>,
    base_index: HashMap<String, usize>,
    deep_index: HashMap<String, usize>,
    context_index: HashMap<String, u32>,
}

impl ModelRegistry {
    /// Load and validate the configuration from a YAML file.
    pub fn from_path(path: &Path) -> Result<Self, GatewayError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(raw: &str) -> Result<Self, GatewayError> {
        if raw.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "config file is empty".to_string(),
            ));
        }
        let file: ModelFile = serde_yaml::from_str(raw)
            .map_err(|e| GatewayError::Configuration(format!("invalid config: {e}")))?;
        Self::from_config(file)
    }

    /// Validate a parsed configuration and build the lookup indexes.
    pub fn from_config(file: ModelFile) -> Result<Self, GatewayError> {
        let mut problems = Vec::new();

        check_unique(
            file.providers.iter().map(|p| p.name.as_str()),
            "provider",
            &mut problems,
        );
        check_unique(
            file.base_models.iter().map(|m| m.name.as_str()),
            "base model",
            &mut problems,
        );
        check_unique(
            file.deep_models.iter().map(|m| m.name.as_str()),
            "deep model",
            &mut problems,
        );

        for provider in &file.providers {
            if !provider.base_url.starts_with("http") {
                tracing::warn!(
                    provider = %provider.name,
                    base_url = %provider.base_url,
                    "provider base_url has no http scheme"
                );
            }
        }

        let provider_names: HashSet<&str> =
            file.providers.iter().map(|p| p.name.as_str()).collect();
        for model in &file.base_models {
            if !provider_names.contains(model.provider.as_str()) {
                problems.push(format!(
                    "provider '{}' of base model '{}' not found",
                    model.provider, model.name
                ));
            }
            if model.context == 0 {
                problems.push(format!("base model '{}': context must be > 0", model.name));
            }
            if model.max_tokens == 0 {
                problems.push(format!(
                    "base model '{}': max_tokens must be > 0",
                    model.name
                ));
            }
        }

        let base_names: HashSet<&str> = file.base_models.iter().map(|m| m.name.as_str()).collect();
        for deep in &file.deep_models {
            for (label, reference) in [
                ("reason model", deep.reason_model.as_str()),
                ("answer model", deep.answer_model.as_str()),
            ] {
                if !base_names.contains(reference) {
                    problems.push(format!(
                        "{label} '{reference}' of deep model '{}' not found",
                        deep.name
                    ));
                }
            }
        }

        if !problems.is_empty() {
            return Err(GatewayError::Configuration(problems.join("; ")));
        }

        let provider_index = index_by_name(file.providers.iter().map(|p| p.name.clone()));
        let base_index = index_by_name(file.base_models.iter().map(|m| m.name.clone()));
        let deep_index = index_by_name(file.deep_models.iter().map(|m| m.name.clone()));

        let context_index = file
            .deep_models
            .iter()
            .map(|deep| {
                let window = [&deep.reason_model, &deep.answer_model]
                    .into_iter()
                    .filter_map(|name| base_index.get(name.as_str()))
                    .map(|&idx| file.base_models[idx].context)
                    .max()
                    .unwrap_or(0);
                (deep.name.clone(), window)
            })
            .collect();

        Ok(Self {
            providers: file.providers,
            base_models: file.base_models,
            deep_models: file.deep_models,
            provider_index,
            base_index,
            deep_index,
            context_index,
        })
    }

    /// Resolve a deep model into its two upstream request targets.
    pub fn resolve(&self, deep_model: &str) -> Result<ResolvedDeepModel, GatewayError> {
        let deep = self
            .deep_model(deep_model)
            .ok_or_else(|| GatewayError::UnknownModel(deep_model.to_string()))?;
        Ok(ResolvedDeepModel {
            reason: self.target_for(&deep.reason_model)?,
            answer: self.target_for(&deep.answer_model)?,
            is_origin_reasoning: deep.is_origin_reasoning,
        })
    }

    /// Look up a deep model by its user-visible name.
    pub fn deep_model(&self, name: &str) -> Option<&DeepModel> {
        self.deep_index.get(name).map(|&idx| &self.deep_models[idx])
    }

    /// All deep models, in load order.
    pub fn list_deep_models(&self) -> &[DeepModel] {
        &self.deep_models
    }

    /// Largest context window among a deep model's two component models.
    pub fn context_window(&self, deep_model: &str) -> Option<u32> {
        self.context_index.get(deep_model).copied()
    }

    fn target_for(&self, base_model: &str) -> Result<UpstreamTarget, GatewayError> {
        // References were checked at construction; a miss here means the
        // registry was built outside from_config.
        let base = self
            .base_index
            .get(base_model)
            .map(|&idx| &self.base_models[idx])
            .ok_or_else(|| GatewayError::UnknownModel(base_model.to_string()))?;
        let provider = self
            .provider_index
            .get(base.provider.as_str())
            .map(|&idx| &self.providers[idx])
            .ok_or_else(|| GatewayError::UnknownModel(base.provider.clone()))?;
        Ok(UpstreamTarget {
            model_id: base.model_id.clone(),
            base_url: provider.base_url.clone(),
            api_key: provider.api_key.clone(),
            kind: provider.kind,
            use_proxy: provider.use_proxy,
        })
    }
}

fn check_unique<'a>(
    names: impl Iterator<Item = &'a str>,
    what: &str,
    problems: &mut Vec<String>,
) {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            problems.push(format!("{what} name '{name}' is duplicated"));
        }
    }
}

fn index_by_name(names: impl Iterator<Item = String>) -> HashMap<String, usize> {
    names.enumerate().map(|(idx, name)| (name, idx)).collect()
}
