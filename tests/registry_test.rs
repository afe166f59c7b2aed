//! Config loading tests against real files

use std::io::Write;

use deepfuse::config::{ModelRegistry, ProviderKind};
use deepfuse::error::GatewayError;

const CONFIG: &str = r#"
providers:
  - name: deepseek
    type: openai-compatible
    base_url: https://api.deepseek.com/v1/chat/completions
    api_key: sk-reason
  - name: claude
    type: anthropic
    base_url: https://api.anthropic.com/v1/messages
    api_key: sk-answer
base_models:
  - name: r1
    model_id: deepseek-reasoner
    provider: deepseek
    context: 64000
    max_tokens: 8192
  - name: sonnet
    model_id: claude-3-5-sonnet-20241022
    provider: claude
    context: 200000
    max_tokens: 8192
deep_models:
  - name: deepclaude
    reason_model: r1
    answer_model: sonnet
  - name: deepclaude-inline
    reason_model: r1
    answer_model: sonnet
    is_origin_reasoning: false
"#;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_a_config_file_from_disk() {
    let file = write_config(CONFIG);
    let registry = ModelRegistry::from_path(file.path()).expect("load config");

    let names: Vec<_> = registry
        .list_deep_models()
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, vec!["deepclaude", "deepclaude-inline"]);

    let resolved = registry.resolve("deepclaude").expect("resolve");
    assert_eq!(resolved.reason.kind, ProviderKind::OpenAICompatible);
    assert_eq!(resolved.answer.kind, ProviderKind::Anthropic);
    // Omitted is_origin_reasoning defaults to true.
    assert!(resolved.is_origin_reasoning);
    assert!(!registry.resolve("deepclaude-inline").expect("resolve").is_origin_reasoning);

    assert_eq!(registry.context_window("deepclaude"), Some(200000));
}

#[test]
fn missing_file_is_a_configuration_error() {
    let err = ModelRegistry::from_path(std::path::Path::new("/nonexistent/model.yaml"))
        .expect_err("missing file");
    assert!(matches!(err, GatewayError::Configuration(_)));
}

#[test]
fn empty_file_is_rejected() {
    let file = write_config("\n");
    let err = ModelRegistry::from_path(file.path()).expect_err("empty file");
    assert!(err.to_string().contains("empty"));
}

#[test]
fn syntactically_broken_yaml_is_rejected() {
    let file = write_config("providers: [scalar\n");
    let err = ModelRegistry::from_path(file.path()).expect_err("broken yaml");
    assert!(matches!(err, GatewayError::Configuration(_)));
}
