use super::*;
use crate::CinemateError;

#[test]
fn existing_config_or_defaults() {
    let config = load_existing_config().expect("config loaded successfully");
    assert!(!config.ollama.host.is_empty());
    assert!(config.ollama.port > 0);
    assert!(!config.ollama.model.is_empty());
    assert!(config.retrieval.top_k > 0);
}

#[test]
fn unreachable_ollama_is_reported() {
    let ollama = OllamaConfig {
        host: "127.0.0.1".to_string(),
        port: 9,
        ..OllamaConfig::default()
    };

    let err = check_connection(&ollama).expect_err("nothing listens on port 9");
    assert!(matches!(err, CinemateError::ModelInitialization(_)));
}

#[test]
fn invalid_protocol_never_reaches_the_network() {
    let ollama = OllamaConfig {
        protocol: "not a scheme".to_string(),
        ..OllamaConfig::default()
    };

    let err = check_connection(&ollama).expect_err("bad url");
    assert!(matches!(
        err,
        CinemateError::Config(ConfigError::InvalidUrl(_))
    ));
}

#[test]
fn protocol_choices_match_validation() {
    for protocol in PROTOCOLS {
        let mut ollama = OllamaConfig::default();
        assert!(ollama.set_protocol(protocol.to_string()).is_ok());
    }
}
