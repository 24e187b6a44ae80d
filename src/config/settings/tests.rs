use super::*;
use tempfile::TempDir;

fn test_embedding_config() -> EmbeddingConfig {
    EmbeddingConfig {
        provider: EmbeddingBackend::Ollama,
        protocol: "http".to_string(),
        host: "localhost".to_string(),
        port: 11434,
        model: "test-model".to_string(),
        batch_size: 32,
        embedding_dimension: 384,
    }
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.embedding.provider, EmbeddingBackend::Hash);
    assert_eq!(config.embedding.protocol, "http");
    assert_eq!(config.embedding.host, "localhost");
    assert_eq!(config.embedding.port, 11434);
    assert_eq!(config.embedding.model, "all-minilm:latest");
    assert_eq!(config.embedding.batch_size, 32);
    assert_eq!(config.embedding.embedding_dimension, 384);
    assert_eq!(config.matching.top_k, 5);
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.embedding.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.embedding_dimension = 16;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.matching.top_k = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let mut parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    parsed_config.base_dir = config.base_dir.clone();
    assert_eq!(config, parsed_config);
}

#[test]
fn provider_serializes_lowercase() {
    let toml_str = r#"
        [embedding]
        provider = "ollama"
    "#;
    let config: Config = toml::from_str(toml_str).expect("should parse toml correctly");
    assert_eq!(config.embedding.provider, EmbeddingBackend::Ollama);
    assert_eq!(config.embedding.model, "all-minilm:latest");
    assert_eq!(config.matching.top_k, 5);

    let bad = r#"
        [embedding]
        provider = "word2vec"
    "#;
    assert!(toml::from_str::<Config>(bad).is_err());
}

#[test]
fn setter_validation() {
    let mut config = test_embedding_config();

    assert!(config.set_protocol("https".to_string()).is_ok());
    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_model("new-model".to_string()).is_ok());
    assert!(config.set_batch_size(128).is_ok());
    assert!(config.set_embedding_dimension(768).is_ok());

    assert!(config.set_protocol("ftp".to_string()).is_err());
    assert!(config.set_port(0).is_err());
    assert!(config.set_model(String::new()).is_err());
    assert!(config.set_batch_size(0).is_err());
    assert!(config.set_batch_size(1001).is_err());
    assert!(config.set_embedding_dimension(8).is_err());
    assert!(config.set_host(String::new()).is_err());
}

#[test]
fn top_k_setter() {
    let mut matching = MatchingConfig::default();
    assert!(matching.set_top_k(10).is_ok());
    assert_eq!(matching.top_k, 10);
    assert!(matching.set_top_k(0).is_err());
    assert!(matching.set_top_k(1001).is_err());
    assert_eq!(matching.top_k, 10);
}

#[test]
fn load_missing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("should load default config");

    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.embedding, EmbeddingConfig::default());
    assert_eq!(config.matching, MatchingConfig::default());
}

#[test]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::load(temp_dir.path()).expect("should load default config");
    config.embedding = test_embedding_config();
    config.matching.top_k = 3;

    config.save().expect("should save config");
    assert!(config.config_file_path().exists());

    let reloaded = Config::load(temp_dir.path()).expect("should reload config");
    assert_eq!(reloaded, config);
}

#[test]
fn load_rejects_invalid_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[matching]\ntop_k = 0\n",
    )
    .expect("should write config file");

    assert!(Config::load(temp_dir.path()).is_err());
}
