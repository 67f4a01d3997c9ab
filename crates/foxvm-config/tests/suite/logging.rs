use foxvm_config::{init_tracing, LoggingConfig};

#[test]
fn configured_level_builds_a_filter() {
    let config = LoggingConfig {
        level: "foxvm.link=trace".to_string(),
        ..LoggingConfig::default()
    };
    let filter = config.env_filter().to_string();
    assert!(filter.contains("foxvm.link=trace"), "{filter}");
}

#[test]
fn invalid_directives_fall_back_to_a_default_filter() {
    let config = LoggingConfig {
        level: "foxvm.link=[".to_string(),
        ..LoggingConfig::default()
    };
    let _ = config.env_filter();
}

#[test]
fn init_tracing_can_be_called_twice() {
    let config = LoggingConfig {
        stderr: false,
        ..LoggingConfig::default()
    };
    init_tracing(&config);
    init_tracing(&config);
    tracing::info!(target = "foxvm.test", "still fine");
}
