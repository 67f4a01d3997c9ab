use std::path::PathBuf;

use foxvm_config::{ConfigError, LinkOptions, LoggingConfig, TranslatorConfig};
use pretty_assertions::assert_eq;

#[test]
fn empty_config_uses_defaults() {
    let config = TranslatorConfig::load_from_str("").unwrap();
    assert_eq!(config, TranslatorConfig::default());
    assert_eq!(config.link.root_class, "java/lang/Object");
    assert!(config.link.verify_vtables);
    assert_eq!(config.logging.level, "warn");
    assert!(config.logging.stderr);
    assert!(!config.logging.json);
}

#[test]
fn reads_every_section() {
    let config = TranslatorConfig::load_from_str(
        r#"
[classpath]
runtime = ["/jdk/rt.jar"]
application = ["/app/classes", "/app/lib.jar"]

[link]
root_class = "foxvm/Root"
verify_vtables = false

[logging]
level = "foxvm.link=debug"
json = true
stderr = false
"#,
    )
    .unwrap();

    assert_eq!(config.classpath.runtime, vec![PathBuf::from("/jdk/rt.jar")]);
    assert_eq!(
        config.classpath.application,
        vec![PathBuf::from("/app/classes"), PathBuf::from("/app/lib.jar")]
    );
    assert_eq!(
        config.link,
        LinkOptions {
            root_class: "foxvm/Root".to_string(),
            verify_vtables: false,
        }
    );
    assert_eq!(
        config.logging,
        LoggingConfig {
            level: "foxvm.link=debug".to_string(),
            json: true,
            stderr: false,
        }
    );
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let config = TranslatorConfig::load_from_str("[link]\nverify_vtables = false\n").unwrap();
    assert_eq!(config.link.root_class, "java/lang/Object");
    assert!(!config.link.verify_vtables);
    assert_eq!(config.logging, LoggingConfig::default());
}

#[test]
fn unknown_keys_are_rejected() {
    let err = TranslatorConfig::load_from_str("[classpath]\nboot = []\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err}");
    assert!(err.to_string().contains("boot"), "{err}");
}

#[test]
fn type_errors_do_not_echo_values() {
    let err = TranslatorConfig::load_from_str("[logging]\njson = \"very-secret\"\n").unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("failed to parse toml config"), "{message}");
}

#[test]
fn load_from_path_resolves_relative_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foxvm.toml");
    std::fs::write(
        &path,
        "[classpath]\nruntime = [\"rt.jar\"]\napplication = [\"/abs/classes\"]\n",
    )
    .unwrap();

    let config = TranslatorConfig::load_from_path(&path).unwrap();
    assert_eq!(config.classpath.runtime, vec![dir.path().join("rt.jar")]);
    assert_eq!(config.classpath.application, vec![PathBuf::from("/abs/classes")]);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TranslatorConfig::load_from_path(dir.path().join("absent.toml")).unwrap_err();
    match err {
        ConfigError::Io { path, .. } => assert!(path.ends_with("absent.toml"), "{path}"),
        other => panic!("unexpected error: {other}"),
    }
}
