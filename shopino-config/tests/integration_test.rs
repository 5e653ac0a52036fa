//! Integration tests for shopino-config

use shopino_config::*;
use std::io::Write;

#[test]
fn test_env_loader_process_environment() {
    let loader = EnvLoader::new(None);

    unsafe {
        std::env::set_var("SHOPINO_CONFIG_IT_VAR", "integration_value");
    }

    let result = loader.load_var("SHOPINO_CONFIG_IT_VAR");
    assert_eq!(result.unwrap(), "integration_value");

    unsafe {
        std::env::remove_var("SHOPINO_CONFIG_IT_VAR");
    }
}

#[test]
fn test_default_loader_uses_prefix() {
    let loader = env_loader();
    assert_eq!(loader.full_key("private_key_path"), "SHOPINO_PRIVATE_KEY_PATH");
}

#[test]
fn test_load_dotenv_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "SHOPINO_DOTENV_IT_SECRET=from-dotenv").unwrap();

    load_dotenv(Some(file.path().to_str().unwrap())).unwrap();
    assert_eq!(
        env_loader().load_var("dotenv_it_secret").unwrap(),
        "from-dotenv"
    );

    unsafe {
        std::env::remove_var("SHOPINO_DOTENV_IT_SECRET");
    }
}

#[test]
fn test_load_dotenv_missing_path_fails() {
    let result = load_dotenv(Some("/definitely/not/here/.env"));
    assert!(matches!(result, Err(ConfigError::LoadError(_))));
}

#[test]
fn test_validate_trait() {
    struct Settings {
        url: String,
    }

    impl Validate for Settings {
        fn validate(&self) -> Result<()> {
            ConfigValidator::is_url(&self.url, "url")
        }
    }

    assert!(Settings { url: "https://shop.example.com".into() }.validate().is_ok());
    assert!(Settings { url: "shop.example.com".into() }.validate().is_err());
}
