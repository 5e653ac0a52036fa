//! Configuration loading for Shopino Gate.
//!
//! Settings come from the process environment (optionally seeded from a
//! `.env` file). Each functional crate owns its settings struct and builds it
//! with an [`EnvLoader`]; this crate only supplies the loading and validation
//! primitives.
//!
//! ```rust
//! use shopino_config::{ConfigValidator, EnvLoader};
//!
//! let loader = EnvLoader::from_vars(
//!     Some("SHOPINO".to_string()),
//!     [("SHOPINO_API_BASE_URL", "https://shop.example.com/wp-json/api/v1")],
//! );
//! let base_url = loader.load_var("api_base_url").unwrap();
//! ConfigValidator::is_url(&base_url, "api_base_url").unwrap();
//! ```

pub mod env;
pub mod error;
pub mod validation;

pub use env::{EnvLoader, load_dotenv};
pub use error::{ConfigError, Result};
pub use validation::{ConfigValidator, Validate};

/// Prefix used for every Shopino Gate variable.
pub const ENV_PREFIX: &str = "SHOPINO";

/// Loader over the process environment using [`ENV_PREFIX`].
pub fn env_loader() -> EnvLoader {
    EnvLoader::new(Some(ENV_PREFIX.to_string()))
}
