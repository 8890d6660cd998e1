use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

// Convert a configuration path like `provider.api_key` to its environment variable
pub fn to_env_var(field_path: &str) -> String {
    format!("SCHOLAR_{}", field_path.to_uppercase().replace('.', "__"))
}
