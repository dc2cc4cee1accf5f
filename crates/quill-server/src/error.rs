use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Map a dotted settings field path back to the environment variable
/// that would supply it, e.g. `provider.api_key` ->
/// `QUILL_PROVIDER__API_KEY`.
pub fn to_env_var(field: &str) -> String {
    format!("QUILL_{}", field.replace('.', "__").to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider.api_key"), "QUILL_PROVIDER__API_KEY");
        assert_eq!(to_env_var("api_key"), "QUILL_API_KEY");
    }
}
