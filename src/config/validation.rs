use super::models::{Config, StorageProvider};
use crate::schema::{Schema, SchemaError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),

    #[error("Manifest shard type must not be empty")]
    EmptyShardType,

    #[error("Search {field} must be positive")]
    NonPositiveSearchLimit { field: &'static str },

    #[error("Retry max_attempts must be at least 1")]
    NoRetryAttempts,

    #[error("Retry multiplier must be at least 1")]
    InvalidRetryMultiplier,

    #[error("Storage provider is S3 but missing credentials (access_key or secret_key)")]
    MissingS3Credentials,

    #[error("Artifact prefix must not be empty")]
    EmptyArtifactPrefix,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_schema(config)?;
    validate_manifest(config)?;
    validate_search(config)?;
    validate_retry(config)?;
    validate_storage(config)?;
    validate_output(config)?;
    Ok(())
}

fn validate_schema(config: &Config) -> Result<(), ValidationError> {
    Schema::new(config.schema.columns.clone(), config.schema.usecols.clone())?;
    Ok(())
}

fn validate_manifest(config: &Config) -> Result<(), ValidationError> {
    if config.manifest.shard_type.trim().is_empty() {
        return Err(ValidationError::EmptyShardType);
    }
    Ok(())
}

fn validate_search(config: &Config) -> Result<(), ValidationError> {
    if config.search.page_size == 0 {
        return Err(ValidationError::NonPositiveSearchLimit { field: "page_size" });
    }
    if config.search.max_results == 0 {
        return Err(ValidationError::NonPositiveSearchLimit {
            field: "max_results",
        });
    }
    Ok(())
}

fn validate_retry(config: &Config) -> Result<(), ValidationError> {
    if config.retry.max_attempts == 0 {
        return Err(ValidationError::NoRetryAttempts);
    }
    if config.retry.multiplier == 0 {
        return Err(ValidationError::InvalidRetryMultiplier);
    }
    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    if config.storage.provider == StorageProvider::S3
        && (config.storage.access_key.is_none() || config.storage.secret_key.is_none())
    {
        return Err(ValidationError::MissingS3Credentials);
    }
    Ok(())
}

fn validate_output(config: &Config) -> Result<(), ValidationError> {
    if config.output.artifact_prefix.is_empty() {
        return Err(ValidationError::EmptyArtifactPrefix);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_usecols_must_be_known_columns() {
        let mut config = Config::default();
        config.schema.usecols.push("NotAColumn".to_string());

        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidSchema(SchemaError::UnknownColumn(name))) if name == "NotAColumn"
        ));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let mut config = Config::default();
        config.schema.columns.push("DATE".to_string());

        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidSchema(SchemaError::DuplicateColumn(_)))
        ));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = Config::default();
        config.search.page_size = 0;

        assert!(matches!(
            validate(&config),
            Err(ValidationError::NonPositiveSearchLimit { field: "page_size" })
        ));
    }

    #[test]
    fn test_zero_cap_rejected() {
        let mut config = Config::default();
        config.search.max_results = 0;

        assert!(matches!(
            validate(&config),
            Err(ValidationError::NonPositiveSearchLimit { field: "max_results" })
        ));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;

        assert!(matches!(validate(&config), Err(ValidationError::NoRetryAttempts)));
    }

    #[test]
    fn test_s3_requires_credentials() {
        let mut config = Config::default();
        config.storage.provider = StorageProvider::S3;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::MissingS3Credentials)
        ));

        config.storage.access_key = Some("key".to_string());
        config.storage.secret_key = Some("secret".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_shard_type_rejected() {
        let mut config = Config::default();
        config.manifest.shard_type = "  ".to_string();

        assert!(matches!(validate(&config), Err(ValidationError::EmptyShardType)));
    }
}
