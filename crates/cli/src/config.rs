use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Duration;

use epiccrm_auth::PolicySource;
use epiccrm_infra::DatabaseConfig;
use epiccrm_observability::LogFormat;

use crate::args::GlobalArgs;

/// Process configuration, assembled once from flags and environment.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub secret_key: String,
    pub database: DatabaseConfig,
    pub token_file: PathBuf,
    pub token_ttl: Duration,
    pub policy_source: PolicySource,
    pub log_format: LogFormat,
}

impl CrmConfig {
    pub fn from_args(args: &GlobalArgs) -> anyhow::Result<Self> {
        if args.secret_key.trim().is_empty() {
            bail!("SECRET_KEY cannot be empty");
        }
        if args.token_ttl_minutes <= 0 {
            bail!("token lifetime must be positive, got {} minutes", args.token_ttl_minutes);
        }

        let database = match &args.database_url {
            Some(url) if !url.trim().is_empty() => DatabaseConfig::new(url.trim()),
            _ => DatabaseConfig::from_env().context("database configuration")?,
        };

        Ok(Self {
            secret_key: args.secret_key.clone(),
            database,
            token_file: args.token_file.clone(),
            token_ttl: Duration::minutes(args.token_ttl_minutes),
            policy_source: args.policy_source,
            log_format: args.log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> GlobalArgs {
        GlobalArgs {
            secret_key: "s3cret".to_string(),
            database_url: Some("postgres://crm@db/crm".to_string()),
            token_file: PathBuf::from(".token"),
            token_ttl_minutes: 30,
            policy_source: PolicySource::Store,
            log_format: LogFormat::Json,
        }
    }

    #[test]
    fn builds_from_args() {
        let config = CrmConfig::from_args(&args()).unwrap();
        assert_eq!(config.database.url(), "postgres://crm@db/crm");
        assert_eq!(config.token_ttl, Duration::minutes(30));
        assert_eq!(config.policy_source, PolicySource::Store);
    }

    #[test]
    fn rejects_blank_secret_and_non_positive_ttl() {
        let mut blank = args();
        blank.secret_key = "  ".to_string();
        assert!(CrmConfig::from_args(&blank).is_err());

        let mut ttl = args();
        ttl.token_ttl_minutes = 0;
        assert!(CrmConfig::from_args(&ttl).is_err());
    }
}
