//! API credentials for the root account
//!
//! Credentials live in a small CSV file: a header row followed by one data
//! row holding, in order, the account handle, consumer key, consumer secret,
//! access token and access token secret.
//!
//! ```text
//! handle,consumer_key,consumer_secret,access_token,access_token_secret
//! cadence_demo,xvz1evFS4wEEPTGEFPHBog,L8qq9PZyRg6ieKGEKhZolGC0vJWLw8iEJ88DRdyOg,...
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::table::parse_csv_records;

const FIELDS: [&str; 5] = [
    "account_handle",
    "consumer_key",
    "consumer_secret",
    "access_token",
    "access_token_secret",
];

/// Handle and consumer keys for the account whose followers are analysed
///
/// App-only auth needs just the consumer pair. The access token pair must
/// be present in the file but is not retained. Secrets are zeroed on drop
/// and redacted from `Debug` output.
#[derive(Debug)]
pub struct Credentials {
    pub account_handle: String,
    consumer_key: SecretString,
    consumer_secret: SecretString,
}

impl Credentials {
    pub fn new(
        account_handle: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
    ) -> Self {
        Self {
            account_handle: account_handle.into(),
            consumer_key: SecretString::from(consumer_key.into()),
            consumer_secret: SecretString::from(consumer_secret.into()),
        }
    }

    /// Load credentials from a CSV file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the file if it cannot be read and
    /// `ConfigError::MissingField` if the data row is absent or any field is
    /// empty.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Invalid {
            field: "account.credentials_file".to_string(),
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let records = parse_csv_records(content).map_err(|e| ConfigError::Invalid {
            field: "credentials".to_string(),
            reason: e.to_string(),
        })?;

        let row = records
            .into_iter()
            .skip(1)
            .find(|r| r.iter().any(|f| !f.trim().is_empty()))
            .ok_or_else(|| ConfigError::MissingField("credentials row".to_string()))?;

        let mut values: Vec<String> = row.iter().map(|v| v.trim().to_string()).collect();
        values.resize(FIELDS.len(), String::new());
        if let Some(index) = values.iter().position(String::is_empty) {
            return Err(ConfigError::MissingField(FIELDS[index].to_string()).into());
        }

        let [account_handle, consumer_key, consumer_secret, _access_token, _access_token_secret]: [String; 5] =
            values
                .try_into()
                .map_err(|_| ConfigError::MissingField("credentials row".to_string()))?;
        Ok(Self::new(account_handle, consumer_key, consumer_secret))
    }

    pub fn consumer_key(&self) -> &str {
        self.consumer_key.expose_secret()
    }

    pub fn consumer_secret(&self) -> &str {
        self.consumer_secret.expose_secret()
    }
}
