use std::fmt;

use crate::error::SqlMiddlewareDbError;

pub const ACCOUNT_ID_ENV: &str = "CLOUDFLARE_ACCOUNT_ID";
pub const API_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";
pub const DATABASE_ENV: &str = "D1_DATABASE";

/// Connection descriptor for a remote D1 database.
///
/// `database` may be the database identifier or its name; names are resolved on connect.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct D1Options {
    pub account_id: String,
    pub api_token: String,
    pub database: String,
}

impl fmt::Debug for D1Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("D1Options")
            .field("account_id", &self.account_id)
            .field("api_token", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

impl D1Options {
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        api_token: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            api_token: api_token.into(),
            database: database.into(),
        }
    }

    #[must_use]
    pub fn builder() -> D1OptionsBuilder {
        D1OptionsBuilder::default()
    }

    /// Check that every field is present.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), SqlMiddlewareDbError> {
        let required = [
            ("account id", &self.account_id),
            ("api token", &self.api_token),
            ("database", &self.database),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(SqlMiddlewareDbError::ConfigError(format!(
                "{field} is required"
            ))),
            None => Ok(()),
        }
    }

    /// Read the descriptor from `CLOUDFLARE_ACCOUNT_ID`, `CLOUDFLARE_API_TOKEN`, and
    /// `D1_DATABASE`.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::ConfigError` when a variable is unset or empty.
    pub fn from_env() -> Result<Self, SqlMiddlewareDbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SqlMiddlewareDbError> {
        let opts = Self::new(
            lookup(ACCOUNT_ID_ENV).unwrap_or_default(),
            lookup(API_TOKEN_ENV).unwrap_or_default(),
            lookup(DATABASE_ENV).unwrap_or_default(),
        );
        opts.validate()?;
        Ok(opts)
    }
}

/// Fluent builder for D1 options.
#[derive(Debug, Clone, Default)]
pub struct D1OptionsBuilder {
    opts: D1Options,
}

impl D1OptionsBuilder {
    #[must_use]
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.opts.account_id = account_id.into();
        self
    }

    #[must_use]
    pub fn api_token(mut self, api_token: impl Into<String>) -> Self {
        self.opts.api_token = api_token.into();
        self
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.opts.database = database.into();
        self
    }

    /// Return the options without validating them.
    #[must_use]
    pub fn finish(self) -> D1Options {
        self.opts
    }

    /// # Errors
    ///
    /// Same as [`D1Options::validate`].
    pub fn build(self) -> Result<D1Options, SqlMiddlewareDbError> {
        self.opts.validate()?;
        Ok(self.opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_fields_are_reported_in_order() {
        let err = D1Options::default().validate().unwrap_err();
        assert_eq!(
            err,
            SqlMiddlewareDbError::ConfigError("account id is required".into())
        );

        let err = D1Options::builder()
            .account_id("acct")
            .database("prod")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("api token"));

        let err = D1Options::new("acct", "token", "  ").validate().unwrap_err();
        assert!(err.to_string().contains("database"));
    }

    #[test]
    fn builder_produces_complete_options() {
        let opts = D1Options::builder()
            .account_id("acct")
            .api_token("token")
            .database("prod")
            .build()
            .unwrap();
        assert_eq!(opts, D1Options::new("acct", "token", "prod"));
    }

    #[test]
    fn debug_hides_token() {
        let rendered = format!("{:?}", D1Options::new("acct", "s3cret", "prod"));
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("acct"));
    }

    #[test]
    fn environment_lookup_fills_every_field() {
        let vars: HashMap<&str, &str> = [
            (ACCOUNT_ID_ENV, "acct"),
            (API_TOKEN_ENV, "token"),
            (DATABASE_ENV, "prod"),
        ]
        .into_iter()
        .collect();
        let opts = D1Options::from_lookup(|key| vars.get(key).map(|v| (*v).to_string())).unwrap();
        assert_eq!(opts.database, "prod");

        let err = D1Options::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, SqlMiddlewareDbError::ConfigError(_)));
    }
}
