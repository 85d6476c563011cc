//! Cloud login resolved from the environment.
//!
//! The config holds only environment variable NAMES. Values are read once at
//! startup and never appear in `Debug` output or error messages.

use std::fmt;

use anyhow::{bail, Result};

use crate::CredentialsEnv;

#[derive(Clone)]
pub struct ResolvedCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
    username_var: String,
    password_var: String,
}

impl fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("username_var", &self.username_var)
            .field("username", &self.username.as_ref().map(|_| "<REDACTED>"))
            .field("password_var", &self.password_var)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl ResolvedCredentials {
    pub fn is_complete(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Both values, or an error naming the first missing variable.
    pub fn require(&self) -> Result<(String, String)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Ok((u.clone(), p.clone())),
            (None, _) => bail!("SECRET_MISSING env var {} is not set", self.username_var),
            (_, None) => bail!("SECRET_MISSING env var {} is not set", self.password_var),
        }
    }
}

/// Unset and blank variables resolve to `None`.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub fn resolve_cloud_credentials(names: &CredentialsEnv) -> ResolvedCredentials {
    ResolvedCredentials {
        username: resolve_env(&names.username),
        password: resolve_env(&names.password),
        username_var: names.username.clone(),
        password_var: names.password.clone(),
    }
}
