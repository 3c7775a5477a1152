//! Shared helpers for provider adapters.

use bc_domain::config::AuthConfig;
use bc_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key from an [`AuthConfig`].
///
/// Precedence:
/// 1. `key` field (plaintext, warns)
/// 2. `service` + `account` via the OS keychain
/// 3. `env` field
/// 4. `{SERVICE}_{ACCOUNT}` env var, for headless hosts without a keychain
pub fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    if let Some(ref key) = auth.key {
        tracing::warn!("API key loaded from plaintext config field 'key'; prefer 'env' or keychain");
        return Ok(key.clone());
    }

    if let (Some(service), Some(account)) = (&auth.service, &auth.account) {
        match resolve_from_keychain(service, account) {
            Ok(secret) => return Ok(secret),
            Err(e) => {
                tracing::warn!(
                    service = %service,
                    account = %account,
                    error = %e,
                    "keychain lookup failed, falling through to env"
                );
            }
        }
    }

    if let Some(ref env_var) = auth.env {
        return match std::env::var(env_var) {
            Ok(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(Error::Auth(format!("{env_var} is not set"))),
        };
    }

    if let (Some(service), Some(account)) = (&auth.service, &auth.account) {
        let fallback_var = keychain_fallback_env_name(service, account);
        if let Ok(val) = std::env::var(&fallback_var) {
            tracing::info!(env_var = %fallback_var, "API key resolved from keychain fallback env var");
            return Ok(val);
        }
        return Err(Error::Auth(format!(
            "no key in keychain {service}/{account} and {fallback_var} is not set"
        )));
    }

    Err(Error::Auth(
        "no API key configured: set llm.auth.env, llm.auth.key, or llm.auth.service + account"
            .into(),
    ))
}

/// Read a secret from the OS keychain.
pub fn resolve_from_keychain(service: &str, account: &str) -> Result<String> {
    let entry = keyring::Entry::new(service, account)
        .map_err(|e| Error::Auth(format!("keyring entry creation failed: {e}")))?;
    entry
        .get_password()
        .map_err(|e| Error::Auth(format!("keyring get_password failed: {e}")))
}

/// `("birdcall", "gemini-api-key")` → `"BIRDCALL_GEMINI_API_KEY"`.
pub fn keychain_fallback_env_name(service: &str, account: &str) -> String {
    format!(
        "{}_{}",
        service.to_uppercase().replace('-', "_"),
        account.to_uppercase().replace('-', "_"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthConfig {
        AuthConfig::default()
    }

    #[test]
    fn fallback_env_name_uppercases_and_replaces_hyphens() {
        assert_eq!(
            keychain_fallback_env_name("birdcall", "gemini-api-key"),
            "BIRDCALL_GEMINI_API_KEY"
        );
        assert_eq!(keychain_fallback_env_name("BC", "KEY"), "BC_KEY");
    }

    #[test]
    fn plaintext_key_wins() {
        let cfg = AuthConfig {
            key: Some("sk-plain".into()),
            env: Some("BC_TEST_UNUSED_ENV_1".into()),
            ..auth()
        };
        assert_eq!(resolve_api_key(&cfg).unwrap(), "sk-plain");
    }

    #[test]
    fn env_var_is_read() {
        let var = "BC_TEST_PROVIDER_KEY_PRESENT";
        std::env::set_var(var, "from-env");
        let cfg = AuthConfig {
            env: Some(var.into()),
            ..auth()
        };
        assert_eq!(resolve_api_key(&cfg).unwrap(), "from-env");
        std::env::remove_var(var);
    }

    #[test]
    fn missing_env_var_names_the_variable() {
        let cfg = AuthConfig {
            env: Some("BC_TEST_PROVIDER_KEY_ABSENT".into()),
            ..auth()
        };
        let err = resolve_api_key(&cfg).unwrap_err().to_string();
        assert!(err.contains("BC_TEST_PROVIDER_KEY_ABSENT is not set"), "{err}");
    }

    #[test]
    fn blank_env_var_counts_as_missing() {
        let var = "BC_TEST_PROVIDER_KEY_BLANK";
        std::env::set_var(var, "  ");
        let cfg = AuthConfig {
            env: Some(var.into()),
            ..auth()
        };
        assert!(resolve_api_key(&cfg).is_err());
        std::env::remove_var(var);
    }

    #[test]
    fn nothing_configured_is_an_error() {
        assert!(matches!(resolve_api_key(&auth()), Err(Error::Auth(_))));
    }

    #[test]
    fn keychain_fallback_env_used_when_keychain_unavailable() {
        let var = keychain_fallback_env_name("bc-test-svc", "fallback-acct");
        std::env::set_var(&var, "from-fallback");
        let cfg = AuthConfig {
            service: Some("bc-test-svc".into()),
            account: Some("fallback-acct".into()),
            ..auth()
        };
        // Either a real keychain entry is absent (falls through) or no
        // keychain daemon exists; both land on the fallback var.
        assert_eq!(resolve_api_key(&cfg).unwrap(), "from-fallback");
        std::env::remove_var(&var);
    }
}
