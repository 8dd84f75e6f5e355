//! Runtime configuration shared by the binary and tests.
//!
//! Values layer in precedence order: built-in defaults, then a `.lmsd.toml`
//! dotfile, then `LMSD_*` environment variables. CLI flags override on top
//! in the binary. Everything here is an external collaborator (database
//! URL, storage directories, NM credentials); the core operations only see
//! the resulting values.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::nm::{DEFAULT_TIMEOUT_SECS, NmClientConfig};

/// Runtime configuration for the lmsd binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection string or path.
    pub database: String,
    /// Directory where rendered certificates are written.
    pub certificates_dir: String,
    /// Public base URL used for NM deep links.
    pub portal_base_url: String,
    /// NM platform base URL; publish is unavailable without it.
    pub nm_base_url: Option<String>,
    /// Shared-secret bearer token for NM calls.
    pub nm_token: Option<String>,
    /// Bound on outbound NM calls, in seconds.
    pub nm_timeout_secs: u64,
    /// Compatibility exception: disable TLS verification for the NM client.
    pub nm_legacy_tls_compat: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: "lmsd.db".to_owned(),
            certificates_dir: "uploads/certificates".to_owned(),
            portal_base_url: "http://localhost:3000".to_owned(),
            nm_base_url: None,
            nm_token: None,
            nm_timeout_secs: DEFAULT_TIMEOUT_SECS,
            nm_legacy_tls_compat: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, dotfile, and environment.
    ///
    /// # Errors
    /// Returns any extraction error from the layered providers.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(".lmsd.toml"))
            .merge(Env::prefixed("LMSD_"))
    }

    /// NM transport configuration, when both URL and token are present.
    pub fn nm_client_config(&self) -> Option<NmClientConfig> {
        Some(NmClientConfig {
            base_url: self.nm_base_url.clone()?,
            token: self.nm_token.clone()?,
            timeout_secs: self.nm_timeout_secs,
            legacy_tls_compat: self.nm_legacy_tls_compat,
        })
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn defaults_apply_without_sources() {
        Jail::expect_with(|_j| {
            let cfg = AppConfig::load().expect("load");
            assert_eq!(cfg.database, "lmsd.db");
            assert_eq!(cfg.nm_timeout_secs, DEFAULT_TIMEOUT_SECS);
            assert!(!cfg.nm_legacy_tls_compat);
            assert!(cfg.nm_client_config().is_none());
            Ok(())
        });
    }

    #[rstest]
    fn env_overrides_defaults() {
        Jail::expect_with(|j| {
            j.set_env("LMSD_DATABASE", "env.db");
            j.set_env("LMSD_NM_TIMEOUT_SECS", "5");
            let cfg = AppConfig::load().expect("load");
            assert_eq!(cfg.database, "env.db");
            assert_eq!(cfg.nm_timeout_secs, 5);
            Ok(())
        });
    }

    #[rstest]
    fn env_overrides_dotfile() {
        Jail::expect_with(|j| {
            j.create_file(".lmsd.toml", "database = \"file.db\"\nnm_token = \"t1\"")?;
            j.set_env("LMSD_DATABASE", "env.db");
            let cfg = AppConfig::load().expect("load");
            assert_eq!(cfg.database, "env.db");
            assert_eq!(cfg.nm_token.as_deref(), Some("t1"));
            Ok(())
        });
    }

    #[rstest]
    fn nm_client_config_requires_url_and_token() {
        Jail::expect_with(|j| {
            j.set_env("LMSD_NM_BASE_URL", "https://nm.example.gov");
            let partial = AppConfig::load().expect("load");
            assert!(partial.nm_client_config().is_none());

            j.set_env("LMSD_NM_TOKEN", "secret");
            let full = AppConfig::load().expect("load");
            let nm = full.nm_client_config().expect("nm config");
            assert_eq!(nm.base_url, "https://nm.example.gov");
            assert!(!nm.legacy_tls_compat);
            Ok(())
        });
    }
}
