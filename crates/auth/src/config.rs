use oidcrp_core::auth::{validate_config, ConfigurationGate};
use oidcrp_core::config::OpenIdConfiguration;
use tracing::warn;

/// Holds the active configuration and whether it is usable.
///
/// Validation runs once at construction; the configuration is immutable
/// afterwards, so `has_valid_config` is a plain field read.
#[derive(Debug, Clone)]
pub struct ConfigurationProvider {
    config: OpenIdConfiguration,
    present: bool,
    problems: Vec<String>,
}

impl ConfigurationProvider {
    pub fn new(config: Option<OpenIdConfiguration>) -> Self {
        match config {
            Some(config) => {
                let problems = validate_config(&config);
                for problem in &problems {
                    warn!("Invalid OIDC configuration: {}", problem);
                }
                Self {
                    config,
                    present: true,
                    problems,
                }
            }
            None => {
                warn!("No OIDC configuration provided");
                Self {
                    config: OpenIdConfiguration::default(),
                    present: false,
                    problems: vec!["no configuration provided".to_string()],
                }
            }
        }
    }

    /// The active configuration. Defaults when none was provided.
    pub fn openid_configuration(&self) -> &OpenIdConfiguration {
        &self.config
    }

    /// Why the configuration is unusable. Empty when valid.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }
}

impl ConfigurationGate for ConfigurationProvider {
    fn has_valid_config(&self) -> bool {
        self.present && self.problems.is_empty()
    }

    fn token_refresh_in_seconds(&self) -> u64 {
        self.config.token_refresh_in_seconds
    }
}
