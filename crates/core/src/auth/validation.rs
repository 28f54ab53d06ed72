use chrono::{DateTime, Duration, Utc};
use url::Url;

use super::{AuthError, IdTokenClaims, ResponseType, Result};
use crate::config::OpenIdConfiguration;

/// Upper bound for the clock offsets in the configuration (one day).
const MAX_OFFSET_IN_SECONDS: i64 = 86_400;

/// Collect everything that makes a configuration unusable.
///
/// An empty list means the configuration is valid.
///
/// # Examples
///
/// ```
/// use oidcrp_core::auth::validate_config;
/// use oidcrp_core::config::OpenIdConfiguration;
///
/// let config = OpenIdConfiguration {
///     sts_server: "https://idp.example.com".to_string(),
///     client_id: "spa".to_string(),
///     redirect_url: "https://app.example.com".to_string(),
///     ..Default::default()
/// };
/// assert!(validate_config(&config).is_empty());
///
/// let empty = OpenIdConfiguration::default();
/// assert!(!validate_config(&empty).is_empty());
/// ```
pub fn validate_config(config: &OpenIdConfiguration) -> Vec<String> {
    let mut problems = Vec::new();

    if config.sts_server.trim().is_empty() {
        problems.push("sts_server is required".to_string());
    } else if Url::parse(&config.sts_server).is_err() {
        problems.push(format!("sts_server '{}' is not a valid URL", config.sts_server));
    }

    if config.client_id.trim().is_empty() {
        problems.push("client_id is required".to_string());
    }

    if config.redirect_url.trim().is_empty() {
        problems.push("redirect_url is required".to_string());
    } else if Url::parse(&config.redirect_url).is_err() {
        problems.push(format!(
            "redirect_url '{}' is not a valid URL",
            config.redirect_url
        ));
    }

    if config.response_type.parse::<ResponseType>().is_err() {
        problems.push(format!(
            "response_type '{}' is not supported",
            config.response_type
        ));
    }

    if config.token_refresh_in_seconds == 0 {
        problems.push("token_refresh_in_seconds must be greater than zero".to_string());
    }

    for (name, value) in [
        (
            "silent_renew_offset_in_seconds",
            config.silent_renew_offset_in_seconds,
        ),
        (
            "max_id_token_iat_offset_allowed_in_seconds",
            config.max_id_token_iat_offset_allowed_in_seconds,
        ),
    ] {
        if !(0..=MAX_OFFSET_IN_SECONDS).contains(&value) {
            problems.push(format!(
                "{name} must be between 0 and {MAX_OFFSET_IN_SECONDS}, got {value}"
            ));
        }
    }

    if config.silent_renew && !config.use_refresh_token {
        match config.silent_renew_url.as_deref() {
            None | Some("") => {
                problems.push("silent_renew requires silent_renew_url".to_string());
            }
            Some(url) if Url::parse(url).is_err() => {
                problems.push(format!("silent_renew_url '{url}' is not a valid URL"));
            }
            Some(_) => {}
        }
    }

    if config.use_refresh_token && config.response_type() != ResponseType::Code {
        problems.push("use_refresh_token requires the code flow".to_string());
    }

    problems
}

/// Check ID token claims for expiry, issue time and nonce replay.
///
/// `expected_nonce` is the nonce stored with the pending flow; refreshed
/// tokens pass `None` because providers may omit the nonce there.
///
/// # Errors
///
/// Returns `InvalidToken` describing the first failed check.
pub fn validate_id_token_claims(
    claims: &IdTokenClaims,
    expected_nonce: Option<&str>,
    config: &OpenIdConfiguration,
    now: DateTime<Utc>,
) -> Result<()> {
    if claims.sub.is_empty() {
        return Err(AuthError::MissingClaim("sub".to_string()));
    }

    if claims.exp <= now {
        return Err(AuthError::InvalidToken("token has expired".to_string()));
    }

    if !config.disable_iat_offset_validation {
        let max_offset = Duration::try_seconds(config.max_id_token_iat_offset_allowed_in_seconds)
            .ok_or_else(|| {
                AuthError::InvalidToken(format!(
                    "iat offset {}s is out of range",
                    config.max_id_token_iat_offset_allowed_in_seconds
                ))
            })?;
        if (now - claims.iat).abs() > max_offset {
            return Err(AuthError::InvalidToken(format!(
                "iat {} is outside the allowed offset of {}s",
                claims.iat.timestamp(),
                max_offset.num_seconds()
            )));
        }
    }

    if let Some(expected) = expected_nonce {
        if claims.nonce.as_deref() != Some(expected) {
            return Err(AuthError::InvalidToken("nonce mismatch".to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> OpenIdConfiguration {
        OpenIdConfiguration {
            sts_server: "https://idp.example.com".to_string(),
            client_id: "spa".to_string(),
            redirect_url: "https://app.example.com".to_string(),
            ..Default::default()
        }
    }

    fn claims(now: DateTime<Utc>) -> IdTokenClaims {
        IdTokenClaims {
            sub: "user-1".to_string(),
            exp: now + Duration::hours(1),
            iat: now,
            nonce: Some("nonce-1".to_string()),
            extra: Default::default(),
        }
    }

    // ==================== validate_config tests ====================

    #[test]
    fn accepts_minimal_config() {
        assert!(validate_config(&valid_config()).is_empty());
    }

    #[test]
    fn rejects_missing_sts_server() {
        let config = OpenIdConfiguration {
            sts_server: String::new(),
            ..valid_config()
        };
        assert_eq!(validate_config(&config), vec!["sts_server is required"]);
    }

    #[test]
    fn rejects_relative_sts_server() {
        let config = OpenIdConfiguration {
            sts_server: "idp.example.com".to_string(),
            ..valid_config()
        };
        assert_eq!(validate_config(&config).len(), 1);
    }

    #[test]
    fn rejects_missing_client_id() {
        let config = OpenIdConfiguration {
            client_id: "  ".to_string(),
            ..valid_config()
        };
        assert_eq!(validate_config(&config), vec!["client_id is required"]);
    }

    #[test]
    fn rejects_unsupported_response_type() {
        let config = OpenIdConfiguration {
            response_type: "token".to_string(),
            ..valid_config()
        };
        assert_eq!(validate_config(&config).len(), 1);
    }

    #[test]
    fn rejects_zero_refresh_interval() {
        let config = OpenIdConfiguration {
            token_refresh_in_seconds: 0,
            ..valid_config()
        };
        assert_eq!(validate_config(&config).len(), 1);
    }

    #[test]
    fn silent_renew_requires_renew_url() {
        let config = OpenIdConfiguration {
            silent_renew: true,
            ..valid_config()
        };
        assert_eq!(
            validate_config(&config),
            vec!["silent_renew requires silent_renew_url"]
        );

        let config = OpenIdConfiguration {
            silent_renew: true,
            silent_renew_url: Some("https://app.example.com/silent-renew.html".to_string()),
            ..valid_config()
        };
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn silent_renew_url_not_needed_with_refresh_tokens() {
        let config = OpenIdConfiguration {
            silent_renew: true,
            use_refresh_token: true,
            ..valid_config()
        };
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn refresh_tokens_require_code_flow() {
        let config = OpenIdConfiguration {
            use_refresh_token: true,
            response_type: "id_token token".to_string(),
            ..valid_config()
        };
        assert_eq!(
            validate_config(&config),
            vec!["use_refresh_token requires the code flow"]
        );
    }

    #[test]
    fn rejects_out_of_range_offsets() {
        let config = OpenIdConfiguration {
            silent_renew_offset_in_seconds: i64::MAX,
            max_id_token_iat_offset_allowed_in_seconds: -1,
            ..valid_config()
        };
        let problems = validate_config(&config);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].starts_with("silent_renew_offset_in_seconds"));
        assert!(problems[1].starts_with("max_id_token_iat_offset_allowed_in_seconds"));

        let config = OpenIdConfiguration {
            silent_renew_offset_in_seconds: MAX_OFFSET_IN_SECONDS,
            ..valid_config()
        };
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn reports_every_problem() {
        assert_eq!(validate_config(&OpenIdConfiguration::default()).len(), 3);
    }

    // ==================== validate_id_token_claims tests ====================

    #[test]
    fn accepts_fresh_claims_with_matching_nonce() {
        let now = Utc::now();
        let result = validate_id_token_claims(&claims(now), Some("nonce-1"), &valid_config(), now);
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_expired_claims() {
        let now = Utc::now();
        let mut claims = claims(now);
        claims.exp = now - Duration::seconds(1);
        assert!(matches!(
            validate_id_token_claims(&claims, None, &valid_config(), now),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn rejects_old_iat() {
        let now = Utc::now();
        let mut claims = claims(now);
        claims.iat = now - Duration::seconds(121);
        assert!(validate_id_token_claims(&claims, None, &valid_config(), now).is_err());
    }

    #[test]
    fn old_iat_allowed_when_validation_disabled() {
        let now = Utc::now();
        let mut claims = claims(now);
        claims.iat = now - Duration::hours(2);
        let config = OpenIdConfiguration {
            disable_iat_offset_validation: true,
            ..valid_config()
        };
        assert!(validate_id_token_claims(&claims, None, &config, now).is_ok());
    }

    #[test]
    fn unusable_iat_offset_is_an_error() {
        let now = Utc::now();
        let config = OpenIdConfiguration {
            max_id_token_iat_offset_allowed_in_seconds: i64::MAX,
            ..valid_config()
        };
        assert!(matches!(
            validate_id_token_claims(&claims(now), None, &config, now),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn rejects_nonce_mismatch() {
        let now = Utc::now();
        assert!(matches!(
            validate_id_token_claims(&claims(now), Some("other"), &valid_config(), now),
            Err(AuthError::InvalidToken(msg)) if msg == "nonce mismatch"
        ));
    }

    #[test]
    fn rejects_missing_subject() {
        let now = Utc::now();
        let mut claims = claims(now);
        claims.sub = String::new();
        assert!(matches!(
            validate_id_token_claims(&claims, None, &valid_config(), now),
            Err(AuthError::MissingClaim(_))
        ));
    }
}
