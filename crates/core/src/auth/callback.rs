//! Pure helpers for recognising and parsing provider callbacks.

use std::collections::HashMap;

use url::Url;

use super::{AuthError, CallbackParams, ResponseType, Result};

/// Query keys that mark a code-flow callback.
const CODE_FLOW_MARKERS: &[&str] = &["code", "error"];

/// Fragment keys that mark an implicit-flow callback.
const IMPLICIT_FLOW_MARKERS: &[&str] = &["id_token", "access_token", "error"];

/// Check whether `current` is a callback for the configured redirect settings.
///
/// When a redirect URL is configured, the current URL must share its origin
/// and path. Callback markers are read from the query for the code flow and
/// from the fragment for the implicit flow.
///
/// # Examples
///
/// ```
/// use oidcrp_core::auth::{is_callback_url, ResponseType};
/// use url::Url;
///
/// let redirect = Url::parse("https://app.example.com/callback").unwrap();
/// let current = Url::parse("https://app.example.com/callback?code=abc&state=xyz").unwrap();
/// assert!(is_callback_url(&current, Some(&redirect), ResponseType::Code));
///
/// let home = Url::parse("https://app.example.com/callback").unwrap();
/// assert!(!is_callback_url(&home, Some(&redirect), ResponseType::Code));
/// ```
pub fn is_callback_url(current: &Url, redirect: Option<&Url>, response_type: ResponseType) -> bool {
    if let Some(redirect) = redirect {
        if current.origin() != redirect.origin() || current.path() != redirect.path() {
            return false;
        }
    }

    let params = callback_params(current, response_type);
    let markers = match response_type {
        ResponseType::Code => CODE_FLOW_MARKERS,
        ResponseType::IdTokenToken => IMPLICIT_FLOW_MARKERS,
    };

    markers.iter().any(|marker| params.contains_key(*marker))
}

/// Parse a callback URL into its parameters.
///
/// # Errors
///
/// Returns `MissingParameter` when a required parameter is absent.
pub fn parse_callback(current: &Url, response_type: ResponseType) -> Result<CallbackParams> {
    let mut params = callback_params(current, response_type);

    if let Some(error) = params.remove("error") {
        return Ok(CallbackParams::Error {
            error,
            description: params.remove("error_description"),
            state: params.remove("state"),
        });
    }

    let state = required(&mut params, "state")?;
    let session_state = params.remove("session_state");

    match response_type {
        ResponseType::Code => Ok(CallbackParams::Code {
            code: required(&mut params, "code")?,
            state,
            session_state,
        }),
        ResponseType::IdTokenToken => Ok(CallbackParams::Implicit {
            access_token: required(&mut params, "access_token")?,
            id_token: required(&mut params, "id_token")?,
            expires_in: params
                .remove("expires_in")
                .map(|v| {
                    v.parse().map_err(|_| {
                        AuthError::InvalidToken(format!("expires_in '{v}' is not a number"))
                    })
                })
                .transpose()?,
            state,
            session_state,
        }),
    }
}

/// The non-empty `state` a callback URL carries, if any.
pub fn callback_state(current: &Url, response_type: ResponseType) -> Option<String> {
    callback_params(current, response_type)
        .remove("state")
        .filter(|state| !state.is_empty())
}

fn callback_params(url: &Url, response_type: ResponseType) -> HashMap<String, String> {
    match response_type {
        ResponseType::Code => url.query_pairs().into_owned().collect(),
        ResponseType::IdTokenToken => url
            .fragment()
            .map(|fragment| {
                url::form_urlencoded::parse(fragment.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn required(params: &mut HashMap<String, String>, key: &str) -> Result<String> {
    params
        .remove(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::MissingParameter(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    // ==================== is_callback_url tests ====================

    #[test]
    fn detects_code_in_query() {
        let current = url("http://localhost:4200/?code=abc&state=xyz");
        assert!(is_callback_url(&current, None, ResponseType::Code));
    }

    #[test]
    fn detects_error_in_query() {
        let current = url("http://localhost:4200/?error=access_denied&state=xyz");
        assert!(is_callback_url(&current, None, ResponseType::Code));
    }

    #[test]
    fn ignores_plain_navigation() {
        let current = url("http://localhost:4200/dashboard?tab=1");
        assert!(!is_callback_url(&current, None, ResponseType::Code));
    }

    #[test]
    fn code_flow_ignores_fragment_tokens() {
        let current = url("http://localhost:4200/#id_token=a&access_token=b");
        assert!(!is_callback_url(&current, None, ResponseType::Code));
    }

    #[test]
    fn implicit_flow_detects_fragment_tokens() {
        let current = url("http://localhost:4200/#id_token=a&access_token=b&state=s");
        assert!(is_callback_url(&current, None, ResponseType::IdTokenToken));
    }

    #[test]
    fn implicit_flow_ignores_query_code() {
        let current = url("http://localhost:4200/?code=abc");
        assert!(!is_callback_url(&current, None, ResponseType::IdTokenToken));
    }

    #[test]
    fn rejects_other_path_than_redirect() {
        let redirect = url("http://localhost:4200/callback");
        let current = url("http://localhost:4200/other?code=abc");
        assert!(!is_callback_url(&current, Some(&redirect), ResponseType::Code));
    }

    #[test]
    fn rejects_other_origin_than_redirect() {
        let redirect = url("http://localhost:4200/callback");
        let current = url("http://evil.example.com/callback?code=abc");
        assert!(!is_callback_url(&current, Some(&redirect), ResponseType::Code));
    }

    // ==================== parse_callback tests ====================

    #[test]
    fn parses_code_callback() {
        let current = url("http://localhost:4200/?code=abc&state=xyz&session_state=s1");
        assert_eq!(
            parse_callback(&current, ResponseType::Code).unwrap(),
            CallbackParams::Code {
                code: "abc".to_string(),
                state: "xyz".to_string(),
                session_state: Some("s1".to_string()),
            }
        );
    }

    #[test]
    fn parses_url_encoded_code() {
        let current = url("http://localhost:4200/?code=abc%2B123&state=xyz%3D789");
        match parse_callback(&current, ResponseType::Code).unwrap() {
            CallbackParams::Code { code, state, .. } => {
                assert_eq!(code, "abc+123");
                assert_eq!(state, "xyz=789");
            }
            other => panic!("unexpected params: {other:?}"),
        }
    }

    #[test]
    fn code_callback_without_state_is_rejected() {
        let current = url("http://localhost:4200/?code=abc");
        assert!(matches!(
            parse_callback(&current, ResponseType::Code),
            Err(AuthError::MissingParameter(p)) if p == "state"
        ));
    }

    #[test]
    fn empty_code_is_rejected() {
        let current = url("http://localhost:4200/?code=&state=xyz");
        assert!(matches!(
            parse_callback(&current, ResponseType::Code),
            Err(AuthError::MissingParameter(p)) if p == "code"
        ));
    }

    #[test]
    fn parses_error_callback() {
        let current =
            url("http://localhost:4200/?error=login_required&error_description=Login%20required&state=xyz");
        assert_eq!(
            parse_callback(&current, ResponseType::Code).unwrap(),
            CallbackParams::Error {
                error: "login_required".to_string(),
                description: Some("Login required".to_string()),
                state: Some("xyz".to_string()),
            }
        );
    }

    #[test]
    fn parses_implicit_callback() {
        let current =
            url("http://localhost:4200/#access_token=at&id_token=it&expires_in=3600&state=xyz");
        assert_eq!(
            parse_callback(&current, ResponseType::IdTokenToken).unwrap(),
            CallbackParams::Implicit {
                access_token: "at".to_string(),
                id_token: "it".to_string(),
                expires_in: Some(3600),
                state: "xyz".to_string(),
                session_state: None,
            }
        );
    }

    #[test]
    fn implicit_callback_without_id_token_is_rejected() {
        let current = url("http://localhost:4200/#access_token=at&state=xyz");
        assert!(matches!(
            parse_callback(&current, ResponseType::IdTokenToken),
            Err(AuthError::MissingParameter(p)) if p == "id_token"
        ));
    }

    #[test]
    fn implicit_callback_with_malformed_expires_in_is_rejected() {
        let current =
            url("http://localhost:4200/#access_token=at&id_token=it&expires_in=soon&state=xyz");
        assert!(matches!(
            parse_callback(&current, ResponseType::IdTokenToken),
            Err(AuthError::InvalidToken(_))
        ));
    }

    // ==================== callback_state tests ====================

    #[test]
    fn reads_state_from_query_or_fragment() {
        let code = url("http://localhost:4200/?error=login_required&state=xyz");
        assert_eq!(callback_state(&code, ResponseType::Code).as_deref(), Some("xyz"));

        let implicit = url("http://localhost:4200/#id_token=it&state=abc");
        assert_eq!(
            callback_state(&implicit, ResponseType::IdTokenToken).as_deref(),
            Some("abc")
        );
        assert_eq!(callback_state(&implicit, ResponseType::Code), None);
        assert_eq!(
            callback_state(&url("http://localhost:4200/?code=c&state="), ResponseType::Code),
            None
        );
    }
}
