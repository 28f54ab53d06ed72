//! Mock IdP server for development and testing.
//!
//! This server simulates an OpenID provider's authorization, check-session and
//! end-session endpoints, allowing full E2E testing of the relying party
//! without a real provider.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use oidcrp_core::auth::{generate_state, ResponseType};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::templates::{self, LoginPage};
use crate::providers::MockUser;

/// The user signed in at the mock provider, if any.
#[derive(Debug, Clone)]
struct IdpSession {
    email: String,
    name: Option<String>,
    session_state: String,
}

#[derive(Clone, Default)]
struct MockIdpState {
    session: Arc<RwLock<Option<IdpSession>>>,
}

#[derive(Deserialize)]
struct AuthorizeQuery {
    #[serde(default)]
    client_id: String,
    #[serde(default = "default_response_type")]
    response_type: String,
    state: String,
    #[serde(default)]
    nonce: String,
    redirect_uri: String,
    prompt: Option<String>,
}

fn default_response_type() -> String {
    ResponseType::Code.to_string()
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    name: Option<String>,
    state: String,
    nonce: String,
    redirect_uri: String,
    response_type: String,
}

#[derive(Deserialize)]
struct EndSessionQuery {
    post_logout_redirect_uri: Option<String>,
}

/// Mock IdP server that simulates OIDC endpoints.
pub struct MockIdpServer {
    port: u16,
}

impl MockIdpServer {
    /// Create a new Mock IdP server.
    ///
    /// # Arguments
    /// * `port` - The port to listen on (typically 3001)
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// Routes served by the Mock IdP:
    /// - `GET /authorize` - login page, or an immediate answer for `prompt=none`
    /// - `POST /authorize/submit` - form submission handler
    /// - `GET /checksession` - check-session frame page
    /// - `GET /endsession` - sign out at the provider
    pub fn router() -> Router {
        Router::new()
            .route("/authorize", get(authorize))
            .route("/authorize/submit", post(authorize_submit))
            .route("/checksession", get(check_session))
            .route("/endsession", get(end_session))
            .with_state(MockIdpState::default())
    }

    /// Run the Mock IdP server.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        info!("Mock IdP server listening on http://{}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, Self::router()).await
    }
}

async fn authorize(
    State(state): State<MockIdpState>,
    Query(params): Query<AuthorizeQuery>,
) -> Response {
    if params.prompt.as_deref() != Some("none") {
        return Html(templates::login_page(&LoginPage {
            client_id: &params.client_id,
            state: &params.state,
            nonce: &params.nonce,
            redirect_uri: &params.redirect_uri,
            response_type: &params.response_type,
        }))
        .into_response();
    }

    // Silent request: answer from the existing session without any UI.
    let session = state.session.read().await.clone();
    match session {
        Some(session) => {
            debug!("Silent authorization for {}", session.email);
            redirect_with_tokens(
                &session,
                &params.nonce,
                &params.state,
                &params.redirect_uri,
                &params.response_type,
            )
        }
        None => {
            debug!("Silent authorization without a session");
            let error = format!(
                "error=login_required&state={}",
                urlencoding::encode(&params.state)
            );
            redirect_to(&params.redirect_uri, &params.response_type, &error)
        }
    }
}

async fn authorize_submit(
    State(state): State<MockIdpState>,
    Form(form): Form<LoginForm>,
) -> Response {
    let session = IdpSession {
        email: form.email,
        name: form.name.filter(|n| !n.is_empty()),
        session_state: generate_state(),
    };
    info!("Mock sign in for {}", session.email);
    *state.session.write().await = Some(session.clone());

    redirect_with_tokens(
        &session,
        &form.nonce,
        &form.state,
        &form.redirect_uri,
        &form.response_type,
    )
}

async fn check_session(State(state): State<MockIdpState>) -> Html<String> {
    let session = state.session.read().await;
    Html(templates::check_session_page(
        session.as_ref().map(|s| s.session_state.as_str()),
    ))
}

async fn end_session(
    State(state): State<MockIdpState>,
    Query(params): Query<EndSessionQuery>,
) -> Response {
    *state.session.write().await = None;
    info!("Mock session ended");

    match params.post_logout_redirect_uri {
        Some(uri) => Redirect::to(&uri).into_response(),
        None => Html("<p>Signed out.</p>".to_string()).into_response(),
    }
}

/// Answer an authorization request for `session`.
///
/// The code flow gets a base64 JSON code in the query; the implicit flow gets
/// the tokens themselves in the fragment.
fn redirect_with_tokens(
    session: &IdpSession,
    nonce: &str,
    state: &str,
    redirect_uri: &str,
    response_type: &str,
) -> Response {
    let user = MockUser {
        sub: format!("mock-{}", session.email),
        email: session.email.clone(),
        name: session.name.clone(),
        nonce: Some(nonce.to_string()).filter(|n| !n.is_empty()),
    };

    let params = match response_type.parse::<ResponseType>() {
        Ok(ResponseType::Code) => format!(
            "code={}&state={}&session_state={}",
            urlencoding::encode(&user.to_code()),
            urlencoding::encode(state),
            urlencoding::encode(&session.session_state),
        ),
        Ok(ResponseType::IdTokenToken) => {
            let tokens = match user.token_response() {
                Ok(tokens) => tokens,
                Err(e) => {
                    warn!("Failed to mint mock tokens: {}", e);
                    return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
                }
            };
            format!(
                "access_token={}&id_token={}&token_type=Bearer&expires_in={}&state={}&session_state={}",
                urlencoding::encode(&tokens.access_token),
                urlencoding::encode(tokens.id_token.as_deref().unwrap_or_default()),
                tokens.expires_in.unwrap_or_default(),
                urlencoding::encode(state),
                urlencoding::encode(&session.session_state),
            )
        }
        Err(e) => {
            warn!("Unsupported response type {:?}", response_type);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    redirect_to(redirect_uri, response_type, &params)
}

/// Redirect with `params` in the query (code flow) or fragment (implicit flow).
fn redirect_to(redirect_uri: &str, response_type: &str, params: &str) -> Response {
    let separator = match response_type.parse::<ResponseType>() {
        Ok(ResponseType::IdTokenToken) => '#',
        _ if redirect_uri.contains('?') => '&',
        _ => '?',
    };
    Redirect::to(&format!("{redirect_uri}{separator}{params}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use url::Url;

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> Url {
        Url::parse(
            response
                .headers()
                .get(header::LOCATION)
                .unwrap()
                .to_str()
                .unwrap(),
        )
        .unwrap()
    }

    fn submit(response_type: &str) -> Request<Body> {
        let body = format!(
            "email=dev%40example.com&name=Dev&state=s1&nonce=n1&redirect_uri={}&response_type={}",
            urlencoding::encode("http://localhost:4200/callback"),
            urlencoding::encode(response_type),
        );
        Request::post("/authorize/submit")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn silent_authorize() -> Request<Body> {
        Request::get(
            "/authorize?client_id=spa&response_type=code&state=s2&nonce=n2&prompt=none\
             &redirect_uri=http%3A%2F%2Flocalhost%3A4200%2Fsilent-renew.html",
        )
        .body(Body::empty())
        .unwrap()
    }

    #[tokio::test]
    async fn test_authorize_renders_login_page() {
        let response = MockIdpServer::router()
            .oneshot(
                Request::get(
                    "/authorize?client_id=spa&response_type=code&state=s1&nonce=n1\
                     &redirect_uri=http%3A%2F%2Flocalhost%3A4200%2Fcallback",
                )
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains(r#"name="nonce" value="n1""#));
        assert!(html.contains("/authorize/submit"));
    }

    #[tokio::test]
    async fn test_submit_code_flow_redirects_with_code() {
        let response = MockIdpServer::router().oneshot(submit("code")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let url = location(&response);
        assert_eq!(url.path(), "/callback");
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query["state"], "s1");
        assert!(query.contains_key("session_state"));

        let code = &query["code"];
        let user: MockUser = serde_json::from_slice(
            &base64::Engine::decode(&base64::engine::general_purpose::STANDARD, code).unwrap(),
        )
        .unwrap();
        assert_eq!(user.email, "dev@example.com");
        assert_eq!(user.nonce.as_deref(), Some("n1"));
    }

    #[tokio::test]
    async fn test_submit_implicit_flow_uses_fragment() {
        let response = MockIdpServer::router()
            .oneshot(submit("id_token token"))
            .await
            .unwrap();

        let url = location(&response);
        assert_eq!(url.query(), None);
        let fragment = url.fragment().unwrap();
        assert!(fragment.contains("access_token=mock-access-mock-dev%40example.com"));
        assert!(fragment.contains("id_token="));
        assert!(fragment.contains("state=s1"));
    }

    #[tokio::test]
    async fn test_silent_authorize_without_session_is_login_required() {
        let response = MockIdpServer::router()
            .oneshot(silent_authorize())
            .await
            .unwrap();

        let url = location(&response);
        assert_eq!(url.path(), "/silent-renew.html");
        assert_eq!(url.query(), Some("error=login_required&state=s2"));
    }

    #[tokio::test]
    async fn test_silent_authorize_reuses_session() {
        let router = MockIdpServer::router();
        router.clone().oneshot(submit("code")).await.unwrap();

        let response = router.clone().oneshot(silent_authorize()).await.unwrap();
        let query: std::collections::HashMap<_, _> =
            location(&response).query_pairs().into_owned().collect();
        assert_eq!(query["state"], "s2");
        assert!(query.contains_key("code"));

        router
            .clone()
            .oneshot(Request::get("/endsession").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let response = router.oneshot(silent_authorize()).await.unwrap();
        assert!(location(&response)
            .query()
            .unwrap()
            .starts_with("error=login_required"));
    }

    #[tokio::test]
    async fn test_check_session_page() {
        let response = MockIdpServer::router()
            .oneshot(Request::get("/checksession").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("currentSessionState = null"));
    }
}
