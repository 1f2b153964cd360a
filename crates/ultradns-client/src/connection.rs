//! Authenticated connection to the UltraDNS REST API
//!
//! Every request follows the same sequence: ensure the session holds a
//! valid token, attach it as a bearer header, send, then run the response
//! through the error classifier.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::Secret;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;
use ultradns_auth::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpTransport, Session, Transport, check_response,
};

use crate::error::Result;

const JSON: &str = "application/json";
const JSON_PATCH: &str = "application/json-patch+json";

/// Options for `ApiConnection::new`.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub username: String,
    pub password: Secret<String>,
    /// Refresh token from an earlier session. When set, the first exchange
    /// uses it instead of the password.
    pub refresh_token: Option<String>,
    /// API root, `https://api.ultradns.com` by default.
    pub base_url: String,
    /// HTTP timeout, also used as the token expiry margin. 5 seconds by default.
    pub timeout: Duration,
}

impl ApiOptions {
    pub fn new(username: impl Into<String>, password: Secret<String>) -> Self {
        Self {
            username: username.into(),
            password,
            refresh_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

/// A client bound to one account.
///
/// Cheap to clone; clones share the session, so a token obtained through
/// one clone is reused by all of them.
#[derive(Debug, Clone)]
pub struct ApiConnection {
    transport: HttpTransport,
    session: Arc<Session>,
    base_url: String,
}

impl ApiConnection {
    pub fn new(options: ApiOptions) -> Result<Self> {
        let transport = HttpTransport::new(options.timeout)?;
        let base_url = options.base_url.trim_end_matches('/').to_string();

        let mut session = Session::new(options.username, options.password, base_url.clone());
        if let Some(refresh_token) = options.refresh_token {
            session = session.with_refresh_token(refresh_token);
        }

        Ok(Self {
            transport,
            session: Arc::new(session),
            base_url,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Obtain or refresh the access token without issuing an API call.
    pub async fn authorize(&self) -> Result<()> {
        self.session
            .ensure_authorized(&self.transport, self.transport.timeout())
            .await?;
        Ok(())
    }

    /// `GET {base_url}{path}`.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        self.send(Method::GET, path, None).await
    }

    /// `POST {base_url}{path}` with a JSON body.
    pub async fn post(&self, path: &str, body: impl Into<Bytes>) -> Result<reqwest::Response> {
        self.send(Method::POST, path, Some((JSON, body.into())))
            .await
    }

    /// `PATCH {base_url}{path}` with a JSON Patch document.
    pub async fn json_patch(
        &self,
        path: &str,
        body: impl Into<Bytes>,
    ) -> Result<reqwest::Response> {
        self.send(Method::PATCH, path, Some((JSON_PATCH, body.into())))
            .await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<(&'static str, Bytes)>,
    ) -> Result<reqwest::Response> {
        self.authorize().await?;

        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .transport
            .client()
            .request(method.clone(), &url)
            .header(AUTHORIZATION, self.session.bearer().await);
        if let Some((content_type, body)) = body {
            request = request.header(CONTENT_TYPE, content_type).body(body);
        }

        let response = request.send().await?;
        debug!(%method, path, status = response.status().as_u16(), "API call completed");
        Ok(check_response(response).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultradns_auth::Error as AuthError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const USERNAME: &str = "good_user";
    const PASSWORD: &str = "password123!";
    const ACCESS_TOKEN: &str = "at_5f3a9c";
    const POST_BODY: &str = r#"{"probing":"enable"}"#;

    fn token_body(access_token: &str) -> String {
        format!(
            r#"{{"tokenType":"Bearer","accessToken":"{access_token}","refreshToken":"rt_1","expiresIn":"3600"}}"#
        )
    }

    async fn mount_token_endpoint(server: &MockServer, access_token: &str) {
        Mock::given(method("POST"))
            .and(path("/authorization/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(token_body(access_token)))
            .mount(server)
            .await;
    }

    /// API endpoints that insist on `ACCESS_TOKEN`, answering like the live
    /// service does for a missing or stale bearer.
    async fn mount_api(server: &MockServer) {
        Mock::given(|req: &Request| req.url.path() != "/authorization/token")
            .respond_with(|req: &Request| {
                let bearer = format!("Bearer {ACCESS_TOKEN}");
                let authorized = req
                    .headers
                    .get("authorization")
                    .is_some_and(|v| v.as_bytes() == bearer.as_bytes());
                if !authorized {
                    return ResponseTemplate::new(400).set_body_string(
                        r#"{"errorCode":60004,"errorMessage":"Authorization Header required"}"#,
                    );
                }
                match (req.method.as_str(), req.url.path()) {
                    ("GET", "/foo") => {
                        ResponseTemplate::new(200).set_body_string(r#"{"fooBar":"isFooBar"}"#)
                    }
                    ("POST", "/post/endpoint") => {
                        let yep = req.body == POST_BODY.as_bytes();
                        ResponseTemplate::new(200).set_body_string(format!(r#"{{"yep":{yep}}}"#))
                    }
                    (_, other) => ResponseTemplate::new(400).set_body_string(format!(
                        r#"{{"error":"wrong URL","url":"{other}"}}"#
                    )),
                }
            })
            .mount(server)
            .await;
    }

    fn connection(server: &MockServer) -> ApiConnection {
        let options = ApiOptions::new(USERNAME, Secret::new(PASSWORD.to_string()))
            .base_url(server.uri())
            .timeout(Duration::from_secs(2));
        ApiConnection::new(options).unwrap()
    }

    #[test]
    fn options_default_to_production() {
        let options = ApiOptions::new(USERNAME, Secret::new(PASSWORD.to_string()));
        assert_eq!(options.base_url, "https://api.ultradns.com");
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert!(options.refresh_token.is_none());
    }

    #[tokio::test]
    async fn get_sends_auth_token() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, ACCESS_TOKEN).await;
        mount_api(&server).await;

        let response = connection(&server).get("/foo").await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), r#"{"fooBar":"isFooBar"}"#);
    }

    #[tokio::test]
    async fn token_is_reused_across_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authorization/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(token_body(ACCESS_TOKEN)))
            .expect(1)
            .mount(&server)
            .await;
        mount_api(&server).await;

        let conn = connection(&server);
        for _ in 0..3 {
            conn.get("/foo").await.unwrap();
        }
        // Clones share the session.
        conn.clone().get("/foo").await.unwrap();
    }

    #[tokio::test]
    async fn invalid_token_is_classified() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, "at_stale").await;
        mount_api(&server).await;

        let err = connection(&server).get("/foo").await.unwrap_err();
        assert_eq!(err.to_string(), "60004: Authorization Header required");
        assert_eq!(err.api().map(|e| e.code), Some(60004));
    }

    #[tokio::test]
    async fn unknown_path_renders_sentinel() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, ACCESS_TOKEN).await;
        mount_api(&server).await;

        let err = connection(&server).get("/nope").await.unwrap_err();
        assert_eq!(err.to_string(), ultradns_auth::UNRECOGNIZED_ERROR_PAYLOAD);
        assert_eq!(err.api().map(|e| e.error_type.as_str()), Some("wrong URL"));
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, ACCESS_TOKEN).await;
        mount_api(&server).await;

        let response = connection(&server)
            .post("/post/endpoint", POST_BODY)
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), r#"{"yep":true}"#);

        let requests = server.received_requests().await.unwrap();
        let post = requests
            .iter()
            .find(|r| r.url.path() == "/post/endpoint")
            .unwrap();
        assert_eq!(post.headers.get("content-type").unwrap(), JSON);
    }

    #[tokio::test]
    async fn json_patch_sets_patch_content_type() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, ACCESS_TOKEN).await;
        Mock::given(method("PATCH"))
            .and(path("/zones/example.com./rrsets/A/www"))
            .and(wiremock::matchers::header("content-type", JSON_PATCH))
            .and(wiremock::matchers::header(
                "authorization",
                format!("Bearer {ACCESS_TOKEN}").as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"message":"Successful"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let patch = r#"[{"op":"replace","path":"/profile/status","value":"ACTIVE"}]"#;
        connection(&server)
            .json_patch("/zones/example.com./rrsets/A/www", patch)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn authorization_failure_stops_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authorization/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"errorCode":60001,"errorMessage":"invalid_grant:Invalid username & password combination.","error":"invalid_grant","error_description":"60001: invalid_grant:Invalid username & password combination."}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/foo"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = connection(&server).get("/foo").await.unwrap_err();
        assert!(matches!(err, crate::Error::Auth(AuthError::Api(_))), "got: {err:?}");
        assert_eq!(
            err.to_string(),
            "60001: invalid_grant:Invalid username & password combination."
        );
    }

    #[tokio::test]
    async fn seeded_refresh_token_skips_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authorization/token"))
            .and(wiremock::matchers::body_string_contains("grant_type=refresh_token"))
            .and(wiremock::matchers::body_string_contains("refresh_token=rt_saved"))
            .respond_with(ResponseTemplate::new(200).set_body_string(token_body(ACCESS_TOKEN)))
            .expect(1)
            .mount(&server)
            .await;

        let options = ApiOptions::new(USERNAME, Secret::new(String::new()))
            .base_url(format!("{}/", server.uri()))
            .refresh_token("rt_saved");
        let conn = ApiConnection::new(options).unwrap();
        conn.authorize().await.unwrap();

        assert_eq!(conn.session().access_token().await, ACCESS_TOKEN);
        assert_eq!(conn.base_url(), server.uri());
    }
}
