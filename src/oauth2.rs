//! OAuth2 sign-in for the Gmail read-only scope using the installed app flow
//!
//! Opens a browser, catches the redirect on a loopback listener and exchanges
//! the code (with PKCE) for tokens. Only the refresh token is persisted; the
//! session gate trades it for a short-lived access token on demand.

use anyhow::{Context, Result, bail};
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::time::Duration;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// Read-only inbox access; nothing in this crate modifies the mailbox.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Get the OAuth2 client ID from the environment (MAILMATE_OAUTH_CLIENT_ID)
pub fn env_client_id() -> Option<String> {
    std::env::var("MAILMATE_OAUTH_CLIENT_ID").ok()
}

/// Get the OAuth2 client secret from the environment (MAILMATE_OAUTH_CLIENT_SECRET)
pub fn env_client_secret() -> Option<String> {
    std::env::var("MAILMATE_OAUTH_CLIENT_SECRET").ok()
}

/// Tokens returned by the token endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// PKCE code verifier and challenge
struct PkceChallenge {
    verifier: String,
    challenge: String,
}

impl PkceChallenge {
    fn new() -> Result<Self> {
        let verifier = random_token::<32>()?;

        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        let challenge = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize());

        Ok(Self {
            verifier,
            challenge,
        })
    }
}

/// N random bytes, URL-safe base64 encoded
fn random_token<const N: usize>() -> Result<String> {
    let mut bytes = [0u8; N];
    getrandom::fill(&mut bytes)
        .map_err(|e| anyhow::anyhow!("Failed to generate random bytes: {}", e))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Error body from the token endpoint
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl ErrorResponse {
    fn unknown() -> Self {
        Self {
            error: "unknown_error".to_string(),
            error_description: None,
        }
    }
}

/// Google OAuth2 client for the installed app flow
#[derive(Clone)]
pub struct GoogleOAuth2 {
    client_id: String,
    client_secret: Option<String>,
    auth_url: String,
    token_url: String,
    revoke_url: String,
    http_client: reqwest::Client,
}

impl GoogleOAuth2 {
    pub fn new(client_id: &str, client_secret: Option<&str>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.map(|s| s.to_string()),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            revoke_url: GOOGLE_REVOKE_URL.to_string(),
            http_client,
        })
    }

    /// Point the token and revoke calls at a mock server.
    #[cfg(test)]
    pub fn with_token_endpoints(mut self, token_url: &str, revoke_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.revoke_url = revoke_url.to_string();
        self
    }

    /// Bind the loopback listener and build the consent URL.
    pub fn start_auth_flow(&self) -> Result<AuthFlowState> {
        let listener = TcpListener::bind("127.0.0.1:0").context("Failed to bind to local port")?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}", port);

        let pkce = PkceChallenge::new()?;
        // CSRF guard echoed back by the redirect
        let state = random_token::<16>()?;

        let auth_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&code_challenge={}&code_challenge_method=S256&access_type=offline&prompt=consent&state={}",
            self.auth_url,
            urlencode(&self.client_id),
            urlencode(&redirect_uri),
            urlencode(GMAIL_READONLY_SCOPE),
            urlencode(&pkce.challenge),
            urlencode(&state),
        );

        tracing::debug!("OAuth2 redirect URI: {}", redirect_uri);

        Ok(AuthFlowState {
            auth_url,
            redirect_uri,
            pkce_verifier: pkce.verifier,
            state,
            listener,
        })
    }

    fn form_with_secret<'a>(&'a self, mut params: Vec<(&'a str, &'a str)>) -> Vec<(&'a str, &'a str)> {
        if let Some(ref secret) = self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }
        params
    }

    async fn post_token_form(&self, params: &[(&str, &str)], what: &str) -> Result<OAuth2Tokens> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .with_context(|| format!("Failed to {}", what))?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await.unwrap_or_else(|_| ErrorResponse::unknown());
            bail!(
                "{} failed: {}{}",
                what,
                error.error,
                error
                    .error_description
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default()
            );
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", what))
    }

    /// Exchange the authorization code for tokens
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        pkce_verifier: &str,
    ) -> Result<OAuth2Tokens> {
        let params = self.form_with_secret(vec![
            ("client_id", self.client_id.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
            ("code_verifier", pkce_verifier),
        ]);
        self.post_token_form(&params, "token exchange").await
    }

    /// Trade a refresh token for a fresh access token
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuth2Tokens> {
        let params = self.form_with_secret(vec![
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ]);
        self.post_token_form(&params, "token refresh").await
    }

    /// Revoke a token server-side. Callers treat failure as non-fatal.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        let response = self
            .http_client
            .post(&self.revoke_url)
            .form(&[("token", token)])
            .send()
            .await
            .context("Failed to reach revoke endpoint")?;

        if !response.status().is_success() {
            bail!("Token revocation failed ({})", response.status());
        }
        Ok(())
    }
}

/// State for an in-progress OAuth flow
pub struct AuthFlowState {
    pub auth_url: String,
    pub redirect_uri: String,
    pub pkce_verifier: String,
    pub state: String,
    listener: TcpListener,
}

impl AuthFlowState {
    /// Block until the browser hits the redirect URI and return the
    /// authorization code. Run this on a blocking thread.
    pub fn wait_for_code(&self, timeout: Duration) -> Result<String> {
        use std::io::ErrorKind;

        self.listener.set_nonblocking(true)?;
        let start = std::time::Instant::now();

        let mut stream = loop {
            match self.listener.accept() {
                Ok((stream, _)) => break stream,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if start.elapsed() > timeout {
                        bail!("OAuth callback timed out. Please try again.");
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e).context("Failed to accept OAuth callback connection");
                }
            }
        };
        stream.set_nonblocking(false)?;

        let mut request_line = String::new();
        BufReader::new(&stream).read_line(&mut request_line)?;

        let query = request_line
            .split_whitespace()
            .nth(1)
            .and_then(|path| path.split('?').nth(1))
            .unwrap_or("");

        if let Some(error) = query_param(query, "error") {
            let description = query_param(query, "error_description").unwrap_or_default();
            let page = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
                <html><body><h1>Authorization Failed</h1>\
                <p>Error: {}</p><p>{}</p>\
                <p>Please close this window and try again.</p></body></html>",
                escape_html(&error),
                escape_html(&description)
            );
            stream.write_all(page.as_bytes()).ok();
            bail!("Authorization failed: {} - {}", error, description);
        }

        let returned_state = query_param(query, "state")
            .context("No state parameter in callback - possible CSRF attack")?;
        if returned_state != self.state {
            bail!("State parameter mismatch - possible CSRF attack");
        }

        let code = query_param(query, "code").context(
            "No authorization code in callback. The browser may have sent an unexpected response.",
        )?;

        let page = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>Signed in to mailmate</h1>\
            <p>You can close this window and return to the terminal.</p>\
            <script>window.close();</script></body></html>";
        stream.write_all(page.as_bytes())?;

        Ok(code)
    }
}

/// Value of `name` in a raw query string, percent-decoded
fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| urldecode(value))
}

/// Escape HTML special characters to prevent XSS
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn urlencode(s: &str) -> String {
    let mut result = String::new();
    for b in s.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(b as char)
            }
            _ => result.push_str(&format!("%{:02X}", b)),
        }
    }
    result
}

fn urldecode(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut iter = s.bytes();
    while let Some(b) = iter.next() {
        match b {
            b'%' => {
                let hex: Vec<u8> = iter.by_ref().take(2).collect();
                let decoded = std::str::from_utf8(&hex)
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match decoded {
                    Some(byte) => bytes.push(byte),
                    None => {
                        bytes.push(b'%');
                        bytes.extend_from_slice(&hex);
                    }
                }
            }
            b'+' => bytes.push(b' '),
            _ => bytes.push(b),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("hello"), "hello");
        assert_eq!(urlencode("hello world"), "hello%20world");
        assert_eq!(urlencode("a=b&c=d"), "a%3Db%26c%3Dd");
        assert_eq!(urlencode("ü"), "%C3%BC");
    }

    #[test]
    fn test_urldecode() {
        assert_eq!(urldecode("access%20denied"), "access denied");
        assert_eq!(urldecode("a+b"), "a b");
        assert_eq!(urldecode("%C3%BC"), "ü");
        assert_eq!(urldecode("100%"), "100%");
    }

    #[test]
    fn test_query_param() {
        let q = "state=abc&code=4%2F0Ad&scope=x";
        assert_eq!(query_param(q, "code"), Some("4/0Ad".to_string()));
        assert_eq!(query_param(q, "state"), Some("abc".to_string()));
        assert_eq!(query_param(q, "error"), None);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a&b"), "a&amp;b");
        assert_eq!(escape_html("\"test\""), "&quot;test&quot;");
    }

    #[test]
    fn test_auth_url_requests_readonly_scope() {
        let oauth = GoogleOAuth2::new("client-123", None).unwrap();
        let flow = oauth.start_auth_flow().unwrap();

        assert!(flow.auth_url.starts_with(GOOGLE_AUTH_URL));
        assert!(flow.auth_url.contains("client_id=client-123"));
        assert!(flow.auth_url.contains(&urlencode(GMAIL_READONLY_SCOPE)));
        assert!(flow.auth_url.contains("code_challenge_method=S256"));
        assert!(flow.redirect_uri.starts_with("http://127.0.0.1:"));
        assert_ne!(flow.pkce_verifier, flow.state);
    }

    #[tokio::test]
    async fn test_refresh_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("client_secret=shh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.fresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let oauth = GoogleOAuth2::new("client", Some("shh"))
            .unwrap()
            .with_token_endpoints(
                &format!("{}/token", server.uri()),
                &format!("{}/revoke", server.uri()),
            );

        let tokens = oauth.refresh_access_token("1//refresh").await.unwrap();
        assert_eq!(tokens.access_token, "ya29.fresh");
        assert!(tokens.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_reports_invalid_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .mount(&server)
            .await;

        let oauth = GoogleOAuth2::new("client", None).unwrap().with_token_endpoints(
            &format!("{}/token", server.uri()),
            &format!("{}/revoke", server.uri()),
        );

        let err = oauth.refresh_access_token("1//stale").await.unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }
}
