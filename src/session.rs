//! Session gate: who is signed in, and a short-lived token to act as them
//!
//! Only the refresh token is stored. Each [`Session`] carries an access token
//! obtained from it; the gate caches that token until shortly before expiry.

use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::constants::OAUTH_CALLBACK_TIMEOUT_SECS;
use crate::credentials::CredentialStore;
use crate::error::AuthError;
use crate::mail::GmailClient;
use crate::oauth2::GoogleOAuth2;

/// Refresh this long before Google's stated expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Authenticated context for mailbox reads
#[derive(Clone)]
pub struct Session {
    access_token: String,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
}

pub trait SessionGate: Send + Sync + 'static {
    /// A refresh token is stored. Says nothing about whether it still works.
    fn is_authenticated(&self) -> bool;

    fn sign_in(&self) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// A usable session, refreshing the access token when needed
    fn session(&self) -> impl Future<Output = Result<Session, AuthError>> + Send;
}

struct CachedToken {
    session: Session,
    expires_at: Instant,
}

/// Google account behind the installed-app OAuth2 flow
pub struct GoogleSessionGate {
    oauth: GoogleOAuth2,
    credentials: CredentialStore,
    mailbox: GmailClient,
    cached: Mutex<Option<CachedToken>>,
}

impl GoogleSessionGate {
    pub fn new(config: &Config) -> Result<Self, AuthError> {
        let client_id = config
            .gmail
            .get_client_id()
            .ok_or(AuthError::MissingClientId)?;
        let client_secret = config.gmail.get_client_secret();

        let oauth = GoogleOAuth2::new(&client_id, client_secret.as_deref())?;
        let mailbox =
            GmailClient::new(&config.gmail.api_base).map_err(|e| AuthError::Flow(e.into()))?;

        Ok(Self::with_parts(oauth, CredentialStore::new(), mailbox))
    }

    pub fn with_parts(
        oauth: GoogleOAuth2,
        credentials: CredentialStore,
        mailbox: GmailClient,
    ) -> Self {
        Self {
            oauth,
            credentials,
            mailbox,
            cached: Mutex::new(None),
        }
    }

    fn cached_session(&self) -> Option<Session> {
        let guard = self.cached.lock().ok()?;
        guard
            .as_ref()
            .filter(|token| token.expires_at > Instant::now())
            .map(|token| token.session.clone())
    }

    fn store_session(&self, session: &Session, expires_in: Option<u64>) {
        let lifetime = Duration::from_secs(expires_in.unwrap_or(3600)).saturating_sub(EXPIRY_MARGIN);
        if let Ok(mut guard) = self.cached.lock() {
            *guard = Some(CachedToken {
                session: session.clone(),
                expires_at: Instant::now() + lifetime,
            });
        }
    }

    fn forget_session(&self) {
        if let Ok(mut guard) = self.cached.lock() {
            *guard = None;
        }
    }

    /// Identity of the account a session belongs to
    pub async fn identity(&self, session: &Session) -> Result<Identity, AuthError> {
        let profile = self.mailbox.profile(session).await.map_err(|e| {
            if e.is_unauthorized() {
                AuthError::Expired(e.to_string())
            } else {
                AuthError::Flow(e.into())
            }
        })?;
        Ok(Identity {
            email: profile.email_address,
        })
    }
}

impl SessionGate for GoogleSessionGate {
    fn is_authenticated(&self) -> bool {
        self.credentials.has_credentials()
    }

    async fn sign_in(&self) -> Result<Identity, AuthError> {
        let flow = self.oauth.start_auth_flow()?;

        tracing::info!("Opening browser for authorization: {}", flow.auth_url);
        eprintln!("Opening your browser to sign in. If it does not open, visit:\n\n  {}\n", flow.auth_url);
        if let Err(e) = open::that(&flow.auth_url) {
            tracing::warn!("Failed to open browser: {}", e);
        }

        // The loopback listener blocks; keep it off the runtime threads
        let redirect_uri = flow.redirect_uri.clone();
        let pkce_verifier = flow.pkce_verifier.clone();
        let code = tokio::task::spawn_blocking(move || {
            flow.wait_for_code(Duration::from_secs(OAUTH_CALLBACK_TIMEOUT_SECS))
        })
        .await
        .map_err(|e| AuthError::Flow(anyhow::anyhow!("OAuth callback task failed: {}", e)))??;

        tracing::debug!("Received authorization code");
        let tokens = self
            .oauth
            .exchange_code(&code, &redirect_uri, &pkce_verifier)
            .await?;

        let Some(ref refresh_token) = tokens.refresh_token else {
            return Err(AuthError::Flow(anyhow::anyhow!(
                "No refresh token received from Google. Please try again."
            )));
        };
        self.credentials
            .set_refresh_token(refresh_token)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let session = Session::new(tokens.access_token.as_str());
        self.store_session(&session, tokens.expires_in);

        let identity = self.identity(&session).await?;
        tracing::info!("Signed in as {}", identity.email);
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.forget_session();

        if let Some(token) = self.credentials.refresh_token() {
            // Revoking the refresh token also kills its access tokens
            if let Err(e) = self.oauth.revoke(&token).await {
                tracing::warn!("Token revocation failed, forgetting locally anyway: {}", e);
            }
        }

        self.credentials
            .delete_all()
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        tracing::info!("Signed out");
        Ok(())
    }

    async fn session(&self) -> Result<Session, AuthError> {
        if let Some(session) = self.cached_session() {
            return Ok(session);
        }

        let refresh_token = self
            .credentials
            .refresh_token()
            .ok_or(AuthError::NotSignedIn)?;

        let tokens = self
            .oauth
            .refresh_access_token(&refresh_token)
            .await
            .map_err(|e| {
                let message = e.to_string();
                if message.contains("invalid_grant") {
                    AuthError::Expired(message)
                } else {
                    AuthError::Flow(e)
                }
            })?;

        tracing::debug!("Refreshed access token (expires in {:?}s)", tokens.expires_in);
        let session = Session::new(tokens.access_token);
        self.store_session(&session, tokens.expires_in);
        Ok(session)
    }
}
