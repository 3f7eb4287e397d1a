use std::fs::OpenOptions;
use std::io;
use std::io::Read;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use finsight_protocol::User;

use crate::error::ApiError;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Access/refresh token pair as issued by `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Where tokens persist between runs. Persistence is a side-effecting
/// boundary the engine core never crosses directly.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> io::Result<Option<AuthTokens>>;
    fn save(&self, tokens: &AuthTokens) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// Keeps tokens for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<AuthTokens>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> io::Result<Option<AuthTokens>> {
        let guard = self
            .tokens
            .lock()
            .map_err(|_| io::Error::other("token store poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, tokens: &AuthTokens) -> io::Result<()> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|_| io::Error::other("token store poisoned"))?;
        *guard = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|_| io::Error::other("token store poisoned"))?;
        *guard = None;
        Ok(())
    }
}

/// JSON file store, created owner-readable only on unix.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> io::Result<Option<AuthTokens>> {
        let mut file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let tokens = serde_json::from_str(&contents).map_err(io::Error::other)?;
        Ok(Some(tokens))
    }

    fn save(&self, tokens: &AuthTokens) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(tokens).map_err(io::Error::other)?;
        let mut options = OpenOptions::new();
        options.truncate(true).write(true).create(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Where the session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthLifecycle {
    Anonymous,
    Authenticating,
    Authenticated,
    Refreshing,
}

struct AuthState {
    lifecycle: AuthLifecycle,
    tokens: Option<AuthTokens>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user: User,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

/// Explicit session object holding the token state. Shared by `Arc`;
/// nothing here is process-global.
pub struct AuthSession {
    base_url: String,
    client: reqwest::Client,
    store: Box<dyn TokenStore>,
    state: Mutex<AuthState>,
    /// Serializes refresh exchanges so concurrent 401s trigger exactly one.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl AuthSession {
    pub fn new(
        base_url: impl Into<String>,
        client: reqwest::Client,
        store: Box<dyn TokenStore>,
    ) -> io::Result<Self> {
        let tokens = store.load()?;
        let lifecycle = if tokens.is_some() {
            AuthLifecycle::Authenticated
        } else {
            AuthLifecycle::Anonymous
        };
        Ok(Self {
            base_url: base_url.into(),
            client,
            store,
            state: Mutex::new(AuthState { lifecycle, tokens }),
            refresh_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn lifecycle(&self) -> AuthLifecycle {
        self.state
            .lock()
            .map(|state| state.lifecycle)
            .unwrap_or(AuthLifecycle::Anonymous)
    }

    pub fn access_token(&self) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.tokens.as_ref().map(|t| t.access_token.clone()))
    }

    fn refresh_token(&self) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.tokens.as_ref().map(|t| t.refresh_token.clone()))
    }

    fn set_state(&self, lifecycle: AuthLifecycle, tokens: Option<AuthTokens>) {
        if let Ok(mut state) = self.state.lock() {
            state.lifecycle = lifecycle;
            state.tokens = tokens;
        }
    }

    /// Exchange credentials for a token pair. Login responses are never
    /// retried through the refresh path.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        if let Ok(mut state) = self.state.lock() {
            state.lifecycle = AuthLifecycle::Authenticating;
        }
        let url = format!("{}/auth/login", self.base_url);
        let result: Result<LoginResponse, ApiError> = async {
            let resp = self
                .client
                .post(url)
                .json(&LoginRequest { email, password })
                .send()
                .await?;
            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(ApiError::Status { status, body });
            }
            Ok(resp.json().await?)
        }
        .await;

        match result {
            Ok(login) => {
                let tokens = AuthTokens {
                    access_token: login.access_token,
                    refresh_token: login.refresh_token,
                };
                self.store.save(&tokens)?;
                self.set_state(AuthLifecycle::Authenticated, Some(tokens));
                Ok(login.user)
            }
            Err(err) => {
                self.set_state(AuthLifecycle::Anonymous, None);
                Err(err)
            }
        }
    }

    /// Exchange the refresh token for a new access token. Concurrent
    /// callers coalesce onto a single exchange; a failure tears the
    /// session down.
    pub async fn refresh(&self) -> Result<String, ApiError> {
        let before = self.access_token();
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have completed the exchange while we waited.
        if let Some(current) = self.access_token()
            && Some(&current) != before.as_ref()
        {
            return Ok(current);
        }

        let Some(refresh_token) = self.refresh_token() else {
            self.teardown();
            return Err(ApiError::SessionExpired);
        };

        if let Ok(mut state) = self.state.lock() {
            state.lifecycle = AuthLifecycle::Refreshing;
        }
        debug!("exchanging refresh token");
        let url = format!("{}/auth/refresh", self.base_url);
        let result: Result<RefreshResponse, ApiError> = async {
            let resp = self
                .client
                .post(url)
                .json(&RefreshRequest {
                    refresh_token: &refresh_token,
                })
                .send()
                .await?;
            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(ApiError::Status { status, body });
            }
            Ok(resp.json().await?)
        }
        .await;

        match result {
            Ok(refreshed) => {
                let tokens = AuthTokens {
                    access_token: refreshed.access_token.clone(),
                    refresh_token,
                };
                self.store.save(&tokens)?;
                self.set_state(AuthLifecycle::Authenticated, Some(tokens));
                Ok(refreshed.access_token)
            }
            Err(err) => {
                warn!("token refresh failed: {err}");
                self.teardown();
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// Best-effort server-side logout, then local teardown.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.refresh_token() {
            let url = format!("{}/auth/logout", self.base_url);
            let result = self
                .client
                .post(url)
                .json(&RefreshRequest {
                    refresh_token: &refresh_token,
                })
                .send()
                .await;
            if let Err(err) = result {
                debug!("logout request failed: {err}");
            }
        }
        self.teardown();
    }

    /// Clear stored tokens and return to anonymous. No network.
    pub fn teardown(&self) {
        if let Err(err) = self.store.clear() {
            warn!("failed to clear token store: {err}");
        }
        self.set_state(AuthLifecycle::Anonymous, None);
    }
}
