//! Firebase Authentication over the Identity Toolkit REST API.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tasknest_core::config::FirebaseConfig;
use tasknest_core::error::{Result, TasknestError};
use tasknest_core::persistence::{PersistHook, SnapshotStore};
use tasknest_core::session::{AuthEvent, AuthEventBus, AuthGateway, AuthSubscription, RemoteUser};
use tokio::sync::{Mutex, MutexGuard};

use super::documents::{Fields, FirestoreClient, bool_value, string_value, timestamp_value};
use super::error::{
    NETWORK_ERROR, identity_error, response_identity_error, transport_identity_error,
};

/// Snapshot key under which the remote session's credentials are kept.
pub const IDENTITY_CREDENTIALS_KEY: &str = "identity-credentials";

const USERS_COLLECTION: &str = "users";

/// ID tokens are refreshed this long before they actually expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Supplies a valid ID token for the signed-in user.
#[async_trait]
pub trait IdTokenSource: Send + Sync {
    async fn id_token(&self) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credentials {
    user_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email_verified: bool,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Credentials {
    fn user(&self) -> RemoteUser {
        RemoteUser {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            email_verified: self.email_verified,
        }
    }

    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) <= now
    }
}

fn expiry_from(expires_in: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let seconds = expires_in.trim().parse::<i64>().unwrap_or(3600);
    now + Duration::seconds(seconds)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    display_name: Option<String>,
}

/// [`AuthGateway`] backed by Firebase Authentication.
///
/// Holds at most one remote session. Its credentials are persisted through
/// the attached [`SnapshotStore`] so that [`restore_session`] can pick the
/// session up again on the next start.
///
/// [`restore_session`]: FirebaseIdentity::restore_session
pub struct FirebaseIdentity {
    client: Client,
    config: FirebaseConfig,
    credentials: Mutex<Option<Credentials>>,
    events: AuthEventBus,
    hook: PersistHook,
    firestore: FirestoreClient,
}

impl FirebaseIdentity {
    /// Creates a gateway for the configured project. Fails when the API key
    /// or project id is missing.
    pub fn new(config: FirebaseConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::new();
        Ok(Self {
            firestore: FirestoreClient::new(client.clone(), &config),
            client,
            config,
            credentials: Mutex::new(None),
            events: AuthEventBus::new(),
            hook: PersistHook::detached(IDENTITY_CREDENTIALS_KEY),
        })
    }

    /// Persists credentials into `store` and loads the ones saved there.
    ///
    /// Nothing is published until [`restore_session`] runs.
    ///
    /// [`restore_session`]: FirebaseIdentity::restore_session
    pub fn with_snapshot_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.hook = PersistHook::new(IDENTITY_CREDENTIALS_KEY, store);
        let saved: Option<Credentials> = self.hook.restore();
        self.credentials = Mutex::new(saved);
        self
    }

    /// Re-establishes the saved remote session.
    ///
    /// The token is refreshed if needed and the verification flag re-read.
    /// Publishes `SignedIn` on success. A saved session that can no longer be
    /// refreshed is dropped and `SignedOut` is published.
    pub async fn restore_session(&self) -> Option<RemoteUser> {
        let mut guard = self.credentials.lock().await;
        guard.as_ref()?;

        let id_token = match self.valid_token(&mut guard).await {
            Ok(token) => token,
            Err(e) => {
                tracing::info!("Saved session could not be restored: {}", e);
                return None;
            }
        };

        match self.lookup(&id_token).await {
            Ok(remote) => {
                if let Some(creds) = guard.as_mut() {
                    creds.email_verified = remote.email_verified;
                    if remote.display_name.is_some() {
                        creds.display_name = remote.display_name;
                    }
                }
            }
            Err(e) => tracing::warn!("Failed to refresh account details: {}", e),
        }

        self.hook.persist(&*guard);
        let user = guard.as_ref().map(Credentials::user)?;
        tracing::debug!("Restored session for {}", user.user_id);
        self.events.publish(AuthEvent::SignedIn { user: user.clone() });
        Some(user)
    }

    /// Returns a fresh ID token, refreshing it through the secure token
    /// endpoint when close to expiry. A refresh rejected by the service drops
    /// the session; an unreachable service leaves it in place.
    async fn valid_token(&self, guard: &mut MutexGuard<'_, Option<Credentials>>) -> Result<String> {
        let Some(creds) = guard.as_ref() else {
            return Err(TasknestError::NotAuthenticated);
        };
        if !creds.needs_refresh(Utc::now()) {
            return Ok(creds.id_token.clone());
        }
        let refresh_token = creds.refresh_token.clone();

        match self.refresh(&refresh_token).await {
            Ok(refreshed) => {
                let now = Utc::now();
                if let Some(creds) = guard.as_mut() {
                    creds.id_token = refreshed.id_token.clone();
                    creds.refresh_token = refreshed.refresh_token;
                    creds.expires_at = expiry_from(&refreshed.expires_in, now);
                }
                self.hook.persist(&**guard);
                Ok(refreshed.id_token)
            }
            Err(e) if e.identity_code() == Some(NETWORK_ERROR) => Err(e),
            Err(e) => {
                tracing::warn!("Token refresh failed, dropping remote session: {}", e);
                **guard = None;
                self.hook.clear();
                self.events.publish(AuthEvent::SignedOut);
                Err(e)
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let url = format!(
            "{}/token?key={}",
            self.config.secure_token_endpoint.trim_end_matches('/'),
            self.config.api_key
        );
        let response = self
            .client
            .post(url)
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(transport_identity_error)?;
        Self::decode(response).await
    }

    async fn accounts<T>(&self, method: &str, body: &Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!(
            "{}/accounts:{}?key={}",
            self.config.identity_endpoint.trim_end_matches('/'),
            method,
            self.config.api_key
        );
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_identity_error)?;
        Self::decode(response).await
    }

    async fn decode<T>(response: reqwest::Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(identity_error(status, &body));
        }
        response.json::<T>().await.map_err(response_identity_error)
    }

    async fn lookup(&self, id_token: &str) -> Result<LookupUser> {
        let response: LookupResponse = self
            .accounts("lookup", &json!({ "idToken": id_token }))
            .await?;
        response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| TasknestError::identity("USER_NOT_FOUND", "User account not found"))
    }

    async fn send_verification_email(&self, id_token: &str) -> Result<()> {
        let mut body = json!({ "requestType": "VERIFY_EMAIL", "idToken": id_token });
        if let Some(url) = &self.config.continue_url {
            body["continueUrl"] = json!(url);
        }
        let _: Value = self.accounts("sendOobCode", &body).await?;
        Ok(())
    }

    async fn write_profile(&self, creds: &Credentials, display_name: &str) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert("email".into(), string_value(&creds.email));
        fields.insert("displayName".into(), string_value(display_name));
        fields.insert("createdAt".into(), timestamp_value(Utc::now()));
        fields.insert("isEmailVerified".into(), bool_value(false));

        let path = format!("{}/{}", USERS_COLLECTION, creds.user_id);
        self.firestore
            .patch(&creds.id_token, &path, fields, &[], false)
            .await
            .map(|_| ())
    }

    async fn profile_display_name(&self, creds: &Credentials) -> Option<String> {
        let path = format!("{}/{}", USERS_COLLECTION, creds.user_id);
        match self.firestore.get(&creds.id_token, &path).await {
            Ok(Some(doc)) => doc.string("displayName").map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read profile of {}: {}", creds.user_id, e);
                None
            }
        }
    }

    /// Returns the reissued token pair, if the service sent one.
    async fn set_display_name(
        &self,
        id_token: &str,
        display_name: &str,
    ) -> Result<Option<(String, String)>> {
        let updated: Value = self
            .accounts(
                "update",
                &json!({
                    "idToken": id_token,
                    "displayName": display_name,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        Ok(updated
            .get("idToken")
            .and_then(Value::as_str)
            .zip(updated.get("refreshToken").and_then(Value::as_str))
            .map(|(id, refresh)| (id.to_string(), refresh.to_string())))
    }

    /// Stores reissued tokens if `creds` still describes the held session.
    async fn replace_tokens(&self, creds: &Credentials) {
        let mut guard = self.credentials.lock().await;
        let Some(held) = guard.as_mut().filter(|held| held.user_id == creds.user_id) else {
            return;
        };
        held.id_token = creds.id_token.clone();
        held.refresh_token = creds.refresh_token.clone();
        self.hook.persist(&*guard);
    }

    async fn start_session(&self, creds: Credentials) -> RemoteUser {
        let user = creds.user();
        let mut guard = self.credentials.lock().await;
        *guard = Some(creds);
        self.hook.persist(&*guard);
        drop(guard);

        self.events.publish(AuthEvent::SignedIn { user: user.clone() });
        user
    }
}

impl std::fmt::Debug for FirebaseIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseIdentity")
            .field("project_id", &self.config.project_id)
            .field("hook", &self.hook)
            .finish()
    }
}

#[async_trait]
impl IdTokenSource for FirebaseIdentity {
    async fn id_token(&self) -> Result<String> {
        let mut guard = self.credentials.lock().await;
        self.valid_token(&mut guard).await
    }
}

#[async_trait]
impl AuthGateway for FirebaseIdentity {
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<RemoteUser> {
        let signed_up: SignInResponse = self
            .accounts(
                "signUp",
                &json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;

        let mut creds = Credentials {
            user_id: signed_up.local_id,
            email: if signed_up.email.is_empty() {
                email.to_string()
            } else {
                signed_up.email
            },
            display_name: Some(display_name.to_string()),
            email_verified: false,
            id_token: signed_up.id_token,
            refresh_token: signed_up.refresh_token,
            expires_at: expiry_from(&signed_up.expires_in, Utc::now()),
        };
        tracing::info!("Registered {}", creds.user_id);
        // The account exists from here on; later failures keep the session.
        let user = self.start_session(creds.clone()).await;

        match self.set_display_name(&creds.id_token, display_name).await {
            Ok(Some((id_token, refresh_token))) => {
                creds.id_token = id_token;
                creds.refresh_token = refresh_token;
                self.replace_tokens(&creds).await;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to set display name of {}: {}", creds.user_id, e),
        }

        if let Err(e) = self.write_profile(&creds, display_name).await {
            tracing::warn!("Failed to write profile of {}: {}", creds.user_id, e);
        }

        self.send_verification_email(&creds.id_token).await?;
        Ok(user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<RemoteUser> {
        let signed_in: SignInResponse = self
            .accounts(
                "signInWithPassword",
                &json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;

        let mut creds = Credentials {
            user_id: signed_in.local_id,
            email: if signed_in.email.is_empty() {
                email.to_string()
            } else {
                signed_in.email
            },
            display_name: signed_in.display_name.filter(|name| !name.is_empty()),
            email_verified: false,
            id_token: signed_in.id_token,
            refresh_token: signed_in.refresh_token,
            expires_at: expiry_from(&signed_in.expires_in, Utc::now()),
        };

        let account = self.lookup(&creds.id_token).await?;
        creds.email_verified = account.email_verified;
        if let Some(name) = self.profile_display_name(&creds).await {
            creds.display_name = Some(name);
        }

        tracing::info!("Signed in {}", creds.user_id);
        Ok(self.start_session(creds).await)
    }

    async fn logout(&self) -> Result<()> {
        let mut guard = self.credentials.lock().await;
        let had_session = guard.take().is_some();
        self.hook.clear();
        drop(guard);

        if had_session {
            self.events.publish(AuthEvent::SignedOut);
        }
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<()> {
        let mut body = json!({ "requestType": "PASSWORD_RESET", "email": email });
        if let Some(url) = &self.config.continue_url {
            body["continueUrl"] = json!(url);
        }
        let _: Value = self.accounts("sendOobCode", &body).await?;
        Ok(())
    }

    async fn resend_verification(&self) -> Result<()> {
        let id_token = self.id_token().await?;
        self.send_verification_email(&id_token).await
    }

    async fn refresh_verification_status(&self) -> Result<bool> {
        let id_token = self.id_token().await?;
        let account = self.lookup(&id_token).await?;

        let mut guard = self.credentials.lock().await;
        if let Some(creds) = guard.as_mut() {
            creds.email_verified = account.email_verified;
        }
        self.hook.persist(&*guard);
        Ok(account.email_verified)
    }

    async fn apply_verification_code(&self, code: &str) -> Result<()> {
        let applied: Value = self.accounts("update", &json!({ "oobCode": code })).await?;
        let verified_email = applied.get("email").and_then(Value::as_str);

        let mut guard = self.credentials.lock().await;
        if let Some(creds) = guard.as_mut() {
            if verified_email.is_none_or(|email| email.eq_ignore_ascii_case(&creds.email)) {
                creds.email_verified = true;
            }
        }
        self.hook.persist(&*guard);
        Ok(())
    }

    async fn current_user(&self) -> Option<RemoteUser> {
        self.credentials.lock().await.as_ref().map(Credentials::user)
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}
