use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::password::{dummy_hash, hash_password, verify_password};
use crate::auth::{JwtError, TokenKind, TokenPair, TokenService};
use crate::database::models::{NewUser, User, UserChanges};
use crate::database::{constraints, DatabaseError, Store};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation::{self, FieldErrors};

const NAME_MAX: usize = 150;
const PASSWORD_MIN: usize = 8;
const USERNAME_TAKEN: &str = "Este nome de usuário já está em uso.";
const EMAIL_TAKEN: &str = "Este email já está em uso.";
const INVALID_CREDENTIALS: &str = "Credenciais inválidas.";
const INVALID_TOKEN: &str = "Token inválido";

#[derive(Debug, Default, Deserialize)]
pub struct RegisterInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub senha: Option<String>,
    pub confirmar_senha: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginInput {
    #[serde(alias = "username")]
    pub nome_usuario: Option<String>,
    pub senha: Option<String>,
}

/// Body of logout and token refresh
#[derive(Debug, Default, Deserialize)]
pub struct RefreshInput {
    pub refresh: Option<String>,
}

/// Profile PATCH; identity fields are read-only and ignored when sent
#[derive(Debug, Default, Deserialize)]
pub struct ProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Public account summary returned with a fresh token pair
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub id: i64,
    pub nome_usuario: String,
    pub email: String,
    pub primeiro_nome: String,
    pub ultimo_nome: String,
}

impl From<&User> for AccountSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            nome_usuario: user.username.clone(),
            email: user.email.clone(),
            primeiro_nome: user.first_name.clone(),
            ultimo_nome: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub mensagem: &'static str,
    pub usuario: AccountSummary,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

impl From<User> for ProfileView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            date_joined: user.date_joined,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub mensagem: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access: String,
}

/// Registration, login, logout, profile and token refresh
pub struct AccountService {
    store: Arc<dyn Store>,
    tokens: TokenService,
    hash_rounds: u32,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService, hash_rounds: u32) -> Self {
        Self {
            store,
            tokens,
            hash_rounds,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.store.clone(),
            state.tokens.clone(),
            state.config.security.password_hash_rounds,
        )
    }

    pub async fn register(&self, input: RegisterInput) -> ApiResult<AuthSession> {
        let mut errors = FieldErrors::new();

        let username = errors.require("username", input.username.as_deref(), validation::username);
        if let Some(username) = &username {
            if self.store.username_exists(username).await? {
                errors.add("username", USERNAME_TAKEN);
            }
        }

        let email = errors.require("email", input.email.as_deref(), validation::email);
        if let Some(email) = &email {
            if self.store.email_exists(email).await? {
                errors.add("email", EMAIL_TAKEN);
            }
        }

        let first_name = errors.optional("first_name", input.first_name.as_deref(), person_name);
        let last_name = errors.optional("last_name", input.last_name.as_deref(), person_name);
        let senha = errors.require("senha", input.senha.as_deref(), password_strength);
        let confirmar_senha =
            errors.require("confirmar_senha", input.confirmar_senha.as_deref(), non_empty);

        let (username, email, senha) = match (username, email, senha, confirmar_senha) {
            (Some(username), Some(email), Some(senha), Some(confirmar)) if errors.is_empty() => {
                if senha != confirmar {
                    errors.add(FieldErrors::NON_FIELD, "As senhas não coincidem.");
                    return Err(errors.into());
                }
                (username, email, senha)
            }
            _ => return Err(errors.into()),
        };

        let password_hash = self.hash(senha).await?;
        let user = self
            .store
            .create_user(NewUser {
                username,
                email,
                password_hash,
                first_name: first_name.unwrap_or_default(),
                last_name: last_name.unwrap_or_default(),
            })
            .await
            .map_err(duplicate_account)?;

        tracing::info!("Registered user {} ({})", user.username, user.id);
        self.session(&user, "Usuário criado com sucesso!")
    }

    pub async fn login(&self, input: LoginInput) -> ApiResult<AuthSession> {
        let mut errors = FieldErrors::new();
        let username = errors.require("nome_usuario", input.nome_usuario.as_deref(), non_empty);
        let senha = errors.require("senha", input.senha.as_deref(), non_empty);

        let (Some(username), Some(senha)) = (username, senha) else {
            return Err(errors.into());
        };

        let user = self.store.find_user_by_username(username.trim()).await?;

        // Unknown usernames still pay for one verification
        let stored_hash = user
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| dummy_hash(self.hash_rounds));
        let matches = self.verify(senha, stored_hash).await?;

        let user = match user {
            Some(user) if matches && user.is_active => user,
            Some(user) if matches => {
                tracing::warn!("Login attempt for inactive user '{}'", user.username);
                return Err(non_field(INVALID_CREDENTIALS));
            }
            Some(user) => {
                tracing::warn!("Failed login for user '{}'", user.username);
                return Err(non_field(INVALID_CREDENTIALS));
            }
            None => {
                tracing::warn!("Failed login for unknown user '{}'", username.trim());
                return Err(non_field(INVALID_CREDENTIALS));
            }
        };

        tracing::info!("User {} logged in", user.id);
        self.session(&user, "Login realizado com sucesso!")
    }

    /// Revoke the submitted refresh token. A body without `refresh` has
    /// nothing to revoke and still succeeds.
    pub async fn logout(&self, user: &User, input: RefreshInput) -> ApiResult<Message> {
        let done = Message {
            mensagem: "Logout realizado com sucesso!",
        };

        let Some(token) = input.refresh.filter(|t| !t.trim().is_empty()) else {
            return Ok(done);
        };

        let claims = self
            .tokens
            .validate(token.trim(), TokenKind::Refresh)
            .map_err(|e| {
                tracing::debug!("Logout for user {} with unusable refresh token: {}", user.id, e);
                ApiError::bad_request(INVALID_TOKEN)
            })?;

        match self
            .store
            .blacklist_token(claims.jti, claims.sub, claims.expires_at())
            .await
        {
            Ok(()) => {
                tracing::info!("User {} logged out", user.id);
                Ok(done)
            }
            Err(DatabaseError::UniqueViolation(_)) => {
                tracing::debug!("Refresh token {} already revoked", claims.jti);
                Err(ApiError::bad_request(INVALID_TOKEN))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn profile(&self, user: User) -> ProfileView {
        user.into()
    }

    pub async fn update_profile(&self, user: User, input: ProfileInput) -> ApiResult<ProfileView> {
        let mut errors = FieldErrors::new();
        let changes = UserChanges {
            first_name: errors.optional("first_name", input.first_name.as_deref(), person_name),
            last_name: errors.optional("last_name", input.last_name.as_deref(), person_name),
        };
        errors.into_result()?;

        if changes.is_empty() {
            return Ok(user.into());
        }

        let updated = self.store.update_user(user.id, changes).await?;
        Ok(updated.into())
    }

    /// Exchange a live, unrevoked refresh token for a new access token
    pub async fn refresh(&self, input: RefreshInput) -> ApiResult<AccessToken> {
        let token = input
            .refresh
            .ok_or_else(|| ApiError::field_error("refresh", validation::REQUIRED))?;

        let claims = self
            .tokens
            .validate(token.trim(), TokenKind::Refresh)
            .map_err(|e| {
                tracing::debug!("Refresh rejected: {}", e);
                ApiError::unauthorized("Token inválido ou expirado.")
            })?;

        if self.store.is_blacklisted(claims.jti).await? {
            tracing::debug!("Refresh with revoked token {}", claims.jti);
            return Err(ApiError::unauthorized("Token inválido ou expirado."));
        }

        match self.store.find_user(claims.sub).await? {
            Some(user) if user.is_active => {}
            _ => return Err(ApiError::unauthorized("Usuário não encontrado ou inativo.")),
        }

        let access = self
            .tokens
            .issue(claims.sub, TokenKind::Access)
            .map_err(token_failure)?;
        Ok(AccessToken { access })
    }

    fn session(&self, user: &User, mensagem: &'static str) -> ApiResult<AuthSession> {
        let tokens = self.tokens.issue_pair(user.id).map_err(token_failure)?;
        Ok(AuthSession {
            mensagem,
            usuario: user.into(),
            tokens,
        })
    }

    async fn verify(&self, password: String, stored_hash: String) -> ApiResult<bool> {
        tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| {
                tracing::error!("Password verification task failed: {}", e);
                ApiError::internal_server_error("Authentication failed")
            })?
            .map_err(|e| {
                tracing::error!("Unusable password hash: {}", e);
                ApiError::internal_server_error("Authentication failed")
            })
    }

    /// Hashing runs on the blocking pool
    async fn hash(&self, password: String) -> ApiResult<String> {
        let rounds = self.hash_rounds;
        tokio::task::spawn_blocking(move || hash_password(&password, rounds))
            .await
            .map_err(|e| {
                tracing::error!("Password hashing task failed: {}", e);
                ApiError::internal_server_error("Registration failed")
            })?
            .map_err(|e| {
                tracing::error!("{}", e);
                ApiError::internal_server_error("Registration failed")
            })
    }
}

fn non_field(message: &str) -> ApiError {
    let mut errors = FieldErrors::new();
    errors.add(FieldErrors::NON_FIELD, message);
    errors.into()
}

fn token_failure(err: JwtError) -> ApiError {
    tracing::error!("Token issuance failed: {}", err);
    ApiError::internal_server_error("Could not issue authentication tokens")
}

fn duplicate_account(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::UniqueViolation(c) if c == constraints::USERS_USERNAME => {
            ApiError::field_error("username", USERNAME_TAKEN)
        }
        DatabaseError::UniqueViolation(c) if c == constraints::USERS_EMAIL => {
            ApiError::field_error("email", EMAIL_TAKEN)
        }
        other => other.into(),
    }
}

fn non_empty(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err(validation::BLANK.to_string());
    }
    Ok(value.to_string())
}

fn person_name(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    validation::max_length(trimmed, NAME_MAX)?;
    Ok(trimmed.to_string())
}

fn password_strength(value: &str) -> Result<String, String> {
    non_empty(value)?;
    if value.chars().count() < PASSWORD_MIN {
        return Err(format!(
            "Certifique-se de que este campo tenha pelo menos {} caracteres.",
            PASSWORD_MIN
        ));
    }
    Ok(value.to_string())
}
