#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use agenda_api::config::AppConfig;
use agenda_api::throttle::Scope;
use agenda_api::{app, AppState};

pub const PASSWORD: &str = "senha-segura-123";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Payload inside the success envelope
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn field_errors(&self, field: &str) -> Vec<String> {
        self.body["field_errors"][field]
            .as_array()
            .map(|messages| {
                messages
                    .iter()
                    .filter_map(|m| m.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub struct Tokens {
    pub access: String,
    pub refresh: String,
}

/// Full router over the in-memory store, driven with `oneshot`
pub struct TestApp {
    router: Router,
}

/// Development preset with cheap hashing and throttling off
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.password_hash_rounds = 1_000;
    config.throttle.enabled = false;
    config
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            router: app(AppState::in_memory(config)),
        }
    }

    /// Throttling on, limited to exactly the given scopes
    pub fn with_rates(rates: &[(Scope, &str)]) -> Self {
        let mut config = test_config();
        config.throttle.enabled = true;
        config.throttle.rates = rates
            .iter()
            .map(|(scope, rate)| (*scope, rate.parse().expect("valid rate")))
            .collect();
        Self::with_config(config)
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
        client_ip: Option<&str>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(ip) = client_ip {
            builder = builder.header("x-forwarded-for", ip);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };

        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn get(&self, path: &str) -> Result<TestResponse> {
        self.request(Method::GET, path, None, None, None).await
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::GET, path, Some(token), None, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, path, None, Some(body), None).await
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, path, Some(token), Some(body), None).await
    }

    pub async fn patch_auth(&self, path: &str, token: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::PATCH, path, Some(token), Some(body), None).await
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::DELETE, path, Some(token), None, None).await
    }

    /// Register `username` and return its token pair
    pub async fn register(&self, username: &str) -> Result<Tokens> {
        let res = self
            .post("/auth/registrar/", registration(username))
            .await?;
        anyhow::ensure!(
            res.status == StatusCode::CREATED,
            "registration failed: {} {}",
            res.status,
            res.body
        );

        let tokens = &res.data()["tokens"];
        Ok(Tokens {
            access: tokens["access"].as_str().context("access token")?.to_string(),
            refresh: tokens["refresh"].as_str().context("refresh token")?.to_string(),
        })
    }

    pub async fn create_professional(&self, token: &str, nome: &str, email: &str) -> Result<i64> {
        let res = self
            .post_auth("/profissionais/", token, professional(nome, email))
            .await?;
        anyhow::ensure!(
            res.status == StatusCode::CREATED,
            "professional creation failed: {} {}",
            res.status,
            res.body
        );
        res.data()["id"].as_i64().context("professional id")
    }

    pub async fn create_appointment(
        &self,
        token: &str,
        profissional_id: i64,
        data_hora: &str,
    ) -> Result<i64> {
        let res = self
            .post_auth(
                "/consultas/",
                token,
                json!({
                    "profissional_id": profissional_id,
                    "paciente_nome": "Paciente Teste",
                    "data_hora": data_hora,
                }),
            )
            .await?;
        anyhow::ensure!(
            res.status == StatusCode::CREATED,
            "appointment creation failed: {} {}",
            res.status,
            res.body
        );
        res.data()["id"].as_i64().context("appointment id")
    }
}

pub fn registration(username: &str) -> Value {
    json!({
        "username": username,
        "email": format!("{}@teste.com", username),
        "first_name": "Teste",
        "last_name": "Usuário",
        "senha": PASSWORD,
        "confirmar_senha": PASSWORD,
    })
}

pub fn professional(nome: &str, email: &str) -> Value {
    json!({
        "nome": nome,
        "especialidade": "Clínica Geral",
        "email": email,
        "telefone": "(11)99999-9999",
    })
}

/// RFC 3339 timestamp `days` from now, at a whole hour
pub fn days_from_now(days: i64, hour: u32) -> String {
    use chrono::{Duration, Timelike, Utc};

    let base = Utc::now() + Duration::days(days);
    base.with_hour(hour)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(base)
        .to_rfc3339()
}
