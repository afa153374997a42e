//! In-memory auth and account collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorFailure;
use crate::viewmodel::Collaborator;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Issued on a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// A login attempt that reached the service. Wrong credentials are an
/// answer, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted(Token),
    Rejected(String),
}

pub struct AuthService {
    users: HashMap<String, String>,
    latency: Duration,
    issued: AtomicU64,
}

impl AuthService {
    pub fn new(latency: Duration) -> Self {
        Self {
            users: HashMap::new(),
            latency,
            issued: AtomicU64::new(0),
        }
    }

    pub fn with_user(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(email.into().to_lowercase(), password.into());
        self
    }
}

#[async_trait]
impl Collaborator for AuthService {
    type Request = Credentials;
    type Response = AuthOutcome;

    fn name(&self) -> &'static str {
        "auth"
    }

    async fn call(&self, request: Credentials) -> Result<AuthOutcome, CollaboratorFailure> {
        tokio::time::sleep(self.latency).await;

        if request.password.len() < MIN_PASSWORD_LEN {
            return Ok(AuthOutcome::Rejected(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let known = self
            .users
            .get(&request.email.to_lowercase())
            .is_some_and(|password| *password == request.password);
        if !known {
            tracing::debug!(email = %request.email, "login rejected");
            return Ok(AuthOutcome::Rejected("invalid email or password".to_string()));
        }

        let serial = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(AuthOutcome::Granted(Token {
            access_token: format!("access-{serial}"),
            refresh_token: format!("refresh-{serial}"),
            token_type: "bearer".to_string(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub account_type: String,
    pub masked_number: String,
    pub balance_cents: i64,
    pub currency: String,
}

impl Account {
    fn new(id: &str, name: &str, account_type: &str, last4: &str, balance_cents: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            account_type: account_type.to_string(),
            masked_number: format!("****{last4}"),
            balance_cents,
            currency: "USD".to_string(),
        }
    }
}

/// Lists the accounts visible to an access token.
pub struct AccountService {
    accounts: Vec<Account>,
    latency: Duration,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl AccountService {
    pub fn new(accounts: Vec<Account>, latency: Duration) -> Self {
        Self {
            accounts,
            latency,
            unavailable: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Checking, savings and credit sample accounts.
    pub fn sample(latency: Duration) -> Self {
        Self::new(
            vec![
                Account::new("acc-1", "Everyday Checking", "checking", "4821", 254_310),
                Account::new("acc-2", "Rainy Day Savings", "savings", "9034", 1_200_000),
                Account::new("acc-3", "Travel Card", "credit", "1177", 43_295),
            ],
            latency,
        )
    }

    /// Make every following call fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Collaborator for AccountService {
    /// The access token.
    type Request = String;
    type Response = Vec<Account>;

    fn name(&self) -> &'static str {
        "accounts"
    }

    async fn call(&self, access_token: String) -> Result<Vec<Account>, CollaboratorFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollaboratorFailure::new(self.name(), "service unavailable"));
        }
        if access_token.is_empty() {
            return Err(CollaboratorFailure::new(self.name(), "missing access token"));
        }
        Ok(self.accounts.clone())
    }
}
