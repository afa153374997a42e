//! Demo application: sign in, browse accounts, open one, sign out.
//!
//! Exercises the whole core. The binary drives it with [`script::play`];
//! integration tests drive it the same way.

mod coordinators;
pub mod script;
mod services;
mod viewmodels;
mod views;

use std::sync::Arc;
use std::time::Duration;

pub use coordinators::{
    AccountDetailCoordinator, AppCoordinator, DashboardCoordinator, LoginCoordinator, Services,
};
pub use services::{Account, AccountService, AuthOutcome, AuthService, Credentials, Token};
pub use viewmodels::{
    AccountDetailViewModel, DashboardInput, DashboardNav, DashboardState, DashboardViewModel,
    DetailInput, DetailState, LoginInput, LoginState, LoginViewModel,
};
pub use views::{DashboardHandle, DetailHandle, LoginHandle, ViewRegistry};

pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "Secret123";

/// Flow events of the demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    LoggedIn { token: Token },
    AccountSelected(String),
    DetailClosed,
    SignedOut,
}

impl Services {
    /// One known user and the sample accounts, each call taking `latency`.
    pub fn demo(latency: Duration) -> Self {
        Self {
            auth: Arc::new(AuthService::new(latency).with_user(DEMO_EMAIL, DEMO_PASSWORD)),
            accounts: Arc::new(AccountService::sample(latency)),
        }
    }
}
