//! A scripted user for the demo flow.

use crate::app::services::{Account, Credentials, Token};
use crate::app::viewmodels::{DashboardInput, DetailInput, LoginInput};
use crate::app::views::ViewRegistry;
use crate::error::CollaboratorFailure;

#[derive(Debug, Clone)]
pub struct Script {
    pub credentials: Credentials,
    /// Account to open from the dashboard.
    pub account: String,
}

/// What the scripted user saw. The script stops at the first rejection or
/// failure.
#[derive(Debug, Default)]
pub struct ScriptReport {
    pub token: Option<Token>,
    pub rejection: Option<String>,
    pub accounts: Vec<Account>,
    pub detail: Option<Account>,
    pub failure: Option<CollaboratorFailure>,
    pub signed_out: bool,
}

/// Sign in, open `script.account`, close it, sign out and wait for the
/// login screen to come back.
pub async fn play(views: &ViewRegistry, script: &Script) -> ScriptReport {
    let mut report = ScriptReport::default();

    let login = views.next_login().await;
    login.send(LoginInput::EmailChanged(script.credentials.email.clone()));
    login.send(LoginInput::PasswordChanged(script.credentials.password.clone()));
    login.send(LoginInput::Submit);
    match login
        .wait_for_state(|s| s.token.is_some() || s.error.is_some())
        .await
    {
        Ok(state) if state.error.is_some() => {
            report.rejection = state.error;
            return report;
        }
        Ok(state) => report.token = state.token,
        Err(failure) => {
            report.failure = Some(failure);
            return report;
        }
    }

    let dashboard = views.next_dashboard().await;
    match dashboard.wait_for_state(|s| !s.loading).await {
        Ok(state) => report.accounts = state.accounts,
        Err(failure) => {
            report.failure = Some(failure);
            return report;
        }
    }

    dashboard.send(DashboardInput::Select(script.account.clone()));
    let detail = views.next_detail().await;
    match detail.wait_for_state(|s| s.refreshes > 0).await {
        Ok(state) => report.detail = state.account,
        Err(failure) => {
            report.failure = Some(failure);
            return report;
        }
    }
    detail.send(DetailInput::Close);
    detail.wait_for_teardown().await;

    dashboard.send(DashboardInput::SignOut);
    dashboard.wait_for_teardown().await;
    views.next_login().await;
    report.signed_out = true;
    report
}
