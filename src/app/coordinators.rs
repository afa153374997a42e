//! The demo flow graph.
//!
//! ```text
//! AppCoordinator
//!   ├── LoginCoordinator            (until LoggedIn)
//!   └── DashboardCoordinator        (until SignedOut)
//!         └── AccountDetailCoordinator
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::services::{AccountService, AuthService, Token};
use crate::app::viewmodels::{
    AccountDetailViewModel, DashboardInput, DashboardNav, DashboardState, DashboardViewModel,
    DetailInput, DetailState, LoginInput, LoginState, LoginViewModel,
};
use crate::app::views::ViewRegistry;
use crate::app::AppEvent;
use crate::binder::RecordingView;
use crate::coordinator::{Completion, Coordinator, CoordinatorId, FinishReason, FlowContext};
use crate::error::FlowResult;
use crate::host::ScreenDescriptor;

/// Collaborators shared by every flow.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthService>,
    pub accounts: Arc<AccountService>,
}

/// Root: alternates between the login and dashboard flows.
pub struct AppCoordinator {
    services: Services,
    views: ViewRegistry,
    sessions: u32,
}

impl AppCoordinator {
    pub fn new(services: Services, views: ViewRegistry) -> Self {
        Self {
            services,
            views,
            sessions: 0,
        }
    }

    fn start_login(&self, ctx: &mut FlowContext<AppEvent>) -> FlowResult<CoordinatorId> {
        ctx.start_child(LoginCoordinator::new(
            Arc::clone(&self.services.auth),
            self.views.clone(),
        ))
    }
}

#[async_trait]
impl Coordinator<AppEvent> for AppCoordinator {
    fn name(&self) -> &'static str {
        "app"
    }

    async fn start(&mut self, ctx: &mut FlowContext<AppEvent>) -> FlowResult {
        self.start_login(ctx)?;
        Ok(())
    }

    async fn child_did_finish(
        &mut self,
        ctx: &mut FlowContext<AppEvent>,
        completion: Completion<AppEvent>,
    ) -> FlowResult {
        match (completion.reason, completion.result) {
            (FinishReason::Completed, Some(AppEvent::LoggedIn { token })) => {
                self.sessions += 1;
                tracing::info!(session = self.sessions, "signed in");
                ctx.start_child(DashboardCoordinator::new(
                    token,
                    Arc::clone(&self.services.accounts),
                    self.views.clone(),
                ))?;
            }
            (FinishReason::Completed, Some(AppEvent::SignedOut)) => {
                tracing::info!(session = self.sessions, "signed out");
                self.start_login(ctx)?;
            }
            (reason, _) => {
                tracing::info!(child = completion.name, %reason, "flow ended without a successor");
                ctx.finish(None);
            }
        }
        Ok(())
    }
}

pub struct LoginCoordinator {
    auth: Arc<AuthService>,
    views: ViewRegistry,
}

impl LoginCoordinator {
    pub fn new(auth: Arc<AuthService>, views: ViewRegistry) -> Self {
        Self { auth, views }
    }
}

#[async_trait]
impl Coordinator<AppEvent> for LoginCoordinator {
    fn name(&self) -> &'static str {
        "login"
    }

    async fn start(&mut self, ctx: &mut FlowContext<AppEvent>) -> FlowResult {
        let screen = ctx
            .present(ScreenDescriptor::new("login").with_title("Sign in"))
            .await?;
        let (handle, view) = RecordingView::<LoginInput, LoginState>::new("login");
        let mut view_model = LoginViewModel::new(Arc::clone(&self.auth));
        ctx.bind_routed(screen, view, &mut view_model, |state| {
            state
                .token
                .clone()
                .map(|token| AppEvent::LoggedIn { token })
        })?;
        self.views.publish_login(handle);
        Ok(())
    }

    async fn handle_event(&mut self, ctx: &mut FlowContext<AppEvent>, event: AppEvent) -> FlowResult {
        match event {
            AppEvent::LoggedIn { token } => ctx.finish(Some(AppEvent::LoggedIn { token })),
            other => tracing::debug!(event = ?other, "login ignores event"),
        }
        Ok(())
    }
}

pub struct DashboardCoordinator {
    token: Token,
    accounts: Arc<AccountService>,
    views: ViewRegistry,
    detail: Option<CoordinatorId>,
}

impl DashboardCoordinator {
    pub fn new(token: Token, accounts: Arc<AccountService>, views: ViewRegistry) -> Self {
        Self {
            token,
            accounts,
            views,
            detail: None,
        }
    }
}

#[async_trait]
impl Coordinator<AppEvent> for DashboardCoordinator {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    async fn start(&mut self, ctx: &mut FlowContext<AppEvent>) -> FlowResult {
        let screen = ctx
            .present(ScreenDescriptor::new("dashboard").with_title("Accounts"))
            .await?;
        let (handle, view) = RecordingView::<DashboardInput, DashboardState>::new("dashboard");
        let mut view_model =
            DashboardViewModel::new(Arc::clone(&self.accounts), self.token.clone());
        ctx.bind_routed(screen, view, &mut view_model, |state| match &state.nav {
            Some(DashboardNav::Open(id)) => Some(AppEvent::AccountSelected(id.clone())),
            Some(DashboardNav::SignOut) => Some(AppEvent::SignedOut),
            None => None,
        })?;
        self.views.publish_dashboard(handle);
        Ok(())
    }

    async fn handle_event(&mut self, ctx: &mut FlowContext<AppEvent>, event: AppEvent) -> FlowResult {
        match event {
            AppEvent::AccountSelected(account_id) => {
                if let Some(open) = self.detail {
                    tracing::debug!(detail = %open, %account_id, "detail already open");
                    return Ok(());
                }
                let detail = AccountDetailCoordinator::new(
                    self.token.clone(),
                    account_id,
                    Arc::clone(&self.accounts),
                    self.views.clone(),
                );
                self.detail = Some(ctx.start_child(detail)?);
            }
            AppEvent::SignedOut => ctx.finish(Some(AppEvent::SignedOut)),
            other => tracing::debug!(event = ?other, "dashboard ignores event"),
        }
        Ok(())
    }

    async fn child_did_finish(
        &mut self,
        _ctx: &mut FlowContext<AppEvent>,
        completion: Completion<AppEvent>,
    ) -> FlowResult {
        if self.detail == Some(completion.id) {
            self.detail = None;
        }
        Ok(())
    }
}

pub struct AccountDetailCoordinator {
    token: Token,
    account_id: String,
    accounts: Arc<AccountService>,
    views: ViewRegistry,
}

impl AccountDetailCoordinator {
    pub fn new(
        token: Token,
        account_id: String,
        accounts: Arc<AccountService>,
        views: ViewRegistry,
    ) -> Self {
        Self {
            token,
            account_id,
            accounts,
            views,
        }
    }
}

#[async_trait]
impl Coordinator<AppEvent> for AccountDetailCoordinator {
    fn name(&self) -> &'static str {
        "account_detail"
    }

    async fn start(&mut self, ctx: &mut FlowContext<AppEvent>) -> FlowResult {
        let screen = ctx
            .present(ScreenDescriptor::new("account_detail").with_param("account", &self.account_id))
            .await?;
        let (handle, view) = RecordingView::<DetailInput, DetailState>::new("account_detail");
        let mut view_model = AccountDetailViewModel::new(
            Arc::clone(&self.accounts),
            self.token.clone(),
            self.account_id.clone(),
        );
        ctx.bind_routed(screen, view, &mut view_model, |state| {
            state.closed.then_some(AppEvent::DetailClosed)
        })?;
        self.views.publish_detail(handle);
        Ok(())
    }

    async fn handle_event(&mut self, ctx: &mut FlowContext<AppEvent>, event: AppEvent) -> FlowResult {
        if event == AppEvent::DetailClosed {
            ctx.finish(None);
        }
        Ok(())
    }
}
