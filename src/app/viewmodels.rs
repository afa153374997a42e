//! View models for the demo screens.
//!
//! Each one folds its inputs through a reducer. Collaborator calls happen in
//! the stream pipeline, never inside the reducers.

use std::sync::Arc;

use futures::stream::{self, BoxStream};
use futures::{future, StreamExt};

use crate::app::services::{Account, AccountService, AuthOutcome, AuthService, Credentials, Token};
use crate::viewmodel::{
    latest, try_reduce_states, BindGuard, Collaborator, InputStream, Intent, OutputEvent,
    OutputStream, Reducer, UiState, ViewModel,
};

// -- Login -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginInput {
    EmailChanged(String),
    PasswordChanged(String),
    Submit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginState {
    pub email: String,
    pub password_len: usize,
    pub submitting: bool,
    pub error: Option<String>,
    pub token: Option<Token>,
}

impl UiState for LoginState {}

pub enum LoginIntent {
    EmailChanged(String),
    PasswordChanged(usize),
    Submitted,
    Answered(AuthOutcome),
}

impl Intent for LoginIntent {}

pub struct LoginReducer;

impl Reducer for LoginReducer {
    type State = LoginState;
    type Intent = LoginIntent;

    fn reduce(state: LoginState, intent: LoginIntent) -> LoginState {
        match intent {
            LoginIntent::EmailChanged(email) => LoginState {
                email,
                error: None,
                ..state
            },
            LoginIntent::PasswordChanged(password_len) => LoginState {
                password_len,
                error: None,
                ..state
            },
            LoginIntent::Submitted => LoginState {
                submitting: true,
                error: None,
                ..state
            },
            LoginIntent::Answered(AuthOutcome::Granted(token)) => LoginState {
                submitting: false,
                token: Some(token),
                ..state
            },
            LoginIntent::Answered(AuthOutcome::Rejected(reason)) => LoginState {
                submitting: false,
                error: Some(reason),
                ..state
            },
        }
    }
}

pub struct LoginViewModel {
    guard: BindGuard,
    auth: Arc<AuthService>,
}

impl LoginViewModel {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self {
            guard: BindGuard::new(),
            auth,
        }
    }
}

impl ViewModel for LoginViewModel {
    type Input = LoginInput;
    type Output = LoginState;

    fn bind_guard(&self) -> &BindGuard {
        &self.guard
    }

    fn transform_input(&mut self, input: InputStream<LoginInput>) -> OutputStream<LoginState> {
        let auth = Arc::clone(&self.auth);
        let intents = input
            .scan(Credentials::default(), move |form, event| {
                let intents: BoxStream<'static, OutputEvent<LoginIntent>> = match event {
                    LoginInput::EmailChanged(email) => {
                        form.email = email.clone();
                        stream::iter([Ok(LoginIntent::EmailChanged(email))]).boxed()
                    }
                    LoginInput::PasswordChanged(password) => {
                        let len = password.len();
                        form.password = password;
                        stream::iter([Ok(LoginIntent::PasswordChanged(len))]).boxed()
                    }
                    LoginInput::Submit => {
                        let auth = Arc::clone(&auth);
                        let credentials = form.clone();
                        stream::iter([Ok(LoginIntent::Submitted)])
                            .chain(stream::once(async move {
                                auth.call(credentials).await.map(LoginIntent::Answered)
                            }))
                            .boxed()
                    }
                };
                future::ready(Some(intents))
            })
            .flatten();
        try_reduce_states::<LoginReducer, _>(intents, LoginState::default())
    }
}

// -- Dashboard ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardInput {
    Refresh,
    Select(String),
    SignOut,
}

/// A navigation request raised by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardNav {
    Open(String),
    SignOut,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardState {
    pub accounts: Vec<Account>,
    pub loading: bool,
    /// Set only on the state produced by the navigating input.
    pub nav: Option<DashboardNav>,
    /// Bumped with every navigation request so repeats still render.
    pub nav_serial: u64,
}

impl DashboardState {
    pub fn total_cents(&self) -> i64 {
        self.accounts.iter().map(|a| a.balance_cents).sum()
    }
}

impl UiState for DashboardState {}

pub enum DashboardIntent {
    Loading,
    Loaded(Vec<Account>),
    Navigate(DashboardNav),
}

impl Intent for DashboardIntent {}

pub struct DashboardReducer;

impl Reducer for DashboardReducer {
    type State = DashboardState;
    type Intent = DashboardIntent;

    fn reduce(state: DashboardState, intent: DashboardIntent) -> DashboardState {
        match intent {
            DashboardIntent::Loading => DashboardState {
                loading: true,
                nav: None,
                ..state
            },
            DashboardIntent::Loaded(accounts) => DashboardState {
                accounts,
                loading: false,
                nav: None,
                ..state
            },
            DashboardIntent::Navigate(nav) => DashboardState {
                nav: Some(nav),
                nav_serial: state.nav_serial + 1,
                ..state
            },
        }
    }
}

pub struct DashboardViewModel {
    guard: BindGuard,
    accounts: Arc<AccountService>,
    token: Token,
}

impl DashboardViewModel {
    pub fn new(accounts: Arc<AccountService>, token: Token) -> Self {
        Self {
            guard: BindGuard::new(),
            accounts,
            token,
        }
    }
}

impl ViewModel for DashboardViewModel {
    type Input = DashboardInput;
    type Output = DashboardState;

    fn bind_guard(&self) -> &BindGuard {
        &self.guard
    }

    /// Loads once on bind, then on every `Refresh`. Inputs are handled one
    /// at a time, so a selection made during a refresh is applied after it.
    fn transform_input(
        &mut self,
        input: InputStream<DashboardInput>,
    ) -> OutputStream<DashboardState> {
        let service = Arc::clone(&self.accounts);
        let access_token = self.token.access_token.clone();
        let intents = stream::once(future::ready(DashboardInput::Refresh))
            .chain(input)
            .flat_map(move |event| -> BoxStream<'static, OutputEvent<DashboardIntent>> {
                match event {
                    DashboardInput::Refresh => {
                        let service = Arc::clone(&service);
                        let access_token = access_token.clone();
                        stream::iter([Ok(DashboardIntent::Loading)])
                            .chain(stream::once(async move {
                                service.call(access_token).await.map(DashboardIntent::Loaded)
                            }))
                            .boxed()
                    }
                    DashboardInput::Select(id) => {
                        stream::iter([Ok(DashboardIntent::Navigate(DashboardNav::Open(id)))])
                            .boxed()
                    }
                    DashboardInput::SignOut => {
                        stream::iter([Ok(DashboardIntent::Navigate(DashboardNav::SignOut))])
                            .boxed()
                    }
                }
            });
        try_reduce_states::<DashboardReducer, _>(intents, DashboardState::default())
    }
}

// -- Account detail ----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailInput {
    Refresh,
    Close,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailState {
    pub account: Option<Account>,
    /// How many refreshes produced a result.
    pub refreshes: u32,
    pub closed: bool,
}

impl UiState for DetailState {}

pub enum DetailIntent {
    Loaded(Option<Account>),
    Closed,
}

impl Intent for DetailIntent {}

pub struct DetailReducer;

impl Reducer for DetailReducer {
    type State = DetailState;
    type Intent = DetailIntent;

    fn reduce(state: DetailState, intent: DetailIntent) -> DetailState {
        match intent {
            DetailIntent::Loaded(account) => DetailState {
                account,
                refreshes: state.refreshes + 1,
                ..state
            },
            DetailIntent::Closed => DetailState {
                closed: true,
                ..state
            },
        }
    }
}

pub struct AccountDetailViewModel {
    guard: BindGuard,
    accounts: Arc<AccountService>,
    token: Token,
    account_id: String,
}

impl AccountDetailViewModel {
    pub fn new(accounts: Arc<AccountService>, token: Token, account_id: impl Into<String>) -> Self {
        Self {
            guard: BindGuard::new(),
            accounts,
            token,
            account_id: account_id.into(),
        }
    }
}

impl ViewModel for AccountDetailViewModel {
    type Input = DetailInput;
    type Output = DetailState;

    fn bind_guard(&self) -> &BindGuard {
        &self.guard
    }

    /// Last write wins: a refresh (or close) drops the refresh still in
    /// flight, so an older balance never overwrites a newer one.
    fn transform_input(&mut self, input: InputStream<DetailInput>) -> OutputStream<DetailState> {
        let service = Arc::clone(&self.accounts);
        let access_token = self.token.access_token.clone();
        let account_id = self.account_id.clone();
        let intents = latest(
            stream::once(future::ready(DetailInput::Refresh)).chain(input),
            move |event| {
                let service = Arc::clone(&service);
                let access_token = access_token.clone();
                let account_id = account_id.clone();
                async move {
                    match event {
                        DetailInput::Refresh => service.call(access_token).await.map(|accounts| {
                            DetailIntent::Loaded(accounts.into_iter().find(|a| a.id == account_id))
                        }),
                        DetailInput::Close => Ok(DetailIntent::Closed),
                    }
                }
            },
        );
        try_reduce_states::<DetailReducer, _>(intents, DetailState::default())
    }
}
