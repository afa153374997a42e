//! Where the demo's coordinators publish the views they bind, so a driver
//! (the binary's script, or a test) can play the user.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::app::viewmodels::{
    DashboardInput, DashboardState, DetailInput, DetailState, LoginInput, LoginState,
};
use crate::binder::ViewHandle;

pub type LoginHandle = ViewHandle<LoginInput, LoginState>;
pub type DashboardHandle = ViewHandle<DashboardInput, DashboardState>;
pub type DetailHandle = ViewHandle<DetailInput, DetailState>;

#[derive(Default)]
struct Slots {
    login: Option<LoginHandle>,
    dashboard: Option<DashboardHandle>,
    detail: Option<DetailHandle>,
}

/// One slot per screen kind. Each published handle is taken exactly once.
#[derive(Clone, Default)]
pub struct ViewRegistry {
    slots: Arc<Mutex<Slots>>,
    published: Arc<Notify>,
}

impl ViewRegistry {
    pub fn publish_login(&self, handle: LoginHandle) {
        self.slots.lock().login = Some(handle);
        self.published.notify_waiters();
    }

    pub fn publish_dashboard(&self, handle: DashboardHandle) {
        self.slots.lock().dashboard = Some(handle);
        self.published.notify_waiters();
    }

    pub fn publish_detail(&self, handle: DetailHandle) {
        self.slots.lock().detail = Some(handle);
        self.published.notify_waiters();
    }

    pub async fn next_login(&self) -> LoginHandle {
        self.take(|slots| slots.login.take()).await
    }

    pub async fn next_dashboard(&self) -> DashboardHandle {
        self.take(|slots| slots.dashboard.take()).await
    }

    pub async fn next_detail(&self) -> DetailHandle {
        self.take(|slots| slots.detail.take()).await
    }

    async fn take<T>(&self, pick: impl Fn(&mut Slots) -> Option<T>) -> T {
        loop {
            let published = self.published.notified();
            tokio::pin!(published);
            published.as_mut().enable();
            if let Some(handle) = pick(&mut self.slots.lock()) {
                return handle;
            }
            published.await;
        }
    }
}
