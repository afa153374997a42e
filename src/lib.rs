//! Navigation coordination and view-model binding.
//!
//! ```text
//! View ──input──→ ViewModel::transform ──output──→ Binder ──render──→ View
//!                                                    │
//!                                           navigation events
//!                                                    ↓
//!                 CoordinatorTree ──→ Coordinator ──→ NavigationHost ──→ RenderSurface
//! ```

pub mod app;
pub mod binder;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod logging;
pub mod shutdown;
pub mod viewmodel;
