use std::fmt;

/// Coordinator lifecycle.
///
/// `NotStarted -> Active -> Finished`. A coordinator may also go straight
/// from `NotStarted` to `Finished` when its parent is torn down first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    NotStarted,
    Active,
    Finished,
}

impl LifecycleState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not_started",
            Self::Active => "active",
            Self::Finished => "finished",
        };
        f.write_str(label)
    }
}
