//! Lifecycle phases

/// The phases a batch drains, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Init,
    Restore,
    Start,
    Reset,
    Restart,
    Leave,
    Visit,
    Update,
}

impl Phase {
    /// Every phase in drain order
    pub const ALL: [Phase; 8] = [
        Phase::Init,
        Phase::Restore,
        Phase::Start,
        Phase::Reset,
        Phase::Restart,
        Phase::Leave,
        Phase::Visit,
        Phase::Update,
    ];

    /// Queue index of this phase
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Restore => "restore",
            Phase::Start => "start",
            Phase::Reset => "reset",
            Phase::Restart => "restart",
            Phase::Leave => "leave",
            Phase::Visit => "visit",
            Phase::Update => "update",
        }
    }
}
