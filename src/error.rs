/// Misuse of a [`Timing`](crate::timing::Timing). These are caller defects, not
/// runtime conditions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimingError {
    #[error("timing already started")]
    AlreadyStarted,
    #[error("end called before start")]
    NotStarted,
    #[error("timing already ended")]
    AlreadyEnded,
    #[error("invalid portion {0}: must be finite and not negative")]
    InvalidPortion(f64),
}

#[derive(Debug, thiserror::Error)]
pub enum BattleError {
    #[error("question sequence is empty")]
    NoQuestions,
    #[error("turn abandoned: no answer source and no timer left for the question")]
    TurnAbandoned,
    #[error(transparent)]
    Timing(#[from] TimingError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}
