use std::fmt;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum PositionState {
    #[default]
    Flat,
    Positioned,
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionState::Flat => write!(f, "FLAT"),
            PositionState::Positioned => write!(f, "POSITIONED"),
        }
    }
}
