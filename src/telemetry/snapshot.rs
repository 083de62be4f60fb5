//! Per-train telemetry snapshot types.

use std::fmt;

/// Identifier the simulator assigns to a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrainId(pub u32);

impl fmt::Display for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who is occupying the engineer seat of a train.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineerKind {
    #[default]
    None,
    Player,
    Ai,
    Remote,
}

impl EngineerKind {
    /// Maps the simulator's numeric engineer type code.
    ///
    /// Unknown codes map to `None` so they can never be mistaken for a player.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Player,
            2 => Self::Ai,
            3 => Self::Remote,
            _ => Self::None,
        }
    }

    /// Parses a textual engineer type, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "player" => Some(Self::Player),
            "ai" => Some(Self::Ai),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_player(self) -> bool {
        matches!(self, Self::Player)
    }
}

/// One telemetry reading for one train at one point in simulation time.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSnapshot {
    pub train_id: TrainId,
    pub engineer_kind: EngineerKind,
    pub engineer_name: String,
    pub train_symbol: String,
    /// Signed; negative while reversing.
    pub speed_mph: f64,
    /// Signed; 0 means the simulator could not determine the limit.
    pub speed_limit_mph: f64,
    pub axle_count: u32,
    pub block_id: u64,
    pub hp_per_ton: f64,
    pub railroad_initials: String,
    pub loco_number: String,
}

impl TrainSnapshot {
    /// Creates a player-driven snapshot with neutral values; adjust with the `with_*` helpers.
    #[must_use]
    pub fn player(train_id: u32, engineer_name: impl Into<String>, train_symbol: impl Into<String>) -> Self {
        Self {
            train_id: TrainId(train_id),
            engineer_kind: EngineerKind::Player,
            engineer_name: engineer_name.into(),
            train_symbol: train_symbol.into(),
            speed_mph: 0.0,
            speed_limit_mph: 40.0,
            axle_count: 0,
            block_id: 0,
            hp_per_ton: 1.0,
            railroad_initials: String::new(),
            loco_number: String::new(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: EngineerKind) -> Self {
        self.engineer_kind = kind;
        self
    }

    #[must_use]
    pub fn with_speed(mut self, speed_mph: f64, speed_limit_mph: f64) -> Self {
        self.speed_mph = speed_mph;
        self.speed_limit_mph = speed_limit_mph;
        self
    }

    #[must_use]
    pub fn with_axles(mut self, axle_count: u32) -> Self {
        self.axle_count = axle_count;
        self
    }

    #[must_use]
    pub fn with_block(mut self, block_id: u64) -> Self {
        self.block_id = block_id;
        self
    }

    #[must_use]
    pub fn with_hp_per_ton(mut self, hp_per_ton: f64) -> Self {
        self.hp_per_ton = hp_per_ton;
        self
    }

    #[must_use]
    pub fn with_loco(mut self, railroad_initials: impl Into<String>, loco_number: impl Into<String>) -> Self {
        self.railroad_initials = railroad_initials.into();
        self.loco_number = loco_number.into();
        self
    }
}
