use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TripodGroup
// ---------------------------------------------------------------------------

/// One of the two fixed three-leg groups of the tripod gait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripodGroup {
    A,
    B,
}

impl TripodGroup {
    pub const ALL: [Self; 2] = [Self::A, Self::B];

    /// Index into a `[_; 2]` group table.
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    /// The opposite group.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for TripodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "groupA"),
            Self::B => write!(f, "groupB"),
        }
    }
}

// ---------------------------------------------------------------------------
// TripodGroups
// ---------------------------------------------------------------------------

/// Leg membership of both tripod groups.
///
/// Validated by [`HexapodConfig::validate`](crate::config::HexapodConfig::validate)
/// to be disjoint and to cover every leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripodGroups(pub [[usize; 3]; 2]);

impl Default for TripodGroups {
    fn default() -> Self {
        // A: front-right, middle-left, rear-right. B: the mirror tripod.
        Self([[0, 2, 4], [1, 3, 5]])
    }
}

impl TripodGroups {
    /// Legs belonging to `group`.
    pub const fn legs(&self, group: TripodGroup) -> &[usize; 3] {
        &self.0[group.index()]
    }

    /// Group that owns `leg`. Legs not listed fall into group B.
    pub fn group_of(&self, leg: usize) -> TripodGroup {
        if self.0[0].contains(&leg) {
            TripodGroup::A
        } else {
            TripodGroup::B
        }
    }

    /// Whether `leg` belongs to `group`.
    pub fn contains(&self, group: TripodGroup, leg: usize) -> bool {
        self.legs(group).contains(&leg)
    }
}

// ---------------------------------------------------------------------------
// JointKind
// ---------------------------------------------------------------------------

/// The three joints of a leg, proximal to distal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointKind {
    Coxa,
    Femur,
    Tibia,
}

impl JointKind {
    pub const ALL: [Self; 3] = [Self::Coxa, Self::Femur, Self::Tibia];

    pub const fn index(self) -> usize {
        match self {
            Self::Coxa => 0,
            Self::Femur => 1,
            Self::Tibia => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Coxa => "coxa",
            Self::Femur => "femur",
            Self::Tibia => "tibia",
        }
    }
}

impl fmt::Display for JointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
