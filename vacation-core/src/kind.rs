use std::fmt;

use serde::{Deserialize, Serialize};

/// The three kinds of bookable inventory.
///
/// The declaration order is significant: customer reservation lists are
/// sorted by `(kind, id)` and rely on the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationKind {
    Car,
    Flight,
    Room,
}

impl ReservationKind {
    pub const ALL: [ReservationKind; 3] = [
        ReservationKind::Car,
        ReservationKind::Flight,
        ReservationKind::Room,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Dense index, usable for per-kind arrays.
    pub fn index(self) -> usize {
        match self {
            ReservationKind::Car => 0,
            ReservationKind::Flight => 1,
            ReservationKind::Room => 2,
        }
    }

    /// Inverse of [`ReservationKind::index`], wrapping modulo the number of kinds.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::COUNT]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationKind::Car => "CAR",
            ReservationKind::Flight => "FLIGHT",
            ReservationKind::Room => "ROOM",
        }
    }
}

impl fmt::Display for ReservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
