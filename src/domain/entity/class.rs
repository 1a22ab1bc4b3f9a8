//! Closed registry of persisted entity classes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Every entity class the storage engines know about.
///
/// The set is fixed at compile time. Names coming from callers are resolved
/// through [`EntityClass::from_name`] and anything outside the set is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityClass {
    State,
    City,
    User,
    Place,
    Review,
    Amenity,
}

/// A parent reference declared by an entity class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    /// Column holding the parent id
    pub column: &'static str,
    /// Class the column points at
    pub references: EntityClass,
}

impl EntityClass {
    /// Registered classes, parents before children
    pub const ALL: [EntityClass; 6] = [
        EntityClass::State,
        EntityClass::City,
        EntityClass::User,
        EntityClass::Place,
        EntityClass::Review,
        EntityClass::Amenity,
    ];

    /// Looks a class up by its exact name
    pub fn from_name(name: &str) -> Result<Self, DomainError> {
        Self::ALL
            .into_iter()
            .find(|class| class.name() == name)
            .ok_or_else(|| DomainError::unknown_class(name))
    }

    /// Stable class name, used as the storage key prefix
    pub fn name(&self) -> &'static str {
        match self {
            Self::State => "State",
            Self::City => "City",
            Self::User => "User",
            Self::Place => "Place",
            Self::Review => "Review",
            Self::Amenity => "Amenity",
        }
    }

    /// Backing relation in the database engine
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::State => "states",
            Self::City => "cities",
            Self::User => "users",
            Self::Place => "places",
            Self::Review => "reviews",
            Self::Amenity => "amenities",
        }
    }

    pub fn foreign_keys(&self) -> &'static [ForeignKey] {
        match self {
            Self::City => &[ForeignKey {
                column: "state_id",
                references: EntityClass::State,
            }],
            Self::Place => &[
                ForeignKey {
                    column: "city_id",
                    references: EntityClass::City,
                },
                ForeignKey {
                    column: "user_id",
                    references: EntityClass::User,
                },
            ],
            Self::Review => &[
                ForeignKey {
                    column: "place_id",
                    references: EntityClass::Place,
                },
                ForeignKey {
                    column: "user_id",
                    references: EntityClass::User,
                },
            ],
            Self::State | Self::User | Self::Amenity => &[],
        }
    }

    /// Builds the `"<ClassName>.<id>"` storage key
    pub fn storage_key(&self, id: &str) -> String {
        format!("{}.{}", self.name(), id)
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}
