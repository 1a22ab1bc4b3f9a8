//! Type-erased entity as held by the storage engines

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::base::{BaseModel, Entity};
use super::class::EntityClass;
use super::models::{Amenity, City, Place, Review, State, User};
use crate::domain::DomainError;

/// Field carrying the class name in serialized records
pub const CLASS_TAG: &str = "__class__";

const BASE_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Any registered entity.
///
/// Serializes as the entity's own fields plus a `__class__` tag, which is
/// what lets the file engine rebuild the concrete type on reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__class__")]
pub enum Record {
    State(State),
    City(City),
    User(User),
    Place(Place),
    Review(Review),
    Amenity(Amenity),
}

impl Record {
    pub fn class(&self) -> EntityClass {
        match self {
            Self::State(_) => EntityClass::State,
            Self::City(_) => EntityClass::City,
            Self::User(_) => EntityClass::User,
            Self::Place(_) => EntityClass::Place,
            Self::Review(_) => EntityClass::Review,
            Self::Amenity(_) => EntityClass::Amenity,
        }
    }

    pub fn base(&self) -> &BaseModel {
        match self {
            Self::State(e) => e.base(),
            Self::City(e) => e.base(),
            Self::User(e) => e.base(),
            Self::Place(e) => e.base(),
            Self::Review(e) => e.base(),
            Self::Amenity(e) => e.base(),
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseModel {
        match self {
            Self::State(e) => e.base_mut(),
            Self::City(e) => e.base_mut(),
            Self::User(e) => e.base_mut(),
            Self::Place(e) => e.base_mut(),
            Self::Review(e) => e.base_mut(),
            Self::Amenity(e) => e.base_mut(),
        }
    }

    pub fn id(&self) -> &str {
        self.base().id()
    }

    /// `"<ClassName>.<id>"`
    pub fn storage_key(&self) -> String {
        self.class().storage_key(self.id())
    }

    /// Parent ids for each foreign key the class declares, in declaration order
    pub fn parent_ids(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::City(city) => vec![("state_id", city.state_id.as_str())],
            Self::Place(place) => vec![
                ("city_id", place.city_id.as_str()),
                ("user_id", place.user_id.as_str()),
            ],
            Self::Review(review) => vec![
                ("place_id", review.place_id.as_str()),
                ("user_id", review.user_id.as_str()),
            ],
            Self::State(_) | Self::User(_) | Self::Amenity(_) => Vec::new(),
        }
    }

    /// Tagged JSON object holding every attribute of the entity
    pub fn to_dict(&self) -> Result<Value, DomainError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuilds a record from its tagged JSON form
    pub fn from_dict(value: Value) -> Result<Self, DomainError> {
        let class = value
            .get(CLASS_TAG)
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::serialization(format!("missing '{}' tag", CLASS_TAG)))?;

        // Reject unregistered names with the registry error rather than serde's
        EntityClass::from_name(class)?;

        Ok(serde_json::from_value(value)?)
    }

    /// Type-specific attributes only, without identity, timestamps or tag
    pub fn fields(&self) -> Result<Map<String, Value>, DomainError> {
        let mut map = match self.to_dict()? {
            Value::Object(map) => map,
            other => {
                return Err(DomainError::serialization(format!(
                    "entity serialized to non-object value: {}",
                    other
                )));
            }
        };

        map.remove(CLASS_TAG);
        for field in BASE_FIELDS {
            map.remove(field);
        }

        Ok(map)
    }

    /// Inverse of [`Record::fields`]
    pub fn from_parts(
        class: EntityClass,
        base: &BaseModel,
        fields: Map<String, Value>,
    ) -> Result<Self, DomainError> {
        let mut map = fields;

        if let Value::Object(base_map) = serde_json::to_value(base)? {
            map.extend(base_map);
        }
        map.insert(CLASS_TAG.to_string(), Value::String(class.name().to_string()));

        Self::from_dict(Value::Object(map))
    }
}

macro_rules! impl_from_entity {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Record {
                fn from(entity: $ty) -> Self {
                    Self::$ty(entity)
                }
            }
        )+
    };
}

impl_from_entity!(State, City, User, Place, Review, Amenity);
