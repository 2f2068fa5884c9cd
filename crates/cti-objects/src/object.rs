//! Type-erased objects and the canonical form.

use cti_types::{StixId, Timestamp};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ObjectError, ObjectResult};
use crate::properties::common::REQUIRED_FIELDS;
use crate::properties::{CommonProperties, PropertyKind};
use crate::types::{AttackPattern, Campaign, IntrusionSet, Malware, ObjectType, StixObject, Tool};
use crate::validation::Violation;

/// Any registered object type.
///
/// This is what stores and protocol layers handle: it is constructed by type
/// name, decoded from the canonical form by its `type` member, and forwards
/// every operation to the concrete composed type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Object {
    AttackPattern(AttackPattern),
    Campaign(Campaign),
    IntrusionSet(IntrusionSet),
    Malware(Malware),
    Tool(Tool),
}

/// Run `$body` against the concrete object inside every variant.
macro_rules! dispatch {
    ($object:expr, $inner:ident => $body:expr) => {
        match $object {
            Object::AttackPattern($inner) => $body,
            Object::Campaign($inner) => $body,
            Object::IntrusionSet($inner) => $body,
            Object::Malware($inner) => $body,
            Object::Tool($inner) => $body,
        }
    };
}

macro_rules! impl_from {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Object {
                fn from(obj: $variant) -> Self {
                    Object::$variant(obj)
                }
            }
        )*
    };
}

impl_from!(AttackPattern, Campaign, IntrusionSet, Malware, Tool);

impl Object {
    /// Create a new object of a registered type with a fresh identity and
    /// `created == modified`.
    pub fn new(type_name: &str) -> ObjectResult<Self> {
        Ok(Self::of_type(type_name.parse()?))
    }

    pub fn of_type(object_type: ObjectType) -> Self {
        match object_type {
            ObjectType::AttackPattern => AttackPattern::new().into(),
            ObjectType::Campaign => Campaign::new().into(),
            ObjectType::IntrusionSet => IntrusionSet::new().into(),
            ObjectType::Malware => Malware::new().into(),
            ObjectType::Tool => Tool::new().into(),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        dispatch!(self, o => stix_type_of(o))
    }

    pub fn common(&self) -> &CommonProperties {
        dispatch!(self, o => o.common())
    }

    pub fn common_mut(&mut self) -> &mut CommonProperties {
        dispatch!(self, o => o.common_mut())
    }

    pub fn id(&self) -> &StixId {
        self.common().id()
    }

    pub fn created(&self) -> Timestamp {
        self.common().created()
    }

    pub fn modified(&self) -> Timestamp {
        self.common().modified()
    }

    /// The pair that uniquely identifies this version.
    pub fn version_key(&self) -> (StixId, Timestamp) {
        (self.id().clone(), self.modified())
    }

    /// Every violation reported by the composed properties.
    pub fn validate(&self) -> Vec<Violation> {
        dispatch!(self, o => o.validate())
    }

    /// `Ok(())` when valid, otherwise `ObjectError::Validation` with all
    /// violations.
    pub fn ensure_valid(&self) -> ObjectResult<()> {
        let violations = self.validate();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ObjectError::Validation(violations))
        }
    }

    /// Which property of this object's type owns a JSON field.
    pub fn field_owner(&self, field: &str) -> Option<PropertyKind> {
        match self.object_type() {
            ObjectType::AttackPattern => AttackPattern::field_owner(field),
            ObjectType::Campaign => Campaign::field_owner(field),
            ObjectType::IntrusionSet => IntrusionSet::field_owner(field),
            ObjectType::Malware => Malware::field_owner(field),
            ObjectType::Tool => Tool::field_owner(field),
        }
    }

    /// Same identity, strictly later `modified`; `self` is not changed.
    pub fn new_version(&self) -> Self {
        dispatch!(self, o => o.new_version().into())
    }

    /// A new version with `revoked` set.
    pub fn revoke(&self) -> Self {
        dispatch!(self, o => o.revoke().into())
    }

    /// Compact JSON encoding. Unset optional fields are omitted.
    pub fn to_canonical_form(&self) -> ObjectResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ObjectError::Serialization(e.to_string()))
    }

    /// Decode the canonical form.
    ///
    /// Missing required members are reported together as
    /// `ObjectError::Validation`. Members that no property of the decoded type
    /// owns are dropped and logged at debug level. Field-level validation is
    /// not run here; call [`Object::ensure_valid`] before persisting.
    pub fn from_canonical_form(bytes: &[u8]) -> ObjectResult<Self> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| ObjectError::Serialization(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> ObjectResult<Self> {
        let members = value.as_object().ok_or_else(|| {
            ObjectError::Serialization("canonical form must be a JSON object".into())
        })?;

        let missing: Vec<Violation> = REQUIRED_FIELDS
            .iter()
            .filter(|field| !members.contains_key(**field))
            .map(|field| Violation::missing(field))
            .collect();
        if !missing.is_empty() {
            return Err(ObjectError::Validation(missing));
        }

        let object_type: ObjectType = members
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ObjectError::Validation(vec![Violation::malformed("type", "must be a string")])
            })?
            .parse()?;

        let dropped = unowned_members(object_type, members);
        if !dropped.is_empty() {
            debug!(
                object_type = %object_type,
                dropped = ?dropped,
                "ignoring members the type does not compose"
            );
        }

        let decoded = match object_type {
            ObjectType::AttackPattern => serde_json::from_value(value).map(Object::AttackPattern),
            ObjectType::Campaign => serde_json::from_value(value).map(Object::Campaign),
            ObjectType::IntrusionSet => serde_json::from_value(value).map(Object::IntrusionSet),
            ObjectType::Malware => serde_json::from_value(value).map(Object::Malware),
            ObjectType::Tool => serde_json::from_value(value).map(Object::Tool),
        };
        decoded.map_err(|e| ObjectError::Serialization(e.to_string()))
    }
}

/// Members of `members` that no property of `object_type` owns.
fn unowned_members(object_type: ObjectType, members: &Map<String, Value>) -> Vec<String> {
    let owner: fn(&str) -> Option<PropertyKind> = match object_type {
        ObjectType::AttackPattern => AttackPattern::field_owner,
        ObjectType::Campaign => Campaign::field_owner,
        ObjectType::IntrusionSet => IntrusionSet::field_owner,
        ObjectType::Malware => Malware::field_owner,
        ObjectType::Tool => Tool::field_owner,
    };
    members
        .keys()
        .filter(|field| owner(field.as_str()).is_none())
        .cloned()
        .collect()
}

fn stix_type_of<T: StixObject>(_: &T) -> ObjectType {
    T::TYPE
}

impl<'de> Deserialize<'de> for Object {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Object::from_value(value).map_err(serde::de::Error::custom)
    }
}
