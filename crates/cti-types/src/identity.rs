use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Separator between the object type and the UUID in a [`StixId`].
const ID_SEPARATOR: &str = "--";

const MIN_TYPE_LEN: usize = 3;
const MAX_TYPE_LEN: usize = 250;

/// Check that `object_type` is a well-formed STIX type name.
///
/// Type names are 3 to 250 characters of lowercase ASCII letters, digits and
/// single hyphens, starting with a letter.
pub fn validate_object_type(object_type: &str) -> Result<(), TypeError> {
    let fail = |reason: &str| {
        Err(TypeError::InvalidObjectType {
            value: object_type.to_string(),
            reason: reason.into(),
        })
    };

    if object_type.len() < MIN_TYPE_LEN || object_type.len() > MAX_TYPE_LEN {
        return fail("must be between 3 and 250 characters");
    }
    if !object_type.starts_with(|c: char| c.is_ascii_lowercase()) {
        return fail("must start with a lowercase letter");
    }
    if !object_type
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return fail("may only contain a-z, 0-9 and '-'");
    }
    if object_type.contains(ID_SEPARATOR) || object_type.ends_with('-') {
        return fail("must not contain '--' or end with '-'");
    }
    Ok(())
}

/// Identity of a STIX object, shared by every version of that object.
///
/// Rendered as `{object_type}--{uuid}`. Two versions of the same object have
/// equal `StixId`s and differ only in their modification timestamp.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StixId {
    object_type: String,
    uuid: Uuid,
}

impl StixId {
    /// Generate a fresh identity for the given object type.
    ///
    /// UUIDv4 entropy is the only collision defense; no storage lookup is
    /// performed here.
    pub fn generate(object_type: &str) -> Result<Self, TypeError> {
        Self::from_parts(object_type, Uuid::new_v4())
    }

    /// Build an identity from a type name and an existing UUID.
    pub fn from_parts(object_type: &str, uuid: Uuid) -> Result<Self, TypeError> {
        validate_object_type(object_type)?;
        Ok(Self {
            object_type: object_type.to_string(),
            uuid,
        })
    }

    /// Parse an identity of the form `type--UUID`.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = |reason: String| TypeError::InvalidIdentifier {
            value: s.to_string(),
            reason,
        };

        let (object_type, uuid) = s
            .split_once(ID_SEPARATOR)
            .ok_or_else(|| invalid("missing '--' separator".into()))?;
        validate_object_type(object_type).map_err(|e| invalid(e.to_string()))?;
        let uuid = Uuid::parse_str(uuid).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            object_type: object_type.to_string(),
            uuid,
        })
    }

    /// The object type portion (e.g. `attack-pattern`).
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// The UUID portion.
    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    /// Returns `true` if this identity names an object of `object_type`.
    pub fn is_type(&self, object_type: &str) -> bool {
        self.object_type == object_type
    }
}

impl fmt::Debug for StixId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StixId({self})")
    }
}

impl fmt::Display for StixId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.object_type, ID_SEPARATOR, self.uuid.hyphenated())
    }
}

impl FromStr for StixId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StixId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StixId> for String {
    fn from(id: StixId) -> Self {
        id.to_string()
    }
}

/// Identifier of a collection (UUIDv4).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionId(Uuid);

impl CollectionId {
    /// Generate a fresh random collection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from the hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidIdentifier {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Short representation (first 8 characters).
    pub fn short_id(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionId({})", self.short_id())
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for CollectionId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CollectionId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CollectionId> for String {
    fn from(id: CollectionId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_stamps_type_and_v4_uuid() {
        let id = StixId::generate("attack-pattern").unwrap();
        assert_eq!(id.object_type(), "attack-pattern");
        assert_eq!(id.uuid().get_version_num(), 4);
        assert!(id.to_string().starts_with("attack-pattern--"));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = StixId::generate("malware").unwrap();
        let b = StixId::generate("malware").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_display_roundtrip() {
        let s = "campaign--8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3f";
        let id = StixId::parse(s).unwrap();
        assert_eq!(id.to_string(), s);
        assert_eq!(id.object_type(), "campaign");
        assert!(id.is_type("campaign"));
    }

    #[test]
    fn parse_rejects_missing_separator() {
        let err = StixId::parse("campaign-8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3f").unwrap_err();
        assert!(matches!(err, TypeError::InvalidIdentifier { .. }));
    }

    #[test]
    fn parse_rejects_bad_uuid() {
        assert!(StixId::parse("campaign--not-a-uuid").is_err());
    }

    #[test]
    fn parse_rejects_uppercase_type() {
        assert!(StixId::parse("Campaign--8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3f").is_err());
    }

    #[test]
    fn object_type_rules() {
        assert!(validate_object_type("tool").is_ok());
        assert!(validate_object_type("x-acme-widget").is_ok());
        assert!(validate_object_type("ab").is_err());
        assert!(validate_object_type("1abc").is_err());
        assert!(validate_object_type("bad_type").is_err());
        assert!(validate_object_type("trailing-").is_err());
        assert!(validate_object_type(&"a".repeat(251)).is_err());
    }

    #[test]
    fn stix_id_serde_is_plain_string() {
        let id = StixId::parse("tool--3c9f7e0d-4d1c-4f8a-a1b4-0c5b8e6b1f2a").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"tool--3c9f7e0d-4d1c-4f8a-a1b4-0c5b8e6b1f2a\"");
        let parsed: StixId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn stix_id_serde_rejects_garbage() {
        assert!(serde_json::from_str::<StixId>("\"nonsense\"").is_err());
    }

    #[test]
    fn collection_id_roundtrip() {
        let id = CollectionId::new();
        let parsed = CollectionId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(id.short_id().len(), 8);
    }

    #[test]
    fn collection_id_rejects_garbage() {
        assert!(CollectionId::parse("not-a-uuid").is_err());
    }
}
