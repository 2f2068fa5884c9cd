//! Registered object types and the composition machinery that builds them.
//!
//! An object type is declared as a fixed list of property traits. The
//! [`stix_object!`] macro generates, for each declaration:
//!
//! - the struct, with one `#[serde(flatten)]` field per property
//! - a `HasProperty<P>` impl per property
//! - the [`StixObject`] impl: validation as the union of every property's
//!   violations, and the field dispatch table

use std::fmt;
use std::str::FromStr;

use cti_types::StixId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ObjectError;
use crate::properties::{
    AliasesProperty, CommonProperties, DescriptionProperty, HasProperty,
    KillChainPhasesProperty, NameProperty, PropertyKind, PropertySet, SeenProperty,
};
use crate::validation::{Violation, ViolationKind};

/// Every object type this model can construct and decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectType {
    AttackPattern,
    Campaign,
    IntrusionSet,
    Malware,
    Tool,
}

impl ObjectType {
    pub const ALL: [ObjectType; 5] = [
        Self::AttackPattern,
        Self::Campaign,
        Self::IntrusionSet,
        Self::Malware,
        Self::Tool,
    ];

    /// The STIX `type` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AttackPattern => "attack-pattern",
            Self::Campaign => "campaign",
            Self::IntrusionSet => "intrusion-set",
            Self::Malware => "malware",
            Self::Tool => "tool",
        }
    }

    /// A fresh identity for an object of this type.
    pub fn generate_id(&self) -> StixId {
        StixId::generate(self.as_str()).expect("registered type names are valid STIX types")
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = ObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ObjectError::UnknownType(s.to_string()))
    }
}

/// Behaviour shared by every composed object type.
pub trait StixObject:
    HasProperty<CommonProperties> + Clone + Serialize + DeserializeOwned
{
    /// The registered type this struct represents.
    const TYPE: ObjectType;

    /// The properties this type composes, common first.
    const PROPERTIES: &'static [PropertyKind];

    /// Union of the violations reported by every composed property.
    fn validate(&self) -> Vec<Violation>;

    fn common(&self) -> &CommonProperties {
        self.property()
    }

    fn common_mut(&mut self) -> &mut CommonProperties {
        self.property_mut()
    }

    /// Which composed property owns a JSON field, if any.
    fn field_owner(field: &str) -> Option<PropertyKind> {
        Self::PROPERTIES
            .iter()
            .copied()
            .find(|kind| kind.fields().contains(&field))
    }

    /// A copy of this object with the same identity and a strictly later
    /// `modified` timestamp. `self` is left untouched.
    fn new_version(&self) -> Self {
        let mut next = self.clone();
        next.common_mut().supersede(self.common());
        next
    }

    /// A new version marked as revoked.
    fn revoke(&self) -> Self {
        let mut next = self.new_version();
        next.common_mut().mark_revoked();
        next
    }
}

/// Checks that belong to the type declaration rather than to any one
/// property: the `type` member must name the struct's own type.
fn check_declared_type(common: &CommonProperties, expected: ObjectType) -> Option<Violation> {
    (common.object_type() != expected.as_str()).then(|| {
        Violation::new(
            "type",
            ViolationKind::Inconsistent,
            format!("expected {expected}, got {:?}", common.object_type()),
        )
    })
}

macro_rules! stix_object {
    (
        $(#[$meta:meta])*
        $name:ident => $object_type:ident {
            $($field:ident: $property:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(flatten)]
            pub common: CommonProperties,
            $(
                #[serde(flatten)]
                pub $field: $property,
            )*
        }

        impl $name {
            /// A new object with a fresh identity and no optional fields set.
            pub fn new() -> Self {
                Self {
                    common: CommonProperties::new(ObjectType::$object_type),
                    $($field: <$property>::default(),)*
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl HasProperty<CommonProperties> for $name {
            fn property(&self) -> &CommonProperties {
                &self.common
            }

            fn property_mut(&mut self) -> &mut CommonProperties {
                &mut self.common
            }
        }

        $(
            impl HasProperty<$property> for $name {
                fn property(&self) -> &$property {
                    &self.$field
                }

                fn property_mut(&mut self) -> &mut $property {
                    &mut self.$field
                }
            }
        )*

        impl StixObject for $name {
            const TYPE: ObjectType = ObjectType::$object_type;
            const PROPERTIES: &'static [PropertyKind] = &[
                PropertyKind::Common,
                $(<$property as PropertySet>::KIND,)*
            ];

            fn validate(&self) -> Vec<Violation> {
                let mut violations = Vec::new();
                violations.extend(check_declared_type(&self.common, Self::TYPE));
                violations.extend(self.common.validate());
                $(violations.extend(self.$field.validate());)*
                violations
            }
        }
    };
}

stix_object! {
    /// Attack Pattern: a tactic, technique or procedure adversaries use.
    AttackPattern => AttackPattern {
        name: NameProperty,
        description: DescriptionProperty,
        kill_chain_phases: KillChainPhasesProperty,
    }
}

stix_object! {
    /// Campaign: a grouping of adversarial behaviour over a period of time.
    Campaign => Campaign {
        name: NameProperty,
        description: DescriptionProperty,
        aliases: AliasesProperty,
        seen: SeenProperty,
    }
}

stix_object! {
    /// Intrusion Set: behaviours and resources attributed to one organization.
    IntrusionSet => IntrusionSet {
        name: NameProperty,
        description: DescriptionProperty,
        aliases: AliasesProperty,
        seen: SeenProperty,
    }
}

stix_object! {
    /// Malware: malicious code or a family of it.
    Malware => Malware {
        name: NameProperty,
        description: DescriptionProperty,
        kill_chain_phases: KillChainPhasesProperty,
        aliases: AliasesProperty,
        seen: SeenProperty,
    }
}

stix_object! {
    /// Tool: legitimate software that adversaries can use.
    Tool => Tool {
        name: NameProperty,
        description: DescriptionProperty,
        kill_chain_phases: KillChainPhasesProperty,
        aliases: AliasesProperty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::KillChainPhase;

    #[test]
    fn object_type_parse_roundtrip() {
        for t in ObjectType::ALL {
            assert_eq!(t.as_str().parse::<ObjectType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = "indicator".parse::<ObjectType>().unwrap_err();
        assert_eq!(err, ObjectError::UnknownType("indicator".into()));
    }

    #[test]
    fn fresh_object_without_optional_fields_is_valid() {
        assert!(AttackPattern::new().validate().is_empty());
        assert!(Campaign::new().validate().is_empty());
        assert!(IntrusionSet::new().validate().is_empty());
        assert!(Malware::new().validate().is_empty());
        assert!(Tool::new().validate().is_empty());
    }

    #[test]
    fn dispatch_table_maps_fields_to_owners() {
        assert_eq!(AttackPattern::field_owner("id"), Some(PropertyKind::Common));
        assert_eq!(AttackPattern::field_owner("name"), Some(PropertyKind::Name));
        assert_eq!(
            AttackPattern::field_owner("kill_chain_phases"),
            Some(PropertyKind::KillChainPhases)
        );
        // Not composed into attack-pattern.
        assert_eq!(AttackPattern::field_owner("aliases"), None);
        assert_eq!(Campaign::field_owner("last_seen"), Some(PropertyKind::Seen));
        assert_eq!(Tool::field_owner("first_seen"), None);
    }

    #[test]
    fn validation_is_union_of_properties() {
        let mut malware = Malware::new();
        malware.name.set_name("");
        malware.description.set_description(" ");
        malware
            .kill_chain_phases
            .add_kill_chain_phase(KillChainPhase::new("mitre-attack", "Initial Access"));
        malware.aliases.set_aliases(vec!["x".into(), "x".into()]);
        malware.common.set_confidence(Some(101));

        let fields: Vec<String> = malware.validate().into_iter().map(|v| v.field).collect();
        assert_eq!(
            fields,
            vec!["confidence", "name", "description", "kill_chain_phases", "aliases"]
        );
    }

    #[test]
    fn new_version_keeps_identity_and_leaves_input_untouched() {
        let mut original = Campaign::new();
        original.name.set_name("Operation Aurora");
        let snapshot = original.clone();

        let next = original.new_version();
        assert_eq!(next.common.id(), original.common.id());
        assert_eq!(next.common.created(), original.common.created());
        assert!(next.common.modified() > original.common.modified());
        assert_eq!(next.name.name(), Some("Operation Aurora"));
        assert_eq!(original, snapshot);
    }

    #[test]
    fn revoke_is_a_new_version() {
        let tool = Tool::new();
        let revoked = tool.revoke();
        assert!(revoked.common.revoked());
        assert!(!tool.common.revoked());
        assert!(revoked.common.modified() > tool.common.modified());
    }

    #[test]
    fn mismatched_type_member_is_reported() {
        let mut json = serde_json::to_value(Tool::new()).unwrap();
        json["type"] = "malware".into();
        let decoded: Tool = serde_json::from_value(json).unwrap();
        let violations = decoded.validate();
        assert!(violations.iter().any(|v| v.field == "type"));
        // The id prefix no longer matches the type either.
        assert!(violations.iter().any(|v| v.field == "id"));
    }
}
