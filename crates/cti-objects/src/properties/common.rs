//! Properties every STIX object carries: identity, version timestamps and
//! the shared optional metadata.

use cti_types::{StixId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::properties::{PropertyKind, PropertySet};
use crate::types::ObjectType;
use crate::validation::{check_not_blank, Violation, ViolationKind};

/// STIX specification version stamped on every new object.
pub const SPEC_VERSION: &str = "2.1";

pub(crate) const FIELDS: &[&str] = &[
    "type",
    "spec_version",
    "id",
    "created",
    "modified",
    "created_by_ref",
    "revoked",
    "labels",
    "confidence",
    "lang",
];

/// Members that must be present in any canonical form.
pub const REQUIRED_FIELDS: &[&str] = &["type", "spec_version", "id", "created", "modified"];

const MAX_CONFIDENCE: u8 = 100;

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonProperties {
    #[serde(rename = "type")]
    object_type: String,
    spec_version: String,
    id: StixId,
    created: Timestamp,
    modified: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_by_ref: Option<StixId>,
    #[serde(default, skip_serializing_if = "is_false")]
    revoked: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lang: Option<String>,
}

impl CommonProperties {
    /// Fresh identity with `created == modified == now`.
    pub(crate) fn new(object_type: ObjectType) -> Self {
        let now = Timestamp::now();
        Self {
            object_type: object_type.as_str().to_string(),
            spec_version: SPEC_VERSION.to_string(),
            id: object_type.generate_id(),
            created: now,
            modified: now,
            created_by_ref: None,
            revoked: false,
            labels: Vec::new(),
            confidence: None,
            lang: None,
        }
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn spec_version(&self) -> &str {
        &self.spec_version
    }

    pub fn id(&self) -> &StixId {
        &self.id
    }

    pub fn created(&self) -> Timestamp {
        self.created
    }

    pub fn modified(&self) -> Timestamp {
        self.modified
    }

    pub fn created_by_ref(&self) -> Option<&StixId> {
        self.created_by_ref.as_ref()
    }

    pub fn set_created_by_ref(&mut self, identity: Option<StixId>) {
        self.created_by_ref = identity;
    }

    pub fn revoked(&self) -> bool {
        self.revoked
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn add_label(&mut self, label: impl Into<String>) {
        self.labels.push(label.into());
    }

    pub fn set_labels(&mut self, labels: Vec<String>) {
        self.labels = labels;
    }

    pub fn confidence(&self) -> Option<u8> {
        self.confidence
    }

    pub fn set_confidence(&mut self, confidence: Option<u8>) {
        self.confidence = confidence;
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn set_lang(&mut self, lang: Option<String>) {
        self.lang = lang;
    }

    /// Stamp a modification time strictly after `previous`.
    pub(crate) fn supersede(&mut self, previous: &CommonProperties) {
        self.modified = Timestamp::after(&previous.modified);
    }

    pub(crate) fn mark_revoked(&mut self) {
        self.revoked = true;
    }

    #[cfg(test)]
    pub(crate) fn set_modified(&mut self, modified: Timestamp) {
        self.modified = modified;
    }
}

impl PropertySet for CommonProperties {
    const KIND: PropertyKind = PropertyKind::Common;

    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        if !self.id.is_type(&self.object_type) {
            violations.push(Violation::new(
                "id",
                ViolationKind::Inconsistent,
                format!("id prefix does not match type {:?}", self.object_type),
            ));
        }
        if self.spec_version != SPEC_VERSION {
            violations.push(Violation::malformed(
                "spec_version",
                format!("expected {SPEC_VERSION:?}, got {:?}", self.spec_version),
            ));
        }
        if self.modified < self.created {
            violations.push(Violation::new(
                "modified",
                ViolationKind::Inconsistent,
                "must not be earlier than created",
            ));
        }
        if let Some(creator) = &self.created_by_ref {
            if !creator.is_type("identity") {
                violations.push(Violation::malformed(
                    "created_by_ref",
                    "must reference an identity object",
                ));
            }
        }
        if self.labels.iter().any(|l| l.trim().is_empty()) {
            violations.push(Violation::malformed("labels", "labels must not be blank"));
        }
        if let Some(confidence) = self.confidence {
            if confidence > MAX_CONFIDENCE {
                violations.push(Violation::new(
                    "confidence",
                    ViolationKind::OutOfRange,
                    format!("must be between 0 and {MAX_CONFIDENCE}"),
                ));
            }
        }
        check_not_blank("lang", self.lang.as_deref(), &mut violations);

        violations
    }
}
