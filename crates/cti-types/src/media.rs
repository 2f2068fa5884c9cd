//! Media types a collection may accept for submissions.

/// STIX 2.1 content.
pub const STIX_21_MEDIA_TYPE: &str = "application/stix+json;version=2.1";

/// TAXII 2.1 envelopes.
pub const TAXII_21_MEDIA_TYPE: &str = "application/taxii+json;version=2.1";
