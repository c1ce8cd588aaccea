// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Named-field access and filtering for catalog records.
//!
//! Every record kind exposes a closed table of named fields. Lookups are keyed
//! by name at runtime so users can filter on any published attribute
//! (`--filter BuildID --filter-value 20H115`) without the filter knowing the
//! attribute set ahead of time.
//!
//! Field names are matched ASCII case-insensitively with `_` and `-` ignored,
//! so `BuildID`, `buildid` and `build_id` all refer to the same field.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;

use crate::types::{Device, Firmware};

/// The value of one named field.
#[derive(Clone, Copy)]
pub enum FieldValue<'a> {
    Int(i64),
    Uint(u64),
    Str(&'a str),
    Bool(bool),
    /// Any value with a human-readable string form.
    Display(&'a dyn fmt::Display),
    /// No string form for filtering purposes.
    Timestamp(DateTime<Utc>),
}

impl FieldValue<'_> {
    /// String form used by the filter, or `None` for unsupported kinds.
    pub fn to_filter_string(&self) -> Option<String> {
        match self {
            Self::Int(v) => Some(v.to_string()),
            Self::Uint(v) => Some(v.to_string()),
            Self::Str(s) => Some((*s).to_string()),
            Self::Bool(true) => Some("true".to_string()),
            Self::Bool(false) => Some("false".to_string()),
            Self::Display(d) => Some(d.to_string()),
            Self::Timestamp(_) => None,
        }
    }

    /// JSON form used by the directory template context.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(v) => Value::from(*v),
            Self::Uint(v) => Value::from(*v),
            Self::Str(s) => Value::from(*s),
            Self::Bool(b) => Value::from(*b),
            Self::Display(d) => Value::from(d.to_string()),
            Self::Timestamp(t) => Value::from(t.to_rfc3339()),
        }
    }
}

impl fmt::Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "Int({})", v),
            Self::Uint(v) => write!(f, "Uint({})", v),
            Self::Str(s) => write!(f, "Str({:?})", s),
            Self::Bool(b) => write!(f, "Bool({})", b),
            Self::Display(d) => write!(f, "Display({})", d),
            Self::Timestamp(t) => write!(f, "Timestamp({})", t.to_rfc3339()),
        }
    }
}

/// A record whose fields can be looked up by name.
pub trait Record {
    /// Canonical field names, in presentation order.
    const FIELDS: &'static [&'static str];

    /// Look up a field. Returns `None` for unknown names and for optional
    /// fields the catalog left empty.
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;

    /// All present fields under their canonical names.
    fn fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        Self::FIELDS
            .iter()
            .filter_map(|name| self.field(name).map(|value| (*name, value)))
            .collect()
    }
}

/// Normalise a user-supplied field name for lookup.
///
/// Lookup is intentionally looser than exact name matching: it ignores ASCII case
/// and drops `_` and `-`. Every exact canonical name still resolves, so this
/// accepts a superset of the names exact lookup would. The per-record tables
/// add short digest aliases (`sha1`, `md5`, `sha256`) on top.
fn canonical(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl Record for Firmware {
    const FIELDS: &'static [&'static str] = &[
        "Identifier",
        "Version",
        "BuildID",
        "SHA1Sum",
        "MD5Sum",
        "SHA256Sum",
        "FileSize",
        "URL",
        "Signed",
        "ReleaseDate",
        "UploadDate",
    ];

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match canonical(name).as_str() {
            "identifier" => FieldValue::Str(&self.identifier),
            "version" => FieldValue::Str(&self.version),
            "buildid" => FieldValue::Str(&self.build_id),
            "sha1sum" | "sha1" => FieldValue::Display(&self.sha1),
            "md5sum" | "md5" => FieldValue::Display(self.md5.as_ref()?),
            "sha256sum" | "sha256" => FieldValue::Display(self.sha256.as_ref()?),
            "filesize" => FieldValue::Uint(self.file_size),
            "url" => FieldValue::Str(&self.url),
            "signed" => FieldValue::Bool(self.signed),
            "releasedate" => FieldValue::Timestamp(self.release_date?),
            "uploaddate" => FieldValue::Timestamp(self.upload_date),
            _ => return None,
        };
        Some(value)
    }
}

impl Record for Device {
    const FIELDS: &'static [&'static str] =
        &["Identifier", "Name", "BoardConfig", "Platform", "CPID", "BDID"];

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match canonical(name).as_str() {
            "identifier" => FieldValue::Str(&self.identifier),
            "name" => FieldValue::Str(&self.name),
            "boardconfig" => FieldValue::Str(self.board_config.as_deref()?),
            "platform" => FieldValue::Str(self.platform.as_deref()?),
            "cpid" => FieldValue::Uint(self.cpid?),
            "bdid" => FieldValue::Uint(self.bdid?),
            _ => return None,
        };
        Some(value)
    }
}

/// Whether `name` refers to one of `R`'s canonical fields.
pub fn is_known_field<R: Record>(name: &str) -> bool {
    let wanted = canonical(name);
    R::FIELDS.iter().any(|field| canonical(field) == wanted)
}

/// Test whether `record.<field_name>` stringifies to exactly `target`.
///
/// Unknown fields and unsupported value kinds never match.
pub fn matches<R: Record + ?Sized>(record: &R, field_name: &str, target: &str) -> bool {
    record
        .field(field_name)
        .and_then(|value| value.to_filter_string())
        .is_some_and(|s| s == target)
}

/// A user-supplied field/value filter.
///
/// An empty field or value disables the filter entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub field: String,
    pub value: String,
}

impl FilterSpec {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.field.is_empty() && !self.value.is_empty()
    }

    pub fn passes<R: Record + ?Sized>(&self, record: &R) -> bool {
        !self.is_enabled() || matches(record, &self.field, &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HexDigest;
    use chrono::TimeZone;

    fn firmware() -> Firmware {
        Firmware {
            identifier: "iPhone10,3".to_string(),
            version: "16.7.2".to_string(),
            build_id: "20H115".to_string(),
            sha1: HexDigest::new("0123abcd"),
            md5: None,
            sha256: None,
            file_size: 6_123_456_789,
            url: "https://example.com/iPhone10,3_16.7.2_20H115_Restore.ipsw".to_string(),
            release_date: None,
            upload_date: Utc.with_ymd_and_hms(2023, 10, 25, 17, 11, 3).unwrap(),
            signed: true,
        }
    }

    struct Counter {
        delta: i64,
    }

    impl Record for Counter {
        const FIELDS: &'static [&'static str] = &["Delta"];

        fn field(&self, name: &str) -> Option<FieldValue<'_>> {
            (canonical(name) == "delta").then_some(FieldValue::Int(self.delta))
        }
    }

    #[test]
    fn test_string_field_matches_exactly() {
        let fw = firmware();
        assert!(matches(&fw, "BuildID", "20H115"));
        assert!(!matches(&fw, "BuildID", "20h115"));
        assert!(!matches(&fw, "BuildID", "20H11"));
    }

    #[test]
    fn test_field_name_normalisation() {
        let fw = firmware();
        assert!(matches(&fw, "build_id", "20H115"));
        assert!(matches(&fw, "buildid", "20H115"));
        assert!(matches(&fw, "FILE-SIZE", "6123456789"));
    }

    #[test]
    fn test_boolean_field() {
        let fw = firmware();
        assert!(matches(&fw, "Signed", "true"));
        assert!(!matches(&fw, "Signed", "false"));

        let unsigned = Firmware { signed: false, ..firmware() };
        assert!(matches(&unsigned, "Signed", "false"));
        assert!(!matches(&unsigned, "Signed", "true"));
    }

    #[test]
    fn test_integer_fields_are_base_ten() {
        assert!(matches(&firmware(), "FileSize", "6123456789"));
        assert!(!matches(&firmware(), "FileSize", "6123456789.0"));
        assert!(matches(&Counter { delta: -42 }, "delta", "-42"));
    }

    #[test]
    fn test_display_field_uses_string_form() {
        assert!(matches(&firmware(), "SHA1Sum", "0123abcd"));
    }

    #[test]
    fn test_unknown_field_never_matches() {
        let fw = firmware();
        for target in ["", "true", "20H115", "anything"] {
            assert!(!matches(&fw, "NoSuchField", target));
        }
    }

    #[test]
    fn test_timestamp_field_is_unsupported() {
        let fw = firmware();
        let rendered = fw.upload_date.to_rfc3339();
        assert!(!matches(&fw, "UploadDate", &rendered));
        assert!(!matches(&fw, "UploadDate", ""));
    }

    #[test]
    fn test_absent_optional_field_never_matches() {
        assert!(!matches(&firmware(), "SHA256Sum", ""));
        assert!(!matches(&Device::new("iPad1,1", "iPad"), "Platform", ""));
    }

    #[test]
    fn test_device_fields() {
        let mut device = Device::new("iPad1,1", "iPad");
        device.cpid = Some(35120);
        assert!(matches(&device, "Name", "iPad"));
        assert!(matches(&device, "cpid", "35120"));
        assert_eq!(device.fields().len(), 3);
    }

    #[test]
    fn test_filter_spec_disabled_passes_everything() {
        let fw = firmware();
        assert!(FilterSpec::default().passes(&fw));
        assert!(FilterSpec::new("BuildID", "").passes(&fw));
        assert!(FilterSpec::new("", "20H115").passes(&fw));
        assert!(FilterSpec::new("NoSuchField", "").passes(&fw));
    }

    #[test]
    fn test_filter_spec_enabled() {
        let fw = firmware();
        assert!(FilterSpec::new("Version", "16.7.2").passes(&fw));
        assert!(!FilterSpec::new("Version", "17.0").passes(&fw));
    }

    #[test]
    fn test_known_field_lookup() {
        assert!(is_known_field::<Firmware>("build_id"));
        assert!(is_known_field::<Firmware>("SHA256SUM"));
        assert!(!is_known_field::<Firmware>("Name"));
        assert!(is_known_field::<Device>("Name"));
    }

    #[test]
    fn test_exact_names_resolve_alongside_loose_spellings() {
        let fw = firmware();
        for name in Firmware::FIELDS {
            assert!(is_known_field::<Firmware>(name), "{name}");
        }
        assert!(matches(&fw, "BuildID", "20H115"));
        assert!(matches(&fw, "build-id", "20H115"));
        assert!(matches(&fw, "sha1", "0123abcd"));
    }
}
