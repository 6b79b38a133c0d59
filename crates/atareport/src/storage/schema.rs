//! Stored document shapes.
//!
//! Documents on disk were written by several generations of the service.
//! The types here accept every one of those shapes: each field is optional
//! so that nothing is lost or rejected before the normalizer decides how to
//! fill it in.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Read `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A block as found on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoredBlock {
    /// Sub-heading.
    pub title: Option<String>,
    /// Rich-text HTML.
    pub content: Option<String>,
    /// Internal subject, absent in older documents.
    pub assunto: Option<String>,
    /// Internal owner, absent in older documents.
    pub responsavel: Option<String>,
}

/// A section entry of `sectionsList` as found on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoredSection {
    /// Department tag; may be missing or unknown.
    #[serde(rename = "type")]
    pub section_type: Option<String>,
    /// Display label.
    pub title: Option<String>,
    /// Content blocks.
    #[serde(deserialize_with = "null_as_default")]
    pub blocks: Vec<StoredBlock>,
    /// UI lock flag.
    pub completed: Option<bool>,
}

/// One of the pre-`sectionsList` top-level sections (`fiscal`, `dp`,
/// `contabil`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoredLegacySection {
    /// Content blocks.
    #[serde(deserialize_with = "null_as_default")]
    pub blocks: Vec<StoredBlock>,
    /// UI lock flag.
    pub completed: Option<bool>,
}

/// A form document as found on disk, in any historical shape.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredForm {
    /// Present in current documents only.
    pub sections_list: Option<Vec<StoredSection>>,
    /// Header metadata, kept raw so `null` values can be dropped.
    pub header_data: Option<Map<String, Value>>,
    /// Questionnaire, kept raw so missing keys can be detected.
    pub form_info: Option<Map<String, Value>>,
    /// PDF flag, absent in older documents.
    pub pdf_gerado: Option<bool>,
    /// Legacy fiscal section.
    pub fiscal: Option<StoredLegacySection>,
    /// Legacy personnel section.
    pub dp: Option<StoredLegacySection>,
    /// Legacy accounting section.
    pub contabil: Option<StoredLegacySection>,
}

/// Legacy sections carried by a stored document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacySections {
    /// Fiscal section.
    pub fiscal: Option<StoredLegacySection>,
    /// Personnel section.
    pub dp: Option<StoredLegacySection>,
    /// Accounting section.
    pub contabil: Option<StoredLegacySection>,
}

/// Which generation of the document layout a stored form uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredShape {
    /// Sections live in `sectionsList`; legacy keys, if any, are mirrors.
    Current {
        /// The section list.
        sections: Vec<StoredSection>,
        /// Mirrors kept for older clients.
        mirrors: LegacySections,
    },
    /// Sections live only in the legacy top-level keys.
    Legacy(LegacySections),
}

/// The parts of a stored form that do not depend on its shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredCommon {
    /// Raw header metadata.
    pub header_data: Option<Map<String, Value>>,
    /// Raw questionnaire.
    pub form_info: Option<Map<String, Value>>,
    /// PDF flag.
    pub pdf_gerado: Option<bool>,
}

impl StoredForm {
    /// Parse a stored document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object of a known shape.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Resolve the document layout once, separating shape-specific parts
    /// from common ones.
    #[must_use]
    pub fn into_shape(self) -> (StoredShape, StoredCommon) {
        let legacy = LegacySections {
            fiscal: self.fiscal,
            dp: self.dp,
            contabil: self.contabil,
        };
        let shape = match self.sections_list {
            Some(sections) => StoredShape::Current {
                sections,
                mirrors: legacy,
            },
            None => StoredShape::Legacy(legacy),
        };
        let common = StoredCommon {
            header_data: self.header_data,
            form_info: self.form_info,
            pdf_gerado: self.pdf_gerado,
        };
        (shape, common)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_current_shape() {
        let stored = StoredForm::from_json(
            r#"{"sectionsList": [{"type": "fiscal", "blocks": [{"title": "A"}]}], "pdfGerado": true}"#,
        )
        .unwrap();
        let (shape, common) = stored.into_shape();
        assert_eq!(common.pdf_gerado, Some(true));
        match shape {
            StoredShape::Current { sections, mirrors } => {
                assert_eq!(sections.len(), 1);
                assert_eq!(sections[0].section_type.as_deref(), Some("fiscal"));
                assert_eq!(sections[0].blocks[0].title.as_deref(), Some("A"));
                assert!(sections[0].blocks[0].assunto.is_none());
                assert_eq!(mirrors, LegacySections::default());
            }
            StoredShape::Legacy(_) => panic!("expected current shape"),
        }
    }

    #[test]
    fn test_parse_legacy_shape() {
        let stored = StoredForm::from_json(
            r#"{"fiscal": {"blocks": [{"title": "F"}], "completed": true}, "dp": {"blocks": []}}"#,
        )
        .unwrap();
        let (shape, common) = stored.into_shape();
        assert!(common.form_info.is_none());
        match shape {
            StoredShape::Legacy(legacy) => {
                assert!(legacy.fiscal.is_some());
                assert!(legacy.dp.is_some());
                assert!(legacy.contabil.is_none());
            }
            StoredShape::Current { .. } => panic!("expected legacy shape"),
        }
    }

    #[test]
    fn test_null_fields_are_absent() {
        let stored =
            StoredForm::from_json(r#"{"sectionsList": null, "pdfGerado": null}"#).unwrap();
        assert!(stored.sections_list.is_none());
        assert!(stored.pdf_gerado.is_none());
    }

    #[test]
    fn test_null_blocks_read_as_empty() {
        let stored = StoredForm::from_json(
            r#"{"sectionsList": [{"type": "fiscal", "blocks": null}], "dp": {"blocks": null}}"#,
        )
        .unwrap();
        assert!(stored.sections_list.unwrap()[0].blocks.is_empty());
        assert!(stored.dp.unwrap().blocks.is_empty());
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(StoredForm::from_json("[1, 2]").is_err());
        assert!(StoredForm::from_json("{not json").is_err());
    }
}
