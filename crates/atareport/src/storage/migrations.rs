//! Document shape migrations for atareport.
//!
//! This module maps every stored document shape onto the canonical
//! [`FormDocument`], recording which fixes were needed so callers can decide
//! whether the normalized document must be written back.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::Result;
use crate::form::{
    Block, FormDocument, FormInfo, HeaderData, LegacySection, Section, SectionType,
    FORM_INFO_KEYS,
};

use super::schema::{
    LegacySections, StoredBlock, StoredForm, StoredLegacySection, StoredSection, StoredShape,
};

/// A single fix applied while normalizing a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Migration {
    /// `pdfGerado` was missing and defaulted to `false`.
    DefaultPdfFlag,
    /// `headerData` was missing and replaced by the default header.
    DefaultHeader,
    /// `formInfo` was missing and synthesized from the canonical default.
    SynthesizeFormInfo,
    /// `formInfo` lacked some keys, which were filled in.
    FillFormInfoFields,
    /// `sectionsList` was built from the legacy section keys.
    SectionsFromLegacy,
    /// A section had a missing or unknown type and became `outros`.
    CoerceSectionType,
    /// A section lacked its title or completion flag.
    FillSectionFields,
    /// A block lacked one of its fields (usually `assunto`/`responsavel`).
    FillBlockFields,
    /// `headerData` or `formInfo` held `null` values, which were dropped.
    DropNullFields,
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DefaultPdfFlag => "default_pdf_flag",
            Self::DefaultHeader => "default_header",
            Self::SynthesizeFormInfo => "synthesize_form_info",
            Self::FillFormInfoFields => "fill_form_info_fields",
            Self::SectionsFromLegacy => "sections_from_legacy",
            Self::CoerceSectionType => "coerce_section_type",
            Self::FillSectionFields => "fill_section_fields",
            Self::FillBlockFields => "fill_block_fields",
            Self::DropNullFields => "drop_null_fields",
        };
        f.write_str(name)
    }
}

/// The outcome of normalizing a stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The document in canonical shape.
    pub document: FormDocument,
    /// Fixes that were applied; empty when the input was already canonical.
    pub applied: BTreeSet<Migration>,
}

impl Normalized {
    /// Whether the stored form differs from the normalized one.
    #[must_use]
    pub fn is_migrated(&self) -> bool {
        !self.applied.is_empty()
    }

    /// Comma-separated migration names, for logging.
    #[must_use]
    pub fn describe(&self) -> String {
        self.applied
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Parse and normalize a stored document.
///
/// # Errors
///
/// Returns an error if the text is not valid JSON or a field holds a value
/// of the wrong type.
pub fn normalize_json(text: &str) -> Result<Normalized> {
    let stored = StoredForm::from_json(text)?;
    normalize(stored)
}

/// Map a stored document of any accepted shape to the canonical shape.
///
/// Normalizing an already canonical document applies no migration, so the
/// operation is idempotent.
///
/// # Errors
///
/// Returns an error if `headerData` or `formInfo` holds a non-null value of
/// the wrong type.
pub fn normalize(stored: StoredForm) -> Result<Normalized> {
    let mut applied = BTreeSet::new();
    let (shape, common) = stored.into_shape();

    let pdf_gerado = common.pdf_gerado.unwrap_or_else(|| {
        applied.insert(Migration::DefaultPdfFlag);
        false
    });

    let header_data = match common.header_data {
        Some(raw) => {
            let raw = without_nulls(raw, &mut applied);
            serde_json::from_value::<HeaderData>(Value::Object(raw))?
        }
        None => {
            applied.insert(Migration::DefaultHeader);
            HeaderData::default()
        }
    };

    let form_info = match common.form_info {
        Some(raw) => normalize_form_info(without_nulls(raw, &mut applied), &mut applied)?,
        None => {
            applied.insert(Migration::SynthesizeFormInfo);
            FormInfo::default()
        }
    };

    let (sections_list, mirrors) = match shape {
        StoredShape::Current { sections, mirrors } => {
            let sections = sections
                .into_iter()
                .map(|s| normalize_section(s, &mut applied))
                .collect();
            (sections, mirrors)
        }
        StoredShape::Legacy(legacy) => {
            applied.insert(Migration::SectionsFromLegacy);
            (sections_from_legacy(&legacy, &mut applied), legacy)
        }
    };

    let document = FormDocument {
        sections_list,
        header_data,
        form_info,
        pdf_gerado,
        fiscal: mirrors.fiscal.map(|s| normalize_mirror(s, &mut applied)),
        dp: mirrors.dp.map(|s| normalize_mirror(s, &mut applied)),
        contabil: mirrors.contabil.map(|s| normalize_mirror(s, &mut applied)),
    };

    Ok(Normalized { document, applied })
}

/// Drop `null` members so the field defaults apply in their place.
fn without_nulls(
    mut raw: Map<String, Value>,
    applied: &mut BTreeSet<Migration>,
) -> Map<String, Value> {
    let before = raw.len();
    raw.retain(|_, value| !value.is_null());
    if raw.len() != before {
        applied.insert(Migration::DropNullFields);
    }
    raw
}

fn normalize_form_info(
    raw: Map<String, Value>,
    applied: &mut BTreeSet<Migration>,
) -> Result<FormInfo> {
    if FORM_INFO_KEYS.iter().any(|key| !raw.contains_key(*key)) {
        applied.insert(Migration::FillFormInfoFields);
    }
    Ok(serde_json::from_value(Value::Object(raw))?)
}

fn normalize_block(block: StoredBlock, applied: &mut BTreeSet<Migration>) -> Block {
    let StoredBlock {
        title,
        content,
        assunto,
        responsavel,
    } = block;
    if title.is_none() || content.is_none() || assunto.is_none() || responsavel.is_none() {
        applied.insert(Migration::FillBlockFields);
    }
    Block {
        title: title.unwrap_or_default(),
        content: content.unwrap_or_default(),
        assunto: assunto.unwrap_or_default(),
        responsavel: responsavel.unwrap_or_default(),
    }
}

fn normalize_blocks(blocks: Vec<StoredBlock>, applied: &mut BTreeSet<Migration>) -> Vec<Block> {
    blocks
        .into_iter()
        .map(|b| normalize_block(b, applied))
        .collect()
}

fn normalize_section(section: StoredSection, applied: &mut BTreeSet<Migration>) -> Section {
    let section_type = match section.section_type.as_deref().map(SectionType::from_tag) {
        Some(Some(t)) => t,
        other => {
            if let Some(None) = other {
                warn!(
                    "Unknown section type {:?}, storing as outros",
                    section.section_type
                );
            }
            applied.insert(Migration::CoerceSectionType);
            SectionType::Outros
        }
    };

    if section.title.is_none() || section.completed.is_none() {
        applied.insert(Migration::FillSectionFields);
    }

    Section {
        section_type,
        title: section
            .title
            .unwrap_or_else(|| section_type.default_title().to_string()),
        blocks: normalize_blocks(section.blocks, applied),
        completed: section.completed.unwrap_or(false),
    }
}

fn normalize_mirror(
    section: StoredLegacySection,
    applied: &mut BTreeSet<Migration>,
) -> LegacySection {
    if section.completed.is_none() {
        applied.insert(Migration::FillSectionFields);
    }
    LegacySection {
        blocks: normalize_blocks(section.blocks, applied),
        completed: section.completed.unwrap_or(false),
    }
}

/// Build `sectionsList` from the legacy keys, in `fiscal`, `dp`, `contabil`
/// order, falling back to one empty fiscal section.
fn sections_from_legacy(
    legacy: &LegacySections,
    applied: &mut BTreeSet<Migration>,
) -> Vec<Section> {
    let sources = [
        (SectionType::Fiscal, &legacy.fiscal),
        (SectionType::Pessoal, &legacy.dp),
        (SectionType::Contabil, &legacy.contabil),
    ];

    let mut sections: Vec<Section> = sources
        .into_iter()
        .filter_map(|(section_type, source)| {
            source.as_ref().map(|s| Section {
                section_type,
                title: section_type.default_title().to_string(),
                blocks: normalize_blocks(s.blocks.clone(), applied),
                completed: s.completed.unwrap_or(false),
            })
        })
        .collect();

    if sections.is_empty() {
        sections.push(Section::empty(SectionType::Fiscal));
    }
    sections
}
