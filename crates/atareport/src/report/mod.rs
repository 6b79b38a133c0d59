//! Report assembly.
//!
//! Turns form data into the self-contained HTML document handed to the PDF
//! renderer. Assembly is pure: the same input always yields byte-identical
//! output.
//!
//! Input is read leniently. Malformed sections or blocks are skipped rather
//! than rejected, since the request body comes straight from the editor.

mod profile;
mod sections;
mod template;

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{logo_mime_type, ExportConfig};
use crate::error::{Error, Result};
use crate::form::{FormDocument, HeaderData, SectionType};

pub use profile::{render_profile, NOT_INFORMED, PROFILE_TITLE};
pub use template::{format_date, html_escape, normalize_indents, REPORT_TITLE};

/// 1x1 transparent PNG used when no logo is configured.
const PLACEHOLDER_LOGO: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Legacy key whose label differs from its section type.
const LEGACY_PERSONNEL_KEY: &str = "dp";

/// Logo embedded in the report header as a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logo {
    data_uri: String,
}

impl Logo {
    /// Encode raw image bytes.
    #[must_use]
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            data_uri: format!("data:{mime_type};base64,{}", STANDARD.encode(bytes)),
        }
    }

    /// Read and encode an image file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its extension is not a
    /// known image type.
    pub fn load(path: &Path) -> Result<Self> {
        let mime_type = logo_mime_type(path).ok_or_else(|| Error::ConfigValidation {
            message: format!("unsupported logo type: {}", path.display()),
        })?;
        let bytes = std::fs::read(path).map_err(|source| Error::LogoLoad {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded logo {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::from_bytes(mime_type, &bytes))
    }

    /// A transparent single-pixel image.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            data_uri: format!("data:image/png;base64,{PLACEHOLDER_LOGO}"),
        }
    }

    /// The `data:` URI for the `img` tag.
    #[must_use]
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }
}

impl Default for Logo {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// How a section is labeled in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionKind {
    /// One of the known department types.
    Known(SectionType),
    /// An unrecognized type tag or legacy key, kept verbatim.
    Other(String),
}

impl SectionKind {
    fn from_tag(tag: &str) -> Self {
        SectionType::from_tag(tag).map_or_else(|| Self::Other(tag.to_string()), Self::Known)
    }
}

/// A block as printed: internal tracking fields are not carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportBlock {
    /// Sub-heading, plain text.
    pub title: String,
    /// Rich-text HTML.
    pub content: String,
}

/// A section as printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    /// Type used to pick the heading.
    pub kind: SectionKind,
    /// Fallback heading for unknown types.
    pub title: String,
    /// Blocks in print order.
    pub blocks: Vec<ReportBlock>,
}

/// Everything the assembler prints besides the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportInput {
    /// Questionnaire object, if one was supplied.
    pub form_info: Option<Map<String, Value>>,
    /// Sections in print order.
    pub sections: Vec<ReportSection>,
    /// Sections came from legacy top-level keys instead of `sectionsList`.
    pub compatibility_mode: bool,
}

impl ReportInput {
    /// Read the `sections` object of a generation request.
    ///
    /// Returns `None` when `value` is not a JSON object.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let form_info = object.get("formInfo").and_then(Value::as_object).cloned();

        let input = match object.get("sectionsList") {
            Some(Value::Array(list)) => Self {
                form_info,
                sections: list.iter().filter_map(current_section).collect(),
                compatibility_mode: false,
            },
            _ => Self {
                form_info,
                sections: object
                    .iter()
                    .filter(|(key, _)| *key != "formInfo" && *key != "sectionsList")
                    .filter_map(|(key, value)| legacy_section(key, value))
                    .collect(),
                compatibility_mode: true,
            },
        };
        Some(input)
    }

    /// Build the input for a stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized.
    pub fn from_document(document: &FormDocument) -> Result<Self> {
        let value = serde_json::to_value(document)?;
        Self::from_value(&value)
            .ok_or_else(|| Error::internal("document did not serialize to an object"))
    }
}

fn blocks_of(value: &Value) -> Option<Vec<ReportBlock>> {
    let blocks = value.get("blocks")?.as_array()?;
    Some(
        blocks
            .iter()
            .filter_map(Value::as_object)
            .map(|block| ReportBlock {
                title: string_field(block, "title"),
                content: string_field(block, "content"),
            })
            .collect(),
    )
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn current_section(value: &Value) -> Option<ReportSection> {
    let object = value.as_object()?;
    let blocks = blocks_of(value)?;
    let kind = match object.get("type").and_then(Value::as_str) {
        Some(tag) if !tag.is_empty() => SectionKind::from_tag(tag),
        _ => SectionKind::Known(SectionType::Outros),
    };
    Some(ReportSection {
        kind,
        title: string_field(object, "title"),
        blocks,
    })
}

fn legacy_section(key: &str, value: &Value) -> Option<ReportSection> {
    value.as_object()?;
    let blocks = blocks_of(value)?;
    let kind = if key == LEGACY_PERSONNEL_KEY {
        SectionKind::Known(SectionType::Pessoal)
    } else {
        SectionKind::from_tag(key)
    };
    Some(ReportSection {
        kind,
        title: String::new(),
        blocks,
    })
}

/// Read a request's `headerData` object; missing fields become `""`.
///
/// Returns `None` when `value` is not a JSON object.
#[must_use]
pub fn header_from_value(value: &Value) -> Option<HeaderData> {
    let object = value.as_object()?;
    Some(HeaderData {
        empresa: string_field(object, "empresa"),
        local: string_field(object, "local"),
        data: string_field(object, "data"),
        participantes_empresa: string_field(object, "participantesEmpresa"),
        participantes_contabilidade: string_field(object, "participantesContabilidade"),
    })
}

/// Report assembler carrying the header logo.
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    logo: Logo,
}

impl Assembler {
    /// Create an assembler with the given logo.
    #[must_use]
    pub fn new(logo: Logo) -> Self {
        Self { logo }
    }

    /// Create an assembler using the configured logo, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured logo cannot be loaded.
    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        let logo = match &config.logo_path {
            Some(path) => Logo::load(path)?,
            None => Logo::placeholder(),
        };
        Ok(Self::new(logo))
    }

    /// Compose the full HTML document.
    #[must_use]
    pub fn assemble(&self, input: &ReportInput, header: &HeaderData) -> String {
        let mut out = String::with_capacity(16 * 1024);
        template::document_head(&mut out, header, &self.logo);

        if let Some(html) = input.form_info.as_ref().and_then(render_profile) {
            out.push_str(&html);
        }
        sections::render_sections(&mut out, &input.sections);

        template::document_tail(&mut out);
        out
    }
}

/// Compose the report with the placeholder logo.
#[must_use]
pub fn assemble(input: &ReportInput, header: &HeaderData) -> String {
    Assembler::default().assemble(input, header)
}
