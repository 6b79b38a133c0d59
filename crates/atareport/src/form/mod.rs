//! Form document model.
//!
//! This module defines the data structures persisted for each form: the
//! ordered meeting-minute sections, the header metadata, and the
//! client-profile questionnaire.

mod id;
mod info;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use id::FormId;
pub use info::{FormInfo, FORM_INFO_KEYS};

/// Index title given to a freshly created form.
pub const NEW_FORM_TITLE: &str = "Novo Formulário";

/// Index title used when the header has no company name.
pub const UNTITLED_FORM_TITLE: &str = "Formulário sem título";

/// Default accounting-side attendees for new forms.
pub const DEFAULT_ACCOUNTING_PARTICIPANTS: &str = "Eli, Cataryna e William";

/// The department a section belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    /// Fiscal department.
    Fiscal,
    /// Accounting department.
    Contabil,
    /// Payroll / personnel department.
    Pessoal,
    /// Company registration department.
    Legalizacao,
    /// Control department.
    Controle,
    /// Tax studies department.
    Estudos,
    /// Financial department.
    Financeiro,
    /// Customer service department.
    Atendimento,
    /// Anything else.
    Outros,
}

impl SectionType {
    /// Every section type, in menu order.
    pub const ALL: [Self; 9] = [
        Self::Fiscal,
        Self::Contabil,
        Self::Pessoal,
        Self::Legalizacao,
        Self::Controle,
        Self::Estudos,
        Self::Financeiro,
        Self::Atendimento,
        Self::Outros,
    ];

    /// The wire tag of this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fiscal => "fiscal",
            Self::Contabil => "contabil",
            Self::Pessoal => "pessoal",
            Self::Legalizacao => "legalizacao",
            Self::Controle => "controle",
            Self::Estudos => "estudos",
            Self::Financeiro => "financeiro",
            Self::Atendimento => "atendimento",
            Self::Outros => "outros",
        }
    }

    /// Heading printed for sections of this type.
    #[must_use]
    pub fn report_label(self) -> &'static str {
        match self {
            Self::Fiscal => "Departamento Fiscal",
            Self::Contabil => "Departamento Contábil",
            Self::Pessoal => "Departamento Pessoal",
            Self::Legalizacao => "Departamento de Legalização",
            Self::Controle => "Departamento de Controle",
            Self::Estudos => "Departamento de Estudos Tributários",
            Self::Financeiro => "Departamento Financeiro",
            Self::Atendimento => "Departamento de Atendimento",
            Self::Outros => "Outros",
        }
    }

    /// Short title shown on the section tab of a new section.
    #[must_use]
    pub fn default_title(self) -> &'static str {
        match self {
            Self::Fiscal => "Fiscal",
            Self::Contabil => "Contábil",
            Self::Pessoal => "Pessoal",
            Self::Legalizacao => "Legalização",
            Self::Controle => "Controle",
            Self::Estudos => "Estudos Tributários",
            Self::Financeiro => "Financeiro",
            Self::Atendimento => "Atendimento",
            Self::Outros => "Outros",
        }
    }

    /// Look up a type by its wire tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One titled rich-text unit inside a section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Block {
    /// Short label, printed as a sub-heading.
    pub title: String,
    /// Rich-text HTML produced by the editor.
    pub content: String,
    /// Internal subject; never printed.
    pub assunto: String,
    /// Internal owner; never printed.
    pub responsavel: String,
}

impl Block {
    /// A block is blank when both its title and content are whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}

/// A labeled group of blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Department tag.
    #[serde(rename = "type")]
    pub section_type: SectionType,
    /// Display label.
    #[serde(default)]
    pub title: String,
    /// Content blocks, in print order.
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Locked from further edits in the UI.
    #[serde(default)]
    pub completed: bool,
}

impl Section {
    /// A new section of the given type holding one empty block.
    #[must_use]
    pub fn empty(section_type: SectionType) -> Self {
        Self {
            section_type,
            title: section_type.default_title().to_string(),
            blocks: vec![Block::default()],
            completed: false,
        }
    }

    /// Whether any block has a non-blank title or content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.blocks.iter().any(|b| !b.is_blank())
    }
}

/// Section shape used before `sectionsList` existed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacySection {
    /// Content blocks.
    pub blocks: Vec<Block>,
    /// Locked from further edits in the UI.
    pub completed: bool,
}

impl From<&Section> for LegacySection {
    fn from(section: &Section) -> Self {
        Self {
            blocks: section.blocks.clone(),
            completed: section.completed,
        }
    }
}

/// Meeting metadata printed in the report header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeaderData {
    /// Client company name.
    pub empresa: String,
    /// Meeting place.
    pub local: String,
    /// Meeting date, ISO `YYYY-MM-DD`.
    pub data: String,
    /// Attendees on the client side.
    pub participantes_empresa: String,
    /// Attendees on the accounting side.
    pub participantes_contabilidade: String,
}

impl Default for HeaderData {
    fn default() -> Self {
        Self {
            empresa: String::new(),
            local: String::new(),
            data: String::new(),
            participantes_empresa: String::new(),
            participantes_contabilidade: DEFAULT_ACCOUNTING_PARTICIPANTS.to_string(),
        }
    }
}

/// The full persisted record for one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDocument {
    /// Meeting-minute sections, in print order.
    pub sections_list: Vec<Section>,
    /// Header metadata.
    pub header_data: HeaderData,
    /// Client-profile questionnaire.
    pub form_info: FormInfo,
    /// Set once a PDF has been generated; advisory only.
    pub pdf_gerado: bool,
    /// Mirror of the fiscal section for older clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiscal: Option<LegacySection>,
    /// Mirror of the personnel section for older clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<LegacySection>,
    /// Mirror of the accounting section for older clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contabil: Option<LegacySection>,
}

impl Default for FormDocument {
    /// The canonical shape of a brand-new form.
    fn default() -> Self {
        Self {
            sections_list: vec![Section::empty(SectionType::Fiscal)],
            header_data: HeaderData::default(),
            form_info: FormInfo::default(),
            pdf_gerado: false,
            fiscal: None,
            dp: None,
            contabil: None,
        }
    }
}

impl FormDocument {
    /// Overwrite every field group present in `update`.
    ///
    /// Fields are replaced wholesale; nothing is merged inside a group.
    pub fn apply(&mut self, update: FormUpdate) {
        if let Some(pdf_gerado) = update.pdf_gerado {
            self.pdf_gerado = pdf_gerado;
        }
        if let Some(sections) = update.sections_list {
            self.sections_list = sections;
            self.refresh_legacy_mirrors();
        }
        if let Some(header) = update.header_data {
            self.header_data = header;
        }
        if let Some(info) = update.form_info {
            self.form_info = info;
        }
    }

    /// Find the first section of the given type.
    #[must_use]
    pub fn section(&self, section_type: SectionType) -> Option<&Section> {
        self.sections_list
            .iter()
            .find(|s| s.section_type == section_type)
    }

    fn refresh_legacy_mirrors(&mut self) {
        if let Some(section) = self.section(SectionType::Fiscal) {
            self.fiscal = Some(section.into());
        }
        if let Some(section) = self.section(SectionType::Pessoal) {
            self.dp = Some(section.into());
        }
        if let Some(section) = self.section(SectionType::Contabil) {
            self.contabil = Some(section.into());
        }
    }
}

/// A partial update: every present field replaces the stored one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormUpdate {
    /// Replacement section list.
    pub sections_list: Option<Vec<Section>>,
    /// Replacement header.
    pub header_data: Option<HeaderData>,
    /// Replacement questionnaire.
    pub form_info: Option<FormInfo>,
    /// Replacement PDF flag.
    pub pdf_gerado: Option<bool>,
}

impl FormUpdate {
    /// Whether the update carries no field at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections_list.is_none()
            && self.header_data.is_none()
            && self.form_info.is_none()
            && self.pdf_gerado.is_none()
    }
}

/// One row of the form index used for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Form identifier.
    pub id: String,
    /// Display title, usually the company name.
    #[serde(default)]
    pub title: String,
    /// Meeting date as entered.
    #[serde(default)]
    pub date: String,
}

impl IndexEntry {
    /// Index row for a freshly created form.
    #[must_use]
    pub fn new_form(id: &FormId) -> Self {
        Self {
            id: id.to_string(),
            title: NEW_FORM_TITLE.to_string(),
            date: String::new(),
        }
    }

    /// Refresh title and date from a form header.
    pub fn sync_with_header(&mut self, header: &HeaderData) {
        self.title = if header.empresa.is_empty() {
            UNTITLED_FORM_TITLE.to_string()
        } else {
            header.empresa.clone()
        };
        self.date.clone_from(&header.data);
    }
}
