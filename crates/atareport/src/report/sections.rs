//! Meeting-minute sections of the report.

use std::fmt::Write as _;

use super::template::{html_escape, normalize_indents};
use super::{ReportBlock, ReportSection, SectionKind};

impl ReportBlock {
    /// Blank when both title and content are whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}

impl ReportSection {
    /// Heading printed above the section.
    ///
    /// Known department types use their fixed label; anything else falls
    /// back to the section's own title, then to the uppercased type tag.
    #[must_use]
    pub fn heading(&self) -> String {
        match &self.kind {
            SectionKind::Known(section_type) => section_type.report_label().to_string(),
            SectionKind::Other(tag) if self.title.is_empty() => tag.to_uppercase(),
            SectionKind::Other(_) => self.title.clone(),
        }
    }

    /// Whether any block would print something.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.blocks.iter().any(|b| !b.is_blank())
    }
}

/// Append every section that has content.
pub(crate) fn render_sections(out: &mut String, sections: &[ReportSection]) {
    for section in sections.iter().filter(|s| s.has_content()) {
        let _ = writeln!(
            out,
            "<div class=\"section\">\n<div class=\"section-title\">{}</div>",
            html_escape(&section.heading())
        );
        for block in &section.blocks {
            render_block(out, block);
        }
        out.push_str("</div>\n");
    }
}

fn render_block(out: &mut String, block: &ReportBlock) {
    if block.is_blank() {
        return;
    }
    out.push_str("<div class=\"block\">\n");
    if !block.title.trim().is_empty() {
        let _ = writeln!(
            out,
            "<div class=\"block-title\">{}</div>",
            html_escape(&block.title)
        );
    }
    if !block.content.trim().is_empty() {
        let _ = writeln!(
            out,
            "<div class=\"block-content\">{}</div>",
            normalize_indents(&block.content)
        );
    }
    out.push_str("</div>\n");
}
