//! HTML skeleton, print stylesheet and text helpers for the report.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

use super::Logo;
use crate::form::HeaderData;

/// Document title, also printed as the page heading.
pub const REPORT_TITLE: &str = "Ata de Reunião";

/// Label of the accounting-side attendees row.
pub const ACCOUNTING_FIRM_LABEL: &str = "Representantes Canella & Santos";

/// Left margin added per Quill indent level, in centimetres.
const INDENT_STEP_CM: f64 = 1.5;

const STYLESHEET: &str = r"
    @page { size: A4; margin: 2.5cm; }
    body {
      font-family: 'Times New Roman', serif;
      font-size: 12pt;
      line-height: 1.5;
      color: #212121;
      margin: 0;
      padding: 0;
    }
    .document { max-width: 100%; margin: 0 auto; }
    .header {
      text-align: left;
      margin-bottom: 2cm;
      border-bottom: 2px solid #333;
      padding-bottom: 1cm;
      position: relative;
    }
    .logo {
      position: absolute;
      top: 0;
      right: 0;
      width: 80px;
      height: auto;
      border-radius: 8px;
      margin-top: 5px;
      margin-right: 4.5px;
    }
    .title {
      font-size: 20pt;
      font-weight: bold;
      margin-bottom: 0.5cm;
      text-transform: uppercase;
    }
    .header-info { width: 100%; border-collapse: collapse; margin: 0.5cm 0; }
    .header-info td { padding: 0.5cm; vertical-align: top; text-align: left; }
    .header-info td:first-child { font-weight: bold; width: 25%; }
    .section { margin: 1.5cm 0; page-break-inside: avoid; }
    .section-title {
      font-size: 16pt;
      font-weight: bold;
      text-transform: uppercase;
      background-color: #f0f0f0;
      padding: 0.5cm;
      margin-bottom: 0.5cm;
      border-left: 5px solid #333;
    }
    .block { margin: 1cm; }
    .block-title { font-weight: bold; font-size: 14pt; margin-bottom: 0.3cm; color: #444; }
    .block-content { text-align: justify; margin-left: 0.5cm; }
    .block-content p { margin: 0.3cm 0; }
    .block-content ul, .block-content ol { margin: 0.5cm 0; padding-left: 1cm; }
    .block-content li { position: relative; margin-bottom: 0.2cm; }
    .block-content ul ul, .block-content ol ol { padding-left: 1cm; }
    .block-content .ql-indent-1 { margin-left: 1.5cm; }
    .block-content .ql-indent-2 { margin-left: 3.0cm; }
    .block-content .ql-indent-3 { margin-left: 4.5cm; }
    .block-content .ql-indent-4 { margin-left: 6.0cm; }
    .block-content ol { list-style-type: decimal; }
    .block-content ol .ql-indent-1 { list-style-type: lower-alpha; }
    .block-content ol .ql-indent-2 { list-style-type: lower-roman; }
    .block-content ol .ql-indent-3 { list-style-type: upper-alpha; }
";

/// Escape text for inclusion in HTML element content or attributes.
#[must_use]
pub fn html_escape(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Render an ISO `YYYY-MM-DD` date as `DD-MM-YYYY`.
///
/// Dates that are not valid calendar days but still have three dash
/// separated parts are swapped the same way; anything else is returned
/// unchanged.
#[must_use]
pub fn format_date(date: &str) -> String {
    if date.is_empty() {
        return String::new();
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return parsed.format("%d-%m-%Y").to_string();
    }
    match date.split('-').collect::<Vec<_>>().as_slice() {
        [year, month, day] => format!("{day}-{month}-{year}"),
        _ => date.to_string(),
    }
}

fn indent_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<(li|ul|ol) class="ql-indent-(\d+)""#).expect("Invalid indent pattern")
    })
}

/// Give every Quill indent marker an explicit left margin.
///
/// `<li class="ql-indent-2"` becomes
/// `<li class="ql-indent-2" style="margin-left: 3cm"`; the rest of the
/// content is untouched.
#[must_use]
pub fn normalize_indents(content: &str) -> Cow<'_, str> {
    indent_pattern().replace_all(content, |caps: &Captures<'_>| {
        let level: u32 = caps[2].parse().unwrap_or(0);
        let margin = INDENT_STEP_CM * f64::from(level);
        format!(
            r#"<{tag} class="ql-indent-{raw}" style="margin-left: {margin}cm""#,
            tag = &caps[1],
            raw = &caps[2],
        )
    })
}

/// Everything from the doctype up to the end of the header table.
pub(crate) fn document_head(out: &mut String, header: &HeaderData, logo: &Logo) {
    let _ = write!(
        out,
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{REPORT_TITLE}</title>
<style>{STYLESHEET}</style>
</head>
<body>
<div class="document">
<div class="header">
<img src="{logo}" class="logo" alt="Logo da Empresa">
<div class="title">{REPORT_TITLE}</div>
<table class="header-info">
"#,
        logo = logo.data_uri(),
    );

    let date = format_date(&header.data);
    let company_reps = format!("Representantes {}", header.empresa);
    let rows = [
        ("Empresa", header.empresa.as_str()),
        ("Local", header.local.as_str()),
        ("Data", date.as_str()),
        (company_reps.as_str(), header.participantes_empresa.as_str()),
        (ACCOUNTING_FIRM_LABEL, header.participantes_contabilidade.as_str()),
    ];
    for (label, value) in rows {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td></tr>",
            html_escape(label),
            html_escape(value)
        );
    }
    out.push_str("</table>\n</div>\n");
}

/// Close the document opened by [`document_head`].
pub(crate) fn document_tail(out: &mut String) {
    out.push_str("</div>\n</body>\n</html>\n");
}
