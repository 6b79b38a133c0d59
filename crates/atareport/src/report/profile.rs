//! The client-profile part of the report.
//!
//! The questionnaire is read straight from its JSON object so that a
//! partially filled or oddly typed `formInfo` still prints whatever it has.

use std::borrow::Cow;
use std::fmt::Write as _;

use serde_json::{Map, Value};

use super::template::html_escape;

/// Heading of the profile section.
pub const PROFILE_TITLE: &str = "FORMULÁRIO DE PERFIL DO CLIENTE";

/// Printed for optional answers left blank.
pub const NOT_INFORMED: &str = "Não informado";

/// Text fields whose presence makes the profile worth printing.
const TEXT_PROBES: &[&str] = &[
    "nomeEmpresa",
    "cnpj",
    "endereco",
    "setorAtuacao",
    "porteEmpresa",
    "setorAtuacaoDetalhes",
    "numeroFuncionarios",
    "funcionarioIntermediario",
    "expectativas",
    "estadoDocumentos",
    "responsavelDocumentosNome",
    "responsavelDocumentosCargo",
    "pendenciasRelatorios",
    "emiteNF",
    "quantidadeNotas",
    "mediaFaturamento",
    "temSistemaEmissao",
    "qualSistemaEmissao",
    "temBalancoFechado",
    "temParcelamentos",
    "necessidadeControleCND",
    "observacoesGerais",
];

/// List fields that count when they hold any entry.
const NON_EMPTY_LIST_PROBES: &[&str] = &[
    "razoesParaMudanca",
    "servicosAnteriores",
    "preferenciaComunicacao",
];

/// List fields that count when they hold a non-blank entry.
const FILLED_LIST_PROBES: &[&str] = &["departamentos", "parcelamentosDetalhes"];

/// Read-only view over a `formInfo` object.
struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    fn raw(&self, key: &str) -> Cow<'a, str> {
        value_text(self.0.get(key))
    }

    fn has(&self, key: &str) -> bool {
        !self.raw(key).is_empty()
    }

    fn is(&self, key: &str, expected: &str) -> bool {
        self.raw(key) == expected
    }

    /// Escaped value, `""` when missing.
    fn text(&self, key: &str) -> String {
        html_escape(&self.raw(key)).into_owned()
    }

    /// Escaped value, [`NOT_INFORMED`] when missing.
    fn text_or_unset(&self, key: &str) -> String {
        let raw = self.raw(key);
        if raw.is_empty() {
            NOT_INFORMED.to_string()
        } else {
            html_escape(&raw).into_owned()
        }
    }

    fn list(&self, key: &str) -> Vec<Cow<'a, str>> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items.iter().map(|v| value_text(Some(v))).collect(),
            _ => Vec::new(),
        }
    }

    fn has_content(&self) -> bool {
        TEXT_PROBES.iter().any(|key| self.has(key))
            || NON_EMPTY_LIST_PROBES
                .iter()
                .any(|key| !self.list(key).is_empty())
            || FILLED_LIST_PROBES
                .iter()
                .any(|key| self.list(key).iter().any(|item| !item.is_empty()))
    }
}

fn value_text(value: Option<&Value>) -> Cow<'_, str> {
    match value {
        Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
        Some(Value::Number(n)) => Cow::Owned(n.to_string()),
        _ => Cow::Borrowed(""),
    }
}

fn list_items<'a>(items: impl IntoIterator<Item = Cow<'a, str>>, skip_blank: bool) -> String {
    items
        .into_iter()
        .filter(|item| !(skip_blank && item.is_empty()))
        .map(|item| format!("<li>{}</li>", html_escape(&item)))
        .collect()
}

fn block(out: &mut String, title: &str, body: &str) {
    let _ = write!(
        out,
        "<div class=\"block\">\n<div class=\"block-title\">{title}</div>\n<div class=\"block-content\">\n{body}</div>\n</div>\n"
    );
}

/// Render the profile section, or `None` when nothing in it is filled in.
#[must_use]
pub fn render_profile(form_info: &Map<String, Value>) -> Option<String> {
    let f = Fields(form_info);
    if !f.has_content() {
        return None;
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "<div class=\"section\">\n<div class=\"section-title\">{PROFILE_TITLE}</div>"
    );

    company(&mut out, &f);
    contact(&mut out, &f);
    organization(&mut out, &f);
    motivation(&mut out, &f);
    accounting_history(&mut out, &f);
    documentation(&mut out, &f);
    financial(&mut out, &f);
    control(&mut out, &f);
    fiscal(&mut out, &f);

    if f.has("observacoesGerais") {
        let body = format!("<p>{}</p>\n", f.text("observacoesGerais"));
        block(&mut out, "Observações Gerais", &body);
    }

    out.push_str("</div>\n");
    Some(out)
}

fn company(out: &mut String, f: &Fields<'_>) {
    let sector = if f.is("setorAtuacao", "Outros") {
        let details = f.text("setorAtuacaoDetalhes");
        if details.is_empty() {
            "Outros: Não especificado".to_string()
        } else {
            format!("Outros: {details}")
        }
    } else {
        f.text("setorAtuacao")
    };

    let body = format!(
        "<p><strong>Nome da Empresa:</strong> {}</p>\n\
         <p><strong>CNPJ:</strong> {}</p>\n\
         <p><strong>Endereço (Sede/Filiais):</strong> {}</p>\n\
         <p><strong>Setor de Atuação:</strong> {sector}</p>\n\
         <p><strong>Porte da Empresa:</strong> {}</p>\n",
        f.text("nomeEmpresa"),
        f.text("cnpj"),
        f.text("endereco"),
        f.text("porteEmpresa"),
    );
    block(out, "1. Informações Gerais da Empresa", &body);
}

fn contact(out: &mut String, f: &Fields<'_>) {
    let body = format!(
        "<p><strong>Email:</strong> {}</p>\n\
         <p><strong>Telefone:</strong> {}</p>\n\
         <p><strong>WhatsApp:</strong> {}</p>\n\
         <p><strong>Outros Contatos:</strong> {}</p>\n",
        f.text_or_unset("email"),
        f.text_or_unset("telefone"),
        f.text_or_unset("whatsapp"),
        f.text_or_unset("outrosContatos"),
    );
    block(out, "1.1. Informações de Contato", &body);
}

fn organization(out: &mut String, f: &Fields<'_>) {
    let body = format!(
        "<p><strong>Número de Funcionários:</strong> {}</p>\n\
         <p><strong>Funcionário Intermediário:</strong> {}</p>\n\
         <p><strong>Principais Departamentos:</strong></p>\n\
         <ul>{}</ul>\n",
        f.text("numeroFuncionarios"),
        f.text("funcionarioIntermediario"),
        list_items(f.list("departamentos"), true),
    );
    block(out, "2. Estrutura Organizacional", &body);
}

/// A list answer plus the free-text detail shown when `Outros` is ticked.
fn list_with_other(f: &Fields<'_>, list_key: &str, other_key: &str) -> String {
    let items = f.list(list_key);
    let ticked_other = items.iter().any(|item| item == "Outros");
    let mut html = list_items(items, false);
    if ticked_other && f.has(other_key) {
        let _ = write!(html, "<li>Outros: {}</li>", f.text(other_key));
    }
    html
}

fn motivation(out: &mut String, f: &Fields<'_>) {
    let body = format!(
        "<p><strong>Razões para a Mudança de Contabilidade:</strong></p>\n\
         <ul>{}</ul>\n\
         <p><strong>Expectativas com a Nova Contabilidade:</strong></p>\n\
         <p>{}</p>\n",
        list_with_other(f, "razoesParaMudanca", "outrosMotivos"),
        f.text("expectativas"),
    );
    block(out, "3. Motivação para a Mudança", &body);
}

fn accounting_history(out: &mut String, f: &Fields<'_>) {
    let body = format!(
        "<p><strong>Escritório Contábil Anterior:</strong> {}</p>\n\
         <p><strong>Serviços Utilizados Anteriormente:</strong></p>\n\
         <ul>{}</ul>\n",
        f.text_or_unset("escritorioContabilAnterior"),
        list_with_other(f, "servicosAnteriores", "outrosServicos"),
    );
    block(out, "4. Histórico Contábil", &body);
}

fn documentation(out: &mut String, f: &Fields<'_>) {
    let body = format!(
        "<p><strong>Estado Atual dos Documentos Contábeis:</strong> {}</p>\n\
         <p><strong>Responsável Interno pelo Envio de Documentos:</strong></p>\n\
         <p>Nome: {}</p>\n\
         <p>Cargo: {}</p>\n\
         <p><strong>Pendências nos relatórios e-cac e estado:</strong></p>\n\
         <p>{}</p>\n\
         <p><strong>Tem Balanço / livro contábil fechado?</strong> {}</p>\n",
        f.text_or_unset("estadoDocumentos"),
        f.text_or_unset("responsavelDocumentosNome"),
        f.text_or_unset("responsavelDocumentosCargo"),
        f.text_or_unset("pendenciasRelatorios"),
        f.text_or_unset("temBalancoFechado"),
    );
    block(out, "5. Documentação e Processos", &body);
}

fn financial(out: &mut String, f: &Fields<'_>) {
    let mut body = format!(
        "<p><strong>Tem parcelamentos?</strong> {}</p>\n",
        f.text_or_unset("temParcelamentos")
    );
    if f.is("temParcelamentos", "Sim") {
        let mut items = list_items(f.list("parcelamentosDetalhes"), true);
        if items.is_empty() {
            items = format!("<li>{NOT_INFORMED}</li>");
        }
        let _ = writeln!(
            body,
            "<p><strong>Detalhes dos Parcelamentos:</strong></p>\n<ul>{items}</ul>"
        );
    }
    block(out, "6. Financeiro", &body);
}

fn control(out: &mut String, f: &Fields<'_>) {
    let body = format!(
        "<p><strong>Tem necessidade de controle CND?</strong> {}</p>\n",
        f.text_or_unset("necessidadeControleCND")
    );
    block(out, "7. Controle", &body);
}

fn fiscal(out: &mut String, f: &Fields<'_>) {
    let mut body = format!(
        "<p><strong>Regime Tributário:</strong> {}</p>\n\
         <p><strong>Emite NF?</strong> {}</p>\n",
        f.text_or_unset("regimeTributario"),
        f.text_or_unset("emiteNF"),
    );
    if f.is("emiteNF", "Sim") {
        let _ = write!(
            body,
            "<p><strong>Quantas notas?</strong> {}</p>\n\
             <p><strong>Qual a média de faturamento?</strong> {}</p>\n",
            f.text_or_unset("quantidadeNotas"),
            f.text_or_unset("mediaFaturamento"),
        );
    }
    let _ = writeln!(
        body,
        "<p><strong>Tem sistema de emissão de nota?</strong> {}</p>",
        f.text_or_unset("temSistemaEmissao")
    );
    if f.is("temSistemaEmissao", "Sim") {
        let _ = writeln!(
            body,
            "<p><strong>Qual o sistema?</strong> {}</p>",
            f.text_or_unset("qualSistemaEmissao")
        );
    }
    block(out, "8. Fiscal", &body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::form::FormInfo;

    fn info(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn default_info() -> Map<String, Value> {
        info(serde_json::to_value(FormInfo::default()).unwrap())
    }

    #[test]
    fn test_blank_profile_is_skipped() {
        assert!(render_profile(&default_info()).is_none());
        assert!(render_profile(&Map::new()).is_none());
        assert!(render_profile(&info(json!({"departamentos": ["", ""]}))).is_none());
    }

    #[test]
    fn test_any_probe_enables_profile() {
        let html = render_profile(&info(json!({"cnpj": "00.000.000/0001-00"}))).unwrap();
        assert!(html.contains(PROFILE_TITLE));
        assert!(html.contains("<p><strong>CNPJ:</strong> 00.000.000/0001-00</p>"));
        assert!(html.contains("<p><strong>Email:</strong> Não informado</p>"));

        assert!(render_profile(&info(json!({"razoesParaMudanca": [""]}))).is_some());
        assert!(render_profile(&info(json!({"parcelamentosDetalhes": ["x"]}))).is_some());
    }

    #[test]
    fn test_emite_nf_controls_invoice_lines() {
        let with = render_profile(&info(json!({"emiteNF": "Sim", "quantidadeNotas": "50"}))).unwrap();
        assert!(with.contains("<p><strong>Quantas notas?</strong> 50</p>"));
        assert!(with.contains("<p><strong>Qual a média de faturamento?</strong> Não informado</p>"));

        let without = render_profile(&info(json!({"emiteNF": "Não", "quantidadeNotas": "50"}))).unwrap();
        assert!(without.contains("<p><strong>Emite NF?</strong> Não</p>"));
        assert!(!without.contains("Quantas notas?"));
        assert!(!without.contains("média de faturamento"));
    }

    #[test]
    fn test_emission_system_only_when_yes() {
        let html = render_profile(&info(json!({"temSistemaEmissao": "Sim"}))).unwrap();
        assert!(html.contains("<p><strong>Qual o sistema?</strong> Não informado</p>"));

        let html = render_profile(&info(json!({"temSistemaEmissao": "Não"}))).unwrap();
        assert!(!html.contains("Qual o sistema?"));
    }

    #[test]
    fn test_sector_other_details() {
        let html = render_profile(&info(json!({"setorAtuacao": "Outros"}))).unwrap();
        assert!(html.contains("<p><strong>Setor de Atuação:</strong> Outros: Não especificado</p>"));

        let html = render_profile(&info(json!({
            "setorAtuacao": "Outros",
            "setorAtuacaoDetalhes": "Agro"
        })))
        .unwrap();
        assert!(html.contains("Outros: Agro</p>"));
    }

    #[test]
    fn test_lists_and_other_reason() {
        let html = render_profile(&info(json!({
            "departamentos": ["RH", "", "TI"],
            "razoesParaMudanca": ["Custo", "Outros"],
            "outrosMotivos": "Atendimento lento"
        })))
        .unwrap();
        assert!(html.contains("<ul><li>RH</li><li>TI</li></ul>"));
        assert!(html.contains("<li>Custo</li><li>Outros</li><li>Outros: Atendimento lento</li>"));
    }

    #[test]
    fn test_installments_fallback() {
        let html = render_profile(&info(json!({
            "temParcelamentos": "Sim",
            "parcelamentosDetalhes": [""]
        })))
        .unwrap();
        assert!(html.contains("Detalhes dos Parcelamentos"));
        assert!(html.contains("<ul><li>Não informado</li></ul>"));

        let html = render_profile(&info(json!({"temParcelamentos": "Não"}))).unwrap();
        assert!(!html.contains("Detalhes dos Parcelamentos"));
    }

    #[test]
    fn test_general_notes_only_when_set() {
        let html = render_profile(&info(json!({"cnpj": "1"}))).unwrap();
        assert!(!html.contains("Observações Gerais"));

        let html = render_profile(&info(json!({"observacoesGerais": "a < b"}))).unwrap();
        assert!(html.contains("<div class=\"block-title\">Observações Gerais</div>"));
        assert!(html.contains("<p>a &lt; b</p>"));
    }

    #[test]
    fn test_numbers_are_printed_and_other_types_ignored() {
        let html = render_profile(&info(json!({
            "numeroFuncionarios": 12,
            "cnpj": {"nested": true}
        })))
        .unwrap();
        assert!(html.contains("<p><strong>Número de Funcionários:</strong> 12</p>"));
        assert!(html.contains("<p><strong>CNPJ:</strong> </p>"));
    }

    #[test]
    fn test_internal_owner_is_never_printed() {
        let html = render_profile(&info(json!({"cnpj": "1", "responsavel": "Fulano"}))).unwrap();
        assert!(!html.contains("Fulano"));
    }
}
