//! The client-profile questionnaire (`formInfo`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Questionnaire answers describing the client's organizational, fiscal and
/// financial profile.
///
/// Missing string fields load as `""`. Keys this version does not know about
/// are kept in [`FormInfo::extra`] so they survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct FormInfo {
    // Company
    pub nome_empresa: String,
    pub cnpj: String,
    pub endereco: String,
    pub setor_atuacao: String,
    pub setor_atuacao_detalhes: String,
    pub porte_empresa: String,
    pub regime_tributario: String,

    // Contact
    pub email: String,
    pub telefone: String,
    pub whatsapp: String,
    pub outros_contatos: String,

    // Organization
    pub numero_funcionarios: String,
    pub funcionario_intermediario: String,
    /// Absent on load means no departments.
    #[serde(default)]
    pub departamentos: Vec<String>,

    // Motivation
    pub razoes_para_mudanca: Vec<String>,
    pub outros_motivos: String,
    pub expectativas: String,

    // Accounting history
    pub servicos_anteriores: Vec<String>,
    pub outros_servicos: String,
    pub escritorio_contabil_anterior: String,

    // Documentation
    pub estado_documentos: String,
    pub responsavel_documentos_nome: String,
    pub responsavel_documentos_cargo: String,
    pub pendencias_relatorios: String,
    pub tem_balanco_fechado: String,

    // Financial
    pub tem_parcelamentos: String,
    /// Absent on load means a single blank entry.
    #[serde(default = "single_blank")]
    pub parcelamentos_detalhes: Vec<String>,

    // Control
    #[serde(rename = "necessidadeControleCND")]
    pub necessidade_controle_cnd: String,

    // Fiscal
    #[serde(rename = "emiteNF")]
    pub emite_nf: String,
    pub quantidade_notas: String,
    pub media_faturamento: String,
    pub tem_sistema_emissao: String,
    pub qual_sistema_emissao: String,

    pub preferencia_comunicacao: Vec<String>,
    pub observacoes_gerais: String,

    /// Internal owner of the engagement; never printed.
    pub responsavel: String,

    /// Fields written by newer clients.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn single_blank() -> Vec<String> {
    vec![String::new()]
}

/// JSON keys every canonical `formInfo` carries.
pub const FORM_INFO_KEYS: &[&str] = &[
    "nomeEmpresa",
    "cnpj",
    "endereco",
    "setorAtuacao",
    "setorAtuacaoDetalhes",
    "porteEmpresa",
    "regimeTributario",
    "email",
    "telefone",
    "whatsapp",
    "outrosContatos",
    "numeroFuncionarios",
    "funcionarioIntermediario",
    "departamentos",
    "razoesParaMudanca",
    "outrosMotivos",
    "expectativas",
    "servicosAnteriores",
    "outrosServicos",
    "escritorioContabilAnterior",
    "estadoDocumentos",
    "responsavelDocumentosNome",
    "responsavelDocumentosCargo",
    "pendenciasRelatorios",
    "temBalancoFechado",
    "temParcelamentos",
    "parcelamentosDetalhes",
    "necessidadeControleCND",
    "emiteNF",
    "quantidadeNotas",
    "mediaFaturamento",
    "temSistemaEmissao",
    "qualSistemaEmissao",
    "preferenciaComunicacao",
    "observacoesGerais",
    "responsavel",
];

impl Default for FormInfo {
    fn default() -> Self {
        Self {
            nome_empresa: String::new(),
            cnpj: String::new(),
            endereco: String::new(),
            setor_atuacao: String::new(),
            setor_atuacao_detalhes: String::new(),
            porte_empresa: String::new(),
            regime_tributario: String::new(),
            email: String::new(),
            telefone: String::new(),
            whatsapp: String::new(),
            outros_contatos: String::new(),
            numero_funcionarios: String::new(),
            funcionario_intermediario: String::new(),
            departamentos: vec![String::new(); 3],
            razoes_para_mudanca: Vec::new(),
            outros_motivos: String::new(),
            expectativas: String::new(),
            servicos_anteriores: Vec::new(),
            outros_servicos: String::new(),
            escritorio_contabil_anterior: String::new(),
            estado_documentos: String::new(),
            responsavel_documentos_nome: String::new(),
            responsavel_documentos_cargo: String::new(),
            pendencias_relatorios: String::new(),
            tem_balanco_fechado: String::new(),
            tem_parcelamentos: String::new(),
            parcelamentos_detalhes: single_blank(),
            necessidade_controle_cnd: String::new(),
            emite_nf: String::new(),
            quantidade_notas: String::new(),
            media_faturamento: String::new(),
            tem_sistema_emissao: String::new(),
            qual_sistema_emissao: String::new(),
            preferencia_comunicacao: Vec::new(),
            observacoes_gerais: String::new(),
            responsavel: String::new(),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shape() {
        let info = FormInfo::default();
        assert_eq!(info.departamentos, vec!["", "", ""]);
        assert_eq!(info.parcelamentos_detalhes, vec![""]);
        assert!(info.razoes_para_mudanca.is_empty());
        assert!(info.extra.is_empty());
    }

    #[test]
    fn test_serialized_keys_match_canonical_list() {
        let value = serde_json::to_value(FormInfo::default()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), FORM_INFO_KEYS.len());
        for key in FORM_INFO_KEYS {
            assert!(object.contains_key(*key), "missing key {key}");
        }
    }

    #[test]
    fn test_missing_arrays_use_load_defaults() {
        let info: FormInfo = serde_json::from_str(r#"{"nomeEmpresa": "Acme"}"#).unwrap();
        assert_eq!(info.nome_empresa, "Acme");
        assert!(info.departamentos.is_empty());
        assert_eq!(info.parcelamentos_detalhes, vec![""]);
        assert_eq!(info.cnpj, "");
    }

    #[test]
    fn test_unknown_keys_are_preserved() {
        let info: FormInfo =
            serde_json::from_str(r#"{"emiteNF": "Sim", "novoCampo": 42}"#).unwrap();
        assert_eq!(info.emite_nf, "Sim");
        assert_eq!(info.extra.get("novoCampo"), Some(&Value::from(42)));

        let back = serde_json::to_value(&info).unwrap();
        assert_eq!(back["novoCampo"], 42);
        assert_eq!(back["emiteNF"], "Sim");
    }

    #[test]
    fn test_acronym_keys_are_renamed() {
        let value = serde_json::to_value(FormInfo::default()).unwrap();
        assert!(value.get("necessidadeControleCND").is_some());
        assert!(value.get("emiteNF").is_some());
        assert!(value.get("emiteNf").is_none());
    }
}
