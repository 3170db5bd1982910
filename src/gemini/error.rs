//! Tipos de erro para o cliente do serviço generativo.
//!
//! Define [`GeminiError`] com variantes para erros da API, falhas de rede,
//! respostas malformadas e resultados vazios. A classificação em
//! autenticação / rate limit / outro fica inteiramente em
//! [`crate::classifier`]; aqui apenas se preserva o formato bruto do erro.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com o serviço generativo.
///
/// O serviço é inconsistente: às vezes devolve um envelope estruturado
/// (`{"error": {"code", "status", "message"}}`), às vezes apenas texto.
/// Por isso `status` e `code` são opcionais.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// Erro retornado pela API (ex.: 429 quota esgotada, 400 chave inválida).
    /// `status` é o código numérico; `code` é o código simbólico
    /// (ex.: `RESOURCE_EXHAUSTED`), quando presente.
    #[error("API error (status {}): {message}", display_status(.status, .code))]
    ApiError {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// O corpo da resposta não pôde ser interpretado.
    #[error("failed to parse response: {0}")]
    ParseError(String),

    /// A resposta foi válida mas não trouxe o conteúdo esperado.
    #[error("{0}")]
    EmptyResult(String),

    /// Nenhuma chave de API foi fornecida.
    #[error("API key is missing")]
    MissingCredential,
}

fn display_status(status: &Option<u16>, code: &Option<String>) -> String {
    match (status, code) {
        (Some(s), Some(c)) => format!("{s} {c}"),
        (Some(s), None) => s.to_string(),
        (None, Some(c)) => c.clone(),
        (None, None) => "unknown".to_string(),
    }
}

impl GeminiError {
    pub fn api(status: Option<u16>, code: Option<&str>, message: impl Into<String>) -> Self {
        GeminiError::ApiError {
            status,
            code: code.map(str::to_string),
            message: message.into(),
        }
    }
}
