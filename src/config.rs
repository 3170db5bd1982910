//! Configuração do Miras carregada a partir de `miras.toml`.
//!
//! A struct [`MirasConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `GEMINI_API_KEY` e `API_KEY` têm precedência
//! sobre o arquivo para a chave da API.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::gemini::client::{API_URL, IMAGE_MODEL, TEXT_MODEL};
use crate::queue::RetryPolicy;
use crate::regions::Language;

const CONFIG_FILE: &str = "miras.toml";
const KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Configuração de nível superior carregada de `miras.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct MirasConfig {
    /// Chave da API do serviço generativo.
    #[serde(default)]
    pub api_key: String,

    /// Idioma padrão para nomes de regiões e textos.
    #[serde(default)]
    pub language: Language,

    /// URL base da API (útil para apontar para um proxy).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Modelo usado para o texto narrativo.
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Modelo usado para gerar imagens.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Nível de log padrão quando `MIRAS_LOG` não está definido.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Política de retentativa e intervalo da fila de imagens.
    #[serde(default)]
    pub queue: RetryPolicy,
}

// Valor padrão para a URL base: a API pública.
fn default_base_url() -> String {
    API_URL.to_string()
}

fn default_text_model() -> String {
    TEXT_MODEL.to_string()
}

fn default_image_model() -> String {
    IMAGE_MODEL.to_string()
}

// Valor padrão para o nível de log: "warn", para não poluir o terminal.
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for MirasConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: Language::default(),
            base_url: default_base_url(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            log_level: default_log_level(),
            queue: RetryPolicy::default(),
        }
    }
}

impl MirasConfig {
    /// Carrega a configuração de `miras.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de um caminho específico.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<MirasConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração para a chave API.
        if let Some(key) = key_from_env() {
            config.api_key = key;
        }

        Ok(config)
    }
}

fn key_from_env() -> Option<String> {
    KEY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}
