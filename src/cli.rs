//! Interface de linha de comando do Miras baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (regions, explore)
//! e flags globais (--lang, --api-key, --verbose).

use clap::{Parser, Subcommand, ValueEnum};

use miras::regions::Language;

/// Miras: explore o patrimônio cultural das regiões do Azerbaijão.
#[derive(Debug, Parser)]
#[command(name = "miras", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Idioma da sessão (sobrescreve `language` em miras.toml).
    #[arg(long, global = true)]
    pub lang: Option<LanguageArg>,

    /// Chave da API (sobrescreve o arquivo e as variáveis de ambiente).
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Idioma aceito pela CLI, mapeado para [`Language`] internamente.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LanguageArg {
    /// Azerbaijano.
    Az,
    /// Inglês.
    En,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::Az => Language::Az,
            LanguageArg::En => Language::En,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lista as regiões disponíveis.
    Regions {
        /// Filtra pelo nome da região (sem diferenciar maiúsculas).
        #[arg(long, short)]
        search: Option<String>,
    },

    /// Mostra a narrativa de uma região e gera sua galeria de imagens.
    Explore {
        /// Identificador ou nome da região (ex.: `quba`, `Gəncə`).
        region: String,
    },
}
