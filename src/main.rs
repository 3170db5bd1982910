mod cli;
mod ui;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use miras::config::MirasConfig;
use miras::content::ContentFetcher;
use miras::credential::Credential;
use miras::error::MirasError;
use miras::gemini::GeminiClient;
use miras::orchestrator::SelectionOrchestrator;
use miras::queue::ImageQueue;
use miras::{logging, regions};

use cli::{Cli, Command};
use ui::GalleryProgress;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config.log_level, cli.verbose);

    let result = match cli.command {
        Command::Regions { search } => {
            list_regions(&config, search.as_deref());
            Ok(())
        }
        Command::Explore { region } => explore(&config, &region).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::report_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// File, then environment, then command-line flags.
fn load_config(cli: &Cli) -> Result<MirasConfig, MirasError> {
    let mut config = MirasConfig::load().map_err(|e| MirasError::Config(format!("{e:#}")))?;
    if let Some(lang) = cli.lang {
        config.language = lang.into();
    }
    if let Some(key) = cli.api_key.as_deref() {
        config.api_key = key.trim().to_string();
    }
    Ok(config)
}

fn list_regions(config: &MirasConfig, search: Option<&str>) {
    let found = match search {
        Some(query) => regions::search(config.language, query),
        None => regions::catalog(config.language),
    };
    if found.is_empty() {
        println!("No regions match.");
    } else {
        ui::print_regions(&found);
    }
}

async fn explore(config: &MirasConfig, query: &str) -> Result<()> {
    let region = regions::find(config.language, query)
        .ok_or_else(|| MirasError::UnknownRegion(query.to_string()))?;

    let credential = Credential::new(config.api_key.as_str());
    if credential.is_empty() {
        return Err(MirasError::MissingCredential.into());
    }

    let client = GeminiClient::with_base_url(config.base_url.clone())
        .map_err(MirasError::from)?
        .with_models(config.text_model.clone(), config.image_model.clone());

    // One attempt; the queue's retry policy applies to images only.
    let data = client
        .fetch(&region.name, config.language, &credential)
        .await
        .map_err(MirasError::from)?;
    ui::print_narrative(&region, &data);

    let orchestrator = SelectionOrchestrator::new(ImageQueue::new(client, config.queue.clone()));
    let handle = orchestrator.activate(&region, &data, &credential);
    let mut progress = GalleryProgress::start(&region.name);

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                progress.update(&orchestrator.snapshot());
                if handle.is_finished() {
                    let epoch = handle.epoch();
                    let end = handle.wait().await.map_err(MirasError::from)?;
                    debug!(%epoch, ?end, "sequence finished");
                    let snapshot = orchestrator.snapshot();
                    progress.update(&snapshot);
                    progress.finish(&snapshot);
                    return Ok(());
                }
            }
            _ = &mut ctrl_c => {
                let snapshot = orchestrator.snapshot();
                orchestrator.deactivate();
                progress.update(&snapshot);
                progress.finish(&snapshot);
                return Ok(());
            }
        }
    }
}
