//! Interface de terminal do Miras: spinner da galeria e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`GalleryProgress`] acompanha visualmente
//! a geração sequencial das imagens de uma região.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use miras::content::RegionData;
use miras::error::MirasError;
use miras::gallery::{DisplayState, GallerySnapshot, ImageSource, Phase};
use miras::regions::Region;

/// Indicador visual de progresso para a galeria de uma região.
///
/// Exibe um spinner animado enquanto as imagens são geradas e uma linha
/// colorida por imagem resolvida: pronta (verde), placeholder (amarelo)
/// ou falha (vermelho).
pub struct GalleryProgress {
    pb: ProgressBar,
    // Quantas posições já foram impressas acima do spinner.
    reported: usize,
    green: Style,
    red: Style,
    yellow: Style,
}

impl GalleryProgress {
    /// Inicia o spinner com o nome da região.
    pub fn start(region: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} [{elapsed}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(format!("{region}: preparing gallery"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            reported: 0,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Atualiza o spinner a partir de um snapshot do orquestrador.
    ///
    /// Slots resolvidos são impressos na ordem da sequência, uma única vez.
    pub fn update(&mut self, snapshot: &GallerySnapshot) {
        while let Some(slot) = snapshot.slots.get(self.reported) {
            if !slot.state.is_resolved() {
                break;
            }
            let line = match &slot.state {
                DisplayState::Ready(ImageSource::Generated(image)) => format!(
                    "  {} {} ({}, {} bytes)",
                    self.green.apply_to("✓"),
                    slot.label,
                    image.mime_type,
                    image.bytes.len()
                ),
                DisplayState::Ready(ImageSource::Placeholder(url)) => format!(
                    "  {} {} (placeholder: {url})",
                    self.yellow.apply_to("○"),
                    slot.label
                ),
                _ => format!("  {} {}", self.red.apply_to("✗"), slot.label),
            };
            self.pb.println(line);
            self.reported += 1;
        }

        let total = snapshot.slots.len();
        let current = snapshot
            .cursor
            .and_then(|i| snapshot.slots.get(i))
            .map(|s| s.label.as_str())
            .unwrap_or("-");
        let loading = if snapshot.images_loading { " (loading)" } else { "" };
        self.pb.set_message(format!(
            "{} {}/{total}{loading} · {current}",
            snapshot.phase,
            snapshot.resolved()
        ));
    }

    /// Finaliza o spinner e exibe o resultado final da galeria.
    pub fn finish(&self, snapshot: &GallerySnapshot) {
        self.pb.finish_and_clear();
        let resolved = snapshot.resolved();
        let total = snapshot.slots.len();
        match snapshot.phase {
            Phase::Completed => println!(
                "  {} Gallery complete: {resolved}/{total} images",
                self.green.apply_to("✓")
            ),
            Phase::ExhaustedStop => println!(
                "  {} Quota exhausted, stopped after {resolved}/{total} images",
                self.yellow.apply_to("!")
            ),
            _ => println!(
                "  {} Gallery stopped: {resolved}/{total} images",
                self.red.apply_to("✗")
            ),
        }
    }
}

/// Imprime a lista de regiões.
pub fn print_regions(regions: &[Region]) {
    let id_style = Style::new().cyan();
    let name_style = Style::new().bold();
    for region in regions {
        println!(
            "{:<10} {}  {}",
            id_style.apply_to(&region.id),
            name_style.apply_to(&region.name),
            Style::new().dim().apply_to(&region.description)
        );
    }
}

/// Imprime a narrativa cultural de uma região.
pub fn print_narrative(region: &Region, data: &RegionData) {
    let title = Style::new().bold().underlined();
    let heading = Style::new().cyan().bold();

    println!("{}", title.apply_to(&region.name));
    println!();
    for (label, body) in [
        ("History", &data.history),
        ("Dialect", &data.dialect_features),
        ("Music", &data.music),
        ("Crafts", &data.crafts),
    ] {
        println!("{}", heading.apply_to(label));
        println!("{body}");
        println!();
    }

    if !data.artists.is_empty() {
        println!("{}", heading.apply_to("Artists"));
        for artist in &data.artists {
            println!("  {} ({})", artist.name, artist.period);
            for work in &artist.famous_works {
                println!("    · {work}");
            }
        }
        println!();
    }
}

/// Imprime um erro fatal em stderr, uma única vez.
pub fn report_error(err: &anyhow::Error) {
    eprintln!("{}", render_error(err));
}

// Erros de credencial ganham a instrução de como fornecer uma chave válida.
fn render_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<MirasError>() {
        Some(miras) if miras.needs_new_credential() => format!(
            "{} {miras}\n  Provide a valid key with --api-key or GEMINI_API_KEY.",
            Style::new().red().bold().apply_to("✗")
        ),
        _ => format!("{err:#}"),
    }
}
