use std::fmt;

use serde::{Deserialize, Serialize};

use crate::content::{Artist, RegionData};

/// A slot in the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    History,
    Crafts,
    Portrait { artist: usize },
    Work { artist: usize, work: usize },
}

impl Position {
    /// History and crafts make up the page header.
    pub fn is_header(&self) -> bool {
        matches!(self, Position::History | Position::Crafts)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::History => write!(f, "history"),
            Position::Crafts => write!(f, "crafts"),
            Position::Portrait { artist } => write!(f, "artist[{artist}].portrait"),
            Position::Work { artist, work } => write!(f, "artist[{artist}].work[{work}]"),
        }
    }
}

/// One image the gallery wants, with the prompt that produces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedImage {
    pub position: Position,
    /// Short human-readable caption.
    pub label: String,
    pub prompt: String,
}

/// The flattened, depth-first job list for one activation:
/// history, crafts, then each artist's portrait followed by their works.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequencePlan {
    items: Vec<PlannedImage>,
}

impl SequencePlan {
    pub fn build(region_name: &str, data: &RegionData) -> Self {
        let mut items = Vec::with_capacity(
            2 + data.artists.len() + data.artists.iter().map(|a| a.famous_works.len()).sum::<usize>(),
        );

        items.push(PlannedImage {
            position: Position::History,
            label: "History".to_string(),
            prompt: history_prompt(region_name),
        });
        items.push(PlannedImage {
            position: Position::Crafts,
            label: "Crafts".to_string(),
            prompt: crafts_prompt(region_name, &data.crafts),
        });

        for (a, artist) in data.artists.iter().enumerate() {
            items.push(PlannedImage {
                position: Position::Portrait { artist: a },
                label: artist.name.clone(),
                prompt: portrait_prompt(artist),
            });
            for (w, work) in artist.famous_works.iter().enumerate() {
                items.push(PlannedImage {
                    position: Position::Work { artist: a, work: w },
                    label: work.clone(),
                    prompt: work_prompt(artist, work),
                });
            }
        }

        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[PlannedImage] {
        &self.items
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.items.iter().map(|i| &i.position)
    }
}

impl IntoIterator for SequencePlan {
    type Item = PlannedImage;
    type IntoIter = std::vec::IntoIter<PlannedImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

fn history_prompt(region_name: &str) -> String {
    format!(
        "Historical landmarks, ancient architecture, scenic landscape of {region_name} region, \
         Azerbaijan. Photorealistic, cinematic lighting."
    )
}

fn crafts_prompt(region_name: &str, crafts: &str) -> String {
    format!(
        "Traditional Azerbaijani craftsmanship from {region_name}: {crafts}. \
         Detailed, close up, high quality studio photo."
    )
}

fn portrait_prompt(artist: &Artist) -> String {
    format!(
        "Portrait of Azerbaijani artist {} ({}). Famous works: {}. \
         Artistic style, oil painting or classic photography, high quality.",
        artist.name,
        artist.period,
        artist.famous_works.join(", ")
    )
}

fn work_prompt(artist: &Artist, work: &str) -> String {
    format!(
        "The artwork titled \"{work}\" by Azerbaijani artist {}. \
         High quality, detailed art reproduction, oil painting style.",
        artist.name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(works_per_artist: &[usize]) -> RegionData {
        RegionData {
            history: "Old".into(),
            dialect_features: "Soft".into(),
            music: "Mugham".into(),
            crafts: "Copperware".into(),
            artists: works_per_artist
                .iter()
                .enumerate()
                .map(|(i, &n)| Artist {
                    name: format!("Artist {i}"),
                    period: "1900–1990".into(),
                    famous_works: (0..n).map(|w| format!("Work {i}.{w}")).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn plan_is_depth_first() {
        let plan = SequencePlan::build("Quba", &dataset(&[2, 1]));
        let positions: Vec<_> = plan.positions().cloned().collect();
        assert_eq!(
            positions,
            vec![
                Position::History,
                Position::Crafts,
                Position::Portrait { artist: 0 },
                Position::Work { artist: 0, work: 0 },
                Position::Work { artist: 0, work: 1 },
                Position::Portrait { artist: 1 },
                Position::Work { artist: 1, work: 0 },
            ]
        );
    }

    #[test]
    fn plan_length_counts_every_slot() {
        for works in [&[][..], &[0][..], &[3, 0, 2][..]] {
            let plan = SequencePlan::build("Lerik", &dataset(works));
            assert_eq!(plan.len(), 2 + works.len() + works.iter().sum::<usize>());
        }
    }

    #[test]
    fn prompts_carry_region_and_artist_details() {
        let plan = SequencePlan::build("Quba", &dataset(&[1]));
        let items = plan.items();
        assert!(items[0].prompt.contains("Quba region"));
        assert!(items[1].prompt.contains("Quba: Copperware"));
        assert!(items[2].prompt.contains("Artist 0 (1900–1990)"));
        assert!(items[2].prompt.contains("Famous works: Work 0.0"));
        assert!(items[3].prompt.contains("\"Work 0.0\" by Azerbaijani artist Artist 0"));
        assert_eq!(items[3].label, "Work 0.0");
    }

    #[test]
    fn position_display() {
        assert_eq!(Position::History.to_string(), "history");
        assert_eq!(Position::Portrait { artist: 2 }.to_string(), "artist[2].portrait");
        assert_eq!(
            Position::Work { artist: 0, work: 3 }.to_string(),
            "artist[0].work[3]"
        );
        assert!(Position::Crafts.is_header());
        assert!(!Position::Portrait { artist: 0 }.is_header());
    }
}
