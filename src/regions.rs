//! Static catalog of the regions a user can explore.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Language used for narrative text and region names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Az,
    En,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Az => write!(f, "az"),
            Language::En => write!(f, "en"),
        }
    }
}

/// A selectable region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Shown in place of the history image when generation fails.
    pub placeholder_img: String,
}

// (id, az name, az description, en name, en description)
const CATALOG: &[(&str, &str, &str, &str, &str)] = &[
    (
        "naxcivan",
        "Naxçıvan",
        "Qədim su kanalları və mühəndislik möcüzələri.",
        "Nakhchivan",
        "Ancient water channels and engineering marvels.",
    ),
    (
        "qax",
        "Qax",
        "Ənənəvi toxuculuq və sənətkarlıq.",
        "Qakh",
        "Traditional weaving and craftsmanship.",
    ),
    (
        "zaqatala",
        "Zaqatala",
        "XV əsr Çingiz qalası və fındıq bağları.",
        "Zaqatala",
        "15th-century Chingiz fortress and hazelnut orchards.",
    ),
    (
        "quba",
        "Quba",
        "Qırmızı qəsəbə və xalçaçılıq.",
        "Quba",
        "Red Village and carpet weaving.",
    ),
    (
        "baki",
        "Bakı",
        "Qızıl və Gümüş bəzəklər, İçərişəhər.",
        "Baku",
        "Gold and silver jewelry, Old City (Icherisheher).",
    ),
    (
        "gence",
        "Gəncə",
        "Ənənəvi mis qablar, Nizami irsi.",
        "Ganja",
        "Traditional copperware, Nizami heritage.",
    ),
    (
        "agstafa",
        "Ağstafa",
        "Qədim mağara tikintiləri və saz sənəti.",
        "Agstafa",
        "Ancient cave constructions and saz art.",
    ),
    (
        "lerik",
        "Lerik",
        "Dağlıq ərazilərdəki uzunömürlülər diyarı.",
        "Lerik",
        "Land of centenarians in mountainous areas.",
    ),
    (
        "lenkeran",
        "Lənkəran",
        "Dairəvi Qala və çay plantasiyaları.",
        "Lankaran",
        "Circular Fortress and tea plantations.",
    ),
    (
        "ordubad",
        "Ordubad",
        "Gəmiqaya rəsmləri və ipəkçilik.",
        "Ordubad",
        "Gemigaya rock carvings and silk production.",
    ),
];

fn placeholder_for(id: &str) -> String {
    format!("https://picsum.photos/seed/{id}/800/600")
}

/// All regions, localized.
pub fn catalog(lang: Language) -> Vec<Region> {
    CATALOG
        .iter()
        .map(|&(id, az_name, az_desc, en_name, en_desc)| {
            let (name, description) = match lang {
                Language::Az => (az_name, az_desc),
                Language::En => (en_name, en_desc),
            };
            Region {
                id: id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                placeholder_img: placeholder_for(id),
            }
        })
        .collect()
}

/// Find a region by id or localized name, ignoring case.
pub fn find(lang: Language, query: &str) -> Option<Region> {
    let query = query.trim().to_lowercase();
    catalog(lang)
        .into_iter()
        .find(|r| r.id == query || r.name.to_lowercase() == query)
}

/// Regions whose localized name contains `query`, ignoring case.
pub fn search(lang: Language, query: &str) -> Vec<Region> {
    let query = query.trim().to_lowercase();
    catalog(lang)
        .into_iter()
        .filter(|r| r.name.to_lowercase().contains(&query))
        .collect()
}
