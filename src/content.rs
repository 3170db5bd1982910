//! Narrative content for a region: the dataset that seeds the image gallery.
//!
//! Fetching is a single unretried call. The only distinction the caller
//! needs is whether the credential was rejected, so it can ask for a new one.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::classifier::{ErrorClass, classify};
use crate::credential::Credential;
use crate::gemini::GeminiError;
use crate::regions::Language;

/// A notable artist from a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub name: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub famous_works: Vec<String>,
}

/// Structured narrative fields for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionData {
    pub history: String,
    pub dialect_features: String,
    pub music: String,
    pub crafts: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// The service rejected the credential; the caller should ask for a new one.
    #[error("the API key is invalid or expired: {0}")]
    InvalidCredential(GeminiError),

    #[error("failed to fetch region content: {0}")]
    Service(GeminiError),
}

impl From<GeminiError> for FetchError {
    fn from(err: GeminiError) -> Self {
        match classify(&err) {
            ErrorClass::AuthInvalid => FetchError::InvalidCredential(err),
            ErrorClass::RateLimited | ErrorClass::Other => FetchError::Service(err),
        }
    }
}

/// Source of narrative content for a region.
pub trait ContentFetcher: Send + Sync {
    fn fetch(
        &self,
        region_name: &str,
        language: Language,
        credential: &Credential,
    ) -> impl Future<Output = Result<RegionData, FetchError>> + Send;
}

/// Reference table of regional artists, embedded in the system instruction so
/// the model prefers these names over its own recollection.
pub const ARTIST_REFERENCE: &str = r#"Ərazi,Rəssam,Məşhur Əsərlər (Nümunələr)
Bakı,Səttar Bəhlulzadə (1909–1974),"Qədim Şamaxı", "Buzovna. Sahil", "Mənzərə", "Qız bənövşəyə gedən yol", "Torpağın həsrəti", "Kəpəzin göz yaşları"
,Tahir Salahov (1928–2021),"Səhər eşalonu", "Qadınların portretləri" silsiləsi (Məsələn, "Aydan"), "Neftçilər", "Bəstəkar Qara Qarayevin portreti"
,Toğrul Nərimanbəyov (1930–2013),"Bolluq", "Ailə", "Qobustan kölgələri" (dekorasiya), "Sirli gecə"
,Güllü Mustafayeva (1919–1994),"Nizami Gəncəvinin portreti", "Xalça toxuyanlar", "Quba mənzərəsi", "Şuşa mənzərəsi"
Naxçıvan,Bəhruz Kəngərli (1892–1922),"Köhnə Ordubad" mənzərələri, "Naxçıvan mənzərələri", "Qaçqınlar" silsiləsi
,Hüseynqulu Əliyev (1949–),"Düşüncələr"
,Elmira Şahtaxtinskaya (1930–1996),"Portretlər silsiləsi", "Naxçıvan" mövzusunda qrafika və rəngkarlıq əsərləri
Quba,Səttar Bəhlulzadə,"Quba bölgəsi mənzərələri"
,Güllü Mustafayeva,"Quba mənzərəsi" (1945, 1957)
Gəncə,Qəzənfər Xalıqov (1898–1981),"Qız qalası", "Şah İsmayıl Xətai", "Məcnun heyvanlar arasında"
,Altay Hacıyev (1937–2021),"Füzulinin portreti", "Nəsimi"
Lənkəran,Həyat Şirvanova,"Vətənim" sərgisində portretlər
,Raminə Qurbanova,"Vətənim" sərgisində portretlər
Ordubad,Bəhruz Kəngərli,"Köhnə Ordubad" mənzərələri
Ağstafa,Kamil Xanlarov (1915–2012),"Mənzərələr", "Natürmortlar", "Səhər", "Dağlıq rayon mənzərəsi"
Lerik,Ədalət Qasımov (1940–),"Lerik rayonunun mənzərələri", "Dağlıq təbiət", "Yerli insanların portretləri"
,Elman Nəbiyev (1950–),"Lerik təbiəti silsiləsi"
Qax,Faiq Əhmədov (1954–),"Qax mənzərələri", "Natürmort", "Tarixi abidələr"
,Rəhman Qasımov,"Qax mənzərələri"
"#;

/// System instruction for the narrative request.
pub fn system_instruction(language: Language) -> String {
    match language {
        Language::Az => format!(
            "Sən Azərbaycan mədəniyyəti, tarixi, incəsənəti və etnoqrafiyası üzrə ekspertsən.\n\
             İstifadəçi bir region seçəcək. Həmin region haqqında JSON formatında məlumat ver:\n\
             1. Tarixi icmal (history)\n\
             2. Dialekt və ağız xüsusiyyətləri (dialectFeatures)\n\
             3. Musiqi və ifaçılıq sənəti (music)\n\
             4. Sənətkarlıq (crafts)\n\
             5. Rəssamlar və məşhur simalar (artists)\n\
             \n\
             Rəssamlar üçün aşağıdakı verilənlər bazasından istifadə et. Region bazada varsa, \
             oradakı məlumatları dəqiq istifadə et; yoxdursa, öz biliyinə əsaslan.\n\
             \n\
             VERİLƏNLƏR BAZASI:\n{ARTIST_REFERENCE}\n\
             Cavab yalnız Azərbaycan dilində olmalıdır."
        ),
        Language::En => format!(
            "You are an expert on Azerbaijani culture, history, art, and ethnography.\n\
             The user will select a region. Provide information about it in JSON format:\n\
             1. Historical overview (history)\n\
             2. Dialect and language features (dialectFeatures)\n\
             3. Music and performance art (music)\n\
             4. Folk crafts (crafts)\n\
             5. Artists and famous figures (artists)\n\
             \n\
             For artists, use the following database. If the region exists in it, use that \
             information accurately (translate to English, keep names original); otherwise \
             use your own knowledge.\n\
             \n\
             DATABASE:\n{ARTIST_REFERENCE}\n\
             Response must be in English."
        ),
    }
}

/// User prompt for the narrative request.
pub fn user_prompt(region_name: &str, language: Language) -> String {
    match language {
        Language::Az => format!("{region_name} regionu haqqında mədəni məlumatları və rəssamları ver."),
        Language::En => format!("Provide cultural information and artists for the {region_name} region."),
    }
}

/// JSON schema the service must follow for [`RegionData`].
pub fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "history": { "type": "STRING" },
            "dialectFeatures": { "type": "STRING" },
            "music": { "type": "STRING" },
            "crafts": { "type": "STRING" },
            "artists": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "period": { "type": "STRING" },
                        "famousWorks": { "type": "ARRAY", "items": { "type": "STRING" } }
                    }
                }
            }
        },
        "required": ["history", "dialectFeatures", "music", "crafts", "artists"]
    })
}
