//! Contract for the system-prompt loader and the bundled template
//! implementation that applies the language-folder policy: the effective
//! folder set is {EN, TR} regardless of how many BCP-47 tags map onto it.

use crate::error::Result;

pub trait SystemPromptLoader: Send + Sync {
    fn load(&self, questionnaire_id: &str, language: &str) -> Result<String>;
}

/// Normalizes a BCP-47 language tag to one of the two folders this system
/// recognizes. Turkish (`tr`, `tr-TR`, ...) selects TR; everything else
/// selects EN — the mapping table is canonical, not an oversight.
pub fn normalize_language_folder(language: &str) -> &'static str {
    let primary = language.split(['-', '_']).next().unwrap_or(language);
    if primary.eq_ignore_ascii_case("tr") {
        "TR"
    } else {
        "EN"
    }
}

/// Standing in for the real loader in tests and in the bundled demo: a
/// fixed opening-instruction template keyed only by language folder.
pub struct TemplatePromptLoader;

impl SystemPromptLoader for TemplatePromptLoader {
    fn load(&self, questionnaire_id: &str, language: &str) -> Result<String> {
        let folder = normalize_language_folder(language);
        let opening = match folder {
            "TR" => "Ankete hoş geldiniz. Başlamak için konuşmaya başlayın.",
            _ => "Welcome to the survey. Begin speaking to get started.",
        };
        Ok(format!(
            "questionnaire={questionnaire_id}\nfolder={folder}\n\n{opening}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turkish_variants_select_tr_folder() {
        assert_eq!(normalize_language_folder("tr"), "TR");
        assert_eq!(normalize_language_folder("tr-TR"), "TR");
        assert_eq!(normalize_language_folder("TR_tr"), "TR");
    }

    #[test]
    fn everything_else_selects_en_folder() {
        assert_eq!(normalize_language_folder("en-US"), "EN");
        assert_eq!(normalize_language_folder("de-DE"), "EN");
        assert_eq!(normalize_language_folder(""), "EN");
    }

    #[test]
    fn template_loader_returns_language_specific_opening() {
        let loader = TemplatePromptLoader;
        let en = loader.load("demo-01a-electronics-retail", "en-US").unwrap();
        assert!(en.contains("Welcome"));
        let tr = loader.load("demo-01a-electronics-retail", "tr-TR").unwrap();
        assert!(tr.contains("Ankete"));
    }
}
