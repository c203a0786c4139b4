//! Pattern classifier for happening text.

use ll0en_sdk::objects::normalize_name;
use regex::Regex;

use super::types::ClassifiedMatch;

const RESIGNATION_PATTERN: &str =
    r"^@@([A-Za-z0-9_-]+)@@ resigned from the World Assembly\.?$";

/// Classifies happening text for one tracked region.
///
/// The region is escaped into the relocation pattern once, at construction,
/// so `classify` is a pure lookup that can run on any number of tasks at once.
#[derive(Debug, Clone)]
pub struct Classifier {
    resignation: Regex,
    relocation: Regex,
    region: String,
}

impl Classifier {
    /// Build a classifier tracking `region` (normalised before use).
    pub fn new(region: &str) -> Result<Self, regex::Error> {
        let region = normalize_name(region);
        let relocation = Regex::new(&format!(
            r"^@@([A-Za-z0-9_-]+)@@ relocated from %%{}%% to %%[^%]+%%\.?$",
            regex::escape(&region)
        ))?;

        Ok(Self {
            resignation: Regex::new(RESIGNATION_PATTERN)?,
            relocation,
            region,
        })
    }

    /// The normalised region this classifier tracks.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Classify one happening.
    ///
    /// Resignation is checked first; the two templates cannot both match the
    /// same text.
    pub fn classify(&self, text: &str) -> Option<ClassifiedMatch> {
        if let Some(nation) = capture_nation(&self.resignation, text) {
            return Some(ClassifiedMatch::Resignation { nation });
        }
        if let Some(nation) = capture_nation(&self.relocation, text) {
            return Some(ClassifiedMatch::Relocation { nation });
        }
        None
    }
}

fn capture_nation(pattern: &Regex, text: &str) -> Option<String> {
    let caps = pattern.captures(text)?;
    let nation = normalize_name(caps.get(1)?.as_str());
    (!nation.is_empty()).then_some(nation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new("testlandia").unwrap()
    }

    #[test]
    fn test_resignation_with_period() {
        assert_eq!(
            classifier().classify("@@kingdom_of_rust@@ resigned from the World Assembly."),
            Some(ClassifiedMatch::Resignation {
                nation: "kingdom_of_rust".to_string()
            })
        );
    }

    #[test]
    fn test_resignation_without_period() {
        assert_eq!(
            classifier().classify("@@kingdom_of_rust@@ resigned from the World Assembly"),
            Some(ClassifiedMatch::Resignation {
                nation: "kingdom_of_rust".to_string()
            })
        );
    }

    #[test]
    fn test_relocation_out_of_tracked_region() {
        let matched = classifier()
            .classify("@@free_republic@@ relocated from %%testlandia%% to %%other_place%%");
        assert_eq!(
            matched,
            Some(ClassifiedMatch::Relocation {
                nation: "free_republic".to_string()
            })
        );
    }

    #[test]
    fn test_relocation_into_tracked_region_is_ignored() {
        assert_eq!(
            classifier()
                .classify("@@free_republic@@ relocated from %%other_place%% to %%testlandia%%."),
            None
        );
    }

    #[test]
    fn test_relocation_between_other_regions_is_ignored() {
        assert_eq!(
            classifier().classify("@@free_republic@@ relocated from %%a%% to %%b%%."),
            None
        );
    }

    #[test]
    fn test_unrelated_happenings() {
        let classifier = classifier();
        for text in [
            "",
            "@@kingdom_of_rust@@ was admitted to the World Assembly.",
            "@@kingdom_of_rust@@ endorsed @@free_republic@@.",
            "Following new legislation in @@kingdom_of_rust@@, cats are banned.",
            "@@@@ resigned from the World Assembly.",
            "prefix @@kingdom_of_rust@@ resigned from the World Assembly.",
            "@@kingdom_of_rust@@ resigned from the World Assembly. Twice.",
        ] {
            assert_eq!(classifier.classify(text), None, "{text}");
        }
    }

    #[test]
    fn test_region_is_matched_literally() {
        let classifier = Classifier::new("a.b").unwrap();
        assert!(
            classifier
                .classify("@@x@@ relocated from %%a.b%% to %%c%%.")
                .is_some()
        );
        assert_eq!(
            classifier.classify("@@x@@ relocated from %%axb%% to %%c%%."),
            None
        );
    }

    #[test]
    fn test_region_is_normalised() {
        let classifier = Classifier::new("The Free Republic").unwrap();
        assert_eq!(classifier.region(), "the_free_republic");
        assert!(
            classifier
                .classify("@@x@@ relocated from %%the_free_republic%% to %%c%%.")
                .is_some()
        );
    }

    #[test]
    fn test_nation_is_lowercased() {
        assert_eq!(
            classifier()
                .classify("@@Kingdom_Of_Rust@@ resigned from the World Assembly.")
                .map(|m| m.nation().to_string()),
            Some("kingdom_of_rust".to_string())
        );
    }
}
