//! Category filter bar.
//!
//! Filtering is navigation: "All" returns to the top with every section
//! visible, any other key scrolls its section into view. Sections are never
//! hidden.

use tracing::debug;

const ALL_KEY: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterKey {
    All,
    Category(String),
}

impl FilterKey {
    pub fn parse(key: &str) -> Self {
        if key == ALL_KEY {
            Self::All
        } else {
            Self::Category(key.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_KEY,
            Self::Category(id) => id,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::All => "All".to_string(),
            Self::Category(id) => id.replace('_', " ").to_uppercase(),
        }
    }
}

/// A button in the filter bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEntry {
    pub key: FilterKey,
    pub label: String,
}

impl FilterEntry {
    pub fn new(key: FilterKey) -> Self {
        let label = key.label();
        Self { key, label }
    }
}

/// The scrollable surface holding the category sections.
pub trait SectionNavigator {
    fn reveal_all_sections(&self);
    fn scroll_to_top(&self);
    /// Scrolls the section into view; `false` when no such section exists.
    fn scroll_to_section(&self, id: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    ShowingAll,
    JumpedTo(String),
    UnknownSection(String),
}

#[derive(Debug)]
pub struct FilterController {
    active: FilterKey,
}

impl FilterController {
    pub fn new() -> Self {
        Self {
            active: FilterKey::All,
        }
    }

    pub fn active(&self) -> &FilterKey {
        &self.active
    }

    pub fn filter(&mut self, key: FilterKey, navigator: &impl SectionNavigator) -> FilterOutcome {
        debug!(key = key.as_str(), "Applying filter");
        let outcome = match &key {
            FilterKey::All => {
                navigator.reveal_all_sections();
                navigator.scroll_to_top();
                FilterOutcome::ShowingAll
            }
            FilterKey::Category(id) => {
                if navigator.scroll_to_section(id) {
                    FilterOutcome::JumpedTo(id.clone())
                } else {
                    FilterOutcome::UnknownSection(id.clone())
                }
            }
        };
        if !matches!(outcome, FilterOutcome::UnknownSection(_)) {
            self.active = key;
        }
        outcome
    }
}

impl Default for FilterController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingNavigator {
        sections: Vec<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl SectionNavigator for RecordingNavigator {
        fn reveal_all_sections(&self) {
            self.calls.borrow_mut().push("reveal".into());
        }

        fn scroll_to_top(&self) {
            self.calls.borrow_mut().push("top".into());
        }

        fn scroll_to_section(&self, id: &str) -> bool {
            self.calls.borrow_mut().push(format!("scroll:{id}"));
            self.sections.contains(&id)
        }
    }

    #[test]
    fn test_key_parse_and_labels() {
        assert_eq!(FilterKey::parse("all"), FilterKey::All);
        assert_eq!(
            FilterKey::parse("fan_art"),
            FilterKey::Category("fan_art".into())
        );
        assert_eq!(FilterKey::parse("fan_art").label(), "FAN ART");
        assert_eq!(FilterKey::All.label(), "All");
    }

    #[test]
    fn test_all_reveals_and_scrolls_top() {
        let navigator = RecordingNavigator::default();
        let mut controller = FilterController::new();
        assert_eq!(
            controller.filter(FilterKey::All, &navigator),
            FilterOutcome::ShowingAll
        );
        assert_eq!(*navigator.calls.borrow(), vec!["reveal", "top"]);
    }

    #[test]
    fn test_category_only_scrolls() {
        let navigator = RecordingNavigator {
            sections: vec!["fanart"],
            ..Default::default()
        };
        let mut controller = FilterController::new();

        let outcome = controller.filter(FilterKey::parse("fanart"), &navigator);
        assert_eq!(outcome, FilterOutcome::JumpedTo("fanart".into()));
        assert_eq!(*navigator.calls.borrow(), vec!["scroll:fanart"]);
        assert_eq!(controller.active().as_str(), "fanart");

        let outcome = controller.filter(FilterKey::parse("ghost"), &navigator);
        assert_eq!(outcome, FilterOutcome::UnknownSection("ghost".into()));
        assert_eq!(controller.active().as_str(), "fanart");
    }
}
