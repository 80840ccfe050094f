use crate::connectivity::Partition;

/// Keywords marking a name as a highway-class road in the default set.
pub const HIGHWAY_KEYWORDS: &[&str] = &["Highway", "Freeway", "Motorway"];

/// Decides, from the name alone, whether a street is an arterial that should
/// be one instance no matter how far apart its pieces are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArterialMatcher {
    keywords: Vec<String>,
    case_sensitive: bool,
}

impl ArterialMatcher {
    pub fn new<S: AsRef<str>>(keywords: &[S], case_sensitive: bool) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .map(|k| {
                if case_sensitive {
                    k.to_string()
                } else {
                    k.to_lowercase()
                }
            })
            .collect();
        Self {
            keywords,
            case_sensitive,
        }
    }

    pub fn highways() -> Self {
        Self::new(HIGHWAY_KEYWORDS, true)
    }

    /// Matches nothing; turns the override off.
    pub fn disabled() -> Self {
        Self::new::<&str>(&[], true)
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_arterial(&self, name: &str) -> bool {
        if self.case_sensitive {
            self.keywords.iter().any(|k| name.contains(k.as_str()))
        } else {
            let lowered = name.to_lowercase();
            self.keywords.iter().any(|k| lowered.contains(k.as_str()))
        }
    }
}

impl Default for ArterialMatcher {
    fn default() -> Self {
        Self::highways()
    }
}

/// Collapse every component of an arterial name into one. Returns the new
/// partition and whether the override fired.
pub fn apply_continuity_override(
    name: &str,
    partition: Partition,
    matcher: &ArterialMatcher,
) -> (Partition, bool) {
    if partition.len() > 1 && matcher.is_arterial(name) {
        (partition.collapsed(), true)
    } else {
        (partition, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keywords() {
        let m = ArterialMatcher::default();
        assert!(m.is_arterial("Princes Highway"));
        assert!(m.is_arterial("M4 Western Motorway"));
        assert!(m.is_arterial("Eastern Distributor Freeway"));
        assert!(!m.is_arterial("Victoria Street"));
        // case sensitive like the dataset's title-cased names
        assert!(!m.is_arterial("princes highway"));
    }

    #[test]
    fn test_case_insensitive() {
        let m = ArterialMatcher::new(&["highway"], false);
        assert!(m.is_arterial("PRINCES HIGHWAY"));
        assert!(m.is_arterial("Princes Highway"));
    }

    #[test]
    fn test_override_collapses_arterials_only() {
        let m = ArterialMatcher::highways();
        let split = Partition::from_components(vec![vec![0], vec![2], vec![1]]);

        let (street, fired) = apply_continuity_override("Example Street", split.clone(), &m);
        assert!(!fired);
        assert_eq!(street.len(), 3);

        let (highway, fired) = apply_continuity_override("Example Highway", split, &m);
        assert!(fired);
        assert_eq!(highway.components(), &[vec![0, 1, 2]]);
    }

    #[test]
    fn test_single_component_does_not_fire() {
        let m = ArterialMatcher::highways();
        let one = Partition::from_components(vec![vec![0, 1]]);
        let (_, fired) = apply_continuity_override("Example Highway", one, &m);
        assert!(!fired);
    }

    #[test]
    fn test_disabled_matches_nothing() {
        assert!(!ArterialMatcher::disabled().is_arterial("Princes Highway"));
    }
}
