use std::collections::BTreeSet;

/// Accepted values for one dimension.
///
/// `All` is the select-all state and never restricts. `Only` with an empty set
/// matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl Selection {
    pub fn only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Only(values.into_iter().map(Into::into).collect())
    }

    pub fn none() -> Self {
        Selection::Only(BTreeSet::new())
    }

    /// Single-choice pickers use `ALL` for the select-all state.
    pub fn from_choice(choice: &str) -> Self {
        if choice.trim().eq_ignore_ascii_case("ALL") {
            Selection::All
        } else {
            Selection::only([choice.trim()])
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(values) => value.is_some_and(|v| values.contains(v)),
        }
    }
}

/// Island, province and route selections applied together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSelection {
    pub island: Selection,
    pub province: Selection,
    pub route: Selection,
}

/// Branch, customer id and customer selections of the part view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityFilter {
    pub branch: Selection,
    pub customer_id: Selection,
    pub customer: Selection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_only_matches_nothing() {
        let selection = Selection::none();

        assert!(!selection.matches(Some("JAWA")));
        assert!(!selection.matches(None));
    }

    #[test]
    fn all_matches_blank_values() {
        assert!(Selection::All.matches(None));
    }

    #[test]
    fn choice_all_is_case_insensitive() {
        assert!(Selection::from_choice("all").is_all());
        assert!(Selection::from_choice("Medan").matches(Some("Medan")));
    }
}
