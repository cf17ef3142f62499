use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActiveView {
    #[default]
    Profile,
    Map,
    Settings,
}

impl ActiveView {
    pub const ALL: [ActiveView; 3] = [ActiveView::Profile, ActiveView::Map, ActiveView::Settings];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Map => "map",
            Self::Settings => "settings",
        }
    }
}

/// Which screen is showing. Switching screens never touches any other
/// component's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigator {
    active: ActiveView,
    user_navigated: bool,
}

impl Navigator {
    #[must_use]
    pub const fn active(&self) -> ActiveView {
        self.active
    }

    #[must_use]
    pub const fn user_navigated(&self) -> bool {
        self.user_navigated
    }

    /// Explicit user navigation. Returns `true` when the screen changed.
    pub fn navigate(&mut self, view: ActiveView) -> bool {
        self.user_navigated = true;
        let changed = self.active != view;
        self.active = view;
        changed
    }

    /// Navigation driven by the session itself, e.g. after a successful save.
    pub fn show(&mut self, view: ActiveView) {
        self.active = view;
    }

    /// A saved profile turned up on load. Returning users land on the map
    /// unless they already picked a screen themselves.
    pub fn on_existing_profile(&mut self) -> bool {
        if self.user_navigated || self.active != ActiveView::Profile {
            return false;
        }
        self.active = ActiveView::Map;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_on_profile() {
        let nav = Navigator::default();
        assert_eq!(nav.active(), ActiveView::Profile);
        assert!(!nav.user_navigated());
    }

    #[test]
    fn test_navigate_reports_change() {
        let mut nav = Navigator::default();
        assert!(nav.navigate(ActiveView::Settings));
        assert!(!nav.navigate(ActiveView::Settings));
        assert_eq!(nav.active(), ActiveView::Settings);
    }

    #[test]
    fn test_existing_profile_moves_to_map_once() {
        let mut nav = Navigator::default();
        assert!(nav.on_existing_profile());
        assert_eq!(nav.active(), ActiveView::Map);
        assert!(!nav.on_existing_profile());
    }

    #[test]
    fn test_existing_profile_respects_user_choice() {
        let mut nav = Navigator::default();
        nav.navigate(ActiveView::Profile);
        assert!(!nav.on_existing_profile());
        assert_eq!(nav.active(), ActiveView::Profile);
    }

    #[test]
    fn test_view_names_match_wire_form() {
        for view in ActiveView::ALL {
            let json = serde_json::to_string(&view).unwrap();
            assert_eq!(json, format!("\"{}\"", view.name()));
        }
    }
}
