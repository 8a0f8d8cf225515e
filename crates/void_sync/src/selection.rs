//! Selection status and highlight colours

use serde::{Deserialize, Serialize};

/// Selection state of one prim
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionStatus {
    #[default]
    Unselected,
    Selected,
    /// The most recently selected prim
    LeadSelected,
}

impl SelectionStatus {
    pub fn is_selected(self) -> bool {
        self != SelectionStatus::Unselected
    }
}

/// Wireframe highlight colours
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighlightColors {
    pub selected: [f32; 4],
    pub lead: [f32; 4],
}

impl HighlightColors {
    /// Colour for `status`, `None` when unselected
    pub fn for_status(&self, status: SelectionStatus) -> Option<[f32; 4]> {
        match status {
            SelectionStatus::Unselected => None,
            SelectionStatus::Selected => Some(self.selected),
            SelectionStatus::LeadSelected => Some(self.lead),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_color() {
        let colors = HighlightColors {
            selected: [1.0, 1.0, 0.0, 1.0],
            lead: [1.0, 0.5, 0.0, 1.0],
        };
        assert_eq!(colors.for_status(SelectionStatus::Unselected), None);
        assert_eq!(colors.for_status(SelectionStatus::Selected), Some(colors.selected));
        assert_eq!(colors.for_status(SelectionStatus::LeadSelected), Some(colors.lead));
        assert!(SelectionStatus::LeadSelected.is_selected());
    }
}
