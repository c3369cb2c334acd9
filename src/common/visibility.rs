//! Sheet visibility shared by the `.xls` and `.xlsx` readers.

/// Sheet visibility types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetVisibility {
    #[default]
    Visible,
    Hidden,
    /// Hidden and not listed in the unhide dialog
    VeryHidden,
}

impl SheetVisibility {
    /// Parse the OOXML `state` attribute; unknown values read as visible.
    pub fn from_state(state: &str) -> Self {
        match state {
            "hidden" => SheetVisibility::Hidden,
            "veryHidden" => SheetVisibility::VeryHidden,
            _ => SheetVisibility::Visible,
        }
    }

    #[inline]
    pub fn is_visible(self) -> bool {
        self == SheetVisibility::Visible
    }
}
