/// Modifier state of the click that requested a sort change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortEvent {
    pub shift_key: bool,
}

impl SortEvent {
    pub fn shift() -> Self {
        Self { shift_key: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortState {
    pub column: Option<String>,
    pub descending: Option<bool>,
}

impl SortState {
    pub fn is_active(&self) -> bool {
        self.column.is_some()
    }

    /// Applies one sort click.
    ///
    /// Shift-click on an active sort clears it, no column restores
    /// `default`, the current column flips direction, and any other column
    /// becomes the ascending sort.
    pub fn apply(&mut self, column: Option<&str>, event: SortEvent, default: &SortState) {
        if event.shift_key && self.is_active() {
            self.column = None;
            self.descending = None;
            return;
        }
        match column {
            None => *self = default.clone(),
            Some(column) if self.column.as_deref() == Some(column) => {
                self.descending = Some(!self.descending.unwrap_or(false));
            }
            Some(column) => {
                self.column = Some(column.to_string());
                self.descending = Some(false);
            }
        }
    }
}
