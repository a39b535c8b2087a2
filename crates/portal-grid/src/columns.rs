use std::collections::BTreeMap;

use portal_types::models::ContactField;

/// Narrowest a column can be dragged, in pixels.
pub const MIN_COLUMN_WIDTH: u32 = 60;

fn default_width(column: ContactField) -> u32 {
    match column {
        ContactField::BusinessName => 200,
        ContactField::Email => 180,
        ContactField::MobileNumber => 140,
        ContactField::Status => 120,
        ContactField::Link => 160,
        ContactField::Notes => 200,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ResizeDrag {
    column: ContactField,
    start_x: f64,
    start_width: u32,
}

/// Per-column pixel widths plus the drag in progress, if any.
/// Lives for the session only; nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnWidths {
    widths: BTreeMap<ContactField, u32>,
    drag: Option<ResizeDrag>,
}

impl Default for ColumnWidths {
    fn default() -> Self {
        Self {
            widths: ContactField::ALL
                .into_iter()
                .map(|c| (c, default_width(c)))
                .collect(),
            drag: None,
        }
    }
}

impl ColumnWidths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self, column: ContactField) -> u32 {
        self.widths
            .get(&column)
            .copied()
            .unwrap_or_else(|| default_width(column))
    }

    /// Sets a width directly, clamped to the floor. Returns the stored width.
    pub fn set_width(&mut self, column: ContactField, width: u32) -> u32 {
        let width = width.max(MIN_COLUMN_WIDTH);
        self.widths.insert(column, width);
        width
    }

    /// Pointer-down on a column's right edge. Replaces any unfinished drag.
    pub fn begin_resize(&mut self, column: ContactField, pointer_x: f64) {
        self.drag = Some(ResizeDrag {
            column,
            start_x: pointer_x,
            start_width: self.width(column),
        });
    }

    /// Pointer-move. Returns the new width of the dragged column, or `None`
    /// when no drag is active.
    pub fn drag_to(&mut self, pointer_x: f64) -> Option<u32> {
        let drag = self.drag?;
        let proposed = (f64::from(drag.start_width) + (pointer_x - drag.start_x)).round();
        let width = if proposed <= f64::from(MIN_COLUMN_WIDTH) {
            MIN_COLUMN_WIDTH
        } else if proposed >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            proposed as u32
        };
        Some(self.set_width(drag.column, width))
    }

    /// Pointer-up. Returns the column that was being resized and its final width.
    pub fn end_resize(&mut self) -> Option<(ContactField, u32)> {
        self.drag
            .take()
            .map(|drag| (drag.column, self.width(drag.column)))
    }

    pub fn is_resizing(&self) -> bool {
        self.drag.is_some()
    }
}
