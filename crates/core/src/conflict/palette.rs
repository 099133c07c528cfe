//! Stable color assignment for conflicting components.

use std::collections::HashMap;

use tracing::debug;

use crate::errors::ConflictError;
use crate::models::Component;

/// Colors handed out in order, wrapping after the last one.
pub const DEFAULT_PALETTE: [&str; 100] = [
    "#e6194B", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#fabebe", "#008080", "#e6beff", "#9a6324", "#fffac8", "#800000", "#aaffc3",
    "#808000", "#ffd8b1", "#000075", "#808080", "#ffffff", "#000000", "#faebd7", "#00ffff",
    "#7fffd4", "#f0ffff", "#f5f5dc", "#ffe4c4", "#ffebcd", "#8a2be2", "#a52a2a", "#deb887",
    "#5f9ea0", "#7fff00", "#d2691e", "#ff7f50", "#6495ed", "#dc143c", "#00ffff", "#00008b",
    "#008b8b", "#b8860b", "#a9a9a9", "#006400", "#a9a9a9", "#bdb76b", "#8b008b", "#556b2f",
    "#ff8c00", "#9932cc", "#8b0000", "#e9967a", "#8fbc8f", "#483d8b", "#2f4f4f", "#00ced1",
    "#9400d3", "#ff1493", "#00bfff", "#696969", "#1e90ff", "#d19275", "#b22222", "#fffaf0",
    "#228b22", "#ff00ff", "#dcdcdc", "#f8f8ff", "#ffd700", "#daa520", "#808080", "#008000",
    "#adff2f", "#f0fff0", "#ff69b4", "#cd5c5c", "#4b0082", "#fffff0", "#f0e68c", "#e6e6fa",
    "#fff0f5", "#7cfc00", "#fffacd", "#add8e6", "#f08080", "#e0ffff", "#fafad2", "#d3d3d3",
    "#90ee90", "#ffb6c1", "#ffa07a", "#20b2aa", "#87cefa", "#778899", "#b0c4de", "#ffffe0",
    "#00ff00", "#32cd32", "#faf0e6", "#ff00ff",
];

/// Identity of a component for coloring: `(type, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    pub component_type: String,
    pub name: String,
}

impl ComponentKey {
    pub fn new(component_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            name: name.into(),
        }
    }

    pub fn of(component: &Component) -> Self {
        Self::new(&component.component_type, &component.name)
    }
}

/// Assigns each component key one color for the lifetime of the allocator.
///
/// New keys take the next palette entry; once the palette is exhausted the
/// cursor wraps and colors are reused by unrelated keys.
#[derive(Debug, Clone)]
pub struct ColorAllocator {
    palette: Vec<String>,
    assigned: HashMap<ComponentKey, String>,
    cursor: usize,
}

impl ColorAllocator {
    pub fn new(palette: Vec<String>) -> Result<Self, ConflictError> {
        if palette.is_empty() {
            return Err(ConflictError::EmptyPalette);
        }
        Ok(Self {
            palette,
            assigned: HashMap::new(),
            cursor: 0,
        })
    }

    /// Color for `key`, assigning the next palette entry on first use.
    pub fn color_for(&mut self, key: &ComponentKey) -> String {
        if let Some(color) = self.assigned.get(key) {
            return color.clone();
        }
        let color = self.palette[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.palette.len();
        debug!(
            component_type = %key.component_type,
            name = %key.name,
            color = %color,
            "assigned conflict color"
        );
        self.assigned.insert(key.clone(), color.clone());
        color
    }

    /// Number of distinct keys colored so far.
    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }
}

impl Default for ColorAllocator {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            assigned: HashMap::new(),
            cursor: 0,
        }
    }
}
