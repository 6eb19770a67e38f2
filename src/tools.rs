//! Two-state tool controller.
//!
//! The session is either selecting a crop or showing a composed sheet. Each
//! state enables a disjoint set of controls:
//!
//! | Control | Cropping | Composed |
//! |---|---|---|
//! | crop / recrop-cancel | on | off |
//! | recrop | off | on |
//! | grid rows & cols | off | on |
//! | background color | off | on |
//! | download | off | on |
//! | crop surface visible | yes | no |
//! | sheet visible | no | yes |

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolState {
    #[default]
    Cropping,
    Composed,
}

impl ToolState {
    pub fn affordances(self) -> Affordances {
        let composed = self == ToolState::Composed;
        Affordances {
            crop_controls: !composed,
            recrop: composed,
            grid_controls: composed,
            background_control: composed,
            download: composed,
            crop_surface_visible: !composed,
            sheet_visible: composed,
        }
    }
}

impl fmt::Display for ToolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolState::Cropping => write!(f, "cropping"),
            ToolState::Composed => write!(f, "composed"),
        }
    }
}

/// Which controls are enabled and which surfaces are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub crop_controls: bool,
    pub recrop: bool,
    pub grid_controls: bool,
    pub background_control: bool,
    pub download: bool,
    pub crop_surface_visible: bool,
    pub sheet_visible: bool,
}

#[derive(Debug, Default)]
pub struct ToolController {
    state: ToolState,
}

impl ToolController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ToolState {
        self.state
    }

    pub fn affordances(&self) -> Affordances {
        self.state.affordances()
    }

    /// A crop was committed. Moves to `Composed` only if the provider
    /// actually yielded a raster. Returns whether the state changed.
    pub fn on_crop_committed(&mut self, yielded_raster: bool) -> bool {
        if yielded_raster {
            self.transition(ToolState::Composed)
        } else {
            false
        }
    }

    /// The user asked to crop again. Returns whether the state changed.
    pub fn on_recrop_requested(&mut self) -> bool {
        self.transition(ToolState::Cropping)
    }

    /// A new image was loaded.
    pub fn reset(&mut self) {
        self.transition(ToolState::Cropping);
    }

    fn transition(&mut self, to: ToolState) -> bool {
        if self.state == to {
            return false;
        }
        log::debug!("tools: {} -> {}", self.state, to);
        self.state = to;
        true
    }
}
