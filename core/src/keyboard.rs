//! Keyboard-side state consumed by a suggestion request.

use crate::composer::CapsMode;
use serde::{Deserialize, Serialize};

/// Input purpose hint of the focused field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InputPurpose {
    /// Free-form text input
    #[default]
    FreeForm,
    Email,
    Url,
    Password,
    Number,
    Phone,
}

impl InputPurpose {
    /// Fields where replacing what the user typed is never wanted.
    pub fn is_url_or_email(self) -> bool {
        matches!(self, InputPurpose::Url | InputPurpose::Email)
    }
}

/// Opaque handle to the spatial model of the current layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProximityInfo(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardState {
    pub caps_mode: CapsMode,
    pub proximity: ProximityInfo,
    pub input_purpose: InputPurpose,
}

impl KeyboardState {
    pub fn new(caps_mode: CapsMode, input_purpose: InputPurpose) -> Self {
        Self {
            caps_mode,
            proximity: ProximityInfo::default(),
            input_purpose,
        }
    }
}
