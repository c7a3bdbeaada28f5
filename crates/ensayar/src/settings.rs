//! Per-method test settings built from declared markers.
//!
//! Markers are the closed vocabulary a test author attaches to a method
//! (timeout override, ignore, smoke tag, target resolutions). Discovery
//! folds them into an immutable [`MethodTestSettings`] record once; the
//! scheduler never re-inspects markers at run time.

use serde::{Deserialize, Serialize};

/// Default timeout when no marker overrides it.
///
/// Deliberately huge: an unconfigured test should never time out under a
/// debugger while someone steps through frames by hand.
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 30_000.0;

/// Fallback resolution when a method declares none
pub const DEFAULT_RESOLUTION: Resolution = Resolution {
    width: 800,
    height: 600,
};

/// A target screen resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    /// Create a resolution
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A marker attached to a test method, in source declaration order
#[derive(Debug, Clone, PartialEq)]
pub enum MethodMarker {
    /// Override the timeout, in seconds
    Timeout(f64),
    /// Ignore this method, with an optional reason
    Ignore(Option<String>),
    /// Tag the method for the reduced smoke subset
    Smoke,
    /// Add a target resolution (repeatable; first declared is the default)
    TargetResolution(Resolution),
    /// Resolution override applied only when running inside the editor
    EditorTargetResolution(Resolution),
}

/// Immutable settings record for one discovered test method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodTestSettings {
    /// Timeout for the body phase, in seconds
    pub timeout_seconds: f64,
    /// Whether the method is ignored
    pub is_ignored: bool,
    /// Ignore reason, if any
    pub ignore_reason: Option<String>,
    /// Whether the method belongs to the smoke subset
    pub is_smoke: bool,
    /// Declared target resolutions, declaration order (first = default)
    pub target_resolutions: Vec<Resolution>,
    /// Editor-only resolution override
    pub editor_resolution: Option<Resolution>,
}

impl Default for MethodTestSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            is_ignored: false,
            ignore_reason: None,
            is_smoke: false,
            target_resolutions: Vec::new(),
            editor_resolution: None,
        }
    }
}

impl MethodTestSettings {
    /// Fold declared markers into a settings record.
    ///
    /// Markers are consumed in reverse declaration order: resolution
    /// entries are pushed to the front so the list ends up in declaration
    /// order with the first-declared resolution as the default, and for
    /// conflicting scalar markers the first-declared one wins because it
    /// is processed last.
    #[must_use]
    pub fn build(markers: &[MethodMarker]) -> Self {
        let mut settings = Self::default();

        for marker in markers.iter().rev() {
            match marker {
                MethodMarker::Timeout(seconds) => settings.timeout_seconds = *seconds,
                MethodMarker::Ignore(reason) => {
                    settings.is_ignored = true;
                    settings.ignore_reason = reason.clone();
                }
                MethodMarker::Smoke => settings.is_smoke = true,
                MethodMarker::TargetResolution(resolution) => {
                    settings.target_resolutions.insert(0, *resolution);
                }
                MethodMarker::EditorTargetResolution(resolution) => {
                    settings.editor_resolution = Some(*resolution);
                }
            }
        }

        settings
    }

    /// Mark ignored with a class-level default reason, unless the method
    /// already carries its own ignore state
    pub fn apply_class_ignore(&mut self, reason: &str) {
        if !self.is_ignored {
            self.is_ignored = true;
            self.ignore_reason = Some(reason.to_string());
        }
    }

    /// Check whether the method runs at the given resolution.
    ///
    /// An empty resolution list means "runs at any resolution".
    #[must_use]
    pub fn contains_target_resolution(&self, width: u32, height: u32) -> bool {
        self.target_resolutions.is_empty()
            || self
                .target_resolutions
                .contains(&Resolution::new(width, height))
    }

    /// First-declared resolution, or the 800x600 fallback when none declared
    #[must_use]
    pub fn default_target_resolution(&self) -> Resolution {
        self.target_resolutions
            .first()
            .copied()
            .unwrap_or(DEFAULT_RESOLUTION)
    }
}
