//! Scale bookkeeping for placed objects.
//!
//! Double tap steps through preset multipliers of a remembered base scale;
//! pinch scales continuously within a clamp range and rebases the cycle.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Multiplier applied when cycling into [`CycleMode::Enlarged`].
pub const ENLARGE_FACTOR: f32 = 1.5;

/// Multiplier applied when cycling into [`CycleMode::Reduced`].
pub const REDUCE_FACTOR: f32 = 0.7;

/// Position in the double-tap scale cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleMode {
    /// Mode 0: base scale.
    #[default]
    Base,
    /// Mode 1: base × 1.5.
    Enlarged,
    /// Mode 2: base × 0.7.
    Reduced,
}

impl CycleMode {
    /// Next mode in the cycle (0 → 1 → 2 → 0).
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Base => Self::Enlarged,
            Self::Enlarged => Self::Reduced,
            Self::Reduced => Self::Base,
        }
    }

    /// Multiplier of the base scale for this mode.
    #[must_use]
    pub const fn multiplier(self) -> f32 {
        match self {
            Self::Base => 1.0,
            Self::Enlarged => ENLARGE_FACTOR,
            Self::Reduced => REDUCE_FACTOR,
        }
    }

    /// Numeric index (0, 1, 2).
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Base => 0,
            Self::Enlarged => 1,
            Self::Reduced => 2,
        }
    }
}

/// Scale state attached to a placed object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleState {
    /// Scale the cycle multipliers are relative to.
    pub base: Vec3,
    /// Current cycle position.
    pub mode: CycleMode,
}

impl ScaleState {
    /// Fresh state at mode 0 with the given base.
    #[must_use]
    pub const fn new(base: Vec3) -> Self {
        Self {
            base,
            mode: CycleMode::Base,
        }
    }

    /// Advance the cycle and return the scale to apply.
    pub fn advance(&mut self) -> Vec3 {
        self.mode = self.mode.next();
        self.base * self.mode.multiplier()
    }

    /// Make `scale` the new base for future cycling; the mode is kept.
    pub fn rebase(&mut self, scale: Vec3) {
        self.base = scale;
    }
}

/// Clamp range for pinch scaling.
///
/// Two regimes exist for the same feature: a tight one for models placed at
/// true scale and a loose one for authored assets that start oversized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRegime {
    /// Smallest allowed uniform scale.
    pub min: f32,
    /// Largest allowed uniform scale.
    pub max: f32,
}

impl ScaleRegime {
    /// Tight range for raw models placed at true scale.
    pub const TRUE_SCALE: Self = Self {
        min: 0.001,
        max: 0.01,
    };

    /// Loose range for oversized models that need headroom to shrink.
    pub const OVERSIZED: Self = Self { min: 0.01, max: 5.0 };

    /// Look up a regime by name (`true-scale` or `oversized`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "true-scale" | "true_scale" | "tight" => Some(Self::TRUE_SCALE),
            "oversized" | "loose" => Some(Self::OVERSIZED),
            _ => None,
        }
    }

    /// Apply one pinch delta factor to the current uniform scale.
    ///
    /// The result always lies within `[min, max]`.
    #[must_use]
    pub fn apply_pinch(&self, current: f32, factor: f32) -> f32 {
        let proposed = current * factor;
        if proposed.is_nan() {
            return current.clamp(self.min, self.max);
        }
        proposed.clamp(self.min, self.max)
    }
}

impl Default for ScaleRegime {
    fn default() -> Self {
        Self::OVERSIZED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cycle_from_base() {
        let base = Vec3::splat(0.01);
        let mut state = ScaleState::new(base);
        assert_eq!(state.advance(), base * 1.5);
        assert_eq!(state.mode.index(), 1);
        assert_eq!(state.advance(), base * 0.7);
        assert_eq!(state.mode.index(), 2);
        assert_eq!(state.advance(), base);
        assert_eq!(state.mode.index(), 0);
        assert_eq!(state.advance(), base * 1.5);
    }

    #[test]
    fn test_rebase_keeps_mode() {
        let mut state = ScaleState::new(Vec3::ONE);
        state.advance();
        state.rebase(Vec3::splat(2.0));
        assert_eq!(state.mode, CycleMode::Enlarged);
        assert_eq!(state.advance(), Vec3::splat(2.0 * 0.7));
    }

    #[test]
    fn test_regime_by_name() {
        assert_eq!(ScaleRegime::from_name("oversized"), Some(ScaleRegime::OVERSIZED));
        assert_eq!(ScaleRegime::from_name("TRUE-SCALE"), Some(ScaleRegime::TRUE_SCALE));
        assert_eq!(ScaleRegime::from_name("huge"), None);
    }

    #[test]
    fn test_pinch_clamps_both_ends() {
        let r = ScaleRegime::TRUE_SCALE;
        assert!((r.apply_pinch(0.005, 100.0) - 0.01).abs() < f32::EPSILON);
        assert!((r.apply_pinch(0.005, 0.0) - 0.001).abs() < f32::EPSILON);
    }

    proptest! {
        #[test]
        fn prop_pinch_sequence_stays_in_range(
            start in 0.0001f32..10.0f32,
            factors in prop::collection::vec(0.0f32..4.0f32, 0..40),
            oversized in any::<bool>()
        ) {
            let regime = if oversized { ScaleRegime::OVERSIZED } else { ScaleRegime::TRUE_SCALE };
            let mut scale = regime.apply_pinch(start, 1.0);
            prop_assert!(scale >= regime.min && scale <= regime.max);
            for f in factors {
                scale = regime.apply_pinch(scale, f);
                prop_assert!(
                    scale >= regime.min && scale <= regime.max,
                    "scale {} escaped [{}, {}]", scale, regime.min, regime.max
                );
            }
        }

        #[test]
        fn prop_cycle_repeats_every_three(base in 0.001f32..10.0f32, rounds in 1usize..5) {
            let b = Vec3::splat(base);
            let mut state = ScaleState::new(b);
            for _ in 0..rounds {
                prop_assert_eq!(state.advance(), b * 1.5);
                prop_assert_eq!(state.advance(), b * 0.7);
                prop_assert_eq!(state.advance(), b);
            }
        }
    }
}
