//! Fade curve implementations for crossfading
//!
//! Five curve shapes used by the crossfade scheduler's gain ramps.
//! Each curve maps a normalized fade position to a volume multiplier:
//! - Linear: constant rate of change (the scheduler default)
//! - Exponential: slow start, fast finish (natural-sounding fade-in)
//! - Logarithmic: fast start, slow finish (natural-sounding fade-out)
//! - SCurve: smooth acceleration and deceleration
//! - EqualPower: constant perceived loudness during the overlap

use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Fade curve types for crossfading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// v(t) = t
    Linear,

    /// v(t) = t² (slow start, fast finish)
    Exponential,

    /// v(t) = (1-t)² for fade-out (fast start, slow finish)
    Logarithmic,

    /// v(t) = 0.5 × (1 - cos(π × t)) (gentle, musical)
    SCurve,

    /// v(t) = sin(t × π/2), keeping out² + in² at 1
    EqualPower,
}

impl FadeCurve {
    /// Fade-in multiplier at normalized position `t` ∈ [0, 1].
    ///
    /// 0.0 = silence at the start of the fade, 1.0 = full volume at the end.
    pub fn fade_in(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            // Logarithmic is the fade-out shape; inverted via sqrt for fade-in
            FadeCurve::Logarithmic => t.sqrt(),
            FadeCurve::SCurve => 0.5 * (1.0 - (std::f32::consts::PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Fade-out multiplier at normalized position `t` ∈ [0, 1].
    ///
    /// 1.0 = full volume at the start of the fade, 0.0 = silence at the end.
    pub fn fade_out(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::Exponential => {
                let inv = 1.0 - t;
                inv * inv
            }
            FadeCurve::Logarithmic => {
                let inv = 1.0 - t;
                inv * inv
            }
            FadeCurve::SCurve => 0.5 * (1.0 + (std::f32::consts::PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).cos(),
        }
    }

    /// Parse curve from its settings-store string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linear" => Some(FadeCurve::Linear),
            "exponential" => Some(FadeCurve::Exponential),
            "logarithmic" => Some(FadeCurve::Logarithmic),
            "cosine" | "scurve" | "s-curve" | "s_curve" => Some(FadeCurve::SCurve),
            "equal_power" | "equalpower" => Some(FadeCurve::EqualPower),
            _ => None,
        }
    }

    /// Canonical settings-store string
    pub fn as_str(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "linear",
            FadeCurve::Exponential => "exponential",
            FadeCurve::Logarithmic => "logarithmic",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        }
    }

    /// All available fade curve variants
    pub fn all_variants() -> &'static [FadeCurve] {
        &[
            FadeCurve::Linear,
            FadeCurve::Exponential,
            FadeCurve::Logarithmic,
            FadeCurve::SCurve,
            FadeCurve::EqualPower,
        ]
    }
}

impl Default for FadeCurve {
    fn default() -> Self {
        FadeCurve::Linear
    }
}

impl std::str::FromStr for FadeCurve {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::error::Error::Parse(format!("unknown fade curve '{s}'")))
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
