//! Level of Detail (LOD) selection from viewer distance
//!
//! A descending breakpoint table splits distance into bands. Inside a band
//! the detail rises linearly as the viewer approaches the next breakpoint:
//!
//! - farther than `breakpoints[0]`: `lod_t = 0`
//! - between `breakpoints[i-1]` and `breakpoints[i]`: `lod_t` in `[i-1, i]`
//! - closer than the last breakpoint: the last band runs down to distance 0
//!
//! The discrete `lod` is `floor(lod_t * steps_per_band)`. Crossing the
//! turbulence threshold emits a one-shot [`TurbulenceSignal`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// Default distance breakpoints, farthest first
pub const LOD_BREAKPOINTS: [f32; 3] = [100.0, 15.0, 7.0];

/// Discrete LOD steps per breakpoint band
pub const LOD_STEPS_PER_BAND: u32 = 250;

/// LOD at and above which the turbulence effect runs
pub const TURBULENCE_LOD: u32 = 250;

/// Configuration for LOD behavior
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Distance thresholds, strictly descending
    pub breakpoints: Vec<f32>,
    /// Discrete LOD steps per band
    pub steps_per_band: u32,
    /// Turbulence threshold on the discrete LOD
    pub turbulence_threshold: u32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            breakpoints: LOD_BREAKPOINTS.to_vec(),
            steps_per_band: LOD_STEPS_PER_BAND,
            turbulence_threshold: TURBULENCE_LOD,
        }
    }
}

impl LodConfig {
    /// Breakpoints must be non-empty, finite, positive and strictly descending
    pub fn validate(&self) -> Result<()> {
        if self.breakpoints.is_empty() {
            return Err(Error::Config("LOD breakpoints are empty".into()));
        }
        if self.breakpoints.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(Error::Config(format!(
                "LOD breakpoints must be finite and positive: {:?}",
                self.breakpoints
            )));
        }
        if self.breakpoints.windows(2).any(|w| w[1] >= w[0]) {
            return Err(Error::Config(format!(
                "LOD breakpoints must be strictly descending: {:?}",
                self.breakpoints
            )));
        }
        if self.steps_per_band == 0 {
            return Err(Error::Config("steps_per_band must be positive".into()));
        }
        Ok(())
    }
}

/// `(x - a) / (b - a)` clamped to `[0, 1]`
pub fn inverse_lerp(a: f32, b: f32, x: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((x - a) / (b - a)).clamp(0.0, 1.0)
}

/// Continuous detail level for a distance
///
/// # Examples
/// ```
/// use cloudstream::streaming::lod::continuous_lod;
///
/// let breakpoints = [100.0, 15.0, 7.0];
/// assert_eq!(continuous_lod(&breakpoints, 150.0), 0.0);
/// assert_eq!(continuous_lod(&breakpoints, 15.0), 1.0);
/// assert_eq!(continuous_lod(&breakpoints, 0.0), 3.0);
/// ```
pub fn continuous_lod(breakpoints: &[f32], distance: f32) -> f32 {
    let distance = distance.max(0.0);
    let i = breakpoints.iter().take_while(|&&b| distance < b).count();
    if i == 0 {
        return 0.0;
    }
    let lower = breakpoints.get(i).copied().unwrap_or(0.0);
    (i - 1) as f32 + inverse_lerp(breakpoints[i - 1], lower, distance)
}

/// Discrete LOD for a continuous level
pub fn discrete_lod(lod_t: f32, steps_per_band: u32) -> u32 {
    (lod_t * steps_per_band as f32).floor() as u32
}

/// Distance from `eye` to the closest point of an axis-aligned box, 0 inside
pub fn distance_to_bounds(min: Vec3, max: Vec3, eye: Vec3) -> f32 {
    eye.distance(eye.clamp(min, max))
}

/// One-shot edge of the turbulence effect
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurbulenceSignal {
    /// LOD rose through the threshold
    Enter,
    /// LOD fell back below the threshold
    Exit,
}

/// Effect driven by turbulence signals, implemented by the renderer
pub trait TurbulenceEffect {
    fn play(&mut self);
    /// Jump back to the first frame
    fn rewind(&mut self);
    /// Apply the current frame to the visual state
    fn sample(&mut self);
    fn stop(&mut self);
}

/// Drive an effect from a signal
///
/// On exit the effect is rewound and sampled before stopping, so its
/// terminal state is committed instead of left wherever it halted.
pub fn apply_turbulence(signal: TurbulenceSignal, effect: &mut dyn TurbulenceEffect) {
    match signal {
        TurbulenceSignal::Enter => effect.play(),
        TurbulenceSignal::Exit => {
            effect.rewind();
            effect.sample();
            effect.stop();
        }
    }
}

/// Result of one [`LodSelector::update`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodUpdate {
    pub lod: u32,
    pub lod_t: f32,
    /// Position inside the current band, 1.0 at zero distance
    pub sub_lod: f32,
    pub signal: Option<TurbulenceSignal>,
}

/// Per-object LOD state with turbulence hysteresis
#[derive(Clone, Debug)]
pub struct LodSelector {
    config: LodConfig,
    lod: u32,
    lod_t: f32,
    distance: f32,
}

impl LodSelector {
    pub fn new(config: LodConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            lod: 0,
            lod_t: 0.0,
            distance: 0.0,
        })
    }

    /// Recompute detail for this tick's viewer distance
    pub fn update(&mut self, distance: f32) -> LodUpdate {
        let lod_t = continuous_lod(&self.config.breakpoints, distance);
        let old_lod = self.lod;
        let lod = discrete_lod(lod_t, self.config.steps_per_band);

        let threshold = self.config.turbulence_threshold;
        let signal = if old_lod < threshold && lod >= threshold {
            Some(TurbulenceSignal::Enter)
        } else if old_lod >= threshold && lod < threshold {
            Some(TurbulenceSignal::Exit)
        } else {
            None
        };
        if let Some(signal) = signal {
            log::debug!("LOD {} -> {} at distance {:.2}: {:?}", old_lod, lod, distance, signal);
        }

        self.lod = lod;
        self.lod_t = lod_t;
        self.distance = distance;

        LodUpdate {
            lod,
            lod_t,
            sub_lod: if distance > 0.0 { lod_t.fract() } else { 1.0 },
            signal,
        }
    }

    pub fn lod(&self) -> u32 {
        self.lod
    }

    pub fn lod_t(&self) -> f32 {
        self.lod_t
    }

    /// Distance passed to the last update
    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn is_turbulent(&self) -> bool {
        self.lod >= self.config.turbulence_threshold
    }

    /// Nearest breakpoint, used by the renderer for near-field fading
    pub fn tunnel_distance(&self) -> f32 {
        self.config.breakpoints.last().copied().unwrap_or(0.0)
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }
}
