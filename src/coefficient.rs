//! Slider-bound noise coefficient.
//!
//! The viewer owns exactly one [`Coefficient`]; input handlers mutate it and
//! every redraw reads [`Coefficient::value`] into the shader uniforms.
//! Values are stored as a step index so repeated increments never drift.

use crate::config::CoefficientOptions;

#[derive(Debug, Clone, PartialEq)]
pub struct Coefficient {
    min: f32,
    max: f32,
    step: f32,
    index: u32,
    max_index: u32,
}

impl Coefficient {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(options: &CoefficientOptions) -> Self {
        let span = (options.max - options.min).max(0.0);
        let max_index = if options.step > 0.0 {
            // ceil so a max that is not a step multiple stays reachable
            ((span / options.step) - 1e-4).ceil().max(0.0) as u32
        } else {
            0
        };
        let mut coefficient = Self {
            min: options.min,
            max: options.max,
            step: options.step,
            index: 0,
            max_index,
        };
        coefficient.set(options.default);
        coefficient
    }

    pub fn value(&self) -> f32 {
        self.value_at(self.index)
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Clamp and snap `value` to the nearest step or to `max`. Returns whether the stored
    /// value changed; non-finite input is ignored.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set(&mut self, value: f32) -> bool {
        if !value.is_finite() || self.step <= 0.0 {
            return false;
        }
        let clamped = value.clamp(self.min, self.max);
        if clamped >= self.max {
            return self.set_index(self.max_index);
        }
        // the top index holds max, which may be off the step grid
        let below = ((clamped - self.min) / self.step).floor().max(0.0) as u32;
        let below = below.min(self.max_index);
        let above = below.saturating_add(1).min(self.max_index);
        let to_above = (self.value_at(above) - clamped).abs();
        let to_below = (clamped - self.value_at(below)).abs();
        let index = if to_above <= to_below { above } else { below };
        self.set_index(index)
    }

    pub fn increment(&mut self) -> bool {
        self.set_index(self.index.saturating_add(1))
    }

    pub fn decrement(&mut self) -> bool {
        self.set_index(self.index.saturating_sub(1))
    }

    pub fn to_min(&mut self) -> bool {
        self.set_index(0)
    }

    pub fn to_max(&mut self) -> bool {
        self.set_index(self.max_index)
    }

    /// Position along the slider track, `0.0` at the left edge.
    pub fn set_from_fraction(&mut self, fraction: f32) -> bool {
        if !fraction.is_finite() {
            return false;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        self.set(self.min + fraction * (self.max - self.min))
    }

    pub fn fraction(&self) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.value() - self.min) / span).clamp(0.0, 1.0)
    }

    #[allow(clippy::cast_precision_loss)]
    fn value_at(&self, index: u32) -> f32 {
        (self.min + index as f32 * self.step).min(self.max)
    }

    fn set_index(&mut self, index: u32) -> bool {
        let index = index.min(self.max_index);
        let changed = index != self.index;
        self.index = index;
        changed
    }
}

impl Default for Coefficient {
    fn default() -> Self {
        Self::new(&CoefficientOptions::default())
    }
}
