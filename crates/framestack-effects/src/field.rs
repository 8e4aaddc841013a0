//! Keyframed effect parameters.
//!
//! Every parameter is a [`KeyframeTrack`] with an optional value range.
//! Parameters are grouped into rows the way they appear in an effect's
//! controls; rows carry no semantics of their own.

use framestack_core::{KeyframeTrack, RationalTime};
use std::collections::HashMap;

/// One keyframed parameter.
#[derive(Debug, Clone)]
pub struct EffectField {
    id: String,
    min: f64,
    max: f64,
    track: KeyframeTrack,
}

impl EffectField {
    /// A constant field with an unbounded range.
    pub fn new(id: impl Into<String>, name: impl Into<String>, default: f64) -> Self {
        Self {
            id: id.into(),
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            track: KeyframeTrack::constant(name, default),
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.track.name
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn track(&self) -> &KeyframeTrack {
        &self.track
    }

    pub fn track_mut(&mut self) -> &mut KeyframeTrack {
        &mut self.track
    }

    /// Replace all keyframes with a single constant value.
    pub fn set_constant(&mut self, value: f64) {
        let name = std::mem::take(&mut self.track.name);
        self.track = KeyframeTrack::constant(name, value);
    }

    pub fn value_at(&self, time: RationalTime) -> f64 {
        self.track.evaluate(time).clamp(self.min, self.max)
    }

    /// Re-evaluate the track at `time`, updating its live value.
    pub fn refresh(&mut self, time: RationalTime) -> f64 {
        self.track.refresh(time).clamp(self.min, self.max)
    }
}

/// A named group of fields.
#[derive(Debug, Clone)]
pub struct EffectRow {
    pub name: String,
    pub fields: Vec<EffectField>,
}

impl EffectRow {
    pub fn new(name: impl Into<String>, fields: Vec<EffectField>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// A row holding one field of the same name.
    pub fn single(field: EffectField) -> Self {
        Self {
            name: field.name().to_string(),
            fields: vec![field],
        }
    }
}

/// Field values evaluated at one point in time, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues(HashMap<String, f64>);

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, value: f64) {
        self.0.insert(id.into(), value);
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.0.get(id).copied()
    }

    pub fn get_or(&self, id: &str, default: f64) -> f64 {
        self.get(id).unwrap_or(default)
    }

    /// Single-precision lookup, the form shader and coordinate code wants.
    pub fn f32(&self, id: &str, default: f32) -> f32 {
        self.get(id).map(|v| v as f32).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
