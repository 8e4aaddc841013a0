//! Lookup of built-in effects by name.

use crate::builtin::{BrightnessContrast, ChromaKey, CornerPin, Invert, SolidColor, Transform};
use crate::effect::{Effect, EffectProcessor};

/// Built-in effects registry.
pub struct EffectRegistry {
    effects: Vec<Box<dyn EffectProcessor>>,
}

impl EffectRegistry {
    /// Create a new registry with built-in effects.
    pub fn new() -> Self {
        Self {
            effects: vec![
                Box::new(Transform),
                Box::new(CornerPin),
                Box::new(Invert),
                Box::new(BrightnessContrast),
                Box::new(ChromaKey),
                Box::new(SolidColor),
            ],
        }
    }

    pub fn register(&mut self, effect: Box<dyn EffectProcessor>) {
        self.effects.push(effect);
    }

    /// Find an effect by name.
    pub fn find(&self, name: &str) -> Option<&dyn EffectProcessor> {
        self.effects
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.as_ref())
    }

    /// A new effect instance with default parameters.
    pub fn create(&self, name: &str) -> Option<Effect> {
        self.find(name).map(|e| Effect::from_boxed(e.clone_box()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.effects.iter().map(|e| e.name()).collect()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_effects() {
        let reg = EffectRegistry::new();
        assert_eq!(reg.names().len(), 6);
        let effect = reg.create("Chroma Key").unwrap();
        assert!(effect.capabilities().shader);
        assert!(effect.field("tolerance").is_some());
        assert!(reg.find("Solid Color").unwrap().capabilities().superimpose);
    }

    #[test]
    fn test_every_shader_builtin_has_cpu_and_wgsl() {
        let reg = EffectRegistry::new();
        for name in reg.names() {
            let processor = reg.find(name).unwrap();
            if processor.capabilities().shader {
                let source = processor.shader().unwrap();
                assert!(source.cpu.is_some(), "{name}");
                assert!(source.wgsl.is_some(), "{name}");
                assert_eq!(source.label, name);
            }
        }
    }
}
