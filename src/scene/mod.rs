pub mod component;

pub use component::{
    ComponentKind, ComponentOverride, ComponentParams, Direction, HiddenElement,
    InterferometerPort, OpticalComponent, Overrides, PolarizationType,
};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::SceneError;
use crate::tracer::{self, TraceConfig, TraceResult};

/// Полный вход трассировщика в том виде, как он лежит на диске.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub components: Vec<OpticalComponent>,
    #[serde(default)]
    pub overrides: Overrides,
    #[serde(default)]
    pub config: TraceConfig,
}

impl Scene {
    pub fn new(components: Vec<OpticalComponent>) -> Self {
        Self {
            components,
            overrides: Overrides::new(),
            config: TraceConfig::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let scene: Scene = serde_json::from_str(json)?;
        scene.config.validate()?;
        scene.report_anomalies();
        Ok(scene)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SceneError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let scene = Self::from_json(&raw)?;
        info!(
            "Loaded scene {}: {} components, {} overrides",
            path.as_ref().display(),
            scene.components.len(),
            scene.overrides.len()
        );
        Ok(scene)
    }

    pub fn trace(&self) -> TraceResult {
        tracer::trace(&self.components, &self.overrides, &self.config)
    }

    /// Не ошибки, а предупреждения: трассировка всё равно выполнится
    fn report_anomalies(&self) {
        let mut seen = HashSet::new();
        for component in &self.components {
            if !seen.insert(component.id.as_str()) {
                warn!("Duplicate component id: {}", component.id);
            }
            if let ComponentKind::Unknown(tag) = &component.kind {
                warn!("Component {} has unknown type '{}', it will block light", component.id, tag);
            }
        }
        for id in self.overrides.keys() {
            if !seen.contains(id.as_str()) {
                warn!("Override for missing component {}", id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_defaults() {
        let scene = Scene::from_json(r#"{"components": []}"#).unwrap();
        assert!(scene.components.is_empty());
        assert_eq!(scene.config.max_depth, TraceConfig::default().max_depth);
        assert!(scene.trace().beams.is_empty());
    }

    #[test]
    fn test_scene_rejects_bad_config() {
        let json = r#"{"components": [], "config": {"losses": {"mirror": 1.5}}}"#;
        match Scene::from_json(json) {
            Err(SceneError::Config(_)) => {}
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_scene_parse_error() {
        assert!(matches!(
            Scene::from_json("{not json"),
            Err(SceneError::Parse(_))
        ));
    }
}
