use serde::{Deserialize, Serialize};
use std::env;

use crate::error::ConfigError;

/// Коэффициенты пропускания по типам, каждый в (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LossFactors {
    pub mirror: f64,
    pub splitter: f64,
    pub rotator: f64,
    pub wave_plate: f64,
    pub phase_shifter: f64,
    pub isolator: f64,
    pub combiner: f64,
}

impl Default for LossFactors {
    fn default() -> Self {
        Self {
            mirror: 0.98,
            splitter: 0.99,
            rotator: 0.99,
            wave_plate: 0.99,
            phase_shifter: 0.99,
            isolator: 0.98,
            combiner: 1.0,
        }
    }
}

impl LossFactors {
    fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("mirror", self.mirror),
            ("splitter", self.splitter),
            ("rotator", self.rotator),
            ("wavePlate", self.wave_plate),
            ("phaseShifter", self.phase_shifter),
            ("isolator", self.isolator),
            ("combiner", self.combiner),
        ]
    }
}

/// Прямоугольник сетки; пучки без попадания кончаются на его краю.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 100.0,
            max_y: 100.0,
        }
    }
}

/// Параметры трассировки
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceConfig {
    /// Более глубокие лучи отбрасываются (так кончаются зеркальные петли)
    pub max_depth: usize,
    /// Более слабые лучи отбрасываются
    pub min_intensity: f64,
    pub losses: LossFactors,
    /// Наибольшее поперечное смещение, при котором компонент считается на луче
    pub alignment_tolerance: f64,
    /// Более близкие кандидаты игнорируются
    pub min_distance: f64,
    /// Если false, прибытия складываются только по интенсивности
    pub enable_interference: bool,
    /// Прибытия с разностью хода больше этой не интерферируют
    pub coherence_length: Option<f64>,
    pub bounds: Bounds,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_depth: 25,
            min_intensity: 1e-4,
            losses: LossFactors::default(),
            alignment_tolerance: 8.0,
            min_distance: 2.0,
            enable_interference: true,
            coherence_length: None,
            bounds: Bounds::default(),
        }
    }
}

pub const ENV_MAX_DEPTH: &str = "POLARTRACE_MAX_DEPTH";
pub const ENV_MIN_INTENSITY: &str = "POLARTRACE_MIN_INTENSITY";
pub const ENV_ALIGNMENT_TOLERANCE: &str = "POLARTRACE_ALIGNMENT_TOLERANCE";
pub const ENV_MIN_DISTANCE: &str = "POLARTRACE_MIN_DISTANCE";
pub const ENV_COHERENCE_LENGTH: &str = "POLARTRACE_COHERENCE_LENGTH";

fn parse_env<T: std::str::FromStr>(var: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value: raw })
}

impl TraceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.losses.named() {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::InvalidLoss { name, value });
            }
        }
        let tolerances = [
            ("minIntensity", self.min_intensity),
            ("alignmentTolerance", self.alignment_tolerance),
            ("minDistance", self.min_distance),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        if let Some(length) = self.coherence_length {
            if !length.is_finite() || length <= 0.0 {
                return Err(ConfigError::InvalidTolerance {
                    name: "coherenceLength",
                    value: length,
                });
            }
        }
        let b = self.bounds;
        if !(b.max_x > b.min_x && b.max_y > b.min_y) {
            return Err(ConfigError::InvalidBounds {
                min_x: b.min_x,
                min_y: b.min_y,
                max_x: b.max_x,
                max_y: b.max_y,
            });
        }
        Ok(())
    }

    /// Накладывает переменные окружения `POLARTRACE_*` поверх конфигурации.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|var| env::var(var).ok())
    }

    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            self.max_depth = parse_env(ENV_MAX_DEPTH, raw)?;
        }
        if let Some(raw) = lookup(ENV_MIN_INTENSITY) {
            self.min_intensity = parse_env(ENV_MIN_INTENSITY, raw)?;
        }
        if let Some(raw) = lookup(ENV_ALIGNMENT_TOLERANCE) {
            self.alignment_tolerance = parse_env(ENV_ALIGNMENT_TOLERANCE, raw)?;
        }
        if let Some(raw) = lookup(ENV_MIN_DISTANCE) {
            self.min_distance = parse_env(ENV_MIN_DISTANCE, raw)?;
        }
        if let Some(raw) = lookup(ENV_COHERENCE_LENGTH) {
            self.coherence_length = Some(parse_env(ENV_COHERENCE_LENGTH, raw)?);
        }
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TraceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: TraceConfig =
            serde_json::from_str(r#"{"maxDepth": 4, "losses": {"mirror": 0.5}}"#).unwrap();
        assert_eq!(cfg.max_depth, 4);
        assert_eq!(cfg.losses.mirror, 0.5);
        assert_eq!(cfg.losses.rotator, LossFactors::default().rotator);
        assert_eq!(cfg.alignment_tolerance, 8.0);
    }

    #[test]
    fn test_invalid_values() {
        let mut cfg = TraceConfig::default();
        cfg.losses.splitter = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidLoss { name: "splitter", .. })
        ));

        let mut cfg = TraceConfig::default();
        cfg.min_distance = -1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidTolerance { .. })));

        let mut cfg = TraceConfig::default();
        cfg.bounds.max_x = cfg.bounds.min_x;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidBounds { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = TraceConfig::default();
        cfg.apply_env_with(|var| match var {
            ENV_MAX_DEPTH => Some("7".to_string()),
            ENV_COHERENCE_LENGTH => Some(" 12.5 ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.max_depth, 7);
        assert_eq!(cfg.coherence_length, Some(12.5));

        let mut cfg = TraceConfig::default();
        let err = cfg
            .apply_env_with(|var| (var == ENV_MIN_INTENSITY).then(|| "bright".to_string()))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                var: ENV_MIN_INTENSITY,
                value: "bright".to_string()
            }
        );
    }
}
