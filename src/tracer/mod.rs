pub mod cache;
pub mod config;
pub mod dispatch;
pub mod legacy;
pub mod lineage;
pub mod sensors;
pub mod stepper;


pub use cache::TraceCache;
pub use config::{Bounds, LossFactors, TraceConfig};
pub use dispatch::{interact, Continuation, Element, Interaction};
pub use legacy::{to_legacy, LegacyBeam, LegacySensorState, LegacyTraceResult};
pub use sensors::{Arrival, Detector, SensorDetail, SensorRegistry, SensorState, Superposition};

use log::{debug, trace as trace_log};
use serde::{Deserialize, Serialize};

use crate::optics::{Handedness, JonesVector, PolarizationInfo};
use crate::scene::{ComponentKind, ComponentParams, Direction, OpticalComponent, Overrides, PolarizationType};

pub const DEFAULT_EMITTER_INTENSITY: f64 = 100.0;

/// Прямой отрезок трассированного пучка.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamSegment {
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub direction: Direction,
    pub jones: JonesVector,
    pub intensity: f64,
    /// Ориентация эллипса поляризации, градусы в [0, 180)
    pub angle: f64,
    pub polarization: PolarizationInfo,
    pub coherence_id: String,
    /// Манхэттенская длина от излучателя до `end`
    pub path_length: f64,
    pub depth: usize,
    pub source_id: String,
    /// Компонент в `end`, `None` если пучок ушёл с сетки
    pub target_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    pub beams: Vec<BeamSegment>,
    pub sensor_states: Vec<SensorState>,
}

impl TraceResult {
    pub fn sensor(&self, id: &str) -> Option<&SensorState> {
        self.sensor_states.iter().find(|s| s.id == id)
    }

    pub fn activated_count(&self) -> usize {
        self.sensor_states.iter().filter(|s| s.activated).count()
    }
}

/// Луч в очереди на трассировку
struct Ray {
    origin: (f64, f64),
    direction: Direction,
    jones: JonesVector,
    coherence_id: String,
    path_length: f64,
    depth: usize,
}

/// Начальное поле излучателя.
pub fn emitter_jones(params: &ComponentParams) -> JonesVector {
    let intensity = params.intensity.unwrap_or(DEFAULT_EMITTER_INTENSITY);
    if let Some(v) = params.jones_vector {
        return match params.intensity {
            Some(i) => v.with_intensity(i),
            None => v,
        };
    }
    if params.polarization_type == Some(PolarizationType::Circular) {
        return JonesVector::circular(params.handedness.unwrap_or(Handedness::Right), intensity);
    }
    JonesVector::linear(
        params.polarization_angle.or(params.angle).unwrap_or(0.0),
        intensity,
    )
}

/// Трассирует все излучатели сцены.
///
/// Детерминирована и без побочных эффектов: одни и те же входы всегда дают
/// те же пучки в том же порядке.
pub fn trace(components: &[OpticalComponent], overrides: &Overrides, config: &TraceConfig) -> TraceResult {
    let resolved: Vec<OpticalComponent> = components
        .iter()
        .map(|c| c.resolve(overrides.get(&c.id)))
        .collect();
    let mut registry = SensorRegistry::new(&resolved, config);
    let mut beams = Vec::new();

    for emitter in resolved.iter().filter(|c| c.kind == ComponentKind::Emitter) {
        let mut work = vec![Ray {
            origin: emitter.position(),
            direction: emitter.params.direction.unwrap_or_default(),
            jones: emitter_jones(&emitter.params),
            coherence_id: lineage::root(&emitter.id),
            path_length: 0.0,
            depth: 0,
        }];

        while let Some(ray) = work.pop() {
            if ray.depth > config.max_depth {
                debug!(
                    "{}: ray {} cut at depth {} ({:?} from {:?})",
                    emitter.id, ray.coherence_id, ray.depth, ray.direction, ray.origin
                );
                continue;
            }
            if ray.jones.intensity() < config.min_intensity {
                continue;
            }

            let hit = stepper::next_component(ray.origin, ray.direction, &resolved, config);
            let end = match hit {
                Some(index) => resolved[index].position(),
                None => stepper::boundary_point(ray.origin, ray.direction, &config.bounds),
            };
            let path_length = ray.path_length + stepper::manhattan(ray.origin, end);
            let target_id = hit.map(|index| resolved[index].id.clone());
            trace_log!(
                "{} d={} {:?} {:?}->{:?} I={:.4} -> {}",
                ray.coherence_id,
                ray.depth,
                ray.direction,
                ray.origin,
                end,
                ray.jones.intensity(),
                target_id.as_deref().unwrap_or("boundary")
            );
            beams.push(BeamSegment {
                start: ray.origin,
                end,
                direction: ray.direction,
                jones: ray.jones,
                intensity: ray.jones.intensity(),
                angle: ray.jones.angle(),
                polarization: ray.jones.classify(),
                coherence_id: ray.coherence_id.clone(),
                path_length,
                depth: ray.depth,
                source_id: emitter.id.clone(),
                target_id,
            });

            let Some(index) = hit else {
                continue;
            };
            match dispatch::interact(&resolved[index], ray.direction, &ray.jones, &ray.coherence_id, config) {
                Interaction::Pass(outputs) => {
                    // в обратном порядке, чтобы первым трассировался первый выход
                    for out in outputs.into_iter().rev() {
                        work.push(Ray {
                            origin: end,
                            direction: out.direction,
                            jones: out.jones,
                            coherence_id: out.coherence_id,
                            path_length,
                            depth: ray.depth + 1,
                        });
                    }
                }
                Interaction::Absorb => registry.record(
                    index,
                    Arrival {
                        jones: ray.jones,
                        coherence_id: ray.coherence_id,
                        path_length,
                        direction: ray.direction,
                    },
                    config,
                ),
                Interaction::Block => {}
            }
        }
    }

    let result = TraceResult {
        beams,
        sensor_states: registry.finish(),
    };
    debug!(
        "Trace complete: {} components, {} beams, {}/{} detectors active",
        resolved.len(),
        result.beams.len(),
        result.activated_count(),
        result.sensor_states.len()
    );
    result
}
