//! Накопление прибытий на детекторах, суперпозиция и правила активации.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::optics::complex::{phase_deg, wrap_deg};
use crate::optics::jones::DARK_INTENSITY;
use crate::optics::{JonesVector, PolarizationInfo, PolarizationKind, StokesVector};
use crate::scene::{ComponentKind, Direction, InterferometerPort, OpticalComponent};

use super::config::TraceConfig;
use super::lineage;

pub const DEFAULT_REQUIRED_INTENSITY: f64 = 1.0;
/// Допустимая ошибка ориентации (градусы, по модулю 180) для requiredPolarization
pub const POLARIZATION_ANGLE_TOLERANCE: f64 = 5.0;
/// Минимальная верность для сенсора с targetJonesVector
pub const TARGET_FIDELITY_TOLERANCE: f64 = 0.95;
pub const DEFAULT_LOCK_FIDELITY: f64 = 0.99;
pub const DEFAULT_BRIGHT_MIN_INTENSITY: f64 = 50.0;
pub const DEFAULT_DARK_MAX_INTENSITY: f64 = 1.0;
pub const DEFAULT_REQUIRED_BEAM_COUNT: usize = 2;
pub const DEFAULT_PHASE_TOLERANCE: f64 = 10.0;
pub const DEFAULT_MINE_THRESHOLD: f64 = 10.0;
pub const DEFAULT_SAFE_TOLERANCE: f64 = 0.95;

/// Ниже этого |E| фаза компоненты не имеет смысла
const PHASE_AMPLITUDE_FLOOR: f64 = 1e-9;

/// Один пучок, дошедший до детектора.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrival {
    pub jones: JonesVector,
    pub coherence_id: String,
    pub path_length: f64,
    pub direction: Direction,
}

/// Конфигурация детектора с подставленными умолчаниями, по варианту на тип.
#[derive(Debug, Clone, PartialEq)]
pub enum Detector {
    Sensor {
        required_intensity: f64,
        required_polarization: Option<f64>,
        target: Option<JonesVector>,
    },
    QuantumLock {
        required_intensity: f64,
        target: JonesVector,
        fidelity_threshold: f64,
    },
    InterferometerTarget {
        port: InterferometerPort,
        min_intensity: f64,
        max_intensity: f64,
    },
    CoincidenceCounter {
        required_beam_count: usize,
        required_phase_difference: f64,
        phase_tolerance: f64,
        required_intensity: f64,
    },
    Mine {
        threshold: f64,
        safe: Option<JonesVector>,
        safe_tolerance: f64,
    },
}

impl Detector {
    pub fn from_component(component: &OpticalComponent) -> Option<Detector> {
        let p = &component.params;
        let required_intensity = p.required_intensity.unwrap_or(DEFAULT_REQUIRED_INTENSITY);
        let detector = match component.kind {
            ComponentKind::Sensor => Detector::Sensor {
                required_intensity,
                required_polarization: p.required_polarization,
                target: p.target_jones_vector,
            },
            ComponentKind::QuantumLock => Detector::QuantumLock {
                required_intensity,
                target: p
                    .target_jones_vector
                    .unwrap_or_else(|| JonesVector::linear(0.0, 1.0)),
                fidelity_threshold: p.fidelity_threshold.unwrap_or(DEFAULT_LOCK_FIDELITY),
            },
            ComponentKind::InterferometerTarget => Detector::InterferometerTarget {
                port: p.port.unwrap_or_default(),
                min_intensity: p.min_intensity.unwrap_or(DEFAULT_BRIGHT_MIN_INTENSITY),
                max_intensity: p.max_intensity.unwrap_or(DEFAULT_DARK_MAX_INTENSITY),
            },
            ComponentKind::CoincidenceCounter => Detector::CoincidenceCounter {
                required_beam_count: p
                    .required_beam_count
                    .unwrap_or(DEFAULT_REQUIRED_BEAM_COUNT)
                    .max(1),
                required_phase_difference: p.required_phase_difference.unwrap_or(0.0),
                phase_tolerance: p.phase_tolerance.unwrap_or(DEFAULT_PHASE_TOLERANCE),
                required_intensity,
            },
            ComponentKind::OpticalMine => Detector::Mine {
                threshold: p.mine_threshold.unwrap_or(DEFAULT_MINE_THRESHOLD),
                safe: p.safe_jones_vector,
                safe_tolerance: p.safe_tolerance.unwrap_or(DEFAULT_SAFE_TOLERANCE),
            },
            _ => return None,
        };
        Some(detector)
    }
}

/// Часть состояния, зависящая от типа детектора
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SensorDetail {
    Sensor {
        required_intensity: f64,
    },
    QuantumLock {
        fidelity_threshold: f64,
    },
    InterferometerTarget {
        port: InterferometerPort,
        bound: f64,
    },
    CoincidenceCounter {
        required_beam_count: usize,
        phase_difference: Option<f64>,
    },
    Mine {
        threshold: f64,
        triggered: bool,
    },
}

/// Итоговое состояние детектора после трассировки.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorState {
    pub id: String,
    pub arrivals: Vec<Arrival>,
    /// При некогерентной смеси только поляризованная часть; `intensity` полная
    pub resultant: JonesVector,
    pub intensity: f64,
    pub polarization: PolarizationInfo,
    /// Для мин true означает «безопасно»
    pub activated: bool,
    pub fidelity: f64,
    pub detail: SensorDetail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub resultant: JonesVector,
    pub intensity: f64,
    pub polarization: PolarizationInfo,
    pub activated: bool,
    pub fidelity: f64,
    pub detail: SensorDetail,
}

pub fn mutually_coherent(a: &Arrival, b: &Arrival, config: &TraceConfig) -> bool {
    if !config.enable_interference {
        return false;
    }
    if lineage::diverged(&a.coherence_id, &b.coherence_id) {
        return false;
    }
    match config.coherence_length {
        Some(length) => (a.path_length - b.path_length).abs() <= length,
        None => true,
    }
}

/// Поле на детекторе: суммы взаимно когерентных групп прибытий.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Superposition {
    /// Комплексная сумма каждой группы, в порядке первого прибытия
    pub groups: Vec<JonesVector>,
}

impl Superposition {
    /// Группы складываются по интенсивности.
    pub fn intensity(&self) -> f64 {
        self.groups.iter().fold(0.0, |acc, g| acc + g.intensity())
    }

    pub fn stokes(&self) -> StokesVector {
        self.groups.iter().map(|g| g.stokes()).sum()
    }

    /// Для одной группы это её комплексная сумма, для смеси только
    /// поляризованная часть суммы Стокса.
    pub fn resultant(&self) -> JonesVector {
        match self.groups.as_slice() {
            [] => JonesVector::zero(),
            [single] => *single,
            _ => self.stokes().polarized_part(),
        }
    }

    pub fn classify(&self) -> PolarizationInfo {
        self.stokes().classify()
    }

    /// Средняя по интенсивности верность групп к `target`.
    pub fn fidelity(&self, target: &JonesVector) -> f64 {
        match self.groups.as_slice() {
            [] => 0.0,
            [single] => single.fidelity(target),
            groups => {
                let total = self.intensity();
                if total < DARK_INTENSITY {
                    return 0.0;
                }
                groups
                    .iter()
                    .map(|g| g.intensity() * g.fidelity(target))
                    .sum::<f64>()
                    / total
            }
        }
    }
}

/// Группирует прибытия жадно, в порядке прихода: новое прибытие входит в
/// первую группу, с каждым членом которой оно когерентно. Внутри группы
/// амплитуды складываются комплексно.
pub fn superpose(arrivals: &[Arrival], config: &TraceConfig) -> Superposition {
    let mut groups: Vec<(Vec<usize>, JonesVector)> = Vec::new();
    for (i, arrival) in arrivals.iter().enumerate() {
        let slot = groups.iter_mut().find(|(members, _)| {
            members
                .iter()
                .all(|&j| mutually_coherent(&arrivals[j], arrival, config))
        });
        match slot {
            Some((members, sum)) => {
                members.push(i);
                *sum = sum.superpose(&arrival.jones);
            }
            None => groups.push((vec![i], arrival.jones)),
        }
    }
    Superposition {
        groups: groups.into_iter().map(|(_, sum)| sum).collect(),
    }
}

/// Расстояние между ориентациями по модулю 180°.
fn orientation_error(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(180.0);
    d.min(180.0 - d)
}

/// Разность фаз двух прибытий в градусах. Меряется по Ex, если у обоих
/// пучков Ex не пренебрежимо мала, иначе по Ey.
pub fn phase_difference(first: &JonesVector, second: &JonesVector) -> f64 {
    let use_ex = first.ex().norm() > PHASE_AMPLITUDE_FLOOR
        && second.ex().norm() > PHASE_AMPLITUDE_FLOOR;
    let (a, b) = if use_ex {
        (first.ex(), second.ex())
    } else {
        (first.ey(), second.ey())
    };
    wrap_deg(phase_deg(b) - phase_deg(a))
}

/// Пересчитывает состояние детектора по полному списку прибытий.
pub fn evaluate(detector: &Detector, arrivals: &[Arrival], config: &TraceConfig) -> Evaluation {
    let field = superpose(arrivals, config);
    let resultant = field.resultant();
    let intensity = field.intensity();
    let polarization = field.classify();
    // детектор без единого прибытия никогда не активен, кроме мины
    let lit = !arrivals.is_empty();

    let (activated, fidelity, detail) = match detector {
        Detector::Sensor {
            required_intensity,
            required_polarization,
            target,
        } => {
            let mut activated = lit && intensity >= *required_intensity;
            if let Some(angle) = required_polarization {
                let oriented = matches!(
                    polarization.kind,
                    PolarizationKind::Linear | PolarizationKind::Elliptical
                );
                activated &= oriented
                    && orientation_error(polarization.angle, *angle) <= POLARIZATION_ANGLE_TOLERANCE;
            }
            let fidelity = match target {
                Some(target) => {
                    let fidelity = field.fidelity(target);
                    activated &= fidelity >= TARGET_FIDELITY_TOLERANCE;
                    fidelity
                }
                None if activated => 1.0,
                // частичный зачёт для слабого, но в остальном подходящего пучка
                None if *required_intensity > 0.0 && required_polarization.is_none() => {
                    (intensity / required_intensity).min(1.0)
                }
                None => 0.0,
            };
            (
                activated,
                fidelity,
                SensorDetail::Sensor {
                    required_intensity: *required_intensity,
                },
            )
        }
        Detector::QuantumLock {
            required_intensity,
            target,
            fidelity_threshold,
        } => {
            let fidelity = field.fidelity(target);
            (
                lit && intensity >= *required_intensity && fidelity >= *fidelity_threshold,
                fidelity,
                SensorDetail::QuantumLock {
                    fidelity_threshold: *fidelity_threshold,
                },
            )
        }
        Detector::InterferometerTarget {
            port,
            min_intensity,
            max_intensity,
        } => match port {
            InterferometerPort::Bright => {
                let fidelity = if !lit {
                    0.0
                } else if *min_intensity > 0.0 {
                    (intensity / min_intensity).min(1.0)
                } else {
                    1.0
                };
                (
                    lit && intensity >= *min_intensity,
                    fidelity,
                    SensorDetail::InterferometerTarget {
                        port: *port,
                        bound: *min_intensity,
                    },
                )
            }
            InterferometerPort::Dark => {
                let within = intensity <= *max_intensity;
                let fidelity = if within {
                    1.0
                } else {
                    (max_intensity / intensity).clamp(0.0, 1.0)
                };
                (
                    lit && within,
                    if lit { fidelity } else { 0.0 },
                    SensorDetail::InterferometerTarget {
                        port: *port,
                        bound: *max_intensity,
                    },
                )
            }
        },
        Detector::CoincidenceCounter {
            required_beam_count,
            required_phase_difference,
            phase_tolerance,
            required_intensity,
        } => {
            let detail = |phase_difference| SensorDetail::CoincidenceCounter {
                required_beam_count: *required_beam_count,
                phase_difference,
            };
            if arrivals.len() < *required_beam_count {
                (false, 0.0, detail(None))
            } else {
                let total: f64 = arrivals.iter().map(|a| a.jones.intensity()).sum();
                let bright_enough = total >= *required_intensity;
                if arrivals.len() < 2 {
                    (bright_enough, if bright_enough { 1.0 } else { 0.0 }, detail(None))
                } else {
                    let delta = phase_difference(&arrivals[0].jones, &arrivals[1].jones);
                    let error = wrap_deg(delta - required_phase_difference).abs();
                    (
                        bright_enough && error <= *phase_tolerance,
                        (1.0 - error / 180.0).clamp(0.0, 1.0),
                        detail(Some(delta)),
                    )
                }
            }
        }
        Detector::Mine {
            threshold,
            safe,
            safe_tolerance,
        } => {
            let fidelity = safe.map(|s| field.fidelity(&s)).unwrap_or(0.0);
            let bypassed = safe.is_some() && fidelity > *safe_tolerance;
            let triggered = intensity >= *threshold && !bypassed;
            (
                !triggered,
                fidelity,
                SensorDetail::Mine {
                    threshold: *threshold,
                    triggered,
                },
            )
        }
    };

    Evaluation {
        resultant,
        intensity,
        polarization,
        activated,
        fidelity,
        detail,
    }
}

struct RegistryEntry {
    id: String,
    detector: Detector,
    arrivals: Vec<Arrival>,
    evaluation: Evaluation,
}

/// Реестр детекторов одной трассировки, индекс по позиции компонента.
pub struct SensorRegistry {
    entries: Vec<RegistryEntry>,
    slots: Vec<Option<usize>>,
}

impl SensorRegistry {
    pub fn new(components: &[OpticalComponent], config: &TraceConfig) -> Self {
        let mut entries = Vec::new();
        let mut slots = Vec::with_capacity(components.len());
        for component in components {
            match Detector::from_component(component) {
                Some(detector) => {
                    slots.push(Some(entries.len()));
                    let evaluation = evaluate(&detector, &[], config);
                    entries.push(RegistryEntry {
                        id: component.id.clone(),
                        detector,
                        arrivals: Vec::new(),
                        evaluation,
                    });
                }
                None => slots.push(None),
            }
        }
        Self { entries, slots }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Записывает прибытие в компонент `index`; не-детекторы игнорируются
    pub fn record(&mut self, index: usize, arrival: Arrival, config: &TraceConfig) {
        let Some(Some(slot)) = self.slots.get(index).copied() else {
            return;
        };
        let entry = &mut self.entries[slot];
        entry.arrivals.push(arrival);
        let evaluation = evaluate(&entry.detector, &entry.arrivals, config);
        if evaluation.activated != entry.evaluation.activated {
            debug!(
                "{}: activated {} -> {} (I={:.4}, F={:.4}, arrivals={})",
                entry.id,
                entry.evaluation.activated,
                evaluation.activated,
                evaluation.intensity,
                evaluation.fidelity,
                entry.arrivals.len()
            );
        }
        entry.evaluation = evaluation;
    }

    /// Превращает реестр в выходной список в порядке компонентов.
    pub fn finish(self) -> Vec<SensorState> {
        self.entries
            .into_iter()
            .map(|entry| SensorState {
                id: entry.id,
                arrivals: entry.arrivals,
                resultant: entry.evaluation.resultant,
                intensity: entry.evaluation.intensity,
                polarization: entry.evaluation.polarization,
                activated: entry.evaluation.activated,
                fidelity: entry.evaluation.fidelity,
                detail: entry.evaluation.detail,
            })
            .collect()
    }
}
