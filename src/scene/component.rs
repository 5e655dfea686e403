use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::optics::{Handedness, JonesVector};

/// Направление распространения вдоль осей. Экранные координаты: y растёт вниз.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "right")]
    East,
    #[serde(alias = "left")]
    West,
    #[serde(alias = "up")]
    North,
    #[serde(alias = "down")]
    South,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::West,
        Direction::North,
        Direction::South,
    ];

    /// Единичный шаг (dx, dy)
    pub fn delta(self) -> (f64, f64) {
        match self {
            Direction::East => (1.0, 0.0),
            Direction::West => (-1.0, 0.0),
            Direction::North => (0.0, -1.0),
            Direction::South => (0.0, 1.0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
        }
    }

    /// 90° по часовой стрелке на экране
    pub fn clockwise(self) -> Self {
        match self {
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            Direction::North => Direction::East,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }

    /// Прижимает вектор к преобладающей оси; при равенстве выбирается горизонталь.
    pub fn from_vector(dx: f64, dy: f64) -> Self {
        if dx.abs() >= dy.abs() {
            if dx >= 0.0 {
                Direction::East
            } else {
                Direction::West
            }
        } else if dy >= 0.0 {
            Direction::South
        } else {
            Direction::North
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Direction::East
    }
}

/// Закрытый набор типов компонентов. Всё остальное сохраняется как `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Emitter,
    Polarizer,
    Mirror,
    Splitter,
    Rotator,
    HalfWavePlate,
    QuarterWavePlate,
    PhaseShifter,
    CircularFilter,
    BeamCombiner,
    Sensor,
    CoincidenceCounter,
    OpticalIsolator,
    MysteryBox,
    QuantumLock,
    InterferometerTarget,
    OpticalMine,
    Unknown(String),
}

impl ComponentKind {
    pub fn as_str(&self) -> &str {
        match self {
            ComponentKind::Emitter => "emitter",
            ComponentKind::Polarizer => "polarizer",
            ComponentKind::Mirror => "mirror",
            ComponentKind::Splitter => "splitter",
            ComponentKind::Rotator => "rotator",
            ComponentKind::HalfWavePlate => "halfWavePlate",
            ComponentKind::QuarterWavePlate => "quarterWavePlate",
            ComponentKind::PhaseShifter => "phaseShifter",
            ComponentKind::CircularFilter => "circularFilter",
            ComponentKind::BeamCombiner => "beamCombiner",
            ComponentKind::Sensor => "sensor",
            ComponentKind::CoincidenceCounter => "coincidenceCounter",
            ComponentKind::OpticalIsolator => "opticalIsolator",
            ComponentKind::MysteryBox => "mysteryBox",
            ComponentKind::QuantumLock => "quantumLock",
            ComponentKind::InterferometerTarget => "interferometerTarget",
            ComponentKind::OpticalMine => "opticalMine",
            ComponentKind::Unknown(tag) => tag.as_str(),
        }
    }

    /// Детекторы поглощают свет и имеют своё состояние
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ComponentKind::Sensor
                | ComponentKind::CoincidenceCounter
                | ComponentKind::QuantumLock
                | ComponentKind::InterferometerTarget
                | ComponentKind::OpticalMine
        )
    }
}

impl From<&str> for ComponentKind {
    fn from(tag: &str) -> Self {
        match tag {
            "emitter" => ComponentKind::Emitter,
            "polarizer" => ComponentKind::Polarizer,
            "mirror" => ComponentKind::Mirror,
            "splitter" => ComponentKind::Splitter,
            "rotator" => ComponentKind::Rotator,
            "halfWavePlate" => ComponentKind::HalfWavePlate,
            "quarterWavePlate" => ComponentKind::QuarterWavePlate,
            "phaseShifter" => ComponentKind::PhaseShifter,
            "circularFilter" => ComponentKind::CircularFilter,
            "beamCombiner" => ComponentKind::BeamCombiner,
            "sensor" => ComponentKind::Sensor,
            "coincidenceCounter" => ComponentKind::CoincidenceCounter,
            "opticalIsolator" => ComponentKind::OpticalIsolator,
            "mysteryBox" => ComponentKind::MysteryBox,
            "quantumLock" => ComponentKind::QuantumLock,
            "interferometerTarget" => ComponentKind::InterferometerTarget,
            "opticalMine" => ComponentKind::OpticalMine,
            other => ComponentKind::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ComponentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComponentKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(ComponentKind::from(tag.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolarizationType {
    Linear,
    Circular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterferometerPort {
    Bright,
    Dark,
}

impl Default for InterferometerPort {
    fn default() -> Self {
        InterferometerPort::Bright
    }
}

/// Элемент, спрятанный в mystery box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HiddenElement {
    Polarizer,
    HalfWavePlate,
    QuarterWavePlate,
    Rotator,
    Retarder,
}

/// Параметры компонента по типам. Все поля необязательны, значения по
/// умолчанию подставляются при разрешении компонента в элемент.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentParams {
    pub angle: Option<f64>,
    pub polarization_angle: Option<f64>,
    pub direction: Option<Direction>,
    pub intensity: Option<f64>,
    pub jones_vector: Option<JonesVector>,
    pub polarization_type: Option<PolarizationType>,
    pub handedness: Option<Handedness>,
    pub rotation_amount: Option<f64>,
    pub crystal_axis_angle: Option<f64>,
    pub retardance: Option<f64>,
    pub phase_shift: Option<f64>,
    pub required_intensity: Option<f64>,
    pub required_polarization: Option<f64>,
    pub target_jones_vector: Option<JonesVector>,
    pub fidelity_threshold: Option<f64>,
    pub port: Option<InterferometerPort>,
    pub min_intensity: Option<f64>,
    pub max_intensity: Option<f64>,
    pub mine_threshold: Option<f64>,
    pub safe_jones_vector: Option<JonesVector>,
    pub safe_tolerance: Option<f64>,
    pub required_beam_count: Option<usize>,
    pub required_phase_difference: Option<f64>,
    pub phase_tolerance: Option<f64>,
    pub filter_handedness: Option<Handedness>,
    pub allowed_direction: Option<Direction>,
    pub faraday_rotation: Option<f64>,
    pub hidden_element_type: Option<HiddenElement>,
    pub hidden_angle: Option<f64>,
    pub hidden_retardation: Option<f64>,
}

impl ComponentParams {
    /// Слияние по полям; заданные в `over` значения побеждают
    pub fn merged_with(&self, over: &ComponentParams) -> ComponentParams {
        ComponentParams {
            angle: over.angle.or(self.angle),
            polarization_angle: over.polarization_angle.or(self.polarization_angle),
            direction: over.direction.or(self.direction),
            intensity: over.intensity.or(self.intensity),
            jones_vector: over.jones_vector.or(self.jones_vector),
            polarization_type: over.polarization_type.or(self.polarization_type),
            handedness: over.handedness.or(self.handedness),
            rotation_amount: over.rotation_amount.or(self.rotation_amount),
            crystal_axis_angle: over.crystal_axis_angle.or(self.crystal_axis_angle),
            retardance: over.retardance.or(self.retardance),
            phase_shift: over.phase_shift.or(self.phase_shift),
            required_intensity: over.required_intensity.or(self.required_intensity),
            required_polarization: over.required_polarization.or(self.required_polarization),
            target_jones_vector: over.target_jones_vector.or(self.target_jones_vector),
            fidelity_threshold: over.fidelity_threshold.or(self.fidelity_threshold),
            port: over.port.or(self.port),
            min_intensity: over.min_intensity.or(self.min_intensity),
            max_intensity: over.max_intensity.or(self.max_intensity),
            mine_threshold: over.mine_threshold.or(self.mine_threshold),
            safe_jones_vector: over.safe_jones_vector.or(self.safe_jones_vector),
            safe_tolerance: over.safe_tolerance.or(self.safe_tolerance),
            required_beam_count: over.required_beam_count.or(self.required_beam_count),
            required_phase_difference: over
                .required_phase_difference
                .or(self.required_phase_difference),
            phase_tolerance: over.phase_tolerance.or(self.phase_tolerance),
            filter_handedness: over.filter_handedness.or(self.filter_handedness),
            allowed_direction: over.allowed_direction.or(self.allowed_direction),
            faraday_rotation: over.faraday_rotation.or(self.faraday_rotation),
            hidden_element_type: over.hidden_element_type.or(self.hidden_element_type),
            hidden_angle: over.hidden_angle.or(self.hidden_angle),
            hidden_retardation: over.hidden_retardation.or(self.hidden_retardation),
        }
    }
}

/// Компонент на сетке. Трассировщик его только читает.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticalComponent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub x: f64,
    pub y: f64,
    #[serde(flatten)]
    pub params: ComponentParams,
}

impl OpticalComponent {
    pub fn new(id: impl Into<String>, kind: ComponentKind, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            kind,
            x,
            y,
            params: ComponentParams::default(),
        }
    }

    pub fn with_params(mut self, params: ComponentParams) -> Self {
        self.params = params;
        self
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Применяет оверрайд и возвращает компонент, который видит трассировщик.
    pub fn resolve(&self, over: Option<&ComponentOverride>) -> OpticalComponent {
        match over {
            None => self.clone(),
            Some(o) => OpticalComponent {
                id: self.id.clone(),
                kind: self.kind.clone(),
                x: o.x.unwrap_or(self.x),
                y: o.y.unwrap_or(self.y),
                params: self.params.merged_with(&o.params),
            },
        }
    }
}

/// Частичный компонент, приходящий во время работы (например, от слайдера).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentOverride {
    pub x: Option<f64>,
    pub y: Option<f64>,
    #[serde(flatten)]
    pub params: ComponentParams,
}

/// Оверрайды по id компонента; BTreeMap даёт стабильную сериализацию
pub type Overrides = BTreeMap<String, ComponentOverride>;
