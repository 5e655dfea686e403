pub mod error;
pub mod optics;
pub mod scene;
pub mod tracer;

pub use error::{ConfigError, SceneError};
pub use optics::{JonesMatrix, JonesVector, PolarizationInfo, PolarizationKind};
pub use scene::{ComponentKind, ComponentParams, OpticalComponent, Overrides, Scene};
pub use tracer::{trace, to_legacy, BeamSegment, SensorState, TraceCache, TraceConfig, TraceResult};
