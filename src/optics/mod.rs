pub mod complex;
pub mod jones;
pub mod operators;

pub use complex::Complex64;
pub use jones::{
    Handedness, JonesMatrix, JonesVector, PolarizationInfo, PolarizationKind, StokesVector,
};
pub use operators::{
    half_wave_plate, malus_law, phase_shifter, polarizer, quarter_wave_plate, retarder, rotator,
};
