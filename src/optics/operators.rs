//! Матрицы Джонса оптических элементов. Все углы в градусах.

use super::complex::{cis_deg, ONE, ZERO};
use super::jones::JonesMatrix;

/// Идеальный линейный поляризатор с осью пропускания `axis_deg`.
pub fn polarizer(axis_deg: f64) -> JonesMatrix {
    let t = axis_deg.to_radians();
    let (s, c) = t.sin_cos();
    JonesMatrix::real(c * c, c * s, c * s, s * s)
}

/// Поворот плоскости поляризации на `angle_deg`.
pub fn rotator(angle_deg: f64) -> JonesMatrix {
    let t = angle_deg.to_radians();
    let (s, c) = t.sin_cos();
    JonesMatrix::real(c, -s, s, c)
}

/// Линейный фазовый замедлитель: `R(-θ)·diag(1, e^{-iδ})·R(θ)`.
pub fn retarder(fast_axis_deg: f64, retardance_deg: f64) -> JonesMatrix {
    let t = fast_axis_deg.to_radians();
    let (s, c) = t.sin_cos();
    let e = cis_deg(-retardance_deg);
    let off = (ONE - e) * (c * s);
    JonesMatrix::new(
        ONE * (c * c) + e * (s * s),
        off,
        off,
        ONE * (s * s) + e * (c * c),
    )
}

pub fn half_wave_plate(fast_axis_deg: f64) -> JonesMatrix {
    retarder(fast_axis_deg, 180.0)
}

pub fn quarter_wave_plate(fast_axis_deg: f64) -> JonesMatrix {
    retarder(fast_axis_deg, 90.0)
}

/// Глобальная фаза e^{iΔφ}; интенсивность и поляризация не меняются
pub fn phase_shifter(shift_deg: f64) -> JonesMatrix {
    let p = cis_deg(shift_deg);
    JonesMatrix::new(p, ZERO, ZERO, p)
}

/// Закон Малюса: I = I₀·cos²(Δθ)
pub fn malus_law(initial_intensity: f64, delta_deg: f64) -> f64 {
    let c = delta_deg.to_radians().cos();
    initial_intensity * c * c
}
