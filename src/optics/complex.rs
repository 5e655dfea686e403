//! Вспомогательные функции над `num_complex`.

pub use num_complex::Complex64;

pub const ZERO: Complex64 = Complex64::new(0.0, 0.0);
pub const ONE: Complex64 = Complex64::new(1.0, 0.0);
pub const I: Complex64 = Complex64::new(0.0, 1.0);

/// e^{iθ}, θ в радианах
#[inline]
pub fn cis(theta: f64) -> Complex64 {
    Complex64::from_polar(1.0, theta)
}

/// e^{iθ}, θ в градусах
#[inline]
pub fn cis_deg(theta_deg: f64) -> Complex64 {
    cis(theta_deg.to_radians())
}

/// Фаза комплексного числа в градусах, (-180, 180]
#[inline]
pub fn phase_deg(z: Complex64) -> f64 {
    z.arg().to_degrees()
}

/// Приводит угол в градусах к (-180, 180].
pub fn wrap_deg(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}

pub fn approx_eq(a: Complex64, b: Complex64, eps: f64) -> bool {
    (a - b).norm() <= eps
}
