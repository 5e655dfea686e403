use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use super::complex::{Complex64, I, ONE, ZERO};

/// Допуск на нормированную циркулярность |S3|/|S| при классификации
pub const CLASSIFY_TOLERANCE: f64 = 1e-2;

/// Ниже этого S0 света нет
pub const DARK_INTENSITY: f64 = 1e-12;

/// Смесь со степенью поляризации ниже порога считается неполяризованной
pub const DEPOLARIZED_DOP: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn opposite(self) -> Self {
        match self {
            Handedness::Left => Handedness::Right,
            Handedness::Right => Handedness::Left,
        }
    }

    /// Знак S3 (S3 > 0 у левой поляризации)
    pub fn stokes_sign(self) -> f64 {
        match self {
            Handedness::Left => 1.0,
            Handedness::Right => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolarizationKind {
    Linear,
    Circular,
    Elliptical,
    Unpolarized,
}

/// Производное описание состояния поляризации.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolarizationInfo {
    pub kind: PolarizationKind,
    pub handedness: Option<Handedness>,
    /// Ориентация эллипса, градусы в [0, 180)
    pub angle: f64,
    /// tan(χ) со знаком, в [-1, 1]; положителен у левых состояний
    pub ellipticity: f64,
}

impl PolarizationInfo {
    /// Нет света или нет преобладающей поляризации.
    pub fn unpolarized() -> Self {
        Self {
            kind: PolarizationKind::Unpolarized,
            handedness: None,
            angle: 0.0,
            ellipticity: 0.0,
        }
    }
}

/// Параметры Стокса. Для одного состояния Джонса свет полностью поляризован,
/// сумма некогерентных пучков может быть поляризована частично.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StokesVector {
    pub s0: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl StokesVector {
    /// √(S1² + S2² + S3²)
    pub fn polarized_intensity(&self) -> f64 {
        (self.s1 * self.s1 + self.s2 * self.s2 + self.s3 * self.s3).sqrt()
    }

    /// Степень поляризации; для состояния Джонса всегда ≈ 1
    pub fn degree_of_polarization(&self) -> f64 {
        if self.s0 < DARK_INTENSITY {
            return 0.0;
        }
        (self.polarized_intensity() / self.s0).min(1.0)
    }

    /// Циркулярность поляризованной части, S3/|S| в [-1, 1].
    pub fn circularity(&self) -> f64 {
        let p = self.polarized_intensity();
        if p < DARK_INTENSITY {
            return 0.0;
        }
        (self.s3 / p).clamp(-1.0, 1.0)
    }

    /// Ориентация в градусах, [0, 180).
    pub fn angle(&self) -> f64 {
        if self.s1.abs() < DARK_INTENSITY && self.s2.abs() < DARK_INTENSITY {
            return 0.0;
        }
        let psi = 0.5 * self.s2.atan2(self.s1).to_degrees();
        let wrapped = psi.rem_euclid(180.0);
        // rem_euclid может дать ровно 180.0 для крошечных отрицательных значений
        if wrapped >= 180.0 {
            0.0
        } else {
            wrapped
        }
    }

    pub fn classify(&self) -> PolarizationInfo {
        if self.s0 < DARK_INTENSITY || self.degree_of_polarization() < DEPOLARIZED_DOP {
            return PolarizationInfo::unpolarized();
        }
        let c = self.circularity();
        let ellipticity = (0.5 * c.asin()).tan();
        let handedness = if c > 0.0 {
            Handedness::Left
        } else {
            Handedness::Right
        };

        if c.abs() < CLASSIFY_TOLERANCE {
            PolarizationInfo {
                kind: PolarizationKind::Linear,
                handedness: None,
                angle: self.angle(),
                ellipticity,
            }
        } else if c.abs() > 1.0 - CLASSIFY_TOLERANCE {
            PolarizationInfo {
                kind: PolarizationKind::Circular,
                handedness: Some(handedness),
                angle: 0.0,
                ellipticity,
            }
        } else {
            PolarizationInfo {
                kind: PolarizationKind::Elliptical,
                handedness: Some(handedness),
                angle: self.angle(),
                ellipticity,
            }
        }
    }

    /// Поляризованная часть как вектор Джонса с интенсивностью |S|.
    /// Глобальная фаза выбрана так, что Ex вещественна при χ = 0.
    pub fn polarized_part(&self) -> JonesVector {
        let p = self.polarized_intensity();
        if p < DARK_INTENSITY {
            return JonesVector::zero();
        }
        let amp = p.sqrt();
        let (sp, cp) = self.angle().to_radians().sin_cos();
        let (sc, cc) = (0.5 * self.circularity().asin()).sin_cos();
        JonesVector::new(
            Complex64::new(amp * cp * cc, amp * sp * sc),
            Complex64::new(amp * sp * cc, -amp * cp * sc),
        )
    }
}

/// Некогерентное сложение: складываются интенсивности, а не амплитуды
impl Add for StokesVector {
    type Output = StokesVector;

    fn add(self, other: StokesVector) -> StokesVector {
        StokesVector {
            s0: self.s0 + other.s0,
            s1: self.s1 + other.s1,
            s2: self.s2 + other.s2,
            s3: self.s3 + other.s3,
        }
    }
}

impl Sum for StokesVector {
    fn sum<It: Iterator<Item = StokesVector>>(iter: It) -> StokesVector {
        iter.fold(StokesVector::default(), Add::add)
    }
}

/// Поперечная амплитуда поля `[Ex, Ey]`.
#[derive(Clone, Copy, PartialEq)]
pub struct JonesVector(pub Vector2<Complex64>);

impl JonesVector {
    pub fn new(ex: Complex64, ey: Complex64) -> Self {
        Self(Vector2::new(ex, ey))
    }

    pub fn zero() -> Self {
        Self::new(ZERO, ZERO)
    }

    /// Линейное состояние под углом `angle_deg` с интенсивностью `intensity`
    pub fn linear(angle_deg: f64, intensity: f64) -> Self {
        let amp = intensity.max(0.0).sqrt();
        let theta = angle_deg.to_radians();
        Self::new(
            Complex64::new(amp * theta.cos(), 0.0),
            Complex64::new(amp * theta.sin(), 0.0),
        )
    }

    /// Круговое состояние; правое это `[1, i]/√2`
    pub fn circular(handedness: Handedness, intensity: f64) -> Self {
        let amp = (intensity.max(0.0) / 2.0).sqrt();
        let ey = match handedness {
            Handedness::Right => I,
            Handedness::Left => -I,
        };
        Self::new(ONE * amp, ey * amp)
    }

    pub fn ex(&self) -> Complex64 {
        self.0[0]
    }

    pub fn ey(&self) -> Complex64 {
        self.0[1]
    }

    /// |Ex|² + |Ey|²
    pub fn intensity(&self) -> f64 {
        self.ex().norm_sqr() + self.ey().norm_sqr()
    }

    pub fn stokes(&self) -> StokesVector {
        let ex = self.ex();
        let ey = self.ey();
        let cross = ex * ey.conj();
        StokesVector {
            s0: ex.norm_sqr() + ey.norm_sqr(),
            s1: ex.norm_sqr() - ey.norm_sqr(),
            s2: 2.0 * cross.re,
            s3: 2.0 * cross.im,
        }
    }

    /// Ориентация в градусах, [0, 180); не зависит от глобальной фазы
    pub fn angle(&self) -> f64 {
        self.stokes().angle()
    }

    pub fn classify(&self) -> PolarizationInfo {
        self.stokes().classify()
    }

    /// Умножает обе амплитуды на вещественный множитель.
    pub fn scale(&self, factor: f64) -> Self {
        Self(self.0.map(|z| z * factor))
    }

    /// Умножает обе амплитуды на комплексный множитель.
    pub fn scale_complex(&self, factor: Complex64) -> Self {
        Self(self.0.map(|z| z * factor))
    }

    /// Масштабирует интенсивность на `factor` (амплитуду на корень из него).
    pub fn attenuate(&self, factor: f64) -> Self {
        self.scale(factor.max(0.0).sqrt())
    }

    /// То же состояние с интенсивностью `intensity`; ноль остаётся нулём
    pub fn with_intensity(&self, intensity: f64) -> Self {
        let current = self.intensity();
        if current < DARK_INTENSITY {
            return Self::zero();
        }
        self.scale((intensity.max(0.0) / current).sqrt())
    }

    /// Когерентная суперпозиция: покомпонентное комплексное сложение
    pub fn superpose(&self, other: &JonesVector) -> Self {
        Self(self.0 + other.0)
    }

    /// ⟨self|other⟩
    pub fn inner(&self, other: &JonesVector) -> Complex64 {
        self.ex().conj() * other.ex() + self.ey().conj() * other.ey()
    }

    /// Нормированное перекрытие |⟨target|self⟩|² / (|target|²·|self|²), в [0, 1]
    pub fn fidelity(&self, target: &JonesVector) -> f64 {
        let norm = self.intensity() * target.intensity();
        if norm < DARK_INTENSITY * DARK_INTENSITY {
            return 0.0;
        }
        (target.inner(self).norm_sqr() / norm).clamp(0.0, 1.0)
    }

    pub fn approx_eq(&self, other: &JonesVector, eps: f64) -> bool {
        (self.ex() - other.ex()).norm() <= eps && (self.ey() - other.ey()).norm() <= eps
    }
}

impl Default for JonesVector {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for JonesVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Jones[{}, {}]", self.ex(), self.ey())
    }
}

impl From<[[f64; 2]; 2]> for JonesVector {
    fn from(raw: [[f64; 2]; 2]) -> Self {
        Self::new(
            Complex64::new(raw[0][0], raw[0][1]),
            Complex64::new(raw[1][0], raw[1][1]),
        )
    }
}

// На проводе `[[re, im], [re, im]]`: так num-complex сериализует Complex64
impl Serialize for JonesVector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.ex(), self.ey()].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JonesVector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [ex, ey] = <[Complex64; 2]>::deserialize(deserializer)?;
        Ok(JonesVector::new(ex, ey))
    }
}

/// Комплексный оператор 2×2 над векторами Джонса.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JonesMatrix(pub Matrix2<Complex64>);

impl JonesMatrix {
    /// Конструктор по строкам
    pub fn new(m11: Complex64, m12: Complex64, m21: Complex64, m22: Complex64) -> Self {
        Self(Matrix2::new(m11, m12, m21, m22))
    }

    pub fn real(m11: f64, m12: f64, m21: f64, m22: f64) -> Self {
        Self::new(
            Complex64::new(m11, 0.0),
            Complex64::new(m12, 0.0),
            Complex64::new(m21, 0.0),
            Complex64::new(m22, 0.0),
        )
    }

    pub fn identity() -> Self {
        Self(Matrix2::identity())
    }

    pub fn apply(&self, v: &JonesVector) -> JonesVector {
        JonesVector(self.0 * v.0)
    }

    /// Композиция: сначала действует `self`, затем `next`.
    pub fn then(&self, next: &JonesMatrix) -> JonesMatrix {
        JonesMatrix(next.0 * self.0)
    }

    pub fn scale(&self, factor: Complex64) -> JonesMatrix {
        JonesMatrix(self.0.map(|z| z * factor))
    }

    pub fn entry(&self, row: usize, col: usize) -> Complex64 {
        self.0[(row, col)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optics::complex::cis_deg;

    #[test]
    fn test_linear_state() {
        let v = JonesVector::linear(30.0, 4.0);
        assert!((v.intensity() - 4.0).abs() < 1e-12);
        assert!((v.angle() - 30.0).abs() < 1e-9);
        let info = v.classify();
        assert_eq!(info.kind, PolarizationKind::Linear);
        assert_eq!(info.handedness, None);
    }

    #[test]
    fn test_angle_ignores_global_phase() {
        let v = JonesVector::linear(120.0, 1.0).scale_complex(cis_deg(73.0));
        assert!((v.angle() - 120.0).abs() < 1e-9);
        assert_eq!(v.classify().kind, PolarizationKind::Linear);
    }

    #[test]
    fn test_circular_handedness() {
        let r = JonesVector::circular(Handedness::Right, 2.0);
        let l = JonesVector::circular(Handedness::Left, 2.0);
        assert!((r.intensity() - 2.0).abs() < 1e-12);
        assert_eq!(r.classify().kind, PolarizationKind::Circular);
        assert_eq!(r.classify().handedness, Some(Handedness::Right));
        assert_eq!(l.classify().handedness, Some(Handedness::Left));
        assert!(r.stokes().s3 < 0.0);
        assert!(r.fidelity(&l) < 1e-12);
    }

    #[test]
    fn test_elliptical() {
        // Неравные амплитуды с относительной фазой в четверть волны
        let v = JonesVector::new(Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.5));
        let info = v.classify();
        assert_eq!(info.kind, PolarizationKind::Elliptical);
        assert_eq!(info.handedness, Some(Handedness::Right));
        assert!((info.ellipticity + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_dark_vector() {
        let info = JonesVector::zero().classify();
        assert_eq!(info.kind, PolarizationKind::Unpolarized);
        assert_eq!(JonesVector::zero().fidelity(&JonesVector::linear(0.0, 1.0)), 0.0);
    }

    #[test]
    fn test_stokes_fully_polarized() {
        let v = JonesVector::new(Complex64::new(0.3, -0.2), Complex64::new(-0.7, 0.1));
        let s = v.stokes();
        assert!((s.degree_of_polarization() - 1.0).abs() < 1e-9);
        assert!((s.s0 - v.intensity()).abs() < 1e-12);
    }

    #[test]
    fn test_incoherent_orthogonal_sum_is_unpolarized() {
        let sum = JonesVector::linear(0.0, 50.0).stokes() + JonesVector::linear(90.0, 50.0).stokes();
        assert!((sum.s0 - 100.0).abs() < 1e-9);
        assert!(sum.degree_of_polarization() < 1e-9);
        assert_eq!(sum.classify().kind, PolarizationKind::Unpolarized);
        assert!(sum.polarized_part().intensity() < 1e-9);

        let sum: StokesVector = [
            JonesVector::circular(Handedness::Left, 3.0).stokes(),
            JonesVector::circular(Handedness::Right, 3.0).stokes(),
        ]
        .into_iter()
        .sum();
        assert_eq!(sum.classify().kind, PolarizationKind::Unpolarized);
    }

    #[test]
    fn test_partially_polarized_mix() {
        // 80 + 20 ортогонально: DOP = 0.6, остаётся линейная часть 60 под 0°
        let sum = JonesVector::linear(0.0, 80.0).stokes() + JonesVector::linear(90.0, 20.0).stokes();
        assert!((sum.degree_of_polarization() - 0.6).abs() < 1e-9);
        let info = sum.classify();
        assert_eq!(info.kind, PolarizationKind::Linear);
        assert!(info.angle.abs() < 1e-9);
        let part = sum.polarized_part();
        assert!((part.intensity() - 60.0).abs() < 1e-9);
        assert!((part.fidelity(&JonesVector::linear(0.0, 1.0)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_polarized_part_recovers_state() {
        let states = [
            JonesVector::new(Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.5)),
            JonesVector::new(Complex64::new(0.3, -0.2), Complex64::new(-0.7, 0.1)),
            JonesVector::circular(Handedness::Right, 2.0),
            JonesVector::circular(Handedness::Left, 2.0),
            JonesVector::linear(135.0, 7.0),
        ];
        for v in states {
            let back = v.stokes().polarized_part();
            assert!((back.intensity() - v.intensity()).abs() < 1e-9, "{:?}", v);
            assert!((back.fidelity(&v) - 1.0).abs() < 1e-9, "{:?}", v);
        }
    }

    #[test]
    fn test_superpose_out_of_phase_cancels() {
        let a = JonesVector::linear(0.0, 9.0);
        let b = a.scale_complex(cis_deg(180.0));
        assert!(a.superpose(&b).intensity() < 1e-20);
        assert!((a.superpose(&a).intensity() - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_fidelity_is_scale_invariant() {
        let a = JonesVector::linear(10.0, 1.0);
        let b = JonesVector::linear(10.0, 50.0).scale_complex(cis_deg(33.0));
        assert!((a.fidelity(&b) - 1.0).abs() < 1e-12);
        let c = JonesVector::linear(100.0, 3.0);
        assert!(a.fidelity(&c) < 1e-12);
    }

    #[test]
    fn test_matrix_composition_order() {
        let swap = JonesMatrix::real(0.0, 1.0, 1.0, 0.0);
        let kill_y = JonesMatrix::real(1.0, 0.0, 0.0, 0.0);
        let v = JonesVector::linear(90.0, 1.0);
        // swap переводит свет на x, затем kill_y его пропускает
        let out = swap.then(&kill_y).apply(&v);
        assert!((out.intensity() - 1.0).abs() < 1e-12);
        let out = kill_y.then(&swap).apply(&v);
        assert!(out.intensity() < 1e-12);
    }

    #[test]
    fn test_serde_wire_format() {
        let v = JonesVector::new(Complex64::new(1.0, 0.5), Complex64::new(-0.25, 0.0));
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[[1.0,0.5],[-0.25,0.0]]");
        let back: JonesVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
