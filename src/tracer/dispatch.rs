//! Взаимодействие пучка с компонентами.

use log::trace;

use crate::optics::complex::ONE;
use crate::optics::{self, Handedness, JonesMatrix, JonesVector, PolarizationKind};
use crate::scene::{ComponentKind, Direction, HiddenElement, OpticalComponent};

use super::config::TraceConfig;
use super::lineage;

pub const DEFAULT_MIRROR_ANGLE: f64 = 45.0;
pub const DEFAULT_ROTATION: f64 = 45.0;
pub const DEFAULT_RETARDANCE: f64 = 90.0;
pub const DEFAULT_FARADAY_ROTATION: f64 = 45.0;

/// Один выходящий пучок.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    pub direction: Direction,
    pub jones: JonesVector,
    pub coherence_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    /// Свет выходит из компонента этими пучками
    Pass(Vec<Continuation>),
    /// Свет поглощён детектором и должен быть там записан
    Absorb,
    /// Свет гаснет без записи
    Block,
}

/// Нетерминальный компонент с подставленными значениями по умолчанию.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element {
    Transparent,
    Polarizer { axis: f64 },
    Mirror { angle: f64 },
    Splitter { crystal_axis: f64 },
    Rotator { amount: f64 },
    Retarder { fast_axis: f64, retardance: f64 },
    PhaseShifter { shift: f64 },
    CircularFilter { handedness: Handedness },
    BeamCombiner,
    Isolator { allowed: Direction, faraday_rotation: f64 },
    Detector,
    Opaque,
}

impl Element {
    pub fn from_component(component: &OpticalComponent) -> Element {
        let p = &component.params;
        let angle = p.angle.unwrap_or(0.0);
        match &component.kind {
            ComponentKind::Emitter => Element::Transparent,
            ComponentKind::Polarizer => Element::Polarizer {
                axis: p.polarization_angle.or(p.angle).unwrap_or(0.0),
            },
            ComponentKind::Mirror => Element::Mirror {
                angle: p.angle.unwrap_or(DEFAULT_MIRROR_ANGLE),
            },
            ComponentKind::Splitter => Element::Splitter {
                crystal_axis: p.crystal_axis_angle.or(p.angle).unwrap_or(0.0),
            },
            ComponentKind::Rotator => Element::Rotator {
                amount: p.rotation_amount.or(p.angle).unwrap_or(DEFAULT_ROTATION),
            },
            ComponentKind::HalfWavePlate => Element::Retarder {
                fast_axis: angle,
                retardance: 180.0,
            },
            ComponentKind::QuarterWavePlate => Element::Retarder {
                fast_axis: angle,
                retardance: 90.0,
            },
            ComponentKind::PhaseShifter => Element::PhaseShifter {
                shift: p.phase_shift.or(p.retardance).unwrap_or(DEFAULT_RETARDANCE),
            },
            ComponentKind::CircularFilter => Element::CircularFilter {
                handedness: p.filter_handedness.or(p.handedness).unwrap_or(Handedness::Right),
            },
            ComponentKind::BeamCombiner => Element::BeamCombiner,
            ComponentKind::OpticalIsolator => Element::Isolator {
                allowed: p.allowed_direction.unwrap_or_default(),
                faraday_rotation: p.faraday_rotation.unwrap_or(DEFAULT_FARADAY_ROTATION),
            },
            ComponentKind::MysteryBox => {
                let hidden_angle = p.hidden_angle.unwrap_or(0.0);
                match p.hidden_element_type.unwrap_or(HiddenElement::Polarizer) {
                    HiddenElement::Polarizer => Element::Polarizer { axis: hidden_angle },
                    HiddenElement::HalfWavePlate => Element::Retarder {
                        fast_axis: hidden_angle,
                        retardance: 180.0,
                    },
                    HiddenElement::QuarterWavePlate => Element::Retarder {
                        fast_axis: hidden_angle,
                        retardance: 90.0,
                    },
                    HiddenElement::Rotator => Element::Rotator {
                        amount: hidden_angle,
                    },
                    HiddenElement::Retarder => Element::Retarder {
                        fast_axis: hidden_angle,
                        retardance: p.hidden_retardation.unwrap_or(DEFAULT_RETARDANCE),
                    },
                }
            }
            kind if kind.is_terminal() => Element::Detector,
            _ => Element::Opaque,
        }
    }
}

/// Отражает `incoming` от зеркала под углом `angle_deg` (экранные координаты:
/// 45° рисуется как "/" и поворачивает пучок с востока на север).
pub fn reflect(incoming: Direction, angle_deg: f64) -> Direction {
    let t = angle_deg.to_radians();
    let (mx, my) = (t.cos(), -t.sin());
    let (dx, dy) = incoming.delta();
    let dot = dx * mx + dy * my;
    Direction::from_vector(2.0 * dot * mx - dx, 2.0 * dot * my - dy)
}

/// Доля интенсивности, которую пропускает круговой фильтр `handedness`.
pub fn circular_transmission(jones: &JonesVector, handedness: Handedness) -> f64 {
    let info = jones.classify();
    match info.kind {
        PolarizationKind::Unpolarized => 0.0,
        PolarizationKind::Linear => 0.5,
        PolarizationKind::Circular => {
            if info.handedness == Some(handedness) {
                1.0
            } else {
                0.0
            }
        }
        PolarizationKind::Elliptical => {
            let c = jones.stokes().circularity();
            ((1.0 + handedness.stokes_sign() * c) / 2.0).clamp(0.0, 1.0)
        }
    }
}

fn circular_filter(jones: &JonesVector, handedness: Handedness) -> JonesVector {
    let transmitted = jones.intensity() * circular_transmission(jones, handedness);
    let basis = JonesVector::circular(handedness, 1.0);
    let projection = basis.inner(jones);
    let phase = if projection.norm() > 1e-12 {
        projection / projection.norm()
    } else {
        ONE
    };
    basis.scale(transmitted.sqrt()).scale_complex(phase)
}

fn straight(
    direction: Direction,
    matrix: &JonesMatrix,
    jones: &JonesVector,
    loss: f64,
    coherence_id: &str,
) -> Continuation {
    Continuation {
        direction,
        jones: matrix.apply(jones).attenuate(loss),
        coherence_id: coherence_id.to_string(),
    }
}

fn pass(config: &TraceConfig, outputs: Vec<Continuation>) -> Interaction {
    let alive: Vec<Continuation> = outputs
        .into_iter()
        .filter(|c| c.jones.intensity() >= config.min_intensity)
        .collect();
    if alive.is_empty() {
        Interaction::Block
    } else {
        Interaction::Pass(alive)
    }
}

/// Что происходит с пучком, идущим в `direction`, когда он достигает `component`.
pub fn interact(
    component: &OpticalComponent,
    direction: Direction,
    jones: &JonesVector,
    coherence_id: &str,
    config: &TraceConfig,
) -> Interaction {
    let losses = &config.losses;
    let element = Element::from_component(component);
    trace!("{} ({}) <- {:?} {:?}", component.id, component.kind, direction, element);

    match element {
        Element::Transparent => pass(
            config,
            vec![Continuation {
                direction,
                jones: *jones,
                coherence_id: coherence_id.to_string(),
            }],
        ),
        Element::Polarizer { axis } => pass(
            config,
            vec![straight(direction, &optics::polarizer(axis), jones, 1.0, coherence_id)],
        ),
        Element::Mirror { angle } => pass(
            config,
            vec![Continuation {
                direction: reflect(direction, angle),
                jones: jones.attenuate(losses.mirror),
                coherence_id: coherence_id.to_string(),
            }],
        ),
        Element::Splitter { crystal_axis } => {
            let ordinary = optics::polarizer(crystal_axis).apply(jones);
            let extraordinary = optics::polarizer(crystal_axis + 90.0).apply(jones);
            pass(
                config,
                vec![
                    Continuation {
                        direction,
                        jones: ordinary.attenuate(losses.splitter),
                        coherence_id: lineage::split(coherence_id, &component.id, lineage::ORDINARY),
                    },
                    Continuation {
                        direction: direction.clockwise(),
                        jones: extraordinary.attenuate(losses.splitter),
                        coherence_id: lineage::split(
                            coherence_id,
                            &component.id,
                            lineage::EXTRAORDINARY,
                        ),
                    },
                ],
            )
        }
        Element::Rotator { amount } => pass(
            config,
            vec![straight(direction, &optics::rotator(amount), jones, losses.rotator, coherence_id)],
        ),
        Element::Retarder { fast_axis, retardance } => pass(
            config,
            vec![straight(
                direction,
                &optics::retarder(fast_axis, retardance),
                jones,
                losses.wave_plate,
                coherence_id,
            )],
        ),
        Element::PhaseShifter { shift } => pass(
            config,
            vec![straight(
                direction,
                &optics::phase_shifter(shift),
                jones,
                losses.phase_shifter,
                coherence_id,
            )],
        ),
        Element::CircularFilter { handedness } => pass(
            config,
            vec![Continuation {
                direction,
                jones: circular_filter(jones, handedness),
                coherence_id: coherence_id.to_string(),
            }],
        ),
        Element::BeamCombiner => pass(
            config,
            vec![Continuation {
                direction,
                jones: jones.attenuate(losses.combiner),
                coherence_id: lineage::recombine(coherence_id),
            }],
        ),
        Element::Isolator {
            allowed,
            faraday_rotation,
        } => {
            if direction != allowed {
                return Interaction::Block;
            }
            pass(
                config,
                vec![straight(
                    direction,
                    &optics::rotator(faraday_rotation),
                    jones,
                    losses.isolator,
                    coherence_id,
                )],
            )
        }
        Element::Detector => Interaction::Absorb,
        Element::Opaque => Interaction::Block,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optics::Complex64;
    use crate::scene::ComponentParams;

    fn component(kind: ComponentKind, params: ComponentParams) -> OpticalComponent {
        OpticalComponent::new("c", kind, 10.0, 0.0).with_params(params)
    }

    fn single(interaction: Interaction) -> Continuation {
        match interaction {
            Interaction::Pass(mut outs) if outs.len() == 1 => outs.remove(0),
            other => panic!("expected one continuation, got {:?}", other),
        }
    }

    #[test]
    fn test_polarizer_blocks_orthogonal() {
        let cfg = TraceConfig::default();
        let c = component(
            ComponentKind::Polarizer,
            ComponentParams {
                polarization_angle: Some(90.0),
                ..Default::default()
            },
        );
        let out = interact(&c, Direction::East, &JonesVector::linear(0.0, 100.0), "e", &cfg);
        assert_eq!(out, Interaction::Block);
    }

    #[test]
    fn test_mirror_geometry() {
        assert_eq!(reflect(Direction::East, 45.0), Direction::North);
        assert_eq!(reflect(Direction::North, 45.0), Direction::East);
        assert_eq!(reflect(Direction::West, 45.0), Direction::South);
        assert_eq!(reflect(Direction::East, 135.0), Direction::South);
        assert_eq!(reflect(Direction::South, 135.0), Direction::East);
    }

    #[test]
    fn test_mirror_attenuates() {
        let cfg = TraceConfig::default();
        let c = component(ComponentKind::Mirror, ComponentParams::default());
        let out = single(interact(&c, Direction::East, &JonesVector::linear(0.0, 10.0), "e", &cfg));
        assert_eq!(out.direction, Direction::North);
        assert!((out.jones.intensity() - 10.0 * cfg.losses.mirror).abs() < 1e-9);
    }

    #[test]
    fn test_splitter_branches() {
        let cfg = TraceConfig::default();
        let c = component(ComponentKind::Splitter, ComponentParams::default());
        let input = JonesVector::linear(30.0, 100.0);
        match interact(&c, Direction::East, &input, "laser", &cfg) {
            Interaction::Pass(outs) => {
                assert_eq!(outs.len(), 2);
                assert_eq!(outs[0].direction, Direction::East);
                assert_eq!(outs[1].direction, Direction::South);
                assert_ne!(outs[0].coherence_id, outs[1].coherence_id);
                assert!(lineage::diverged(&outs[0].coherence_id, &outs[1].coherence_id));
                let total = outs[0].jones.intensity() + outs[1].jones.intensity();
                assert!((total - 100.0 * cfg.losses.splitter).abs() < 1e-9);
                assert!((outs[0].jones.intensity() - 75.0 * cfg.losses.splitter).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_splitter_drops_dark_branch() {
        let cfg = TraceConfig::default();
        let c = component(ComponentKind::Splitter, ComponentParams::default());
        let out = single(interact(&c, Direction::East, &JonesVector::linear(90.0, 1.0), "l", &cfg));
        assert_eq!(out.direction, Direction::South);
    }

    #[test]
    fn test_circular_filter_rules() {
        let right = JonesVector::circular(Handedness::Right, 4.0);
        assert_eq!(circular_transmission(&right, Handedness::Right), 1.0);
        assert_eq!(circular_transmission(&right, Handedness::Left), 0.0);
        assert_eq!(circular_transmission(&JonesVector::linear(17.0, 4.0), Handedness::Left), 0.5);

        let cfg = TraceConfig::default();
        let c = component(ComponentKind::CircularFilter, ComponentParams::default());
        let out = single(interact(&c, Direction::East, &JonesVector::linear(17.0, 4.0), "l", &cfg));
        assert!((out.jones.intensity() - 2.0).abs() < 1e-9);
        assert_eq!(out.jones.classify().handedness, Some(Handedness::Right));
    }

    #[test]
    fn test_circular_filter_splits_elliptical_light() {
        let cfg = TraceConfig::default();
        // правоэллиптический свет с S3/S0 = -0.8
        let v = JonesVector::new(Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.5));
        assert_eq!(v.classify().kind, PolarizationKind::Elliptical);
        let right = circular_transmission(&v, Handedness::Right);
        let left = circular_transmission(&v, Handedness::Left);
        assert!((right - 0.9).abs() < 1e-9);
        assert!((left - 0.1).abs() < 1e-9);
        assert!((right + left - 1.0).abs() < 1e-12);

        for (handedness, fraction) in [(Handedness::Right, 0.9), (Handedness::Left, 0.1)] {
            let c = component(
                ComponentKind::CircularFilter,
                ComponentParams {
                    filter_handedness: Some(handedness),
                    ..Default::default()
                },
            );
            let out = single(interact(&c, Direction::East, &v, "l", &cfg));
            assert!((out.jones.intensity() - 1.25 * fraction).abs() < 1e-9);
            assert_eq!(out.jones.classify().kind, PolarizationKind::Circular);
            assert_eq!(out.jones.classify().handedness, Some(handedness));
        }
    }

    #[test]
    fn test_isolator_is_one_way() {
        let cfg = TraceConfig::default();
        let c = component(
            ComponentKind::OpticalIsolator,
            ComponentParams {
                allowed_direction: Some(Direction::East),
                ..Default::default()
            },
        );
        let v = JonesVector::linear(0.0, 10.0);
        let out = single(interact(&c, Direction::East, &v, "l", &cfg));
        assert!((out.jones.angle() - 45.0).abs() < 1e-9);
        assert_eq!(interact(&c, Direction::West, &v, "l", &cfg), Interaction::Block);
        assert_eq!(interact(&c, Direction::North, &v, "l", &cfg), Interaction::Block);
    }

    #[test]
    fn test_mystery_box_matches_named_element() {
        let cfg = TraceConfig::default();
        let boxed = component(
            ComponentKind::MysteryBox,
            ComponentParams {
                hidden_element_type: Some(HiddenElement::HalfWavePlate),
                hidden_angle: Some(22.5),
                ..Default::default()
            },
        );
        let plate = component(
            ComponentKind::HalfWavePlate,
            ComponentParams {
                angle: Some(22.5),
                ..Default::default()
            },
        );
        let v = JonesVector::linear(0.0, 10.0);
        let a = single(interact(&boxed, Direction::East, &v, "l", &cfg));
        let b = single(interact(&plate, Direction::East, &v, "l", &cfg));
        assert!(a.jones.approx_eq(&b.jones, 1e-12));
        assert!((a.jones.angle() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_mystery_box_hidden_retarder() {
        let cfg = TraceConfig::default();
        let boxed = |angle: f64, retardation: Option<f64>| {
            component(
                ComponentKind::MysteryBox,
                ComponentParams {
                    hidden_element_type: Some(HiddenElement::Retarder),
                    hidden_angle: Some(angle),
                    hidden_retardation: retardation,
                    ..Default::default()
                },
            )
        };
        let diagonal = JonesVector::linear(45.0, 10.0);
        let out = single(interact(&boxed(0.0, Some(90.0)), Direction::East, &diagonal, "l", &cfg));
        let expected = optics::retarder(0.0, 90.0)
            .apply(&diagonal)
            .attenuate(cfg.losses.wave_plate);
        assert!(out.jones.approx_eq(&expected, 1e-12));
        assert_eq!(out.jones.classify().handedness, Some(Handedness::Left));

        // без hiddenRetardation действует четвертьволновая задержка
        let default = single(interact(&boxed(0.0, None), Direction::East, &diagonal, "l", &cfg));
        assert!(default.jones.approx_eq(&out.jones, 1e-12));

        let half = single(interact(
            &boxed(22.5, Some(180.0)),
            Direction::East,
            &JonesVector::linear(0.0, 10.0),
            "l",
            &cfg,
        ));
        assert!((half.jones.angle() - 45.0).abs() < 1e-9);
        assert_eq!(half.jones.classify().kind, PolarizationKind::Linear);
    }

    #[test]
    fn test_combiner_recombines_lineage() {
        let cfg = TraceConfig::default();
        let c = component(ComponentKind::BeamCombiner, ComponentParams::default());
        let out = single(interact(&c, Direction::East, &JonesVector::linear(0.0, 1.0), "l/bs:e", &cfg));
        assert_eq!(out.coherence_id, "l");
    }

    #[test]
    fn test_terminal_and_unknown() {
        let cfg = TraceConfig::default();
        let v = JonesVector::linear(0.0, 1.0);
        let sensor = component(ComponentKind::Sensor, ComponentParams::default());
        assert_eq!(interact(&sensor, Direction::East, &v, "l", &cfg), Interaction::Absorb);
        let weird = component(ComponentKind::Unknown("lens".into()), ComponentParams::default());
        assert_eq!(interact(&weird, Direction::East, &v, "l", &cfg), Interaction::Block);
    }

    #[test]
    fn test_energy_never_increases() {
        let cfg = TraceConfig::default();
        let kinds = [
            ComponentKind::Polarizer,
            ComponentKind::Mirror,
            ComponentKind::Splitter,
            ComponentKind::Rotator,
            ComponentKind::HalfWavePlate,
            ComponentKind::QuarterWavePlate,
            ComponentKind::CircularFilter,
            ComponentKind::BeamCombiner,
            ComponentKind::OpticalIsolator,
            ComponentKind::MysteryBox,
        ];
        for kind in kinds {
            for angle in [0.0, 13.0, 45.0, 90.0, 151.0] {
                let c = component(
                    kind.clone(),
                    ComponentParams {
                        angle: Some(angle),
                        hidden_angle: Some(angle),
                        ..Default::default()
                    },
                );
                let v = JonesVector::linear(angle * 0.7 + 5.0, 50.0);
                if let Interaction::Pass(outs) = interact(&c, Direction::East, &v, "l", &cfg) {
                    let total: f64 = outs.iter().map(|o| o.jones.intensity()).sum();
                    assert!(total <= 50.0 + 1e-9, "{} at {}: {}", kind, angle, total);
                }
            }
        }
    }
}
