//! Поиск следующего компонента вдоль луча.

use crate::scene::{ComponentKind, Direction, OpticalComponent};

use super::config::{Bounds, TraceConfig};

/// Индекс ближайшего компонента впереди `origin` или `None`, если луч
/// уходит с сетки. Излучатели прозрачны. При равных расстояниях берётся
/// первый кандидат во входном порядке.
pub fn next_component(
    origin: (f64, f64),
    direction: Direction,
    components: &[OpticalComponent],
    config: &TraceConfig,
) -> Option<usize> {
    let (dx, dy) = direction.delta();
    let mut best: Option<(usize, f64)> = None;

    for (index, component) in components.iter().enumerate() {
        if component.kind == ComponentKind::Emitter {
            continue;
        }
        let rel_x = component.x - origin.0;
        let rel_y = component.y - origin.1;
        let along = rel_x * dx + rel_y * dy;
        if along <= 0.0 {
            continue;
        }
        let perpendicular = if direction.is_horizontal() {
            rel_y.abs()
        } else {
            rel_x.abs()
        };
        if perpendicular > config.alignment_tolerance {
            continue;
        }
        let distance = rel_x.abs() + rel_y.abs();
        if distance < config.min_distance {
            continue;
        }
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((index, distance)),
        }
    }

    best.map(|(index, _)| index)
}

/// Где кончается луч, ни во что не попавший: край границ на его оси,
/// но не позади начала.
pub fn boundary_point(origin: (f64, f64), direction: Direction, bounds: &Bounds) -> (f64, f64) {
    match direction {
        Direction::East => (bounds.max_x.max(origin.0), origin.1),
        Direction::West => (bounds.min_x.min(origin.0), origin.1),
        Direction::North => (origin.0, bounds.min_y.min(origin.1)),
        Direction::South => (origin.0, bounds.max_y.max(origin.1)),
    }
}

pub fn manhattan(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}
