//! Плоская проекция трассировки для рендереров со скалярными пучками.

use serde::{Deserialize, Serialize};

use super::TraceResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBeam {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    pub intensity: f64,
    pub polarization_angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySensorState {
    pub id: String,
    pub activated: bool,
    pub intensity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTraceResult {
    pub beams: Vec<LegacyBeam>,
    pub sensor_states: Vec<LegacySensorState>,
}

pub fn to_legacy(result: &TraceResult) -> LegacyTraceResult {
    LegacyTraceResult {
        beams: result
            .beams
            .iter()
            .map(|b| LegacyBeam {
                start_x: b.start.0,
                start_y: b.start.1,
                end_x: b.end.0,
                end_y: b.end.1,
                intensity: b.intensity,
                polarization_angle: b.angle,
            })
            .collect(),
        sensor_states: result
            .sensor_states
            .iter()
            .map(|s| LegacySensorState {
                id: s.id.clone(),
                activated: s.activated,
                intensity: s.intensity,
            })
            .collect(),
    }
}
