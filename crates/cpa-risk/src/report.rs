//! Result presentation: console table and JSON document

use crate::Result;
use collision_avoidance::{
    CpaResult, CpaStatus, EstimationMode, KinematicState, Ownship, TrackOutcome, TrackSeries,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Render the per-track summary table
pub fn render_table(outcomes: &BTreeMap<String, TrackOutcome>, mode: EstimationMode) -> String {
    let title = match mode {
        EstimationMode::Filtered => "Kalman, final state per id",
        EstimationMode::Raw => "raw reports, latest per id",
    };

    let mut out = String::new();
    out.push_str(&format!("=== CPA / TCPA Results ({}) ===\n", title));
    out.push_str(&format!(
        "{:<8}{:<12}{:<12}Status\n",
        "ID", "CPA [m]", "TCPA [s]"
    ));
    out.push_str(&"-".repeat(8 + 12 + 12 + 12));
    out.push('\n');

    for (id, outcome) in outcomes {
        let cpa = &outcome.cpa;
        out.push_str(&format!(
            "{:<8}{:<12.1}{:<12.1}{}\n",
            id,
            cpa.distance,
            cpa.tcpa,
            cpa.status()
        ));
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionBlock {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityBlock {
    pub vx: f64,
    pub vy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OwnshipBlock {
    pub position: PositionBlock,
    pub velocity: VelocityBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub course: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpaBlock {
    pub distance: f64,
    pub tcpa: f64,
    pub collision_risk: bool,
    pub closing: bool,
    pub valid: bool,
    pub status: CpaStatus,
}

impl From<&CpaResult> for CpaBlock {
    fn from(cpa: &CpaResult) -> Self {
        Self {
            distance: cpa.distance,
            tcpa: cpa.tcpa,
            collision_risk: cpa.collision_risk,
            closing: cpa.closing,
            valid: cpa.valid,
            status: cpa.status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetBlock {
    pub id: String,
    pub measurements: Vec<MeasurementRecord>,
    pub filtered_state: KinematicState,
    pub cpa: CpaBlock,
}

/// Full JSON payload: own ship plus every assessed target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDocument {
    pub generated_at: String,
    pub mode: EstimationMode,
    pub ownship: OwnshipBlock,
    pub targets: Vec<TargetBlock>,
}

impl RiskDocument {
    /// Assemble the document. Targets come out in identity order; tracks
    /// without an outcome are left out.
    pub fn build(
        series: &TrackSeries,
        outcomes: &BTreeMap<String, TrackOutcome>,
        ownship: &Ownship,
        mode: EstimationMode,
    ) -> Self {
        let targets = outcomes
            .iter()
            .map(|(id, outcome)| TargetBlock {
                id: id.clone(),
                measurements: series
                    .get(id)
                    .map(|seq| {
                        seq.iter()
                            .map(|m| MeasurementRecord {
                                time: m.time,
                                x: m.x,
                                y: m.y,
                                speed: m.speed,
                                course: m.course,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                filtered_state: outcome.state,
                cpa: CpaBlock::from(&outcome.cpa),
            })
            .collect();

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            mode,
            ownship: OwnshipBlock {
                position: PositionBlock {
                    x: ownship.position.x,
                    y: ownship.position.y,
                },
                velocity: VelocityBlock {
                    vx: ownship.velocity.x,
                    vy: ownship.velocity.y,
                },
            },
            targets,
        }
    }
}

/// Write the document as pretty-printed JSON
pub fn write_json(path: impl AsRef<Path>, document: &RiskDocument) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, document)?;
    info!("JSON saved to {:?}", path);
    Ok(())
}
