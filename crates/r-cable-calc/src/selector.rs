//! ---
//! rc_section: "08-conductor-sizing"
//! rc_subsection: "module"
//! rc_type: "source"
//! rc_scope: "code"
//! rc_description: "Conductor sizing calculations over reference tables."
//! rc_version: "v0.1.0"
//! rc_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    errors::{CalcEngineError, Result},
    model::Conductor,
    reference::ReferenceData,
};

pub const DEFAULT_MAX_CANDIDATES: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub suggested: Conductor,
    /// Smallest qualifying conductors in ascending order, `suggested` first.
    pub candidates: Vec<Conductor>,
}

/// Conductors rated for at least `required_a`, smallest first.
pub fn qualifying(reference: &ReferenceData, required_a: f64) -> impl Iterator<Item = &Conductor> {
    reference
        .conductors()
        .iter()
        .filter(move |conductor| conductor.ampacity_a >= required_a)
}

pub fn select_conductor(
    reference: &ReferenceData,
    required_a: f64,
    max_candidates: usize,
) -> Result<Selection> {
    let candidates: Vec<Conductor> = qualifying(reference, required_a)
        .take(max_candidates.max(1))
        .cloned()
        .collect();

    let suggested = candidates
        .first()
        .cloned()
        .ok_or(CalcEngineError::NoConductorForAmpacity { required_a })?;
    debug!(
        gauge = %suggested.gauge,
        ampacity = suggested.ampacity_a,
        required = required_a,
        "conductor selected by ampacity"
    );

    Ok(Selection {
        suggested,
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_smallest_qualifying_conductor() {
        let data = ReferenceData::seeded();
        let selection = select_conductor(&data, 32.08, DEFAULT_MAX_CANDIDATES).unwrap();
        assert_eq!(selection.suggested.gauge, "8 AWG");
        let gauges: Vec<_> = selection.candidates.iter().map(|c| c.gauge.as_str()).collect();
        assert_eq!(gauges, vec!["8 AWG", "6 AWG", "4 AWG"]);
    }

    #[test]
    fn exact_ampacity_qualifies() {
        let data = ReferenceData::seeded();
        let selection = select_conductor(&data, 30.0, 1).unwrap();
        assert_eq!(selection.suggested.gauge, "10 AWG");
        assert_eq!(selection.candidates.len(), 1);
    }

    #[test]
    fn no_smaller_qualifying_conductor_is_skipped() {
        let data = ReferenceData::seeded();
        for required in [0.5, 14.9, 15.0, 19.0, 49.9, 86.0, 150.0, 229.0] {
            let selection = select_conductor(&data, required, 3).unwrap();
            assert!(selection.suggested.ampacity_a >= required);
            assert!(data
                .conductors()
                .iter()
                .filter(|c| c.ampacity_a >= required)
                .all(|c| c.ampacity_a >= selection.suggested.ampacity_a));
        }
    }

    #[test]
    fn pathological_current_is_not_found() {
        let data = ReferenceData::seeded();
        let err = select_conductor(&data, 10_000.0, 3).unwrap_err();
        assert!(matches!(
            err,
            CalcEngineError::NoConductorForAmpacity { required_a } if required_a == 10_000.0
        ));
    }

    #[test]
    fn candidate_list_shrinks_at_the_top_of_the_table() {
        let data = ReferenceData::seeded();
        let selection = select_conductor(&data, 200.0, 3).unwrap();
        assert_eq!(selection.candidates.len(), 1);
        assert_eq!(selection.suggested.gauge, "4/0 AWG");
    }
}
