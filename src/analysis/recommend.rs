// SPDX-License-Identifier: MIT
use super::AnalysisResult;
use super::features::MovementStyle;

pub const INSUFFICIENT_DATA: &str = "Insufficient data for recommendations";

pub const MOVE_MORE: &str = "Try to move more frequently to avoid being an easy target";
const TACTICAL_PAUSES: &str = "Consider mixing in some tactical pauses to assess situations";
const IMPROVE_AIM: &str = "Focus on improving aim accuracy, try burst-firing for better control";
const TRIGGER_DISCIPLINE: &str = "Practice trigger discipline - take more measured shots";
const BALANCE: &str = "Consider a more balanced approach between aggression and defense";
const PUSH_ADVANTAGES: &str = "Look for more opportunities to push advantages when they arise";
const RESOURCES: &str =
    "Focus on efficient resource management - prioritize point-earning actions";

/// Maps an aggregate onto fixed advice strings. `None` yields the single
/// insufficient-data message.
#[must_use]
pub fn generate_recommendations(result: Option<&AnalysisResult>) -> Vec<&'static str> {
    let Some(result) = result else {
        return vec![INSUFFICIENT_DATA];
    };

    let mut out = Vec::new();

    match result.movement_style {
        MovementStyle::Stationary => out.push(MOVE_MORE),
        MovementStyle::Rushing => out.push(TACTICAL_PAUSES),
        _ => {}
    }

    let combat = &result.combat_effectiveness;
    if combat.accuracy < 0.3 {
        out.push(IMPROVE_AIM);
    }
    #[allow(clippy::cast_precision_loss)]
    let hit_ratio = (combat.total_shots > 0)
        .then(|| combat.total_hits as f64 / combat.total_shots as f64);
    if hit_ratio.is_some_and(|ratio| ratio < 0.25) {
        out.push(TRIGGER_DISCIPLINE);
    }

    let aggression = result.tactical_profile.aggression_level;
    if aggression > 0.8 {
        out.push(BALANCE);
    } else if aggression < 0.2 {
        out.push(PUSH_ADVANTAGES);
    }

    if result.resource_efficiency < 0.0 {
        out.push(RESOURCES);
    }

    log::info!("generated {} recommendations", out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::Positioning;
    use crate::analysis::{CombatSummary, TacticalSummary};

    fn result() -> AnalysisResult {
        AnalysisResult {
            movement_style: MovementStyle::Strafing,
            combat_effectiveness: CombatSummary {
                accuracy: 0.5,
                total_shots: 10,
                total_hits: 5,
            },
            resource_efficiency: 0.0,
            tactical_profile: TacticalSummary {
                aggression_level: 0.5,
                preferred_positioning: Positioning::Aggressive,
            },
            entries_analyzed: 10,
            files_loaded: 1,
            files_skipped: 0,
        }
    }

    #[test]
    fn none_is_insufficient_data() {
        assert_eq!(generate_recommendations(None), vec![INSUFFICIENT_DATA]);
    }

    #[test]
    fn balanced_play_gets_no_advice() {
        assert!(generate_recommendations(Some(&result())).is_empty());
    }

    #[test]
    fn every_rule_fires() {
        let mut r = result();
        r.movement_style = MovementStyle::Stationary;
        r.combat_effectiveness.accuracy = 0.1;
        r.combat_effectiveness.total_hits = 1;
        r.tactical_profile.aggression_level = 0.1;
        r.resource_efficiency = -0.5;

        assert_eq!(
            generate_recommendations(Some(&r)),
            vec![MOVE_MORE, IMPROVE_AIM, TRIGGER_DISCIPLINE, PUSH_ADVANTAGES, RESOURCES]
        );
    }

    #[test]
    fn rushing_and_high_aggression() {
        let mut r = result();
        r.movement_style = MovementStyle::Rushing;
        r.tactical_profile.aggression_level = 0.9;
        assert_eq!(generate_recommendations(Some(&r)), vec![TACTICAL_PAUSES, BALANCE]);
    }

    #[test]
    fn no_shots_skips_trigger_discipline() {
        let mut r = result();
        r.combat_effectiveness.total_shots = 0;
        r.combat_effectiveness.total_hits = 0;
        assert!(!generate_recommendations(Some(&r)).contains(&TRIGGER_DISCIPLINE));
    }
}
