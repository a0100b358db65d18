use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::engine::{compute_fee_profile, FeeInputs, FeeProfile};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeProfileQuery {
    pub accounting_level: Option<i64>,
    pub broker_relations_level: Option<i64>,
    pub corp_standing: Option<f64>,
    pub faction_standing: Option<f64>,
}

impl FeeProfileQuery {
    /// Fill unset fields from `defaults`.
    pub fn resolve(&self, defaults: &FeeInputs) -> FeeInputs {
        FeeInputs {
            accounting_level: self.accounting_level.unwrap_or(defaults.accounting_level),
            broker_relations_level: self
                .broker_relations_level
                .unwrap_or(defaults.broker_relations_level),
            corp_standing: self.corp_standing.unwrap_or(defaults.corp_standing),
            faction_standing: self.faction_standing.unwrap_or(defaults.faction_standing),
        }
    }
}

pub async fn get_fee_profile(
    Query(params): Query<FeeProfileQuery>,
    State(state): State<AppState>,
) -> Json<FeeProfile> {
    let inputs = params.resolve(&state.config.default_fees);
    Json(compute_fee_profile(&inputs))
}
