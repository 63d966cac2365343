//! Flat care-goal model.

use crate::config::CodingConfig;
use crate::model::quantity::Quantity;
use crate::CoreResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a goal came from.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalOrigin {
    /// Fetched from the upstream EHR.
    Ehr,
    /// Created in this application and held by the local store.
    Local,
}

/// A care goal, possibly carrying blood-pressure targets.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GoalModel {
    /// External goal id; generated when the upstream record has none so the
    /// goal stays addressable for suggestion filtering.
    pub ext_goal_id: String,
    pub text: Option<String>,
    pub lifecycle_status: Option<String>,
    pub achievement_status: Option<String>,
    pub status_date: Option<DateTime<Utc>>,
    pub systolic_target: Option<Quantity>,
    pub diastolic_target: Option<Quantity>,
    pub origin: GoalOrigin,
}

impl GoalModel {
    /// Build from the wire resource. Blood-pressure targets are recognised by
    /// matching each target's measure against the configured component
    /// codings; unmatched targets are ignored.
    pub fn from_resource(goal: &cuff_fhir::Goal, config: &CodingConfig) -> CoreResult<Self> {
        let ext_goal_id = goal
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut systolic_target = None;
        let mut diastolic_target = None;
        for target in &goal.target {
            let Some(measure) = &target.measure else {
                continue;
            };
            let Some(detail) = &target.detail_quantity else {
                continue;
            };
            if measure.has_coding(&config.systolic) && systolic_target.is_none() {
                systolic_target = Quantity::from_wire(detail).ok();
            } else if measure.has_coding(&config.diastolic) && diastolic_target.is_none() {
                diastolic_target = Quantity::from_wire(detail).ok();
            }
        }

        Ok(Self {
            ext_goal_id,
            text: goal
                .description
                .as_ref()
                .and_then(|d| d.label())
                .map(str::to_string),
            lifecycle_status: goal.lifecycle_status.clone(),
            achievement_status: goal
                .achievement_status
                .as_ref()
                .and_then(|a| a.label())
                .map(str::to_string),
            status_date: goal
                .status_date
                .as_deref()
                .and_then(cuff_fhir::parse_instant),
            systolic_target,
            diastolic_target,
            origin: GoalOrigin::Ehr,
        })
    }

    /// Whether this goal carries both blood-pressure targets.
    pub fn is_bp_goal(&self) -> bool {
        self.systolic_target.is_some() && self.diastolic_target.is_some()
    }
}
