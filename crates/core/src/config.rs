//! Session coding configuration.
//!
//! This module defines the recognised code sets that drive observation
//! classification. The configuration is resolved once at session start and is
//! immutable thereafter; library code never reads environment variables or
//! files during request handling. A YAML representation exists so deployments
//! can override the compiled-in defaults per EHR vendor.

use crate::{CoreError, CoreResult};
use cuff_fhir::Coding;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// LOINC system URI shared by the default vital-sign codings.
pub const LOINC_SYSTEM: &str = "http://loinc.org";

/// Default systolic component code.
pub const LOINC_SYSTOLIC: &str = "8480-6";

/// Default diastolic component code.
pub const LOINC_DIASTOLIC: &str = "8462-4";

/// Default blood-pressure panel codes (classic panel and vital-signs panel).
pub const LOINC_BP_PANELS: [&str; 2] = ["55284-4", "85354-9"];

/// System URI for locally defined home-monitoring codes.
pub const HOME_MONITORING_SYSTEM: &str = "https://cuff.dev/fhir/CodeSystem/home-monitoring";

/// Locally defined code for the protocol-adherence question.
pub const HOME_MONITORING_PROTOCOL: &str = "bp-protocol-adherence";

/// The recognised code sets, resolved once at session start.
///
/// Constructed either from the compiled-in defaults ([`CodingConfig::default`])
/// or from a YAML document; both paths run [`CodingConfig::validate`], and an
/// invalid configuration is fatal to session initialisation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CodingConfig {
    /// Codings identifying a systolic component observation.
    pub systolic: Vec<Coding>,
    /// Codings identifying a diastolic component observation.
    pub diastolic: Vec<Coding>,
    /// Codings identifying a self-contained blood-pressure panel.
    pub bp_panel: Vec<Coding>,
    /// Codings identifying the protocol-adherence question.
    pub protocol: Vec<Coding>,
    /// Answer value meaning "the home protocol was followed".
    pub protocol_answer_yes: String,
    /// Answer value meaning "the home protocol was not followed".
    pub protocol_answer_no: String,
    /// Concept set identifying antihypertensive medications.
    #[serde(default)]
    pub antihypertensive: Vec<Coding>,
}

impl Default for CodingConfig {
    fn default() -> Self {
        Self {
            systolic: vec![Coding::new(LOINC_SYSTEM, LOINC_SYSTOLIC)],
            diastolic: vec![Coding::new(LOINC_SYSTEM, LOINC_DIASTOLIC)],
            bp_panel: LOINC_BP_PANELS
                .iter()
                .map(|code| Coding::new(LOINC_SYSTEM, *code))
                .collect(),
            protocol: vec![Coding::new(HOME_MONITORING_SYSTEM, HOME_MONITORING_PROTOCOL)],
            protocol_answer_yes: "Yes".to_string(),
            protocol_answer_no: "No".to_string(),
            antihypertensive: Vec::new(),
        }
    }
}

impl CodingConfig {
    /// Parse a configuration from YAML text and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigParse`] when the YAML does not fit the
    /// schema (unknown keys are rejected) and [`CoreError::Configuration`]
    /// when a required code set is empty or degenerate.
    pub fn from_yaml(yaml_text: &str) -> CoreResult<Self> {
        let config: CodingConfig = serde_yaml::from_str(yaml_text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn from_yaml_file(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Check the structural invariants the classifier depends on.
    pub fn validate(&self) -> CoreResult<()> {
        for (name, set) in [
            ("systolic", &self.systolic),
            ("diastolic", &self.diastolic),
            ("bp_panel", &self.bp_panel),
            ("protocol", &self.protocol),
        ] {
            if set.is_empty() {
                return Err(CoreError::Configuration(format!(
                    "code set '{name}' must not be empty"
                )));
            }
            if set.iter().any(|coding| coding.code.is_none()) {
                return Err(CoreError::Configuration(format!(
                    "code set '{name}' contains a coding without a code"
                )));
            }
        }
        if self.protocol_answer_yes.trim().is_empty() || self.protocol_answer_no.trim().is_empty() {
            return Err(CoreError::Configuration(
                "protocol answer values must not be empty".to_string(),
            ));
        }
        if self.protocol_answer_yes == self.protocol_answer_no {
            return Err(CoreError::Configuration(
                "protocol answer values must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Every coding that marks an observation as blood-pressure-related,
    /// panel and components alike. Used for in-encounter extraction.
    pub fn all_bp_codings(&self) -> Vec<Coding> {
        let mut all =
            Vec::with_capacity(self.bp_panel.len() + self.systolic.len() + self.diastolic.len());
        all.extend_from_slice(&self.bp_panel);
        all.extend_from_slice(&self.systolic);
        all.extend_from_slice(&self.diastolic);
        all
    }
}
