use serde::{Deserialize, Serialize};

use crate::properties::{PropertyKind, PropertySet};
use crate::validation::Violation;

pub(crate) const FIELDS: &[&str] = &["kill_chain_phases"];

/// A phase of a named kill chain (e.g. `lockheed-martin-cyber-kill-chain` /
/// `reconnaissance`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KillChainPhase {
    pub kill_chain_name: String,
    pub phase_name: String,
}

impl KillChainPhase {
    pub fn new(kill_chain_name: impl Into<String>, phase_name: impl Into<String>) -> Self {
        Self {
            kill_chain_name: kill_chain_name.into(),
            phase_name: phase_name.into(),
        }
    }
}

/// Kill chain phases an object is associated with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillChainPhasesProperty {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    kill_chain_phases: Vec<KillChainPhase>,
}

impl KillChainPhasesProperty {
    pub fn kill_chain_phases(&self) -> &[KillChainPhase] {
        &self.kill_chain_phases
    }

    pub fn add_kill_chain_phase(&mut self, phase: KillChainPhase) {
        self.kill_chain_phases.push(phase);
    }

    pub fn set_kill_chain_phases(&mut self, phases: Vec<KillChainPhase>) {
        self.kill_chain_phases = phases;
    }
}

/// Kill chain and phase names are lowercase with hyphens instead of spaces.
fn check_phase_name(member: &str, value: &str, out: &mut Vec<Violation>) {
    let field = "kill_chain_phases";
    if value.trim().is_empty() {
        out.push(Violation::malformed(field, format!("{member} must not be blank")));
    } else if value.chars().any(|c| c.is_uppercase() || c.is_whitespace()) {
        out.push(Violation::malformed(
            field,
            format!("{member} {value:?} must be lowercase with no spaces"),
        ));
    }
}

impl PropertySet for KillChainPhasesProperty {
    const KIND: PropertyKind = PropertyKind::KillChainPhases;

    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        for phase in &self.kill_chain_phases {
            check_phase_name("kill_chain_name", &phase.kill_chain_name, &mut violations);
            check_phase_name("phase_name", &phase.phase_name, &mut violations);
        }
        violations
    }
}
