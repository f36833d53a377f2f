//! Device-family optimization.
//!
//! Each family pairs a native basis with a cost model and a rule subset, so
//! that when several decompositions reach the basis the one the hardware
//! executes best is chosen.

use serde::{Deserialize, Serialize};
use tracing::debug;

use qforge_ir::CircuitDag;

use crate::error::CompileResult;
use crate::library::{CostModel, EquivalenceRule};
use crate::pass::{Pass, PassKind};
use crate::passes::agnostic::MergeRotations;
use crate::property::{BasisGates, PropertySet};

use super::translation::translate;

/// Hardware families with a tuned decomposition strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFamily {
    /// IBM Eagle-class: `rz`, `sx`, `x`, `cx`.
    Ibm,
    /// IBM Heron: `rz`, `sx`, `x`, `cz`.
    IbmHeron,
    /// IQM: `prx`, `cz`.
    Iqm,
    /// Trapped ions: `rx`, `ry`, `rz`, `rxx`, all-to-all.
    TrappedIon,
    /// Neutral atoms: `rz`, `rx`, `ry`, `cz`.
    NeutralAtom,
}

impl DeviceFamily {
    /// The family's native basis.
    pub fn basis(self) -> BasisGates {
        match self {
            Self::Ibm => BasisGates::ibm(),
            Self::IbmHeron => BasisGates::heron(),
            Self::Iqm => BasisGates::iqm(),
            Self::TrappedIon => BasisGates::trapped_ion(),
            Self::NeutralAtom => BasisGates::neutral_atom(),
        }
    }

    /// Decomposition rules the family never uses.
    fn denied_rules(self) -> &'static [&'static str] {
        match self {
            // Hadamards go through rz·sx·rz, not a y rotation.
            Self::Ibm | Self::IbmHeron => &["cx_to_rxx", "h_to_ry_rx"],
            Self::Iqm | Self::NeutralAtom => &["cx_to_rxx"],
            // CZ reaches rxx through cx.
            Self::TrappedIon => &["cx_to_cz"],
        }
    }
}

/// Cost model of a device family.
#[derive(Debug, Clone, Copy)]
pub struct FamilyCost(pub DeviceFamily);

impl CostModel for FamilyCost {
    fn cost(&self, name: &str) -> u32 {
        match (self.0, name) {
            // Virtual Z: a frame change, no pulse.
            (DeviceFamily::Ibm | DeviceFamily::IbmHeron, "rz") => 0,
            (DeviceFamily::Ibm | DeviceFamily::IbmHeron, "sx" | "x") => 1,
            (DeviceFamily::Ibm | DeviceFamily::IbmHeron, "cx" | "cz") => 10,
            (DeviceFamily::Iqm, "prx") => 1,
            (DeviceFamily::Iqm, "cz") => 8,
            (DeviceFamily::TrappedIon, "rz") => 0,
            (DeviceFamily::TrappedIon, "rx" | "ry") => 1,
            (DeviceFamily::TrappedIon, "rxx") => 20,
            (DeviceFamily::NeutralAtom, "rz") => 1,
            (DeviceFamily::NeutralAtom, "rx" | "ry") => 2,
            (DeviceFamily::NeutralAtom, "cz") => 12,
            _ => 10,
        }
    }

    fn allows(&self, rule: &EquivalenceRule) -> bool {
        !self.0.denied_rules().contains(&rule.name)
    }
}

/// Device-family optimization pass.
///
/// Translates into the family's basis with its cost model, then merges the
/// native rotations translation leaves next to each other. When no basis is
/// configured the family's basis is installed in the property set, so later
/// passes (routing, verification) target it too.
pub struct DeviceOptimization {
    family: DeviceFamily,
}

impl DeviceOptimization {
    /// Create the pass for a family.
    pub fn new(family: DeviceFamily) -> Self {
        Self { family }
    }

    /// The family this pass targets.
    pub fn family(&self) -> DeviceFamily {
        self.family
    }
}

impl Pass for DeviceOptimization {
    fn name(&self) -> &'static str {
        "device_optimization"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<bool> {
        let basis = properties
            .basis_gates
            .get_or_insert_with(|| self.family.basis())
            .clone();
        let replaced = translate(dag, &properties.library, &basis, &FamilyCost(self.family))?;
        let merged = MergeRotations.run(dag, properties)?;
        debug!(family = ?self.family, replaced, merged, "Device optimization");
        Ok(replaced > 0 || merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unitary::Operator;
    use qforge_ir::{Circuit, QubitId, StandardGate};

    const FAMILIES: [DeviceFamily; 5] = [
        DeviceFamily::Ibm,
        DeviceFamily::IbmHeron,
        DeviceFamily::Iqm,
        DeviceFamily::TrappedIon,
        DeviceFamily::NeutralAtom,
    ];

    fn sample() -> Circuit {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cp(0.7, QubitId(1), QubitId(2)).unwrap();
        circuit.ry(0.2, QubitId(2)).unwrap();
        circuit.cy(QubitId(2), QubitId(0)).unwrap();
        circuit
    }

    #[test]
    fn test_every_family_closes_over_its_basis() {
        let circuit = sample();
        let reference = Operator::from_dag(circuit.dag()).unwrap();
        for family in FAMILIES {
            let mut dag = circuit.dag().clone();
            let mut props = PropertySet::new();
            assert!(DeviceOptimization::new(family).run(&mut dag, &mut props).unwrap());

            let basis = family.basis();
            assert_eq!(props.basis_gates.as_ref(), Some(&basis));
            for name in dag.count_ops().keys() {
                assert!(basis.contains(name), "{family:?} left '{name}'");
            }
            let op = Operator::from_dag(&dag).unwrap();
            assert!(reference.equiv_up_to_phase(&op, 1e-9), "{family:?}");
        }
    }

    #[test]
    fn test_every_family_translates_entanglers() {
        let gates = [
            StandardGate::CZ,
            StandardGate::CX,
            StandardGate::CY,
            StandardGate::Swap,
            StandardGate::CP(0.3),
            StandardGate::CRz(0.3),
            StandardGate::RXX(0.3),
            StandardGate::RZZ(0.3),
            StandardGate::CCX,
            StandardGate::CSwap,
        ];
        for family in FAMILIES {
            for gate in gates {
                let qubits = (0..gate.num_qubits()).map(QubitId);
                let mut circuit = Circuit::with_size("test", 3, 0);
                circuit.gate(gate, qubits).unwrap();
                let reference = Operator::from_dag(circuit.dag()).unwrap();

                let mut dag = circuit.into_dag();
                DeviceOptimization::new(family)
                    .run(&mut dag, &mut PropertySet::new())
                    .unwrap_or_else(|e| panic!("{family:?} {gate:?}: {e}"));

                let basis = family.basis();
                for name in dag.count_ops().keys() {
                    assert!(basis.contains(name), "{family:?} left '{name}' from {gate:?}");
                }
                let op = Operator::from_dag(&dag).unwrap();
                assert!(reference.equiv_up_to_phase(&op, 1e-9), "{family:?} {gate:?}");
            }
        }
    }

    #[test]
    fn test_trapped_ion_translates_cz() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cz(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();
        DeviceOptimization::new(DeviceFamily::TrappedIon)
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();
        assert_eq!(dag.count_ops().get("rxx"), Some(&1));
    }

    #[test]
    fn test_trapped_ion_uses_ms_gate() {
        let mut dag = Circuit::bell().unwrap().into_dag();
        let mut props = PropertySet::new();
        DeviceOptimization::new(DeviceFamily::TrappedIon)
            .run(&mut dag, &mut props)
            .unwrap();
        assert_eq!(dag.count_ops().get("rxx"), Some(&1));
    }

    #[test]
    fn test_ibm_prefers_virtual_z() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();
        DeviceOptimization::new(DeviceFamily::Ibm)
            .run(&mut dag, &mut props)
            .unwrap();
        let counts = dag.count_ops();
        assert_eq!(counts.get("sx"), Some(&1));
        assert!(counts.keys().all(|k| k == "sx" || k == "rz"));
    }

    #[test]
    fn test_family_cost_denies_rules() {
        let library = crate::library::EquivalenceLibrary::standard();
        let rule = library.rule("cx_to_rxx").unwrap();
        assert!(FamilyCost(DeviceFamily::TrappedIon).allows(rule));
        assert!(!FamilyCost(DeviceFamily::Iqm).allows(rule));
    }

    #[test]
    fn test_family_serde_names() {
        let family: DeviceFamily = serde_json::from_str("\"ibm_heron\"").unwrap();
        assert_eq!(family, DeviceFamily::IbmHeron);
    }
}
