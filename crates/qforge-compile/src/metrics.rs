//! Resource metrics of a compiled circuit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use qforge_ir::CircuitDag;

/// Gate counts and depth, as reported after a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitMetrics {
    /// Operation count per operator name, barriers included.
    pub gate_count_by_kind: BTreeMap<String, usize>,
    /// Longest chain of operations on any wire.
    pub depth: usize,
    /// Number of operations, barriers excluded.
    pub size: usize,
    /// Number of two-qubit operations, barriers excluded.
    pub two_qubit_gates: usize,
}

impl CircuitMetrics {
    /// Measure a DAG.
    pub fn from_dag(dag: &CircuitDag) -> Self {
        let mut size = 0;
        let mut two_qubit_gates = 0;
        for (_, inst) in dag.op_nodes() {
            if inst.is_barrier() {
                continue;
            }
            size += 1;
            if inst.qubits.len() == 2 {
                two_qubit_gates += 1;
            }
        }
        Self {
            gate_count_by_kind: dag.count_ops(),
            depth: dag.depth(),
            size,
            two_qubit_gates,
        }
    }

    /// Count of one operator.
    pub fn count(&self, name: &str) -> usize {
        self.gate_count_by_kind.get(name).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qforge_ir::{Circuit, ClbitId, QubitId};

    #[test]
    fn test_metrics_bell() {
        let mut circuit = Circuit::bell().unwrap();
        circuit.barrier([QubitId(0), QubitId(1)]).unwrap();
        let metrics = CircuitMetrics::from_dag(circuit.dag());

        assert_eq!(metrics.count("h"), 1);
        assert_eq!(metrics.count("cx"), 1);
        assert_eq!(metrics.count("barrier"), 1);
        assert_eq!(metrics.size, 4);
        assert_eq!(metrics.two_qubit_gates, 1);
    }

    #[test]
    fn test_metrics_serialize() {
        let mut circuit = Circuit::with_size("test", 1, 1);
        circuit.x(QubitId(0)).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        let metrics = CircuitMetrics::from_dag(circuit.dag());

        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["gate_count_by_kind"]["measure"], 1);
        assert_eq!(json["depth"], 2);
    }
}
