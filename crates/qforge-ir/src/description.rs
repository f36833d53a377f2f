//! External circuit representation.
//!
//! A [`CircuitDescription`] is the flat, serializable form circuits enter
//! and leave the compiler in: an ordered list of named operations over
//! positional qubit and clbit indices.

use serde::{Deserialize, Serialize};

use crate::dag::CircuitDag;
use crate::error::IrResult;
use crate::gate::{ClassicalCondition, CustomGate, Gate, StandardGate};
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{ClbitId, QubitId};

/// One operation in a [`CircuitDescription`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Operator name (`"cx"`, `"rz"`, `"measure"`, or any custom name).
    pub name: String,
    /// Ordered qubit operands.
    pub qubits: Vec<QubitId>,
    /// Rotation angles in radians.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<f64>,
    /// Classical bits written (measure only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clbits: Vec<ClbitId>,
    /// Optional classical condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

impl OperationSpec {
    /// A gate operation without condition.
    pub fn gate(
        name: impl Into<String>,
        qubits: impl IntoIterator<Item = u32>,
        params: impl IntoIterator<Item = f64>,
    ) -> Self {
        Self {
            name: name.into(),
            qubits: qubits.into_iter().map(QubitId).collect(),
            params: params.into_iter().collect(),
            clbits: vec![],
            condition: None,
        }
    }

    fn to_instruction(&self) -> IrResult<Instruction> {
        let kind = match self.name.as_str() {
            "measure" => InstructionKind::Measure,
            "reset" => InstructionKind::Reset,
            "barrier" => InstructionKind::Barrier,
            name => {
                #[allow(clippy::cast_possible_truncation)]
                let gate = match StandardGate::from_name(name, &self.params)? {
                    Some(standard) => Gate::standard(standard),
                    None => Gate::custom(
                        CustomGate::new(name, self.qubits.len() as u32)
                            .with_params(self.params.clone()),
                    ),
                };
                let gate = match &self.condition {
                    Some(cond) => gate.with_condition(cond.clone()),
                    None => gate,
                };
                InstructionKind::Gate(gate)
            }
        };
        Ok(Instruction {
            kind,
            qubits: self.qubits.clone(),
            clbits: self.clbits.clone(),
        })
    }

    fn from_instruction(inst: &Instruction) -> Self {
        Self {
            name: inst.name().to_string(),
            qubits: inst.qubits.clone(),
            params: inst.params(),
            clbits: inst.clbits.clone(),
            condition: inst.as_gate().and_then(|g| g.condition.clone()),
        }
    }
}

/// Flat, serializable circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitDescription {
    /// Size of the qubit register.
    pub num_qubits: u32,
    /// Size of the classical register.
    #[serde(default)]
    pub num_clbits: u32,
    /// Operations in program order.
    pub operations: Vec<OperationSpec>,
}

impl CircuitDescription {
    /// An empty description over the given registers.
    pub fn new(num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            num_qubits,
            num_clbits,
            operations: vec![],
        }
    }

    /// Append an operation.
    #[must_use]
    pub fn with_op(mut self, op: OperationSpec) -> Self {
        self.operations.push(op);
        self
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl CircuitDag {
    /// Build a DAG from an external description.
    ///
    /// Unknown operator names become custom gates whose arity is taken from
    /// their qubit tuple. A standard name with the wrong parameter count is
    /// rejected.
    pub fn from_description(desc: &CircuitDescription) -> IrResult<Self> {
        let mut dag = CircuitDag::with_size(desc.num_qubits, desc.num_clbits);
        for op in &desc.operations {
            dag.apply(op.to_instruction()?)?;
        }
        Ok(dag)
    }

    /// Flatten the DAG into its external description, in topological order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_description(&self) -> CircuitDescription {
        let num_qubits = self.qubits().map(|q| q.0 + 1).max().unwrap_or(0);
        let num_clbits = self.clbits().map(|c| c.0 + 1).max().unwrap_or(0);
        CircuitDescription {
            num_qubits: num_qubits.max(self.num_qubits() as u32),
            num_clbits: num_clbits.max(self.num_clbits() as u32),
            operations: self
                .topological_ops()
                .map(|(_, inst)| OperationSpec::from_instruction(inst))
                .collect(),
        }
    }
}
