use crate::il::*;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named procedure: its parameter slots and its `ControlFlowGraph`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Procedure {
    // The name of the procedure
    name: String,
    // Slots holding the arguments on entry
    parameters: Vec<Slot>,
    // The `ControlFlowGraph` capturing semantics of the procedure
    control_flow_graph: ControlFlowGraph,
}

impl Procedure {
    pub fn new<S: Into<String>>(
        name: S,
        parameters: Vec<Slot>,
        control_flow_graph: ControlFlowGraph,
    ) -> Procedure {
        Procedure {
            name: name.into(),
            parameters,
            control_flow_graph,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Slot] {
        &self.parameters
    }

    pub fn point(&self, index: usize) -> Result<&Point, Error> {
        self.control_flow_graph.point(index)
    }

    pub fn control_flow_graph(&self) -> &ControlFlowGraph {
        &self.control_flow_graph
    }

    /// Check the widths of the parameters, and validate the control flow
    /// graph.
    pub fn validate(&self) -> Result<(), Error> {
        for parameter in &self.parameters {
            if !valid_bits(parameter.bits()) {
                return Err(Error::InvalidBits(parameter.bits()));
            }
        }
        self.control_flow_graph.validate()
    }

    /// Load a `Procedure` from json.
    pub fn from_json(json: &str) -> Result<Procedure, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this `Procedure` to json.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parameters = self
            .parameters
            .iter()
            .map(|parameter| parameter.to_string())
            .collect::<Vec<String>>();
        writeln!(f, "procedure {}({})", self.name, parameters.join(", "))?;
        write!(f, "{}", self.control_flow_graph)
    }
}
