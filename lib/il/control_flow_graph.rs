//! A `ControlFlowGraph` is a directed `Graph` of `Point` and `Edge`.

use crate::il::*;
use crate::{graph, Error};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A directed graph of types `Point` and `Edge`.
///
/// # Construction
/// Points are created with `new_point`, which hands out fresh indices, or with
/// `insert_point` when the caller owns the numbering. Edges are created with
/// one constructor per `EdgeKind`. A second edge between the same two points
/// is merged into the first, see `EdgeKind::merge`.
///
/// A graph is only analyzed after `validate` succeeds. Graphs loaded from json
/// are validated while they are loaded.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "SerializedControlFlowGraph", into = "SerializedControlFlowGraph")]
pub struct ControlFlowGraph {
    // The internal graph used to store our points.
    graph: graph::Graph<Point, Edge>,
    // The next index to use when creating a point.
    next_index: usize,
    // The point where execution begins.
    entry: Option<usize>,
}

impl Default for ControlFlowGraph {
    fn default() -> ControlFlowGraph {
        ControlFlowGraph::new()
    }
}

impl ControlFlowGraph {
    pub fn new() -> ControlFlowGraph {
        ControlFlowGraph {
            graph: graph::Graph::new(),
            next_index: 0,
            entry: None,
        }
    }

    /// Returns the underlying graph
    pub fn graph(&self) -> &graph::Graph<Point, Edge> {
        &self.graph
    }

    /// Sets the entry point for this `ControlFlowGraph` to the given `Point` index.
    pub fn set_entry(&mut self, entry: usize) -> Result<(), Error> {
        if self.graph.has_vertex(entry) {
            self.entry = Some(entry);
            return Ok(());
        }
        Err(Error::GraphVertexNotFound(entry))
    }

    /// Get the entry `Point` index for this `ControlFlowGraph`.
    pub fn entry(&self) -> Option<usize> {
        self.entry
    }

    /// Get the entry `Point` index, or an error if no entry was set.
    pub fn entry_index(&self) -> Result<usize, Error> {
        self.entry.ok_or(Error::ControlFlowGraphEntryNotFound)
    }

    /// Get a `Point` by index.
    pub fn point(&self, index: usize) -> Result<&Point, Error> {
        self.graph.vertex(index)
    }

    /// Get every `Point` in this `ControlFlowGraph`, ordered by index.
    pub fn points(&self) -> Vec<&Point> {
        self.graph.vertices()
    }

    /// Get an `Edge` by its head and tail `Point` indices.
    pub fn edge(&self, head: usize, tail: usize) -> Result<&Edge, Error> {
        self.graph.edge(head, tail)
    }

    /// Get every `Edge` in this `ControlFlowGraph`.
    pub fn edges(&self) -> Vec<&Edge> {
        self.graph.edges()
    }

    /// Get every incoming edge to a point
    pub fn edges_in(&self, index: usize) -> Result<Vec<&Edge>, Error> {
        self.graph.edges_in(index)
    }

    /// Get every outgoing edge from a point
    pub fn edges_out(&self, index: usize) -> Result<Vec<&Edge>, Error> {
        self.graph.edges_out(index)
    }

    /// Get the indices of every predecessor of a `Point` in this `ControlFlowGraph`.
    pub fn predecessor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        self.graph.predecessor_indices(index)
    }

    /// Get the indices of every successor of a `Point` in this `ControlFlowGraph`.
    pub fn successor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        self.graph.successor_indices(index)
    }

    /// Creates a new point holding `operation`, and returns its index.
    pub fn new_point(&mut self, operation: Operation) -> Result<usize, Error> {
        let index = self.next_index;
        self.insert_point(index, operation)?;
        Ok(index)
    }

    /// Creates a point with a caller chosen index.
    ///
    /// # Errors
    /// Error if a point with this index already exists.
    pub fn insert_point(&mut self, index: usize, operation: Operation) -> Result<(), Error> {
        self.graph.insert_vertex(Point::new(index, operation))?;
        self.next_index = self.next_index.max(index + 1);
        Ok(())
    }

    /// Sets the comment of a point.
    pub fn set_comment<S: Into<String>>(&mut self, index: usize, comment: S) -> Result<(), Error> {
        self.graph
            .vertex_mut(index)?
            .set_comment(Some(comment.into()));
        Ok(())
    }

    /// Creates an edge of the given kind between two points.
    ///
    /// If an edge between these two points already exists, the two kinds are
    /// merged. Kinds that cannot share an edge are an error.
    pub fn insert_edge(&mut self, head: usize, tail: usize, kind: EdgeKind) -> Result<(), Error> {
        if !self.graph.has_edge(head, tail) {
            return self.graph.insert_edge(Edge::new(head, tail, kind));
        }

        let edge = self.graph.edge_mut(head, tail)?;
        match edge.kind().merge(&kind) {
            Some(merged) => {
                edge.set_kind(merged);
                Ok(())
            }
            None => Err(Error::InvalidEdge(
                head,
                tail,
                format!("cannot merge {} with {}", edge.kind(), kind),
            )),
        }
    }

    /// Creates a fall-through edge between two points.
    pub fn sequential_edge(&mut self, head: usize, tail: usize) -> Result<(), Error> {
        self.insert_edge(head, tail, EdgeKind::Sequential)
    }

    /// Creates an unconditional jump between two points.
    pub fn unconditional_edge(&mut self, head: usize, tail: usize) -> Result<(), Error> {
        self.insert_edge(head, tail, EdgeKind::Unconditional)
    }

    /// Creates an unconditional jump back to a loop header.
    pub fn loop_back_edge(&mut self, head: usize, tail: usize) -> Result<(), Error> {
        self.insert_edge(head, tail, EdgeKind::LoopBack)
    }

    /// Creates the edge a branch takes when its condition evaluates to
    /// `taken`.
    pub fn branch_edge(&mut self, head: usize, tail: usize, taken: bool) -> Result<(), Error> {
        let kind = if taken {
            EdgeKind::BranchTrue
        } else {
            EdgeKind::BranchFalse
        };
        self.insert_edge(head, tail, kind)
    }

    /// Creates the edge a switch takes when its scrutinee equals `value`.
    pub fn switch_case_edge(&mut self, head: usize, tail: usize, value: i64) -> Result<(), Error> {
        let mut values = BTreeSet::new();
        values.insert(value);
        self.insert_edge(head, tail, EdgeKind::SwitchCase(values))
    }

    /// Creates the edge a switch takes when no case matches.
    pub fn switch_default_edge(&mut self, head: usize, tail: usize) -> Result<(), Error> {
        self.insert_edge(head, tail, EdgeKind::SwitchDefault)
    }

    /// Checks that this graph can be analyzed.
    ///
    /// The entry must be set, every operation must be well sorted, and every
    /// outgoing edge must fit the operation at its head.
    pub fn validate(&self) -> Result<(), Error> {
        let entry = self.entry_index()?;
        if !self.graph.has_vertex(entry) {
            return Err(Error::GraphVertexNotFound(entry));
        }

        for point in self.points() {
            point.operation().check_sorts(point.index())?;
            self.validate_edges_out(point)?;
        }

        let unreachable = self.graph.unreachable_vertices(entry)?;
        if !unreachable.is_empty() {
            let mut unreachable = unreachable.into_iter().collect::<Vec<usize>>();
            unreachable.sort_unstable();
            debug!("points unreachable from entry {}: {:?}", entry, unreachable);
        }

        Ok(())
    }

    fn validate_edges_out(&self, point: &Point) -> Result<(), Error> {
        let edges = self.edges_out(point.index())?;

        match point.operation() {
            Operation::Return { .. } => {
                if let Some(edge) = edges.first() {
                    return Err(invalid_edge(edge, "a return has no successors"));
                }
            }
            Operation::Branch { .. } => {
                for edge in &edges {
                    match edge.kind() {
                        EdgeKind::BranchTrue | EdgeKind::BranchFalse | EdgeKind::Unconditional => {}
                        _ => return Err(invalid_edge(edge, "a branch leaves through branch edges")),
                    }
                }
            }
            Operation::Switch { .. } => {
                let mut defaults = 0;
                for edge in &edges {
                    match edge.kind() {
                        EdgeKind::SwitchCase(_) => {}
                        EdgeKind::SwitchDefault => defaults += 1,
                        _ => return Err(invalid_edge(edge, "a switch leaves through case edges")),
                    }
                    if defaults > 1 {
                        return Err(invalid_edge(edge, "a switch has one default edge"));
                    }
                }
            }
            _ => {
                for edge in &edges {
                    if !edge.kind().is_fall_through() {
                        return Err(invalid_edge(edge, "straight-line operations do not branch"));
                    }
                }
                if edges.len() > 1 {
                    return Err(invalid_edge(edges[1], "straight-line operations have one successor"));
                }
            }
        }

        Ok(())
    }

    /// Get the indices of every loop header in this graph.
    ///
    /// Loop headers are the tails of `LoopBack` edges, and the tails of every
    /// edge which closes a cycle in a depth-first walk from the entry. Every
    /// cycle reachable from the entry therefore passes through a loop header.
    pub fn loop_headers(&self) -> Result<BTreeSet<usize>, Error> {
        let entry = self.entry_index()?;
        let depth_first = self.graph.compute_depth_first(entry)?;

        let mut headers: BTreeSet<usize> = depth_first
            .retreating_edges()
            .iter()
            .map(|&(_, tail)| tail)
            .collect();

        for edge in self.edges() {
            if *edge.kind() == EdgeKind::LoopBack {
                headers.insert(edge.tail());
            }
        }

        Ok(headers)
    }

    /// Get the indices of every point reachable from the entry, in reverse
    /// post order.
    pub fn reverse_post_order(&self) -> Result<Vec<usize>, Error> {
        self.graph.compute_reverse_post_order(self.entry_index()?)
    }

    /// Load a `ControlFlowGraph` from json, validating it.
    pub fn from_json(json: &str) -> Result<ControlFlowGraph, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this `ControlFlowGraph` to json.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

fn invalid_edge(edge: &Edge, reason: &str) -> Error {
    Error::InvalidEdge(edge.head(), edge.tail(), reason.to_string())
}

/// The serialized form of a `ControlFlowGraph`.
///
/// Deserialization replays every point and edge through the construction
/// methods, so malformed input is rejected the same way malformed
/// construction is.
#[derive(Clone, Debug, Deserialize, Serialize)]
struct SerializedControlFlowGraph {
    entry: Option<usize>,
    points: Vec<Point>,
    edges: Vec<Edge>,
}

impl TryFrom<SerializedControlFlowGraph> for ControlFlowGraph {
    type Error = Error;

    fn try_from(serialized: SerializedControlFlowGraph) -> Result<ControlFlowGraph, Error> {
        let mut control_flow_graph = ControlFlowGraph::new();

        for point in serialized.points {
            let index = point.index();
            let comment = point.comment().map(|comment| comment.to_string());
            control_flow_graph.insert_point(index, point.operation().clone())?;
            if let Some(comment) = comment {
                control_flow_graph.set_comment(index, comment)?;
            }
        }

        for edge in serialized.edges {
            control_flow_graph.insert_edge(edge.head(), edge.tail(), edge.kind().clone())?;
        }

        let entry = serialized
            .entry
            .ok_or(Error::ControlFlowGraphEntryNotFound)?;
        control_flow_graph.set_entry(entry)?;
        control_flow_graph.validate()?;

        Ok(control_flow_graph)
    }
}

impl From<ControlFlowGraph> for SerializedControlFlowGraph {
    fn from(control_flow_graph: ControlFlowGraph) -> SerializedControlFlowGraph {
        SerializedControlFlowGraph {
            entry: control_flow_graph.entry,
            points: control_flow_graph.points().into_iter().cloned().collect(),
            edges: control_flow_graph.edges().into_iter().cloned().collect(),
        }
    }
}

impl fmt::Display for ControlFlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for point in self.points() {
            writeln!(f, "{}", point)?;
        }
        for edge in self.edges() {
            writeln!(f, "edge {}", edge)?;
        }
        Ok(())
    }
}
