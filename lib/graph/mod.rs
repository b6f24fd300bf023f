//! Implements a directed graph.
//!
//! Vertices and edges live in ordered maps keyed by index, so a graph holds no
//! pointers and can be cloned, compared and sent between threads freely.

use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, BTreeSet};

use crate::Error;

pub trait Vertex: Clone + Sync {
    // The index of this vertex.
    fn index(&self) -> usize;
}

pub trait Edge: Clone + Sync {
    /// The index of the head vertex.
    fn head(&self) -> usize;
    /// The index of the tail vertex.
    fn tail(&self) -> usize;
}

/// The result of one depth-first walk over a graph.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DepthFirst {
    post_order: Vec<usize>,
    retreating_edges: BTreeSet<(usize, usize)>,
}

impl DepthFirst {
    /// Vertices reachable from the root, in post order.
    pub fn post_order(&self) -> &[usize] {
        &self.post_order
    }

    /// Vertices reachable from the root, in reverse post order.
    pub fn reverse_post_order(&self) -> Vec<usize> {
        self.post_order.iter().rev().cloned().collect()
    }

    /// Edges whose tail was still on the depth-first stack when the edge was
    /// followed. Every cycle reachable from the root contains at least one.
    pub fn retreating_edges(&self) -> &BTreeSet<(usize, usize)> {
        &self.retreating_edges
    }
}

/// A directed graph.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Default)]
pub struct Graph<V: Vertex, E: Edge> {
    vertices: BTreeMap<usize, V>,
    edges: BTreeMap<(usize, usize), E>,
    successors: BTreeMap<usize, BTreeSet<usize>>,
    predecessors: BTreeMap<usize, BTreeSet<usize>>,
}

impl<V, E> Graph<V, E>
where
    V: Vertex,
    E: Edge,
{
    pub fn new() -> Graph<V, E> {
        Graph {
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            successors: BTreeMap::new(),
            predecessors: BTreeMap::new(),
        }
    }

    /// Returns true if the vertex with the given index exists in this graph
    pub fn has_vertex(&self, index: usize) -> bool {
        self.vertices.contains_key(&index)
    }

    /// Returns true if the edge with the given head and tail index exists in this graph
    pub fn has_edge(&self, head: usize, tail: usize) -> bool {
        self.edges.contains_key(&(head, tail))
    }

    /// Inserts a vertex into the graph.
    /// # Errors
    /// Error if the vertex already exists by index.
    pub fn insert_vertex(&mut self, v: V) -> Result<(), Error> {
        if self.vertices.contains_key(&v.index()) {
            return Err(Error::GraphDuplicateVertex(v.index()));
        }
        self.successors.insert(v.index(), BTreeSet::new());
        self.predecessors.insert(v.index(), BTreeSet::new());
        self.vertices.insert(v.index(), v);
        Ok(())
    }

    /// Inserts an edge into the graph.
    /// # Errors
    /// Error if the edge already exists by indices, or if either end of the
    /// edge is not a vertex of this graph.
    pub fn insert_edge(&mut self, edge: E) -> Result<(), Error> {
        let (head, tail) = (edge.head(), edge.tail());
        if self.edges.contains_key(&(head, tail)) {
            return Err(Error::GraphDuplicateEdge(head, tail));
        }
        if !self.vertices.contains_key(&head) {
            return Err(Error::GraphVertexNotFound(head));
        }
        if !self.vertices.contains_key(&tail) {
            return Err(Error::GraphVertexNotFound(tail));
        }

        self.edges.insert((head, tail), edge);
        self.successors.entry(head).or_default().insert(tail);
        self.predecessors.entry(tail).or_default().insert(head);

        Ok(())
    }

    /// Returns the indices of all immediate successors of a vertex from the graph.
    pub fn successor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        self.successors
            .get(&index)
            .map(|successors| successors.iter().cloned().collect())
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Returns the indices of all immediate predecessors of a vertex from the graph.
    pub fn predecessor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        self.predecessors
            .get(&index)
            .map(|predecessors| predecessors.iter().cloned().collect())
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Computes the set of vertices unreachable from the given index.
    pub fn unreachable_vertices(&self, index: usize) -> Result<FxHashSet<usize>, Error> {
        let reachable_vertices = self.reachable_vertices(index)?;
        Ok(self
            .vertices
            .keys()
            .filter(|index| !reachable_vertices.contains(index))
            .cloned()
            .collect())
    }

    /// Computes the set of vertices reachable from the given index.
    pub fn reachable_vertices(&self, index: usize) -> Result<FxHashSet<usize>, Error> {
        if !self.has_vertex(index) {
            return Err(Error::GraphVertexNotFound(index));
        }

        let mut reachable_vertices: FxHashSet<usize> = FxHashSet::default();
        let mut queue: Vec<usize> = vec![index];

        reachable_vertices.insert(index);

        while let Some(vertex) = queue.pop() {
            if let Some(successors) = self.successors.get(&vertex) {
                for &successor in successors {
                    if reachable_vertices.insert(successor) {
                        queue.push(successor)
                    }
                }
            }
        }

        Ok(reachable_vertices)
    }

    /// Walks the graph depth-first from `root`, visiting successors in index
    /// order.
    ///
    /// The walk keeps its own stack, so arbitrarily long chains of vertices
    /// do not exhaust the call stack.
    pub fn compute_depth_first(&self, root: usize) -> Result<DepthFirst, Error> {
        if !self.has_vertex(root) {
            return Err(Error::GraphVertexNotFound(root));
        }

        let mut visited: FxHashSet<usize> = FxHashSet::default();
        let mut on_stack: FxHashSet<usize> = FxHashSet::default();
        let mut depth_first = DepthFirst::default();

        // (vertex, successors of the vertex not yet followed)
        let mut stack: Vec<(usize, Vec<usize>)> = Vec::new();

        visited.insert(root);
        on_stack.insert(root);
        stack.push((root, self.successor_indices(root)?.into_iter().rev().collect()));

        while let Some((node, pending)) = stack.last_mut() {
            let node = *node;
            match pending.pop() {
                Some(successor) => {
                    if on_stack.contains(&successor) {
                        depth_first.retreating_edges.insert((node, successor));
                    } else if visited.insert(successor) {
                        on_stack.insert(successor);
                        let successors = self.successor_indices(successor)?;
                        stack.push((successor, successors.into_iter().rev().collect()));
                    }
                }
                None => {
                    on_stack.remove(&node);
                    depth_first.post_order.push(node);
                    stack.pop();
                }
            }
        }

        Ok(depth_first)
    }

    /// Compute the post order of all vertices reachable from `root`
    pub fn compute_post_order(&self, root: usize) -> Result<Vec<usize>, Error> {
        Ok(self.compute_depth_first(root)?.post_order)
    }

    /// Compute the reverse post order of all vertices reachable from `root`
    pub fn compute_reverse_post_order(&self, root: usize) -> Result<Vec<usize>, Error> {
        Ok(self.compute_depth_first(root)?.reverse_post_order())
    }

    /// Returns all vertices in the graph.
    pub fn vertices(&self) -> Vec<&V> {
        self.vertices.values().collect()
    }

    /// Fetches an index from the graph by index.
    pub fn vertex(&self, index: usize) -> Result<&V, Error> {
        self.vertices
            .get(&index)
            .ok_or(Error::GraphVertexNotFound(index))
    }

    // Fetches a mutable instance of a vertex.
    pub fn vertex_mut(&mut self, index: usize) -> Result<&mut V, Error> {
        self.vertices
            .get_mut(&index)
            .ok_or(Error::GraphVertexNotFound(index))
    }

    pub fn edge(&self, head: usize, tail: usize) -> Result<&E, Error> {
        self.edges
            .get(&(head, tail))
            .ok_or(Error::GraphEdgeNotFound(head, tail))
    }

    pub fn edge_mut(&mut self, head: usize, tail: usize) -> Result<&mut E, Error> {
        self.edges
            .get_mut(&(head, tail))
            .ok_or(Error::GraphEdgeNotFound(head, tail))
    }

    /// Get a reference to every `Edge` in the `Graph`.
    pub fn edges(&self) -> Vec<&E> {
        self.edges.values().collect()
    }

    /// Return all edges out for a vertex
    pub fn edges_out(&self, index: usize) -> Result<Vec<&E>, Error> {
        self.successors
            .get(&index)
            .map(|succs| {
                succs
                    .iter()
                    .filter_map(|succ| self.edges.get(&(index, *succ)))
                    .collect()
            })
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Return all edges in for a vertex
    pub fn edges_in(&self, index: usize) -> Result<Vec<&E>, Error> {
        self.predecessors
            .get(&index)
            .map(|preds| {
                preds
                    .iter()
                    .filter_map(|pred| self.edges.get(&(*pred, index)))
                    .collect()
            })
            .ok_or(Error::GraphVertexNotFound(index))
    }
}
