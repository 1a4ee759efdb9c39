//! Graph projection of a flat model
//!
//! Nodes are compartments, edges are directed connections carrying the
//! per-species `(k_out, k_in)` pair seen from the source node. Both
//! directions of every connection appear as separate edges.

use std::fmt;

use indexmap::IndexMap;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::network::model::FlatModel;

/// Node weight: one compartment
#[derive(Debug, Clone, PartialEq)]
pub struct CompartmentNode {
    pub id: String,

    /// Volume in L
    pub volume: f64,

    /// Center in dm, if the compartment has geometry
    pub position: Option<[f64; 3]>,
}

impl fmt::Display for CompartmentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\nV = {:.3e} L", self.id, self.volume)
    }
}

/// Edge weight: per-species `(k_out, k_in)` in L/s
#[derive(Debug, Clone, PartialEq)]
pub struct TransportEdge {
    pub rates: IndexMap<String, (f64, f64)>,
}

impl fmt::Display for TransportEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .rates
            .iter()
            .map(|(s, (k_out, k_in))| format!("{s}: {k_out:.3e}/{k_in:.3e}"))
            .collect();
        write!(f, "{}", parts.join("\n"))
    }
}

impl FlatModel {
    /// Project the model onto a directed graph
    ///
    /// # Example
    ///
    /// ```rust
    /// use rxn_rs::network::{Compartment, IsotropicConnection, Model};
    ///
    /// let mut model = Model::default();
    /// model.add_compartment(Compartment::from_internal("a", 1.0).unwrap()).unwrap();
    /// model.add_compartment(Compartment::from_internal("b", 1.0).unwrap()).unwrap();
    /// model.connect("a", "b", IsotropicConnection::from_internal([("X", 0.1)]).unwrap().into()).unwrap();
    ///
    /// let graph = model.flatten().unwrap().to_graph();
    /// assert_eq!(graph.node_count(), 2);
    /// assert_eq!(graph.edge_count(), 2);
    /// ```
    pub fn to_graph(&self) -> DiGraph<CompartmentNode, TransportEdge> {
        let mut graph = DiGraph::with_capacity(self.len(), self.transport().values().map(IndexMap::len).sum());
        let mut nodes: IndexMap<&str, NodeIndex> = IndexMap::with_capacity(self.len());

        for (id, compartment) in self.compartments() {
            let node = graph.add_node(CompartmentNode {
                id: id.clone(),
                volume: compartment.volume(),
                position: compartment.position(),
            });
            nodes.insert(id.as_str(), node);
        }

        for (from, row) in self.transport() {
            for (to, conn) in row {
                if let (Some(&a), Some(&b)) = (nodes.get(from.as_str()), nodes.get(to.as_str())) {
                    graph.add_edge(a, b, TransportEdge { rates: conn.species_rates().clone() });
                }
            }
        }

        graph
    }

    /// Graphviz DOT rendering of [`to_graph`](Self::to_graph)
    pub fn to_dot(&self) -> String {
        let graph = self.to_graph();
        format!("{}", Dot::with_config(&graph, &[]))
    }
}
