//! Transform step nodes and the transformed-artifact-set aggregate.

use std::sync::Arc;

use strata_common::{ContentHash, Ident};

use crate::variant::{ComponentVariantId, VariantId};

/// Opaque graph-wide id of a transform step node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StepNodeId(u64);

impl StepNodeId {
    /// Creates an id from its raw value.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

/// One step of an artifact transformation chain.
///
/// A step node is a unit of scheduled work: applying one transform action
/// to the output of the previous step. Step nodes are ordered relative to
/// their siblings within an artifact set, and one node may be shared by
/// several artifact sets that converge on the same intermediate result.
/// Shared nodes are always held behind [`Arc`] so the codec can preserve
/// their identity across references.
#[derive(PartialEq, Eq, Hash, Debug)]
pub struct TransformStepNode {
    /// Graph-wide id of this node.
    pub id: StepNodeId,
    /// The transform action this step applies (e.g. `minify`, `unzip`).
    pub action: Ident,
    /// Hash of the transform's parameters, for up-to-date checks.
    pub parameters_hash: ContentHash,
}

impl TransformStepNode {
    /// Creates a step node.
    pub fn new(id: StepNodeId, action: Ident, parameters_hash: ContentHash) -> Self {
        Self {
            id,
            action,
            parameters_hash,
        }
    }
}

/// The artifacts of one source variant, transformed for a target variant.
///
/// Aggregates the source variant, the target variant (with its requested
/// attributes), and the ordered chain of transform steps that carries
/// artifacts from one to the other. Step order is significant: it is the
/// execution order of the chain and must survive a round trip through the
/// cache exactly. An empty chain is valid and means the artifacts are
/// consumed as-is.
///
/// Constructed during dependency resolution, persisted when the execution
/// graph is cached, reconstructed on a cache hit.
#[derive(PartialEq, Eq, Debug)]
pub struct TransformedArtifactSet {
    /// The variant supplying the source artifacts.
    pub source_variant: VariantId,
    /// The variant the artifacts are transformed into.
    pub target_variant: ComponentVariantId,
    /// The ordered transform chain. May be shared with other sets.
    pub steps: Vec<Arc<TransformStepNode>>,
}

impl TransformedArtifactSet {
    /// Creates an artifact set.
    pub fn new(
        source_variant: VariantId,
        target_variant: ComponentVariantId,
        steps: Vec<Arc<TransformStepNode>>,
    ) -> Self {
        Self {
            source_variant,
            target_variant,
            steps,
        }
    }
}

/// A top-level node of a persisted execution graph.
///
/// The cache file is a sequence of these; the codec dispatches on a type
/// tag to the node kind's codec. Both kinds are reference-counted because
/// either may be referenced again later in the same graph stream.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GraphNode {
    /// A scheduled transform step.
    Step(Arc<TransformStepNode>),
    /// A transformed-artifact-set work node.
    ArtifactSet(Arc<TransformedArtifactSet>),
}

impl GraphNode {
    /// A short human-readable kind name, for stats output.
    pub fn kind(&self) -> &'static str {
        match self {
            GraphNode::Step(_) => "step",
            GraphNode::ArtifactSet(_) => "artifact-set",
        }
    }
}
