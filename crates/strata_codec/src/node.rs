//! Type-tag dispatch for top-level graph nodes.
//!
//! The persisted execution graph is a sentinel-terminated sequence of
//! tagged nodes. Each tag selects the node kind's codec; all nodes in one
//! sequence share one identity-registry session, so a reference that
//! recurs anywhere in the stream deduplicates.

use std::io::{Read, Write};

use strata_model::GraphNode;

use crate::artifact_set;
use crate::error::{CodecError, CodecResult};
use crate::read::ReadContext;
use crate::step;
use crate::write::WriteContext;

/// Wire tag selecting a node codec.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum NodeTag {
    /// End of the node sequence.
    End = 0,
    /// A transform step node.
    Step = 1,
    /// A transformed-artifact-set node.
    ArtifactSet = 2,
}

impl NodeTag {
    /// Returns the wire byte for this tag.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a wire byte into a tag.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(NodeTag::End),
            1 => Some(NodeTag::Step),
            2 => Some(NodeTag::ArtifactSet),
            _ => None,
        }
    }
}

/// Encodes one tagged top-level node.
pub fn write_node<W: Write>(ctx: &mut WriteContext<'_, W>, node: &GraphNode) -> CodecResult<()> {
    match node {
        GraphNode::Step(step_node) => {
            ctx.write_u8(NodeTag::Step.as_u8())?;
            step::write_step_node(ctx, step_node)
        }
        GraphNode::ArtifactSet(set) => {
            ctx.write_u8(NodeTag::ArtifactSet.as_u8())?;
            artifact_set::write_artifact_set(ctx, set)
        }
    }
}

/// Decodes one tagged top-level node, or `None` at the end sentinel.
pub fn read_node<R: Read>(ctx: &mut ReadContext<'_, R>) -> CodecResult<Option<GraphNode>> {
    let byte = ctx.read_u8()?;
    let tag = NodeTag::from_u8(byte)
        .ok_or_else(|| CodecError::corrupt(format!("unknown node tag {byte:#04x}")))?;
    match tag {
        NodeTag::End => Ok(None),
        NodeTag::Step => Ok(Some(GraphNode::Step(step::read_step_node(ctx)?))),
        NodeTag::ArtifactSet => Ok(Some(GraphNode::ArtifactSet(
            artifact_set::read_artifact_set(ctx)?,
        ))),
    }
}

/// Encodes a whole node sequence, including the end sentinel.
pub fn write_graph<W: Write>(ctx: &mut WriteContext<'_, W>, nodes: &[GraphNode]) -> CodecResult<()> {
    for node in nodes {
        write_node(ctx, node)?;
    }
    write_end(ctx)
}

/// Writes the end-of-sequence sentinel.
///
/// Split out from [`write_graph`] for callers that stream nodes one at a
/// time and only know the sequence is complete at the end.
pub fn write_end<W: Write>(ctx: &mut WriteContext<'_, W>) -> CodecResult<()> {
    ctx.write_u8(NodeTag::End.as_u8())
}

/// Decodes a whole node sequence up to the end sentinel.
pub fn read_graph<R: Read>(ctx: &mut ReadContext<'_, R>) -> CodecResult<Vec<GraphNode>> {
    let mut nodes = Vec::new();
    while let Some(node) = read_node(ctx)? {
        nodes.push(node);
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_common::{ContentHash, Interner};
    use strata_model::{
        AttributeSet, ComponentVariantId, StepNodeId, TransformStepNode, TransformedArtifactSet,
        VariantId,
    };

    fn step(interner: &Interner, id: u64, action: &str) -> Arc<TransformStepNode> {
        Arc::new(TransformStepNode::new(
            StepNodeId::from_raw(id),
            interner.intern(action),
            ContentHash::from_bytes(action.as_bytes()),
        ))
    }

    #[test]
    fn tag_byte_roundtrip() {
        for tag in [NodeTag::End, NodeTag::Step, NodeTag::ArtifactSet] {
            assert_eq!(NodeTag::from_u8(tag.as_u8()), Some(tag));
        }
        assert_eq!(NodeTag::from_u8(7), None);
    }

    #[test]
    fn empty_graph_is_one_sentinel_byte() {
        let interner = Interner::new();
        let mut w = WriteContext::new(Vec::new(), &interner);
        write_graph(&mut w, &[]).unwrap();
        let buf = w.finish().unwrap();
        assert_eq!(buf, vec![0]);

        let mut r = ReadContext::new(buf.as_slice(), &interner);
        assert!(read_graph(&mut r).unwrap().is_empty());
    }

    #[test]
    fn mixed_graph_roundtrip() {
        let interner = Interner::new();
        let shared = step(&interner, 1, "unzip");
        let set = Arc::new(TransformedArtifactSet::new(
            VariantId::new(interner.intern("lib-a"), interner.intern("release")),
            ComponentVariantId::new(
                interner.intern("lib-a"),
                interner.intern("api"),
                AttributeSet::new(),
            ),
            vec![Arc::clone(&shared), step(&interner, 2, "minify")],
        ));
        let nodes = vec![
            GraphNode::Step(Arc::clone(&shared)),
            GraphNode::ArtifactSet(set),
        ];

        let mut w = WriteContext::new(Vec::new(), &interner);
        write_graph(&mut w, &nodes).unwrap();
        let buf = w.finish().unwrap();

        let mut r = ReadContext::new(buf.as_slice(), &interner);
        let back = read_graph(&mut r).unwrap();
        assert_eq!(back, nodes);

        // The top-level step and the one inside the set are one instance.
        let GraphNode::Step(top_step) = &back[0] else {
            panic!("expected step node");
        };
        let GraphNode::ArtifactSet(back_set) = &back[1] else {
            panic!("expected artifact set");
        };
        assert!(Arc::ptr_eq(top_step, &back_set.steps[0]));
    }

    #[test]
    fn unknown_tag_is_corruption() {
        let interner = Interner::new();
        let bytes = [9u8];
        let mut r = ReadContext::new(bytes.as_slice(), &interner);
        let err = read_node(&mut r).unwrap_err();
        assert!(matches!(err, CodecError::FormatCorruption { .. }));
    }

    #[test]
    fn missing_sentinel_is_corruption() {
        let interner = Interner::new();
        let mut w = WriteContext::new(Vec::new(), &interner);
        write_node(&mut w, &GraphNode::Step(step(&interner, 5, "dex"))).unwrap();
        let buf = w.finish().unwrap();

        // No end sentinel: the reader runs off the stream.
        let mut r = ReadContext::new(buf.as_slice(), &interner);
        let err = read_graph(&mut r).unwrap_err();
        assert!(matches!(err, CodecError::FormatCorruption { .. }));
    }
}
