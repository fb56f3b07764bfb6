//! Codec for transform step nodes.
//!
//! Step nodes may be shared by several artifact sets, so they are always
//! encoded through the shared-identity registry: the body is written once
//! per pass, and later references are token-only.

use std::io::{Read, Write};
use std::sync::Arc;

use strata_model::{StepNodeId, TransformStepNode};

use crate::error::CodecResult;
use crate::read::ReadContext;
use crate::write::WriteContext;

/// Encodes a step node reference, preserving its identity.
pub fn write_step_node<W: Write>(
    ctx: &mut WriteContext<'_, W>,
    node: &Arc<TransformStepNode>,
) -> CodecResult<()> {
    ctx.encode_shared(node, |ctx| {
        ctx.write_u64(node.id.as_raw())?;
        ctx.write_ident(node.action)?;
        ctx.write_hash(&node.parameters_hash)
    })
}

/// Decodes a step node reference, resolving reuse markers to the instance
/// materialized at the first occurrence.
pub fn read_step_node<R: Read>(
    ctx: &mut ReadContext<'_, R>,
) -> CodecResult<Arc<TransformStepNode>> {
    ctx.decode_shared(|ctx| {
        let id = StepNodeId::from_raw(ctx.read_u64()?);
        let action = ctx.read_ident()?;
        let parameters_hash = ctx.read_hash()?;
        Ok(TransformStepNode::new(id, action, parameters_hash))
    })
}
