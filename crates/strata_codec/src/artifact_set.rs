//! Codec for transformed-artifact-set nodes.
//!
//! An artifact set is itself a shared-identity node: several consumers in
//! the graph may hold the same set. On first encounter the body is the
//! source variant, the target variant, and the count-prefixed step list;
//! every step reference inside the list goes through the registry as well,
//! so a step shared between two sets is written once.

use std::io::{Read, Write};
use std::sync::Arc;

use strata_model::TransformedArtifactSet;

use crate::error::CodecResult;
use crate::read::ReadContext;
use crate::step;
use crate::value;
use crate::write::WriteContext;

/// Encodes an artifact-set reference, preserving its identity.
pub fn write_artifact_set<W: Write>(
    ctx: &mut WriteContext<'_, W>,
    set: &Arc<TransformedArtifactSet>,
) -> CodecResult<()> {
    ctx.encode_shared(set, |ctx| {
        ctx.write_nullable(Some(&set.source_variant), value::write_variant_id)?;
        ctx.write_nullable(Some(&set.target_variant), value::write_target_variant)?;
        ctx.write_count(set.steps.len())?;
        for node in &set.steps {
            step::write_step_node(ctx, node)?;
        }
        Ok(())
    })
}

/// Decodes an artifact-set reference.
///
/// Both variant identifiers are required; an absent value fails the session
/// with a corruption error rather than substituting a default. The step
/// list decodes in encoded order, and the reconstructed set is registered
/// under its token before it is returned.
pub fn read_artifact_set<R: Read>(
    ctx: &mut ReadContext<'_, R>,
) -> CodecResult<Arc<TransformedArtifactSet>> {
    ctx.decode_shared(|ctx| {
        let source_variant = ctx.read_non_null("source variant id", value::read_variant_id)?;
        let target_variant = ctx.read_non_null("target variant", value::read_target_variant)?;
        let count = ctx.read_count()?;
        let mut steps = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            steps.push(step::read_step_node(ctx)?);
        }
        Ok(TransformedArtifactSet::new(
            source_variant,
            target_variant,
            steps,
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::{ContentHash, Interner};
    use strata_model::{AttributeSet, ComponentVariantId, StepNodeId, TransformStepNode, VariantId};

    fn step(interner: &Interner, id: u64, action: &str) -> Arc<TransformStepNode> {
        Arc::new(TransformStepNode::new(
            StepNodeId::from_raw(id),
            interner.intern(action),
            ContentHash::from_bytes(action.as_bytes()),
        ))
    }

    fn set(
        interner: &Interner,
        source: &str,
        steps: Vec<Arc<TransformStepNode>>,
    ) -> Arc<TransformedArtifactSet> {
        Arc::new(TransformedArtifactSet::new(
            VariantId::new(interner.intern(source), interner.intern("release")),
            ComponentVariantId::new(
                interner.intern(source),
                interner.intern("api"),
                AttributeSet::from_pairs([(
                    interner.intern("usage"),
                    interner.intern("compile"),
                )]),
            ),
            steps,
        ))
    }

    fn roundtrip(
        interner: &Interner,
        sets: &[Arc<TransformedArtifactSet>],
    ) -> Vec<Arc<TransformedArtifactSet>> {
        let mut w = WriteContext::new(Vec::new(), interner);
        for s in sets {
            write_artifact_set(&mut w, s).unwrap();
        }
        let buf = w.finish().unwrap();

        let mut r = ReadContext::new(buf.as_slice(), interner);
        sets.iter()
            .map(|_| read_artifact_set(&mut r).unwrap())
            .collect()
    }

    #[test]
    fn roundtrip_deep_equal() {
        let interner = Interner::new();
        let original = set(
            &interner,
            "lib-a",
            vec![step(&interner, 1, "unzip"), step(&interner, 2, "minify")],
        );
        let back = roundtrip(&interner, &[Arc::clone(&original)]);
        assert_eq!(*back[0], *original);
    }

    #[test]
    fn roundtrip_empty_step_list() {
        let interner = Interner::new();
        let original = set(&interner, "lib-b", Vec::new());
        let back = roundtrip(&interner, &[Arc::clone(&original)]);
        assert!(back[0].steps.is_empty());
        assert_eq!(*back[0], *original);
    }

    #[test]
    fn step_order_is_preserved() {
        let interner = Interner::new();
        let a = step(&interner, 1, "desugar");
        let b = step(&interner, 2, "dex");
        let c = step(&interner, 3, "merge");
        let original = set(&interner, "lib-c", vec![a, b, c]);

        let back = roundtrip(&interner, &[Arc::clone(&original)]);
        let actions: Vec<&str> = back[0]
            .steps
            .iter()
            .map(|s| interner.resolve(s.action))
            .collect();
        assert_eq!(actions, ["desugar", "dex", "merge"]);
    }

    #[test]
    fn same_set_twice_decodes_to_same_instance() {
        let interner = Interner::new();
        let original = set(&interner, "lib-d", vec![step(&interner, 1, "unzip")]);
        let back = roundtrip(&interner, &[Arc::clone(&original), Arc::clone(&original)]);
        assert!(Arc::ptr_eq(&back[0], &back[1]));
    }

    #[test]
    fn step_shared_between_sets_decodes_to_same_instance() {
        let interner = Interner::new();
        let shared = step(&interner, 7, "relocate");
        let first = set(&interner, "lib-e", vec![Arc::clone(&shared)]);
        let second = set(
            &interner,
            "lib-f",
            vec![step(&interner, 8, "unzip"), Arc::clone(&shared)],
        );

        let back = roundtrip(&interner, &[first, second]);
        assert!(Arc::ptr_eq(&back[0].steps[0], &back[1].steps[1]));
        assert!(!Arc::ptr_eq(&back[0].steps[0], &back[1].steps[0]));
    }

    #[test]
    fn truncation_mid_body_is_corruption() {
        let interner = Interner::new();
        let original = set(&interner, "lib-g", vec![step(&interner, 1, "unzip")]);

        let mut w = WriteContext::new(Vec::new(), &interner);
        write_artifact_set(&mut w, &original).unwrap();
        let buf = w.finish().unwrap();

        // Keep the token and presence flag, drop the body.
        let mut r = ReadContext::new(&buf[..5], &interner);
        let err = read_artifact_set(&mut r).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CodecError::FormatCorruption { .. }
        ));
    }

    #[test]
    fn absent_source_variant_is_corruption() {
        let interner = Interner::new();
        // Token 0, present=true, then a null source-variant slot.
        let mut bytes = 0u32.to_le_bytes().to_vec();
        bytes.push(1);
        bytes.push(0);
        let mut r = ReadContext::new(bytes.as_slice(), &interner);
        let err = read_artifact_set(&mut r).unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("missing required source variant id"));
    }
}
