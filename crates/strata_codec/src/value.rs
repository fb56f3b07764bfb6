//! Codecs for the leaf value types of the graph model.

use std::io::{Read, Write};

use strata_model::{AttributeSet, ComponentVariantId, VariantId};

use crate::error::CodecResult;
use crate::read::ReadContext;
use crate::write::WriteContext;

/// Encodes a source-side variant identifier.
pub fn write_variant_id<W: Write>(
    ctx: &mut WriteContext<'_, W>,
    value: &VariantId,
) -> CodecResult<()> {
    ctx.write_ident(value.component)?;
    ctx.write_ident(value.variant)
}

/// Decodes a source-side variant identifier.
pub fn read_variant_id<R: Read>(ctx: &mut ReadContext<'_, R>) -> CodecResult<VariantId> {
    let component = ctx.read_ident()?;
    let variant = ctx.read_ident()?;
    Ok(VariantId::new(component, variant))
}

/// Encodes a target-variant identifier with its attributes.
pub fn write_target_variant<W: Write>(
    ctx: &mut WriteContext<'_, W>,
    value: &ComponentVariantId,
) -> CodecResult<()> {
    ctx.write_ident(value.component)?;
    ctx.write_ident(value.variant)?;
    ctx.write_count(value.attributes.len())?;
    for (key, attr_value) in value.attributes.iter() {
        ctx.write_ident(key)?;
        ctx.write_ident(attr_value)?;
    }
    Ok(())
}

/// Decodes a target-variant identifier with its attributes.
pub fn read_target_variant<R: Read>(
    ctx: &mut ReadContext<'_, R>,
) -> CodecResult<ComponentVariantId> {
    let component = ctx.read_ident()?;
    let variant = ctx.read_ident()?;
    let count = ctx.read_count()?;
    let mut attributes = AttributeSet::new();
    for _ in 0..count {
        let key = ctx.read_ident()?;
        let attr_value = ctx.read_ident()?;
        attributes.insert(key, attr_value);
    }
    Ok(ComponentVariantId::new(component, variant, attributes))
}
