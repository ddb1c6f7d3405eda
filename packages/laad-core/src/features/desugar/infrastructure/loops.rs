//! Loop lowering
//!
//! All three loop forms become one `logix.flow.while`. The body tail drives
//! `iterate`, which re-checks the condition.

use crate::errors::{CompileError, Result};
use crate::features::desugar::domain::{LoweringContext, Pin, SugarLowering};
use crate::features::templates::paths;
use crate::shared::models::{Literal, SugarKind, SugarMeta, Type, VertexId};

fn not_a(kind: SugarKind, ctx: &LoweringContext<'_>, id: VertexId) -> CompileError {
    let (span, name) = ctx
        .sugar(id)
        .map(|v| (v.span, v.name.clone()))
        .unwrap_or_default();
    CompileError::type_error(span, format!("`{}` is not a `{}` loop", name, kind.as_str()))
}

/// Spawn the `flow.while` and move trigger, condition and `after` onto it
fn spawn_loop(ctx: &mut LoweringContext<'_>, kind: SugarKind, id: VertexId) -> Result<VertexId> {
    let span = ctx.sugar(id)?.span;
    let name = LoweringContext::synthetic_name(kind, id, "loop");
    let looped = ctx.spawn(paths::FLOW_WHILE, name, span, &[])?;
    ctx.graph.redirect_inputs(id, "condition", looped, "condition");
    ctx.graph.redirect_outputs(id, "after", looped, "after");
    Ok(looped)
}

pub struct WhileLowering;

impl SugarLowering for WhileLowering {
    fn kind(&self) -> SugarKind {
        SugarKind::While
    }

    fn lower(&self, ctx: &mut LoweringContext<'_>, id: VertexId) -> Result<()> {
        let vertex = ctx.sugar(id)?;
        let span = vertex.span;
        let Some(SugarMeta::While { body }) = vertex.sugar.clone() else {
            return Err(not_a(self.kind(), ctx, id));
        };

        let looped = spawn_loop(ctx, self.kind(), id)?;
        ctx.graph.redirect_inputs(id, "trigger", looped, "trigger");
        ctx.thread(
            Pin::new(looped, "body"),
            &[&body],
            Some(&Pin::new(looped, "iterate")),
            span,
        );
        ctx.graph.remove_vertex(id);
        Ok(())
    }
}

/// `for (i in a..b)`: `write(i, a)`, loop while `i < b`, then `write(i, i + 1)`
/// after each pass
pub struct RangeForLowering;

impl SugarLowering for RangeForLowering {
    fn kind(&self) -> SugarKind {
        SugarKind::RangeFor
    }

    fn lower(&self, ctx: &mut LoweringContext<'_>, id: VertexId) -> Result<()> {
        let vertex = ctx.sugar(id)?;
        let span = vertex.span;
        let ty = vertex
            .params
            .first()
            .and_then(|p| p.bound.clone())
            .filter(Type::is_concrete);
        let Some(SugarMeta::RangeFor { counter, body }) = vertex.sugar.clone() else {
            return Err(not_a(self.kind(), ctx, id));
        };
        let Some(ty) = ty else {
            return Err(CompileError::type_error(span, "range bounds have no numeric type"));
        };
        let kind = self.kind();
        let field = Type::field(ty.clone());
        let name = |role: &str| LoweringContext::synthetic_name(kind, id, role);

        // i = from
        let init = ctx.spawn(paths::WRITE, name("init"), span, &[ty.clone()])?;
        ctx.graph.redirect_inputs(id, "trigger", init, "trigger");
        ctx.graph.redirect_inputs(id, "from", init, "value");
        ctx.wire(&Pin::new(counter, "field"), &Pin::new(init, "target"), field.clone(), span);

        // i < to
        let check = ctx.spawn(paths::LT, name("cond"), span, &[ty.clone()])?;
        ctx.wire(&Pin::new(counter, "value"), &Pin::new(check, "a"), ty.clone(), span);
        ctx.graph.redirect_inputs(id, "to", check, "b");

        let looped = spawn_loop(ctx, kind, id)?;
        ctx.pulse(&Pin::new(init, "next"), &Pin::new(looped, "trigger"), span);
        ctx.wire(&Pin::new(check, "result"), &Pin::new(looped, "condition"), Type::bool(), span);

        // i = i + 1
        let unit = match &ty {
            Type::Primitive(p) if p.is_fractional() => Literal::Float(1.0),
            _ => Literal::Int(1),
        };
        let one = ctx.spawn_constant(name("one"), span, ty.clone(), unit)?;
        let increment = ctx.spawn(paths::ADD, name("inc"), span, &[ty.clone()])?;
        ctx.wire(&Pin::new(counter, "value"), &Pin::new(increment, "a"), ty.clone(), span);
        ctx.wire(&Pin::new(one, "value"), &Pin::new(increment, "b"), ty.clone(), span);
        let step = ctx.spawn(paths::WRITE, name("step"), span, &[ty.clone()])?;
        ctx.wire(&Pin::new(counter, "field"), &Pin::new(step, "target"), field, span);
        ctx.wire(&Pin::new(increment, "result"), &Pin::new(step, "value"), ty, span);
        ctx.pulse(&Pin::new(step, "next"), &Pin::new(looped, "iterate"), span);

        ctx.thread(
            Pin::new(looped, "body"),
            &[&body],
            Some(&Pin::new(step, "trigger")),
            span,
        );
        ctx.graph.remove_vertex(id);
        Ok(())
    }
}

/// `for (start, cond, end)`: start chain, loop on `cond`, body then end chain
/// per pass
pub struct GenericForLowering;

impl SugarLowering for GenericForLowering {
    fn kind(&self) -> SugarKind {
        SugarKind::GenericFor
    }

    fn lower(&self, ctx: &mut LoweringContext<'_>, id: VertexId) -> Result<()> {
        let vertex = ctx.sugar(id)?;
        let span = vertex.span;
        let Some(SugarMeta::GenericFor { start, end, body }) = vertex.sugar.clone() else {
            return Err(not_a(self.kind(), ctx, id));
        };

        let looped = spawn_loop(ctx, self.kind(), id)?;
        match ctx.sequence(&start, span) {
            Some(segment) => {
                ctx.graph
                    .redirect_inputs(id, "trigger", segment.entry.vertex, &segment.entry.port);
                if let Some(exit) = segment.exit {
                    ctx.pulse(&exit, &Pin::new(looped, "trigger"), span);
                }
            }
            None => ctx.graph.redirect_inputs(id, "trigger", looped, "trigger"),
        }
        ctx.thread(
            Pin::new(looped, "body"),
            &[&body, &end],
            Some(&Pin::new(looped, "iterate")),
            span,
        );
        ctx.graph.remove_vertex(id);
        Ok(())
    }
}
