//! Conditional lowering
//!
//! Value role: one `logix.operators.conditional<T>` per condition level,
//! nested through `on_false`. Statement role: one `logix.flow.if` per level,
//! nested through `false`.

use crate::errors::{CompileError, Result};
use crate::features::desugar::domain::{LoweringContext, Pin, SugarLowering};
use crate::features::templates::paths;
use crate::shared::models::{ArmBody, ConditionalRole, Span, SugarKind, SugarMeta, Type, VertexId};

const KIND: SugarKind = SugarKind::Conditional;

pub struct ConditionalLowering;

struct Parts {
    arms: Vec<ArmBody>,
    otherwise: Option<ArmBody>,
    role: ConditionalRole,
    ty: Option<Type>,
    span: Span,
}

impl ConditionalLowering {
    fn parts(ctx: &LoweringContext<'_>, id: VertexId) -> Result<Parts> {
        let vertex = ctx.sugar(id)?;
        let Some(SugarMeta::Conditional {
            arms,
            otherwise,
            role,
        }) = &vertex.sugar
        else {
            return Err(CompileError::type_error(
                vertex.span,
                format!("`{}` is not a conditional", vertex.name),
            ));
        };
        Ok(Parts {
            arms: arms.clone(),
            otherwise: otherwise.clone(),
            role: *role,
            ty: vertex.params.first().and_then(|p| p.bound.clone()),
            span: vertex.span,
        })
    }

    fn lower_value(ctx: &mut LoweringContext<'_>, id: VertexId, parts: &Parts) -> Result<()> {
        let ty = match &parts.ty {
            Some(ty) if ty.is_concrete() => ty.clone(),
            other => {
                return Err(CompileError::type_error(
                    parts.span,
                    format!(
                        "conditional value type is unresolved ({})",
                        other.as_ref().map(|t| t.to_string()).unwrap_or_default()
                    ),
                ))
            }
        };

        let mut selects = Vec::with_capacity(parts.arms.len());
        for i in 0..parts.arms.len() {
            let name = LoweringContext::synthetic_name(KIND, id, &format!("select{}", i));
            let select = ctx.spawn(paths::CONDITIONAL, name, parts.span, &[ty.clone()])?;
            ctx.graph
                .redirect_inputs(id, &format!("cond{}", i), select, "condition");
            Self::arm_value(ctx, id, &format!("arm{}", i), &Pin::new(select, "on_true"), &ty, parts.span)?;
            selects.push(select);
        }
        for pair in selects.windows(2) {
            ctx.wire(
                &Pin::new(pair[1], "result"),
                &Pin::new(pair[0], "on_false"),
                ty.clone(),
                parts.span,
            );
        }
        if let Some(&last) = selects.last() {
            Self::arm_value(ctx, id, "else", &Pin::new(last, "on_false"), &ty, parts.span)?;
        }
        if let Some(&first) = selects.first() {
            ctx.graph.redirect_outputs(id, "value", first, "result");
        }
        Ok(())
    }

    /// Move the value feeding an arm onto `dst`, widening narrower primitives
    fn arm_value(
        ctx: &mut LoweringContext<'_>,
        id: VertexId,
        arm: &str,
        dst: &Pin,
        ty: &Type,
        span: Span,
    ) -> Result<()> {
        for edge in ctx.graph.take_incoming(id, arm) {
            let src = Pin::new(edge.src, &edge.src_port);
            let src_ty = edge.ty.clone().unwrap_or_else(|| ty.clone());
            let widen = matches!(
                (&src_ty, ty),
                (Type::Primitive(a), Type::Primitive(b)) if a != b
            );
            if widen {
                let name = LoweringContext::synthetic_name(KIND, id, &format!("{}_cast", arm));
                let cast = ctx.spawn(paths::CAST, name, span, &[src_ty.clone(), ty.clone()])?;
                ctx.wire(&src, &Pin::new(cast, "a"), src_ty, edge.span);
                ctx.wire(&Pin::new(cast, "result"), dst, ty.clone(), edge.span);
            } else {
                ctx.wire(&src, dst, src_ty, edge.span);
            }
        }
        Ok(())
    }

    fn lower_statement(ctx: &mut LoweringContext<'_>, id: VertexId, parts: &Parts) -> Result<()> {
        let continuation = ctx.take_continuation(id, "next");

        let mut branches = Vec::with_capacity(parts.arms.len());
        for i in 0..parts.arms.len() {
            let name = LoweringContext::synthetic_name(KIND, id, &format!("branch{}", i));
            let branch = ctx.spawn(paths::FLOW_IF, name, parts.span, &[])?;
            ctx.graph
                .redirect_inputs(id, &format!("cond{}", i), branch, "condition");
            branches.push(branch);
        }
        let (Some(&first), Some(&last)) = (branches.first(), branches.last()) else {
            return Ok(());
        };

        ctx.graph.redirect_inputs(id, "trigger", first, "trigger");
        for pair in branches.windows(2) {
            ctx.pulse(&Pin::new(pair[0], "false"), &Pin::new(pair[1], "trigger"), parts.span);
        }
        for (branch, body) in branches.iter().zip(&parts.arms) {
            ctx.thread(
                Pin::new(*branch, "true"),
                &[body],
                continuation.as_ref(),
                parts.span,
            );
        }
        let otherwise: Vec<&ArmBody> = parts.otherwise.iter().collect();
        ctx.thread(
            Pin::new(last, "false"),
            &otherwise,
            continuation.as_ref(),
            parts.span,
        );
        Ok(())
    }
}

impl SugarLowering for ConditionalLowering {
    fn kind(&self) -> SugarKind {
        KIND
    }

    fn lower(&self, ctx: &mut LoweringContext<'_>, id: VertexId) -> Result<()> {
        let parts = Self::parts(ctx, id)?;
        match parts.role {
            ConditionalRole::Value => Self::lower_value(ctx, id, &parts)?,
            ConditionalRole::Statement => Self::lower_statement(ctx, id, &parts)?,
            ConditionalRole::Pending => {
                return Err(CompileError::type_error(
                    parts.span,
                    "conditional was not classified by type inference",
                ))
            }
        }
        ctx.graph.remove_vertex(id);
        Ok(())
    }
}
