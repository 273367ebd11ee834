//! Generic schema walker.
//!
//! A [`RuleSet`] maps every schema kind to a handling rule. [`walk`] dispatches a node to
//! its rule, hands the rule a [`Next`] continuation for recursive descent, and finally
//! lets the rule set decorate the result through [`RuleSet::on_each`]. The walker never
//! looks inside the results it moves around.

use crate::error::{Error, Result};
use crate::schema::SchemaNode;

/// A result type that accepts partial overlays after dispatch
pub trait Overlay: Sized {
    type Patch;

    /// Merges `patch` over `self`, the patch winning on conflicts
    fn overlay(self, patch: Self::Patch) -> Self;
}

/// One handling rule per schema kind, producing `Output` values
pub trait RuleSet {
    type Output: Overlay;
    type Context;

    /// Depicts `node`. `None` means the rule set has no rule for the node's kind.
    fn handle(
        &self,
        node: &SchemaNode,
        ctx: &Self::Context,
        next: &Next<'_, Self>,
    ) -> Option<Result<Self::Output>>;

    /// Error reported for kinds without a rule. Generation stops on it.
    fn on_missing(&self, node: &SchemaNode, ctx: &Self::Context) -> Error;

    /// Post-processing run after every successful dispatch
    fn on_each(
        &self,
        _node: &SchemaNode,
        _ctx: &Self::Context,
        _prev: &Self::Output,
    ) -> Option<<Self::Output as Overlay>::Patch> {
        None
    }
}

/// Continuation bound to the rule set and context of the current walk
pub struct Next<'a, R: RuleSet + ?Sized> {
    rules: &'a R,
    ctx: &'a R::Context,
}

impl<'a, R: RuleSet + ?Sized> Next<'a, R> {
    /// Walks a child node with the same rules and context
    pub fn call(&self, node: &SchemaNode) -> Result<R::Output> {
        walk(node, self.rules, self.ctx)
    }
}

/// Walks `node` with `rules`, returning the decorated result
pub fn walk<R: RuleSet + ?Sized>(
    node: &SchemaNode,
    rules: &R,
    ctx: &R::Context,
) -> Result<R::Output> {
    let next = Next { rules, ctx };
    let result = match rules.handle(node, ctx, &next) {
        Some(result) => result?,
        None => return Err(rules.on_missing(node, ctx)),
    };
    Ok(match rules.on_each(node, ctx, &result) {
        Some(patch) => result.overlay(patch),
        None => result,
    })
}
