//! The backward engine: topological ordering of the operand graph and the
//! reverse sweep that drives each node's backward step.

use std::collections::HashSet;

use crate::autograd::backward_step;
use crate::tensor::Tensor;

impl Tensor {
    /// Reverse-mode sweep from this tensor. Seeds this tensor's gradient
    /// with ones, then visits every reachable ancestor in reverse
    /// topological order, accumulating gradient contributions into each
    /// tracking operand.
    ///
    /// Gradients accumulate across calls; use [`Tensor::zero_grad`] between
    /// unrelated steps. Calling this on a tensor that does not track
    /// gradients is a warned no-op: its graph carries no backward rules, so
    /// there is nothing meaningful to propagate.
    pub fn backward(&self) {
        if !self.requires_grad() {
            log::warn!("backward() called on a tensor that does not track gradients; ignoring");
            return;
        }
        let order = topological_order(self);
        log::trace!("backward sweep over {} graph nodes", order.len());
        self.seed_grad_ones();
        for node in order.iter().rev() {
            backward_step(node);
        }
    }
}

/// Post-order over the operand graph with an explicit stack: every operand
/// is emitted before any tensor computed from it. The seen set is keyed by
/// the shared allocation's address, so re-convergent operands (diamonds
/// like `x + x`) are emitted exactly once and the walk terminates on any
/// acyclic graph.
fn topological_order(root: &Tensor) -> Vec<Tensor> {
    let mut order = Vec::new();
    let mut seen: HashSet<*const ()> = HashSet::new();
    let mut stack: Vec<(Tensor, bool)> = vec![(root.clone(), false)];
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if !seen.insert(node.id()) {
            continue;
        }
        let operands = node.op().operands();
        stack.push((node, true));
        for operand in operands {
            stack.push((operand, false));
        }
    }
    order
}
