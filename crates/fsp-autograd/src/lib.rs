#![forbid(unsafe_code)]

//! Minimal reverse-mode tape for the FrankenSpectral transforms.
//!
//! Every recorded operation keeps its forward value and, for transforms, the
//! [`FftBackward`] rule captured at call time. [`Tape::backward`] walks the
//! nodes in reverse recording order, which is a valid topological order since
//! an operation can only consume variables recorded before it.
//!
//! Gradients follow the conjugate Wirtinger convention used by `fsp-fft`:
//! the gradient of a complex leaf `z` is `∂L/∂Re(z) + i·∂L/∂Im(z)`.
//! Buffers exist only for leaves and are allocated on first accumulation.

use fsp_fft::{
    FftArgs, FftBackward, FftError, FftOptions, Normalization, Tensor, TransformKind,
    forward_with_rule,
};
use fsp_runtime::RuntimeMode;
use num_complex::Complex;
use thiserror::Error;

pub type AutogradResult<T> = Result<T, AutogradError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AutogradError {
    #[error("unknown variable {id}")]
    UnknownVariable { id: usize },
    #[error("backward requires a scalar root, got shape {shape:?}")]
    NonScalarRoot { shape: Vec<usize> },
    #[error(transparent)]
    Fft(#[from] FftError),
}

/// Handle to a value recorded on a [`Tape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(usize);

impl Var {
    #[must_use]
    pub fn id(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
enum Op {
    Leaf,
    Transform { rule: FftBackward, input: Var },
    Sum { input: Var },
}

#[derive(Debug, Clone)]
struct Node {
    value: Tensor,
    op: Op,
}

#[derive(Debug, Clone, Default)]
pub struct Tape {
    nodes: Vec<Node>,
    grads: Vec<Option<Tensor>>,
    options: FftOptions,
}

impl Tape {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tape whose transforms run with `options` unless a call overrides the norm.
    #[must_use]
    pub fn with_options(options: FftOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_mode(mode: RuntimeMode) -> Self {
        Self::with_options(FftOptions::default().with_mode(mode))
    }

    #[must_use]
    pub fn options(&self) -> &FftOptions {
        &self.options
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaf(&mut self, value: Tensor) -> Var {
        self.push(value, Op::Leaf)
    }

    pub fn value(&self, var: Var) -> AutogradResult<&Tensor> {
        self.node(var).map(|node| &node.value)
    }

    /// Record any transform variant.
    pub fn transform(&mut self, kind: TransformKind, var: Var, args: &FftArgs) -> AutogradResult<Var> {
        let (value, rule) = forward_with_rule(kind, &self.node(var)?.value, args, &self.options)?;
        Ok(self.push(value, Op::Transform { rule, input: var }))
    }

    pub fn fft(
        &mut self,
        var: Var,
        n: Option<i64>,
        dim: i64,
        norm: Option<Normalization>,
    ) -> AutogradResult<Var> {
        let args = FftArgs {
            s: n.map(|n| vec![n]),
            dim: Some(vec![dim]),
            norm,
        };
        self.transform(TransformKind::Fft, var, &args)
    }

    pub fn fftn(&mut self, var: Var, args: &FftArgs) -> AutogradResult<Var> {
        self.transform(TransformKind::Fftn, var, args)
    }

    pub fn ifftn(&mut self, var: Var, args: &FftArgs) -> AutogradResult<Var> {
        self.transform(TransformKind::Ifftn, var, args)
    }

    pub fn rfftn(&mut self, var: Var, args: &FftArgs) -> AutogradResult<Var> {
        self.transform(TransformKind::Rfftn, var, args)
    }

    pub fn irfftn(&mut self, var: Var, args: &FftArgs) -> AutogradResult<Var> {
        self.transform(TransformKind::Irfftn, var, args)
    }

    pub fn hfftn(&mut self, var: Var, args: &FftArgs) -> AutogradResult<Var> {
        self.transform(TransformKind::Hfftn, var, args)
    }

    pub fn ihfftn(&mut self, var: Var, args: &FftArgs) -> AutogradResult<Var> {
        self.transform(TransformKind::Ihfftn, var, args)
    }

    /// Sum of every element as a rank-0 tensor.
    pub fn sum(&mut self, var: Var) -> AutogradResult<Var> {
        let value = self.node(var)?.value.sum();
        Ok(self.push(value, Op::Sum { input: var }))
    }

    /// Propagate from a rank-0 `root` seeded with one, accumulating into leaves.
    pub fn backward(&mut self, root: Var) -> AutogradResult<()> {
        let root_value = &self.node(root)?.value;
        if root_value.rank() != 0 {
            return Err(AutogradError::NonScalarRoot {
                shape: root_value.shape().to_vec(),
            });
        }

        let mut pending: Vec<Option<Tensor>> = vec![None; root.0 + 1];
        pending[root.0] = Some(root_value.ones_like());

        for id in (0..=root.0).rev() {
            let Some(grad) = pending[id].take() else {
                continue;
            };
            match &self.nodes[id].op {
                Op::Leaf => accumulate(&mut self.grads[id], grad)?,
                Op::Transform { rule, input } => {
                    let input_grad = rule.apply(&grad)?;
                    accumulate(&mut pending[input.0], input_grad)?;
                }
                Op::Sum { input } => {
                    let seed = grad
                        .to_complex128_vec()
                        .first()
                        .copied()
                        .unwrap_or(Complex::new(0.0, 0.0));
                    let source = &self.nodes[input.0].value;
                    let input_grad = Tensor::full(source.shape(), source.dtype(), seed);
                    accumulate(&mut pending[input.0], input_grad)?;
                }
            }
        }
        Ok(())
    }

    /// Accumulated gradient of a leaf, `None` until `backward` reaches it.
    pub fn grad(&self, var: Var) -> AutogradResult<Option<&Tensor>> {
        self.node(var)?;
        Ok(self.grads[var.0].as_ref())
    }

    pub fn zero_grad(&mut self) {
        self.grads.iter_mut().for_each(|grad| *grad = None);
    }

    fn node(&self, var: Var) -> AutogradResult<&Node> {
        self.nodes
            .get(var.0)
            .ok_or(AutogradError::UnknownVariable { id: var.0 })
    }

    fn push(&mut self, value: Tensor, op: Op) -> Var {
        self.nodes.push(Node { value, op });
        self.grads.push(None);
        Var(self.nodes.len() - 1)
    }
}

fn accumulate(slot: &mut Option<Tensor>, grad: Tensor) -> AutogradResult<()> {
    match slot {
        Some(existing) => existing.add_assign(&grad)?,
        None => *slot = Some(grad),
    }
    Ok(())
}
