//! Per-call CRF inference scratch space (`spec.md` §4.E).
//!
//! Reference upstream implementation: generalized from the teacher's
//! per-call, stack-allocated scratch pattern (e.g. `Engine`'s candidate
//! buffers are never stored on the long-lived model) — `CrfContext` is
//! built fresh for every `parse` call and never shared across calls.

use crate::error::{Error, Result};
use crate::matrix::DenseMatrix;

/// Holds the state-score and transition-score matrices for one inference
/// run and runs Viterbi max-sum decoding over them.
pub struct CrfContext {
    state: DenseMatrix,
    trans: DenseMatrix,
    num_labels: usize,
    num_items: usize,
}

impl CrfContext {
    /// `trans` must be `num_labels x num_labels`.
    pub fn new(num_labels: usize, trans: DenseMatrix) -> Result<Self> {
        if trans.rows() != num_labels || trans.cols() != num_labels {
            return Err(Error::InvalidData(format!(
                "transition matrix must be {0}x{0}, got {1}x{2}",
                num_labels,
                trans.rows(),
                trans.cols()
            )));
        }
        Ok(Self {
            state: DenseMatrix::zeros(0, num_labels),
            trans,
            num_labels,
            num_items: 0,
        })
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Reset to zero items.
    pub fn reset(&mut self) {
        self.num_items = 0;
        self.state = DenseMatrix::zeros(0, self.num_labels);
    }

    /// Resize the state matrix to `t` rows and zero it.
    pub fn set_num_items(&mut self, t: usize) {
        self.num_items = t;
        self.state = DenseMatrix::zeros(t, self.num_labels);
    }

    /// Prepare for a fresh inference run over `t` tokens.
    pub fn prepare_for_inference(&mut self, t: usize) {
        self.set_num_items(t);
    }

    /// Add `delta` to `state[t][label]`.
    pub fn add_to_state(&mut self, t: usize, label: usize, delta: f64) -> Result<()> {
        self.state.add_at(t, label, delta)
    }

    /// Run Viterbi max-sum decoding, returning the optimal label index per
    /// token. Ties in the argmax are broken by the lowest predecessor index.
    pub fn viterbi(&self) -> Result<Vec<usize>> {
        let t_len = self.num_items;
        let l = self.num_labels;
        if t_len == 0 {
            return Ok(Vec::new());
        }
        let mut delta = DenseMatrix::zeros(t_len, l);
        let mut psi = vec![vec![0usize; l]; t_len];

        for k in 0..l {
            delta.set(0, k, self.state.get(0, k)?)?;
        }
        for t in 1..t_len {
            for k in 0..l {
                let state_tk = self.state.get(t, k)?;
                let mut best_score = f64::NEG_INFINITY;
                let mut best_prev = 0usize;
                for kp in 0..l {
                    let score = delta.get(t - 1, kp)? + self.trans.get(kp, k)?;
                    if score > best_score {
                        best_score = score;
                        best_prev = kp;
                    }
                }
                delta.set(t, k, state_tk + best_score)?;
                psi[t][k] = best_prev;
            }
        }

        let mut best_final = 0usize;
        let mut best_final_score = f64::NEG_INFINITY;
        for k in 0..l {
            let score = delta.get(t_len - 1, k)?;
            if score > best_final_score {
                best_final_score = score;
                best_final = k;
            }
        }

        let mut path = vec![0usize; t_len];
        path[t_len - 1] = best_final;
        for t in (1..t_len).rev() {
            path[t - 1] = psi[t][path[t]];
        }
        Ok(path)
    }
}
