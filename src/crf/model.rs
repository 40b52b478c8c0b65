//! On-disk CRF model container (`spec.md` §4.F).

use std::collections::HashMap;

use tracing::debug;

use crate::crf::context::CrfContext;
use crate::error::{Error, Result};
use crate::matrix::{DenseMatrix, SparseMatrix};
use crate::reader::ByteReader;

const CRF_SIGNATURE: u32 = 0xCFCF_CFCF;

/// A loaded linear-chain CRF: label set, feature-id maps, and weight
/// matrices. Immutable after construction and safe to share behind an `Arc`
/// across concurrent `parse` calls — each call gets its own [`CrfContext`].
#[derive(Debug, Clone)]
pub struct Crf {
    classes: Vec<String>,
    state_features: HashMap<String, u32>,
    trans_features: HashMap<String, u32>,
    weights: SparseMatrix,
    trans_weights: DenseMatrix,
}

impl Crf {
    pub fn num_labels(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn class_name(&self, label: usize) -> Option<&str> {
        self.classes.get(label).map(|s| s.as_str())
    }

    /// Feature-id maps, exposed so the feature extractor's output strings
    /// can be filtered to ones the model actually knows about before
    /// spending a sparse-row lookup on them.
    pub fn state_features(&self) -> &HashMap<String, u32> {
        &self.state_features
    }

    pub fn trans_features(&self) -> &HashMap<String, u32> {
        &self.trans_features
    }

    /// Build a fresh [`CrfContext`] sized for this model's label set.
    pub fn new_context(&self) -> Result<CrfContext> {
        CrfContext::new(self.num_labels(), self.trans_weights.clone())
    }

    /// Add every `features` entry's weight row into `ctx`'s state matrix at
    /// token `t`. Features the model has never seen are silently skipped
    /// (an unseen feature contributes zero weight, matching how a CRF
    /// trained without that feature would score it). Transition-conditioned
    /// features are reserved for future use; `prev_tag_features` is accepted
    /// but ignored, matching §4.E.
    pub fn score_token(
        &self,
        ctx: &mut CrfContext,
        t: usize,
        features: &[String],
        _prev_tag_features: Option<&[String]>,
    ) -> Result<()> {
        for feature in features {
            let Some(&fid) = self.state_features.get(feature) else {
                continue;
            };
            let row = fid as usize;
            let cols = self.weights.row(row)?;
            let values = self.weights.row_values(row)?;
            for (&col, &value) in cols.iter().zip(values.iter()) {
                ctx.add_to_state(t, col as usize, value)?;
            }
        }
        Ok(())
    }

    /// Run Viterbi decoding over `ctx`'s accumulated state scores.
    pub fn viterbi(&self, ctx: &CrfContext) -> Result<Vec<usize>> {
        ctx.viterbi()
    }

    /// Decode the on-disk CRF container: signature, class list, the two
    /// feature-id maps, the sparse state-weight matrix, then the dense
    /// transition-weight matrix.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let sig = r.read_u32()?;
        if sig != CRF_SIGNATURE {
            return Err(Error::InvalidSignature { expected: CRF_SIGNATURE, found: sig });
        }
        let num_classes = r.read_u32()? as usize;
        let mut classes = Vec::with_capacity(num_classes);
        for _ in 0..num_classes {
            classes.push(r.read_length_prefixed_string()?);
        }
        let state_features = read_feature_map(&mut r)?;
        let trans_features = read_feature_map(&mut r)?;
        let weights = SparseMatrix::read_be(&mut r)?;
        let trans_weights = DenseMatrix::read_be(&mut r, num_classes, num_classes)?;

        debug!(
            classes = num_classes,
            state_features = state_features.len(),
            trans_features = trans_features.len(),
            "loaded CRF model"
        );

        Ok(Self { classes, state_features, trans_features, weights, trans_weights })
    }
}

fn read_feature_map(r: &mut ByteReader) -> Result<HashMap<String, u32>> {
    let count = r.read_u32()? as usize;
    let mut map = HashMap::with_capacity(count);
    for _ in 0..count {
        let name = r.read_length_prefixed_string()?;
        let id = r.read_u32()?;
        map.insert(name, id);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_feature_map(buf: &mut Vec<u8>, entries: &[(&str, u32)]) {
        buf.extend_from_slice(&(entries.len() as u32).to_be_bytes());
        for &(name, id) in entries {
            buf.extend_from_slice(&(name.len() as u32).to_be_bytes());
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(&id.to_be_bytes());
        }
    }

    fn build_fixture() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&CRF_SIGNATURE.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes()); // num_classes
        for name in ["house_number", "street"] {
            buf.extend_from_slice(&(name.len() as u32).to_be_bytes());
            buf.extend_from_slice(name.as_bytes());
        }
        write_feature_map(&mut buf, &[("bias", 0), ("is_numeric", 1)]);
        write_feature_map(&mut buf, &[]);
        // sparse weights: 2 rows (features) x 2 cols (labels)
        buf.extend_from_slice(&2u32.to_be_bytes()); // rows
        buf.extend_from_slice(&2u32.to_be_bytes()); // cols
        buf.extend_from_slice(&2u32.to_be_bytes()); // nnz
        buf.extend_from_slice(&0u32.to_be_bytes()); // row_ptr[0]
        buf.extend_from_slice(&1u32.to_be_bytes()); // row_ptr[1]
        buf.extend_from_slice(&2u32.to_be_bytes()); // row_ptr[2]
        buf.extend_from_slice(&1u32.to_be_bytes()); // col_idx[0] (bias -> street)
        buf.extend_from_slice(&0u32.to_be_bytes()); // col_idx[1] (is_numeric -> house_number)
        buf.extend_from_slice(&1.0f64.to_be_bytes());
        buf.extend_from_slice(&5.0f64.to_be_bytes());
        // dense transitions, 2x2, all zero
        for _ in 0..4 {
            buf.extend_from_slice(&0.0f64.to_be_bytes());
        }
        buf
    }

    #[test]
    fn loads_classes_and_feature_maps() {
        let crf = Crf::load(&build_fixture()).unwrap();
        assert_eq!(crf.classes(), &["house_number", "street"]);
        assert_eq!(crf.state_features().get("bias"), Some(&0));
        assert_eq!(crf.num_labels(), 2);
    }

    #[test]
    fn rejects_wrong_signature() {
        let bytes = [0u8; 8];
        assert!(matches!(Crf::load(&bytes), Err(Error::InvalidSignature { .. })));
    }

    #[test]
    fn score_token_and_viterbi_prefer_numeric_feature_label() {
        let crf = Crf::load(&build_fixture()).unwrap();
        let mut ctx = crf.new_context().unwrap();
        ctx.prepare_for_inference(1);
        crf.score_token(&mut ctx, 0, &["is_numeric".to_string()], None).unwrap();
        let labels = crf.viterbi(&ctx).unwrap();
        assert_eq!(labels, vec![0]); // house_number scored 5.0 via is_numeric
    }

    #[test]
    fn unknown_feature_contributes_nothing() {
        let crf = Crf::load(&build_fixture()).unwrap();
        let mut ctx = crf.new_context().unwrap();
        ctx.prepare_for_inference(1);
        crf.score_token(&mut ctx, 0, &["never_seen".to_string()], None).unwrap();
        // both labels score 0; tie breaks to lowest index
        assert_eq!(crf.viterbi(&ctx).unwrap(), vec![0]);
    }
}
