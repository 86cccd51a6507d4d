// ============================================================
// Layer 4 — Subject Batcher
// ============================================================
// Implements Burn's Batcher trait to stack SubjectItems into
// tensors on the target device.
//
//   volumes  → [batch, channel, depth, height, width]
//   features → [batch, n_features]
//   targets  → class ids [batch] (Int) or ages [batch] (Float)
//
// All volumes in a batch must share one shape, and all feature
// vectors one length; the dataset view guarantees both for a
// fixed VolumeOptions and catalog.
//
// Why flatten and reshape?
//   ndarray volumes and feature Vecs are copied once into a flat
//   buffer in row-major order; a single reshape then gives the
//   batched shape without stacking one tensor per item.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::SubjectItem;

/// Targets of one batch
#[derive(Debug, Clone)]
pub enum TargetBatch<B: Backend> {
    /// Relabeled diagnosis class ids, shape [batch]
    Classes(Tensor<B, 1, Int>),

    /// Normalised ages (`age / age_scale`), shape [batch]
    Ages(Tensor<B, 1>),
}

/// A batch of subjects ready for a forward pass
#[derive(Debug, Clone)]
pub struct SubjectBatch<B: Backend> {
    /// Subject ids in batch order, for tracing predictions back
    pub subject_ids: Vec<String>,

    /// Shape: [batch, channel, depth, height, width]
    pub volumes: Tensor<B, 5>,

    /// Shape: [batch, n_features]
    /// Row layout: [female, male, age_norm?, clinical...]
    pub features: Tensor<B, 2>,

    /// Class ids or normalised ages, one per subject
    pub targets: TargetBatch<B>,
}

/// Stacks SubjectItems into a SubjectBatch on `device`
#[derive(Clone, Debug)]
pub struct SubjectBatcher<B: Backend> {
    /// Device every tensor of the batch is created on
    pub device: B::Device,
}

impl<B: Backend> SubjectBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SubjectItem, SubjectBatch<B>> for SubjectBatcher<B> {
    fn batch(&self, items: Vec<SubjectItem>) -> SubjectBatch<B> {
        let batch_size = items.len();
        let vshape     = items[0].volume.shape().to_vec();
        let n_features = items[0].features.len();

        // ── Volumes ───────────────────────────────────────────────────────────
        // ndarray iterates in logical (row-major) order regardless of
        // the memory layout the file was read with
        let vol_flat: Vec<f32> = items
            .iter()
            .flat_map(|it| it.volume.iter().copied())
            .collect();
        let volumes = Tensor::<B, 1>::from_floats(vol_flat.as_slice(), &self.device)
            .reshape([batch_size, vshape[0], vshape[1], vshape[2], vshape[3]]);

        // ── Features ──────────────────────────────────────────────────────────
        let feat_flat: Vec<f32> = items
            .iter()
            .flat_map(|it| it.features.iter().copied())
            .collect();
        let features = Tensor::<B, 1>::from_floats(feat_flat.as_slice(), &self.device)
            .reshape([batch_size, n_features]);

        // ── Targets ───────────────────────────────────────────────────────────
        let class_ids: Option<Vec<i32>> = items
            .iter()
            .map(|it| it.target.class_id().map(|c| c as i32))
            .collect();
        let targets = match class_ids {
            Some(ids) => TargetBatch::Classes(
                Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &self.device),
            ),
            None => {
                let ages: Vec<f32> = items.iter().map(|it| it.target.as_f32()).collect();
                TargetBatch::Ages(Tensor::<B, 1>::from_floats(ages.as_slice(), &self.device))
            }
        };

        SubjectBatch {
            subject_ids: items.into_iter().map(|it| it.subject_id).collect(),
            volumes,
            features,
            targets,
        }
    }
}
