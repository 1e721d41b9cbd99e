// ============================================================
// Layer 4 — Floor-plan Batcher
// ============================================================
// Implements Burn's Batcher trait to stack prefetched samples
// into device tensors on the primary thread.
//
//   images  [N, 3, H, W]   channel-first, as convolutions expect
//   targets [N, H, W, C]   per head, channel-last like the model's
//                          heatmap outputs
//
// The dataset indices and file stems travel with the batch so
// evaluation can name its outputs after the samples they came from.
//
// `Batcher::batch` cannot fail, so shapes are checked earlier with
// `check_stackable` on the loader threads.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::FloorplanSample;
use crate::domain::error::{OrchestratorError, OrchestratorResult};
use crate::domain::heatmap::{Heatmap, Image};

/// A sample together with its position in the dataset.
#[derive(Debug, Clone)]
pub struct IndexedSample {
    pub index:  usize,
    pub sample: FloorplanSample,
}

#[derive(Debug, Clone)]
pub struct TargetBatch<B: Backend> {
    pub corner: Tensor<B, 4>,
    pub icon:   Tensor<B, 4>,
    pub room:   Tensor<B, 4>,
}

#[derive(Debug, Clone)]
pub struct FloorplanBatch<B: Backend> {
    pub images:  Tensor<B, 4>,
    /// Present only when every sample in the batch is labelled.
    pub targets: Option<TargetBatch<B>>,
    pub indices: Vec<usize>,
    /// Source file stem per sample, when it came from a file.
    pub stems:   Vec<Option<String>>,
}

/// Every sample must match the first one's image size, and every
/// labelled sample its target shapes, or the stacked tensors would
/// not line up.
pub fn check_stackable(items: &[IndexedSample]) -> OrchestratorResult<()> {
    let Some(first) = items.first() else {
        return Ok(());
    };
    let image_size = |s: &IndexedSample| (s.sample.image.height, s.sample.image.width);
    let target_shapes = |s: &IndexedSample| {
        s.sample.targets.as_ref().map(|t| [t.corner.shape(), t.icon.shape(), t.room.shape()])
    };

    for item in &items[1..] {
        if image_size(item) != image_size(first) {
            return Err(OrchestratorError::DataLoad {
                index:  item.index,
                reason: format!("image is {:?}, batch started with {:?}", image_size(item), image_size(first)),
            });
        }
        if let (Some(found), Some(expected)) = (target_shapes(item), target_shapes(first)) {
            if found != expected {
                return Err(OrchestratorError::DataLoad {
                    index:  item.index,
                    reason: format!("target shapes {found:?} differ from {expected:?} earlier in the batch"),
                });
            }
        }
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct FloorplanBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> FloorplanBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn stack_images(&self, images: &[&Image]) -> Tensor<B, 4> {
        let n = images.len();
        let (h, w) = (images[0].height, images[0].width);
        let flat: Vec<f32> = images.iter().flat_map(|img| img.pixels.iter().copied()).collect();
        Tensor::from_data(TensorData::new(flat, [n, Image::CHANNELS, h, w]), &self.device)
    }

    fn stack_heatmaps(&self, maps: &[&Heatmap]) -> Tensor<B, 4> {
        let n = maps.len();
        let [h, w, c] = maps[0].shape();
        let flat: Vec<f32> = maps.iter().flat_map(|m| m.array().iter().copied()).collect();
        Tensor::from_data(TensorData::new(flat, [n, h, w, c]), &self.device)
    }
}

impl<B: Backend> Batcher<IndexedSample, FloorplanBatch<B>> for FloorplanBatcher<B> {
    /// All samples must share one image size and one target shape
    /// per head; the dataset resizes everything to the configured size.
    fn batch(&self, items: Vec<IndexedSample>) -> FloorplanBatch<B> {
        let images: Vec<&Image> = items.iter().map(|it| &it.sample.image).collect();
        let images = self.stack_images(&images);

        let all_labelled = items.iter().all(|it| it.sample.targets.is_some());
        let targets = if all_labelled {
            let targets: Vec<_> = items.iter().filter_map(|it| it.sample.targets.as_ref()).collect();
            let corner: Vec<&Heatmap> = targets.iter().map(|t| &t.corner).collect();
            let icon:   Vec<&Heatmap> = targets.iter().map(|t| &t.icon).collect();
            let room:   Vec<&Heatmap> = targets.iter().map(|t| &t.room).collect();
            Some(TargetBatch {
                corner: self.stack_heatmaps(&corner),
                icon:   self.stack_heatmaps(&icon),
                room:   self.stack_heatmaps(&room),
            })
        } else {
            None
        };

        FloorplanBatch {
            images,
            targets,
            indices: items.iter().map(|it| it.index).collect(),
            stems:   items.iter().map(|it| it.sample.stem()).collect(),
        }
    }
}
