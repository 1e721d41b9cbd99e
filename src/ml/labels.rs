// Argmax label maps for visualization snapshots.

use burn::prelude::*;

use crate::domain::traits::LabelMaps;

/// [N, H, W, C] scores → one label per pixel for each sample.
pub fn argmax_labels<B: Backend>(scores: &Tensor<B, 4>) -> Vec<Vec<u32>> {
    let [n, h, w, _] = scores.dims();
    let flat: Vec<i64> = match scores.clone().argmax(3).into_data().convert::<i64>().to_vec::<i64>() {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!("Cannot read label map back: {e:?}");
            return vec![vec![0; h * w]; n];
        }
    };
    flat.chunks((h * w).max(1)).map(|sample| sample.iter().map(|&l| l as u32).collect()).collect()
}

pub fn label_maps<B: Backend>(corner: &Tensor<B, 4>, icon: &Tensor<B, 4>, room: &Tensor<B, 4>) -> LabelMaps {
    LabelMaps {
        corner: argmax_labels(corner),
        icon:   argmax_labels(icon),
        room:   argmax_labels(room),
    }
}
