// ============================================================
// Layer 6 — NumPy Array I/O
// ============================================================
// Ground-truth heatmaps, precomputed room maps and reconstruction
// artifacts are exchanged as 3-D float32 `.npy` files so they can
// be produced and inspected from Python tooling.

use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array3;
use ndarray_npy::{read_npy, write_npy};

use crate::domain::heatmap::Heatmap;

/// Read a [height, width, channels] array.
pub fn read_hwc(path: &Path) -> Result<Heatmap> {
    let array: Array3<f32> = read_npy(path).with_context(|| format!("Cannot read '{}'", path.display()))?;
    Ok(Heatmap::from(array))
}

/// Read a [channels, height, width] array and return it as HWC.
pub fn read_chw_as_hwc(path: &Path) -> Result<Heatmap> {
    let array: Array3<f32> = read_npy(path).with_context(|| format!("Cannot read '{}'", path.display()))?;
    Ok(Heatmap::from_chw(array))
}

/// Write a heatmap as a [height, width, channels] array.
pub fn write_hwc(path: &Path, map: &Heatmap) -> Result<()> {
    write_npy(path, map.array()).with_context(|| format!("Cannot write '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hwc_file_roundtrip_keeps_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.npy");
        let map = Heatmap::from(Array3::from_shape_fn((2, 3, 2), |(y, x, c)| (y * 6 + x * 2 + c) as f32 * 0.5));

        write_hwc(&path, &map).unwrap();
        let back = read_hwc(&path).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_chw_is_transposed_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rooms.npy");
        // 2 channels over a 1x2 image
        let chw = Array3::from_shape_vec((2, 1, 2), vec![1.0f32, 2.0, 10.0, 20.0]).unwrap();
        write_npy(&path, &chw).unwrap();

        let map = read_chw_as_hwc(&path).unwrap();
        assert_eq!(map.shape(), [1, 2, 2]);
        assert_eq!(map.array().iter().copied().collect::<Vec<_>>(), vec![1.0, 10.0, 2.0, 20.0]);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_hwc(&dir.path().join("absent.npy")).unwrap_err();
        assert!(format!("{err:#}").contains("absent.npy"));
    }

    #[test]
    fn test_wrong_rank_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.npy");
        write_npy(&path, &ndarray::Array2::<f32>::zeros((2, 2))).unwrap();
        assert!(read_hwc(&path).is_err());
    }
}
