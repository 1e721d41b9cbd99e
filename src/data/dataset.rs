use std::fs;
use std::path::{Path, PathBuf};

use burn::data::dataset::Dataset;
use image::imageops::FilterType;
use ndarray::Array3;

use crate::domain::error::{OrchestratorError, OrchestratorResult};
use crate::domain::heatmap::{Heatmap, HeatmapTargets, Image};
use crate::infra::npy;
use crate::ml::model::HeadChannels;

/// One floor plan. Labelled splits carry targets; test splits carry
/// the path of the source image instead.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorplanSample {
    pub image:   Image,
    pub targets: Option<HeatmapTargets>,
    pub source:  Option<PathBuf>,
}

impl FloorplanSample {
    pub fn labelled(image: Image, targets: HeatmapTargets) -> Self {
        Self { image, targets: Some(targets), source: None }
    }

    pub fn unlabelled(image: Image, source: impl Into<PathBuf>) -> Self {
        Self { image, targets: None, source: Some(source.into()) }
    }

    /// File name without extension, if the sample came from a file.
    pub fn stem(&self) -> Option<String> {
        self.source
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
            .map(str::to_string)
    }
}

/// Whether a split ships ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    Labelled,
    Unlabelled,
}

/// Directory-backed floor-plan split:
///
///   <root>/<split>/images/<stem>.png
///   <root>/<split>/targets/<stem>_corner.npy   (labelled splits only)
///   <root>/<split>/targets/<stem>_icon.npy
///   <root>/<split>/targets/<stem>_room.npy
///
/// Images are resized to `height` x `width` and normalised to
/// `pixel / 255 - 0.5`. Targets must already be at that size and
/// carry exactly the channel count the model declares per head.
pub struct FloorplanDataset {
    split_dir: PathBuf,
    images:    Vec<PathBuf>,
    kind:      SplitKind,
    height:    usize,
    width:     usize,
    heads:     HeadChannels,
}

impl FloorplanDataset {
    pub fn open(
        root:   impl AsRef<Path>,
        split:  &str,
        kind:   SplitKind,
        height: usize,
        width:  usize,
        heads:  HeadChannels,
    ) -> OrchestratorResult<Self> {
        let split_dir  = root.as_ref().join(split);
        let images_dir = split_dir.join("images");

        let entries = fs::read_dir(&images_dir).map_err(|e| OrchestratorError::io(&images_dir, e))?;
        let mut images = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| OrchestratorError::io(&images_dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("png") {
                images.push(path);
            }
        }
        // directory order is platform dependent
        images.sort();

        tracing::debug!("Indexed {} images under '{}'", images.len(), images_dir.display());
        Ok(Self { split_dir, images, kind, height, width, heads })
    }

    /// Load sample `index`, with the reason on failure.
    pub fn try_get(&self, index: usize) -> OrchestratorResult<FloorplanSample> {
        let path = self.images.get(index).ok_or_else(|| OrchestratorError::DataLoad {
            index,
            reason: format!("index out of range ({} samples)", self.images.len()),
        })?;
        let image = self.load_image(index, path)?;

        match self.kind {
            SplitKind::Unlabelled => Ok(FloorplanSample::unlabelled(image, path.clone())),
            SplitKind::Labelled => {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                let targets = HeatmapTargets {
                    corner: self.load_target(index, stem, "corner", self.heads.corner)?,
                    icon:   self.load_target(index, stem, "icon", self.heads.icon)?,
                    room:   self.load_target(index, stem, "room", self.heads.room)?,
                };
                let mut sample = FloorplanSample::labelled(image, targets);
                sample.source = Some(path.clone());
                Ok(sample)
            }
        }
    }

    fn load_image(&self, index: usize, path: &Path) -> OrchestratorResult<Image> {
        let rgb = image::open(path)
            .map_err(|e| OrchestratorError::DataLoad {
                index,
                reason: format!("cannot decode '{}': {e}", path.display()),
            })?
            .to_rgb8();
        let rgb = image::imageops::resize(&rgb, self.width as u32, self.height as u32, FilterType::Triangle);

        let chw = Array3::from_shape_fn((Image::CHANNELS, self.height, self.width), |(c, y, x)| {
            rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0 - 0.5
        });
        Ok(Image { height: self.height, width: self.width, pixels: chw.into_raw_vec() })
    }

    fn load_target(&self, index: usize, stem: &str, head: &str, channels: usize) -> OrchestratorResult<Heatmap> {
        let path = self.split_dir.join("targets").join(format!("{stem}_{head}.npy"));
        let map = npy::read_hwc(&path).map_err(|e| OrchestratorError::DataLoad {
            index,
            reason: format!("{head} target: {e:#}"),
        })?;
        let expected = [self.height, self.width, channels];
        if map.shape() != expected {
            return Err(OrchestratorError::DataLoad {
                index,
                reason: format!("{head} target '{}' has shape {:?}, expected {expected:?}", path.display(), map.shape()),
            });
        }
        Ok(map)
    }
}

impl Dataset<FloorplanSample> for FloorplanDataset {
    fn get(&self, index: usize) -> Option<FloorplanSample> {
        self.try_get(index)
            .map_err(|e| tracing::error!("{e}"))
            .ok()
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}
