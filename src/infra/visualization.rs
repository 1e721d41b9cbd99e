// ============================================================
// Layer 6 — Visualization Sink
// ============================================================
// Debug snapshots leave the training thread through a bounded
// channel. `submit` uses try_send, so a slow or stalled writer
// costs the training loop nothing: requests are dropped and
// counted instead.
//
//   ChannelSink ── try_send ──► bounded queue ──► PNG writer thread
//                                                  <dir>/<name>_<head>.png
//                                                  (+ _gt for ground truth)

use std::{
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use image::{Rgb, RgbImage};

use crate::domain::traits::{LabelMaps, VisualizationRequest, VisualizationSink};

pub struct ChannelSink {
    tx:      Sender<VisualizationRequest>,
    dropped: Arc<AtomicUsize>,
}

impl ChannelSink {
    /// A sink plus the receiving end of its queue.
    pub fn new(capacity: usize) -> (Self, Receiver<VisualizationRequest>) {
        let (tx, rx) = bounded(capacity.max(1));
        (Self { tx, dropped: Arc::new(AtomicUsize::new(0)) }, rx)
    }

    /// A sink whose requests are rendered to PNG files in `dir` by a
    /// background thread. The thread exits once the sink is dropped.
    pub fn to_png_dir(dir: impl Into<PathBuf>, capacity: usize) -> (Self, JoinHandle<()>) {
        let dir = dir.into();
        let (sink, rx) = Self::new(capacity);
        let handle = thread::spawn(move || {
            for request in rx.iter() {
                if let Err(e) = write_request(&dir, &request) {
                    tracing::warn!("Visualization '{}' not written: {e:#}", request.name);
                }
            }
        });
        (sink, handle)
    }

    /// Requests discarded because the queue was full.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl VisualizationSink for ChannelSink {
    fn submit(&self, request: VisualizationRequest) {
        match self.tx.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Visualization queue full, dropped '{}'", request.name);
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

fn write_request(dir: &std::path::Path, request: &VisualizationRequest) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;
    write_maps(dir, &request.name, "", request, &request.predicted)?;
    if let Some(gt) = &request.ground_truth {
        write_maps(dir, &request.name, "_gt", request, gt)?;
    }
    Ok(())
}

fn write_maps(
    dir:     &std::path::Path,
    name:    &str,
    suffix:  &str,
    request: &VisualizationRequest,
    maps:    &LabelMaps,
) -> anyhow::Result<()> {
    let heads = [("corner", &maps.corner), ("icon", &maps.icon), ("room", &maps.room)];
    for (head, per_sample) in heads {
        for (i, labels) in per_sample.iter().enumerate() {
            let img = render(labels, request.width, request.height);
            img.save(dir.join(format!("{name}_{i}_{head}{suffix}.png")))?;
        }
    }
    Ok(())
}

/// Label map to an RGB image, one fixed colour per label.
/// Label 0 is background and stays black.
fn render(labels: &[u32], width: usize, height: usize) -> RgbImage {
    RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let label = labels.get(y as usize * width + x as usize).copied().unwrap_or(0);
        palette(label)
    })
}

fn palette(label: u32) -> Rgb<u8> {
    if label == 0 {
        return Rgb([0, 0, 0]);
    }
    // spread consecutive labels far apart in each channel
    let spread = |k: u32| ((label.wrapping_mul(k)) % 200 + 55) as u8;
    Rgb([spread(67), spread(131), spread(199)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> VisualizationRequest {
        VisualizationRequest {
            name:         name.to_string(),
            height:       2,
            width:        3,
            predicted:    LabelMaps {
                corner: vec![vec![0, 1, 2, 3, 4, 5]],
                icon:   vec![vec![0; 6]],
                room:   vec![vec![1; 6]],
            },
            ground_truth: None,
            loss:         None,
        }
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let (sink, rx) = ChannelSink::new(1);
        sink.submit(request("a"));
        sink.submit(request("b"));
        sink.submit(request("c"));

        assert_eq!(sink.dropped(), 2);
        assert_eq!(rx.try_recv().unwrap().name, "a");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_png_writer_renders_each_head() {
        let tmp = tempfile::tempdir().unwrap();
        let (sink, handle) = ChannelSink::to_png_dir(tmp.path(), 4);
        let mut req = request("train_e0_s0");
        req.ground_truth = Some(req.predicted.clone());
        sink.submit(req);
        drop(sink);
        handle.join().unwrap();

        for file in ["train_e0_s0_0_corner.png", "train_e0_s0_0_room.png", "train_e0_s0_0_icon_gt.png"] {
            assert!(tmp.path().join(file).exists(), "{file} missing");
        }
        let img = image::open(tmp.path().join("train_e0_s0_0_corner.png")).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(*img.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_ne!(*img.get_pixel(1, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_palette_distinguishes_neighbours() {
        assert_ne!(palette(1), palette(2));
        assert_ne!(palette(2), palette(3));
    }
}
