use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};

use crate::domain::error::OrchestratorError;

/// Channel counts of the three heads, fixed when the model is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadChannels {
    pub corner: usize,
    pub icon:   usize,
    pub room:   usize,
}

/// Raw logits of one forward pass, each [batch, height, width, channels].
#[derive(Debug, Clone)]
pub struct HeatmapLogits<B: Backend> {
    pub corner: Tensor<B, 4>,
    pub icon:   Tensor<B, 4>,
    pub room:   Tensor<B, 4>,
}

impl<B: Backend> HeatmapLogits<B> {
    /// Fails if any head's channel axis disagrees with `declared`.
    pub fn check_channels(&self, declared: &HeadChannels) -> Result<(), OrchestratorError> {
        let heads = [
            ("corner", &self.corner, declared.corner),
            ("icon", &self.icon, declared.icon),
            ("room", &self.room, declared.room),
        ];
        for (head, logits, expected) in heads {
            let found = logits.dims()[3];
            if found != expected {
                return Err(OrchestratorError::HeadChannelMismatch { head, declared: expected, found });
            }
        }
        Ok(())
    }
}

/// The model seam the orchestrators drive.
pub trait HeatmapModel<B: Backend>: Module<B> {
    /// images: [batch, 3, height, width] → logits per head.
    fn forward(&self, images: Tensor<B, 4>) -> HeatmapLogits<B>;

    fn head_channels(&self) -> HeadChannels;
}

// ─── Baseline network ────────────────────────────────────────────────────────
// A plain same-resolution conv trunk with three 1x1 heads. Enough to
// drive the pipeline end to end; swap in a real architecture by
// implementing HeatmapModel.

#[derive(Config, Debug)]
pub struct FloorplanNetConfig {
    pub corner_channels: usize,
    pub icon_channels:   usize,
    pub room_channels:   usize,
    #[config(default = 32)]
    pub hidden:          usize,
    #[config(default = 3)]
    pub depth:           usize,
}

impl FloorplanNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FloorplanNet<B> {
        let conv3 = |input: usize, output: usize| -> Conv2d<B> {
            Conv2dConfig::new([input, output], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device)
        };
        let head = |output: usize| -> Conv2d<B> { Conv2dConfig::new([self.hidden, output], [1, 1]).init(device) };

        let mut trunk = vec![conv3(3, self.hidden)];
        for _ in 1..self.depth.max(1) {
            trunk.push(conv3(self.hidden, self.hidden));
        }

        FloorplanNet {
            trunk,
            corner_head:     head(self.corner_channels),
            icon_head:       head(self.icon_channels),
            room_head:       head(self.room_channels),
            corner_channels: self.corner_channels,
            icon_channels:   self.icon_channels,
            room_channels:   self.room_channels,
        }
    }
}

#[derive(Module, Debug)]
pub struct FloorplanNet<B: Backend> {
    pub trunk:           Vec<Conv2d<B>>,
    pub corner_head:     Conv2d<B>,
    pub icon_head:       Conv2d<B>,
    pub room_head:       Conv2d<B>,
    pub corner_channels: usize,
    pub icon_channels:   usize,
    pub room_channels:   usize,
}

impl<B: Backend> HeatmapModel<B> for FloorplanNet<B> {
    fn forward(&self, images: Tensor<B, 4>) -> HeatmapLogits<B> {
        let mut x = images;
        for conv in &self.trunk {
            x = relu(conv.forward(x));
        }
        // heads are NCHW, the heatmap contract is NHWC
        HeatmapLogits {
            corner: self.corner_head.forward(x.clone()).permute([0, 2, 3, 1]),
            icon:   self.icon_head.forward(x.clone()).permute([0, 2, 3, 1]),
            room:   self.room_head.forward(x).permute([0, 2, 3, 1]),
        }
    }

    fn head_channels(&self) -> HeadChannels {
        HeadChannels {
            corner: self.corner_channels,
            icon:   self.icon_channels,
            room:   self.room_channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_forward_shapes_are_nhwc() {
        let device = Default::default();
        let model: FloorplanNet<TestBackend> = FloorplanNetConfig::new(25, 4, 6)
            .with_hidden(8)
            .with_depth(2)
            .init(&device);

        let images = Tensor::<TestBackend, 4>::zeros([2, 3, 5, 7], &device);
        let logits = model.forward(images);

        assert_eq!(logits.corner.dims(), [2, 5, 7, 25]);
        assert_eq!(logits.icon.dims(), [2, 5, 7, 4]);
        assert_eq!(logits.room.dims(), [2, 5, 7, 6]);
        assert!(logits.check_channels(&model.head_channels()).is_ok());
    }

    #[test]
    fn test_check_channels_names_the_head() {
        let device = Default::default();
        let model: FloorplanNet<TestBackend> = FloorplanNetConfig::new(25, 4, 6).with_hidden(4).init(&device);
        let logits = model.forward(Tensor::zeros([1, 3, 2, 2], &device));

        let declared = HeadChannels { corner: 25, icon: 5, room: 6 };
        match logits.check_channels(&declared) {
            Err(OrchestratorError::HeadChannelMismatch { head, declared, found }) => {
                assert_eq!(head, "icon");
                assert_eq!((declared, found), (5, 4));
            }
            other => panic!("expected HeadChannelMismatch, got {other:?}"),
        }
    }
}
