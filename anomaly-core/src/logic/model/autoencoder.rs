//! Convolutional Autoencoder
//!
//! Input and output are `(batch, T, 1)`. Because there is a single feature,
//! that layout is byte-identical to channels-first `(batch, 1, T)`, which is
//! what the convolutions run on.
//!
//! ```text
//! (B,1,T) ─ enc1 32ch /2 ─ drop ─ enc2 16ch /2 ─ dec1 16ch x2 ─ drop ─ dec2 32ch x2 ─ out 1ch ─ (B,1,T)
//! ```

use std::path::Path;

use candle_core::{DType, Device, Module, ModuleT, Tensor, D};
use candle_nn::{conv1d, Conv1d, Conv1dConfig, Dropout, VarBuilder, VarMap};
use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::logic::error::{Error, Result};

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Window length, must be a multiple of 4 (two stride-2 stages)
    pub time_steps: usize,
    /// Channels after the first encoder stage
    pub outer_filters: usize,
    /// Channels at the bottleneck
    pub inner_filters: usize,
    /// Odd kernel width, "same" padding
    pub kernel_size: usize,
    pub dropout: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            time_steps: crate::constants::DEFAULT_TIME_STEPS,
            outer_filters: 32,
            inner_filters: 16,
            kernel_size: 7,
            dropout: 0.2,
        }
    }
}

impl ModelConfig {
    pub fn with_time_steps(time_steps: usize) -> Self {
        Self {
            time_steps,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_steps == 0 || self.time_steps % 4 != 0 {
            return Err(Error::Config(format!(
                "time_steps must be a positive multiple of 4, got {}",
                self.time_steps
            )));
        }
        if self.kernel_size % 2 == 0 {
            return Err(Error::Config(format!(
                "kernel_size must be odd, got {}",
                self.kernel_size
            )));
        }
        if self.outer_filters == 0 || self.inner_filters == 0 {
            return Err(Error::Config("filter counts must be > 0".to_string()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(Error::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}

// ============================================================================
// LAYERS
// ============================================================================

fn same_conv(
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    vb: VarBuilder,
) -> candle_core::Result<Conv1d> {
    let cfg = Conv1dConfig {
        padding: kernel_size / 2,
        ..Default::default()
    };
    conv1d(in_channels, out_channels, kernel_size, cfg, vb)
}

/// Stride-2 convolution with "same" padding.
/// With an odd kernel and even length the padding is `k/2 - 1` left and `k/2`
/// right, so output `j` is centred on input `2j + 1`: the stride-1 convolution
/// sampled at odd positions.
#[derive(Debug, Clone)]
struct DownConv {
    conv: Conv1d,
}

impl DownConv {
    fn new(in_c: usize, out_c: usize, k: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            conv: same_conv(in_c, out_c, k, vb)?,
        })
    }
}

impl Module for DownConv {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let ys = self.conv.forward(xs)?;
        let (b, c, l) = ys.dims3()?;
        ys.reshape((b, c, l / 2, 2))?
            .narrow(3, 1, 1)?
            .squeeze(3)?
            .contiguous()
    }
}

/// Stride-2 transposed convolution with "same" padding (output length 2L).
/// Zero insertion followed by a same-padded convolution.
#[derive(Debug, Clone)]
struct UpConv {
    conv: Conv1d,
}

impl UpConv {
    fn new(in_c: usize, out_c: usize, k: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            conv: same_conv(in_c, out_c, k, vb)?,
        })
    }
}

impl Module for UpConv {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let (b, c, l) = xs.dims3()?;
        let zeros = xs.zeros_like()?;
        let stuffed = Tensor::stack(&[xs, &zeros], D::Minus1)?.reshape((b, c, l * 2))?;
        self.conv.forward(&stuffed)
    }
}

// ============================================================================
// MODEL
// ============================================================================

pub struct ConvAutoencoder {
    config: ModelConfig,
    varmap: VarMap,
    device: Device,
    enc1: DownConv,
    drop1: Dropout,
    enc2: DownConv,
    dec1: UpConv,
    drop2: Dropout,
    dec2: UpConv,
    out: Conv1d,
}

impl ConvAutoencoder {
    /// Build a freshly initialised model
    pub fn new(config: ModelConfig, device: &Device) -> Result<Self> {
        config.validate()?;

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let k = config.kernel_size;
        let outer = config.outer_filters;
        let inner = config.inner_filters;

        let enc1 = DownConv::new(1, outer, k, vb.pp("enc1"))?;
        let enc2 = DownConv::new(outer, inner, k, vb.pp("enc2"))?;
        let dec1 = UpConv::new(inner, inner, k, vb.pp("dec1"))?;
        let dec2 = UpConv::new(inner, outer, k, vb.pp("dec2"))?;
        let out = same_conv(outer, 1, k, vb.pp("out"))?;

        log::debug!(
            "Autoencoder built: T={}, filters={}/{}, kernel={}, params={}",
            config.time_steps,
            outer,
            inner,
            k,
            varmap.all_vars().iter().map(|v| v.elem_count()).sum::<usize>()
        );

        Ok(Self {
            drop1: Dropout::new(config.dropout),
            drop2: Dropout::new(config.dropout),
            config,
            varmap,
            device: device.clone(),
            enc1,
            enc2,
            dec1,
            dec2,
            out,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn parameter_count(&self) -> usize {
        self.varmap.all_vars().iter().map(|v| v.elem_count()).sum()
    }

    pub fn save_weights(&self, path: &Path) -> Result<()> {
        self.varmap.save(path)?;
        Ok(())
    }

    pub fn load_weights(&mut self, path: &Path) -> Result<()> {
        self.varmap.load(path)?;
        Ok(())
    }

    /// Copy windows `[start, start + len)` into a `(len, 1, T)` tensor
    pub fn batch_tensor(&self, windows: &Array3<f32>, start: usize, len: usize) -> Result<Tensor> {
        let t = self.config.time_steps;
        let batch = windows.slice(ndarray::s![start..start + len, .., ..]);
        let data: Vec<f32> = batch.iter().copied().collect();
        Ok(Tensor::from_vec(data, (len, 1, t), &self.device)?)
    }

    fn check_windows(&self, windows: &Array3<f32>) -> Result<()> {
        let (_, t, f) = windows.dim();
        if t != self.config.time_steps || f != 1 {
            return Err(Error::Config(format!(
                "windows are (_, {}, {}), model expects (_, {}, 1)",
                t, f, self.config.time_steps
            )));
        }
        Ok(())
    }

    /// Run the model in inference mode, batch by batch
    pub fn reconstruct(&self, windows: &Array3<f32>, batch_size: usize) -> Result<Array3<f32>> {
        self.check_windows(windows)?;
        let n = windows.len_of(Axis(0));
        let t = self.config.time_steps;
        let batch_size = batch_size.max(1);

        let mut output = Vec::with_capacity(n * t);
        let mut start = 0;
        while start < n {
            let len = batch_size.min(n - start);
            let xs = self.batch_tensor(windows, start, len)?;
            let ys = self.forward_t(&xs, false)?;
            output.extend(ys.flatten_all()?.to_vec1::<f32>()?);
            start += len;
        }

        Ok(Array3::from_shape_vec((n, t, 1), output)?)
    }

    /// Mean absolute reconstruction error of every window
    pub fn reconstruction_mae(&self, windows: &Array3<f32>, batch_size: usize) -> Result<Vec<f32>> {
        self.check_windows(windows)?;
        let n = windows.len_of(Axis(0));
        let batch_size = batch_size.max(1);

        let mut errors = Vec::with_capacity(n);
        let mut start = 0;
        while start < n {
            let len = batch_size.min(n - start);
            let xs = self.batch_tensor(windows, start, len)?;
            let ys = self.forward_t(&xs, false)?;
            let mae = ys.sub(&xs)?.abs()?.mean(D::Minus1)?.flatten_all()?;
            errors.extend(mae.to_vec1::<f32>()?);
            start += len;
        }

        Ok(errors)
    }
}

impl ModuleT for ConvAutoencoder {
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let (b, c, t) = xs.dims3()?;
        // (B, T, 1) and (B, 1, T) share the same memory layout
        let xs = if c == 1 { xs.clone() } else { xs.reshape((b, 1, c))? };

        let xs = self.enc1.forward(&xs)?.relu()?;
        let xs = self.drop1.forward(&xs, train)?;
        let xs = self.enc2.forward(&xs)?.relu()?;
        let xs = self.dec1.forward(&xs)?.relu()?;
        let xs = self.drop2.forward(&xs, train)?;
        let xs = self.dec2.forward(&xs)?.relu()?;
        let ys = self.out.forward(&xs)?;

        if c == 1 {
            Ok(ys)
        } else {
            ys.reshape((b, c, t))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ModelConfig {
        ModelConfig {
            time_steps: 16,
            outer_filters: 4,
            inner_filters: 2,
            kernel_size: 3,
            dropout: 0.2,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(ModelConfig::default().validate().is_ok());
        assert!(ModelConfig::with_time_steps(18).validate().is_err());
        let even_kernel = ModelConfig {
            kernel_size: 4,
            ..small_config()
        };
        assert!(even_kernel.validate().is_err());
    }

    #[test]
    fn test_forward_keeps_shape() {
        let model = ConvAutoencoder::new(small_config(), &Device::Cpu).unwrap();
        let xs = Tensor::zeros((3, 1, 16), DType::F32, &Device::Cpu).unwrap();

        let ys = model.forward_t(&xs, true).unwrap();
        assert_eq!(ys.dims(), &[3, 1, 16]);

        // Window-major layout (B, T, 1) is accepted too
        let xs = Tensor::zeros((2, 16, 1), DType::F32, &Device::Cpu).unwrap();
        let ys = model.forward_t(&xs, false).unwrap();
        assert_eq!(ys.dims(), &[2, 16, 1]);
    }

    #[test]
    fn test_down_conv_centres_on_odd_inputs() {
        let dev = Device::Cpu;
        // Identity kernel: the output is the sampled input itself
        let weight = Tensor::new(&[[[0f32, 1.0, 0.0]]], &dev).unwrap();
        let cfg = Conv1dConfig {
            padding: 1,
            ..Default::default()
        };
        let down = DownConv {
            conv: Conv1d::new(weight, None, cfg),
        };

        let xs = Tensor::arange(0f32, 8.0, &dev)
            .unwrap()
            .reshape((1, 1, 8))
            .unwrap();
        let ys = down
            .forward(&xs)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();
        assert_eq!(ys, vec![1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_default_architecture_shapes() {
        let model = ConvAutoencoder::new(ModelConfig::default(), &Device::Cpu).unwrap();
        let xs = Tensor::zeros((1, 1, 288), DType::F32, &Device::Cpu).unwrap();
        let ys = model.forward_t(&xs, false).unwrap();
        assert_eq!(ys.dims(), &[1, 1, 288]);

        // 1*32*7+32 + 32*16*7+16 + 16*16*7+16 + 16*32*7+32 + 32*1*7+1
        assert_eq!(model.parameter_count(), 256 + 3600 + 1808 + 3616 + 225);
    }

    #[test]
    fn test_reconstruction_mae_per_window() {
        let model = ConvAutoencoder::new(small_config(), &Device::Cpu).unwrap();
        let windows = Array3::<f32>::zeros((5, 16, 1));

        let recon = model.reconstruct(&windows, 2).unwrap();
        assert_eq!(recon.dim(), (5, 16, 1));

        let mae = model.reconstruction_mae(&windows, 2).unwrap();
        assert_eq!(mae.len(), 5);
        assert!(mae.iter().all(|e| e.is_finite() && *e >= 0.0));

        // Same input, same error in inference mode
        assert!((mae[0] - mae[4]).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_wrong_window_length() {
        let model = ConvAutoencoder::new(small_config(), &Device::Cpu).unwrap();
        let windows = Array3::<f32>::zeros((2, 8, 1));
        assert!(matches!(
            model.reconstruction_mae(&windows, 4),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_save_and_load_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.safetensors");

        let model = ConvAutoencoder::new(small_config(), &Device::Cpu).unwrap();
        model.save_weights(&path).unwrap();

        let windows = Array3::<f32>::from_elem((1, 16, 1), 0.5);
        let before = model.reconstruction_mae(&windows, 1).unwrap();

        let mut restored = ConvAutoencoder::new(small_config(), &Device::Cpu).unwrap();
        restored.load_weights(&path).unwrap();
        let after = restored.reconstruction_mae(&windows, 1).unwrap();

        assert!((before[0] - after[0]).abs() < 1e-6);
    }
}
