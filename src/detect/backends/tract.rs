#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::{imageops, RgbImage};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::classifier::{ClassifierBackend, FrameWindow};
use crate::detect::result::RawDetection;
use crate::detect::yolo::{self, YoloParams};

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

fn load_plan(model_path: &Path, shape: TVec<usize>) -> Result<OnnxPlan> {
    tract_onnx::onnx()
        .model_for_path(model_path)
        .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
        .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), shape))
        .context("failed to set input fact")?
        .into_optimized()
        .context("failed to optimize ONNX model")?
        .into_runnable()
        .context("failed to build runnable ONNX model")
}

/// YOLOv8 detector exported to ONNX, run with tract.
///
/// The input image is stretched to the square model input; boxes are scaled
/// back into the input image's pixels.
pub struct YoloBackend {
    model: OnnxPlan,
    params: YoloParams,
}

impl YoloBackend {
    pub fn new<P: AsRef<Path>>(model_path: P, params: YoloParams) -> Result<Self> {
        let size = params.input_size as usize;
        let model = load_plan(model_path.as_ref(), tvec!(1, 3, size, size))?;
        Ok(Self { model, params })
    }

    fn build_input(&self, image: &RgbImage) -> Tensor {
        let size = self.params.input_size;
        let resized = imageops::resize(image, size, size, imageops::FilterType::Triangle);
        let size = size as usize;
        tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, channel, y, x)| {
            resized.get_pixel(x as u32, y as u32).0[channel] as f32 / 255.0
        })
        .into_tensor()
    }
}

impl DetectorBackend for YoloBackend {
    fn name(&self) -> &'static str {
        "tract-yolo"
    }

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<RawDetection>> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }
        let input = self.build_input(image);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let head = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = head.shape();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(anyhow!("unexpected detection head shape {:?}", shape));
        }
        let (rows, proposals) = (shape[1], shape[2]);
        let data: Vec<f32> = head.iter().copied().collect();
        yolo::decode(
            &data,
            rows,
            proposals,
            image.width(),
            image.height(),
            &self.params,
        )
    }

    fn warm_up(&mut self) -> Result<()> {
        let size = self.params.input_size;
        self.detect(&RgbImage::new(size, size)).map(|_| ())
    }
}

/// Accident classifier (Keras video model exported to ONNX), run with tract.
///
/// Input `[1, window, size, size, 3]`, output a single probability.
pub struct AccidentClassifier {
    model: OnnxPlan,
    window: usize,
    size: usize,
}

impl AccidentClassifier {
    pub fn new<P: AsRef<Path>>(model_path: P, window: usize, size: u32) -> Result<Self> {
        let size = size as usize;
        let model = load_plan(model_path.as_ref(), tvec!(1, window, size, size, 3))?;
        Ok(Self {
            model,
            window,
            size,
        })
    }
}

impl ClassifierBackend for AccidentClassifier {
    fn name(&self) -> &'static str {
        "tract-accident"
    }

    fn classify(&mut self, window: &FrameWindow) -> Result<f32> {
        if window.len() != self.window || window.size() as usize != self.size {
            return Err(anyhow!(
                "classifier expects {} frames of {}px, window holds {} of {}px",
                self.window,
                self.size,
                window.len(),
                window.size()
            ));
        }
        let data: Vec<f32> = window.frames().flat_map(|f| f.iter().copied()).collect();
        let input = tract_ndarray::Array5::from_shape_vec(
            (1, self.window, self.size, self.size, 3),
            data,
        )
        .context("classifier window has the wrong length")?
        .into_tensor();
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        scores
            .iter()
            .next()
            .copied()
            .ok_or_else(|| anyhow!("model produced an empty output"))
    }
}
