use std::path::Path;

use anyhow::{bail, Result};

use super::backend::DetectorBackend;
use super::backends::StubBackend;
use super::classifier::{ClassifierBackend, StubClassifier};
use super::yolo::YoloParams;
use crate::ingest::is_synthetic;

/// Pick the detector for an optional model path.
///
/// Without a model, only a synthetic `stub://` source gets the seeded stub
/// backend. Real cameras and video files require a model.
pub fn select_detector(
    model: Option<&Path>,
    params: YoloParams,
    seed: u64,
    source_path: &str,
) -> Result<Box<dyn DetectorBackend>> {
    match model {
        Some(model) => load_detector(model, params),
        None if is_synthetic(source_path) => {
            log::warn!("no detector model configured; using synthetic stub detections");
            Ok(Box::new(StubBackend::seeded(seed)))
        }
        None => bail!(
            "detector model required for source {} (set --model or LANE_SENSOR_MODEL)",
            source_path
        ),
    }
}

#[cfg(feature = "backend-tract")]
fn load_detector(model: &Path, params: YoloParams) -> Result<Box<dyn DetectorBackend>> {
    let mut backend = super::backends::YoloBackend::new(model, params)?;
    backend.warm_up()?;
    log::info!("loaded detector model {}", model.display());
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn load_detector(model: &Path, _params: YoloParams) -> Result<Box<dyn DetectorBackend>> {
    anyhow::bail!(
        "detector model {} requires the backend-tract feature",
        model.display()
    )
}

/// Pick the accident classifier for an optional model path.
pub fn select_classifier(
    model: Option<&Path>,
    window: usize,
    input_size: u32,
) -> Result<Box<dyn ClassifierBackend>> {
    let Some(model) = model else {
        log::warn!("no classifier model configured; every window scores 0.0");
        return Ok(Box::new(StubClassifier::scripted(Vec::new())));
    };
    load_classifier(model, window, input_size)
}

#[cfg(feature = "backend-tract")]
fn load_classifier(
    model: &Path,
    window: usize,
    input_size: u32,
) -> Result<Box<dyn ClassifierBackend>> {
    let classifier = super::backends::AccidentClassifier::new(model, window, input_size)?;
    log::info!("loaded classifier model {}", model.display());
    Ok(Box::new(classifier))
}

#[cfg(not(feature = "backend-tract"))]
fn load_classifier(
    model: &Path,
    _window: usize,
    _input_size: u32,
) -> Result<Box<dyn ClassifierBackend>> {
    anyhow::bail!(
        "classifier model {} requires the backend-tract feature",
        model.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_selects_stub_for_synthetic_sources() {
        let backend = select_detector(None, YoloParams::default(), 1, "stub://front").unwrap();
        assert_eq!(backend.name(), "stub");
        let classifier = select_classifier(None, 20, 128).unwrap();
        assert_eq!(classifier.name(), "stub");
    }

    #[test]
    fn missing_model_is_rejected_for_real_sources() {
        for path in ["/dev/video0", "junction.mp4"] {
            let err = match select_detector(None, YoloParams::default(), 1, path) {
                Ok(_) => panic!("{} accepted without a model", path),
                Err(err) => err,
            };
            assert!(err.to_string().contains("detector model required"));
        }
    }

    #[cfg(not(feature = "backend-tract"))]
    #[test]
    fn model_without_backend_is_an_error() {
        let selected = select_detector(
            Some(Path::new("best.onnx")),
            YoloParams::default(),
            1,
            "stub://front",
        );
        assert!(selected.is_err());
    }
}
