mod adapter;
mod backend;
mod backends;
mod classes;
mod classifier;
mod result;
mod select;
pub mod yolo;

pub use adapter::{detect_full_frame, detect_in_region};
pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::{AccidentClassifier, YoloBackend};
pub use classes::{ClassKind, ClassMap, AMBULANCE_CLASS, CAR_CLASS};
pub use classifier::{
    ClassifierBackend, FrameWindow, StubClassifier, CLASSIFIER_INPUT_SIZE, CLASSIFIER_WINDOW,
};
pub use result::{BoundingBox, Detection, RawDetection};
pub use select::{select_classifier, select_detector};
