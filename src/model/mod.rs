// Model subsystem — acquisition and inference behind swap-ready traits.
//
// The Classifier trait defines the inference interface; OnnxClassifier
// implements it with a local ONNX model. ModelLoader abstracts the
// acquisition sequence so the detector can be exercised in tests without
// touching the network.

pub mod download;
pub mod onnx;
pub mod traits;
