pub mod config;
pub mod controls;
pub mod crop;
pub mod dataset;
pub mod detector;
pub mod gesture_buffer;
pub mod gesture_classifier;
pub mod labels;
pub mod logging;
pub mod mode;
pub mod predictor;
pub mod session;
pub mod source;
pub mod types;
