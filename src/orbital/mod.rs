pub mod elements;
pub mod predictor;

pub use elements::ConicElements;
pub use predictor::{predict, OrbitPoint, OrbitPrediction, OrbitPredictor, PredictorConfig};
