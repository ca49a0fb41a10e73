pub mod detector;
pub mod evaluator;
pub mod generator;
pub mod sweep;
pub mod synthesizer;

pub use detector::ExtremeEventDetector;
pub use evaluator::ConditionEvaluator;
pub use generator::ResilientTextGenerator;
pub use sweep::SweepOrchestrator;
pub use synthesizer::AlertSynthesizer;
