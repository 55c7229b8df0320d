pub mod classifier;
pub mod error;
pub mod impact;

pub use classifier::{Classification, ClassificationSource, ClassificationVerdict, Classifier};
pub use error::{ClassifierError, ClassifierErrorKind};
