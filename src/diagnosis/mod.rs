pub mod correlator;
pub mod error;
pub mod history;
pub mod ports;
pub mod types;

pub use correlator::{DiagnosisVerdict, DiagnosticCorrelator, HypothesisDraft};
pub use error::{DiagnosisError, DiagnosisErrorKind};
pub use history::{NoopHistory, ResolvedIncident, StaticHistory};
pub use ports::HistoricalPatternPort;
pub use types::{
    Diagnosis, DiagnosisSource, DiagnosisStatus, HistoricalMatch, HypothesisSource,
    RootCauseHypothesis,
};
