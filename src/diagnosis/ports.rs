use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::{
    diagnosis::{error::DiagnosisError, types::HistoricalMatch},
    types::Category,
};

/// Prior incidents with confirmed causes, most relevant first.
#[async_trait]
pub trait HistoricalPatternPort: Send + Sync {
    async fn lookup(
        &self,
        category: Category,
        affected_systems: &BTreeSet<String>,
    ) -> Result<Vec<HistoricalMatch>, DiagnosisError>;
}
