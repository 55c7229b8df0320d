use std::env;

use serde::{Deserialize, Serialize};

use crate::reasoning::error::{ReasoningError, unavailable};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env {
        var: String,
    },
    InlineToken {
        token: String,
    },
    #[default]
    None,
}

/// Resolves the `Authorization` header value for a backend, if any.
pub fn resolve_auth_header(reference: &CredentialRef) -> Result<Option<String>, ReasoningError> {
    match reference {
        CredentialRef::Env { var } => {
            let token = env::var(var).map_err(|_| {
                unavailable(format!("missing credential environment variable {var}"))
                    .with_retryable(false)
            })?;
            Ok(Some(format!("Bearer {token}")))
        }
        CredentialRef::InlineToken { token } => {
            if token.trim().is_empty() {
                return Err(
                    unavailable("inline credential token cannot be empty").with_retryable(false)
                );
            }
            Ok(Some(format!("Bearer {token}")))
        }
        CredentialRef::None => Ok(None),
    }
}
