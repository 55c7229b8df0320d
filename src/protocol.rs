use serde::Deserialize;
use serde_json::Value;

use crate::intake::{IncidentReport, IntakeError};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Report(IncidentReport),
    Audit { incident_id: String },
    Exit,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: WireMessageType,
    #[serde(default)]
    report: Option<Value>,
    #[serde(default)]
    incident_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireMessageType {
    Report,
    Audit,
    Exit,
}

#[derive(Debug)]
pub enum ProtocolError {
    Malformed(serde_json::Error),
    MissingField(&'static str),
    UnexpectedField(&'static str),
    InvalidReport(IntakeError),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::Malformed(err) => write!(f, "malformed message: {err}"),
            ProtocolError::MissingField(field) => write!(f, "missing field `{field}`"),
            ProtocolError::UnexpectedField(field) => write!(f, "unexpected field `{field}`"),
            ProtocolError::InvalidReport(err) => write!(f, "invalid report: {err}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

pub fn parse_client_message(line: &str) -> Result<ClientMessage, ProtocolError> {
    let wire: WireMessage = serde_json::from_str(line).map_err(ProtocolError::Malformed)?;
    let message = match wire.kind {
        WireMessageType::Report => {
            if wire.incident_id.is_some() {
                return Err(ProtocolError::UnexpectedField("incident_id"));
            }
            let value = wire.report.ok_or(ProtocolError::MissingField("report"))?;
            let report = IncidentReport::from_value(value).map_err(ProtocolError::InvalidReport)?;
            ClientMessage::Report(report)
        }
        WireMessageType::Audit => {
            if wire.report.is_some() {
                return Err(ProtocolError::UnexpectedField("report"));
            }
            let incident_id = wire
                .incident_id
                .filter(|id| !id.trim().is_empty())
                .ok_or(ProtocolError::MissingField("incident_id"))?;
            ClientMessage::Audit { incident_id }
        }
        WireMessageType::Exit => {
            if wire.report.is_some() {
                return Err(ProtocolError::UnexpectedField("report"));
            }
            if wire.incident_id.is_some() {
                return Err(ProtocolError::UnexpectedField("incident_id"));
            }
            ClientMessage::Exit
        }
    };
    Ok(message)
}
