//! # Messages
//!
//! Requests are `{"cmd": "<name>", "parameters": {...}}` objects. They are
//! decoded into the strongly typed [`Command`] enum; a well-formed request that
//! names an unknown command or carries bad parameters fails with
//! [`CommandError`] and is answered with an error instead of dropping the
//! connection.

use broker_core::ResourceStatus;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw request envelope as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub cmd: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Invalid parameters for {cmd}: {source}")]
    InvalidParameters {
        cmd: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A broker command together with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Request", into = "Request")]
pub enum Command {
    StatusList,
    ResourceDetails {
        name: String,
    },
    /// `name` is the requesting user, `tag` the keyword to match.
    Acquire {
        name: String,
        tag: String,
        exclusive: bool,
    },
    /// `name` is the user giving back `resource_name`.
    Release {
        name: String,
        resource_name: String,
        exclusive: bool,
    },
    Shutdown,
}

#[derive(Serialize, Deserialize)]
struct DetailsParams {
    name: String,
}

#[derive(Serialize, Deserialize)]
struct AcquireParams {
    name: String,
    tag: String,
    #[serde(default)]
    exclusive: bool,
}

#[derive(Serialize, Deserialize)]
struct ReleaseParams {
    name: String,
    resource_name: String,
    #[serde(default)]
    exclusive: bool,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StatusList => "status_list",
            Self::ResourceDetails { .. } => "resource_details",
            Self::Acquire { .. } => "acquire",
            Self::Release { .. } => "release",
            Self::Shutdown => "shutdown",
        }
    }

    /// Privileged commands are only accepted from trusted peers.
    pub fn privileged(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

fn params<T: DeserializeOwned>(cmd: &str, parameters: Value) -> Result<T, CommandError> {
    let parameters = match parameters {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(parameters).map_err(|source| CommandError::InvalidParameters {
        cmd: cmd.to_string(),
        source,
    })
}

impl TryFrom<Request> for Command {
    type Error = CommandError;

    fn try_from(request: Request) -> Result<Self, Self::Error> {
        let Request { cmd, parameters } = request;
        let command = match cmd.as_str() {
            "status_list" => Self::StatusList,
            "resource_details" => {
                let p: DetailsParams = params(&cmd, parameters)?;
                Self::ResourceDetails { name: p.name }
            }
            "acquire" => {
                let p: AcquireParams = params(&cmd, parameters)?;
                Self::Acquire {
                    name: p.name,
                    tag: p.tag,
                    exclusive: p.exclusive,
                }
            }
            "release" => {
                let p: ReleaseParams = params(&cmd, parameters)?;
                Self::Release {
                    name: p.name,
                    resource_name: p.resource_name,
                    exclusive: p.exclusive,
                }
            }
            "shutdown" => Self::Shutdown,
            _ => return Err(CommandError::Unknown(cmd)),
        };
        Ok(command)
    }
}

impl From<Command> for Request {
    fn from(command: Command) -> Self {
        let cmd = command.name().to_string();
        let parameters = match command {
            Command::StatusList | Command::Shutdown => Value::Object(Map::new()),
            Command::ResourceDetails { name } => to_value(DetailsParams { name }),
            Command::Acquire { name, tag, exclusive } => to_value(AcquireParams { name, tag, exclusive }),
            Command::Release {
                name,
                resource_name,
                exclusive,
            } => to_value(ReleaseParams {
                name,
                resource_name,
                exclusive,
            }),
        };
        Request { cmd, parameters }
    }
}

// Plain structs of strings and bools always serialize.
fn to_value<T: Serialize>(params: T) -> Value {
    serde_json::to_value(params).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    Ok,
    Error,
}

/// The `resource` field is a bare name for acquire/release answers and a full
/// status object for `resource_details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceField {
    Name(String),
    Details(ResourceStatus),
}

/// Server reply to a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub status: AnswerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<ResourceStatus>>,
}

impl Answer {
    pub fn ok() -> Self {
        Self {
            status: AnswerStatus::Ok,
            message: None,
            resource: None,
            resources: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: AnswerStatus::Error,
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn resource_name(name: impl Into<String>) -> Self {
        Self {
            resource: Some(ResourceField::Name(name.into())),
            ..Self::ok()
        }
    }

    pub fn resource_details(status: ResourceStatus) -> Self {
        Self {
            resource: Some(ResourceField::Details(status)),
            ..Self::ok()
        }
    }

    pub fn resources(list: Vec<ResourceStatus>) -> Self {
        Self {
            resources: Some(list),
            ..Self::ok()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == AnswerStatus::Ok
    }
}
