//! Service request and response messages.
use std::{collections::BTreeMap, fmt};

use crate::{
    DataSet, Result,
    command::{Command, ConfigError, validate_chains},
};

/// Top level request, a named service call carrying named commands.
///
/// All commands share one transaction scope, either every command succeeds or
/// none are committed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceRequest {
    service: String,
    transaction: String,
    token: String,
    commands: BTreeMap<String, Command>,
}

impl ServiceRequest {
    /// Create request for `service`.
    pub fn new(service: impl Into<String>) -> ServiceRequest {
        Self { service: service.into(), ..Default::default() }
    }

    /// Set transaction scope identifier.
    pub fn transaction(mut self, scope: impl Into<String>) -> Self {
        self.transaction = scope.into();
        self
    }

    /// Set authentication token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Add named command.
    pub fn command(mut self, name: impl Into<String>, command: Command) -> Self {
        self.commands.insert(name.into(), command);
        self
    }

    /// Add named command, returns the previous command with the same name.
    pub fn insert_command(&mut self, name: impl Into<String>, command: Command) -> Option<Command> {
        self.commands.insert(name.into(), command)
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn transaction_scope(&self) -> &str {
        &self.transaction
    }

    pub fn auth_token(&self) -> &str {
        &self.token
    }

    pub fn commands(&self) -> &BTreeMap<String, Command> {
        &self.commands
    }

    /// Check the command graph before anything is sent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_chains(&self.commands)
    }
}

/// Response status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    #[default]
    Ok = 0,
    Empty = 1,
    Error = 2,
}

impl Status {
    /// Returns the wire code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Lookup status by its wire code.
    pub const fn from_code(code: u64) -> Option<Status> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::Empty),
            2 => Some(Self::Error),
            _ => None,
        }
    }
}

/// Response of a service call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceResponse {
    pub status: Status,
    pub message: Option<String>,
    pub data: Option<DataSet>,
}

impl ServiceResponse {
    /// Create successful response.
    pub fn ok(data: Option<DataSet>) -> ServiceResponse {
        Self { status: Status::Ok, message: None, data }
    }

    /// Map status into result.
    ///
    /// - [`Status::Ok`] returns the dataset, which may be absent for non query command
    /// - [`Status::Empty`] returns [`None`]
    /// - [`Status::Error`] returns [`ServiceError`]
    pub fn into_result(self) -> Result<Option<DataSet>, ServiceError> {
        match self.status {
            Status::Ok => Ok(self.data),
            Status::Empty => Ok(None),
            Status::Error => Err(ServiceError {
                message: self.message.unwrap_or_default(),
            }),
        }
    }
}

/// Encrypted login credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserInfo {
    pub status: Status,
    pub message: Option<String>,
    /// Token issued for the authenticated user.
    pub token: Option<String>,
    pub data: Option<DataSet>,
}

/// Remote executor reported an error status.
pub struct ServiceError {
    message: String,
}

impl ServiceError {
    /// Returns the remote message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for ServiceError { }

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service error: {}", self.message)
    }
}

impl fmt::Debug for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_mapping() {
        let data = DataSet::new("r");
        assert_eq!(ServiceResponse::ok(Some(data.clone())).into_result().unwrap(), Some(data));
        assert_eq!(ServiceResponse::ok(None).into_result().unwrap(), None);

        let empty = ServiceResponse { status: Status::Empty, ..Default::default() };
        assert_eq!(empty.into_result().unwrap(), None);

        let error = ServiceResponse {
            status: Status::Error,
            message: Some("deadlock".into()),
            data: None,
        };
        assert_eq!(error.into_result().unwrap_err().message(), "deadlock");
    }

    #[test]
    fn status_codes() {
        for status in [Status::Ok, Status::Empty, Status::Error] {
            assert_eq!(Status::from_code(status.code() as u64), Some(status));
        }
        assert_eq!(Status::from_code(3), None);
    }
}
