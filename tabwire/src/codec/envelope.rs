use serde_json::{Map, Value};

use super::{Compact, DecodePolicy, Object, ProtocolError, keys, mismatch};
use crate::{
    DataSet, TypedValue,
    command::{Command, CommandKind, ParamBinding, ValueSet},
    envelope::{LoginRequest, ServiceRequest, ServiceResponse, Status, UserInfo},
    value::ValueKind,
};

impl Compact for ParamBinding {
    fn to_compact(&self) -> Value {
        let mut map = Map::with_capacity(4);
        map.insert(keys::KIND.into(), self.kind().code().into());
        if let Some(size) = self.declared_size() {
            map.insert(keys::BINDING_SIZE.into(), size.into());
        }
        if let Some(target) = self.target() {
            map.insert(keys::BINDING_TARGET_COMMAND.into(), target.command.as_str().into());
            map.insert(keys::BINDING_TARGET_PARAM.into(), target.parameter.as_str().into());
        }
        Value::Object(map)
    }

    fn from_compact(value: &Value, policy: DecodePolicy) -> Result<Self, ProtocolError> {
        let obj = Object::new(value, "binding")?;
        obj.known_keys(
            &[keys::KIND, keys::BINDING_SIZE, keys::BINDING_TARGET_COMMAND, keys::BINDING_TARGET_PARAM],
            policy,
        )?;

        let code = obj.u64(keys::KIND)?;
        let kind = ValueKind::from_code(code)
            .ok_or_else(|| ProtocolError::new(format!("unknown value kind {code} in binding")))?;
        let mut binding = ParamBinding::new(kind);

        if let Some(size) = obj.opt_u64(keys::BINDING_SIZE)? {
            let size = u32::try_from(size)
                .map_err(|_| ProtocolError::new(format!("binding size {size} out of range")))?;
            binding = binding.size(size);
        }

        match (
            obj.opt_str(keys::BINDING_TARGET_COMMAND)?,
            obj.opt_str(keys::BINDING_TARGET_PARAM)?,
        ) {
            (Some(command), Some(parameter)) => binding = binding.chain_to(command, parameter),
            (None, None) => {}
            _ => return Err(ProtocolError::new("chain target requires both command and parameter")),
        }

        Ok(binding)
    }
}

impl Compact for Command {
    fn to_compact(&self) -> Value {
        let params = self
            .params()
            .iter()
            .map(|(name, binding)| (name.clone(), binding.to_compact()))
            .collect::<Map<_, _>>();

        let value_sets = self
            .value_sets()
            .iter()
            .map(|(index, set)| {
                let set = set.iter().map(|(name, value)| (name.clone(), value.to_compact())).collect();
                (itoa::Buffer::new().format(*index).to_owned(), Value::Object(set))
            })
            .collect::<Map<_, _>>();

        let mut map = Map::with_capacity(5);
        map.insert(keys::COMMAND_CONNECTION.into(), self.connection().into());
        map.insert(keys::COMMAND_TEXT.into(), self.text().into());
        map.insert(keys::COMMAND_KIND.into(), self.command_kind().code().into());
        if !params.is_empty() {
            map.insert(keys::COMMAND_PARAMS.into(), Value::Object(params));
        }
        if !value_sets.is_empty() {
            map.insert(keys::COMMAND_VALUE_SETS.into(), Value::Object(value_sets));
        }
        Value::Object(map)
    }

    fn from_compact(value: &Value, policy: DecodePolicy) -> Result<Self, ProtocolError> {
        let obj = Object::new(value, "command")?;
        obj.known_keys(
            &[
                keys::COMMAND_CONNECTION,
                keys::COMMAND_TEXT,
                keys::COMMAND_KIND,
                keys::COMMAND_PARAMS,
                keys::COMMAND_VALUE_SETS,
            ],
            policy,
        )?;

        let kind = match obj.opt_u64(keys::COMMAND_KIND)? {
            None => CommandKind::default(),
            Some(code) => CommandKind::from_code(code)
                .ok_or_else(|| ProtocolError::new(format!("unknown command kind {code}")))?,
        };

        let mut command = Command::new(obj.str(keys::COMMAND_CONNECTION)?, obj.str(keys::COMMAND_TEXT)?).kind(kind);

        if obj.opt(keys::COMMAND_PARAMS).is_some() {
            for (name, binding) in obj.object(keys::COMMAND_PARAMS)? {
                command = command.param(name, ParamBinding::from_compact(binding, policy)?);
            }
        }

        if obj.opt(keys::COMMAND_VALUE_SETS).is_some() {
            for (index, set) in obj.object(keys::COMMAND_VALUE_SETS)? {
                let set = match set {
                    Value::Object(set) => set
                        .iter()
                        .map(|(name, value)| Ok::<_, ProtocolError>((name.clone(), TypedValue::from_compact(value, policy)?)))
                        .collect::<Result<ValueSet, ProtocolError>>()?,
                    other => return Err(mismatch(index, "object", other)),
                };
                command.insert_value_set(parse_index(index)?, set);
            }
        }

        Ok(command)
    }
}

/// Value-set index must be canonical decimal, `"0"`, `"1"`, ..., no sign or leading zero.
fn parse_index(key: &str) -> Result<usize, ProtocolError> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));

    canonical
        .then(|| key.parse().ok())
        .flatten()
        .ok_or_else(|| ProtocolError::new(format!("invalid value-set index {key:?}")))
}

impl Compact for ServiceRequest {
    fn to_compact(&self) -> Value {
        let commands = self
            .commands()
            .iter()
            .map(|(name, command)| (name.clone(), command.to_compact()))
            .collect::<Map<_, _>>();

        let mut map = Map::with_capacity(4);
        map.insert(keys::REQUEST_SERVICE.into(), self.service().into());
        if !self.transaction_scope().is_empty() {
            map.insert(keys::REQUEST_TRANSACTION.into(), self.transaction_scope().into());
        }
        if !self.auth_token().is_empty() {
            map.insert(keys::REQUEST_TOKEN.into(), self.auth_token().into());
        }
        map.insert(keys::REQUEST_COMMANDS.into(), Value::Object(commands));
        Value::Object(map)
    }

    fn from_compact(value: &Value, policy: DecodePolicy) -> Result<Self, ProtocolError> {
        let obj = Object::new(value, "request")?;
        obj.known_keys(
            &[keys::REQUEST_SERVICE, keys::REQUEST_TRANSACTION, keys::REQUEST_TOKEN, keys::REQUEST_COMMANDS],
            policy,
        )?;

        let mut request = ServiceRequest::new(obj.str(keys::REQUEST_SERVICE)?)
            .transaction(obj.opt_str(keys::REQUEST_TRANSACTION)?.unwrap_or_default())
            .token(obj.opt_str(keys::REQUEST_TOKEN)?.unwrap_or_default());

        if obj.opt(keys::REQUEST_COMMANDS).is_some() {
            for (name, command) in obj.object(keys::REQUEST_COMMANDS)? {
                request.insert_command(name, Command::from_compact(command, policy)?);
            }
        }

        Ok(request)
    }
}

fn status(obj: &Object) -> Result<Status, ProtocolError> {
    let code = obj.u64(keys::RESPONSE_STATUS)?;
    Status::from_code(code).ok_or_else(|| ProtocolError::new(format!("unknown status {code}")))
}

fn dataset(obj: &Object, policy: DecodePolicy) -> Result<Option<DataSet>, ProtocolError> {
    obj.opt(keys::RESPONSE_DATA)
        .map(|data| DataSet::from_compact(data, policy))
        .transpose()
}

fn insert_common(map: &mut Map<String, Value>, status: Status, message: Option<&str>, data: Option<&DataSet>) {
    map.insert(keys::RESPONSE_STATUS.into(), status.code().into());
    if let Some(message) = message {
        map.insert(keys::RESPONSE_MESSAGE.into(), message.into());
    }
    if let Some(data) = data {
        map.insert(keys::RESPONSE_DATA.into(), data.to_compact());
    }
}

impl Compact for ServiceResponse {
    fn to_compact(&self) -> Value {
        let mut map = Map::with_capacity(3);
        insert_common(&mut map, self.status, self.message.as_deref(), self.data.as_ref());
        Value::Object(map)
    }

    fn from_compact(value: &Value, policy: DecodePolicy) -> Result<Self, ProtocolError> {
        let obj = Object::new(value, "response")?;
        obj.known_keys(&[keys::RESPONSE_STATUS, keys::RESPONSE_MESSAGE, keys::RESPONSE_DATA], policy)?;

        Ok(ServiceResponse {
            status: status(&obj)?,
            message: obj.opt_str(keys::RESPONSE_MESSAGE)?.map(Into::into),
            data: dataset(&obj, policy)?,
        })
    }
}

impl Compact for UserInfo {
    fn to_compact(&self) -> Value {
        let mut map = Map::with_capacity(4);
        insert_common(&mut map, self.status, self.message.as_deref(), self.data.as_ref());
        if let Some(token) = &self.token {
            map.insert(keys::RESPONSE_TOKEN.into(), token.as_str().into());
        }
        Value::Object(map)
    }

    fn from_compact(value: &Value, policy: DecodePolicy) -> Result<Self, ProtocolError> {
        let obj = Object::new(value, "user info")?;
        obj.known_keys(
            &[keys::RESPONSE_STATUS, keys::RESPONSE_MESSAGE, keys::RESPONSE_TOKEN, keys::RESPONSE_DATA],
            policy,
        )?;

        Ok(UserInfo {
            status: status(&obj)?,
            message: obj.opt_str(keys::RESPONSE_MESSAGE)?.map(Into::into),
            token: obj.opt_str(keys::RESPONSE_TOKEN)?.map(Into::into),
            data: dataset(&obj, policy)?,
        })
    }
}

impl Compact for LoginRequest {
    fn to_compact(&self) -> Value {
        let mut map = Map::with_capacity(2);
        map.insert(keys::LOGIN_EMAIL.into(), self.email.as_str().into());
        map.insert(keys::LOGIN_PASSWORD.into(), self.password.as_str().into());
        Value::Object(map)
    }

    fn from_compact(value: &Value, policy: DecodePolicy) -> Result<Self, ProtocolError> {
        let obj = Object::new(value, "login")?;
        obj.known_keys(&[keys::LOGIN_EMAIL, keys::LOGIN_PASSWORD], policy)?;

        Ok(LoginRequest {
            email: obj.str(keys::LOGIN_EMAIL)?.into(),
            password: obj.str(keys::LOGIN_PASSWORD)?.into(),
        })
    }
}
