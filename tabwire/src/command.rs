//! Command and parameter binding types.
//!
//! A [`Command`] is one parameterized unit of work bound to a named backing
//! connection. It may carry several indexed value-sets, executing the same
//! command once per set within one round trip.
//!
//! A [`ParamBinding`] may declare a chain target, asking the remote executor to
//! copy the resolved parameter value into a parameter of another command in the
//! same request. The client only encodes the edge, it never resolves it.
use std::collections::BTreeMap;

use crate::{TypedValue, common::reason_error, value::ValueKind};

/// Parameter name to value mapping for one execution of a command.
pub type ValueSet = BTreeMap<String, TypedValue>;

/// How the remote executor interpret the command text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandKind {
    /// Free text statement.
    #[default]
    Text = 0,
    /// Stored procedure name.
    StoredProcedure = 1,
    /// Table name, select everything.
    TableDirect = 2,
}

impl CommandKind {
    /// Returns the wire code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Lookup kind by its wire code.
    pub const fn from_code(code: u64) -> Option<CommandKind> {
        match code {
            0 => Some(Self::Text),
            1 => Some(Self::StoredProcedure),
            2 => Some(Self::TableDirect),
            _ => None,
        }
    }
}

/// Target of a chaining edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainTarget {
    pub command: String,
    pub parameter: String,
}

/// Declared parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamBinding {
    kind: ValueKind,
    size: Option<u32>,
    target: Option<ChainTarget>,
}

impl ParamBinding {
    /// Declare parameter with its value kind.
    pub fn new(kind: ValueKind) -> ParamBinding {
        Self { kind, size: None, target: None }
    }

    /// Set declared size.
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Pipe the resolved value of this parameter into `parameter` of `command`.
    pub fn chain_to(mut self, command: impl Into<String>, parameter: impl Into<String>) -> Self {
        self.target = Some(ChainTarget { command: command.into(), parameter: parameter.into() });
        self
    }

    /// Returns the declared value kind.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns the declared size.
    pub fn declared_size(&self) -> Option<u32> {
        self.size
    }

    /// Returns the chain target.
    pub fn target(&self) -> Option<&ChainTarget> {
        self.target.as_ref()
    }
}

/// Parameterized unit of work.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Command {
    connection: String,
    text: String,
    kind: CommandKind,
    params: BTreeMap<String, ParamBinding>,
    value_sets: BTreeMap<usize, ValueSet>,
}

impl Command {
    /// Create free text command run against `connection`.
    pub fn new(connection: impl Into<String>, text: impl Into<String>) -> Command {
        Self {
            connection: connection.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Create stored procedure command run against `connection`.
    pub fn procedure(connection: impl Into<String>, name: impl Into<String>) -> Command {
        Self::new(connection, name).kind(CommandKind::StoredProcedure)
    }

    /// Set command kind.
    pub fn kind(mut self, kind: CommandKind) -> Self {
        self.kind = kind;
        self
    }

    /// Declare parameter.
    pub fn param(mut self, name: impl Into<String>, binding: ParamBinding) -> Self {
        self.params.insert(name.into(), binding);
        self
    }

    /// Append value-set at the next index.
    ///
    /// # Panics
    ///
    /// Panics if the last value-set index is `usize::MAX`, see [`Command::push_values`].
    pub fn values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<TypedValue>,
    {
        if let Err(err) = self.push_values(values) {
            panic!("{err}");
        }
        self
    }

    /// Append value-set at the next index and returns that index.
    ///
    /// Returns error if the last value-set index is `usize::MAX`.
    pub fn push_values<I, K, V>(&mut self, values: I) -> Result<usize, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<TypedValue>,
    {
        let index = self
            .next_index()
            .ok_or_else(|| ConfigError::new("value-set index overflow"))?;
        self.value_sets.insert(index, values.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        Ok(index)
    }

    /// Set value of one parameter in the value-set at `index`.
    pub fn set_value(&mut self, index: usize, name: impl Into<String>, value: impl Into<TypedValue>) {
        self.value_sets.entry(index).or_default().insert(name.into(), value.into());
    }

    /// Replace the whole value-set at `index`.
    pub fn insert_value_set(&mut self, index: usize, set: ValueSet) -> Option<ValueSet> {
        self.value_sets.insert(index, set)
    }

    /// Returns connection name.
    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// Returns command text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns command kind.
    pub fn command_kind(&self) -> CommandKind {
        self.kind
    }

    /// Returns declared parameters.
    pub fn params(&self) -> &BTreeMap<String, ParamBinding> {
        &self.params
    }

    /// Returns indexed value-sets.
    pub fn value_sets(&self) -> &BTreeMap<usize, ValueSet> {
        &self.value_sets
    }

    /// Returns value-set at `index`.
    pub fn value_set(&self, index: usize) -> Option<&ValueSet> {
        self.value_sets.get(&index)
    }

    fn next_index(&self) -> Option<usize> {
        match self.value_sets.last_key_value() {
            Some((i, _)) => i.checked_add(1),
            None => Some(0),
        }
    }
}

/// Check that every chain edge points at a command present in `commands`.
pub fn validate_chains(commands: &BTreeMap<String, Command>) -> Result<(), ConfigError> {
    for (name, command) in commands {
        for (param, binding) in &command.params {
            let Some(target) = &binding.target else {
                continue;
            };
            if !commands.contains_key(&target.command) {
                return Err(ConfigError::new(format!(
                    "parameter {param:?} of command {name:?} chains to unknown command {:?}",
                    target.command
                )));
            }
            if target.parameter.is_empty() {
                return Err(ConfigError::new(format!(
                    "parameter {param:?} of command {name:?} chains to an unnamed parameter"
                )));
            }
        }
    }
    Ok(())
}

reason_error! {
    /// An error when request or client configuration is invalid.
    pub struct ConfigError("configuration error");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn batch_indexes() {
        let cmd = Command::procedure("main", "usp_insert_user")
            .param("name", ParamBinding::new(ValueKind::String).size(50))
            .values([("name", "a")])
            .values([("name", "b")])
            .values([("name", "c")]);

        assert_eq!(cmd.command_kind(), CommandKind::StoredProcedure);
        assert_eq!(cmd.value_sets().keys().copied().collect::<Vec<_>>(), [0, 1, 2]);
        assert_eq!(cmd.value_set(2).unwrap()["name"], TypedValue::from("c"));
    }

    #[test]
    fn set_value_fills_sparse_index() {
        let mut cmd = Command::new("main", "select 1");
        cmd.set_value(4, "id", 1i32);
        assert_eq!(cmd.value_sets().len(), 1);
        assert_eq!(cmd.next_index(), Some(5));
    }

    #[test]
    fn append_after_last_index_is_rejected() {
        let mut cmd = Command::new("main", "select 1");
        cmd.set_value(usize::MAX, "id", 1i32);

        let err = cmd.push_values([("id", 2i32)]).unwrap_err();
        assert!(err.reason().contains("overflow"));
        assert_eq!(cmd.value_sets().len(), 1);
        assert_eq!(cmd.value_set(usize::MAX).unwrap()["id"], TypedValue::Int32(1));

        let mut cmd = Command::new("main", "select 1").values([("id", 1i32)]);
        assert_eq!(cmd.push_values([("id", 2i32)]).unwrap(), 1);
    }

    #[test]
    #[should_panic = "value-set index overflow"]
    fn builder_append_overflow_panics() {
        let mut cmd = Command::new("main", "select 1");
        cmd.set_value(usize::MAX, "id", 1i32);
        let _ = cmd.values([("id", 2i32)]);
    }

    #[test]
    fn chain_to_missing_command() {
        let mut commands = BTreeMap::new();
        commands.insert(
            "insert".to_string(),
            Command::procedure("main", "usp_insert")
                .param("id", ParamBinding::new(ValueKind::Int32).chain_to("detail", "parent_id")),
        );

        let err = validate_chains(&commands).unwrap_err();
        assert!(err.reason().contains("detail"));

        commands.insert("detail".to_string(), Command::procedure("main", "usp_detail"));
        validate_chains(&commands).unwrap();
    }
}
