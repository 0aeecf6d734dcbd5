use fable_task::{Output, Params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CapabilityError;

/// Deserialize an action's parameters into its typed input.
pub(crate) fn parse<T: DeserializeOwned>(params: Params) -> Result<T, CapabilityError> {
  serde_json::from_value(Value::Object(params))
    .map_err(|e| CapabilityError::invalid_param("params", e.to_string()))
}

/// Serialize a typed result into an output map.
pub(crate) fn into_output<T: Serialize>(value: &T) -> Result<Output, CapabilityError> {
  match serde_json::to_value(value) {
    Ok(Value::Object(map)) => Ok(map),
    Ok(other) => Err(CapabilityError::InvalidOutput {
      message: format!("expected an object, got {other}"),
    }),
    Err(e) => Err(CapabilityError::InvalidOutput {
      message: e.to_string(),
    }),
  }
}

/// Parse an action name against a capability's action table.
macro_rules! actions {
  ($name:ident, $kind:expr, { $($variant:ident => $action:literal),+ $(,)? }) => {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum $name {
      $($variant),+
    }

    impl $name {
      pub const NAMES: &'static [&'static str] = &[$($action),+];

      pub fn parse(action: &str) -> Result<Self, $crate::error::DispatchError> {
        match action {
          $($action => Ok($name::$variant),)+
          other => Err($crate::error::DispatchError::UnknownAction {
            capability: $kind,
            action: other.to_string(),
          }),
        }
      }
    }
  };
}

pub(crate) use actions;
