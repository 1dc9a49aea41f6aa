// src/command/params.rs

//! Typed extraction of command parameters from the task list.
//!
//! Every command validates its parameters eagerly through a [`ParamTable`]:
//! missing required keys, wrongly-typed values, and unknown keys all fail
//! construction, before any remote side effect.

use std::collections::BTreeMap;

use toml::Value;

use crate::errors::{Error, Result};

#[derive(Debug, Clone)]
pub struct ParamTable {
    command: String,
    values: BTreeMap<String, Value>,
}

impl ParamTable {
    pub fn new(command: impl Into<String>, values: BTreeMap<String, Value>) -> Self {
        Self {
            command: command.into(),
            values,
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> Error {
        Error::CommandValidation {
            command: self.command.clone(),
            reason: reason.into(),
        }
    }

    /// Reject any key outside the command's accepted set.
    pub fn deny_unknown(&self, accepted: &[&str]) -> Result<()> {
        for key in self.values.keys() {
            if !accepted.contains(&key.as_str()) {
                return Err(self.invalid(format!(
                    "unknown parameter '{key}' (accepted: {})",
                    accepted.join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn require_str(&self, key: &str) -> Result<String> {
        match self.values.get(key) {
            Some(v) => v
                .as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| self.invalid(format!("parameter '{key}' must be a string"))),
            None => Err(self.invalid(format!("missing required parameter '{key}'"))),
        }
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<String>> {
        match self.values.get(key) {
            Some(v) => v
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| self.invalid(format!("parameter '{key}' must be a string"))),
            None => Ok(None),
        }
    }

    pub fn require_u64(&self, key: &str) -> Result<u64> {
        match self.values.get(key) {
            Some(v) => match v.as_integer() {
                Some(n) if n >= 0 => Ok(n as u64),
                Some(_) => Err(self.invalid(format!("parameter '{key}' must not be negative"))),
                None => Err(self.invalid(format!("parameter '{key}' must be an integer"))),
            },
            None => Err(self.invalid(format!("missing required parameter '{key}'"))),
        }
    }

    pub fn opt_u64(&self, key: &str) -> Result<Option<u64>> {
        if self.values.contains_key(key) {
            self.require_u64(key).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn opt_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.values.get(key) {
            Some(v) => v
                .as_bool()
                .ok_or_else(|| self.invalid(format!("parameter '{key}' must be a boolean"))),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, Value)]) -> ParamTable {
        let values = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        ParamTable::new("upload", values)
    }

    #[test]
    fn missing_required_key_fails() {
        let t = table(&[]);
        assert!(t.require_str("source").is_err());
    }

    #[test]
    fn wrong_type_fails() {
        let t = table(&[("source", Value::Integer(3))]);
        assert!(t.require_str("source").is_err());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let t = table(&[("sauce", Value::String("x".into()))]);
        assert!(t.deny_unknown(&["source", "destination"]).is_err());
        assert!(t.deny_unknown(&["sauce"]).is_ok());
    }

    #[test]
    fn negative_integers_are_rejected() {
        let t = table(&[("keepversions", Value::Integer(-1))]);
        assert!(t.require_u64("keepversions").is_err());
    }

    #[test]
    fn opt_bool_defaults_when_absent() {
        let t = table(&[]);
        assert!(!t.opt_bool("clobber", false).unwrap());
        assert!(t.opt_bool("clobber", true).unwrap());
    }
}
