//! Typed reads out of a flat hyperparameter map.

use crate::domain::{Hyperparameters, Scalar};
use crate::error::{Error, Result};

/// Reads hyperparameters by name and rejects names nobody asked for.
pub struct ParamReader<'a> {
    model: &'static str,
    params: &'a Hyperparameters,
    known: Vec<&'static str>,
}

impl<'a> ParamReader<'a> {
    pub fn new(model: &'static str, params: &'a Hyperparameters) -> Self {
        Self {
            model,
            params,
            known: Vec::new(),
        }
    }

    fn lookup(&mut self, key: &'static str) -> Option<&'a Scalar> {
        self.known.push(key);
        self.params.get(key)
    }

    fn wrong_type(&self, key: &str, expected: &str, found: &Scalar) -> Error {
        Error::InvalidParameter(format!(
            "{}: `{key}` must be {expected}, got `{found}`",
            self.model
        ))
    }

    pub fn bool_or(&mut self, key: &'static str, default: bool) -> Result<bool> {
        match self.lookup(key) {
            None => Ok(default),
            Some(Scalar::Bool(v)) => Ok(*v),
            Some(other) => Err(self.wrong_type(key, "a boolean", other)),
        }
    }

    pub fn text_or(&mut self, key: &'static str, default: &str) -> Result<String> {
        match self.lookup(key) {
            None => Ok(default.to_string()),
            Some(Scalar::Text(v)) => Ok(v.clone()),
            Some(other) => Err(self.wrong_type(key, "text", other)),
        }
    }

    /// Fails if the map holds a key no read asked for.
    pub fn finish(self) -> Result<()> {
        match self.params.keys().find(|k| !self.known.contains(&k.as_str())) {
            Some(unknown) => Err(Error::InvalidParameter(format!(
                "{}: unknown hyperparameter `{unknown}` (expected one of {:?})",
                self.model, self.known
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_and_unknown_keys_fail() {
        let mut params = Hyperparameters::new();
        params.insert("fit_intercept".into(), false.into());
        params.insert("alpha".into(), 0.5.into());

        let mut reader = ParamReader::new("test", &params);
        assert!(!reader.bool_or("fit_intercept", true).unwrap());
        assert_eq!(reader.text_or("target", "price").unwrap(), "price");
        assert!(matches!(reader.finish(), Err(Error::InvalidParameter(m)) if m.contains("alpha")));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let mut params = Hyperparameters::new();
        params.insert("fit_intercept".into(), "yes".into());
        let mut reader = ParamReader::new("test", &params);
        assert!(reader.bool_or("fit_intercept", true).is_err());
    }
}
