// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Typed key/value parameter lookup.
//!
//! Input decks are JSON documents keyed by section name. A section is
//! either a single object or, for indexed sections such as species, an
//! array of objects:
//!
//! ```json
//! {
//!   "sim":  { "dt": 0.1, "tmin": 0.0, "tmax": 10.0 },
//!   "grid": { "ngrid": [64, 1, 1], "xmin": [0, 0, 0], "xmax": [1, 1, 1],
//!             "gridres": ["fixed", "fixed", "fixed"] }
//! }
//! ```

use crate::error::{FusionError, FusionResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Input deck sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Conf,
    Simulation,
    Grid,
    Emf,
    Species,
}

impl Section {
    pub fn key(self) -> &'static str {
        match self {
            Section::Conf => "conf",
            Section::Simulation => "sim",
            Section::Grid => "grid",
            Section::Emf => "emf",
            Section::Species => "species",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Expected shape of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Real,
    Text,
    IntVec,
    RealVec,
    TextVec,
}

impl ValueKind {
    fn describe(self) -> &'static str {
        match self {
            ValueKind::Int => "an integer",
            ValueKind::Real => "a number",
            ValueKind::Text => "a string",
            ValueKind::IntVec => "an array of integers",
            ValueKind::RealVec => "an array of numbers",
            ValueKind::TextVec => "an array of strings",
        }
    }
}

/// A parameter value converted to its requested kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Real(f64),
    Text(String),
    IntVec(Vec<i64>),
    RealVec(Vec<f64>),
    TextVec(Vec<String>),
}

/// Typed parameter lookup by section, section index and key.
///
/// Implementors only provide [`ParameterSource::read_variable`]; the typed
/// helpers unwrap the matching [`ParamValue`] variant.
pub trait ParameterSource {
    fn read_variable(
        &self,
        section: Section,
        index: usize,
        key: &str,
        kind: ValueKind,
    ) -> FusionResult<ParamValue>;

    fn read_int(&self, section: Section, index: usize, key: &str) -> FusionResult<i64> {
        match self.read_variable(section, index, key, ValueKind::Int)? {
            ParamValue::Int(v) => Ok(v),
            _ => Err(type_error(section, key, ValueKind::Int)),
        }
    }

    fn read_real(&self, section: Section, index: usize, key: &str) -> FusionResult<f64> {
        match self.read_variable(section, index, key, ValueKind::Real)? {
            ParamValue::Real(v) => Ok(v),
            _ => Err(type_error(section, key, ValueKind::Real)),
        }
    }

    fn read_text(&self, section: Section, index: usize, key: &str) -> FusionResult<String> {
        match self.read_variable(section, index, key, ValueKind::Text)? {
            ParamValue::Text(v) => Ok(v),
            _ => Err(type_error(section, key, ValueKind::Text)),
        }
    }

    fn read_int_vec(&self, section: Section, index: usize, key: &str) -> FusionResult<Vec<i64>> {
        match self.read_variable(section, index, key, ValueKind::IntVec)? {
            ParamValue::IntVec(v) => Ok(v),
            _ => Err(type_error(section, key, ValueKind::IntVec)),
        }
    }

    fn read_real_vec(&self, section: Section, index: usize, key: &str) -> FusionResult<Vec<f64>> {
        match self.read_variable(section, index, key, ValueKind::RealVec)? {
            ParamValue::RealVec(v) => Ok(v),
            _ => Err(type_error(section, key, ValueKind::RealVec)),
        }
    }

    fn read_text_vec(
        &self,
        section: Section,
        index: usize,
        key: &str,
    ) -> FusionResult<Vec<String>> {
        match self.read_variable(section, index, key, ValueKind::TextVec)? {
            ParamValue::TextVec(v) => Ok(v),
            _ => Err(type_error(section, key, ValueKind::TextVec)),
        }
    }
}

/// Treat a missing key as `default`; every other error propagates.
pub fn or_default<T>(result: FusionResult<T>, default: T) -> FusionResult<T> {
    match result {
        Err(FusionError::MissingParameter { .. }) => Ok(default),
        other => other,
    }
}

fn type_error(section: Section, key: &str, kind: ValueKind) -> FusionError {
    FusionError::ParameterType {
        section: section.to_string(),
        key: key.to_string(),
        expected: kind.describe().to_string(),
    }
}

/// JSON-backed parameter table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterTable {
    sections: BTreeMap<String, Value>,
}

impl ParameterTable {
    /// Load from a JSON input deck.
    pub fn from_file(path: &str) -> FusionResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> FusionResult<Self> {
        let table: Self = serde_json::from_str(json)?;
        Ok(table)
    }

    pub fn from_value(value: Value) -> FusionResult<Self> {
        let table: Self = serde_json::from_value(value)?;
        Ok(table)
    }

    /// Number of entries in an indexed section (0 when absent).
    pub fn section_len(&self, section: Section) -> usize {
        match self.sections.get(section.key()) {
            Some(Value::Array(entries)) => entries.len(),
            Some(_) => 1,
            None => 0,
        }
    }

    fn lookup(&self, section: Section, index: usize, key: &str) -> Option<&Value> {
        let entry = match self.sections.get(section.key())? {
            Value::Array(entries) => entries.get(index)?,
            single if index == 0 => single,
            _ => return None,
        };
        entry.as_object()?.get(key)
    }
}

impl ParameterSource for ParameterTable {
    fn read_variable(
        &self,
        section: Section,
        index: usize,
        key: &str,
        kind: ValueKind,
    ) -> FusionResult<ParamValue> {
        let raw = self
            .lookup(section, index, key)
            .ok_or_else(|| FusionError::MissingParameter {
                section: section.to_string(),
                key: key.to_string(),
            })?;
        convert(raw, kind).ok_or_else(|| type_error(section, key, kind))
    }
}

fn convert(raw: &Value, kind: ValueKind) -> Option<ParamValue> {
    match kind {
        ValueKind::Int => raw.as_i64().map(ParamValue::Int),
        ValueKind::Real => raw.as_f64().map(ParamValue::Real),
        ValueKind::Text => raw.as_str().map(|s| ParamValue::Text(s.to_string())),
        ValueKind::IntVec => raw
            .as_array()?
            .iter()
            .map(Value::as_i64)
            .collect::<Option<Vec<_>>>()
            .map(ParamValue::IntVec),
        ValueKind::RealVec => raw
            .as_array()?
            .iter()
            .map(Value::as_f64)
            .collect::<Option<Vec<_>>>()
            .map(ParamValue::RealVec),
        ValueKind::TextVec => raw
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(ParamValue::TextVec),
    }
}
