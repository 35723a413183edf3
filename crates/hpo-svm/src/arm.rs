//! Arms: one point of the hyperparameter search space.
//!
//! Harnesses usually hand over hyperparameters as strings. `normalize_arm`
//! coerces them once into typed values, and `HyperParams::from_arm` parses
//! the result into the typed schema the model builder consumes. Nothing past
//! this module looks at untyped values.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BenchmarkError, Result};
use crate::models::kernel::Kernel;
use crate::preprocessing::PreprocessingMethod;

/// A single hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

/// Hyperparameter name to value.
pub type Arm = BTreeMap<String, ParamValue>;

/// Integer parse, then float parse, otherwise keep the token as text.
///
/// Floats without a fractional part collapse to integers, so `"4.0"` and
/// `"4"` both become `Int(4)`.
pub fn normalize_value(raw: &str) -> ParamValue {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return ParamValue::Int(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) => collapse_float(v),
        Err(_) => ParamValue::Text(raw.to_string()),
    }
}

fn collapse_float(v: f64) -> ParamValue {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        ParamValue::Int(v as i64)
    } else {
        ParamValue::Float(v)
    }
}

/// Normalize every value of an arm. Never drops an entry and never fails.
pub fn normalize_arm(arm: &Arm) -> Arm {
    arm.iter()
        .map(|(name, value)| {
            let typed = match value {
                ParamValue::Text(s) => normalize_value(s),
                ParamValue::Float(v) => collapse_float(*v),
                ParamValue::Int(v) => ParamValue::Int(*v),
            };
            (name.clone(), typed)
        })
        .collect()
}

/// Build an arm from `(name, raw string)` pairs, normalizing on the way in.
pub fn arm_from_pairs<I, K, V>(pairs: I) -> Arm
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<str>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), normalize_value(v.as_ref())))
        .collect()
}

/// Typed hyperparameters for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    pub preprocessor: PreprocessingMethod,
    pub kernel: Kernel,
    /// Regularization strength.
    pub c: f64,
}

impl HyperParams {
    /// Parse a normalized arm. Only the fields the selected kernel needs are
    /// read; anything else in the arm is ignored.
    pub fn from_arm(arm: &Arm) -> Result<Self> {
        let preprocessor = match require(arm, "preprocessor", "every arm")? {
            ParamValue::Int(i) => PreprocessingMethod::from_index(*i)?,
            ParamValue::Text(s) => s.parse()?,
            ParamValue::Float(v) => {
                return Err(BenchmarkError::UnknownPreprocessor(v.to_string()))
            }
        };

        let kernel_name = match require(arm, "kernel", "every arm")? {
            ParamValue::Int(i) => KernelChoice::from_index(*i)?,
            ParamValue::Text(s) => KernelChoice::from_name(s)?,
            ParamValue::Float(v) => return Err(BenchmarkError::UnknownKernel(v.to_string())),
        };
        let required_by = kernel_name.label();

        let c = positive(arm, "C", "every arm")?;
        let gamma = positive(arm, "gamma", required_by)?;
        let kernel = match kernel_name {
            KernelChoice::Rbf => Kernel::Rbf { gamma },
            KernelChoice::Poly => Kernel::Poly {
                gamma,
                coef0: real(arm, "coef0", required_by)?,
                degree: degree(arm, required_by)?,
            },
            KernelChoice::Sigmoid => Kernel::Sigmoid {
                gamma,
                coef0: real(arm, "coef0", required_by)?,
            },
        };

        Ok(HyperParams {
            preprocessor,
            kernel,
            c,
        })
    }
}

/// Kernel selection before its parameters are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KernelChoice {
    Rbf,
    Poly,
    Sigmoid,
}

impl KernelChoice {
    fn from_index(index: i64) -> Result<Self> {
        match index {
            1 => Ok(KernelChoice::Rbf),
            2 => Ok(KernelChoice::Poly),
            3 => Ok(KernelChoice::Sigmoid),
            other => Err(BenchmarkError::UnknownKernel(other.to_string())),
        }
    }

    fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "rbf" | "gauss" | "gaussian" => Ok(KernelChoice::Rbf),
            "poly" | "polynomial" => Ok(KernelChoice::Poly),
            "sigmoid" => Ok(KernelChoice::Sigmoid),
            _ => Err(BenchmarkError::UnknownKernel(name.to_string())),
        }
    }

    fn label(self) -> &'static str {
        match self {
            KernelChoice::Rbf => "the rbf kernel",
            KernelChoice::Poly => "the poly kernel",
            KernelChoice::Sigmoid => "the sigmoid kernel",
        }
    }
}

fn require<'a>(arm: &'a Arm, name: &str, required_by: &str) -> Result<&'a ParamValue> {
    arm.get(name).ok_or_else(|| BenchmarkError::MissingParameter {
        name: name.to_string(),
        required_by: required_by.to_string(),
    })
}

fn invalid(name: &str, value: &ParamValue, reason: &str) -> BenchmarkError {
    BenchmarkError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn real(arm: &Arm, name: &str, required_by: &str) -> Result<f64> {
    let value = require(arm, name, required_by)?;
    let v = match value {
        ParamValue::Int(i) => *i as f64,
        ParamValue::Float(f) => *f,
        ParamValue::Text(_) => return Err(invalid(name, value, "expected a number")),
    };
    if !v.is_finite() {
        return Err(invalid(name, value, "must be finite"));
    }
    Ok(v)
}

fn positive(arm: &Arm, name: &str, required_by: &str) -> Result<f64> {
    let v = real(arm, name, required_by)?;
    if v <= 0.0 {
        return Err(invalid(name, &ParamValue::Float(v), "must be positive"));
    }
    Ok(v)
}

fn degree(arm: &Arm, required_by: &str) -> Result<u32> {
    let value = require(arm, "degree", required_by)?;
    match value {
        ParamValue::Int(d) if *d >= 1 && *d <= u32::MAX as i64 => Ok(*d as u32),
        ParamValue::Int(_) => Err(invalid("degree", value, "must be a positive integer")),
        _ => Err(invalid("degree", value, "expected an integer")),
    }
}
