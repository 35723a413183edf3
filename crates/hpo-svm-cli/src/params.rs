//! Parsing of the arm passed on the command line as `-name value` pairs.
use anyhow::{bail, Result};

use hpo_svm::{Arm, ParamValue};

/// Build an arm from `-name value` tokens, e.g. `-C 1.0 -gamma 0.01`.
///
/// Values are kept as strings (single quotes around a value are dropped);
/// numeric normalization happens in the evaluator. A name given twice keeps
/// its last value.
pub fn parse_params<S: AsRef<str>>(tokens: &[S]) -> Result<Arm> {
    let mut arm = Arm::new();
    let mut iter = tokens.iter().map(|t| t.as_ref());
    while let Some(token) = iter.next() {
        let name = match token.strip_prefix('-') {
            Some(name) if !name.is_empty() => name.trim_start_matches('-'),
            _ => bail!("expected a parameter name like -C, found {:?}", token),
        };
        let Some(value) = iter.next() else {
            bail!("parameter -{} has no value", name);
        };
        let value = value.trim_matches('\'');
        arm.insert(name.to_string(), ParamValue::from(value));
    }
    Ok(arm)
}
