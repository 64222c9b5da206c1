//! Sensor calibration: user-defined arithmetic mapping raw angular counts to
//! linear stroke displacement.
//!
//! A [`CalibrationMethod`] declares named inputs, an ordered list of
//! intermediate expressions and a result expression; a [`Calibration`] binds
//! the inputs to concrete numbers for one sensor installation. After
//! `prepare`, evaluating a sample is a single program run against a frozen
//! slot environment, so per-sample cost does not depend on how the method
//! was written.

use std::collections::HashMap;
use std::fmt;

use eyre::WrapErr;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CalibrationError, Result};
use crate::expression::{Program, Scope, compile};
use crate::linkage::Linkage;

// Slot layout of every calibration environment. Inputs follow the standard
// names, intermediates follow the inputs.
const PI_SLOT: usize = 0;
const SAMPLE_SLOT: usize = 1;
const MAX_STROKE_SLOT: usize = 2;
const MAX_TRAVEL_SLOT: usize = 3;
const FIRST_FREE_SLOT: usize = 4;

/// The parameter block of a calibration method, as stored and exchanged in
/// JSON. `intermediates` is an ordered mapping: evaluation order is
/// insertion order, and each entry may reference inputs and all prior
/// intermediates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct MethodParams {
    inputs: Vec<String>,
    #[serde(
        serialize_with = "ser_intermediates",
        deserialize_with = "de_intermediates"
    )]
    intermediates: Vec<(String, String)>,
    expression: String,
}

fn ser_intermediates<S: Serializer>(
    entries: &[(String, String)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (name, expr) in entries {
        map.serialize_entry(name, expr)?;
    }
    map.end()
}

// JSON objects lose ordering in a plain map type; deserialize the
// `intermediates` object straight into a vector of pairs instead.
fn de_intermediates<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<(String, String)>, D::Error> {
    struct OrderedPairs;

    impl<'de> Visitor<'de> for OrderedPairs {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of intermediate name to expression")
        }

        fn visit_map<A: MapAccess<'de>>(
            self,
            mut access: A,
        ) -> std::result::Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some(entry) = access.next_entry::<String, String>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedPairs)
}

#[derive(Debug, Clone)]
struct CompiledMethod {
    scope: Scope,
    intermediates: Vec<Program>,
    result: Program,
}

/// A reusable calibration recipe: the expression programs without any
/// concrete input values bound.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationMethod {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    params: MethodParams,
    #[serde(skip)]
    compiled: Option<CompiledMethod>,
}

impl CalibrationMethod {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            ..Self::default()
        }
    }

    /// Populate inputs, intermediates and the result expression from their
    /// JSON form.
    pub fn process_raw(&mut self, json: &str) -> Result<()> {
        self.params = serde_json::from_str(json)
            .wrap_err_with(|| format!("parsing data of calibration method `{}`", self.name))?;
        self.compiled = None;
        Ok(())
    }

    /// Serialize the parameter block back to its JSON form, preserving
    /// intermediate order.
    pub fn dump_raw(&self) -> Result<String> {
        serde_json::to_string(&self.params)
            .wrap_err_with(|| format!("serializing calibration method `{}`", self.name))
    }

    /// Compile every intermediate and the result expression. Compilation
    /// runs against a dummy environment, so unknown names and arity errors
    /// surface here rather than during a ride upload.
    pub fn prepare(&mut self) -> Result<()> {
        let mut scope = Scope::default();
        for name in ["pi", "sample", "MAX_STROKE", "MAX_TRAVEL"] {
            scope.push(name).map_err(|e| compile_error(name, e))?;
        }
        for input in &self.params.inputs {
            scope
                .push(input)
                .map_err(|e| compile_error(input, e))?;
        }

        let mut intermediates = Vec::with_capacity(self.params.intermediates.len());
        for (name, expr) in &self.params.intermediates {
            // Compile before defining the name: an intermediate may use
            // inputs and earlier intermediates, never itself or later ones.
            let program = compile(expr, &scope).map_err(|e| compile_error(name, e))?;
            intermediates.push(program);
            scope.push(name).map_err(|e| compile_error(name, e))?;
        }

        let result = compile(&self.params.expression, &scope)
            .map_err(|e| compile_error(&self.name, e))?;

        self.compiled = Some(CompiledMethod {
            scope,
            intermediates,
            result,
        });
        Ok(())
    }

    fn compiled(&self) -> std::result::Result<&CompiledMethod, CalibrationError> {
        self.compiled.as_ref().ok_or_else(|| CalibrationError::Runtime {
            name: self.name.clone(),
            reason: "method has not been prepared".to_string(),
        })
    }
}

fn compile_error(name: &str, source: crate::error::ExpressionError) -> eyre::Report {
    eyre::Report::new(CalibrationError::Compile {
        name: name.to_string(),
        source,
    })
}

/// A calibration method bound to the numeric inputs of one sensor setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Calibration {
    #[serde(default)]
    pub name: String,
    pub method: CalibrationMethod,
    pub inputs: HashMap<String, f64>,
    #[serde(skip)]
    env: Option<Vec<f64>>,
}

impl Calibration {
    pub fn new(name: &str, method: CalibrationMethod, inputs: HashMap<String, f64>) -> Self {
        Self {
            name: name.to_string(),
            method,
            inputs,
            env: None,
        }
    }

    /// Populate the input mapping from its JSON form (`{"name": value, …}`).
    pub fn process_raw_inputs(&mut self, json: &str) -> Result<()> {
        self.inputs = serde_json::from_str(json)
            .wrap_err_with(|| format!("parsing inputs of calibration `{}`", self.name))?;
        self.env = None;
        Ok(())
    }

    pub fn dump_raw_inputs(&self) -> Result<String> {
        serde_json::to_string(&self.inputs)
            .wrap_err_with(|| format!("serializing inputs of calibration `{}`", self.name))
    }

    /// Build the evaluation environment: standard vocabulary, the user
    /// inputs (missing ones bind to zero), the stroke/travel bounds, then
    /// the intermediates in declaration order.
    pub fn prepare(&mut self, max_stroke: f64, max_travel: f64) -> Result<()> {
        self.method.prepare()?;
        let compiled = self.method.compiled().map_err(eyre::Report::new)?;

        let mut env = vec![0.0; compiled.scope.len()];
        env[PI_SLOT] = std::f64::consts::PI;
        env[MAX_STROKE_SLOT] = max_stroke;
        env[MAX_TRAVEL_SLOT] = max_travel;
        for (i, input) in self.method.params.inputs.iter().enumerate() {
            env[FIRST_FREE_SLOT + i] = self.inputs.get(input).copied().unwrap_or(0.0);
        }

        let first_intermediate = FIRST_FREE_SLOT + self.method.params.inputs.len();
        for (i, program) in compiled.intermediates.iter().enumerate() {
            env[first_intermediate + i] = program.eval(&env, SAMPLE_SLOT, 0.0);
        }

        self.env = Some(env);
        Ok(())
    }

    /// Map one raw sample to a linear displacement. Non-finite results are
    /// deliberately passed through; the session clamp absorbs them.
    pub fn evaluate(&self, sample: f64) -> Result<f64> {
        let compiled = self.method.compiled().map_err(eyre::Report::new)?;
        let env = self.env.as_ref().ok_or_else(|| {
            eyre::Report::new(CalibrationError::Runtime {
                name: self.name.clone(),
                reason: "calibration has not been prepared".to_string(),
            })
        })?;
        Ok(compiled.result.eval(env, SAMPLE_SLOT, sample))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CalibrationPair {
    front: Option<Calibration>,
    rear: Option<Calibration>,
}

/// Parse a `{"front": …, "rear": …}` calibration document and prepare each
/// present side against the linkage's stroke and travel bounds.
pub fn load_calibrations(
    json: &str,
    linkage: &Linkage,
) -> Result<(Option<Calibration>, Option<Calibration>)> {
    let mut pair: CalibrationPair =
        serde_json::from_str(json).wrap_err("parsing calibration pair document")?;
    if let Some(front) = pair.front.as_mut() {
        front.prepare(linkage.max_front_stroke, linkage.max_front_travel)?;
    }
    if let Some(rear) = pair.rear.as_mut() {
        rear.prepare(linkage.max_rear_stroke, linkage.max_rear_travel)?;
    }
    Ok((pair.front, pair.rear))
}
