//! `WasmSimulation`: the simulation engine exposed to JavaScript.

use crate::model::BridgeModel;
use anyhow::bail;
use num_complex::Complex64;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use spectral_core::models::Model;
use spectral_core::{IntegrationStats, Simulation, SimulationResult, SolverMethod};
use wasm_bindgen::prelude::*;

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

pub(crate) fn complex_state(re: &[f64], im: &[f64]) -> anyhow::Result<Vec<Complex64>> {
    if !im.is_empty() && im.len() != re.len() {
        bail!(
            "Imaginary part has {} samples but real part has {}.",
            im.len(),
            re.len()
        );
    }
    Ok(re
        .iter()
        .enumerate()
        .map(|(i, &a)| Complex64::new(a, im.get(i).copied().unwrap_or(0.0)))
        .collect())
}

/// Result payload with complex rows split into real and imaginary matrices.
#[derive(Debug, Serialize)]
pub(crate) struct SimulationPayload {
    model: &'static str,
    times: Vec<f64>,
    x: Vec<f64>,
    re: Vec<Vec<f64>>,
    im: Vec<Vec<f64>>,
    stats: IntegrationStats,
}

impl SimulationPayload {
    pub(crate) fn new(model: &'static str, result: SimulationResult) -> Self {
        Self {
            model,
            re: result.real_parts(),
            im: result.imag_parts(),
            times: result.times,
            x: result.x,
            stats: result.stats,
        }
    }
}

#[wasm_bindgen]
pub struct WasmSimulation {
    inner: Simulation<BridgeModel>,
}

#[wasm_bindgen]
impl WasmSimulation {
    #[wasm_bindgen(constructor)]
    pub fn new(model_name: &str, speed: f64, focusing: f64) -> Result<WasmSimulation, JsValue> {
        console_error_panic_hook::set_once();
        let model = BridgeModel::from_name(model_name, speed, focusing).map_err(js_error)?;
        Ok(WasmSimulation {
            inner: Simulation::new(model),
        })
    }

    pub fn model_name(&self) -> String {
        self.inner.model().name().to_string()
    }

    pub fn define_space(&mut self, a: f64, b: f64, n: u32) -> Result<(), JsValue> {
        self.inner
            .define_space(a, b, n as usize)
            .map(|_| ())
            .map_err(js_error)
    }

    pub fn define_time(&mut self, t0: f64, t1: f64, samples: u32) -> Result<(), JsValue> {
        self.inner
            .define_time(t0, t1, samples as usize)
            .map(|_| ())
            .map_err(js_error)
    }

    /// Samples `f` at each grid coordinate. `f` returns either a number or a
    /// `[re, im]` pair.
    pub fn define_initial_condition(&mut self, f: &js_sys::Function) -> Result<(), JsValue> {
        let coordinates = self
            .inner
            .grid()
            .map(|grid| grid.coordinates().to_vec())
            .unwrap_or_default();
        let mut values = Vec::with_capacity(coordinates.len());
        for x in coordinates {
            let value = f.call1(&JsValue::NULL, &JsValue::from_f64(x))?;
            values.push(complex_from_js(&value)?);
        }
        self.inner.define_initial_state(values).map_err(js_error)
    }

    /// Pre-sampled initial data; `im` may be empty for a real field.
    pub fn define_initial_state(&mut self, re: Vec<f64>, im: Vec<f64>) -> Result<(), JsValue> {
        let state = complex_state(&re, &im).map_err(js_error)?;
        self.inner.define_initial_state(state).map_err(js_error)
    }

    pub fn set_potential(&mut self, samples: Vec<f64>) -> Result<(), JsValue> {
        self.inner.model_mut().set_potential(samples).map_err(js_error)
    }

    pub fn set_diffusion(&mut self, samples: Vec<f64>) -> Result<(), JsValue> {
        self.inner.model_mut().set_diffusion(samples).map_err(js_error)
    }

    pub fn set_tolerances(&mut self, rtol: f64, atol: f64) -> Result<(), JsValue> {
        let settings = spectral_core::SolverSettings {
            rtol,
            atol,
            ..*self.inner.settings()
        };
        self.inner.set_solver_settings(settings).map_err(js_error)
    }

    /// Switches to fixed-step RK4; a non-positive `dt` restores adaptive stepping.
    pub fn set_fixed_step(&mut self, dt: f64) -> Result<(), JsValue> {
        let method = if dt > 0.0 {
            SolverMethod::Rk4 { dt }
        } else {
            SolverMethod::DormandPrince45
        };
        let settings = spectral_core::SolverSettings {
            method,
            ..*self.inner.settings()
        };
        self.inner.set_solver_settings(settings).map_err(js_error)
    }

    pub fn coordinates(&self) -> Vec<f64> {
        self.inner
            .grid()
            .map(|grid| grid.coordinates().to_vec())
            .unwrap_or_default()
    }

    pub fn times(&self) -> Vec<f64> {
        self.inner
            .time_grid()
            .map(|time| time.times().to_vec())
            .unwrap_or_default()
    }

    pub fn integrate(&mut self) -> Result<JsValue, JsValue> {
        let result = self
            .inner
            .integrate()
            .map_err(|e| JsValue::from_str(&format!("Simulation failed: {}", e)))?;
        let payload = SimulationPayload::new(self.inner.model().name(), result);
        to_value(&payload).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

fn complex_from_js(value: &JsValue) -> Result<Complex64, JsValue> {
    if let Some(re) = value.as_f64() {
        return Ok(Complex64::new(re, 0.0));
    }
    if js_sys::Array::is_array(value) {
        let pair = js_sys::Array::from(value);
        if let (Some(re), Some(im)) = (pair.get(0).as_f64(), pair.get(1).as_f64()) {
            return Ok(Complex64::new(re, im));
        }
    }
    Err(JsValue::from_str(
        "Initial condition must return a number or a [re, im] pair.",
    ))
}
