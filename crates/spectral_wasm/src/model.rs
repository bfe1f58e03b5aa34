//! Name-based model selection for the JS side.

use anyhow::{anyhow, bail};
use num_complex::Complex64;
use spectral_core::grid::Grid;
use spectral_core::models::{
    Burgers, Diffusion, HilbertEquation, Heat, KdV, Model, Nls, OneWayWave, Schrodinger,
};
use spectral_core::Result;

/// Every model the bridge can construct from a name.
pub(crate) enum BridgeModel {
    OneWayWave(OneWayWave),
    Heat(Heat),
    Diffusion(Diffusion),
    Schrodinger(Schrodinger),
    Nls(Nls),
    Burgers(Burgers),
    Hilbert(HilbertEquation),
    KdV(KdV),
}

pub(crate) const MODEL_NAMES: [&str; 8] = [
    "one_way_wave",
    "heat",
    "diffusion",
    "schrodinger",
    "nls",
    "burgers",
    "hilbert",
    "kdv",
];

impl BridgeModel {
    /// `speed` only applies to the one-way wave and `focusing` to NLS.
    pub(crate) fn from_name(name: &str, speed: f64, focusing: f64) -> anyhow::Result<Self> {
        let model = match name {
            "one_way_wave" => Self::OneWayWave(OneWayWave::new().with_speed(speed)),
            "heat" => Self::Heat(Heat::new()),
            "diffusion" => Self::Diffusion(Diffusion::new()),
            "schrodinger" => Self::Schrodinger(Schrodinger::new()),
            "nls" => Self::Nls(Nls::new().with_focusing(focusing)),
            "burgers" => Self::Burgers(Burgers::new()),
            "hilbert" => Self::Hilbert(HilbertEquation::new()),
            "kdv" => Self::KdV(KdV::new()),
            other => bail!(
                "Unknown model '{other}'. Expected one of: {}",
                MODEL_NAMES.join(", ")
            ),
        };
        Ok(model)
    }

    fn inner(&self) -> &dyn Model {
        match self {
            Self::OneWayWave(m) => m,
            Self::Heat(m) => m,
            Self::Diffusion(m) => m,
            Self::Schrodinger(m) => m,
            Self::Nls(m) => m,
            Self::Burgers(m) => m,
            Self::Hilbert(m) => m,
            Self::KdV(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Model {
        match self {
            Self::OneWayWave(m) => m,
            Self::Heat(m) => m,
            Self::Diffusion(m) => m,
            Self::Schrodinger(m) => m,
            Self::Nls(m) => m,
            Self::Burgers(m) => m,
            Self::Hilbert(m) => m,
            Self::KdV(m) => m,
        }
    }

    pub(crate) fn set_potential(&mut self, samples: Vec<f64>) -> anyhow::Result<()> {
        match self {
            Self::Schrodinger(m) => Ok(m.set_potential_samples(samples)?),
            other => Err(anyhow!("Model '{}' has no potential.", other.name())),
        }
    }

    pub(crate) fn set_diffusion(&mut self, samples: Vec<f64>) -> anyhow::Result<()> {
        match self {
            Self::Diffusion(m) => Ok(m.set_diffusion_samples(samples)?),
            other => Err(anyhow!(
                "Model '{}' has no diffusion coefficient.",
                other.name()
            )),
        }
    }
}

impl Model for BridgeModel {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn bind(&mut self, grid: &Grid) -> Result<()> {
        self.inner_mut().bind(grid)
    }

    fn ddt(&mut self, u: &[Complex64], t: f64) -> Result<Vec<Complex64>> {
        self.inner_mut().ddt(u, t)
    }
}
