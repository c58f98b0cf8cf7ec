//! Synthetic particles.
//!
//! A particle is drawn in three steps: a fair-coin charge, a pseudorapidity
//! from the fixed eta table, and an azimuth from a density whose first-harmonic
//! coefficient is `eta * charge * v1`. The azimuthal table therefore differs for
//! every particle and is built fresh each time.

use df_core::{RandomSource, Result};
use df_prob::{EtaDensity, PhiDensity, TabulatedCdf};

use crate::config::ScanConfig;

/// Electric charge sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charge {
    /// -1
    Negative,
    /// +1
    Positive,
}

impl Charge {
    /// `+1.0` or `-1.0`.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Charge::Negative => -1.0,
            Charge::Positive => 1.0,
        }
    }
}

/// One generated particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Charge sign.
    pub charge: Charge,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle in `[0, 2*pi]`.
    pub phi: f64,
}

/// Draws particles with an injected directed-flow signal.
#[derive(Debug, Clone)]
pub struct ParticleGenerator {
    eta_table: TabulatedCdf,
    v1: f64,
    phi_npx: usize,
}

impl ParticleGenerator {
    /// Build a generator from an eta shape and the azimuthal settings.
    pub fn new(eta: &EtaDensity, eta_npx: usize, v1: f64, phi_npx: usize) -> Result<Self> {
        let eta_table = TabulatedCdf::build(eta, eta_npx)?;
        // Fail here rather than on the first particle.
        TabulatedCdf::build(&PhiDensity::new(0.0), phi_npx)?;
        Ok(Self { eta_table, v1, phi_npx })
    }

    /// Build the generator described by `config`.
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        let eta = EtaDensity::new(config.coefficients().eta_curvature, config.eta_range)?;
        Self::new(&eta, config.eta_npx, config.v1, config.phi_npx)
    }

    /// Injected v1.
    pub fn v1(&self) -> f64 {
        self.v1
    }

    /// Pseudorapidity sampling table.
    pub fn eta_table(&self) -> &TabulatedCdf {
        &self.eta_table
    }

    /// Azimuthal sampling table for a particle at `eta` with `charge`.
    pub fn phi_table(&self, eta: f64, charge: Charge) -> Result<TabulatedCdf> {
        TabulatedCdf::build(&PhiDensity::new(eta * charge.sign() * self.v1), self.phi_npx)
    }

    /// Draw one particle.
    pub fn generate<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Result<Particle> {
        let charge = if rng.uniform() < 0.5 { Charge::Negative } else { Charge::Positive };
        let eta = self.eta_table.sample(rng);
        let phi = self.phi_table(eta, charge)?.sample(rng);
        Ok(Particle { charge, eta, phi })
    }
}
