//! This module implements some domain-specific 4-momentum handling logic.

use crate::numeric::Float;
use nalgebra::{SVector, Vector3};
use prefix_num_ops::real::*;

/// 4-momentum dimension
pub const MOMENTUM_DIM: usize = 4;

/// Raw storage of a relativistic 4-momentum
pub type Momentum = SVector<Float, MOMENTUM_DIM>;

/// Convenience const for accessing the X coordinate of a 4-vector
pub const X: usize = 0;

/// Convenience const for accessing the Y coordinate of a 4-vector
pub const Y: usize = 1;

/// Convenience const for accessing the Z coordinate of a 4-vector
pub const Z: usize = 2;

/// Convenience const for accessing the E coordinate of a 4-vector
pub const E: usize = 3;

/// Relativistic energy-momentum vector (px, py, pz, E)
///
/// This is what hemispheres and jets are made of. The accessors follow the
/// usual collider conventions, with the beam along the Z axis.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FourVector(Momentum);
//
impl FourVector {
    /// Build a 4-vector from its cartesian coordinates
    pub fn new(px: Float, py: Float, pz: Float, e: Float) -> Self {
        Self(Momentum::new(px, py, pz, e))
    }

    /// Build a 4-vector from transverse momentum, pseudorapidity, azimuth and
    /// mass, as is customary for jets
    pub fn from_pt_eta_phi_m(pt: Float, eta: Float, phi: Float, m: Float) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let e = sqrt(px * px + py * py + pz * pz + m * m);
        Self::new(px, py, pz, e)
    }

    /// X component of the momentum
    pub fn px(&self) -> Float {
        self.0[X]
    }

    /// Y component of the momentum
    pub fn py(&self) -> Float {
        self.0[Y]
    }

    /// Longitudinal component of the momentum
    pub fn pz(&self) -> Float {
        self.0[Z]
    }

    /// Energy
    pub fn e(&self) -> Float {
        self.0[E]
    }

    /// Transverse momentum
    pub fn pt(&self) -> Float {
        sqrt(self.px() * self.px() + self.py() * self.py())
    }

    /// Magnitude of the 3-momentum
    pub fn p(&self) -> Float {
        sqrt(self.px() * self.px() + self.py() * self.py() + self.pz() * self.pz())
    }

    /// Azimuthal angle, zero for a vector that is aligned with the beam
    pub fn phi(&self) -> Float {
        if self.px() == 0. && self.py() == 0. {
            0.
        } else {
            self.py().atan2(self.px())
        }
    }

    /// Pseudorapidity
    pub fn eta(&self) -> Float {
        let pt = self.pt();
        if pt > 0. {
            (self.pz() / pt).asinh()
        } else if self.pz() == 0. {
            0.
        } else {
            self.pz().signum() * Float::INFINITY
        }
    }

    /// Invariant mass, negative for space-like vectors
    pub fn mass(&self) -> Float {
        let m2 = self.e() * self.e() - self.p() * self.p();
        if m2 >= 0. {
            sqrt(m2)
        } else {
            -sqrt(-m2)
        }
    }

    /// Spatial part of the 4-momentum
    pub fn vect(&self) -> Vector3<Float> {
        Vector3::new(self.px(), self.py(), self.pz())
    }

    /// Projection of the 3-momentum on the transverse plane, as (x, y, 0)
    pub fn transverse(&self) -> Vector3<Float> {
        Vector3::new(self.px(), self.py(), 0.)
    }
}
