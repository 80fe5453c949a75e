//! Basic numerical concepts used throughout the crate

#![allow(missing_docs)]

// Razor variables are defined in double precision, there is no way around it
pub type Float = f64;
pub use std::f64 as reals;

/// Mathematical functions
pub mod functions {
    use super::{reals::consts::PI, Float};

    /// Bring an angle back into the [-𝜋, 𝜋] range
    pub fn reduce_range(x: Float) -> Float {
        const ONE_OVER_2PI: Float = 1. / (2. * PI);
        if x.abs() <= PI {
            return x;
        }
        let n = (x * ONE_OVER_2PI).round();
        x - n * (2. * PI)
    }
}

#[cfg(test)]
mod tests {
    use super::{functions::reduce_range, reals::consts::PI};
    use approx::assert_relative_eq;

    #[test]
    fn in_range_angles_are_untouched() {
        assert_eq!(reduce_range(0.5), 0.5);
        assert_eq!(reduce_range(-PI), -PI);
        assert_eq!(reduce_range(PI), PI);
    }

    #[test]
    fn out_of_range_angles_wrap_around() {
        assert_relative_eq!(reduce_range(1.5 * PI), -0.5 * PI, epsilon = 1e-12);
        assert_relative_eq!(reduce_range(-1.5 * PI), 0.5 * PI, epsilon = 1e-12);
        assert_relative_eq!(reduce_range(4.5 * PI), 0.5 * PI, epsilon = 1e-12);
    }
}
