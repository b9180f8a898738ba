use super::constants::{COULOMB_CONSTANT, ELEMENTARY_CHARGE};
use super::params::SimulationParameters;
use crate::core::models::coords::{LatticeConstants, SiqadCoord};
use nalgebra::DMatrix;

/// Screened Coulomb potential in V that a single elementary charge induces at
/// distance `distance_nm`.
///
/// The interaction of a site with itself is defined to be zero.
#[inline]
pub fn pair_potential(distance_nm: f64, params: &SimulationParameters) -> f64 {
    if distance_nm <= 0.0 {
        return 0.0;
    }
    COULOMB_CONSTANT / params.epsilon_r / (distance_nm * 1e-9)
        * (-distance_nm / params.lambda_tf).exp()
        * ELEMENTARY_CHARGE
}

/// Pairwise site distances in nm.
pub fn distance_matrix(coords: &[SiqadCoord], lattice: &LatticeConstants) -> DMatrix<f64> {
    let positions: Vec<_> = coords.iter().map(|c| c.position_nm(lattice)).collect();
    DMatrix::from_fn(coords.len(), coords.len(), |i, j| {
        nalgebra::distance(&positions[i], &positions[j])
    })
}

/// Pairwise potentials derived from a distance matrix. Diagonal entries are zero.
pub fn potential_matrix(distances: &DMatrix<f64>, params: &SimulationParameters) -> DMatrix<f64> {
    distances.map(|d| pair_potential(d, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_potential_at_one_nanometre_matches_reference_value() {
        let v = pair_potential(1.0, &SimulationParameters::default());
        assert!((v - 0.210_525_581_904_613).abs() < 1e-12);
    }

    #[test]
    fn pair_potential_decays_with_distance_and_screening() {
        let params = SimulationParameters::default();
        assert!(pair_potential(0.5, &params) > pair_potential(1.0, &params));
        let screened = SimulationParameters::new(5.6, 1.0, -0.32);
        assert!(pair_potential(2.0, &screened) < pair_potential(2.0, &params));
        assert_eq!(pair_potential(0.0, &params), 0.0);
    }

    #[test]
    fn matrices_are_symmetric_with_zero_diagonal() {
        let coords = [
            SiqadCoord::new(0, 0, 0),
            SiqadCoord::new(1, 0, 0),
            SiqadCoord::new(0, 1, 1),
        ];
        let params = SimulationParameters::default();
        let distances = distance_matrix(&coords, &params.lattice);
        let potentials = potential_matrix(&distances, &params);
        assert!((distances[(0, 1)] - 0.384).abs() < 1e-12);
        for i in 0..3 {
            assert_eq!(potentials[(i, i)], 0.0);
            for j in 0..3 {
                assert_eq!(potentials[(i, j)], potentials[(j, i)]);
            }
        }
        assert!((potentials[(0, 1)] - 0.620_124_274_919_032).abs() < 1e-12);
    }
}
