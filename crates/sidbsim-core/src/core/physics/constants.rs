/// Coulomb constant `1 / (4 pi epsilon_0)` in N m^2 / C^2.
pub const COULOMB_CONSTANT: f64 = 8.987_551_792_3e9;

/// Elementary charge in C.
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// Energy gap between the `-/0` and `0/+` charge transition levels in eV.
pub const MU_PLUS_OFFSET: f64 = 0.59;

/// Numerical slack used when comparing local potentials against transition levels.
pub const POP_STABILITY_ERR: f64 = 1e-6;
