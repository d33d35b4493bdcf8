//! Demographic models of one and two populations.
//!
//! Times are in units of `2 N_ref` generations, sizes relative to `N_ref`, and migration rates
//! in units of `2 N_ref m`. Two-population models start from a single ancestral population at
//! equilibrium that splits into two at the beginning of the model.

use std::{fmt, str::FromStr};

use super::{Grid, Integrator, Model, ModelError, Phi, Size};

/// The demographic models known by name.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ModelKind {
    /// Standard neutral model of a single population.
    Snm,
    /// Instantaneous size change `T` ago to relative size `nu`.
    TwoEpoch,
    /// Exponential growth beginning `T` ago, reaching relative size `nu` at present.
    Growth,
    /// Instantaneous size change to `nuB` followed by exponential change to `nuF` over `T`.
    BottleGrowth,
    /// Size `nuB` for a time `TB`, followed by size `nuF` for a time `TF`.
    ThreeEpoch,
    /// Standard neutral model of two populations that split at the present.
    Snm2d,
    /// Split into sizes `nu1` and `nu2` `T` ago, with symmetric migration `m`.
    SplitMig,
    /// Split into sizes `nu1` and `nu2` `T` ago, with symmetric migration `m`.
    ///
    /// Same as [`ModelKind::SplitMig`] with parameters in a different order.
    SymMig,
    /// Split into sizes `nu1` and `nu2` `T` ago, with migration `m12` into the first population
    /// and `m21` into the second.
    SplitAsymMig,
    /// Split into sizes `nu1` and `nu2` `T` ago, without migration.
    SplitNoMig,
    /// Split into isolated sizes `nu1` and `nu2` `T` ago, with inbreeding coefficients `F1`
    /// and `F2` in the sampled individuals.
    IsoInbreeding,
}

impl ModelKind {
    /// All models, in order.
    pub const ALL: [ModelKind; 11] = [
        ModelKind::Snm,
        ModelKind::TwoEpoch,
        ModelKind::Growth,
        ModelKind::BottleGrowth,
        ModelKind::ThreeEpoch,
        ModelKind::Snm2d,
        ModelKind::SplitMig,
        ModelKind::SymMig,
        ModelKind::SplitAsymMig,
        ModelKind::SplitNoMig,
        ModelKind::IsoInbreeding,
    ];

    /// Returns the name of the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Snm => "snm",
            ModelKind::TwoEpoch => "two_epoch",
            ModelKind::Growth => "growth",
            ModelKind::BottleGrowth => "bottlegrowth",
            ModelKind::ThreeEpoch => "three_epoch",
            ModelKind::Snm2d => "snm_2d",
            ModelKind::SplitMig => "split_mig",
            ModelKind::SymMig => "sym_mig",
            ModelKind::SplitAsymMig => "split_asym_mig",
            ModelKind::SplitNoMig => "split_no_mig",
            ModelKind::IsoInbreeding => "iso_inbreeding",
        }
    }
}

impl Model for ModelKind {
    fn dimensions(&self) -> usize {
        match self {
            ModelKind::Snm
            | ModelKind::TwoEpoch
            | ModelKind::Growth
            | ModelKind::BottleGrowth
            | ModelKind::ThreeEpoch => 1,
            ModelKind::Snm2d
            | ModelKind::SplitMig
            | ModelKind::SymMig
            | ModelKind::SplitAsymMig
            | ModelKind::SplitNoMig
            | ModelKind::IsoInbreeding => 2,
        }
    }

    fn name(&self) -> &str {
        self.as_str()
    }

    fn parameter_names(&self) -> &[&'static str] {
        match self {
            ModelKind::Snm | ModelKind::Snm2d => &[],
            ModelKind::TwoEpoch | ModelKind::Growth => &["nu", "T"],
            ModelKind::BottleGrowth => &["nuB", "nuF", "T"],
            ModelKind::ThreeEpoch => &["nuB", "nuF", "TB", "TF"],
            ModelKind::SplitMig => &["nu1", "nu2", "T", "m"],
            ModelKind::SymMig => &["nu1", "nu2", "m", "T"],
            ModelKind::SplitAsymMig => &["nu1", "nu2", "T", "m12", "m21"],
            ModelKind::SplitNoMig => &["nu1", "nu2", "T"],
            ModelKind::IsoInbreeding => &["T", "nu1", "nu2", "F1", "F2"],
        }
    }

    /// Checks that parameters are valid for the model.
    ///
    /// In addition to the default checks, sizes must be positive and inbreeding coefficients
    /// must be at most one.
    fn check_parameters(&self, params: &[f64]) -> Result<(), ModelError> {
        let names = self.parameter_names();
        if params.len() != names.len() {
            return Err(ModelError::ParameterCount {
                expected: names.len(),
                found: params.len(),
            });
        }

        for (&name, &value) in names.iter().zip(params) {
            let valid = value.is_finite()
                && match name.as_bytes()[0] {
                    b'n' => value > 0.0,
                    b'F' => (0.0..=1.0).contains(&value),
                    _ => value >= 0.0,
                };

            if !valid {
                return Err(ModelError::InvalidParameter { name, value });
            }
        }

        Ok(())
    }

    fn inbreeding(&self, params: &[f64]) -> Option<Vec<f64>> {
        match self {
            ModelKind::IsoInbreeding => params.get(3..5).map(<[f64]>::to_vec),
            _ => None,
        }
    }

    fn phi(&self, params: &[f64], grid: &Grid) -> Result<Phi, ModelError> {
        let integrator = Integrator::default();
        let mut phi = Phi::equilibrium(grid, 1.0);

        match (self, params) {
            (ModelKind::Snm, _) => (),
            (ModelKind::TwoEpoch, &[nu, t]) => {
                one_pop(&integrator, &mut phi, grid, t, Size::Constant(nu));
            }
            (ModelKind::Growth, &[nu, t]) => {
                let size = Size::Exponential { start: 1.0, end: nu };
                one_pop(&integrator, &mut phi, grid, t, size);
            }
            (ModelKind::BottleGrowth, &[nu_b, nu_f, t]) => {
                let size = Size::Exponential {
                    start: nu_b,
                    end: nu_f,
                };
                one_pop(&integrator, &mut phi, grid, t, size);
            }
            (ModelKind::ThreeEpoch, &[nu_b, nu_f, t_b, t_f]) => {
                one_pop(&integrator, &mut phi, grid, t_b, Size::Constant(nu_b));
                one_pop(&integrator, &mut phi, grid, t_f, Size::Constant(nu_f));
            }
            (ModelKind::Snm2d, _) => phi = phi.split(grid),
            (ModelKind::SplitMig, &[nu1, nu2, t, m])
            | (ModelKind::SymMig, &[nu1, nu2, m, t]) => {
                phi = phi.split(grid);
                two_pops(&integrator, &mut phi, grid, t, [nu1, nu2], [m, m]);
            }
            (ModelKind::SplitAsymMig, &[nu1, nu2, t, m12, m21]) => {
                phi = phi.split(grid);
                two_pops(&integrator, &mut phi, grid, t, [nu1, nu2], [m12, m21]);
            }
            (ModelKind::SplitNoMig, &[nu1, nu2, t])
            | (ModelKind::IsoInbreeding, &[t, nu1, nu2, _, _]) => {
                phi = phi.split(grid);
                two_pops(&integrator, &mut phi, grid, t, [nu1, nu2], [0.0, 0.0]);
            }
            _ => {
                return Err(ModelError::ParameterCount {
                    expected: self.parameter_names().len(),
                    found: params.len(),
                })
            }
        }

        Ok(phi)
    }
}

fn one_pop(integrator: &Integrator, phi: &mut Phi, grid: &Grid, time: f64, nu: Size) {
    if let Phi::OnePop(phi) = phi {
        integrator.one_pop(phi, grid, time, nu);
    }
}

fn two_pops(
    integrator: &Integrator,
    phi: &mut Phi,
    grid: &Grid,
    time: f64,
    [nu1, nu2]: [f64; 2],
    [m12, m21]: [f64; 2],
) {
    if let Phi::TwoPops(phi) = phi {
        integrator.two_pops(phi, grid, time, nu1.into(), nu2.into(), m12, m21);
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::UnknownModel {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{array::Axis, Scs};

    #[test]
    fn test_from_str() {
        assert_eq!("split_mig".parse::<ModelKind>(), Ok(ModelKind::SplitMig));
        assert_eq!("snm_2d".parse::<ModelKind>(), Ok(ModelKind::Snm2d));
        assert_eq!(
            "island".parse::<ModelKind>(),
            Err(ModelError::UnknownModel {
                name: String::from("island")
            })
        );

        for kind in ModelKind::ALL {
            assert_eq!(kind.to_string().parse::<ModelKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_parameter_checks() {
        assert_eq!(
            ModelKind::TwoEpoch.check_parameters(&[1.0]),
            Err(ModelError::ParameterCount {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            ModelKind::TwoEpoch.check_parameters(&[0.0, 1.0]),
            Err(ModelError::InvalidParameter {
                name: "nu",
                value: 0.0
            })
        );
        assert_eq!(
            ModelKind::SplitMig.check_parameters(&[1.0, 1.0, -0.1, 1.0]),
            Err(ModelError::InvalidParameter {
                name: "T",
                value: -0.1
            })
        );
        assert_eq!(
            ModelKind::IsoInbreeding.check_parameters(&[0.1, 1.0, 1.0, 0.5, 1.5]),
            Err(ModelError::InvalidParameter {
                name: "F2",
                value: 1.5
            })
        );
        assert!(ModelKind::SplitNoMig
            .check_parameters(&[1.0, 2.0, f64::NAN])
            .is_err());
        assert!(ModelKind::SplitAsymMig
            .check_parameters(&[1.0, 2.0, 0.0, 0.0, 3.0])
            .is_ok());
    }

    #[test]
    fn test_phi_parameter_count() {
        let grid = Grid::new(10).unwrap();

        assert_eq!(
            ModelKind::SplitMig.phi(&[1.0, 2.0], &grid).err(),
            Some(ModelError::ParameterCount {
                expected: 4,
                found: 2
            })
        );
        assert!(ModelKind::Snm.phi(&[], &grid).is_ok());
        assert_eq!(ModelKind::IsoInbreeding.inbreeding(&[0.1]), None);
    }

    #[test]
    fn test_dimensions_mismatch() {
        assert_eq!(
            ModelKind::Snm.expected(&[], &[4, 4], &[20, 30, 40]),
            Err(ModelError::Dimensions {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn test_snm_expected() {
        // The neutral spectrum with theta one is 1 / k
        let expected = ModelKind::Snm.expected(&[], &[10], &[30, 40, 50]).unwrap();

        for k in 1..10 {
            let relative = expected[[k]] * k as f64;
            assert!((relative - 1.0).abs() < 0.02, "{k}: {relative}");
        }
    }

    #[test]
    fn test_two_epoch_without_change_is_snm() {
        let grids = [30, 40, 50];
        let snm = ModelKind::Snm.expected(&[], &[8], &grids).unwrap();
        let two_epoch = ModelKind::TwoEpoch
            .expected(&[1.0, 0.3], &[8], &grids)
            .unwrap();

        // Corners hold lost and fixed alleles, which accumulate over time
        for k in 1..8 {
            assert_approx_eq!(snm[[k]], two_epoch[[k]], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_three_epoch_reduces_to_two_epoch() {
        let grids = [25, 35];
        let two_epoch = ModelKind::TwoEpoch
            .expected(&[2.0, 0.2], &[6], &grids)
            .unwrap();
        let three_epoch = ModelKind::ThreeEpoch
            .expected(&[1.0, 2.0, 0.0, 0.2], &[6], &grids)
            .unwrap();

        assert_approx_eq!(two_epoch, three_epoch, epsilon = 1e-10);
    }

    #[test]
    fn test_expansion_excess_rare_variants() {
        let grids = [30, 40, 50];
        let snm = ModelKind::Snm.expected(&[], &[10], &grids).unwrap();
        let growth = ModelKind::Growth
            .expected(&[5.0, 0.1], &[10], &grids)
            .unwrap();

        let ratio = |scs: &Scs| scs[[1]] / scs[[5]];
        assert!(ratio(&growth) > ratio(&snm));
    }

    #[test]
    fn test_split_mig_symmetric() {
        let grids = [20, 25];
        let spectrum = ModelKind::SplitMig
            .expected(&[1.0, 1.0, 0.1, 1.0], &[4, 4], &grids)
            .unwrap();

        assert_eq!(spectrum.shape().as_ref(), &[5, 5]);
        assert!((spectrum[[1, 2]] / spectrum[[2, 1]] - 1.0).abs() < 5e-2);
    }

    #[test]
    fn test_sym_mig_matches_split_mig() {
        let grids = [20, 25];
        let split_mig = ModelKind::SplitMig
            .expected(&[0.5, 2.0, 0.1, 1.5], &[4, 6], &grids)
            .unwrap();
        let sym_mig = ModelKind::SymMig
            .expected(&[0.5, 2.0, 1.5, 0.1], &[4, 6], &grids)
            .unwrap();

        assert_approx_eq!(split_mig, sym_mig, epsilon = 1e-12);
    }

    #[test]
    fn test_snm_2d_marginal_matches_snm() {
        let grids = [30, 40, 50];
        let snm = ModelKind::Snm.expected(&[], &[6], &grids).unwrap();
        let snm_2d = ModelKind::Snm2d.expected(&[], &[6, 6], &grids).unwrap();

        assert_approx_eq!(
            snm_2d.marginalize(&[Axis(1)]).unwrap(),
            snm,
            epsilon = 1e-10
        );
        // Both samples are drawn from the same frequency
        assert!(snm_2d[[2, 2]] > snm_2d[[2, 4]]);
    }

    #[test]
    fn test_iso_inbreeding_requires_even_sample_sizes() {
        assert_eq!(
            ModelKind::IsoInbreeding.expected(&[0.1, 1.0, 1.0, 0.1, 0.1], &[5, 4], &[20]),
            Err(ModelError::OddSampleSize { sample_size: 5 })
        );
    }

    #[test]
    fn test_inbreeding_increases_homozygous_classes() {
        let grids = [20, 30];
        let outbred = ModelKind::IsoInbreeding
            .expected(&[0.1, 1.0, 1.0, 0.0, 0.0], &[4, 4], &grids)
            .unwrap();
        let inbred = ModelKind::IsoInbreeding
            .expected(&[0.1, 1.0, 1.0, 0.9, 0.0], &[4, 4], &grids)
            .unwrap();

        assert!(inbred[[1, 0]] < outbred[[1, 0]]);
        assert!(inbred[[2, 0]] > outbred[[2, 0]]);
    }
}
