use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::NetError;

/// Parameter initializer configuration.
///
/// `method` is either `"random"` (uniform in `[-range, range]`, `range` required)
/// or `"zero"`. Method names are case-insensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitConfig {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<f64>,
}

impl InitConfig {
    pub const RANDOM: &'static str = "random";
    pub const ZERO: &'static str = "zero";

    pub fn random(range: f64) -> Self {
        InitConfig {
            method: InitConfig::RANDOM.to_owned(),
            range: Some(range),
        }
    }

    pub fn zero() -> Self {
        InitConfig {
            method: InitConfig::ZERO.to_owned(),
            range: None,
        }
    }
}

impl Default for InitConfig {
    fn default() -> Self {
        InitConfig::zero()
    }
}

/// Resolved initializer, sampled once per scalar parameter.
#[derive(Debug, Clone)]
pub(crate) enum Initializer {
    Zero,
    Random(Uniform<f64>),
}

impl Initializer {
    /// # Arguments
    /// * `config` - initializer configuration;
    /// * `target` - what is being initialized (`"weight"` or `"bias"`), used in errors.
    pub(crate) fn from_config(
        config: &InitConfig,
        target: &'static str,
    ) -> Result<Initializer, NetError> {
        let invalid = |reason: String| NetError::InvalidInitializer { target, reason };

        if config.method.eq_ignore_ascii_case(InitConfig::ZERO) {
            Ok(Initializer::Zero)
        } else if config.method.eq_ignore_ascii_case(InitConfig::RANDOM) {
            match config.range {
                None => Err(invalid(
                    "random init method requires a range parameter".to_owned(),
                )),
                Some(range) if !range.is_finite() || range <= 0.0 => Err(invalid(format!(
                    "range must be a positive finite number, but got {}",
                    range
                ))),
                Some(range) => Ok(Initializer::Random(Uniform::new_inclusive(-range, range))),
            }
        } else {
            Err(invalid(format!(
                "unrecognized init method {:?}",
                config.method
            )))
        }
    }

    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Initializer::Zero => 0.0,
            Initializer::Random(between) => between.sample(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_stays_in_range() {
        let init = Initializer::from_config(&InitConfig::random(0.5), "weight").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = init.sample(&mut rng);
            assert!((-0.5..=0.5).contains(&v), "{} out of range", v);
        }
    }

    #[test]
    fn zero_is_zero() {
        let init = Initializer::from_config(&InitConfig::default(), "bias").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(init.sample(&mut rng), 0.0);
    }

    #[test]
    fn method_is_case_insensitive() {
        let config = InitConfig {
            method: "RANDOM".to_owned(),
            range: Some(1.0),
        };
        assert!(Initializer::from_config(&config, "weight").is_ok());
    }

    #[test]
    fn random_without_range_fails() {
        let config = InitConfig {
            method: "random".to_owned(),
            range: None,
        };
        match Initializer::from_config(&config, "weight") {
            Err(NetError::InvalidInitializer { target, .. }) => assert_eq!(target, "weight"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_range_fails() {
        for &range in [0.0, -1.0, f64::NAN, f64::INFINITY].iter() {
            assert!(Initializer::from_config(&InitConfig::random(range), "bias").is_err());
        }
    }

    #[test]
    fn unknown_method_fails() {
        let config = InitConfig {
            method: "xavier".to_owned(),
            range: None,
        };
        assert!(matches!(
            Initializer::from_config(&config, "weight"),
            Err(NetError::InvalidInitializer { .. })
        ));
    }
}
