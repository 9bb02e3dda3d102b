//! Settings for the demo binary, read from `SCALARGRAD_*` environment variables.
//!
//! Lives in the binary: the library itself takes no configuration.

use scalargrad::{Error, Result, WeightInit};

pub const ENV_PREFIX: &str = "SCALARGRAD_";

pub(crate) const ENV_SEED: &str = "SEED";
pub(crate) const ENV_INPUTS: &str = "INPUTS";
pub(crate) const ENV_LAYERS: &str = "LAYERS";
pub(crate) const ENV_INIT_STD: &str = "INIT_STD";

const DEFAULT_SEED: u64 = 42;
const DEFAULT_INPUTS: usize = 3;
const DEFAULT_LAYERS: [usize; 3] = [4, 4, 1];

#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    pub seed: u64,
    /// Width of the input vector.
    pub inputs: usize,
    /// Output width of every layer; the last one is linear.
    pub layers: Vec<usize>,
    /// Standard deviation for normal weight init; `0` keeps uniform `[-1, 1)`.
    pub init_std: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            seed: DEFAULT_SEED,
            inputs: DEFAULT_INPUTS,
            layers: DEFAULT_LAYERS.to_vec(),
            init_std: 0.0,
        }
    }
}

impl DemoConfig {
    pub fn weight_init(&self) -> WeightInit {
        if self.init_std == 0.0 {
            WeightInit::default()
        } else {
            WeightInit::Normal {
                mean: 0.0,
                std: self.init_std,
            }
        }
    }

    /// Builds the config from the environment, keeping defaults for unset keys.
    pub fn from_env() -> Result<DemoConfig> {
        let default = DemoConfig::default();

        let seed = env_parsed::<u64>(&env_key(ENV_SEED))?.unwrap_or(default.seed);
        let inputs = env_parsed::<usize>(&env_key(ENV_INPUTS))?.unwrap_or(default.inputs);
        let layers = match env_string(&env_key(ENV_LAYERS))? {
            Some(raw) => parse_layers(&env_key(ENV_LAYERS), &raw)?,
            None => default.layers,
        };
        let init_std = env_parsed::<f64>(&env_key(ENV_INIT_STD))?.unwrap_or(default.init_std);

        Ok(DemoConfig {
            seed,
            inputs,
            layers,
            init_std,
        })
    }
}

pub fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}{suffix}")
}

/// Reads `key`; `Ok(None)` when unset.
pub fn env_string(key: &str) -> Result<Option<String>> {
    match std::env::var(key) {
        Ok(s) => Ok(Some(s)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::EnvVar {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Reads and parses `key`; a set but malformed value is an error, not a fallback.
pub fn env_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = env_string(key)? else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| Error::Parse {
            key: key.to_string(),
            value: raw.clone(),
            message: e.to_string(),
        })
}

fn parse_layers(key: &str, raw: &str) -> Result<Vec<usize>> {
    let layers = raw
        .split(',')
        .map(|part| {
            part.trim().parse::<usize>().map_err(|e| Error::Parse {
                key: key.to_string(),
                value: raw.to_string(),
                message: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if layers.contains(&0) {
        return Err(Error::Parse {
            key: key.to_string(),
            value: raw.to_string(),
            message: "layer widths must be greater than 0".to_string(),
        });
    }
    Ok(layers)
}
