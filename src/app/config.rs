use serde::de::Deserialize;

use std::path::PathBuf;

use clap::ArgMatches;
use config::{Config, ConfigError, Value, File, Environment};

use crate::error::*;

/// Layered settings: `conf/default`, then `--config FILE` or
/// `conf/$RUN_MODE`, then `APP_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
  pub conf: Config
}

impl AppConfig {
  pub fn new_clap(cli: &ArgMatches) -> Result<Self> {
    let mut conf = Config::default();
    // Load defaults
    conf.merge(File::with_name("conf/default"))?;

    if let Some(ref config_file) = cli.value_of("config") {
      conf.merge(File::with_name(config_file))?;
    } else {
      // Get RUN_MODE from environment
      let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
      conf.merge(File::with_name(&format!("conf/{}", env)).required(false))?;
    }

    // Allow overrides from environment
    conf.merge(Environment::with_prefix("app").separator("_"))?;

    Ok(Self::from_config(conf))
  }

  pub fn from_config(conf: Config) -> Self {
    AppConfig {
      conf,
    }
  }

  pub fn get<'de, T: Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
    Ok(self.conf.get(key).or_else(|e| {
      match e {
        ConfigError::NotFound(_) => Ok(None),
        err => Err(err),
      }
    })?)
  }

  pub fn get_str(&self, key: &str) -> Result<Option<String>> {
    let val = if let Some(val) = self.get(key)? {
      Some(Value::into_str(val)?)
    } else {
      None
    };
    Ok(val)
  }

  pub fn get_path(&self, key: &str) -> Result<Option<PathBuf>> {
    Ok(self.get_str(key)?.map(PathBuf::from))
  }

  pub fn get_int(&self, key: &str) -> Result<Option<i64>> {
    let val = if let Some(val) = self.get(key)? {
      Some(Value::into_int(val)?)
    } else {
      None
    };
    Ok(val)
  }

  pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
    let val = if let Some(val) = self.get(key)? {
      Some(Value::into_bool(val)?)
    } else {
      None
    };
    Ok(val)
  }

  pub fn get_array(&self, key: &str) -> Result<Option<Vec<Value>>> {
    let val = if let Some(val) = self.get(key)? {
      Some(Value::into_array(val)?)
    } else {
      None
    };
    Ok(val)
  }

  /// Array of strings, e.g. `servers` or `web.services`.
  pub fn get_str_list(&self, key: &str) -> Result<Option<Vec<String>>> {
    let val = match self.get_array(key)? {
      Some(list) => Some(list.into_iter()
        .map(Value::into_str)
        .collect::<Result<Vec<String>, ConfigError>>()?),
      None => None,
    };
    Ok(val)
  }

  /// Like `get_str` but a missing key is an error.
  pub fn require_str(&self, key: &str) -> Result<String> {
    self.get_str(key)?
      .ok_or_else(|| Error::ConfigError { source: ConfigError::NotFound(key.to_string()) })
  }
}
