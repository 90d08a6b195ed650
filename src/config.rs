use anyhow::Result;
use clap_serde_derive::ClapSerde;
use serde::Deserialize;

#[derive(ClapSerde, Deserialize, Debug)]
pub struct Config {
    /// The address the listener binds to
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub(crate) address: String,

    /// The port the listener binds to
    #[arg(short, long, env, default_value = "5000")]
    pub(crate) port: u16,

    /// Path to the serialized model artifact
    #[arg(short, long, env, default_value = "model.gbdt")]
    pub(crate) model_file: String,

    /// Path to the feature schema listing the trained column names in order
    #[arg(short, long, env, default_value = "schema.json")]
    pub(crate) schema_file: String,
}

impl Config {
    pub fn from_toml(path: &str) -> Result<Self> {
        let str = std::fs::read_to_string(path)?;
        let config = toml::from_str(&str)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::Config;

    #[test]
    fn reads_full_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "address = \"127.0.0.1\"\nport = 8080\nmodel_file = \"rain.gbdt\"\nschema_file = \"rain_schema.json\""
        )
        .unwrap();

        let config = Config::from_toml(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.model_file, "rain.gbdt");
        assert_eq!(config.schema_file, "rain_schema.json");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::from_toml("definitely-not-here.toml").is_err());
    }
}
