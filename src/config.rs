//! The `key: value` file naming the archives and the override directory.
//!
//! ```text
//! // later archives shadow earlier ones
//! grf: data/base.grf
//! grf: data/patch.grf
//! data_dir: C:\ro\
//! ```

use std::{fs, io, path::Path, path::PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Archives in load order.
    pub archives: Vec<PathBuf>,
    /// Override directory, `/`-separated.
    pub data_dir: String,
}

impl Config {
    /// Reads and parses the config file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        Ok(Config::parse(&fs::read_to_string(path)?))
    }

    pub fn parse(text: &str) -> Config {
        let mut config = Config::default();

        for line in text.lines() {
            if line.starts_with("//") {
                continue;
            }

            let Some((key, value)) = split_line(line) else {
                continue;
            };

            match key {
                "grf" => config.archives.push(PathBuf::from(value)),
                "data_dir" => config.data_dir = value.replace('\\', "/"),
                _ => debug!("ignoring config key `{}`", key),
            }
        }

        config
    }
}

/// Splits `key: value`. The key runs to the first `:`, the value starts at
/// the first non-blank after it and runs to the end of the line.
fn split_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let value = value.trim_start().trim_end_matches(&['\r', '\n'][..]);

    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let config = Config::parse(
            "// archives\r\ngrf: a.grf\r\ndata_dir: C:\\ro\\\r\ngrf:  b.grf\r\nfoo: bar\r\n",
        );

        assert_eq!(
            vec![PathBuf::from("a.grf"), PathBuf::from("b.grf")],
            config.archives
        );
        assert_eq!("C:/ro/", config.data_dir);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let config = Config::parse("grf\n: a.grf\ngrf: \ngrf : a.grf\n//grf: c.grf\n");
        assert_eq!(Config::default(), config);
    }

    #[test]
    fn test_last_data_dir_wins() {
        let config = Config::parse("data_dir: one\ndata_dir: two\n");
        assert_eq!("two", config.data_dir);
    }

    #[test]
    fn test_load_missing() {
        assert!(matches!(
            Config::load("does/not/exist.conf"),
            Err(ConfigError::Io(_))
        ));
    }
}
