use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::database::ConfigResolver;
use crate::error::Result;

pub const DEFAULT_DATABASE_CONFIG: &str = "./config/database.yml";
pub const DEFAULT_SPEC_FIXTURE_DIRECTORY: &str = "./spec/fixtures";
pub const DEFAULT_TEST_FIXTURE_DIRECTORY: &str = "./test/fixtures";
pub const DEFAULT_ENVIRONMENT: &str = "test";

/// Settings file looked up in the working directory when no path is given
pub const LOCAL_CONFIG_FILE: &str = "seedbed.toml";

/// Settings file looked up in the home directory when no path is given
pub const HOME_CONFIG_FILE: &str = ".seedbed.toml";

/// Process-level settings for fixture builders
///
/// ```toml
/// # seedbed.toml
/// database_config = "./config/database.yml"
/// fixture_directories = ["./spec/fixtures", "./test/fixtures"]
/// environment = "test"
/// ```
///
/// Every field can be overridden from the environment, e.g.
/// `SEEDBED_ENVIRONMENT=ci` or
/// `SEEDBED_FIXTURE_DIRECTORIES=./fixtures,./spec/fixtures`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedbedConfig {
    /// Database config file read when a builder is given none
    pub database_config: String,

    /// Candidate fixture directories, first existing wins
    pub fixture_directories: Vec<String>,

    /// Entry selected from environment-keyed database configs
    pub environment: String,
}

impl Default for SeedbedConfig {
    fn default() -> Self {
        Self {
            database_config: DEFAULT_DATABASE_CONFIG.to_string(),
            fixture_directories: vec![
                DEFAULT_SPEC_FIXTURE_DIRECTORY.to_string(),
                DEFAULT_TEST_FIXTURE_DIRECTORY.to_string(),
            ],
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}

impl SeedbedConfig {
    /// Load settings from a TOML file and `SEEDBED_*` environment variables.
    ///
    /// An explicit `path` must exist. Without one, `./seedbed.toml` and
    /// `$HOME/.seedbed.toml` are read when present, the local file taking
    /// precedence. A `.env` file in the working directory is loaded first.
    pub fn new(path: &Option<String>) -> Result<SeedbedConfig> {
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();

        match path {
            Some(p) => {
                builder = builder.add_source(File::new(p.as_str(), FileFormat::Toml).required(true));
            }
            None => {
                if let Some(home) = dirs::home_dir() {
                    let home_file = home.join(HOME_CONFIG_FILE);
                    builder = builder.add_source(
                        File::from(home_file.as_path())
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
                builder = builder.add_source(
                    File::from(Path::new(LOCAL_CONFIG_FILE))
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        // E.g. `SEEDBED_DATABASE_CONFIG=./db.yml cargo test`
        builder = builder.add_source(
            Environment::with_prefix("SEEDBED")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("fixture_directories"),
        );

        let settings = builder.build()?.try_deserialize::<SeedbedConfig>()?;
        Ok(settings)
    }

    /// Resolver for database configs following these settings
    pub fn resolver(&self) -> ConfigResolver {
        ConfigResolver::from_settings(self)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Database Config:      {}", self.database_config),
            format!("Environment:          {}", self.environment),
        ];

        for (i, dir) in self.fixture_directories.iter().enumerate() {
            let label = if i == 0 { "Fixture Directories:" } else { "" };
            let status = if Path::new(dir).exists() {
                ""
            } else {
                " (missing)"
            };
            lines.push(format!("{:<22}{}{}", label, dir, status));
        }

        lines.join("\n")
    }
}
