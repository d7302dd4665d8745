//! TOML configuration: rule records, the default-range record, and the
//! registry endpoint record.
//!
//! Validation is eager: every configuration error is detected here, before
//! the daemon starts serving events, and fails module activation.
//!
//! ```toml
//! [default-range]
//! start = 100
//! max = 200
//!
//! [registry]
//! host = "127.0.0.1"   # "" or "off" disables mirroring
//! port = 6379
//!
//! [[surface]]
//! surface-id = 7
//! app-id = "nav"
//!
//! [[surface]]
//! surface-id = 8
//! title = "Radio Player"
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use surid_core::{DefaultRange, RangeError, Rule, RuleLoadError, RuleStore};
use surid_registry::Endpoint;

pub const DEFAULT_REGISTRY_HOST: &str = "127.0.0.1";
pub const DEFAULT_REGISTRY_PORT: u16 = 6379;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Rules(#[from] RuleLoadError),

    #[error("configuration has no surface rules and no default range")]
    NoUsableConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub default_range: Option<RangeSection>,
    #[serde(default)]
    pub registry: Option<RegistrySection>,
    #[serde(default, rename = "surface")]
    pub surfaces: Vec<SurfaceSection>,
}

/// Both bounds are required: a partial range record is a config error, not a
/// silent fallback to disabled default behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RangeSection {
    pub start: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RegistrySection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SurfaceSection {
    pub surface_id: u32,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml(&content)?)
    }

    /// Validate the whole configuration and produce the engine inputs.
    pub fn into_parts(
        self,
    ) -> Result<(RuleStore, Option<DefaultRange>, Option<Endpoint>), ConfigError> {
        let range = self
            .default_range
            .map(|section| DefaultRange::new(section.start, section.max))
            .transpose()?;

        let rules: Vec<Rule> = self
            .surfaces
            .into_iter()
            .map(|section| Rule {
                surface_id: section.surface_id,
                app_id: section.app_id,
                title: section.title,
            })
            .collect();

        if rules.is_empty() && range.is_none() {
            return Err(ConfigError::NoUsableConfig);
        }

        let store = RuleStore::load(rules, range.as_ref())?;
        Ok((store, range, registry_endpoint(self.registry)))
    }
}

/// Resolve the registry endpoint record.
///
/// Absent record ⇒ the hardcoded default endpoint. A present record with no
/// host, an empty host, or the literal `"off"` ⇒ mirroring disabled.
pub fn registry_endpoint(section: Option<RegistrySection>) -> Option<Endpoint> {
    match section {
        None => Some(Endpoint {
            host: DEFAULT_REGISTRY_HOST.to_string(),
            port: DEFAULT_REGISTRY_PORT,
        }),
        Some(section) => {
            let host = section.host?;
            if host.is_empty() || host == "off" {
                return None;
            }
            Some(Endpoint {
                host,
                port: section.port.unwrap_or(DEFAULT_REGISTRY_PORT),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"
        [default-range]
        start = 100
        max = 200

        [registry]
        host = "registry.local"
        port = 7000

        [[surface]]
        surface-id = 7
        app-id = "nav"

        [[surface]]
        surface-id = 8
        title = "Radio Player"
    "#;

    #[test]
    fn full_config_parses_into_parts() {
        let config = Config::from_toml(FULL).expect("parse");
        let (rules, range, endpoint) = config.into_parts().expect("valid");

        assert_eq!(rules.len(), 2);
        let range = range.expect("range configured");
        assert_eq!((range.start(), range.max()), (100, 200));
        assert_eq!(
            endpoint,
            Some(Endpoint {
                host: "registry.local".to_string(),
                port: 7000
            })
        );
    }

    #[test]
    fn absent_registry_section_uses_default_endpoint() {
        let config = Config::from_toml(
            r#"
            [[surface]]
            surface-id = 7
            app-id = "nav"
            "#,
        )
        .expect("parse");
        let (_, _, endpoint) = config.into_parts().expect("valid");
        assert_eq!(
            endpoint,
            Some(Endpoint {
                host: DEFAULT_REGISTRY_HOST.to_string(),
                port: DEFAULT_REGISTRY_PORT
            })
        );
    }

    #[test]
    fn registry_off_disables_mirroring() {
        for host in ["off", ""] {
            let section = Some(RegistrySection {
                host: Some(host.to_string()),
                port: Some(7000),
            });
            assert_eq!(registry_endpoint(section), None);
        }
        // A present section without a host also disables mirroring.
        assert_eq!(
            registry_endpoint(Some(RegistrySection {
                host: None,
                port: Some(7000)
            })),
            None
        );
    }

    #[test]
    fn registry_port_defaults_when_unset() {
        let endpoint = registry_endpoint(Some(RegistrySection {
            host: Some("registry.local".to_string()),
            port: None,
        }))
        .expect("enabled");
        assert_eq!(endpoint.port, DEFAULT_REGISTRY_PORT);
    }

    #[test]
    fn duplicate_surface_id_rejected() {
        let config = Config::from_toml(
            r#"
            [[surface]]
            surface-id = 7
            app-id = "nav"

            [[surface]]
            surface-id = 7
            app-id = "radio"
            "#,
        )
        .expect("parse");
        assert!(matches!(
            config.into_parts(),
            Err(ConfigError::Rules(RuleLoadError::DuplicateSurfaceId { .. }))
        ));
    }

    #[test]
    fn rule_id_inside_default_range_rejected() {
        let config = Config::from_toml(
            r#"
            [default-range]
            start = 100
            max = 200

            [[surface]]
            surface-id = 150
            app-id = "nav"
            "#,
        )
        .expect("parse");
        assert!(matches!(
            config.into_parts(),
            Err(ConfigError::Rules(RuleLoadError::IdInDefaultRange { .. }))
        ));
    }

    #[test]
    fn patternless_rule_rejected() {
        let config = Config::from_toml(
            r#"
            [[surface]]
            surface-id = 7
            "#,
        )
        .expect("parse");
        assert!(matches!(
            config.into_parts(),
            Err(ConfigError::Rules(RuleLoadError::MissingPatterns { .. }))
        ));
    }

    #[test]
    fn inverted_range_rejected() {
        let config = Config::from_toml(
            r#"
            [default-range]
            start = 200
            max = 100
            "#,
        )
        .expect("parse");
        assert!(matches!(
            config.into_parts(),
            Err(ConfigError::Range(RangeError::StartAfterMax { .. }))
        ));
    }

    #[test]
    fn empty_config_is_unusable() {
        let config = Config::from_toml("").expect("parse");
        assert!(matches!(
            config.into_parts(),
            Err(ConfigError::NoUsableConfig)
        ));
    }

    #[test]
    fn missing_range_bound_is_a_parse_error() {
        assert!(
            Config::from_toml(
                r#"
                [default-range]
                start = 100
                "#,
            )
            .is_err()
        );
    }

    #[test]
    fn unparsable_surface_id_is_a_parse_error() {
        assert!(
            Config::from_toml(
                r#"
                [[surface]]
                surface-id = "seven"
                app-id = "nav"
                "#,
            )
            .is_err()
        );
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(FULL.as_bytes()).expect("write");
        let config = Config::load(file.path()).expect("load");
        assert_eq!(config.surfaces.len(), 2);
    }

    #[test]
    fn load_missing_file_is_an_io_error() {
        let err = Config::load(Path::new("/nonexistent/surid.toml")).expect_err("io error");
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
