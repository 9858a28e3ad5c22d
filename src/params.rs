//! Named option bags for the heuristic aligner
//!
//! A configuration maps option keys to either a bare flag or a value. Before
//! invocation every configuration is normalized so that `ambiguous=iupac` is
//! present unless the caller chose another `ambiguous` setting; the input
//! genomes carry IUPAC ambiguity codes.

use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// Option key the heuristic aligner needs for IUPAC input
pub const AMBIGUOUS_KEY: &str = "ambiguous";
pub const AMBIGUOUS_DEFAULT: &str = "iupac";

/// Presets run when no configuration is requested explicitly
pub const DEFAULT_PRESETS: &[&str] = &["default", "current"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Emitted as `--key`
    Flag,
    /// Emitted as `--key=value`
    Value(String),
}

/// A named, ordered set of aligner options
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterConfiguration {
    name: String,
    options: IndexMap<String, ParamValue>,
}

impl ParameterConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        ParameterConfiguration {
            name: name.into(),
            options: IndexMap::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options
            .insert(key.into(), ParamValue::Value(value.into()));
        self
    }

    pub fn with_flag(mut self, key: impl Into<String>) -> Self {
        self.options.insert(key.into(), ParamValue::Flag);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.options.get(key)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy with `ambiguous=iupac` appended when no `ambiguous` key is set
    pub fn normalize(&self) -> ParameterConfiguration {
        let mut normalized = self.clone();
        if !normalized.options.contains_key(AMBIGUOUS_KEY) {
            normalized.options.insert(
                AMBIGUOUS_KEY.to_string(),
                ParamValue::Value(AMBIGUOUS_DEFAULT.to_string()),
            );
        }
        normalized
    }

    /// Command-line tokens in option order
    pub fn to_args(&self) -> Vec<String> {
        self.options
            .iter()
            .map(|(key, value)| match value {
                ParamValue::Flag => format!("--{key}"),
                ParamValue::Value(v) => format!("--{key}={v}"),
            })
            .collect()
    }

    /// Look up a built-in preset by name
    pub fn preset(name: &str) -> Option<ParameterConfiguration> {
        let config = ParameterConfiguration::new(name);
        let iupac = |c: ParameterConfiguration| c.with_value(AMBIGUOUS_KEY, AMBIGUOUS_DEFAULT);
        let preset = match name {
            "default" => config,
            "current" => iupac(config)
                .with_flag("noentropy")
                .with_flag("notransition")
                .with_value("seed", "match14")
                .with_value("step", "10")
                .with_value("maxwordcount", "90%")
                .with_value("masking", "10")
                .with_value("hspthresh", "top50%"),
            "gapped" => iupac(config).with_flag("gapped").with_flag("chain"),
            "gfextend" => iupac(config)
                .with_flag("gapped")
                .with_flag("chain")
                .with_flag("gfextend"),
            "sensitive" => iupac(config)
                .with_flag("gapped")
                .with_flag("chain")
                .with_value("seed", "match10")
                .with_value("step", "5"),
            "recommended" => iupac(config)
                .with_flag("gapped")
                .with_flag("chain")
                .with_value("seed", "match12")
                .with_value("step", "10"),
            _ => return None,
        };
        Some(preset)
    }

    /// Names and descriptions of the built-in presets
    pub fn list_presets() -> Vec<(&'static str, &'static str)> {
        vec![
            ("default", "No options beyond ambiguity handling"),
            ("current", "Aggressive speed settings (match14 seed, step 10, top50% HSPs)"),
            ("gapped", "Gapped extension with chaining"),
            ("gfextend", "Gapped, chained, with gap-free extension"),
            ("sensitive", "Gapped, chained, match10 seed with step 5"),
            ("recommended", "Gapped, chained, match12 seed with step 10"),
        ]
    }
}

/// Parses `NAME:key=value,flag,...`; the option list may be empty (`NAME:`)
impl FromStr for ParameterConfiguration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid configuration '{s}'. Use NAME:key=value,flag,..."))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("Configuration '{s}' has an empty name"));
        }

        let mut config = ParameterConfiguration::new(name);
        for token in rest.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let token = token.trim_start_matches("--");
            match token.split_once('=') {
                Some((key, value)) => {
                    let key = key.trim();
                    if key.is_empty() {
                        return Err(format!("Option '{token}' in '{name}' has an empty key"));
                    }
                    config = config.with_value(key, value.trim());
                }
                None => config = config.with_flag(token),
            }
        }
        Ok(config)
    }
}

impl fmt::Display for ParameterConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        for (i, (key, value)) in self.options.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match value {
                ParamValue::Flag => write!(f, "{key}")?,
                ParamValue::Value(v) => write!(f, "{key}={v}")?,
            }
        }
        Ok(())
    }
}

/// Collect configurations by name, later entries replacing earlier ones
pub fn collect_configurations<I>(configs: I) -> IndexMap<String, ParameterConfiguration>
where
    I: IntoIterator<Item = ParameterConfiguration>,
{
    configs
        .into_iter()
        .map(|c| (c.name().to_string(), c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_injects_iupac() {
        let config = ParameterConfiguration::new("plain").with_flag("gapped");
        let normalized = config.normalize();
        assert_eq!(normalized.to_args(), vec!["--gapped", "--ambiguous=iupac"]);
        // receiver unchanged
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_normalize_keeps_explicit_ambiguous() {
        let config = ParameterConfiguration::new("n").with_value("ambiguous", "n");
        assert_eq!(config.normalize().to_args(), vec!["--ambiguous=n"]);
        assert_eq!(config.normalize(), config.normalize().normalize());
    }

    #[test]
    fn test_flag_and_value_tokens() {
        let config = ParameterConfiguration::preset("current").unwrap();
        assert_eq!(
            config.to_args(),
            vec![
                "--ambiguous=iupac",
                "--noentropy",
                "--notransition",
                "--seed=match14",
                "--step=10",
                "--maxwordcount=90%",
                "--masking=10",
                "--hspthresh=top50%",
            ]
        );
    }

    #[test]
    fn test_parse_configuration() {
        let config: ParameterConfiguration = "fast: seed=match12, --gapped ,step=10".parse().unwrap();
        assert_eq!(config.name(), "fast");
        assert_eq!(config.get("gapped"), Some(&ParamValue::Flag));
        assert_eq!(
            config.get("seed"),
            Some(&ParamValue::Value("match12".to_string()))
        );
        assert_eq!(config.to_string(), "fast:seed=match12,gapped,step=10");
    }

    #[test]
    fn test_parse_empty_option_list() {
        let config: ParameterConfiguration = "bare:".parse().unwrap();
        assert!(config.is_empty());
        assert_eq!(config.normalize().to_args(), vec!["--ambiguous=iupac"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!("noseparator".parse::<ParameterConfiguration>().is_err());
        assert!(":gapped".parse::<ParameterConfiguration>().is_err());
        assert!("x:=value".parse::<ParameterConfiguration>().is_err());
    }

    #[test]
    fn test_presets() {
        for (name, _) in ParameterConfiguration::list_presets() {
            let preset = ParameterConfiguration::preset(name).unwrap();
            assert_eq!(preset.name(), name);
        }
        assert!(ParameterConfiguration::preset("default").unwrap().is_empty());
        assert!(ParameterConfiguration::preset("nope").is_none());
        for name in DEFAULT_PRESETS {
            assert!(ParameterConfiguration::preset(name).is_some());
        }
    }

    #[test]
    fn test_collect_replaces_duplicates_in_place() {
        let configs = collect_configurations([
            ParameterConfiguration::new("a"),
            ParameterConfiguration::new("b"),
            ParameterConfiguration::new("a").with_flag("chain"),
        ]);
        let names: Vec<_> = configs.keys().cloned().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(configs["a"].len(), 1);
    }
}
