//! Serde support for configuration enums.
//!
//! [`ErrorAction`] and [`OutputFormat`] serialize as lower-case strings when the
//! `serde` feature is enabled, so they can live in ordinary config files.
//!
//! ```rust
//! use isle::{ErrorAction, OutputFormat};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Settings {
//!     on_error: ErrorAction,
//!     format: OutputFormat,
//! }
//!
//! let settings: Settings = serde_json::from_str(r#"{"on_error":"continue","format":"latex"}"#).unwrap();
//! assert_eq!(settings.on_error, ErrorAction::Continue);
//! assert_eq!(settings.format, OutputFormat::Latex);
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::context::ErrorAction;
use crate::printer::OutputFormat;

const ERROR_ACTIONS: &[&str] = &["continue", "warn", "abort"];
const OUTPUT_FORMATS: &[&str] = &["isl", "c", "omega", "polylib", "extpolylib", "latex"];

impl ErrorAction {
    fn as_str(self) -> &'static str {
        match self {
            ErrorAction::Continue => "continue",
            ErrorAction::Warn => "warn",
            ErrorAction::Abort => "abort",
        }
    }
}

impl OutputFormat {
    fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Isl => "isl",
            OutputFormat::C => "c",
            OutputFormat::Omega => "omega",
            OutputFormat::PolyLib => "polylib",
            OutputFormat::ExtPolyLib => "extpolylib",
            OutputFormat::Latex => "latex",
        }
    }
}

impl Serialize for ErrorAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        match name.as_str() {
            "continue" => Ok(ErrorAction::Continue),
            "warn" => Ok(ErrorAction::Warn),
            "abort" => Ok(ErrorAction::Abort),
            other => Err(D::Error::unknown_variant(other, ERROR_ACTIONS)),
        }
    }
}

impl Serialize for OutputFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OutputFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        match name.as_str() {
            "isl" => Ok(OutputFormat::Isl),
            "c" => Ok(OutputFormat::C),
            "omega" => Ok(OutputFormat::Omega),
            "polylib" => Ok(OutputFormat::PolyLib),
            "extpolylib" => Ok(OutputFormat::ExtPolyLib),
            "latex" => Ok(OutputFormat::Latex),
            other => Err(D::Error::unknown_variant(other, OUTPUT_FORMATS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Settings {
        on_error: ErrorAction,
        format: OutputFormat,
    }

    #[test]
    fn serializes_lower_case() {
        let settings = Settings {
            on_error: ErrorAction::Warn,
            format: OutputFormat::ExtPolyLib,
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(json, r#"{"on_error":"warn","format":"extpolylib"}"#);
    }

    #[test]
    fn every_variant_survives_json() {
        for action in [ErrorAction::Continue, ErrorAction::Warn, ErrorAction::Abort] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(serde_json::from_str::<ErrorAction>(&json).unwrap(), action);
        }
        for format in [
            OutputFormat::Isl,
            OutputFormat::C,
            OutputFormat::Omega,
            OutputFormat::PolyLib,
            OutputFormat::ExtPolyLib,
            OutputFormat::Latex,
        ] {
            let json = serde_json::to_string(&format).unwrap();
            assert_eq!(serde_json::from_str::<OutputFormat>(&json).unwrap(), format);
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = serde_json::from_str::<ErrorAction>(r#""ignore""#).unwrap_err();
        assert!(err.to_string().contains("unknown variant `ignore`"));
        assert!(serde_json::from_str::<OutputFormat>(r#""Isl""#).is_err());
    }
}
