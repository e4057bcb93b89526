use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output format of a compilation. Each variant carries a fixed filename
/// extension and mime type, looked up via [`Format::ext`]/[`Format::content_type`]
/// rather than dispatched on the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Pdf,
    Dvi,
    Ps,
}

impl Format {
    pub fn ext(&self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Dvi => "dvi",
            Format::Ps => "ps",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Pdf => "application/pdf",
            Format::Dvi => "application/x-dvi",
            Format::Ps => "application/postscript",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ext())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid output format: {0}")]
pub struct InvalidFormat(String);

impl FromStr for Format {
    type Err = InvalidFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(Format::Pdf),
            "dvi" => Ok(Format::Dvi),
            "ps" => Ok(Format::Ps),
            other => Err(InvalidFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for f in [Format::Pdf, Format::Dvi, Format::Ps] {
            assert_eq!(Format::from_str(f.ext()).unwrap(), f);
        }
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(Format::from_str("tex").is_err());
    }

    #[test]
    fn content_types_are_distinct() {
        let all = [Format::Pdf, Format::Dvi, Format::Ps];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.content_type(), b.content_type());
            }
        }
    }
}
