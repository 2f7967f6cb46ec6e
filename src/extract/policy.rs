//! Radius policies for point extraction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ColdpixError, Result};

const NEAREST: &str = "closest";
const NEAREST_WITHIN: &str = "closestwithin";

/// How cells around a query point are reduced to one value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RadiusPolicy {
    /// Mean of all valid cells within the radius (km)
    Fixed(f64),
    /// Mean of the valid cells at the global minimum distance
    Nearest,
    /// Mean of the nearest valid cells, considering only cells within the radius (km)
    NearestWithin(f64),
}

impl RadiusPolicy {
    /// Search radius in km, if the policy has one
    pub fn radius_km(&self) -> Option<f64> {
        match self {
            RadiusPolicy::Fixed(r) | RadiusPolicy::NearestWithin(r) => Some(*r),
            RadiusPolicy::Nearest => None,
        }
    }
}

fn parse_radius(policy: &str, text: &str) -> Result<f64> {
    match text.trim().parse::<f64>() {
        Ok(r) if r.is_finite() && r >= 0.0 => Ok(r),
        _ => Err(ColdpixError::InvalidPolicy {
            policy: policy.to_string(),
        }),
    }
}

impl FromStr for RadiusPolicy {
    type Err = ColdpixError;

    /// Parse `"5"`, `"closest"` or `"closestwithin5"`.
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if text == NEAREST {
            return Ok(RadiusPolicy::Nearest);
        }
        if let Some(radius) = text.strip_prefix(NEAREST_WITHIN) {
            return parse_radius(s, radius).map(RadiusPolicy::NearestWithin);
        }
        parse_radius(s, text).map(RadiusPolicy::Fixed)
    }
}

impl fmt::Display for RadiusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadiusPolicy::Fixed(r) => write!(f, "{}", r),
            RadiusPolicy::Nearest => f.write_str(NEAREST),
            RadiusPolicy::NearestWithin(r) => write!(f, "{}{}", NEAREST_WITHIN, r),
        }
    }
}

impl TryFrom<String> for RadiusPolicy {
    type Error = ColdpixError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RadiusPolicy> for String {
    fn from(policy: RadiusPolicy) -> Self {
        policy.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policies() {
        assert_eq!("5".parse::<RadiusPolicy>().unwrap(), RadiusPolicy::Fixed(5.0));
        assert_eq!("2.5".parse::<RadiusPolicy>().unwrap(), RadiusPolicy::Fixed(2.5));
        assert_eq!("closest".parse::<RadiusPolicy>().unwrap(), RadiusPolicy::Nearest);
        assert_eq!(
            "closestwithin5".parse::<RadiusPolicy>().unwrap(),
            RadiusPolicy::NearestWithin(5.0)
        );
    }

    #[test]
    fn test_invalid_policies() {
        for bad in ["", "nearest", "closestwithin", "closestwithinx", "-3", "NaN", "inf"] {
            let err = bad.parse::<RadiusPolicy>().unwrap_err();
            assert!(
                matches!(err, ColdpixError::InvalidPolicy { .. }),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_display_round_trips() {
        for text in ["5", "closest", "closestwithin5", "closestwithin2.5"] {
            let policy: RadiusPolicy = text.parse().unwrap();
            assert_eq!(policy.to_string(), text);
        }
    }

    #[test]
    fn test_serde_as_string() {
        let policy: RadiusPolicy = serde_json::from_str(r#""closestwithin10""#).unwrap();
        assert_eq!(policy, RadiusPolicy::NearestWithin(10.0));
        assert_eq!(serde_json::to_string(&policy).unwrap(), r#""closestwithin10""#);
        assert!(serde_json::from_str::<RadiusPolicy>(r#""bogus""#).is_err());
    }
}
