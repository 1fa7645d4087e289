//! Geo codes and their provider selectors
//!
//! A geo code is `CONTINENT[-COUNTRY[-SUBDIVISION]]`, e.g. `EU`, `NA-US` or
//! `NA-US-CA`. The provider addresses locations by exactly one of continent,
//! country or country + subdivision, so converting back from a selector needs
//! the country → continent table below.

use std::fmt;
use std::str::FromStr;

use dns_reconciler_provider::{GeoLocation, DEFAULT_COUNTRY_CODE};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Continent codes accepted in geo codes.
pub const CONTINENTS: [&str; 7] = ["AF", "AN", "AS", "EU", "NA", "OC", "SA"];

/// A parsed geo code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeoCode {
    pub continent: String,
    pub country: Option<String>,
    pub subdivision: Option<String>,
}

impl GeoCode {
    /// Parse a `CONTINENT[-COUNTRY[-SUBDIVISION]]` code.
    pub fn parse(code: &str) -> CoreResult<Self> {
        let mut parts = code.split('-');
        let continent = parts.next().unwrap_or_default();
        let country = parts.next();
        let subdivision = parts.next();

        if parts.next().is_some() {
            return Err(CoreError::Geo(format!("\"{code}\" has too many parts")));
        }
        if !CONTINENTS.contains(&continent) {
            return Err(CoreError::Geo(format!(
                "\"{code}\" starts with an unknown continent"
            )));
        }
        if country.is_some_and(str::is_empty) || subdivision.is_some_and(str::is_empty) {
            return Err(CoreError::Geo(format!("\"{code}\" has an empty part")));
        }

        Ok(Self {
            continent: continent.to_string(),
            country: country.map(str::to_string),
            subdivision: subdivision.map(str::to_string),
        })
    }

    /// The provider selector for this code.
    pub fn to_location(&self) -> GeoLocation {
        match (&self.country, &self.subdivision) {
            (Some(country), Some(subdivision)) => {
                GeoLocation::subdivision(country.clone(), subdivision.clone())
            }
            (Some(country), None) => GeoLocation::country(country.clone()),
            _ => GeoLocation::continent(self.continent.clone()),
        }
    }

    /// Rebuild a code from a provider selector. The catch-all location has no code.
    pub fn from_location(location: &GeoLocation) -> CoreResult<Option<Self>> {
        if let Some(continent) = &location.continent_code {
            return Ok(Some(Self {
                continent: continent.clone(),
                country: None,
                subdivision: None,
            }));
        }

        let Some(country) = location.country_code.as_deref() else {
            return Err(CoreError::Geo(format!(
                "location {location:?} has neither continent nor country"
            )));
        };
        if country == DEFAULT_COUNTRY_CODE {
            return Ok(None);
        }

        let continent = continent_of(country).ok_or_else(|| {
            CoreError::Geo(format!("no continent known for country \"{country}\""))
        })?;
        Ok(Some(Self {
            continent: continent.to_string(),
            country: Some(country.to_string()),
            subdivision: location.subdivision_code.clone(),
        }))
    }

    /// Canadian provinces have no provider selector.
    pub fn is_supported(&self) -> bool {
        !(self.country.as_deref() == Some("CA") && self.subdivision.is_some())
    }

    /// Most specific latency region label for this code.
    ///
    /// Unknown subdivisions fall back to their country and unknown countries
    /// to their continent. A known location without a nearby region yields `None`.
    pub fn latency_region(&self) -> Option<&'static str> {
        let continent = continent_region(&self.continent);
        let Some(country) = self.country.as_deref() else {
            return continent;
        };
        if continent_of(country) != Some(self.continent.as_str()) {
            return continent;
        }
        match (country, self.subdivision.as_deref()) {
            ("US", Some(state)) => us_state_region(state),
            _ => country_region(country),
        }
    }
}

impl fmt::Display for GeoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.continent)?;
        if let Some(country) = &self.country {
            write!(f, "-{country}")?;
        }
        if let Some(subdivision) = &self.subdivision {
            write!(f, "-{subdivision}")?;
        }
        Ok(())
    }
}

impl FromStr for GeoCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for GeoCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<GeoCode> for String {
    fn from(code: GeoCode) -> Self {
        code.to_string()
    }
}

/// ISO 3166 alpha-2 country → continent.
pub fn continent_of(country: &str) -> Option<&'static str> {
    let continent = match country {
        "AO" | "BF" | "BI" | "BJ" | "BW" | "CD" | "CF" | "CG" | "CI" | "CM" | "CV" | "DJ"
        | "DZ" | "EG" | "EH" | "ER" | "ET" | "GA" | "GH" | "GM" | "GN" | "GQ" | "GW" | "KE"
        | "KM" | "LR" | "LS" | "LY" | "MA" | "MG" | "ML" | "MR" | "MU" | "MW" | "MZ" | "NA"
        | "NE" | "NG" | "RE" | "RW" | "SC" | "SD" | "SH" | "SL" | "SN" | "SO" | "SS" | "ST"
        | "SZ" | "TD" | "TG" | "TN" | "TZ" | "UG" | "YT" | "ZA" | "ZM" | "ZW" => "AF",
        "AQ" | "BV" | "GS" | "HM" | "TF" => "AN",
        "AE" | "AF" | "AM" | "AZ" | "BD" | "BH" | "BN" | "BT" | "CC" | "CN" | "CX" | "CY"
        | "GE" | "HK" | "ID" | "IL" | "IN" | "IO" | "IQ" | "IR" | "JO" | "JP" | "KG" | "KH"
        | "KP" | "KR" | "KW" | "KZ" | "LA" | "LB" | "LK" | "MM" | "MN" | "MO" | "MV" | "MY"
        | "NP" | "OM" | "PH" | "PK" | "PS" | "QA" | "SA" | "SG" | "SY" | "TH" | "TJ" | "TL"
        | "TM" | "TR" | "TW" | "UZ" | "VN" | "YE" => "AS",
        "AD" | "AL" | "AT" | "AX" | "BA" | "BE" | "BG" | "BY" | "CH" | "CZ" | "DE" | "DK"
        | "EE" | "ES" | "FI" | "FO" | "FR" | "GB" | "GG" | "GI" | "GR" | "HR" | "HU" | "IE"
        | "IM" | "IS" | "IT" | "JE" | "LI" | "LT" | "LU" | "LV" | "MC" | "MD" | "ME" | "MK"
        | "MT" | "NL" | "NO" | "PL" | "PT" | "RO" | "RS" | "RU" | "SE" | "SI" | "SJ" | "SK"
        | "SM" | "UA" | "VA" | "XK" => "EU",
        "AG" | "AI" | "AW" | "BB" | "BL" | "BM" | "BQ" | "BS" | "BZ" | "CA" | "CR" | "CU"
        | "CW" | "DM" | "DO" | "GD" | "GL" | "GP" | "GT" | "HN" | "HT" | "JM" | "KN" | "KY"
        | "LC" | "MF" | "MQ" | "MS" | "MX" | "NI" | "PA" | "PM" | "PR" | "SV" | "SX" | "TC"
        | "TT" | "UM" | "US" | "VC" | "VG" | "VI" => "NA",
        "AS" | "AU" | "CK" | "FJ" | "FM" | "GU" | "KI" | "MH" | "MP" | "NC" | "NF" | "NR"
        | "NU" | "NZ" | "PF" | "PG" | "PN" | "PW" | "SB" | "TK" | "TO" | "TV" | "VU" | "WF"
        | "WS" => "OC",
        "AR" | "BO" | "BR" | "CL" | "CO" | "EC" | "FK" | "GF" | "GY" | "PE" | "PY" | "SR"
        | "UY" | "VE" => "SA",
        _ => return None,
    };
    Some(continent)
}

fn continent_region(continent: &str) -> Option<&'static str> {
    match continent {
        "AF" => Some("af-south-1"),
        "EU" => Some("eu-west-1"),
        "NA" => Some("us-east-1"),
        "SA" => Some("sa-east-1"),
        _ => None,
    }
}

fn country_region(country: &str) -> Option<&'static str> {
    let region = match country {
        "AE" => "me-central-1",
        "AU" => "ap-southeast-2",
        "BH" => "me-south-1",
        "BR" => "sa-east-1",
        "CA" => "ca-central-1",
        "DE" => "eu-central-1",
        "ES" => "eu-south-2",
        "FR" => "eu-west-3",
        "GB" => "eu-west-2",
        "HK" => "ap-east-1",
        "ID" => "ap-southeast-3",
        "IE" => "eu-west-1",
        "IN" => "ap-south-1",
        "IT" => "eu-south-1",
        "JP" => "ap-northeast-1",
        "KR" => "ap-northeast-2",
        "NZ" => "ap-southeast-4",
        "PK" => "ap-south-2",
        "SE" => "eu-central-2",
        "SG" => "ap-southeast-1",
        "TW" => "ap-northeast-3",
        "US" => "us-east-1",
        "ZA" => "af-south-1",
        _ => return None,
    };
    Some(region)
}

fn us_state_region(state: &str) -> Option<&'static str> {
    match state {
        "VA" => Some("us-east-1"),
        "OH" => Some("us-east-2"),
        "CA" => Some("us-west-1"),
        "OR" => Some("us-west-2"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_levels() {
        let eu = GeoCode::parse("EU").unwrap();
        assert_eq!(eu.continent, "EU");
        assert!(eu.country.is_none());
        assert!(eu.subdivision.is_none());

        let us = GeoCode::parse("NA-US").unwrap();
        assert_eq!(us.country.as_deref(), Some("US"));

        let ca = GeoCode::parse("NA-US-CA").unwrap();
        assert_eq!(ca.subdivision.as_deref(), Some("CA"));
        assert_eq!(ca.to_string(), "NA-US-CA");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(GeoCode::parse("XX").is_err());
        assert!(GeoCode::parse("NA-").is_err());
        assert!(GeoCode::parse("NA-US-CA-SF").is_err());
        assert!(GeoCode::parse("").is_err());
    }

    #[test]
    fn to_location_shapes() {
        assert_eq!(
            GeoCode::parse("AF").unwrap().to_location(),
            GeoLocation::continent("AF")
        );
        assert_eq!(
            GeoCode::parse("NA-US").unwrap().to_location(),
            GeoLocation::country("US")
        );
        assert_eq!(
            GeoCode::parse("NA-US-OR").unwrap().to_location(),
            GeoLocation::subdivision("US", "OR")
        );
    }

    #[test]
    fn from_location_reconstructs_continent() {
        let code = GeoCode::from_location(&GeoLocation::country("FR"))
            .unwrap()
            .unwrap();
        assert_eq!(code.to_string(), "EU-FR");

        let code = GeoCode::from_location(&GeoLocation::subdivision("US", "KY"))
            .unwrap()
            .unwrap();
        assert_eq!(code.to_string(), "NA-US-KY");

        let code = GeoCode::from_location(&GeoLocation::continent("OC"))
            .unwrap()
            .unwrap();
        assert_eq!(code.to_string(), "OC");
    }

    #[test]
    fn from_location_default_is_none() {
        assert!(GeoCode::from_location(&GeoLocation::default_location())
            .unwrap()
            .is_none());
    }

    #[test]
    fn from_location_unknown_country() {
        let err = GeoCode::from_location(&GeoLocation::country("ZZ")).unwrap_err();
        assert!(matches!(err, CoreError::Geo(_)));
    }

    #[test]
    fn canadian_provinces_unsupported() {
        assert!(!GeoCode::parse("NA-CA-BC").unwrap().is_supported());
        assert!(GeoCode::parse("NA-CA").unwrap().is_supported());
        assert!(GeoCode::parse("NA-US-BC").unwrap().is_supported());
    }

    #[test]
    fn latency_regions() {
        let region = |code: &str| GeoCode::parse(code).unwrap().latency_region();
        assert_eq!(region("NA-US-CA"), Some("us-west-1"));
        assert_eq!(region("NA-US-OH"), Some("us-east-2"));
        assert_eq!(region("NA-US-TX"), None);
        assert_eq!(region("NA-US"), Some("us-east-1"));
        assert_eq!(region("NA-CA-BC"), Some("ca-central-1"));
        assert_eq!(region("NA"), Some("us-east-1"));
        assert_eq!(region("EU-DE"), Some("eu-central-1"));
        assert_eq!(region("EU-AD"), None);
        assert_eq!(region("AS"), None);
        // country listed under another continent
        assert_eq!(region("EU-US"), Some("eu-west-1"));
    }

    #[test]
    fn serde_as_string() {
        let code: GeoCode = serde_json::from_str("\"EU-GB\"").unwrap();
        assert_eq!(code.country.as_deref(), Some("GB"));
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"EU-GB\"");
        assert!(serde_json::from_str::<GeoCode>("\"XX\"").is_err());
    }
}
