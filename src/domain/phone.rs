use crate::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rwanda's country calling code.
pub const COUNTRY_CODE: &str = "250";

/// Total digits of a cleaned number, country code included.
pub const PHONE_DIGITS: usize = 12;

const PREFIX_LEN: usize = 6;

/// Message shown when a number fails validation.
pub const INVALID_PHONE_MESSAGE: &str =
    "Please enter a valid Rwandan mobile number (e.g. 250 788 123 456)";

/// Enumerated six-digit prefixes accepted by the validator.
///
/// The first block covers numbers typed with the trunk zero kept after the
/// country code; the rest are the ten-digit mobile ranges and the two fixed
/// ranges the mobile-money gateway also accepts.
#[rustfmt::skip]
pub const ALLOWED_PREFIXES: &[&str] = &[
    "250072", "250073", "250075", "250076", "250077", "250078", "250079",
    "250720", "250721", "250722", "250723", "250724", "250725", "250726", "250727", "250728", "250729",
    "250730", "250731", "250732", "250733", "250734", "250735", "250736", "250737", "250738", "250739",
    "250750", "250751", "250752", "250753", "250754", "250755", "250756", "250757", "250758", "250759",
    "250760", "250761", "250762", "250763", "250764", "250765", "250766", "250767", "250768", "250769",
    "250770", "250771", "250772", "250773", "250774", "250775", "250776", "250777", "250778", "250779",
    "250780", "250781", "250782", "250783", "250784", "250785", "250786", "250787", "250788", "250789",
    "250790", "250791", "250792", "250793", "250794", "250795", "250796", "250797", "250798", "250799",
    "250252", "250255",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    Mtn,
    Airtel,
    Mobile,
    Fixed,
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Carrier::Mtn => "MTN",
            Carrier::Airtel => "Airtel",
            Carrier::Mobile => "Mobile",
            Carrier::Fixed => "Fixed",
        };
        f.write_str(name)
    }
}

/// Strips every non-digit character from user input.
pub fn clean(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Returns true iff the cleaned input is a 12-digit `250` number whose
/// six-digit prefix is in [`ALLOWED_PREFIXES`].
pub fn is_valid(raw: &str) -> bool {
    let digits = clean(raw);
    digits.len() == PHONE_DIGITS
        && digits.starts_with(COUNTRY_CODE)
        && ALLOWED_PREFIXES.contains(&&digits[..PREFIX_LEN])
}

/// Groups the cleaned digits as `250 7XX XXX XXX` for display.
///
/// Never drops or rewrites digits, so `clean(format(s)) == clean(s)`.
pub fn format(raw: &str) -> String {
    let digits = clean(raw);
    digits
        .as_bytes()
        .chunks(3)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A cleaned, validated Rwandan phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, PaymentError> {
        if is_valid(raw) {
            Ok(Self(clean(raw)))
        } else {
            Err(PaymentError::Validation(INVALID_PHONE_MESSAGE.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn formatted(&self) -> String {
        format(&self.0)
    }

    pub fn carrier(&self) -> Carrier {
        // Normalise the trunk-zero form so 250078... and 25078... agree.
        let local = self.0[COUNTRY_CODE.len()..].trim_start_matches('0');
        match local.get(..2) {
            Some("78") | Some("79") => Carrier::Mtn,
            Some("72") | Some("73") => Carrier::Airtel,
            Some(prefix) if prefix.starts_with('2') => Carrier::Fixed,
            _ => Carrier::Mobile,
        }
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}
