//! Typed record values and their presentation format
//!
//! Every value type implements [`WireValue`]: `to_wire` formats the string the
//! provider stores in a resource record, `from_wire` parses it back. A, AAAA,
//! CNAME, NS and PTR values are already in presentation format and pass
//! through unchanged.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::record::RecordType;

/// Longest character string a TXT chunk may hold.
pub const TXT_CHUNK_LEN: usize = 255;

/// Conversion between a typed value and its presentation string.
pub trait WireValue: Sized {
    fn to_wire(&self) -> String;
    fn from_wire(value: &str) -> CoreResult<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MxValue {
    pub preference: u16,
    pub exchange: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SrvValue {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaaValue {
    pub flags: u8,
    pub tag: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaptrValue {
    pub order: u16,
    pub preference: u16,
    pub flags: String,
    pub service: String,
    pub regexp: String,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DsValue {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: String,
}

/// Text of a TXT or SPF value, with `;` escaped as `\;`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxtValue(pub String);

impl TxtValue {
    /// Build from raw text, escaping any bare `;`.
    ///
    /// `\"` and `"` are the same character, stored unescaped; the wire form
    /// escapes every quote again.
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(escape_semicolons(&unescape_quotes(text.as_ref())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One target of an alias record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AliasValue {
    /// Relative name inside the zone (empty for the apex) or a full service name.
    pub name: String,
    /// Type of the target record set.
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    #[serde(default)]
    pub evaluate_target_health: bool,
    /// Zone of the target. Only service targets carry one.
    #[serde(default)]
    pub hosted_zone_id: Option<String>,
}

/// Name fragments that mark an alias target as a provider-managed service.
pub const SERVICE_SUFFIXES: [&str; 4] = [
    "amazonaws.com.",
    "cloudfront.net.",
    "elasticbeanstalk.com.",
    "awsglobalaccelerator.com",
];

impl AliasValue {
    pub fn new(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: Some(record_type.into()),
            evaluate_target_health: false,
            hosted_zone_id: None,
        }
    }

    /// Whether the target is a provider-managed service endpoint.
    pub fn is_service(&self) -> bool {
        is_service_target(&self.name)
    }
}

pub fn is_service_target(name: &str) -> bool {
    SERVICE_SUFFIXES.iter().any(|s| name.contains(s))
}

/// Typed payload of a record, one variant per supported type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values")]
pub enum RecordData {
    A(Vec<String>),
    #[serde(rename = "AAAA")]
    Aaaa(Vec<String>),
    #[serde(rename = "CAA")]
    Caa(Vec<CaaValue>),
    #[serde(rename = "CNAME")]
    Cname(String),
    #[serde(rename = "DS")]
    Ds(Vec<DsValue>),
    #[serde(rename = "MX")]
    Mx(Vec<MxValue>),
    #[serde(rename = "NAPTR")]
    Naptr(Vec<NaptrValue>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    #[serde(rename = "PTR")]
    Ptr(String),
    #[serde(rename = "SPF")]
    Spf(Vec<TxtValue>),
    #[serde(rename = "SRV")]
    Srv(Vec<SrvValue>),
    #[serde(rename = "TXT")]
    Txt(Vec<TxtValue>),
    #[serde(rename = "ALIAS")]
    Alias(Vec<AliasValue>),
}

impl RecordData {
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::A(_) => RecordType::A,
            Self::Aaaa(_) => RecordType::Aaaa,
            Self::Caa(_) => RecordType::Caa,
            Self::Cname(_) => RecordType::Cname,
            Self::Ds(_) => RecordType::Ds,
            Self::Mx(_) => RecordType::Mx,
            Self::Naptr(_) => RecordType::Naptr,
            Self::Ns(_) => RecordType::Ns,
            Self::Ptr(_) => RecordType::Ptr,
            Self::Spf(_) => RecordType::Spf,
            Self::Srv(_) => RecordType::Srv,
            Self::Txt(_) => RecordType::Txt,
            Self::Alias(_) => RecordType::Alias,
        }
    }

    /// Presentation strings stored in resource records. Alias targets have none.
    pub fn to_wire_values(&self) -> Vec<String> {
        fn all<T: WireValue>(values: &[T]) -> Vec<String> {
            values.iter().map(WireValue::to_wire).collect()
        }

        match self {
            Self::A(v) | Self::Aaaa(v) | Self::Ns(v) => v.clone(),
            Self::Cname(v) | Self::Ptr(v) => vec![v.clone()],
            Self::Caa(v) => all(v),
            Self::Ds(v) => all(v),
            Self::Mx(v) => all(v),
            Self::Naptr(v) => all(v),
            Self::Spf(v) | Self::Txt(v) => all(v),
            Self::Srv(v) => all(v),
            Self::Alias(_) => Vec::new(),
        }
    }

    /// Parse presentation strings into typed values of `record_type`.
    pub fn parse_wire_values<'a>(
        record_type: RecordType,
        values: impl IntoIterator<Item = &'a str>,
    ) -> CoreResult<Self> {
        fn all<'a, T: WireValue>(values: impl IntoIterator<Item = &'a str>) -> CoreResult<Vec<T>> {
            values.into_iter().map(T::from_wire).collect()
        }
        fn single<'a>(
            record_type: RecordType,
            values: impl IntoIterator<Item = &'a str>,
        ) -> CoreResult<String> {
            let mut values = values.into_iter();
            match (values.next(), values.next()) {
                (Some(value), None) => Ok(value.to_string()),
                _ => Err(CoreError::value_parse(
                    record_type.as_str(),
                    "",
                    "expected exactly one value",
                )),
            }
        }
        fn plain<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
            values.into_iter().map(str::to_string).collect()
        }

        let data = match record_type {
            RecordType::A => Self::A(plain(values)),
            RecordType::Aaaa => Self::Aaaa(plain(values)),
            RecordType::Ns => Self::Ns(plain(values)),
            RecordType::Cname => Self::Cname(single(record_type, values)?),
            RecordType::Ptr => Self::Ptr(single(record_type, values)?),
            RecordType::Caa => Self::Caa(all(values)?),
            RecordType::Ds => Self::Ds(all(values)?),
            RecordType::Mx => Self::Mx(all(values)?),
            RecordType::Naptr => Self::Naptr(all(values)?),
            RecordType::Spf => Self::Spf(all(values)?),
            RecordType::Srv => Self::Srv(all(values)?),
            RecordType::Txt => Self::Txt(all(values)?),
            RecordType::Alias => {
                return Err(CoreError::value_parse(
                    record_type.as_str(),
                    "",
                    "alias targets have no presentation values",
                ))
            }
        };
        Ok(data)
    }

    /// Sort multi-valued payloads so equal value sets compare equal.
    pub fn sort_values(&mut self) {
        match self {
            Self::A(v) | Self::Aaaa(v) | Self::Ns(v) => v.sort(),
            Self::Caa(v) => v.sort(),
            Self::Ds(v) => v.sort(),
            Self::Mx(v) => v.sort(),
            Self::Naptr(v) => v.sort(),
            Self::Spf(v) | Self::Txt(v) => v.sort(),
            Self::Srv(v) => v.sort(),
            Self::Alias(v) => v.sort(),
            Self::Cname(_) | Self::Ptr(_) => {}
        }
    }

    /// Number of values carried.
    pub fn len(&self) -> usize {
        match self {
            Self::A(v) | Self::Aaaa(v) | Self::Ns(v) => v.len(),
            Self::Cname(_) | Self::Ptr(_) => 1,
            Self::Caa(v) => v.len(),
            Self::Ds(v) => v.len(),
            Self::Mx(v) => v.len(),
            Self::Naptr(v) => v.len(),
            Self::Spf(v) | Self::Txt(v) => v.len(),
            Self::Srv(v) => v.len(),
            Self::Alias(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============ Formatters ============

impl WireValue for MxValue {
    fn to_wire(&self) -> String {
        format!("{} {}", self.preference, self.exchange)
    }

    fn from_wire(value: &str) -> CoreResult<Self> {
        let fields = split_fields(value, 2);
        let [preference, exchange] = fields[..] else {
            return Err(CoreError::value_parse("MX", value, "expected 2 fields"));
        };
        Ok(Self {
            preference: number("MX", value, preference)?,
            exchange: exchange.to_string(),
        })
    }
}

impl WireValue for SrvValue {
    fn to_wire(&self) -> String {
        format!(
            "{} {} {} {}",
            self.priority, self.weight, self.port, self.target
        )
    }

    fn from_wire(value: &str) -> CoreResult<Self> {
        let fields = split_fields(value, 4);
        let [priority, weight, port, target] = fields[..] else {
            return Err(CoreError::value_parse("SRV", value, "expected 4 fields"));
        };
        Ok(Self {
            priority: number("SRV", value, priority)?,
            weight: number("SRV", value, weight)?,
            port: number("SRV", value, port)?,
            target: target.to_string(),
        })
    }
}

impl WireValue for CaaValue {
    fn to_wire(&self) -> String {
        format!("{} {} \"{}\"", self.flags, self.tag, self.value)
    }

    fn from_wire(value: &str) -> CoreResult<Self> {
        let fields = split_fields(value, 3);
        let [flags, tag, quoted] = fields[..] else {
            return Err(CoreError::value_parse("CAA", value, "expected 3 fields"));
        };
        Ok(Self {
            flags: number("CAA", value, flags)?,
            tag: tag.to_string(),
            value: unquote(quoted).to_string(),
        })
    }
}

impl WireValue for NaptrValue {
    fn to_wire(&self) -> String {
        format!(
            "{} {} \"{}\" \"{}\" \"{}\" {}",
            self.order, self.preference, self.flags, self.service, self.regexp, self.replacement
        )
    }

    fn from_wire(value: &str) -> CoreResult<Self> {
        let fields = split_fields(value, 3);
        let [order, preference, rest] = fields[..] else {
            return Err(CoreError::value_parse("NAPTR", value, "expected 6 fields"));
        };
        let bad = || CoreError::value_parse("NAPTR", value, "expected 3 quoted strings");
        let (flags, rest) = take_quoted(rest).ok_or_else(bad)?;
        let (service, rest) = take_quoted(rest).ok_or_else(bad)?;
        let (regexp, rest) = take_quoted(rest).ok_or_else(bad)?;
        let replacement = rest.trim();
        if replacement.is_empty() || replacement.contains(char::is_whitespace) {
            return Err(CoreError::value_parse(
                "NAPTR",
                value,
                "expected a single replacement",
            ));
        }
        Ok(Self {
            order: number("NAPTR", value, order)?,
            preference: number("NAPTR", value, preference)?,
            flags: flags.to_string(),
            service: service.to_string(),
            regexp: regexp.to_string(),
            replacement: replacement.to_string(),
        })
    }
}

impl WireValue for DsValue {
    fn to_wire(&self) -> String {
        format!(
            "{} {} {} {}",
            self.key_tag, self.algorithm, self.digest_type, self.digest
        )
    }

    fn from_wire(value: &str) -> CoreResult<Self> {
        let fields = split_fields(value, 4);
        let [key_tag, algorithm, digest_type, digest] = fields[..] else {
            return Err(CoreError::value_parse("DS", value, "expected 4 fields"));
        };
        Ok(Self {
            key_tag: number("DS", value, key_tag)?,
            algorithm: number("DS", value, algorithm)?,
            digest_type: number("DS", value, digest_type)?,
            digest: digest.to_string(),
        })
    }
}

impl WireValue for TxtValue {
    /// Quote the text, escaping `"`, and split it into 255 character strings.
    fn to_wire(&self) -> String {
        let mut chunks = Vec::new();
        let mut chunk = String::new();
        let mut len = 0;
        let mut chars = self.0.chars();

        while let Some(c) = chars.next() {
            let token = match c {
                '"' => "\\\"".to_string(),
                // keep escape sequences whole
                '\\' => chars.next().map_or_else(|| "\\".to_string(), |n| format!("\\{n}")),
                _ => c.to_string(),
            };
            let token_len = token.chars().count();
            if len + token_len > TXT_CHUNK_LEN {
                chunks.push(std::mem::take(&mut chunk));
                len = 0;
            }
            chunk.push_str(&token);
            len += token_len;
        }
        chunks.push(chunk);

        format!("\"{}\"", chunks.join("\" \""))
    }

    fn from_wire(value: &str) -> CoreResult<Self> {
        let inner = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .ok_or_else(|| CoreError::value_parse("TXT", value, "expected a quoted string"))?;

        let mut text = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('"') => text.push('"'),
                    Some(n) => {
                        text.push('\\');
                        text.push(n);
                    }
                    None => text.push('\\'),
                },
                // chunk boundary: `" "`
                '"' => {
                    if chars.next() != Some(' ') || chars.next() != Some('"') {
                        return Err(CoreError::value_parse(
                            "TXT",
                            value,
                            "unescaped quote inside a string",
                        ));
                    }
                }
                _ => text.push(c),
            }
        }
        Ok(Self::new(text))
    }
}

/// Escape every `;` not already preceded by a backslash.
pub fn escape_semicolons(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut escaped = false;
    for c in text.chars() {
        if c == ';' && !escaped {
            out.push('\\');
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }
    out
}

// ============ Helpers ============

/// Replace `\"` with `"`, leaving other escape sequences alone.
fn unescape_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some(n) => {
                out.push('\\');
                out.push(n);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Split on whitespace runs into at most `n` fields, the last keeping the rest.
fn split_fields(value: &str, n: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(n);
    let mut rest = value.trim();
    while fields.len() + 1 < n {
        match rest.find(char::is_whitespace) {
            Some(i) => {
                fields.push(&rest[..i]);
                rest = rest[i..].trim_start();
            }
            None => break,
        }
    }
    if !rest.is_empty() {
        fields.push(rest);
    }
    fields
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Take one `"..."` string off the front, returning its content and the rest.
fn take_quoted(value: &str) -> Option<(&str, &str)> {
    let value = value.trim_start().strip_prefix('"')?;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some((&value[..i], &value[i + 1..])),
            _ => escaped = false,
        }
    }
    None
}

fn number<T: std::str::FromStr>(record_type: &str, value: &str, field: &str) -> CoreResult<T> {
    field
        .parse()
        .map_err(|_| CoreError::value_parse(record_type, value, format!("\"{field}\" is not a number")))
}
