use crate::connectivity::Partition;
use crate::error::ConfigError;
use serde::Serialize;

/// How ordinals and readable ids are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingRules {
    city: String,
    separator: char,
    ordinal_start: u32,
    ordinal_width: usize,
}

impl NamingRules {
    pub fn new(
        city: &str,
        separator: &str,
        ordinal_start: u32,
        ordinal_width: usize,
    ) -> Result<Self, ConfigError> {
        let mut chars = separator.chars();
        let separator = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() && !c.is_ascii_alphanumeric() && !c.is_whitespace() => c,
            _ => return Err(ConfigError::InvalidSeparator(separator.to_string())),
        };
        if ordinal_start > 1 {
            return Err(ConfigError::InvalidOrdinalStart(ordinal_start));
        }
        Ok(Self {
            city: sanitize(city, separator),
            separator,
            ordinal_start,
            ordinal_width,
        })
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn ordinal_start(&self) -> u32 {
        self.ordinal_start
    }

    /// `city` + sep + sanitized name + sep + zero padded ordinal.
    pub fn street_id(&self, name: &str, ordinal: u32) -> String {
        let sep = self.separator;
        let name = sanitize(name, sep);
        let width = self.ordinal_width;
        match (self.city.is_empty(), name.is_empty()) {
            (false, false) => format!("{}{sep}{name}{sep}{ordinal:0width$}", self.city),
            (false, true) => format!("{}{sep}{ordinal:0width$}", self.city),
            (true, false) => format!("{name}{sep}{ordinal:0width$}"),
            (true, true) => format!("{ordinal:0width$}"),
        }
    }
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            city: String::new(),
            separator: '-',
            ordinal_start: 0,
            ordinal_width: 3,
        }
    }
}

/// Lower-cased ASCII alphanumerics; every other run of characters becomes a
/// single separator, none at either end.
pub fn sanitize(name: &str, separator: char) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push(separator);
            }
            pending_separator = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    out
}

/// A final street instance. `members` index into the street's segment slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub ordinal: u32,
    pub total: usize,
    pub street_id: String,
    pub members: Vec<usize>,
}

/// Number the components of one street. The partition is already ordered by
/// smallest member index, which makes the ordinals a pure function of input
/// order.
pub fn name_instances(name: &str, partition: &Partition, rules: &NamingRules) -> Vec<Instance> {
    let total = partition.len();
    partition
        .components()
        .iter()
        .enumerate()
        .map(|(i, members)| {
            let ordinal = rules.ordinal_start + i as u32;
            Instance {
                ordinal,
                total,
                street_id: rules.street_id(name, ordinal),
                members: members.clone(),
            }
        })
        .collect()
}
