//! `news` query parsing.
//!
//! A query is a list of `-key=value` tokens with keys `id`, `cat`, `reg` and `date`.
//! Unsupplied keys and the value `*` mean "no constraint". The first bad token rejects
//! the whole query.

use chrono::NaiveDate;
use std::fmt;

use crate::error::{NewsError, Result};
use crate::models::{Category, Region};

pub const WILDCARD: &str = "*";

/// Day/month/year as typed on the command line and sent to agencies.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// One field of a filter: either unconstrained or an exact value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue<T> {
    Any,
    Exact(T),
}

impl<T> Default for FilterValue<T> {
    fn default() -> Self {
        FilterValue::Any
    }
}

impl<T> FilterValue<T> {
    pub fn as_exact(&self) -> Option<&T> {
        match self {
            FilterValue::Any => None,
            FilterValue::Exact(v) => Some(v),
        }
    }
}

impl<T: fmt::Display> fmt::Display for FilterValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Any => f.write_str(WILDCARD),
            FilterValue::Exact(v) => v.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryFilter {
    pub agency_id: FilterValue<String>,
    pub category: FilterValue<Category>,
    pub region: FilterValue<Region>,
    pub date: FilterValue<NaiveDate>,
}

impl QueryFilter {
    /// Parse `news` arguments such as `["-cat=tech", "-reg=uk"]`.
    pub fn parse<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = QueryFilter::default();

        for token in tokens {
            let token = token.as_ref();
            let (key, value) = token
                .trim_start_matches('-')
                .split_once('=')
                .filter(|(_, value)| !value.contains('='))
                .ok_or_else(|| NewsError::InvalidParam(format!("{} (use -key=value)", token)))?;

            match key {
                "id" => filter.agency_id = parse_value(value, |v| Ok(v.to_string()))?,
                "cat" => {
                    filter.category = parse_value(value, |v| {
                        v.parse().map_err(|_| NewsError::InvalidValue { key: "category".into(), value: v.into() })
                    })?
                }
                "reg" => {
                    filter.region = parse_value(value, |v| {
                        v.parse().map_err(|_| NewsError::InvalidValue { key: "region".into(), value: v.into() })
                    })?
                }
                "date" => filter.date = parse_value(value, parse_date)?,
                other => return Err(NewsError::InvalidParam(other.to_string())),
            }
        }

        Ok(filter)
    }

    /// Does this filter select the agency with the given code? Exact, case-sensitive.
    pub fn selects_agency(&self, code: &str) -> bool {
        match &self.agency_id {
            FilterValue::Any => true,
            FilterValue::Exact(id) => id == code,
        }
    }

    /// Query parameters for an agency's story listing. Wildcards are omitted and the
    /// agency id is never sent.
    pub fn story_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        if let Some(cat) = self.category.as_exact() {
            params.push(("story_cat", cat.code().to_string()));
        }
        if let Some(reg) = self.region.as_exact() {
            params.push(("story_region", reg.code().to_string()));
        }
        if let Some(date) = self.date.as_exact() {
            params.push(("story_date", date.format(DATE_FORMAT).to_string()));
        }
        params
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = match self.date.as_exact() {
            Some(d) => d.format(DATE_FORMAT).to_string(),
            None => WILDCARD.to_string(),
        };
        write!(
            f,
            "id={} cat={} reg={} date={}",
            self.agency_id, self.category, self.region, date
        )
    }
}

fn parse_value<T>(raw: &str, parse: impl FnOnce(&str) -> Result<T>) -> Result<FilterValue<T>> {
    if raw == WILDCARD {
        Ok(FilterValue::Any)
    } else {
        parse(raw).map(FilterValue::Exact)
    }
}

/// Strict `dd/mm/yyyy`: two-digit day and month, four-digit year, and a real calendar date.
fn parse_date(raw: &str) -> Result<NaiveDate> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[2] == b'/'
        && bytes[5] == b'/'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !shaped {
        return Err(NewsError::InvalidDateFormat(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| NewsError::InvalidDateFormat(raw.to_string()))
}
