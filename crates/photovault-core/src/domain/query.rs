//! Listing query and pagination types
//!
//! [`ListParams`] is the raw, loosely typed query string. [`ListQuery`] is
//! the normalized form: page floored to 1, `per_page` clamped to
//! `[1, MAX_PER_PAGE]`, and unknown sort keys replaced by defaults.

use std::fmt;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Default page size
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Largest page size a client may request
pub const MAX_PER_PAGE: u32 = 100;

/// Field used to order a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    /// Server ingestion time
    #[default]
    CreatedAt,
    Filename,
    Size,
    /// Capture time; photos without one sort last
    TakenAt,
}

impl SortField {
    /// Parses a query value, returning `None` for unknown fields
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "createdAt" => Some(SortField::CreatedAt),
            "filename" => Some(SortField::Filename),
            "size" => Some(SortField::Size),
            "takenAt" => Some(SortField::TakenAt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::Filename => "filename",
            SortField::Size => "size",
            SortField::TakenAt => "takenAt",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Raw listing parameters as they arrive on the query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default, deserialize_with = "saturating_int")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "saturating_int")]
    pub per_page: Option<i64>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Integer that saturates at the `i64` bounds instead of failing to parse
struct SaturatingInt(i64);

impl<'de> Deserialize<'de> for SaturatingInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SaturatingIntVisitor)
    }
}

struct SaturatingIntVisitor;

impl Visitor<'_> for SaturatingIntVisitor {
    type Value = SaturatingInt;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(SaturatingInt(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(SaturatingInt(i64::try_from(v).unwrap_or(i64::MAX)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        parse_saturating(v)
            .map(SaturatingInt)
            .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
    }
}

/// Parses a decimal integer, clamping values beyond the `i64` range
fn parse_saturating(value: &str) -> Option<i64> {
    let value = value.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(value.parse::<i64>().unwrap_or(if negative { i64::MIN } else { i64::MAX }))
}

fn saturating_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<SaturatingInt>::deserialize(deserializer)?.map(|n| n.0))
}

/// Normalized listing query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-indexed page
    pub page: u32,
    pub per_page: u32,
    pub sort_by: SortField,
    pub order: SortOrder,
    /// Filter on ingestion year
    pub year: Option<i32>,
    /// Filter on ingestion month (1-12)
    pub month: Option<u32>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            sort_by: SortField::default(),
            order: SortOrder::default(),
            year: None,
            month: None,
        }
    }
}

impl From<ListParams> for ListQuery {
    fn from(params: ListParams) -> Self {
        let page = params.page.unwrap_or(1).clamp(1, i64::from(u32::MAX)) as u32;
        let per_page = params
            .per_page
            .unwrap_or(i64::from(DEFAULT_PER_PAGE))
            .clamp(1, i64::from(MAX_PER_PAGE)) as u32;

        Self {
            page,
            per_page,
            sort_by: params
                .sort_by
                .as_deref()
                .and_then(SortField::parse)
                .unwrap_or_default(),
            order: params
                .order
                .as_deref()
                .and_then(SortOrder::parse)
                .unwrap_or_default(),
            year: params.year,
            month: params.month,
        }
    }
}

impl ListQuery {
    /// Converts back into query-string parameters (used by the API client)
    pub fn to_params(&self) -> ListParams {
        ListParams {
            page: Some(i64::from(self.page)),
            per_page: Some(i64::from(self.per_page)),
            sort_by: Some(self.sort_by.as_str().to_string()),
            order: Some(self.order.as_str().to_string()),
            year: self.year,
            month: self.month,
        }
    }

    /// Zero-based offset of the first item on this page
    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.per_page as usize)
    }
}

/// Pagination block of a list response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32, total_items: u64) -> Self {
        let per_page_nonzero = u64::from(per_page.max(1));
        let total_pages = total_items.div_ceil(per_page_nonzero);
        Self {
            page,
            per_page,
            total_items,
            total_pages,
            has_next_page: u64::from(page) < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// One page of results plus the pagination block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}
