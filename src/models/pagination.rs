// src/models/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::store::SortOrder;

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Query string shared by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page number
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Offset of the page, capped at what Postgres accepts for `OFFSET`.
    pub fn skip(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit()).min(MAX_OFFSET)
    }

    pub fn order(&self) -> SortOrder {
        match self.order.as_deref() {
            Some(o) if o.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    /// Sort field if it is on the allow-list, otherwise `createdAt`.
    pub fn sort_field<'a>(&'a self, allowed: &[&'a str]) -> &'a str {
        match self.sort.as_deref() {
            Some(field) if allowed.contains(&field) => field,
            _ => "createdAt",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let params = ListParams { page: Some(0), limit: Some(1000), ..Default::default() };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), MAX_LIMIT);
        assert_eq!(params.skip(), 0);

        let params = ListParams { page: Some(3), ..Default::default() };
        assert_eq!(params.skip(), 2 * DEFAULT_LIMIT);
        assert_eq!(params.order(), SortOrder::Desc);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let params = ListParams { page: Some(u64::MAX), limit: Some(MAX_LIMIT), ..Default::default() };
        assert_eq!(params.skip(), i64::MAX as u64);
        assert!(i64::try_from(params.skip()).is_ok());
    }

    #[test]
    fn unknown_sort_fields_fall_back_to_created_at() {
        let params = ListParams { sort: Some("passwordHash".into()), ..Default::default() };
        assert_eq!(params.sort_field(&["name"]), "createdAt");

        let params = ListParams { sort: Some("name".into()), order: Some("ASC".into()), ..Default::default() };
        assert_eq!(params.sort_field(&["name"]), "name");
        assert_eq!(params.order(), SortOrder::Asc);
    }
}
