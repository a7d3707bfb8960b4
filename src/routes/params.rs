use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Optional pagination. Lists are returned whole unless `page` or `perPage` is given.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl Pagination {
    /// `(page, per_page, offset)`, or `None` for an unpaginated request.
    pub fn normalize(&self) -> Option<(u64, u64, u64)> {
        if self.page.is_none() && self.per_page.is_none() {
            return None;
        }
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        Some((page, per_page, offset))
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Price,
    Name,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    /// Case-insensitive match on name or description.
    pub q: Option<String>,
    pub category: Option<Uuid>,
    pub shop: Option<Uuid>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    #[param(value_type = Option<String>, example = "created_at")]
    pub sort_by: Option<ProductSortBy>,
    #[param(value_type = Option<String>, example = "desc")]
    pub sort_order: Option<SortOrder>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_parameters_means_whole_list() {
        assert_eq!(Pagination::default().normalize(), None);
    }

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(p.normalize(), Some((1, 100, 0)));

        let p = Pagination {
            page: Some(3),
            per_page: None,
        };
        assert_eq!(p.normalize(), Some((3, 20, 40)));
    }
}
