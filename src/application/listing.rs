//! Turns untrusted listing parameters into a bounded store query.
//!
//! Nothing here rejects input. Unknown sort fields, unparseable numbers and
//! unrecognized visibility values all fall back to their defaults so a listing
//! request always produces a well-formed query.

use crate::application::pagination::PageRequest;
use crate::application::repos::{PostOrder, PostQueryFilter, SortField, SortOrder};
use crate::domain::{tags, types::Visibility};

/// Raw query-string parameters of a listing request.
#[derive(Debug, Clone, Default)]
pub struct ListingParams {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub visibility: Option<String>,
    pub tags: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListingParams {
    /// Collect decoded query pairs. A repeated key keeps its first value and
    /// unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut params.page,
                "per_page" => &mut params.per_page,
                "search" => &mut params.search,
                "category" => &mut params.category,
                "visibility" => &mut params.visibility,
                "tags" => &mut params.tags,
                "sort_by" => &mut params.sort_by,
                "sort_order" => &mut params.sort_order,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

/// Which request surface a listing comes from. The shapes differ only in how
/// visibility and authorship are constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingShape {
    /// Unauthenticated listing: only public posts, whatever the caller asks for.
    Public,
    /// Authenticated listing: visibility filter honoured, defaulting to public.
    Member,
    /// All posts of one author: every visibility level unless one is requested.
    Author(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub filter: PostQueryFilter,
    pub order: PostOrder,
    pub page: PageRequest,
}

impl ListingQuery {
    pub fn compose(params: &ListingParams, shape: ListingShape) -> Self {
        let requested_visibility = non_empty(params.visibility.as_deref())
            .and_then(|value| value.parse::<Visibility>().ok());

        let (visibility, author_id) = match shape {
            ListingShape::Public => (Some(Visibility::Public), None),
            ListingShape::Member => (
                Some(requested_visibility.unwrap_or(Visibility::Public)),
                None,
            ),
            ListingShape::Author(author_id) => (requested_visibility, Some(author_id)),
        };

        let filter = PostQueryFilter {
            search: text_filter(params.search.as_deref()),
            category: text_filter(params.category.as_deref()),
            visibility,
            tags: params
                .tags
                .as_deref()
                .map(|raw| tags::parse_list(&raw.replace('\0', "")))
                .unwrap_or_default(),
            author_id,
        };

        let order = PostOrder {
            field: params
                .sort_by
                .as_deref()
                .and_then(SortField::parse)
                .unwrap_or_default(),
            order: params
                .sort_order
                .as_deref()
                .and_then(SortOrder::parse)
                .unwrap_or_default(),
        };

        let page = PageRequest::from_params(params.page.as_deref(), params.per_page.as_deref());

        Self {
            filter,
            order,
            page,
        }
    }
}

pub const DEFAULT_POPULAR_TAGS_LIMIT: u32 = 50;
pub const MAX_POPULAR_TAGS_LIMIT: u32 = 100;

/// Parse the `limit` of a popular-tags request. Non-positive or unparseable
/// values use the default, large values are capped.
pub fn popular_tags_limit(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .map(|value| value.min(i64::from(MAX_POPULAR_TAGS_LIMIT)) as u32)
        .unwrap_or(DEFAULT_POPULAR_TAGS_LIMIT)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Text filters are bound into SQL, where NUL is not a valid character.
fn text_filter(value: Option<&str>) -> Option<String> {
    let cleaned = value?.replace('\0', "");
    non_empty(Some(&cleaned)).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pagination::{DEFAULT_PER_PAGE, MAX_PER_PAGE};

    fn params() -> ListingParams {
        ListingParams::default()
    }

    #[test]
    fn defaults_for_empty_request() {
        let query = ListingQuery::compose(&params(), ListingShape::Member);
        assert_eq!(query.filter.visibility, Some(Visibility::Public));
        assert_eq!(query.filter.search, None);
        assert!(query.filter.tags.is_empty());
        assert_eq!(query.order.field, SortField::CreatedAt);
        assert_eq!(query.order.order, SortOrder::Desc);
        assert_eq!(query.page.page(), 1);
        assert_eq!(query.page.per_page(), DEFAULT_PER_PAGE);
    }

    #[test]
    fn repeated_keys_keep_the_first_value() {
        let raw = ListingParams::from_pairs([
            ("page".to_string(), "3".to_string()),
            ("page".to_string(), "9".to_string()),
            ("per_page".to_string(), "5".to_string()),
            ("unknown".to_string(), "x".to_string()),
        ]);
        assert_eq!(raw.page.as_deref(), Some("3"));
        assert_eq!(raw.per_page.as_deref(), Some("5"));

        let query = ListingQuery::compose(&raw, ListingShape::Public);
        assert_eq!(query.page.page(), 3);
        assert_eq!(query.page.per_page(), 5);
    }

    #[test]
    fn nul_bytes_are_stripped_from_text_filters() {
        let mut raw = params();
        raw.search = Some("ru\0st".into());
        raw.category = Some("\0".into());
        raw.tags = Some("a\0b, \0".into());

        let query = ListingQuery::compose(&raw, ListingShape::Member);
        assert_eq!(query.filter.search.as_deref(), Some("rust"));
        assert_eq!(query.filter.category, None);
        assert_eq!(query.filter.tags, vec!["ab".to_string()]);
    }

    #[test]
    fn unknown_sort_field_falls_back_to_created_at() {
        let mut raw = params();
        raw.sort_by = Some("password_hash".into());
        raw.sort_order = Some("ASC".into());

        let query = ListingQuery::compose(&raw, ListingShape::Member);
        assert_eq!(query.order.field, SortField::CreatedAt);
        assert_eq!(query.order.order, SortOrder::Asc);
    }

    #[test]
    fn bad_sort_order_defaults_to_desc() {
        let mut raw = params();
        raw.sort_by = Some("likes_count".into());
        raw.sort_order = Some("sideways".into());

        let query = ListingQuery::compose(&raw, ListingShape::Member);
        assert_eq!(query.order.field, SortField::LikesCount);
        assert_eq!(query.order.order, SortOrder::Desc);
    }

    #[test]
    fn blank_filters_are_ignored() {
        let mut raw = params();
        raw.search = Some("   ".into());
        raw.category = Some("".into());
        raw.tags = Some(" , ,".into());

        let query = ListingQuery::compose(&raw, ListingShape::Member);
        assert_eq!(query.filter.search, None);
        assert_eq!(query.filter.category, None);
        assert!(query.filter.tags.is_empty());
    }

    #[test]
    fn search_is_trimmed() {
        let mut raw = params();
        raw.search = Some("  Rust ".into());
        let query = ListingQuery::compose(&raw, ListingShape::Member);
        assert_eq!(query.filter.search.as_deref(), Some("Rust"));
    }

    #[test]
    fn member_shape_honours_requested_visibility() {
        let mut raw = params();
        raw.visibility = Some("connections".into());
        let query = ListingQuery::compose(&raw, ListingShape::Member);
        assert_eq!(query.filter.visibility, Some(Visibility::Connections));

        raw.visibility = Some("bogus".into());
        let query = ListingQuery::compose(&raw, ListingShape::Member);
        assert_eq!(query.filter.visibility, Some(Visibility::Public));
    }

    #[test]
    fn public_shape_forces_public() {
        let mut raw = params();
        raw.visibility = Some("private".into());
        let query = ListingQuery::compose(&raw, ListingShape::Public);
        assert_eq!(query.filter.visibility, Some(Visibility::Public));
    }

    #[test]
    fn author_shape_spans_all_visibility_levels() {
        let query = ListingQuery::compose(&params(), ListingShape::Author(42));
        assert_eq!(query.filter.visibility, None);
        assert_eq!(query.filter.author_id, Some(42));

        let mut raw = params();
        raw.visibility = Some("private".into());
        let query = ListingQuery::compose(&raw, ListingShape::Author(42));
        assert_eq!(query.filter.visibility, Some(Visibility::Private));
    }

    #[test]
    fn popular_tags_limit_defaults_and_caps() {
        assert_eq!(popular_tags_limit(None), DEFAULT_POPULAR_TAGS_LIMIT);
        assert_eq!(popular_tags_limit(Some("five")), DEFAULT_POPULAR_TAGS_LIMIT);
        assert_eq!(popular_tags_limit(Some("0")), DEFAULT_POPULAR_TAGS_LIMIT);
        assert_eq!(popular_tags_limit(Some("5")), 5);
        assert_eq!(popular_tags_limit(Some("5000")), MAX_POPULAR_TAGS_LIMIT);
    }

    #[test]
    fn per_page_never_exceeds_cap() {
        let mut raw = params();
        raw.per_page = Some("1000".into());
        let query = ListingQuery::compose(&raw, ListingShape::Member);
        assert_eq!(query.page.per_page(), MAX_PER_PAGE);
    }
}
