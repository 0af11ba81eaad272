//! Conversions from application results to wire types.

use postline_api_types::{PaginationView, PostListResponse, PostView, TagCountView};

use crate::application::pagination::PageMeta;
use crate::application::posts::{PostEntry, PostListing};
use crate::domain::tags::TagCount;

pub fn post_view(entry: PostEntry) -> PostView {
    let PostEntry {
        record,
        author_name,
    } = entry;

    PostView {
        id: record.id,
        title: record.title,
        content: record.body,
        media_url: record.media_url,
        user_id: record.author_id,
        category: record.category,
        tags: record.tags,
        visibility: record.visibility,
        likes_count: record.counters.likes,
        views_count: record.counters.views,
        comments_count: record.counters.comments,
        created_at: record.created_at,
        updated_at: record.updated_at,
        user: author_name,
    }
}

pub fn pagination_view(meta: PageMeta) -> PaginationView {
    PaginationView {
        page: meta.page,
        per_page: meta.per_page,
        total: meta.total,
        pages: meta.pages,
        has_next: meta.has_next,
        has_prev: meta.has_prev,
        next_num: meta.next_num,
        prev_num: meta.prev_num,
    }
}

pub fn listing_response(listing: PostListing) -> PostListResponse {
    PostListResponse {
        posts: listing.entries.into_iter().map(post_view).collect(),
        pagination: pagination_view(listing.meta),
    }
}

pub fn tag_count_view(count: TagCount) -> TagCountView {
    TagCountView {
        tag: count.tag,
        count: count.count,
    }
}
