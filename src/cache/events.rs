//! Content mutations that invalidate aggregate views.

/// What happened to the post set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PostCreated { post_id: i64 },
    PostLiked { post_id: i64 },
}

impl EventKind {
    /// Stable label used in logs and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::PostCreated { .. } => "post_created",
            EventKind::PostLiked { .. } => "post_liked",
        }
    }

    pub fn post_id(&self) -> i64 {
        match self {
            EventKind::PostCreated { post_id } | EventKind::PostLiked { post_id } => *post_id,
        }
    }
}
