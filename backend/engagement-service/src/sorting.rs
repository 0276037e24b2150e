/// Typed sort whitelists for aggregation queries
///
/// Sort columns are mapped to fixed SQL identifiers; caller input never
/// reaches the query text directly.
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Required parameter; missing or unknown values are rejected
    pub fn parse_required(value: Option<&str>) -> Result<Self> {
        match value.map(|v| v.to_ascii_lowercase()).as_deref() {
            Some("asc") => Ok(SortDirection::Asc),
            Some("desc") => Ok(SortDirection::Desc),
            Some(other) => Err(AppError::BadRequest(format!(
                "unknown sort direction: {}",
                other
            ))),
            None => Err(AppError::BadRequest("sort direction is required".to_string())),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sortable columns for video listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSortField {
    CreatedAt,
    Title,
    Duration,
    Views,
}

impl VideoSortField {
    pub fn parse_required(value: Option<&str>) -> Result<Self> {
        match value {
            Some("created_at") => Ok(VideoSortField::CreatedAt),
            Some("title") => Ok(VideoSortField::Title),
            Some("duration") => Ok(VideoSortField::Duration),
            Some("views") => Ok(VideoSortField::Views),
            Some(other) => Err(AppError::BadRequest(format!(
                "unknown sort field: {}",
                other
            ))),
            None => Err(AppError::BadRequest("sort field is required".to_string())),
        }
    }

    /// Column or computed alias the ORDER BY clause uses
    pub fn as_sql(&self) -> &'static str {
        match self {
            VideoSortField::CreatedAt => "created_at",
            VideoSortField::Title => "title",
            VideoSortField::Duration => "duration",
            VideoSortField::Views => "views",
        }
    }
}

/// Sortable columns for comment listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSortField {
    CreatedAt,
    Likes,
}

impl CommentSortField {
    pub fn parse_required(value: Option<&str>) -> Result<Self> {
        match value {
            Some("created_at") => Ok(CommentSortField::CreatedAt),
            Some("likes") => Ok(CommentSortField::Likes),
            Some(other) => Err(AppError::BadRequest(format!(
                "unknown sort field: {}",
                other
            ))),
            None => Err(AppError::BadRequest("sort field is required".to_string())),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            CommentSortField::CreatedAt => "created_at",
            CommentSortField::Likes => "likes",
        }
    }
}
