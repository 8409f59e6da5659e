//! Helix request/response types.

use serde::{Deserialize, Serialize};

/// A discovered clip. The only contract the pipeline needs is that `url`
/// resolves to a downloadable media stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipRecord {
    /// Clip title
    pub title: String,
    /// Lifetime view count
    pub view_count: u64,
    /// Clip page URL
    pub url: String,
    /// Channel (broadcaster login) the clip belongs to
    pub channel: String,
}

/// OAuth client-credentials token response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersResponse {
    pub data: Vec<HelixUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HelixUser {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClipsResponse {
    pub data: Vec<HelixClip>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HelixClip {
    pub title: String,
    pub view_count: u64,
    pub url: String,
}

/// Sort clips by view count, most viewed first.
pub fn sort_by_views(clips: &mut [ClipRecord]) {
    clips.sort_by(|a, b| b.view_count.cmp(&a.view_count));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, views: u64) -> ClipRecord {
        ClipRecord {
            title: title.to_string(),
            view_count: views,
            url: format!("https://clips.twitch.tv/{}", title),
            channel: "test".to_string(),
        }
    }

    #[test]
    fn test_sort_by_views_descending() {
        let mut clips = vec![record("a", 10), record("b", 500), record("c", 42)];
        sort_by_views(&mut clips);
        let views: Vec<u64> = clips.iter().map(|c| c.view_count).collect();
        assert_eq!(views, vec![500, 42, 10]);
    }
}
