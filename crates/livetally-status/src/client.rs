//! Remote status API client.

use serde::Deserialize;
use tracing::{debug, instrument, trace};
use url::Url;

use async_trait::async_trait;

use crate::api::{ChannelResource, StatusApi, VideoDetail};
use crate::error::StatusError;
use crate::StatusResult;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3/";

/// YouTube Data API v3 client.
///
/// Holds an opaque API key; there is no OAuth flow. Each trait method is
/// exactly one remote round trip.
pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: String,
}

impl YouTubeClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Build a request URL for the given API resource.
    fn endpoint(&self, resource: &str, params: &[(&str, &str)]) -> StatusResult<Url> {
        let mut url = Url::parse(API_BASE)
            .and_then(|base| base.join(resource))
            .map_err(|e| StatusError::Unexpected(format!("Bad endpoint URL: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            for (name, value) in params {
                query.append_pair(name, value);
            }
            query.append_pair("key", &self.api_key);
        }

        Ok(url)
    }

    /// Perform a GET and deserialize the response, mapping HTTP failures
    /// into the error taxonomy.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: Url) -> StatusResult<T> {
        trace!(path = url.path(), "API request");

        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        // Classify the failure from the status code and the API's own
        // error reason before giving up and calling it unexpected.
        let body = response.text().await.unwrap_or_default();
        let reason = parse_error_reason(&body);

        debug!(%status, reason = reason.as_deref().unwrap_or("-"), "API error response");

        Err(classify_failure(status, reason, body))
    }
}

/// Map an HTTP failure to the shared taxonomy.
fn classify_failure(
    status: reqwest::StatusCode,
    reason: Option<String>,
    body: String,
) -> StatusError {
    match reason.as_deref() {
        Some("quotaExceeded") | Some("dailyLimitExceeded") | Some("rateLimitExceeded") => {
            return StatusError::QuotaExceeded(status.to_string());
        }
        Some("keyInvalid") | Some("keyExpired") => {
            return StatusError::InvalidCredential(status.to_string());
        }
        _ => {}
    }

    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            StatusError::InvalidCredential(status.to_string())
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => StatusError::QuotaExceeded(status.to_string()),
        _ => StatusError::Unexpected(format!("{status}: {body}")),
    }
}

/// Extract the first error reason string from an API error body.
fn parse_error_reason(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        #[serde(default)]
        errors: Vec<ErrorItem>,
    }

    #[derive(Deserialize)]
    struct ErrorItem {
        reason: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()?
        .error
        .errors
        .into_iter()
        .next()?
        .reason
}

// Response DTOs. Only the fields the monitor depends on are modeled.

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default)]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    id: Option<String>,
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    snippet: Option<VideoSnippet>,
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveStreamingDetails {
    actual_start_time: Option<String>,
    actual_end_time: Option<String>,
    concurrent_viewers: Option<String>,
}

impl From<ChannelItem> for ChannelResource {
    fn from(item: ChannelItem) -> Self {
        Self {
            channel_id: item.id,
            uploads_collection_id: item
                .content_details
                .and_then(|d| d.related_playlists)
                .and_then(|p| p.uploads),
        }
    }
}

impl From<VideoItem> for VideoDetail {
    fn from(item: VideoItem) -> Self {
        let details = item.live_streaming_details;
        Self {
            title: item.snippet.and_then(|s| s.title).unwrap_or_default(),
            concurrent_viewers: details
                .as_ref()
                .and_then(|d| d.concurrent_viewers.as_deref())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            actual_start_time: details.as_ref().and_then(|d| d.actual_start_time.clone()),
            actual_end_time: details.and_then(|d| d.actual_end_time),
        }
    }
}

#[async_trait]
impl StatusApi for YouTubeClient {
    #[instrument(name = "channel_by_id", skip(self))]
    async fn channel_by_id(&self, channel_id: &str) -> StatusResult<Option<ChannelResource>> {
        let url = self.endpoint(
            "channels",
            &[("part", "contentDetails"), ("id", channel_id)],
        )?;
        let response: ListResponse<ChannelItem> = self.get(url).await?;
        Ok(response.items.into_iter().next().map(Into::into))
    }

    #[instrument(name = "channel_by_handle", skip(self))]
    async fn channel_by_handle(&self, handle: &str) -> StatusResult<Option<ChannelResource>> {
        let url = self.endpoint(
            "channels",
            &[("part", "contentDetails"), ("forHandle", handle)],
        )?;
        let response: ListResponse<ChannelItem> = self.get(url).await?;
        Ok(response.items.into_iter().next().map(Into::into))
    }

    #[instrument(name = "latest_upload", skip(self))]
    async fn latest_upload(&self, uploads_collection_id: &str) -> StatusResult<Option<String>> {
        let url = self.endpoint(
            "playlistItems",
            &[
                ("part", "contentDetails"),
                ("playlistId", uploads_collection_id),
                ("maxResults", "1"),
            ],
        )?;
        let response: ListResponse<PlaylistItem> = self.get(url).await?;
        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.content_details)
            .and_then(|details| details.video_id))
    }

    #[instrument(name = "video_detail", skip(self))]
    async fn video_detail(&self, video_id: &str) -> StatusResult<Option<VideoDetail>> {
        let url = self.endpoint(
            "videos",
            &[("part", "snippet,liveStreamingDetails"), ("id", video_id)],
        )?;
        let response: ListResponse<VideoItem> = self.get(url).await?;
        Ok(response.items.into_iter().next().map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_reason_maps_to_quota_exceeded() {
        let body = r#"{"error":{"errors":[{"reason":"quotaExceeded"}]}}"#;
        let err = classify_failure(
            reqwest::StatusCode::FORBIDDEN,
            parse_error_reason(body),
            body.to_string(),
        );
        assert!(matches!(err, StatusError::QuotaExceeded(_)));
    }

    #[test]
    fn key_invalid_maps_to_invalid_credential() {
        let body = r#"{"error":{"errors":[{"reason":"keyInvalid"}]}}"#;
        let err = classify_failure(
            reqwest::StatusCode::BAD_REQUEST,
            parse_error_reason(body),
            body.to_string(),
        );
        assert!(matches!(err, StatusError::InvalidCredential(_)));
    }

    #[test]
    fn bare_forbidden_maps_to_invalid_credential() {
        let err = classify_failure(reqwest::StatusCode::FORBIDDEN, None, String::new());
        assert!(matches!(err, StatusError::InvalidCredential(_)));
    }

    #[test]
    fn unknown_status_maps_to_unexpected() {
        let err = classify_failure(reqwest::StatusCode::BAD_GATEWAY, None, String::new());
        assert!(matches!(err, StatusError::Unexpected(_)));
    }

    #[test]
    fn viewer_count_parses_from_string_field() {
        let item = VideoItem {
            snippet: Some(VideoSnippet {
                title: Some("Q&A".into()),
            }),
            live_streaming_details: Some(LiveStreamingDetails {
                actual_start_time: Some("2026-01-01T00:00:00Z".into()),
                actual_end_time: None,
                concurrent_viewers: Some("42".into()),
            }),
        };

        let detail: VideoDetail = item.into();
        assert_eq!(detail.concurrent_viewers, 42);
        assert!(detail.is_live());
        assert_eq!(detail.title, "Q&A");
    }
}
