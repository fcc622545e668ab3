//! Channel identity resolution.

use tracing::debug;

use crate::api::StatusApi;
use crate::error::StatusError;
use crate::{StatusResult, CHANNEL_ID_PREFIX};

/// A resolved channel identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelIdentity {
    /// The identifier the user supplied.
    pub input_identifier: String,

    /// Canonical channel ID.
    pub canonical_channel_id: String,

    /// ID of the channel's "recent uploads" collection.
    pub uploads_collection_id: String,
}

/// Resolve a user-supplied identifier into a channel identity.
///
/// Identifiers carrying the canonical prefix are looked up by ID; anything
/// else is trimmed, stripped of an optional leading `@`, and looked up as a
/// handle. Exactly one remote round trip, no retries.
pub async fn resolve(api: &dyn StatusApi, identifier: &str) -> StatusResult<ChannelIdentity> {
    let resource = if identifier.starts_with(CHANNEL_ID_PREFIX) {
        debug!(identifier, "Resolving channel by ID");
        api.channel_by_id(identifier).await?
    } else {
        let handle = identifier.trim().trim_start_matches('@');
        debug!(handle, "Resolving channel by handle");
        api.channel_by_handle(handle).await?
    };

    let resource =
        resource.ok_or_else(|| StatusError::InvalidChannel(identifier.to_string()))?;

    match (resource.channel_id, resource.uploads_collection_id) {
        (Some(canonical_channel_id), Some(uploads_collection_id)) => Ok(ChannelIdentity {
            input_identifier: identifier.to_string(),
            canonical_channel_id,
            uploads_collection_id,
        }),
        _ => Err(StatusError::InvalidChannel(identifier.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChannelResource;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records which resolution path was taken.
    #[derive(Default)]
    struct DispatchApi {
        by_id: Mutex<Vec<String>>,
        by_handle: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StatusApi for DispatchApi {
        async fn channel_by_id(&self, channel_id: &str) -> StatusResult<Option<ChannelResource>> {
            self.by_id.lock().push(channel_id.to_string());
            Ok(Some(ChannelResource {
                channel_id: Some(channel_id.to_string()),
                uploads_collection_id: Some(format!("UU{}", &channel_id[2..])),
            }))
        }

        async fn channel_by_handle(&self, handle: &str) -> StatusResult<Option<ChannelResource>> {
            self.by_handle.lock().push(handle.to_string());
            Ok(Some(ChannelResource {
                channel_id: Some("UCresolved00000000000000".to_string()),
                uploads_collection_id: Some("UUresolved00000000000000".to_string()),
            }))
        }

        async fn latest_upload(&self, _: &str) -> StatusResult<Option<String>> {
            unreachable!("resolver never scans uploads")
        }

        async fn video_detail(&self, _: &str) -> StatusResult<Option<crate::VideoDetail>> {
            unreachable!("resolver never fetches videos")
        }
    }

    #[tokio::test]
    async fn canonical_prefix_dispatches_by_id() {
        let api = DispatchApi::default();
        let id = "UC0123456789abcdefghijkl";

        let identity = resolve(&api, id).await.unwrap();

        assert_eq!(api.by_id.lock().as_slice(), [id.to_string()]);
        assert!(api.by_handle.lock().is_empty());
        assert_eq!(identity.canonical_channel_id, id);
    }

    #[tokio::test]
    async fn handle_dispatches_by_handle_regardless_of_length() {
        let api = DispatchApi::default();

        // Same length as a canonical ID but no prefix: still the handle path.
        let long_handle = "xx0123456789abcdefghijkl";
        resolve(&api, long_handle).await.unwrap();

        assert!(api.by_id.lock().is_empty());
        assert_eq!(api.by_handle.lock().as_slice(), [long_handle.to_string()]);
    }

    #[tokio::test]
    async fn marker_and_whitespace_are_stripped_from_handles() {
        let api = DispatchApi::default();

        resolve(&api, " @somechannel ").await.unwrap();

        assert_eq!(api.by_handle.lock().as_slice(), ["somechannel".to_string()]);
    }

    #[tokio::test]
    async fn missing_resource_is_invalid_channel() {
        struct EmptyApi;

        #[async_trait]
        impl StatusApi for EmptyApi {
            async fn channel_by_id(&self, _: &str) -> StatusResult<Option<ChannelResource>> {
                Ok(None)
            }
            async fn channel_by_handle(&self, _: &str) -> StatusResult<Option<ChannelResource>> {
                Ok(Some(ChannelResource::default()))
            }
            async fn latest_upload(&self, _: &str) -> StatusResult<Option<String>> {
                unreachable!()
            }
            async fn video_detail(&self, _: &str) -> StatusResult<Option<crate::VideoDetail>> {
                unreachable!()
            }
        }

        let err = resolve(&EmptyApi, "UCmissing").await.unwrap_err();
        assert!(matches!(err, StatusError::InvalidChannel(_)));

        // A resource lacking both ID and uploads reference is also invalid.
        let err = resolve(&EmptyApi, "@partial").await.unwrap_err();
        assert!(matches!(err, StatusError::InvalidChannel(_)));
    }
}
