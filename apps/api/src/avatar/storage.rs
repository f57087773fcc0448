use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;

/// Object storage for profile avatars.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;

    fn public_url(&self, key: &str) -> String;
}

/// Object key for a user's avatar. One object per user; the extension
/// follows the uploaded type.
pub fn avatar_key(user_id: uuid::Uuid, ext: &str) -> String {
    format!("avatars/{user_id}/avatar.{ext}")
}

/// S3 / MinIO backed [`AvatarStore`].
pub struct S3AvatarStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl S3AvatarStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base: String) -> Self {
        Self {
            client,
            bucket,
            public_base,
        }
    }
}

#[async_trait]
impl AvatarStore for S3AvatarStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .cache_control("max-age=3600")
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Uploaded avatar to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 delete failed: {e}")))?;

        info!("Deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_key_layout() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            avatar_key(id, "png"),
            "avatars/00000000-0000-0000-0000-000000000000/avatar.png"
        );
    }
}
