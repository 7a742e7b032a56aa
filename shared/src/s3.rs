use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use aws_smithy_http::byte_stream::ByteStream;

/// Seam over the object store so upload flows can be exercised without AWS.
#[async_trait]
pub trait ObjectStore {
    async fn put_file(&self, bucket: &str, path: &Path, key: &str) -> Result<()>;
}

#[async_trait]
impl ObjectStore for aws_sdk_s3::Client {
    async fn put_file(&self, bucket: &str, path: &Path, key: &str) -> Result<()> {
        let body = ByteStream::from_path(path).await?;

        self.put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await?;

        Ok(())
    }
}
