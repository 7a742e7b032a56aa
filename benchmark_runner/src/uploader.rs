use std::path::Path;

use shared::s3::ObjectStore;
use tracing::{error, info};

/// Uploads the locally generated test batch under the same key names.
/// A failed transfer is logged and the batch keeps going; success is
/// observed only through logs and downstream invocations.
pub async fn upload_test_images(store: &impl ObjectStore, bucket: &str, count: usize) {
    for i in 0..count {
        let name = format!("test_{i}.jpg");

        match store.put_file(bucket, Path::new(&name), &name).await {
            Ok(()) => info!("Uploaded {name}"),
            Err(e) => error!("Error uploading {name}: {e}"),
        }
    }
}
