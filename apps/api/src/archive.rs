use std::path::Path;

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client as S3Client;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to create bucket {bucket}: {message}")]
    CreateBucket { bucket: String, message: String },

    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to upload {key}: {message}")]
    Upload { key: String, message: String },
}

/// Archives uploaded CV files in an S3 (or MinIO) bucket.
#[derive(Clone)]
pub struct S3Archive {
    client: S3Client,
    bucket: String,
    region: String,
}

impl S3Archive {
    pub fn new(client: S3Client, bucket: String, region: String) -> Self {
        Self {
            client,
            bucket,
            region,
        }
    }

    /// Uploads a local file as `object_name`, creating the bucket on first use.
    /// Returns the `s3://bucket/key` URI.
    pub async fn upload_file(&self, path: &Path, object_name: &str) -> Result<String, ArchiveError> {
        self.ensure_bucket().await?;

        info!(
            "Uploading file {} to S3 bucket {} as {}",
            path.display(),
            self.bucket,
            object_name
        );

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| ArchiveError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(object_name)
            .body(body)
            .content_type("application/pdf")
            .send()
            .await
            .map_err(|e| ArchiveError::Upload {
                key: object_name.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let uri = s3_uri(&self.bucket, object_name);
        info!("File uploaded successfully to {uri}");
        Ok(uri)
    }

    async fn ensure_bucket(&self) -> Result<(), ArchiveError> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            return Ok(());
        }

        info!("Creating S3 bucket: {}", self.bucket);
        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if let Some(constraint) = location_constraint(&self.region) {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }
        request
            .send()
            .await
            .map_err(|e| ArchiveError::CreateBucket {
                bucket: self.bucket.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}

/// us-east-1 is the default location and rejects an explicit constraint.
fn location_constraint(region: &str) -> Option<BucketLocationConstraint> {
    (region != "us-east-1").then(|| BucketLocationConstraint::from(region))
}

fn s3_uri(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}
