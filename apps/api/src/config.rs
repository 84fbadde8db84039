use anyhow::{bail, Context, Result};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Every value has a default except `OPENAI_API_KEY`, which is required
/// once `USE_OPENAI=true`.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_name: String,
    pub port: u16,
    pub rust_log: String,

    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: String,

    pub s3_bucket: String,
    pub s3_endpoint: Option<String>,
    pub s3_archive_enabled: bool,

    pub bedrock_model_id: String,
    pub bedrock_embedding_model: String,

    pub use_openai: bool,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_embedding_model: String,
    pub openai_base_url: String,

    pub chroma_url: String,
    pub chroma_tenant: String,
    pub chroma_database: String,
    pub collection_name: String,

    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests never touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let use_openai = parse_bool(get("USE_OPENAI").as_deref(), false)
            .context("USE_OPENAI must be true or false")?;
        let openai_api_key = get("OPENAI_API_KEY");
        if use_openai && openai_api_key.is_none() {
            bail!("USE_OPENAI=true requires OPENAI_API_KEY to be set");
        }

        Ok(Config {
            project_name: or("PROJECT_NAME", "CV Assistant API"),
            port: match get("PORT") {
                Some(p) => p
                    .parse::<u16>()
                    .context("PORT must be a valid port number")?,
                None => DEFAULT_PORT,
            },
            rust_log: or("RUST_LOG", "info"),

            aws_access_key_id: get("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            aws_region: or("AWS_REGION", "us-east-1"),

            s3_bucket: or("S3_BUCKET_NAME", "cv-assistant-bucket"),
            s3_endpoint: get("S3_ENDPOINT"),
            s3_archive_enabled: parse_bool(get("ENABLE_S3_ARCHIVE").as_deref(), true)
                .context("ENABLE_S3_ARCHIVE must be true or false")?,

            bedrock_model_id: or(
                "BEDROCK_MODEL_ID",
                "anthropic.claude-3-sonnet-20240229-v1:0",
            ),
            bedrock_embedding_model: or("BEDROCK_EMBEDDING_MODEL", "amazon.titan-embed-text-v1"),

            use_openai,
            openai_api_key,
            openai_model: or("OPENAI_MODEL", "gpt-4"),
            openai_embedding_model: or("OPENAI_EMBEDDING_MODEL", "text-embedding-ada-002"),
            openai_base_url: or("OPENAI_BASE_URL", "https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),

            chroma_url: or("CHROMA_URL", "http://localhost:8000")
                .trim_end_matches('/')
                .to_string(),
            chroma_tenant: or("CHROMA_TENANT", "default_tenant"),
            chroma_database: or("CHROMA_DATABASE", "default_database"),
            collection_name: or("COLLECTION_NAME", "cv_embeddings"),

            max_upload_bytes: match get("MAX_UPLOAD_BYTES") {
                Some(v) => v
                    .parse::<usize>()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?,
                None => DEFAULT_MAX_UPLOAD_BYTES,
            },
        })
    }

    /// Static credentials are only used when both halves are present.
    pub fn static_aws_credentials(&self) -> Option<(&str, &str)> {
        match (&self.aws_access_key_id, &self.aws_secret_access_key) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

fn parse_bool(value: Option<&str>, default: bool) -> Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => bail!("unrecognised boolean '{other}'"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_any_variables() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.aws_region, "us-east-1");
        assert_eq!(config.collection_name, "cv_embeddings");
        assert_eq!(config.bedrock_embedding_model, "amazon.titan-embed-text-v1");
        assert!(!config.use_openai);
        assert!(config.s3_archive_enabled);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_use_openai_is_case_insensitive() {
        let config = config_from(&[("USE_OPENAI", "TRUE"), ("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert!(config.use_openai);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_use_openai_without_key_is_rejected() {
        let err = config_from(&[("USE_OPENAI", "true")]).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(config_from(&[("PORT", "not-a-port")]).is_err());
    }

    #[test]
    fn test_trailing_slashes_are_trimmed_from_urls() {
        let config = config_from(&[
            ("CHROMA_URL", "http://chroma:8000/"),
            ("OPENAI_BASE_URL", "https://proxy.local/v1/"),
        ])
        .unwrap();
        assert_eq!(config.chroma_url, "http://chroma:8000");
        assert_eq!(config.openai_base_url, "https://proxy.local/v1");
    }

    #[test]
    fn test_static_credentials_need_both_halves() {
        let only_id = config_from(&[("AWS_ACCESS_KEY_ID", "AKIA")]).unwrap();
        assert!(only_id.static_aws_credentials().is_none());

        let both = config_from(&[
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ])
        .unwrap();
        assert_eq!(both.static_aws_credentials(), Some(("AKIA", "secret")));
    }

    #[test]
    fn test_archive_can_be_disabled() {
        let config = config_from(&[("ENABLE_S3_ARCHIVE", "false")]).unwrap();
        assert!(!config.s3_archive_enabled);
    }
}
