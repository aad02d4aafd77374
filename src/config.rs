use crate::{
    models::{bucket::BucketRegion, translation::OutputFormat},
    services::{aps::ApsConfig, gateway::GatewaySettings},
};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::{env, fmt, str::FromStr, time::Duration};
use url::Url;

const DEFAULT_BASE_URL: &str = "https://developer.api.autodesk.com";
const DEFAULT_CHUNK_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub base_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub bucket: String,
    pub bucket_region: BucketRegion,
    pub output_format: OutputFormat,
    pub page_size: usize,
    pub upload_chunk_bytes: usize,
    pub upload_concurrency: usize,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
///
/// The client secret is only read from `APS_CLIENT_SECRET` so it never shows
/// up in process listings.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Model upload and translation gateway")]
pub struct Args {
    /// Host to bind to (overrides MODEL_GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MODEL_GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Platform API base URL (overrides APS_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Application client id (overrides APS_CLIENT_ID)
    #[arg(long)]
    pub client_id: Option<String>,

    /// Bucket holding uploaded models (overrides APS_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Region for bucket creation: US, EMEA or AUS (overrides APS_BUCKET_REGION)
    #[arg(long)]
    pub bucket_region: Option<String>,

    /// Maximum accepted upload size in bytes (overrides MODEL_GATEWAY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::resolve(args, |key| env::var(key).ok())
    }

    /// Merge CLI args over values looked up with `lookup`.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = lookup("MODEL_GATEWAY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_var(&lookup, "MODEL_GATEWAY_PORT")?.unwrap_or(3000);

        let client_id = args
            .client_id
            .or_else(|| lookup("APS_CLIENT_ID"))
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| anyhow!("APS_CLIENT_ID is not set"))?;
        let client_secret = lookup("APS_CLIENT_SECRET")
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| anyhow!("APS_CLIENT_SECRET is not set"))?;

        let base_url = args
            .base_url
            .or_else(|| lookup("APS_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let base_url =
            Url::parse(&base_url).with_context(|| format!("parsing base url `{}`", base_url))?;

        let bucket = args
            .bucket
            .or_else(|| lookup("APS_BUCKET"))
            .unwrap_or_else(|| derive_bucket_key(&client_id));

        let region = args
            .bucket_region
            .or_else(|| lookup("APS_BUCKET_REGION"))
            .unwrap_or_else(|| "US".into());
        let bucket_region = BucketRegion::parse(&region)
            .ok_or_else(|| anyhow!("unsupported bucket region `{}`", region))?;

        let output_format = match lookup("APS_OUTPUT_FORMAT") {
            Some(value) => OutputFormat::parse(&value)
                .ok_or_else(|| anyhow!("unsupported output format `{}`", value))?,
            None => OutputFormat::Svf,
        };

        let env_max_upload = parse_var(&lookup, "MODEL_GATEWAY_MAX_UPLOAD_BYTES")?;

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            base_url,
            client_id,
            client_secret,
            bucket,
            bucket_region,
            output_format,
            page_size: parse_var(&lookup, "MODEL_GATEWAY_PAGE_SIZE")?
                .unwrap_or(crate::services::gateway::DEFAULT_PAGE_SIZE),
            upload_chunk_bytes: parse_var(&lookup, "MODEL_GATEWAY_UPLOAD_CHUNK_BYTES")?
                .unwrap_or(DEFAULT_CHUNK_BYTES),
            upload_concurrency: parse_var(&lookup, "MODEL_GATEWAY_UPLOAD_CONCURRENCY")?
                .unwrap_or(3),
            max_upload_bytes: args
                .max_upload_bytes
                .or(env_max_upload)
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn aps(&self) -> ApsConfig {
        ApsConfig {
            base_url: self.base_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            upload_chunk_bytes: self.upload_chunk_bytes,
            upload_concurrency: self.upload_concurrency,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn gateway(&self) -> GatewaySettings {
        let mut settings = GatewaySettings::new(&self.bucket);
        settings.bucket_region = self.bucket_region;
        settings.page_size = self.page_size.max(1);
        settings.output_format = self.output_format;
        settings
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("bucket", &self.bucket)
            .field("bucket_region", &self.bucket_region)
            .field("output_format", &self.output_format)
            .field("page_size", &self.page_size)
            .field("upload_chunk_bytes", &self.upload_chunk_bytes)
            .field("upload_concurrency", &self.upload_concurrency)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

/// The bucket name used when none is configured: one per application.
pub fn derive_bucket_key(client_id: &str) -> String {
    format!("{}-basic-app", client_id.to_lowercase())
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(None),
    }
}
