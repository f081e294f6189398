//! Configuration parsing and validation for the gateway
//!
//! This module handles command-line argument parsing and validation using clap.
//! Secrets are environment-sourced; the chat credential has no baked-in
//! default and is never logged.
use anyhow::anyhow;
use clap::Parser;
use std::fmt;
use url::Url;

#[derive(Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port on which the gateway will listen.
    #[arg(short = 'p', long, default_value_t = 3000)]
    pub port: u16,

    /// The port on which the metrics server will listen.
    #[arg(long, default_value_t = 9090)]
    pub metrics_port: u16,

    /// Whether to enable the metrics endpoint.
    #[arg(short = 'm', long, default_value_t = true)]
    pub metrics: bool,

    /// The prefix to use for metrics.
    #[arg(long, default_value = "switchyard")]
    pub metrics_prefix: String,

    /// Base URL of the OpenAI-compatible chat completion service.
    #[arg(
        long,
        env = "SWITCHYARD_CHAT_BASE_URL",
        default_value = "https://api.groq.com/openai/v1/"
    )]
    pub chat_base_url: Url,

    /// API key for the chat completion service.
    #[arg(long, env = "SWITCHYARD_CHAT_API_KEY", hide_env_values = true)]
    pub chat_api_key: String,

    /// Base URL of the summarization model hub.
    #[arg(
        long,
        env = "SWITCHYARD_HUB_BASE_URL",
        default_value = "https://api-inference.huggingface.co/"
    )]
    pub hub_base_url: Url,
}

impl Config {
    pub fn validate(mut self) -> Result<Self, anyhow::Error> {
        for url in [&mut self.chat_base_url, &mut self.hub_base_url] {
            if url.cannot_be_a_base() {
                return Err(anyhow!("'{url}' cannot be used as a base URL"));
            }
            // Url::join drops the final path segment unless the base ends in '/'
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
        }
        Ok(self)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("metrics_port", &self.metrics_port)
            .field("metrics", &self.metrics)
            .field("metrics_prefix", &self.metrics_prefix)
            .field("chat_base_url", &self.chat_base_url.as_str())
            .field("chat_api_key", &"<redacted>")
            .field("hub_base_url", &self.hub_base_url.as_str())
            .finish()
    }
}
