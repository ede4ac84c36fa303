//! Run one transaction.

use anyhow::{Context, Result};
use changeq_sync_client::{HttpTransport, Method, StaticTarget, SyncOptions, Syncer};
use serde_json::Value;

/// Arguments of the `request` command.
#[derive(Debug, Clone)]
pub struct RequestArgs {
    pub method: Method,
    pub url: String,
    pub data: Option<String>,
    pub delay_ms: Option<u64>,
    pub wrap: Option<String>,
}

/// Run the request command and render the settled outcome.
pub async fn run<T: HttpTransport>(syncer: &Syncer<T>, args: RequestArgs) -> Result<String> {
    let body = match &args.data {
        Some(raw) => serde_json::from_str(raw).context("--data is not valid JSON")?,
        None => Value::Null,
    };
    let target = StaticTarget::new(args.url.clone()).with_body(body);

    let mut options = SyncOptions::new();
    if let Some(ms) = args.delay_ms {
        options = options.with_delay_ms(ms);
    }
    if let Some(key) = &args.wrap {
        options = options.with_wrap_key(key.clone());
    }

    let settled = syncer.transact(args.method, &target, options).await;
    let success = settled
        .outcome
        .with_context(|| format!("{} {} failed", args.method, args.url))?;

    let mut output = format!(
        "{} {}: {}",
        args.method,
        args.url,
        settled.event.status().unwrap_or_default()
    );
    if let Some(data) = success.data {
        output.push('\n');
        output.push_str(&serde_json::to_string_pretty(&data)?);
    }
    Ok(output)
}
