use std::env;

use anyhow::{bail, Result};
use reqwest::Url;

/// Container healthcheck probe: GET the given URL and exit non-zero unless
/// the service answers with a success status.
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(raw_url) = args.next() else {
        bail!("Missing URL argument");
    };

    let url = Url::parse(&raw_url)?;
    let response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        bail!("Request against {} failed with status {}", raw_url, response.status());
    }

    Ok(())
}
