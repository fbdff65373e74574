//! Write the sync service's OpenAPI document to stdout as JSON.

use std::io::Write as _;

use color_eyre::eyre::{Context, Result};
use roster_sync::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<()> {
    color_eyre::install()?;
    let document = ApiDoc::openapi()
        .to_pretty_json()
        .wrap_err("failed to render OpenAPI document")?;
    writeln!(std::io::stdout().lock(), "{document}").wrap_err("failed to write document")?;
    Ok(())
}
