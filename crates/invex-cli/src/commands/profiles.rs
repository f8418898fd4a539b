//! Profiles command - list the supported vendor layouts.

use clap::Args;
use console::style;
use invex_core::Profile;

/// Arguments for the profiles command.
#[derive(Args)]
pub struct ProfilesArgs {}

pub async fn run(_args: ProfilesArgs) -> anyhow::Result<()> {
    println!("{}", style("Supported vendor profiles:").bold());
    for profile in Profile::all() {
        let source = if profile.needs_ocr() {
            "scanned (OCR)"
        } else {
            "text layer"
        };
        println!("  {:8} {}", style(profile.name()).green(), source);
    }
    Ok(())
}
