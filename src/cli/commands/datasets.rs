//! Dataset listing

use crate::config::Settings;
use crate::data::DataCatalog;
use anyhow::{Context, Result};

pub fn run_datasets_command(settings: &Settings) -> Result<()> {
    let catalog = DataCatalog::new(settings.data_dir.clone());
    let files = catalog
        .list_files()
        .with_context(|| format!("Failed to read {}", catalog.data_dir().display()))?;

    if files.is_empty() {
        println!("No datasets found in {}", catalog.data_dir().display());
    } else {
        for file in files {
            println!("{}", file);
        }
    }
    Ok(())
}
