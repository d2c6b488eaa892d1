use std::fs;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    // Crate identifier is the package name with '-' replaced by '_'.
    let doc = dataset_portal::docs::build_openapi(8000)?;
    let s = serde_json::to_string_pretty(&doc)?;
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("dataset-portal-openapi.json"));
    fs::write(&path, s)?;
    println!("wrote {}", path.display());
    Ok(())
}
