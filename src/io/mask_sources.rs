use crate::core::mask::{BadWaterRegions, ObstructionPoints};
use crate::types::{ImageryError, ImageryResult, Mask};
use std::path::Path;

/// Read every `*.json` file in `dir`, each a list of `[row, col]` pairs
pub fn load_obstruction_points<P: AsRef<Path>>(dir: P) -> ImageryResult<ObstructionPoints> {
    let dir = dir.as_ref();
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    paths.sort();

    let mut points = Vec::new();
    for path in paths {
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if !path.is_file() || !is_json {
            log::warn!("Skipping non-JSON entry {}", path.display());
            continue;
        }

        let content = std::fs::read_to_string(&path)?;
        let pairs: Vec<[usize; 2]> = serde_json::from_str(&content)?;
        log::debug!("{} obstruction point(s) in {}", pairs.len(), path.display());
        points.extend(pairs.into_iter().map(|[row, col]| (row, col)));
    }

    log::info!("Loaded {} obstruction point(s) from {}", points.len(), dir.display());
    Ok(ObstructionPoints::new(points))
}

/// Read a clean-water reference mask stored as a serialized boolean ndarray
pub fn load_bad_water_regions<P: AsRef<Path>>(path: P) -> ImageryResult<BadWaterRegions> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let clean_water: Mask = serde_json::from_str(&content)?;
    if clean_water.is_empty() {
        return Err(ImageryError::InvalidFormat(format!(
            "clean-water mask in {} is empty",
            path.display()
        )));
    }
    Ok(BadWaterRegions::new(clean_water))
}
