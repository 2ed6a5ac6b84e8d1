//! Parameter persistence: the stored settings survive restarts as a JSON file.

use std::fs;
use std::path::Path;

use polymux_core::MemoryParamStore;

use crate::Result;

/// Load parameters from `path`, or the defaults if the file does not exist yet.
pub fn load_params(path: &Path) -> Result<MemoryParamStore> {
    if !path.exists() {
        tracing::debug!("No parameter file at {}, using defaults", path.display());
        return Ok(MemoryParamStore::default());
    }

    let text = fs::read_to_string(path)?;
    let params: MemoryParamStore = serde_json::from_str(&text)?;
    params.validate()?;
    Ok(params)
}

pub fn save_params(path: &Path, params: &MemoryParamStore) -> Result<()> {
    let text = serde_json::to_string_pretty(params)?;
    fs::write(path, text)?;
    tracing::debug!("Saved parameters to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use polymux_core::{ParamId, ParamStore};

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let params = load_params(&dir.path().join("polymux.json")).unwrap();
        assert_eq!(params, MemoryParamStore::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polymux.json");
        let params = MemoryParamStore::default()
            .with(ParamId::Polyphony, 9)
            .unwrap();

        save_params(&path, &params).unwrap();
        let loaded = load_params(&path).unwrap();
        assert_eq!(loaded.get(ParamId::Polyphony), 9);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polymux.json");
        fs::write(&path, r#"{ "input_channel": 3 }"#).unwrap();

        let loaded = load_params(&path).unwrap();
        assert_eq!(loaded.get(ParamId::InputChannel), 3);
        assert_eq!(loaded.get(ParamId::Polyphony), 4);
    }

    #[test]
    fn test_out_of_range_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polymux.json");
        fs::write(&path, r#"{ "polyphony": 30 }"#).unwrap();

        assert!(matches!(
            load_params(&path),
            Err(Error::Core(polymux_core::Error::ParamOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_malformed_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polymux.json");
        fs::write(&path, "polyphony = 3").unwrap();

        assert!(matches!(load_params(&path), Err(Error::Json(_))));
    }
}
