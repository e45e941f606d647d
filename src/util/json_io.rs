
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// This will save a generic serializable struct to JSON, gzipped when the path asks for it.
/// # Arguments
/// * `data` - the data in memory
/// * `out_filename` - user provided path to write to
/// # Errors
/// * if opening or writing to the file throw errors
/// * if JSON serialization throws errors
pub fn save_json<T: serde::Serialize>(data: &T, out_filename: &Path) -> anyhow::Result<()> {
    let file: Box<dyn std::io::Write> = if out_filename.extension().unwrap_or_default() == "gz" {
        Box::new(
            flate2::write::GzEncoder::new(
                File::create(out_filename)?,
                flate2::Compression::best()
            )
        )
    } else {
        Box::new(File::create(out_filename)?)
    };
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .with_context(|| format!("Error while serializing {out_filename:?}:"))?;
    writer.flush()
        .with_context(|| format!("Error while flushing output to {out_filename:?}:"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_save_json() {
        let dir = tempfile::tempdir().unwrap();
        let out_fn = dir.path().join("settings.json");
        let data = vec!["RCN1".to_string(), "RCN2".to_string()];
        save_json(&data, &out_fn).unwrap();

        let reloaded: Vec<String> = serde_json::from_str(&std::fs::read_to_string(&out_fn).unwrap()).unwrap();
        assert_eq!(reloaded, data);
    }

    #[test]
    fn test_save_json_gz() {
        let dir = tempfile::tempdir().unwrap();
        let out_fn = dir.path().join("settings.json.gz");
        let data = vec![1, 2, 3];
        save_json(&data, &out_fn).unwrap();

        let mut decoder = flate2::read::MultiGzDecoder::new(File::open(&out_fn).unwrap());
        let mut contents = String::new();
        decoder.read_to_string(&mut contents).unwrap();
        let reloaded: Vec<i32> = serde_json::from_str(&contents).unwrap();
        assert_eq!(reloaded, data);
    }
}
