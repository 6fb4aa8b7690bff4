//! Writers for the tables and JSON produced from a `ProcessResult`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use itertools::izip;

use crate::read_filter::ProcessResult;

/// Render the unique ratio, which is undefined when no read passed the filter.
pub fn format_ratio(ratio: f64) -> String {
    if ratio.is_nan() {
        "N/A".to_string()
    } else {
        format!("{:.4}", ratio)
    }
}

pub fn write_summary<W: Write>(writer: &mut W, result: &ProcessResult) -> Result<()> {
    let summary = &result.summary;
    writeln!(writer, "item\tvalue")?;
    writeln!(writer, "Total Entry Count\t{}", summary.num_total)?;
    writeln!(writer, "Uniquified Entry Count\t{}", summary.num_filtered)?;
    writeln!(writer, "Adapters Matched\t{}", summary.num_unique)?;
    writeln!(writer, "Unique Ratio\t{}", format_ratio(summary.unique_ratio))?;
    Ok(())
}

/// Write one row per kept read. The random region column is present only if the result
/// carries random regions.
pub fn write_sequences<W: Write>(writer: &mut W, result: &ProcessResult) -> Result<()> {
    let data = &result.data;
    match &data.random_regions {
        Some(regions) => {
            writeln!(writer, "id\tsequence\trandom_region\tduplicate")?;
            for (id, seq, region, dup) in izip!(0.., &data.seqs, regions, &data.dups) {
                writeln!(writer, "{}\t{}\t{}\t{}", id, seq, region, dup)?;
            }
        }
        None => {
            writeln!(writer, "id\tsequence\tduplicate")?;
            for (id, seq, dup) in izip!(0.., &data.seqs, &data.dups) {
                writeln!(writer, "{}\t{}\t{}", id, seq, dup)?;
            }
        }
    }
    Ok(())
}

/// Write `summary.tsv`, `sequences.tsv` and `result.json` to the output directory.
pub fn write_reports(out_dir: &Path, result: &ProcessResult) -> Result<()> {
    let create = |name: &str| -> Result<BufWriter<File>> {
        let path = out_dir.join(name);
        let file = File::create(&path).context(format!("Failed to create {}", path.display()))?;
        Ok(BufWriter::new(file))
    };

    let mut summary_writer = create("summary.tsv")?;
    write_summary(&mut summary_writer, result)?;
    summary_writer.flush()?;

    let mut seq_writer = create("sequences.tsv")?;
    write_sequences(&mut seq_writer, result)?;
    seq_writer.flush()?;

    let mut json_writer = create("result.json")?;
    serde_json::to_writer_pretty(&mut json_writer, result)?;
    json_writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter_config::FilterConfig;
    use crate::read_filter::process;
    use tempfile::tempdir;

    fn example_result() -> ProcessResult {
        let reads: Vec<String> = ["XAY", "XAY", "XGY", "XAUY"].iter().map(|s| s.to_string()).collect();
        process(&reads, &FilterConfig::new(1, 1, 3, "X", "Y"))
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(f64::NAN), "N/A");
        assert_eq!(format_ratio(0.5), "0.5000");
    }

    #[test]
    fn test_write_summary() -> Result<()> {
        let mut out = Vec::new();
        write_summary(&mut out, &example_result())?;

        let text = String::from_utf8(out)?;
        assert_eq!(
            text,
            "item\tvalue\nTotal Entry Count\t4\nUniquified Entry Count\t4\nAdapters Matched\t3\nUnique Ratio\t0.7500\n"
        );
        Ok(())
    }

    #[test]
    fn test_write_sequences() -> Result<()> {
        let mut out = Vec::new();
        write_sequences(&mut out, &example_result())?;
        assert_eq!(
            String::from_utf8(out)?,
            "id\tsequence\tduplicate\n0\tXAY\t2\n1\tXGY\t1\n2\tXAUY\t1\n"
        );

        let mut out = Vec::new();
        write_sequences(&mut out, &example_result().with_random_regions())?;
        assert_eq!(
            String::from_utf8(out)?,
            "id\tsequence\trandom_region\tduplicate\n0\tXAY\tA\t2\n1\tXGY\tG\t1\n2\tXAUY\tAU\t1\n"
        );
        Ok(())
    }

    #[test]
    fn test_write_reports() -> Result<()> {
        let dir = tempdir()?;
        write_reports(dir.path(), &example_result())?;

        for name in ["summary.tsv", "sequences.tsv", "result.json"] {
            assert!(dir.path().join(name).exists());
        }

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("result.json"))?)?;
        assert_eq!(json["summary"]["num_unique"], 3);
        assert_eq!(json["config"]["fwd_primer"], "X");
        Ok(())
    }
}
