use std::path::Path;

const COMPRESSION_EXTENSIONS: [&str; 1] = [".gz"];
const SEQ_EXTENSIONS: [&str; 5] = [".fastq", ".fasta", ".fna", ".fq", ".fa"];

/// Removes a trailing compression extension from a file name.
pub fn strip_compression_extension(file_name: &str) -> &str {
    COMPRESSION_EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .unwrap_or(file_name)
}

/// Extracts sample identifier from a given sequence file path by removing common file extensions.
pub fn sample_id_from_filename(seq_file: &Path) -> String {
    let file_name = seq_file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let file_name = strip_compression_extension(&file_name);
    SEQ_EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .unwrap_or(file_name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_id_from_filename() {
        assert_eq!(sample_id_from_filename(Path::new("/data/round1.fastq.gz")), "round1");
        assert_eq!(sample_id_from_filename(Path::new("round2.fa")), "round2");
        assert_eq!(sample_id_from_filename(Path::new("round3.reads")), "round3.reads");
    }
}
