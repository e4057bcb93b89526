use texcompile_lib::Format;

/// Key layout (spec §4.4), all scoped under one configured bucket:
/// ```text
/// {src}/{chk}/{fmt}/status.json
/// {src}/{chk}/{fmt}/{src}.{ext}
/// {src}/{chk}/{fmt}/{src}.{ext}.log
/// ```
pub fn prefix(source_id: &str, checksum: &str, output_format: Format) -> String {
    format!("{source_id}/{checksum}/{output_format}")
}

pub fn status_key(source_id: &str, checksum: &str, output_format: Format) -> String {
    format!("{}/status.json", prefix(source_id, checksum, output_format))
}

pub fn artifact_key(source_id: &str, checksum: &str, output_format: Format) -> String {
    format!(
        "{}/{}.{}",
        prefix(source_id, checksum, output_format),
        source_id,
        output_format.ext()
    )
}

pub fn log_key(source_id: &str, checksum: &str, output_format: Format) -> String {
    format!("{}.log", artifact_key(source_id, checksum, output_format))
}

/// Reserved key used by `is_available`'s tiny PUT probe.
pub const PROBE_KEY: &str = "_texcompile_probe";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_match_spec_layout() {
        assert_eq!(
            status_key("54", "chk", Format::Pdf),
            "54/chk/pdf/status.json"
        );
        assert_eq!(artifact_key("54", "chk", Format::Pdf), "54/chk/pdf/54.pdf");
        assert_eq!(
            log_key("54", "chk", Format::Pdf),
            "54/chk/pdf/54.pdf.log"
        );
    }
}
