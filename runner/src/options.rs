use texcompile_lib::Format;

/// Compilation options forwarded to the converter image's command line
/// (spec §4.3). `checksum` is passed as `-U` to force reproducible TeX-tree
/// resolution.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub source_id: String,
    pub checksum: String,
    pub output_format: Format,
    pub stamp_label: Option<String>,
    pub stamp_link: Option<String>,
    pub timeout_secs: u32,
    pub layout: String,
    pub verbose: bool,
    pub stamp_disabled: bool,
    pub dvips_passthrough: DvipsPassthrough,
    pub decryption_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DvipsPassthrough {
    pub unsafe_mode: bool,
    pub password: bool,
    pub decrypt: bool,
}

impl CompileOptions {
    pub fn new(source_id: impl Into<String>, checksum: impl Into<String>, output_format: Format) -> Self {
        Self {
            source_id: source_id.into(),
            checksum: checksum.into(),
            output_format,
            stamp_label: None,
            stamp_link: None,
            timeout_secs: 600,
            layout: "letter".to_string(),
            verbose: false,
            stamp_disabled: false,
            dvips_passthrough: DvipsPassthrough::default(),
            decryption_id: None,
        }
    }

    /// Builds the full flag vector, in the order listed by spec §4.3.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            "/autotex".to_string(),
            "-p".to_string(),
            self.source_id.clone(),
            "-f".to_string(),
            self.output_format.ext().to_string(),
        ];

        if let Some(label) = &self.stamp_label {
            args.push("-l".to_string());
            args.push(label.clone());
        }
        if let Some(link) = &self.stamp_link {
            args.push("-L".to_string());
            args.push(link.clone());
        }

        args.push("-T".to_string());
        args.push(self.timeout_secs.to_string());
        args.push("-t".to_string());
        args.push(self.layout.clone());

        // Suppress email notification; always on.
        args.push("-q".to_string());

        if self.verbose {
            args.push("-v".to_string());
        }
        if self.stamp_disabled {
            args.push("-s".to_string());
        }
        if self.dvips_passthrough.unsafe_mode {
            args.push("-u".to_string());
        }
        if self.dvips_passthrough.password {
            args.push("-P".to_string());
        }
        if self.dvips_passthrough.decrypt {
            args.push("-D".to_string());
        }
        if let Some(id) = &self.decryption_id {
            args.push("-d".to_string());
            args.push(id.clone());
        }

        args.push("-U".to_string());
        args.push(self.checksum.clone());

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_minimal_required_flags() {
        let opts = CompileOptions::new("54", "chk", Format::Pdf);
        let args = opts.to_args();
        assert_eq!(
            args,
            vec![
                "-S", "/autotex", "-p", "54", "-f", "pdf", "-T", "600", "-t", "letter", "-q",
                "-U", "chk",
            ]
        );
    }

    #[test]
    fn includes_stamp_flags_when_set() {
        let mut opts = CompileOptions::new("54", "chk", Format::Pdf);
        opts.stamp_label = Some("v1".to_string());
        opts.stamp_link = Some("https://example.com".to_string());
        let args = opts.to_args();
        assert!(args.windows(2).any(|w| w == ["-l", "v1"]));
        assert!(args.windows(2).any(|w| w == ["-L", "https://example.com"]));
    }

    #[test]
    fn includes_verbose_and_stamp_disable_flags() {
        let mut opts = CompileOptions::new("54", "chk", Format::Pdf);
        opts.verbose = true;
        opts.stamp_disabled = true;
        let args = opts.to_args();
        assert!(args.contains(&"-v".to_string()));
        assert!(args.contains(&"-s".to_string()));
    }

    #[test]
    fn includes_dvips_passthrough_and_decryption_id() {
        let mut opts = CompileOptions::new("54", "chk", Format::Ps);
        opts.dvips_passthrough = DvipsPassthrough {
            unsafe_mode: true,
            password: true,
            decrypt: true,
        };
        opts.decryption_id = Some("abc".to_string());
        let args = opts.to_args();
        assert!(args.contains(&"-u".to_string()));
        assert!(args.contains(&"-P".to_string()));
        assert!(args.contains(&"-D".to_string()));
        assert!(args.windows(2).any(|w| w == ["-d", "abc"]));
    }
}
