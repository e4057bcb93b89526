use texcompile_lib::Reason;
use texcompile_runner::RunnerError;
use texcompile_source::SourceError;

/// Maps a Source Client error to a failure `Reason`. Classification is
/// single-site (spec §7): this is the only place that inspects a
/// `SourceError` variant.
pub fn classify_source_error(e: &SourceError) -> Reason {
    match e {
        SourceError::RequestUnauthorized(_) | SourceError::RequestForbidden(_) => {
            Reason::AuthError
        }
        SourceError::NotFound(_) => Reason::MissingSource,
        SourceError::ConnectionFailed(_)
        | SourceError::RequestFailed(_)
        | SourceError::Oversize(_)
        | SourceError::SecurityException(_)
        | SourceError::Io(_) => Reason::NetworkError,
        SourceError::UnsafePath(_) => Reason::InvalidSourceType,
    }
}

/// Maps a Converter Runner error to a failure `Reason` (spec §4.2 item 2).
pub fn classify_runner_error(e: &RunnerError) -> Reason {
    match e {
        RunnerError::CorruptedSource(_) => Reason::CorruptedSource,
        RunnerError::Docker(_) => Reason::Docker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_and_forbidden_both_classify_as_auth_error() {
        assert_eq!(
            classify_source_error(&SourceError::RequestUnauthorized("401".into())),
            Reason::AuthError
        );
        assert_eq!(
            classify_source_error(&SourceError::RequestForbidden("403".into())),
            Reason::AuthError
        );
    }

    #[test]
    fn not_found_classifies_as_missing_source() {
        assert_eq!(
            classify_source_error(&SourceError::NotFound("404".into())),
            Reason::MissingSource
        );
    }

    #[test]
    fn corrupted_source_is_preserved() {
        assert_eq!(
            classify_runner_error(&RunnerError::CorruptedSource("bad".into())),
            Reason::CorruptedSource
        );
    }
}
