use thiserror::Error;

pub type CvResult<T, E = CvError> = Result<T, E>;

/// Error taxonomy for the graph core and the driver around it.
///
/// `Scope` and `Rda` are invariant violations and always fatal. `Parse` is
/// fatal only under `strict_parse`; `Cfg` problems are normally reported as
/// diagnostics in the record-stream trailer and only show up here when the
/// caller asks for hard failure.
#[derive(Debug, Error)]
pub enum CvError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("grammar error: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("scope invariant violated: {0}")]
    Scope(String),

    #[error("control-flow error: {0}")]
    Cfg(String),

    #[error("reaching-definitions fixed point did not converge: {0}")]
    Rda(String),

    #[error("{0}")]
    Msg(String),
}

impl From<&str> for CvError {
    fn from(s: &str) -> Self {
        CvError::Msg(s.to_owned())
    }
}

impl From<String> for CvError {
    fn from(s: String) -> Self {
        CvError::Msg(s)
    }
}

#[test]
fn io_conversion_retains_message() {
    let e = std::io::Error::other("boom!");
    let cv: CvError = e.into();
    assert!(matches!(cv, CvError::Io(_)));
    assert!(cv.to_string().contains("boom"));
}

#[test]
fn simple_string_into_msg() {
    let cv: CvError = "plain msg".into();
    assert!(matches!(cv, CvError::Msg(s) if s == "plain msg"));
}

#[test]
fn scope_errors_name_the_invariant() {
    let cv = CvError::Scope("pop on empty scope stack".into());
    assert!(cv.to_string().contains("scope invariant"));
}
