use derive_more::*;

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ShaderParseErrorKind {
    /// The byte stream is not a valid SPIR-V module.
    #[display(fmt = "invalid module")]
    InvalidModule,
    /// A library limitation has been exceeded, such as an array length.
    #[display(fmt = "limit exceeded")]
    LimitExceeded,
    /// This parser is incapable of parsing the current module.
    #[display(fmt = "unsupported module")]
    UnsupportedModule,
}

#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display(fmt = "{}: {}", kind, detail)]
pub struct ShaderParseError {
    kind: ErrorKind,
    detail: String,
}

pub type ErrorKind = ShaderParseErrorKind;
pub type Error = ShaderParseError;
pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {}

impl Error {
    pub(crate) fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }

    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidModule, detail)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<Error> for autoshader::Error {
    fn from(err: Error) -> Self {
        autoshader::Error::InvalidModule { detail: err.to_string() }
    }
}
