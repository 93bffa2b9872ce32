use derive_more::Display;

use crate::Stage;

#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A reflected type has no host-side representation.
    #[display(fmt = "unsupported type in {}: {}", context, detail)]
    UnsupportedType { context: String, detail: String },
    /// Declared offsets or strides cannot be reproduced on the host.
    #[display(fmt = "layout error in {}: {}", context, detail)]
    LayoutError { context: String, detail: String },
    /// Two stages disagree about a descriptor binding.
    #[display(
        fmt = "binding conflict at set {} binding {} ({} stage): {}",
        set, binding, stage, detail
    )]
    BindingConflict { set: u32, binding: u32, stage: Stage, detail: String },
    #[display(fmt = "module {} has no entry point", module)]
    MissingEntryPoint { module: usize },
    #[display(fmt = "unsupported stage: {}", stage)]
    UnsupportedStage { stage: String },
    /// The reflector handed back inconsistent data.
    #[display(fmt = "invalid module: {}", detail)]
    InvalidModule { detail: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {}

impl Error {
    pub(crate) fn unsupported(
        context: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::UnsupportedType {
            context: context.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn layout(
        context: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::LayoutError {
            context: context.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidModule { detail: detail.into() }
    }

    pub fn is_layout_error(&self) -> bool {
        matches!(self, Self::LayoutError { .. })
    }

    pub fn is_unsupported_type(&self) -> bool {
        matches!(self, Self::UnsupportedType { .. })
    }
}
