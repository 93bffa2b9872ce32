use bitflags::bitflags;
use derive_more::Display;

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Stage {
    #[display(fmt = "vertex")]
    Vertex,
    #[display(fmt = "tessellation control")]
    TessControl,
    #[display(fmt = "tessellation evaluation")]
    TessEval,
    #[display(fmt = "geometry")]
    Geometry,
    #[display(fmt = "fragment")]
    Fragment,
    #[display(fmt = "compute")]
    Compute,
    #[display(fmt = "kernel")]
    Kernel,
}

bitflags! {
    /// Bit values match `VkShaderStageFlagBits` for the graphics and
    /// compute stages.
    #[derive(Default)]
    pub struct StageFlags: u32 {
        const VERTEX = 0x1;
        const TESS_CONTROL = 0x2;
        const TESS_EVAL = 0x4;
        const GEOMETRY = 0x8;
        const FRAGMENT = 0x10;
        const COMPUTE = 0x20;
        const KERNEL = 0x8000_0000;
    }
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Vertex,
        Stage::TessControl,
        Stage::TessEval,
        Stage::Geometry,
        Stage::Fragment,
        Stage::Compute,
        Stage::Kernel,
    ];

    /// Short suffix used to tell apart same-named items from different
    /// modules.
    pub fn postfix(self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::TessControl => "tesc",
            Self::TessEval => "tese",
            Self::Geometry => "geom",
            Self::Fragment => "frag",
            Self::Compute => "comp",
            Self::Kernel => "krnl",
        }
    }

    pub fn flag(self) -> StageFlags {
        match self {
            Self::Vertex => StageFlags::VERTEX,
            Self::TessControl => StageFlags::TESS_CONTROL,
            Self::TessEval => StageFlags::TESS_EVAL,
            Self::Geometry => StageFlags::GEOMETRY,
            Self::Fragment => StageFlags::FRAGMENT,
            Self::Compute => StageFlags::COMPUTE,
            Self::Kernel => StageFlags::KERNEL,
        }
    }

    /// The `vk::ShaderStageFlags` constant naming this stage.
    pub fn vk_flag_name(self) -> Option<&'static str> {
        Some(match self {
            Self::Vertex => "VERTEX",
            Self::TessControl => "TESSELLATION_CONTROL",
            Self::TessEval => "TESSELLATION_EVALUATION",
            Self::Geometry => "GEOMETRY",
            Self::Fragment => "FRAGMENT",
            Self::Compute => "COMPUTE",
            Self::Kernel => return None,
        })
    }
}

impl StageFlags {
    pub fn stages(self) -> impl Iterator<Item = Stage> {
        Stage::ALL.iter().copied().filter(move |stage| self.contains(stage.flag()))
    }
}

impl From<Stage> for StageFlags {
    fn from(stage: Stage) -> Self {
        stage.flag()
    }
}
