use std::ffi::CString;

use ash::prelude::VkResult;
use ash::vk;
use derivative::Derivative;
use log::debug;

#[derive(Clone, Copy, Debug)]
pub struct StageEntry<'a> {
    pub stage: vk::ShaderStageFlags,
    pub module: vk::ShaderModule,
    pub entry: &'a str,
}

#[derive(Clone, Copy, Debug)]
pub struct VertexInput<'a> {
    pub bindings: &'a [vk::VertexInputBindingDescription],
    pub attributes: &'a [vk::VertexInputAttributeDescription],
}

/// Fixed-function state for `create_pipe`. Ignored for compute
/// pipelines except `flags`, `cache`, and `specializations`.
#[derive(Clone, Debug, Derivative)]
#[derivative(Default)]
pub struct PipeOptions {
    pub render_pass: vk::RenderPass,
    pub subpass: u32,
    #[derivative(Default(value = "vk::PrimitiveTopology::TRIANGLE_STRIP"))]
    pub topology: vk::PrimitiveTopology,
    pub primitive_restart: bool,
    /// Required when the pipeline has tessellation stages.
    pub patch_control_points: Option<u32>,
    /// Viewport and scissor size. Leave zero when both are dynamic.
    pub extent: vk::Extent2D,
    #[derivative(Default(value = "vk::PolygonMode::FILL"))]
    pub polygon_mode: vk::PolygonMode,
    #[derivative(Default(value = "vk::CullModeFlags::NONE"))]
    pub cull_mode: vk::CullModeFlags,
    #[derivative(Default(value = "vk::FrontFace::CLOCKWISE"))]
    pub front_face: vk::FrontFace,
    #[derivative(Default(value = "1.0"))]
    pub line_width: f32,
    #[derivative(Default(value = "vk::SampleCountFlags::TYPE_1"))]
    pub samples: vk::SampleCountFlags,
    #[derivative(Default(value = "true"))]
    pub depth_test: bool,
    #[derivative(Default(value = "true"))]
    pub depth_write: bool,
    #[derivative(Default(value = "vk::CompareOp::LESS"))]
    pub depth_compare_op: vk::CompareOp,
    #[derivative(Default(value = "vec![alpha_blend()]"))]
    pub blend_attachments: Vec<vk::PipelineColorBlendAttachmentState>,
    pub dynamic_states: Vec<vk::DynamicState>,
    pub flags: vk::PipelineCreateFlags,
    pub cache: vk::PipelineCache,
    /// Specialization data by stage. The infos must outlive the call to
    /// `create_pipe`.
    pub specializations: Vec<(vk::ShaderStageFlags, vk::SpecializationInfo)>,
}

impl PipeOptions {
    pub fn specialize(&mut self, stage: vk::ShaderStageFlags, info: vk::SpecializationInfo) ->
        &mut Self
    {
        self.specializations.retain(|&(s, _)| s != stage);
        self.specializations.push((stage, info));
        self
    }
}

fn color_write_mask_all() -> vk::ColorComponentFlags {
    vk::ColorComponentFlags::R
        | vk::ColorComponentFlags::G
        | vk::ColorComponentFlags::B
        | vk::ColorComponentFlags::A
}

/// Standard non-premultiplied alpha blending.
pub fn alpha_blend() -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState {
        blend_enable: vk::TRUE,
        src_color_blend_factor: vk::BlendFactor::SRC_ALPHA,
        dst_color_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        color_blend_op: vk::BlendOp::ADD,
        src_alpha_blend_factor: vk::BlendFactor::ONE,
        dst_alpha_blend_factor: vk::BlendFactor::ZERO,
        alpha_blend_op: vk::BlendOp::ADD,
        color_write_mask: color_write_mask_all(),
    }
}

/// Creates a compute pipeline when `stages` is a lone compute stage and
/// a graphics pipeline otherwise.
pub unsafe fn create_pipe(
    device: &ash::Device,
    layout: vk::PipelineLayout,
    stages: &[StageEntry<'_>],
    vertex: Option<&VertexInput<'_>>,
    options: &PipeOptions,
) -> VkResult<vk::Pipeline> {
    let names = stages.iter()
        .map(|stage| CString::new(stage.entry)
            .map_err(|_| vk::Result::ERROR_INITIALIZATION_FAILED))
        .collect::<VkResult<Vec<_>>>()?;
    let infos: Vec<_> = stages.iter().zip(names.iter()).map(|(stage, name)| {
        let mut info = vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage.stage)
            .module(stage.module)
            .name(name.as_c_str());
        if let Some((_, spec)) = options.specializations.iter()
            .find(|(flags, _)| *flags == stage.stage)
        {
            info = info.specialization_info(spec);
        }
        info.build()
    }).collect();

    match &infos[..] {
        [info] if info.stage == vk::ShaderStageFlags::COMPUTE =>
            create_compute(device, layout, *info, options),
        _ => create_graphics(device, layout, &infos, vertex, options),
    }
}

unsafe fn create_compute(
    device: &ash::Device,
    layout: vk::PipelineLayout,
    stage: vk::PipelineShaderStageCreateInfo,
    options: &PipeOptions,
) -> VkResult<vk::Pipeline> {
    debug!("creating compute pipeline");
    let info = vk::ComputePipelineCreateInfo::builder()
        .flags(options.flags)
        .stage(stage)
        .layout(layout)
        .build();
    let pipelines = device.create_compute_pipelines(options.cache, &[info], None)
        .map_err(|(_, err)| err)?;
    pipelines.into_iter().next().ok_or(vk::Result::ERROR_UNKNOWN)
}

unsafe fn create_graphics(
    device: &ash::Device,
    layout: vk::PipelineLayout,
    stages: &[vk::PipelineShaderStageCreateInfo],
    vertex: Option<&VertexInput<'_>>,
    options: &PipeOptions,
) -> VkResult<vk::Pipeline> {
    debug!("creating graphics pipeline with {} stages", stages.len());

    let (bindings, attributes) = match vertex {
        Some(vertex) => (vertex.bindings, vertex.attributes),
        None => (&[][..], &[][..]),
    };
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
        .vertex_binding_descriptions(bindings)
        .vertex_attribute_descriptions(attributes);
    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
        .topology(options.topology)
        .primitive_restart_enable(options.primitive_restart);
    let tessellation = options.patch_control_points.map(|points| {
        vk::PipelineTessellationStateCreateInfo::builder()
            .patch_control_points(points)
            .build()
    });

    let extent = options.extent;
    let viewports = [vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }];
    let scissors = [vk::Rect2D { offset: Default::default(), extent }];
    let viewport = vk::PipelineViewportStateCreateInfo::builder()
        .viewports(&viewports)
        .scissors(&scissors);

    let rasterization = vk::PipelineRasterizationStateCreateInfo::builder()
        .polygon_mode(options.polygon_mode)
        .cull_mode(options.cull_mode)
        .front_face(options.front_face)
        .line_width(options.line_width);
    let multisample = vk::PipelineMultisampleStateCreateInfo::builder()
        .rasterization_samples(options.samples);
    let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
        .depth_test_enable(options.depth_test)
        .depth_write_enable(options.depth_write)
        .depth_compare_op(options.depth_compare_op);
    let color_blend = vk::PipelineColorBlendStateCreateInfo::builder()
        .attachments(&options.blend_attachments);
    let dynamic = vk::PipelineDynamicStateCreateInfo::builder()
        .dynamic_states(&options.dynamic_states);

    let mut info = vk::GraphicsPipelineCreateInfo::builder()
        .flags(options.flags)
        .stages(stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport)
        .rasterization_state(&rasterization)
        .multisample_state(&multisample)
        .depth_stencil_state(&depth_stencil)
        .color_blend_state(&color_blend)
        .layout(layout)
        .render_pass(options.render_pass)
        .subpass(options.subpass);
    if let Some(tessellation) = &tessellation {
        info = info.tessellation_state(tessellation);
    }
    if !options.dynamic_states.is_empty() {
        info = info.dynamic_state(&dynamic);
    }

    let pipelines = device.create_graphics_pipelines(options.cache, &[info.build()], None)
        .map_err(|(_, err)| err)?;
    pipelines.into_iter().next().ok_or(vk::Result::ERROR_UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_defaults() {
        let options = PipeOptions::default();
        assert_eq!(options.topology, vk::PrimitiveTopology::TRIANGLE_STRIP);
        assert_eq!(options.cull_mode, vk::CullModeFlags::NONE);
        assert_eq!(options.front_face, vk::FrontFace::CLOCKWISE);
        assert_eq!(options.samples, vk::SampleCountFlags::TYPE_1);
        assert!(options.depth_test && options.depth_write);
        assert_eq!(options.depth_compare_op, vk::CompareOp::LESS);
        assert_eq!(options.blend_attachments.len(), 1);
        assert_eq!(options.blend_attachments[0].blend_enable, vk::TRUE);
        assert_eq!(options.line_width, 1.0);
        assert!(options.patch_control_points.is_none());
    }

    #[test]
    fn specialize_replaces_stage() {
        let mut options = PipeOptions::default();
        let info = vk::SpecializationInfo::default();
        options.specialize(vk::ShaderStageFlags::VERTEX, info)
            .specialize(vk::ShaderStageFlags::FRAGMENT, info)
            .specialize(vk::ShaderStageFlags::VERTEX, info);
        let stages: Vec<_> = options.specializations.iter().map(|&(s, _)| s).collect();
        assert_eq!(stages, [vk::ShaderStageFlags::FRAGMENT, vk::ShaderStageFlags::VERTEX]);
    }
}
