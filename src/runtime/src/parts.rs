use std::fmt;

use ash::prelude::VkResult;
use ash::vk;
use log::{debug, trace};

/// Owns the set layouts, pipeline layout, and shader modules a
/// generated `Components` struct is built from.
pub struct PipelineParts {
    device: ash::Device,
    set_layouts: Vec<vk::DescriptorSetLayout>,
    layout: vk::PipelineLayout,
    modules: Vec<vk::ShaderModule>,
}

impl Drop for PipelineParts {
    fn drop(&mut self) {
        unsafe {
            for &module in self.modules.iter() {
                self.device.destroy_shader_module(module, None);
            }
            if self.layout != vk::PipelineLayout::null() {
                self.device.destroy_pipeline_layout(self.layout, None);
            }
            for &layout in self.set_layouts.iter() {
                self.device.destroy_descriptor_set_layout(layout, None);
            }
        }
    }
}

impl fmt::Debug for PipelineParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineParts")
            .field("device", &self.device.handle())
            .field("set_layouts", &self.set_layouts)
            .field("layout", &self.layout)
            .field("modules", &self.modules)
            .finish()
    }
}

impl PipelineParts {
    /// Set numbers missing from `sets` get an empty layout, so the
    /// pipeline layout always covers `0..=max_set`.
    pub unsafe fn new(
        device: &ash::Device,
        sets: &[(u32, &[vk::DescriptorSetLayoutBinding])],
        push_constant_ranges: &[vk::PushConstantRange],
        code: &[&[u32]],
    ) -> VkResult<Self> {
        // Anything created before a failure is destroyed when `parts`
        // drops.
        let mut parts = Self {
            device: device.clone(),
            set_layouts: Vec::new(),
            layout: vk::PipelineLayout::null(),
            modules: Vec::new(),
        };

        let set_count = sets.iter().map(|&(set, _)| set + 1).max().unwrap_or(0);
        for set in 0..set_count {
            let bindings = sets.iter()
                .find(|&&(s, _)| s == set)
                .map_or(&[][..], |&(_, bindings)| bindings);
            trace!("set {}: {} bindings", set, bindings.len());
            let info = vk::DescriptorSetLayoutCreateInfo::builder()
                .bindings(bindings);
            parts.set_layouts.push(device.create_descriptor_set_layout(&info, None)?);
        }

        let info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&parts.set_layouts)
            .push_constant_ranges(push_constant_ranges);
        parts.layout = device.create_pipeline_layout(&info, None)?;

        for &words in code.iter() {
            let info = vk::ShaderModuleCreateInfo::builder().code(words);
            parts.modules.push(device.create_shader_module(&info, None)?);
        }

        debug!("created {} set layouts and {} shader modules",
            parts.set_layouts.len(), parts.modules.len());
        Ok(parts)
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn set_layouts(&self) -> &[vk::DescriptorSetLayout] {
        &self.set_layouts
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    pub fn modules(&self) -> &[vk::ShaderModule] {
        &self.modules
    }
}
