use ash::vk;
use fnv::FnvHashMap;
use log::trace;

use crate::WriterOverflow;

#[derive(Clone, Copy, Debug)]
enum Info {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    binding: u32,
    element: u32,
    ty: vk::DescriptorType,
    info: Info,
}

/// Queues descriptor writes against a single set and flushes them in
/// one `vkUpdateDescriptorSets` call.
///
/// Writing the same binding more than once fills consecutive array
/// elements, starting from zero, up to the binding's descriptor count.
#[derive(Debug)]
pub struct DescriptorWriter {
    set: vk::DescriptorSet,
    capacity: usize,
    pending: Vec<Pending>,
    /// Descriptor count of each binding.
    counts: FnvHashMap<u32, u32>,
    elements: FnvHashMap<u32, u32>,
}

impl DescriptorWriter {
    /// `bindings` lists each binding with its descriptor count.
    pub fn new(set: vk::DescriptorSet, bindings: &[(u32, u32)]) -> Self {
        let counts: FnvHashMap<u32, u32> = bindings.iter().copied().collect();
        let capacity = counts.values().map(|&count| count as usize).sum();
        Self {
            set,
            capacity,
            pending: Vec::with_capacity(capacity),
            counts,
            elements: Default::default(),
        }
    }

    pub fn set(&self) -> vk::DescriptorSet {
        self.set
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn push(&mut self, binding: u32, ty: vk::DescriptorType, info: Info) ->
        Result<u32, WriterOverflow>
    {
        if self.pending.len() >= self.capacity {
            return Err(WriterOverflow { capacity: self.capacity });
        }
        let count = self.counts.get(&binding).copied().unwrap_or(0);
        let next = self.elements.entry(binding).or_insert(0);
        if *next >= count {
            return Err(WriterOverflow { capacity: count as usize });
        }
        let element = *next;
        *next += 1;
        trace!("queued write to binding {}[{}]", binding, element);
        self.pending.push(Pending { binding, element, ty, info });
        Ok(element)
    }

    /// Queues a buffer write and returns the array element it fills.
    pub fn write_buffer(
        &mut self,
        binding: u32,
        ty: vk::DescriptorType,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    ) -> Result<u32, WriterOverflow> {
        let info = vk::DescriptorBufferInfo { buffer, offset, range };
        self.push(binding, ty, Info::Buffer(info))
    }

    /// Queues an image or sampler write and returns the array element it
    /// fills.
    pub fn write_image(
        &mut self,
        binding: u32,
        ty: vk::DescriptorType,
        sampler: vk::Sampler,
        image_view: vk::ImageView,
        image_layout: vk::ImageLayout,
    ) -> Result<u32, WriterOverflow> {
        let info = vk::DescriptorImageInfo { sampler, image_view, image_layout };
        self.push(binding, ty, Info::Image(info))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.elements.clear();
    }

    /// The queued writes. They point into `self`.
    pub fn writes(&self) -> Vec<vk::WriteDescriptorSet> {
        self.pending.iter().map(|pending| {
            let write = vk::WriteDescriptorSet::builder()
                .dst_set(self.set)
                .dst_binding(pending.binding)
                .dst_array_element(pending.element)
                .descriptor_type(pending.ty);
            let write = match &pending.info {
                Info::Buffer(info) => write.buffer_info(std::slice::from_ref(info)),
                Info::Image(info) => write.image_info(std::slice::from_ref(info)),
            };
            write.build()
        }).collect()
    }

    pub unsafe fn update(&self, device: &ash::Device) {
        if self.is_empty() { return; }
        let writes = self.writes();
        device.update_descriptor_sets(&writes, &[]);
    }
}
