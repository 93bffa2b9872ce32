use ash::vk;

use crate::WriterOverflow;

/// Builds the specialization data for one shader stage.
///
/// Setting a constant that was already set overwrites it in place.
#[derive(Clone, Debug)]
pub struct Specializer {
    stage: vk::ShaderStageFlags,
    capacity: usize,
    entries: Vec<vk::SpecializationMapEntry>,
    data: Vec<u8>,
}

impl Specializer {
    pub fn new(stage: vk::ShaderStageFlags, capacity: usize) -> Self {
        Self {
            stage,
            capacity,
            entries: Vec::with_capacity(capacity),
            data: Vec::new(),
        }
    }

    pub fn stage(&self) -> vk::ShaderStageFlags {
        self.stage
    }

    pub fn entries(&self) -> &[vk::SpecializationMapEntry] {
        &self.entries
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_bytes(&mut self, constant_id: u32, bytes: &[u8]) ->
        Result<(), WriterOverflow>
    {
        if let Some(entry) = self.entries.iter()
            .find(|entry| entry.constant_id == constant_id && entry.size == bytes.len())
        {
            let start = entry.offset as usize;
            self.data[start..start + bytes.len()].copy_from_slice(bytes);
            return Ok(());
        }
        if self.entries.len() >= self.capacity {
            return Err(WriterOverflow { capacity: self.capacity });
        }
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(bytes);
        self.entries.push(vk::SpecializationMapEntry {
            constant_id,
            offset,
            size: bytes.len(),
        });
        Ok(())
    }

    /// Booleans are passed as 32-bit `VkBool32` values.
    pub fn set_bool(&mut self, constant_id: u32, value: bool) ->
        Result<(), WriterOverflow>
    {
        let value = if value { vk::TRUE } else { vk::FALSE };
        self.set_bytes(constant_id, &value.to_ne_bytes())
    }

    pub fn set_i32(&mut self, constant_id: u32, value: i32) -> Result<(), WriterOverflow> {
        self.set_bytes(constant_id, &value.to_ne_bytes())
    }

    pub fn set_u32(&mut self, constant_id: u32, value: u32) -> Result<(), WriterOverflow> {
        self.set_bytes(constant_id, &value.to_ne_bytes())
    }

    pub fn set_f32(&mut self, constant_id: u32, value: f32) -> Result<(), WriterOverflow> {
        self.set_bytes(constant_id, &value.to_ne_bytes())
    }

    pub fn set_i64(&mut self, constant_id: u32, value: i64) -> Result<(), WriterOverflow> {
        self.set_bytes(constant_id, &value.to_ne_bytes())
    }

    pub fn set_u64(&mut self, constant_id: u32, value: u64) -> Result<(), WriterOverflow> {
        self.set_bytes(constant_id, &value.to_ne_bytes())
    }

    pub fn set_f64(&mut self, constant_id: u32, value: f64) -> Result<(), WriterOverflow> {
        self.set_bytes(constant_id, &value.to_ne_bytes())
    }

    /// The returned info points into `self`.
    pub fn info(&self) -> vk::SpecializationInfo {
        vk::SpecializationInfo::builder()
            .map_entries(&self.entries)
            .data(&self.data)
            .build()
    }
}
