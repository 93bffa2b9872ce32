#![cfg(test)]
#![allow(dead_code)]
//! A tiny SPIR-V word emitter for building test modules.
use spirv_headers as spv;

const MAGIC: u32 = 0x0723_0203;

/// Packs a string into nul-terminated little-endian words.
pub(crate) fn string_words(s: &str) -> Vec<u32> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes.chunks(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[derive(Debug)]
pub(crate) struct Assembler {
    words: Vec<u32>,
    next_id: u32,
    uint: Option<u32>,
}

impl Assembler {
    pub(crate) fn new() -> Self {
        let mut asm = Self { words: Vec::new(), next_id: 1, uint: None };
        asm.op(spv::Op::Capability, &[spv::Capability::Shader as u32]);
        asm.op(spv::Op::MemoryModel, &[
            spv::AddressingModel::Logical as u32,
            spv::MemoryModel::GLSL450 as u32,
        ]);
        asm
    }

    pub(crate) fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn op(&mut self, op: spv::Op, operands: &[u32]) {
        let count = operands.len() as u32 + 1;
        self.words.push((count << 16) | op as u32);
        self.words.extend_from_slice(operands);
    }

    fn result(&mut self, op: spv::Op, operands: &[u32]) -> u32 {
        let id = self.id();
        let ops: Vec<_> = std::iter::once(id).chain(operands.iter().copied()).collect();
        self.op(op, &ops);
        id
    }

    fn typed(&mut self, op: spv::Op, ty: u32, operands: &[u32]) -> u32 {
        let id = self.id();
        let ops: Vec<_> = [ty, id].iter().chain(operands.iter()).copied().collect();
        self.op(op, &ops);
        id
    }

    pub(crate) fn entry_point(
        &mut self,
        model: spv::ExecutionModel,
        name: &str,
        interface: &[u32],
    ) {
        let function = self.id();
        let mut ops = vec![model as u32, function];
        ops.extend(string_words(name));
        ops.extend_from_slice(interface);
        self.op(spv::Op::EntryPoint, &ops);
    }

    pub(crate) fn name(&mut self, target: u32, name: &str) {
        let mut ops = vec![target];
        ops.extend(string_words(name));
        self.op(spv::Op::Name, &ops);
    }

    pub(crate) fn member_name(&mut self, target: u32, member: u32, name: &str) {
        let mut ops = vec![target, member];
        ops.extend(string_words(name));
        self.op(spv::Op::MemberName, &ops);
    }

    pub(crate) fn decorate(&mut self, target: u32, deco: spv::Decoration, extra: &[u32]) {
        let mut ops = vec![target, deco as u32];
        ops.extend_from_slice(extra);
        self.op(spv::Op::Decorate, &ops);
    }

    pub(crate) fn member_decorate(
        &mut self,
        target: u32,
        member: u32,
        deco: spv::Decoration,
        extra: &[u32],
    ) {
        let mut ops = vec![target, member, deco as u32];
        ops.extend_from_slice(extra);
        self.op(spv::Op::MemberDecorate, &ops);
    }

    pub(crate) fn type_void(&mut self) -> u32 {
        self.result(spv::Op::TypeVoid, &[])
    }

    pub(crate) fn type_bool(&mut self) -> u32 {
        self.result(spv::Op::TypeBool, &[])
    }

    pub(crate) fn type_int(&mut self, width: u32, signed: bool) -> u32 {
        self.result(spv::Op::TypeInt, &[width, signed as u32])
    }

    pub(crate) fn type_float(&mut self, width: u32) -> u32 {
        self.result(spv::Op::TypeFloat, &[width])
    }

    pub(crate) fn type_vector(&mut self, component: u32, count: u32) -> u32 {
        self.result(spv::Op::TypeVector, &[component, count])
    }

    pub(crate) fn type_matrix(&mut self, column: u32, count: u32) -> u32 {
        self.result(spv::Op::TypeMatrix, &[column, count])
    }

    pub(crate) fn type_array(&mut self, element: u32, length: u32) -> u32 {
        self.result(spv::Op::TypeArray, &[element, length])
    }

    /// An array whose length is a fresh `uint` constant.
    pub(crate) fn type_array_n(&mut self, element: u32, n: u32) -> u32 {
        let uint = match self.uint {
            Some(uint) => uint,
            None => {
                let uint = self.type_int(32, false);
                self.uint = Some(uint);
                uint
            },
        };
        let length = self.constant(uint, n);
        self.type_array(element, length)
    }

    pub(crate) fn type_runtime_array(&mut self, element: u32) -> u32 {
        self.result(spv::Op::TypeRuntimeArray, &[element])
    }

    pub(crate) fn type_struct(&mut self, members: &[u32]) -> u32 {
        self.result(spv::Op::TypeStruct, members)
    }

    pub(crate) fn type_pointer(&mut self, class: spv::StorageClass, pointee: u32) -> u32 {
        self.result(spv::Op::TypePointer, &[class as u32, pointee])
    }

    /// `sampled` is 1 for sampled images and 2 for storage images.
    pub(crate) fn type_image(&mut self, sampled_type: u32, dim: spv::Dim, sampled: u32) -> u32 {
        let format = spv::ImageFormat::Unknown as u32;
        self.result(spv::Op::TypeImage, &[sampled_type, dim as u32, 0, 0, 0, sampled, format])
    }

    pub(crate) fn type_sampler(&mut self) -> u32 {
        self.result(spv::Op::TypeSampler, &[])
    }

    pub(crate) fn type_sampled_image(&mut self, image: u32) -> u32 {
        self.result(spv::Op::TypeSampledImage, &[image])
    }

    /// A 32-bit constant.
    pub(crate) fn constant(&mut self, ty: u32, bits: u32) -> u32 {
        self.typed(spv::Op::Constant, ty, &[bits])
    }

    /// A 32-bit specialization constant.
    pub(crate) fn spec_constant(&mut self, ty: u32, bits: u32) -> u32 {
        self.typed(spv::Op::SpecConstant, ty, &[bits])
    }

    pub(crate) fn spec_constant_true(&mut self, ty: u32) -> u32 {
        self.typed(spv::Op::SpecConstantTrue, ty, &[])
    }

    pub(crate) fn spec_constant_composite(&mut self, ty: u32, parts: &[u32]) -> u32 {
        self.typed(spv::Op::SpecConstantComposite, ty, parts)
    }

    pub(crate) fn variable(&mut self, ptr: u32, class: spv::StorageClass) -> u32 {
        self.typed(spv::Op::Variable, ptr, &[class as u32])
    }

    pub(crate) fn finish(self) -> Vec<u32> {
        let mut words = vec![MAGIC, 0x0001_0000, 0, self.next_id, 0];
        words.extend(self.words);
        words
    }
}
