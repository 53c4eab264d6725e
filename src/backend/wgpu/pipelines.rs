use std::borrow::Cow;

use crate::backend::wgpu::bindings::{
    storage_read_entry, storage_read_write_entry, uniform_entry,
};
use crate::backend::wgpu::shaders::chirp::build_chirp_shader;
use crate::backend::wgpu::shaders::multiply::build_multiply_shader;
use crate::backend::wgpu::types::{BufferLayout, NumericPrecision};

pub struct PipelineBundle {
    pub pipeline: wgpu::ComputePipeline,
    pub layout: wgpu::BindGroupLayout,
}

/// All compute pipelines of one executor, compiled once at startup for the
/// negotiated precision. The multiply kernel is monomorphised per layout
/// combination (interleaved/split on each side); the scheme stays a uniform.
pub struct ChirpzPipelines {
    pub chirp: PipelineBundle,
    pub mul_ii: PipelineBundle,
    pub mul_is: PipelineBundle,
    pub mul_si: PipelineBundle,
    pub mul_ss: PipelineBundle,
}

impl ChirpzPipelines {
    pub fn new(device: &wgpu::Device, precision: NumericPrecision, workgroup_size: u32) -> Self {
        let scalar_ty = precision.scalar_ty();

        let chirp = create_pipeline(
            device,
            "chirpz-chirp-layout",
            "chirpz-chirp-shader",
            "chirpz-chirp-pipeline",
            vec![
                storage_read_entry(0),
                storage_read_write_entry(1),
                uniform_entry(2),
            ],
            &build_chirp_shader(scalar_ty, workgroup_size),
        );

        let mul = |input_split: bool, output_split: bool, tag: &str| {
            let mut entries = Vec::new();
            let mut binding = 0u32;
            for _ in 0..if input_split { 2 } else { 1 } {
                entries.push(storage_read_entry(binding));
                binding += 1;
            }
            for _ in 0..if output_split { 2 } else { 1 } {
                entries.push(storage_read_write_entry(binding));
                binding += 1;
            }
            entries.push(storage_read_entry(binding));
            entries.push(uniform_entry(binding + 1));
            create_pipeline(
                device,
                &format!("chirpz-mul-{tag}-layout"),
                &format!("chirpz-mul-{tag}-shader"),
                &format!("chirpz-mul-{tag}-pipeline"),
                entries,
                &build_multiply_shader(scalar_ty, input_split, output_split, workgroup_size),
            )
        };

        let mul_ii = mul(false, false, "ii");
        let mul_is = mul(false, true, "is");
        let mul_si = mul(true, false, "si");
        let mul_ss = mul(true, true, "ss");

        Self {
            chirp,
            mul_ii,
            mul_is,
            mul_si,
            mul_ss,
        }
    }

    /// Pick the multiply pipeline for one layout combination.
    pub fn multiply_for(&self, input: BufferLayout, output: BufferLayout) -> &PipelineBundle {
        match (input, output) {
            (BufferLayout::Interleaved, BufferLayout::Interleaved) => &self.mul_ii,
            (BufferLayout::Interleaved, BufferLayout::Split) => &self.mul_is,
            (BufferLayout::Split, BufferLayout::Interleaved) => &self.mul_si,
            (BufferLayout::Split, BufferLayout::Split) => &self.mul_ss,
        }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout_label: &str,
    shader_label: &str,
    pipeline_label: &str,
    entries: Vec<wgpu::BindGroupLayoutEntry>,
    shader_source: &str,
) -> PipelineBundle {
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(layout_label),
        entries: &entries,
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&(String::from(pipeline_label) + "-layout")),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(shader_label),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(shader_source)),
    });
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(pipeline_label),
        module: &module,
        layout: Some(&pipeline_layout),
        entry_point: "main",
    });
    PipelineBundle { pipeline, layout }
}
