//! Device executor: owns the adapter, the compiled pipelines and every
//! buffer transfer. Host data stays `f64`; uploads narrow to the negotiated
//! device precision and downloads widen back.

use std::sync::Arc;

use anyhow::{anyhow, ensure, Result};
use futures::channel::oneshot;
use log::{info, warn};
use num_complex::Complex;
use pollster::block_on;
use wgpu::util::DeviceExt;

use crate::backend::wgpu::config::effective_workgroup_size;
use crate::backend::wgpu::dispatch::{run_compute, workgroup_grid};
use crate::backend::wgpu::params::{stride_table_words, ChirpParams, MultiplyParams};
use crate::backend::wgpu::pipelines::{ChirpzPipelines, PipelineBundle};
use crate::backend::wgpu::types::{BufferLayout, NumericPrecision};
use crate::kargs::StrideTable;
use crate::twiddles::TwiddleTable;
use crate::{Direction, Scheme};

pub struct WgpuExecutorOptions {
    pub power_preference: wgpu::PowerPreference,
    pub force_fallback_adapter: bool,
    /// Overrides the `CHIRPZ_WG` env / default workgroup size when set.
    pub workgroup_size: Option<u32>,
}

impl Default for WgpuExecutorOptions {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            workgroup_size: None,
        }
    }
}

/// An interleaved complex buffer on the device: `len` re/im scalar pairs.
pub struct DeviceComplexBuffer {
    pub(crate) buffer: wgpu::Buffer,
    pub len: usize,
}

/// A split complex buffer on the device: separate re and im scalar arrays.
pub struct DeviceSplitBuffer {
    pub(crate) re: wgpu::Buffer,
    pub(crate) im: wgpu::Buffer,
    pub len: usize,
}

/// Uploaded radix-256 twiddle table, tagged with the modulus it was built
/// for so a chirp launch can reject a table of the wrong length.
pub struct DeviceTwiddles {
    pub(crate) buffer: wgpu::Buffer,
    pub levels: u32,
    pub total: u64,
}

/// Uploaded shape/stride words plus the rank they were packed with.
pub struct DeviceStrideTable {
    pub(crate) buffer: wgpu::Buffer,
    pub rank: u32,
}

/// Input/output pairing of one multiply launch. The variant picks the
/// layout-monomorphised pipeline.
pub enum DeviceMultiplyIo<'a> {
    InterleavedInterleaved {
        input: &'a DeviceComplexBuffer,
        output: &'a DeviceComplexBuffer,
    },
    InterleavedSplit {
        input: &'a DeviceComplexBuffer,
        output: &'a DeviceSplitBuffer,
    },
    SplitInterleaved {
        input: &'a DeviceSplitBuffer,
        output: &'a DeviceComplexBuffer,
    },
    SplitSplit {
        input: &'a DeviceSplitBuffer,
        output: &'a DeviceSplitBuffer,
    },
}

impl DeviceMultiplyIo<'_> {
    fn layouts(&self) -> (BufferLayout, BufferLayout) {
        match self {
            DeviceMultiplyIo::InterleavedInterleaved { .. } => {
                (BufferLayout::Interleaved, BufferLayout::Interleaved)
            }
            DeviceMultiplyIo::InterleavedSplit { .. } => {
                (BufferLayout::Interleaved, BufferLayout::Split)
            }
            DeviceMultiplyIo::SplitInterleaved { .. } => {
                (BufferLayout::Split, BufferLayout::Interleaved)
            }
            DeviceMultiplyIo::SplitSplit { .. } => (BufferLayout::Split, BufferLayout::Split),
        }
    }
}

pub struct WgpuExecutor {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    precision: NumericPrecision,
    workgroup_size: u32,
    pipelines: ChirpzPipelines,
}

impl WgpuExecutor {
    pub fn new(opts: WgpuExecutorOptions) -> Result<Self> {
        block_on(Self::new_async(opts))
    }

    pub async fn new_async(opts: WgpuExecutorOptions) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: opts.power_preference,
                force_fallback_adapter: opts.force_fallback_adapter,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| anyhow!("wgpu: no compatible adapter found"))?;

        let adapter_info = adapter.get_info();
        let adapter_features = adapter.features();
        let forced_precision = std::env::var("CHIRPZ_WGPU_FORCE_PRECISION")
            .ok()
            .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
                "f32" | "float32" | "32" => Some(NumericPrecision::F32),
                "f64" | "float64" | "64" => Some(NumericPrecision::F64),
                _ => None,
            });
        let mut precision = forced_precision.unwrap_or(NumericPrecision::F32);
        if precision == NumericPrecision::F64
            && !adapter_features.contains(wgpu::Features::SHADER_F64)
        {
            warn!("chirpz: requested f64 precision but adapter lacks SHADER_F64; falling back to f32");
            precision = NumericPrecision::F32;
        }
        if forced_precision.is_none() {
            info!(
                "chirpz: defaulting to {} kernels for adapter '{}'",
                precision.tag(),
                adapter_info.name
            );
        }

        let required_features = match precision {
            NumericPrecision::F64 => wgpu::Features::SHADER_F64,
            NumericPrecision::F32 => wgpu::Features::empty(),
        };
        let limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("chirpz wgpu device"),
                    required_features,
                    required_limits: limits.clone(),
                },
                None,
            )
            .await?;

        let workgroup_size = opts
            .workgroup_size
            .unwrap_or_else(effective_workgroup_size)
            .min(limits.max_compute_invocations_per_workgroup);
        info!(
            "chirpz: adapter '{}' ready, precision={} workgroup={}",
            adapter_info.name,
            precision.tag(),
            workgroup_size
        );

        let pipelines = ChirpzPipelines::new(&device, precision, workgroup_size);
        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            precision,
            workgroup_size,
            pipelines,
        })
    }

    pub fn precision(&self) -> NumericPrecision {
        self.precision
    }

    pub fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    // Transfers

    pub fn upload_complex(&self, data: &[Complex<f64>], label: &str) -> DeviceComplexBuffer {
        let mut scalars = Vec::with_capacity(2 * data.len());
        for v in data {
            scalars.push(v.re);
            scalars.push(v.im);
        }
        DeviceComplexBuffer {
            buffer: self.upload_scalars(&scalars, label),
            len: data.len(),
        }
    }

    /// Zero-filled interleaved buffer of `len` complex values.
    pub fn alloc_complex(&self, len: usize, label: &str) -> DeviceComplexBuffer {
        DeviceComplexBuffer {
            buffer: self.alloc_scalars(2 * len, label),
            len,
        }
    }

    pub fn upload_split(&self, re: &[f64], im: &[f64], label: &str) -> Result<DeviceSplitBuffer> {
        ensure!(
            re.len() == im.len(),
            "split buffer halves differ: {} vs {}",
            re.len(),
            im.len()
        );
        Ok(DeviceSplitBuffer {
            re: self.upload_scalars(re, &format!("{label}-re")),
            im: self.upload_scalars(im, &format!("{label}-im")),
            len: re.len(),
        })
    }

    pub fn alloc_split(&self, len: usize, label: &str) -> DeviceSplitBuffer {
        DeviceSplitBuffer {
            re: self.alloc_scalars(len, &format!("{label}-re")),
            im: self.alloc_scalars(len, &format!("{label}-im")),
            len,
        }
    }

    pub fn upload_twiddles(&self, table: &TwiddleTable<f64>) -> DeviceTwiddles {
        let mut scalars = Vec::with_capacity(2 * table.entries().len());
        for v in table.entries() {
            scalars.push(v.re);
            scalars.push(v.im);
        }
        DeviceTwiddles {
            buffer: self.upload_scalars(&scalars, "chirpz-twiddles"),
            levels: table.step().levels() as u32,
            total: table.total(),
        }
    }

    /// Upload the packed stride words. Allocation failure is captured by an
    /// out-of-memory error scope and returned as an error with the partial
    /// allocation released.
    pub fn upload_stride_table(&self, table: &StrideTable) -> Result<DeviceStrideTable> {
        let words = stride_table_words(table)?;
        self.device
            .push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("chirpz-strides"),
                contents: bytemuck::cast_slice(&words),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });
        if let Some(err) = block_on(self.device.pop_error_scope()) {
            drop(buffer);
            return Err(anyhow!("stride table allocation failed: {err}"));
        }
        Ok(DeviceStrideTable {
            buffer,
            rank: table.rank() as u32,
        })
    }

    pub fn download_complex(&self, src: &DeviceComplexBuffer) -> Result<Vec<Complex<f64>>> {
        let scalars = self.download_scalars(&src.buffer, 2 * src.len, "download_complex")?;
        Ok(scalars
            .chunks_exact(2)
            .map(|pair| Complex::new(pair[0], pair[1]))
            .collect())
    }

    pub fn download_split(&self, src: &DeviceSplitBuffer) -> Result<(Vec<f64>, Vec<f64>)> {
        let re = self.download_scalars(&src.re, src.len, "download_split re")?;
        let im = self.download_scalars(&src.im, src.len, "download_split im")?;
        Ok((re, im))
    }

    // Kernels

    /// Run the chirp kernel: allocate the doubled chirp buffer of `2m`
    /// complex values and fill it on the device.
    pub fn generate_chirp(
        &self,
        n: usize,
        m: usize,
        twiddles: &DeviceTwiddles,
        direction: Direction,
    ) -> Result<DeviceComplexBuffer> {
        ensure!(n > 0 && m >= 2 * n - 1, "invalid chirp geometry n={n} m={m}");
        ensure!(
            twiddles.total == 2 * n as u64,
            "twiddle table modulus {} does not match 2N = {}",
            twiddles.total,
            2 * n
        );
        // mul_mod doubles intermediates, so the modulus must fit 31 bits.
        ensure!(
            (2 * n as u64) < (1 << 31),
            "transform length {n} exceeds the 32-bit chirp residue path"
        );
        let m_u32 = launch_u32(m, "convolution length")?;
        let output = self.alloc_complex(2 * m, "chirpz-chirp");
        let params = ChirpParams {
            n: n as u32,
            m: m_u32,
            twl: twiddles.levels,
            dir: direction.sign(),
        };
        let params_buf = self.uniform(&params, "chirpz-chirp-params");
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("chirpz-chirp-bind"),
            layout: &self.pipelines.chirp.layout,
            entries: &[
                buffer_entry(0, &twiddles.buffer),
                buffer_entry(1, &output.buffer),
                buffer_entry(2, &params_buf),
            ],
        });
        let grid = workgroup_grid(m, self.workgroup_size)?;
        run_compute(
            &self.device,
            &self.queue,
            &self.pipelines.chirp,
            &bind_group,
            grid,
            "chirpz-chirp",
        );
        Ok(output)
    }

    /// Run one multiply stage over `total` work items.
    ///
    /// `numof` is the per-batch element count of this stage (M for pad and
    /// spectral, N for result); `total` is `numof` times the batch extent
    /// product, matching the host kernel's grid.
    #[allow(clippy::too_many_arguments)]
    pub fn multiply(
        &self,
        scheme: Scheme,
        numof: usize,
        total: usize,
        n: usize,
        m: usize,
        direction: Direction,
        table: &DeviceStrideTable,
        io: &DeviceMultiplyIo<'_>,
    ) -> Result<()> {
        let params = MultiplyParams {
            numof: launch_u32(numof, "element count")?,
            total: launch_u32(total, "work item count")?,
            n: launch_u32(n, "transform length")?,
            m: launch_u32(m, "convolution length")?,
            rank: table.rank,
            scheme: scheme.tag(),
            dir: direction.sign(),
            _pad: 0,
        };
        let params_buf = self.uniform(&params, "chirpz-mul-params");

        let (in_layout, out_layout) = io.layouts();
        let bundle: &PipelineBundle = self.pipelines.multiply_for(in_layout, out_layout);

        let mut entries: Vec<wgpu::BindGroupEntry<'_>> = Vec::with_capacity(6);
        match io {
            DeviceMultiplyIo::InterleavedInterleaved { input, output } => {
                entries.push(buffer_entry(0, &input.buffer));
                entries.push(buffer_entry(1, &output.buffer));
            }
            DeviceMultiplyIo::InterleavedSplit { input, output } => {
                entries.push(buffer_entry(0, &input.buffer));
                entries.push(buffer_entry(1, &output.re));
                entries.push(buffer_entry(2, &output.im));
            }
            DeviceMultiplyIo::SplitInterleaved { input, output } => {
                entries.push(buffer_entry(0, &input.re));
                entries.push(buffer_entry(1, &input.im));
                entries.push(buffer_entry(2, &output.buffer));
            }
            DeviceMultiplyIo::SplitSplit { input, output } => {
                entries.push(buffer_entry(0, &input.re));
                entries.push(buffer_entry(1, &input.im));
                entries.push(buffer_entry(2, &output.re));
                entries.push(buffer_entry(3, &output.im));
            }
        }
        let next = entries.len() as u32;
        entries.push(buffer_entry(next, &table.buffer));
        entries.push(buffer_entry(next + 1, &params_buf));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("chirpz-mul-bind"),
            layout: &bundle.layout,
            entries: &entries,
        });
        let grid = workgroup_grid(total, self.workgroup_size)?;
        run_compute(
            &self.device,
            &self.queue,
            bundle,
            &bind_group,
            grid,
            "chirpz-mul",
        );
        Ok(())
    }

    // Scalar-level plumbing

    fn upload_scalars(&self, data: &[f64], label: &str) -> wgpu::Buffer {
        let usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC;
        match self.precision {
            NumericPrecision::F64 => {
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(label),
                        contents: bytemuck::cast_slice(data),
                        usage,
                    })
            }
            NumericPrecision::F32 => {
                let narrowed: Vec<f32> = data.iter().map(|&v| v as f32).collect();
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(label),
                        contents: bytemuck::cast_slice(&narrowed),
                        usage,
                    })
            }
        }
    }

    fn alloc_scalars(&self, count: usize, label: &str) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (count * self.precision.scalar_size()) as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        })
    }

    fn download_scalars(
        &self,
        src: &wgpu::Buffer,
        count: usize,
        context: &str,
    ) -> Result<Vec<f64>> {
        let size_bytes = (count * self.precision.scalar_size()) as u64;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("chirpz-staging"),
            size: size_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("chirpz-readback"),
            });
        encoder.copy_buffer_to_buffer(src, 0, &staging, 0, size_bytes);
        self.queue.submit(Some(encoder.finish()));

        let bytes = block_on(self.map_readback_bytes(staging, size_bytes, context))?;
        Ok(match self.precision {
            NumericPrecision::F64 => bytemuck::cast_slice::<u8, f64>(&bytes).to_vec(),
            NumericPrecision::F32 => bytemuck::cast_slice::<u8, f32>(&bytes)
                .iter()
                .map(|&v| v as f64)
                .collect(),
        })
    }

    async fn map_readback_bytes(
        &self,
        staging: wgpu::Buffer,
        size_bytes: u64,
        context: &str,
    ) -> Result<Vec<u8>> {
        let size_usize = usize::try_from(size_bytes)
            .map_err(|_| anyhow!("{context}: readback size overflow"))?;
        let slice = staging.slice(..);
        let (tx, rx) = oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device.poll(wgpu::Maintain::Wait);
        let map_result = rx
            .await
            .map_err(|_| anyhow!("{context}: map_async callback dropped"))?;
        map_result.map_err(|e: wgpu::BufferAsyncError| anyhow!(e))?;
        let data = slice.get_mapped_range();
        let mut out = vec![0u8; size_usize];
        out.copy_from_slice(&data);
        drop(data);
        staging.unmap();
        Ok(out)
    }

    fn uniform<P: bytemuck::Pod>(&self, params: &P, label: &str) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(params),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
    }
}

fn buffer_entry<'a>(binding: u32, buffer: &'a wgpu::Buffer) -> wgpu::BindGroupEntry<'a> {
    wgpu::BindGroupEntry {
        binding,
        resource: buffer.as_entire_binding(),
    }
}

fn launch_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{what} {value} exceeds the 32-bit device ABI"))
}
