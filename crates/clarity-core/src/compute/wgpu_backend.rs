//! wgpu-based GPU compute backend (Metal / Vulkan / DX12).
//!
//! All buffers stay device-resident; only `reduce_sum` and
//! `copy_from_device` read data back. Transforms are separable per-axis DFTs
//! so that working dimensions need not be powers of two.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::buffer::{BufferInner, RealBuffer, SpectrumBuffer};
use crate::consts::GPU_WORKGROUP_SIZE;
use crate::dim::Dim3;
use crate::error::{ClarityError, Result};

use super::ComputeBackend;

// ---------------------------------------------------------------------------
// Inline WGSL shaders
// ---------------------------------------------------------------------------

/// Shared declarations for the 1-D kernels. Dispatches wider than 65535
/// workgroups spill into y, so the flat index folds both dimensions.
const PRELUDE_WGSL: &str = r"
struct Params { count: u32, value: f32, extra: f32, pad: u32 }
fn flat_index(gid: vec3<u32>, nwg: vec3<u32>) -> u32 {
    return gid.x + gid.y * nwg.x * 256u;
}
";

const MULTIPLY_WGSL: &str = r"
@group(0) @binding(0) var<storage, read>       a:      array<f32>;
@group(0) @binding(1) var<storage, read>       b:      array<f32>;
@group(0) @binding(2) var<storage, read_write> output: array<f32>;
@group(0) @binding(3) var<uniform>             params: Params;
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) nwg: vec3<u32>) {
    let i = flat_index(gid, nwg);
    if i >= params.count { return; }
    output[i] = a[i] * b[i];
}
";

const DIVIDE_WGSL: &str = r"
@group(0) @binding(0) var<storage, read>       a:      array<f32>;
@group(0) @binding(1) var<storage, read>       b:      array<f32>;
@group(0) @binding(2) var<storage, read_write> output: array<f32>;
@group(0) @binding(3) var<uniform>             params: Params;
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) nwg: vec3<u32>) {
    let i = flat_index(gid, nwg);
    if i >= params.count { return; }
    let d = b[i];
    if abs(d) < params.extra {
        output[i] = params.value;
    } else {
        output[i] = a[i] / d;
    }
}
";

const SCALE_WGSL: &str = r"
@group(0) @binding(0) var<storage, read>       input:  array<f32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;
@group(0) @binding(2) var<uniform>             params: Params;
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) nwg: vec3<u32>) {
    let i = flat_index(gid, nwg);
    if i >= params.count { return; }
    output[i] = input[i] * params.value;
}
";

const REDUCE_SUM_WGSL: &str = r"
@group(0) @binding(0) var<storage, read>       input:   array<f32>;
@group(0) @binding(1) var<storage, read_write> partial: array<f32>;
@group(0) @binding(2) var<uniform>             params:  Params;
var<workgroup> scratch: array<f32, 256>;
@compute @workgroup_size(256)
fn main(
    @builtin(global_invocation_id) gid: vec3<u32>,
    @builtin(local_invocation_id) lid: vec3<u32>,
    @builtin(workgroup_id) wid: vec3<u32>,
    @builtin(num_workgroups) nwg: vec3<u32>,
) {
    let i = flat_index(gid, nwg);
    var v = 0.0;
    if i < params.count { v = input[i]; }
    scratch[lid.x] = v;
    workgroupBarrier();
    for (var stride = 128u; stride > 0u; stride = stride / 2u) {
        if lid.x < stride {
            scratch[lid.x] = scratch[lid.x] + scratch[lid.x + stride];
        }
        workgroupBarrier();
    }
    if lid.x == 0u {
        partial[wid.x + wid.y * nwg.x] = scratch[0];
    }
}
";

const COMPLEX_WGSL: &str = r"
fn cmul(a: vec2<f32>, b: vec2<f32>) -> vec2<f32> {
    return vec2<f32>(a.x * b.x - a.y * b.y, a.x * b.y + a.y * b.x);
}
fn conj(a: vec2<f32>) -> vec2<f32> {
    return vec2<f32>(a.x, -a.y);
}
fn magnitude_sq(a: vec2<f32>) -> f32 {
    return a.x * a.x + a.y * a.y;
}
";

const MODULATE_WGSL: &str = r"
@group(0) @binding(0) var<storage, read_write> a:      array<f32>;
@group(0) @binding(1) var<storage, read>       b:      array<f32>;
@group(0) @binding(2) var<uniform>             params: Params;
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) nwg: vec3<u32>) {
    let i = flat_index(gid, nwg);
    if i >= params.count { return; }
    let x = vec2<f32>(a[2u * i], a[2u * i + 1u]);
    let y = vec2<f32>(b[2u * i], b[2u * i + 1u]);
    let r = cmul(x, y) * params.value;
    a[2u * i] = r.x;
    a[2u * i + 1u] = r.y;
}
";

const WIENER_WGSL: &str = r"
@group(0) @binding(0) var<storage, read_write> spectrum: array<f32>;
@group(0) @binding(1) var<storage, read>       otf:      array<f32>;
@group(0) @binding(2) var<uniform>             params:   Params;
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) nwg: vec3<u32>) {
    let i = flat_index(gid, nwg);
    if i >= params.count { return; }
    let s = vec2<f32>(spectrum[2u * i], spectrum[2u * i + 1u]);
    let h = vec2<f32>(otf[2u * i], otf[2u * i + 1u]);
    let gain = 1.0 / (magnitude_sq(h) + params.value);
    let r = cmul(conj(h), s) * (gain * params.extra);
    spectrum[2u * i] = r.x;
    spectrum[2u * i + 1u] = r.y;
}
";

const JVC_UPDATE_WGSL: &str = r"
@group(0) @binding(0) var<storage, read>       input:   array<f32>;
@group(0) @binding(1) var<storage, read>       blurred: array<f32>;
@group(0) @binding(2) var<storage, read_write> guess:   array<f32>;
@group(0) @binding(3) var<uniform>             params:  Params;
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) nwg: vec3<u32>) {
    let i = flat_index(gid, nwg);
    if i >= params.count { return; }
    let o = blurred[i];
    let t = (o - params.value) * params.extra;
    let gamma = 1.0 - t * t;
    guess[i] = max(guess[i] + gamma * (input[i] - o), 0.0);
}
";

/// Real rows of length `n` to their first `stride = n/2 + 1` DFT bins.
const DFT_R2C_WGSL: &str = r"
struct Dft { n: u32, stride: u32, count: u32, sign: f32 }
@group(0) @binding(0) var<storage, read>       input:  array<f32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;
@group(0) @binding(2) var<uniform>             params: Dft;
const TAU: f32 = 6.283185307179586;
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) nwg: vec3<u32>) {
    let o = gid.x + gid.y * nwg.x * 256u;
    if o >= params.count { return; }
    let row = o / params.stride;
    let u = o % params.stride;
    let base = row * params.n;
    var acc = vec2<f32>(0.0, 0.0);
    for (var x = 0u; x < params.n; x = x + 1u) {
        let theta = TAU * f32((u * x) % params.n) / f32(params.n);
        acc = acc + input[base + x] * vec2<f32>(cos(theta), -sin(theta));
    }
    output[2u * o] = acc.x;
    output[2u * o + 1u] = acc.y;
}
";

/// Complex DFT of length `n` along the axis whose bins are `stride` apart.
const DFT_C2C_WGSL: &str = r"
struct Dft { n: u32, stride: u32, count: u32, sign: f32 }
@group(0) @binding(0) var<storage, read>       input:  array<f32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;
@group(0) @binding(2) var<uniform>             params: Dft;
const TAU: f32 = 6.283185307179586;
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) nwg: vec3<u32>) {
    let o = gid.x + gid.y * nwg.x * 256u;
    if o >= params.count { return; }
    let c = (o / params.stride) % params.n;
    let base = o - c * params.stride;
    var acc = vec2<f32>(0.0, 0.0);
    for (var m = 0u; m < params.n; m = m + 1u) {
        let j = base + m * params.stride;
        let v = vec2<f32>(input[2u * j], input[2u * j + 1u]);
        let theta = params.sign * TAU * f32((c * m) % params.n) / f32(params.n);
        let w = vec2<f32>(cos(theta), sin(theta));
        acc = acc + vec2<f32>(v.x * w.x - v.y * w.y, v.x * w.y + v.y * w.x);
    }
    output[2u * o] = acc.x;
    output[2u * o + 1u] = acc.y;
}
";

/// Half-spectrum rows of `stride = n/2 + 1` bins back to real rows of length `n`.
const DFT_C2R_WGSL: &str = r"
struct Dft { n: u32, stride: u32, count: u32, sign: f32 }
@group(0) @binding(0) var<storage, read>       input:  array<f32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;
@group(0) @binding(2) var<uniform>             params: Dft;
const TAU: f32 = 6.283185307179586;
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) nwg: vec3<u32>) {
    let i = gid.x + gid.y * nwg.x * 256u;
    if i >= params.count { return; }
    let row = i / params.n;
    let x = i % params.n;
    let base = row * params.stride;
    var acc = 0.0;
    for (var u = 0u; u < params.stride; u = u + 1u) {
        let j = base + u;
        let theta = TAU * f32((u * x) % params.n) / f32(params.n);
        var weight = 2.0;
        if u == 0u || 2u * u == params.n { weight = 1.0; }
        acc = acc + weight * (input[2u * j] * cos(theta) - input[2u * j + 1u] * sin(theta));
    }
    output[i] = acc;
}
";

// ---------------------------------------------------------------------------
// Uniform parameter structs (must match WGSL layouts exactly)
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ElementParams {
    count: u32,
    value: f32,
    extra: f32,
    pad: u32,
}

impl ElementParams {
    fn new(count: u32, value: f32, extra: f32) -> Self {
        Self {
            count,
            value,
            extra,
            pad: 0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct DftParams {
    n: u32,
    stride: u32,
    count: u32,
    sign: f32,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn gpu_buf(inner: &BufferInner) -> Result<&wgpu::Buffer> {
    match inner {
        BufferInner::Wgpu { buffer, .. } => Ok(buffer),
        BufferInner::Host(_) => Err(ClarityError::InvalidOperation(
            "WgpuBackend received a host buffer".into(),
        )),
    }
}

const fn div_ceil(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

/// Workgroup grid covering `count` invocations of a 256-wide kernel.
fn grid(count: u32) -> (u32, u32, u32) {
    let groups = div_ceil(count.max(1), GPU_WORKGROUP_SIZE);
    let x = groups.min(65_535);
    (x, div_ceil(groups, x), 1)
}

fn count_u32(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| {
        ClarityError::DeviceOutOfMemory {
            bytes: n.saturating_mul(4),
        }
    })
}

fn same_dim(a: Dim3, b: Dim3, op: &str) -> Result<()> {
    if a != b {
        return Err(ClarityError::InvalidArgument(format!(
            "{op}: operand dimensions differ ({a} vs {b})"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// WgpuBackend
// ---------------------------------------------------------------------------

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
    threads: usize,
    // Pipelines
    multiply_pipeline: wgpu::ComputePipeline,
    divide_pipeline: wgpu::ComputePipeline,
    scale_pipeline: wgpu::ComputePipeline,
    reduce_pipeline: wgpu::ComputePipeline,
    modulate_pipeline: wgpu::ComputePipeline,
    wiener_pipeline: wgpu::ComputePipeline,
    jvc_pipeline: wgpu::ComputePipeline,
    r2c_pipeline: wgpu::ComputePipeline,
    c2c_pipeline: wgpu::ComputePipeline,
    c2r_pipeline: wgpu::ComputePipeline,
}

/// Host-side worker count reported for `threads`; 0 selects one per core.
fn resolve_threads(threads: usize) -> usize {
    if threads > 0 {
        return threads;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl WgpuBackend {
    pub fn new(threads: usize) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| ClarityError::InvalidOperation(format!("No suitable GPU adapter found: {e}")))?;

        let adapter_name = adapter.get_info().name.clone();
        tracing::info!("GPU adapter: {adapter_name}");
        let threads = resolve_threads(threads);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("clarity"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
        ))
        .map_err(|e| ClarityError::InvalidOperation(format!("Failed to create GPU device: {e}")))?;

        let mk = |label, body: &str, helpers: &str| {
            let src = format!("{PRELUDE_WGSL}{helpers}{body}");
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(src.into()),
            })
        };
        let pipe = |module: &wgpu::ShaderModule| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: None,
                layout: None,
                module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        };

        let multiply_mod = mk("multiply", MULTIPLY_WGSL, "");
        let divide_mod = mk("divide", DIVIDE_WGSL, "");
        let scale_mod = mk("scale", SCALE_WGSL, "");
        let reduce_mod = mk("reduce_sum", REDUCE_SUM_WGSL, "");
        let modulate_mod = mk("modulate", MODULATE_WGSL, COMPLEX_WGSL);
        let wiener_mod = mk("wiener", WIENER_WGSL, COMPLEX_WGSL);
        let jvc_mod = mk("jvc_update", JVC_UPDATE_WGSL, "");
        let r2c_mod = mk("dft_r2c", DFT_R2C_WGSL, "");
        let c2c_mod = mk("dft_c2c", DFT_C2C_WGSL, "");
        let c2r_mod = mk("dft_c2r", DFT_C2R_WGSL, "");

        Ok(Self {
            adapter_name,
            threads,
            multiply_pipeline: pipe(&multiply_mod),
            divide_pipeline: pipe(&divide_mod),
            scale_pipeline: pipe(&scale_mod),
            reduce_pipeline: pipe(&reduce_mod),
            modulate_pipeline: pipe(&modulate_mod),
            wiener_pipeline: pipe(&wiener_mod),
            jvc_pipeline: pipe(&jvc_mod),
            r2c_pipeline: pipe(&r2c_mod),
            c2c_pipeline: pipe(&c2c_mod),
            c2r_pipeline: pipe(&c2r_mod),
            device,
            queue,
        })
    }

    // --- Buffer helpers ---

    fn check_capacity(&self, floats: usize) -> Result<u64> {
        let bytes = (floats as u64) * 4;
        let limits = self.device.limits();
        let max_binding = limits.max_storage_buffer_binding_size as u64;
        if bytes > limits.max_buffer_size || bytes > max_binding {
            return Err(ClarityError::DeviceOutOfMemory {
                bytes: bytes as usize,
            });
        }
        Ok(bytes)
    }

    fn create_storage(&self, data: &[f32]) -> Result<wgpu::Buffer> {
        self.check_capacity(data.len())?;
        Ok(self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: None,
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            }))
    }

    /// New buffers are zero-initialized by wgpu.
    fn create_storage_zeroed(&self, floats: usize) -> Result<wgpu::Buffer> {
        let size = self.check_capacity(floats)?;
        Ok(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }))
    }

    fn create_uniform<T: Pod>(&self, data: &T) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: None,
                contents: bytemuck::bytes_of(data),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
    }

    fn download_f32(&self, buffer: &wgpu::Buffer) -> Result<Vec<f32>> {
        let size = buffer.size();
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut enc = self.device.create_command_encoder(&Default::default());
        enc.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(enc.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        slice.map_async(wgpu::MapMode::Read, move |r| {
            tx.send(r).ok();
        });
        self.device.poll(wgpu::PollType::wait_indefinitely()).ok();
        rx.recv()
            .map_err(|_| ClarityError::InvalidOperation("GPU channel closed".into()))?
            .map_err(|e| ClarityError::InvalidOperation(format!("Buffer mapping failed: {e}")))?;

        let data = slice.get_mapped_range();
        let result: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();
        Ok(result)
    }

    /// Dispatch a single compute pass; `buffers[i]` is bound at `binding = i`.
    fn dispatch(
        &self,
        pipeline: &wgpu::ComputePipeline,
        buffers: &[&wgpu::Buffer],
        workgroups: (u32, u32, u32),
    ) {
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, buf)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: buf.as_entire_binding(),
            })
            .collect();
        let layout = pipeline.get_bind_group_layout(0);
        let bg = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &layout,
            entries: &entries,
        });
        let mut enc = self.device.create_command_encoder(&Default::default());
        {
            let mut pass = enc.begin_compute_pass(&Default::default());
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bg, &[]);
            pass.dispatch_workgroups(workgroups.0, workgroups.1, workgroups.2);
        }
        self.queue.submit(std::iter::once(enc.finish()));
    }

    fn dft(
        &self,
        pipeline: &wgpu::ComputePipeline,
        input: &wgpu::Buffer,
        output: &wgpu::Buffer,
        params: DftParams,
    ) {
        let uniform = self.create_uniform(&params);
        self.dispatch(pipeline, &[input, output, &uniform], grid(params.count));
    }

    /// Complex DFT along one axis of a `(z, y, x/2 + 1)` half-spectrum.
    fn dft_axis(
        &self,
        input: &wgpu::Buffer,
        output: &wgpu::Buffer,
        dim: Dim3,
        n: usize,
        stride: usize,
        sign: f32,
    ) -> Result<()> {
        self.dft(
            &self.c2c_pipeline,
            input,
            output,
            DftParams {
                n: count_u32(n)?,
                stride: count_u32(stride)?,
                count: count_u32(dim.spectrum_bins())?,
                sign,
            },
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ComputeBackend implementation
// ---------------------------------------------------------------------------

impl ComputeBackend for WgpuBackend {
    fn name(&self) -> &str {
        &self.adapter_name
    }

    fn is_gpu(&self) -> bool {
        true
    }

    fn threads(&self) -> usize {
        self.threads
    }

    fn alloc_real(&self, dim: Dim3) -> Result<RealBuffer> {
        let len = dim.voxel_count();
        let buffer = self.create_storage_zeroed(len)?;
        Ok(RealBuffer::from_inner(BufferInner::Wgpu { buffer, len }, dim))
    }

    fn alloc_spectrum(&self, dim: Dim3) -> Result<SpectrumBuffer> {
        let len = dim.spectrum_len();
        let buffer = self.create_storage_zeroed(len)?;
        Ok(SpectrumBuffer::from_inner(BufferInner::Wgpu { buffer, len }, dim))
    }

    fn alloc_real_and_copy(&self, dim: Dim3, src: &[f32]) -> Result<RealBuffer> {
        dim.check_len(src, "source")?;
        let buffer = self.create_storage(src)?;
        Ok(RealBuffer::from_inner(
            BufferInner::Wgpu {
                buffer,
                len: src.len(),
            },
            dim,
        ))
    }

    fn copy_to_device(&self, dst: &mut RealBuffer, src: &[f32]) -> Result<()> {
        dst.dim().check_len(src, "source")?;
        let buffer = gpu_buf(&dst.inner)?;
        self.queue
            .write_buffer(buffer, 0, bytemuck::cast_slice(src));
        Ok(())
    }

    fn copy_from_device(&self, src: &RealBuffer, dst: &mut [f32]) -> Result<()> {
        src.dim().check_len(dst, "destination")?;
        let data = self.download_f32(gpu_buf(&src.inner)?)?;
        dst.copy_from_slice(&data[..dst.len()]);
        Ok(())
    }

    fn reduce_sum(&self, input: &RealBuffer) -> Result<f32> {
        let count = count_u32(input.len())?;
        let workgroups = grid(count);
        let partial = self.create_storage_zeroed((workgroups.0 * workgroups.1) as usize)?;
        let uniform = self.create_uniform(&ElementParams::new(count, 0.0, 0.0));
        self.dispatch(
            &self.reduce_pipeline,
            &[gpu_buf(&input.inner)?, &partial, &uniform],
            workgroups,
        );
        let sums = self.download_f32(&partial)?;
        Ok(sums.iter().map(|&v| v as f64).sum::<f64>() as f32)
    }

    fn multiply(&self, a: &RealBuffer, b: &RealBuffer, out: &mut RealBuffer) -> Result<()> {
        same_dim(a.dim(), b.dim(), "multiply")?;
        same_dim(a.dim(), out.dim(), "multiply")?;
        let count = count_u32(a.len())?;
        let uniform = self.create_uniform(&ElementParams::new(count, 0.0, 0.0));
        self.dispatch(
            &self.multiply_pipeline,
            &[
                gpu_buf(&a.inner)?,
                gpu_buf(&b.inner)?,
                gpu_buf(&out.inner)?,
                &uniform,
            ],
            grid(count),
        );
        Ok(())
    }

    fn divide(
        &self,
        a: &RealBuffer,
        b: &RealBuffer,
        fallback: f32,
        out: &mut RealBuffer,
    ) -> Result<()> {
        same_dim(a.dim(), b.dim(), "divide")?;
        same_dim(a.dim(), out.dim(), "divide")?;
        let count = count_u32(a.len())?;
        let uniform = self.create_uniform(&ElementParams::new(
            count,
            fallback,
            crate::consts::DIVISION_EPSILON,
        ));
        self.dispatch(
            &self.divide_pipeline,
            &[
                gpu_buf(&a.inner)?,
                gpu_buf(&b.inner)?,
                gpu_buf(&out.inner)?,
                &uniform,
            ],
            grid(count),
        );
        Ok(())
    }

    fn scale(&self, input: &RealBuffer, factor: f32, out: &mut RealBuffer) -> Result<()> {
        same_dim(input.dim(), out.dim(), "scale")?;
        let count = count_u32(input.len())?;
        let uniform = self.create_uniform(&ElementParams::new(count, factor, 0.0));
        self.dispatch(
            &self.scale_pipeline,
            &[gpu_buf(&input.inner)?, gpu_buf(&out.inner)?, &uniform],
            grid(count),
        );
        Ok(())
    }

    fn forward_r2c(&self, input: &RealBuffer, out: &mut SpectrumBuffer) -> Result<()> {
        let dim = input.dim();
        same_dim(dim, out.dim(), "forward transform")?;
        let hx = dim.half_x();
        let spectrum = gpu_buf(&out.inner)?;
        let scratch = self.create_storage_zeroed(dim.spectrum_len())?;

        self.dft(
            &self.r2c_pipeline,
            gpu_buf(&input.inner)?,
            spectrum,
            DftParams {
                n: count_u32(dim.x)?,
                stride: count_u32(hx)?,
                count: count_u32(dim.spectrum_bins())?,
                sign: -1.0,
            },
        );
        self.dft_axis(spectrum, &scratch, dim, dim.y, hx, -1.0)?;
        self.dft_axis(&scratch, spectrum, dim, dim.z, hx * dim.y, -1.0)?;
        Ok(())
    }

    fn inverse_c2r(&self, input: &SpectrumBuffer, out: &mut RealBuffer) -> Result<()> {
        let dim = out.dim();
        same_dim(input.dim(), dim, "inverse transform")?;
        let hx = dim.half_x();
        let after_z = self.create_storage_zeroed(dim.spectrum_len())?;
        let after_y = self.create_storage_zeroed(dim.spectrum_len())?;

        self.dft_axis(gpu_buf(&input.inner)?, &after_z, dim, dim.z, hx * dim.y, 1.0)?;
        self.dft_axis(&after_z, &after_y, dim, dim.y, hx, 1.0)?;
        self.dft(
            &self.c2r_pipeline,
            &after_y,
            gpu_buf(&out.inner)?,
            DftParams {
                n: count_u32(dim.x)?,
                stride: count_u32(hx)?,
                count: count_u32(dim.voxel_count())?,
                sign: 1.0,
            },
        );
        Ok(())
    }

    fn modulate(&self, a: &mut SpectrumBuffer, b: &SpectrumBuffer, scale: f32) -> Result<()> {
        same_dim(a.dim(), b.dim(), "modulate")?;
        let count = count_u32(a.bins())?;
        let uniform = self.create_uniform(&ElementParams::new(count, scale, 0.0));
        self.dispatch(
            &self.modulate_pipeline,
            &[gpu_buf(&a.inner)?, gpu_buf(&b.inner)?, &uniform],
            grid(count),
        );
        Ok(())
    }

    fn wiener_filter(
        &self,
        spectrum: &mut SpectrumBuffer,
        otf: &SpectrumBuffer,
        epsilon: f32,
        scale: f32,
    ) -> Result<()> {
        same_dim(spectrum.dim(), otf.dim(), "wiener filter")?;
        let count = count_u32(spectrum.bins())?;
        let uniform = self.create_uniform(&ElementParams::new(count, epsilon, scale));
        self.dispatch(
            &self.wiener_pipeline,
            &[gpu_buf(&spectrum.inner)?, gpu_buf(&otf.inner)?, &uniform],
            grid(count),
        );
        Ok(())
    }

    fn jansen_van_cittert_update(
        &self,
        input: &RealBuffer,
        blurred: &RealBuffer,
        guess: &mut RealBuffer,
        a: f32,
    ) -> Result<()> {
        same_dim(input.dim(), blurred.dim(), "jansen-van cittert")?;
        same_dim(input.dim(), guess.dim(), "jansen-van cittert")?;
        let count = count_u32(input.len())?;
        let uniform = self.create_uniform(&ElementParams::new(count, a, 1.0 / a));
        self.dispatch(
            &self.jvc_pipeline,
            &[
                gpu_buf(&input.inner)?,
                gpu_buf(&blurred.inner)?,
                gpu_buf(&guess.inner)?,
                &uniform,
            ],
            grid(count),
        );
        Ok(())
    }
}
