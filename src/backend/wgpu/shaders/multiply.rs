use std::fmt::Write;

use crate::backend::wgpu::config::MAX_DISPATCH_WORKGROUPS;
use crate::kargs::STRIDE_TABLE_WIDTH;

/// Build the scheme-dispatched multiply shader for one scalar type and one
/// input/output layout combination. The scheme itself stays a uniform so a
/// single pipeline serves all three pipeline stages.
///
/// Binding order: input buffer(s), output buffer(s), the packed stride
/// table, then the uniform `MultiplyParams`. Split layouts take two buffers
/// (re then im) where interleaved layouts take one.
pub fn build_multiply_shader(
    scalar_ty: &str,
    input_split: bool,
    output_split: bool,
    workgroup_size: u32,
) -> String {
    let grid_span = workgroup_size * MAX_DISPATCH_WORKGROUPS;
    let mut shader = String::new();
    writeln!(shader, "struct Buf {{ data: array<{scalar_ty}> }};").unwrap();
    writeln!(shader, "struct Words {{ data: array<u32> }};").unwrap();
    writeln!(
        shader,
        "struct Params {{ numof: u32, total: u32, n: u32, m: u32, rank: u32, scheme: u32, dir: i32, _pad: u32 }};"
    )
    .unwrap();
    writeln!(shader, "struct C {{ re: {scalar_ty}, im: {scalar_ty} }};").unwrap();

    let mut binding = 0usize;
    if input_split {
        writeln!(
            shader,
            "@group(0) @binding({binding}) var<storage, read> input_re: Buf;"
        )
        .unwrap();
        binding += 1;
        writeln!(
            shader,
            "@group(0) @binding({binding}) var<storage, read> input_im: Buf;"
        )
        .unwrap();
        binding += 1;
    } else {
        writeln!(
            shader,
            "@group(0) @binding({binding}) var<storage, read> input: Buf;"
        )
        .unwrap();
        binding += 1;
    }
    if output_split {
        writeln!(
            shader,
            "@group(0) @binding({binding}) var<storage, read_write> output_re: Buf;"
        )
        .unwrap();
        binding += 1;
        writeln!(
            shader,
            "@group(0) @binding({binding}) var<storage, read_write> output_im: Buf;"
        )
        .unwrap();
        binding += 1;
    } else {
        writeln!(
            shader,
            "@group(0) @binding({binding}) var<storage, read_write> output: Buf;"
        )
        .unwrap();
        binding += 1;
    }
    writeln!(
        shader,
        "@group(0) @binding({binding}) var<storage, read> strides: Words;"
    )
    .unwrap();
    binding += 1;
    writeln!(
        shader,
        "@group(0) @binding({binding}) var<uniform> params: Params;"
    )
    .unwrap();

    writeln!(shader, "const STRIDE_W: u32 = {STRIDE_TABLE_WIDTH}u;").unwrap();
    writeln!(shader, "const GRID_SPAN: u32 = {grid_span}u;").unwrap();

    if input_split {
        writeln!(
            shader,
            "fn load_in(idx: u32) -> C {{
    return C(input_re.data[idx], input_im.data[idx]);
}}"
        )
        .unwrap();
    } else {
        writeln!(
            shader,
            "fn load_in(idx: u32) -> C {{
    return C(input.data[2u * idx], input.data[2u * idx + 1u]);
}}"
        )
        .unwrap();
    }
    if output_split {
        writeln!(
            shader,
            "fn load_out(idx: u32) -> C {{
    return C(output_re.data[idx], output_im.data[idx]);
}}
fn store_out(idx: u32, v: C) {{
    output_re.data[idx] = v.re;
    output_im.data[idx] = v.im;
}}"
        )
        .unwrap();
    } else {
        writeln!(
            shader,
            "fn load_out(idx: u32) -> C {{
    return C(output.data[2u * idx], output.data[2u * idx + 1u]);
}}
fn store_out(idx: u32, v: C) {{
    output.data[2u * idx] = v.re;
    output.data[2u * idx + 1u] = v.im;
}}"
        )
        .unwrap();
    }

    writeln!(
        shader,
        "@compute @workgroup_size({workgroup_size}, 1, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {{
    let tx = gid.x + gid.y * GRID_SPAN;
    if (tx >= params.total) {{
        return;
    }}
    var counter = tx / params.numof;
    let element = tx - counter * params.numof;
    var i_off = 0u;
    var o_off = 0u;
    for (var d = params.rank; d >= 2u; d = d - 1u) {{
        var current = 1u;
        for (var j = 1u; j < d; j = j + 1u) {{
            current = current * strides.data[j];
        }}
        i_off = i_off + (counter / current) * strides.data[STRIDE_W + d];
        o_off = o_off + (counter / current) * strides.data[2u * STRIDE_W + d];
        counter = counter % current;
    }}
    i_off = i_off + counter * strides.data[STRIDE_W + 1u];
    o_off = o_off + counter * strides.data[2u * STRIDE_W + 1u];
    let i_idx = element * strides.data[STRIDE_W];
    let o_idx = element * strides.data[2u * STRIDE_W];
    switch (params.scheme) {{
        case 0u: {{
            // One shared spectral factor; the batch offset is output-only.
            let a = load_in(i_idx);
            let b = load_out(o_idx + o_off);
            store_out(o_idx + o_off, C(a.re * b.re - a.im * b.im, a.re * b.im + a.im * b.re));
        }}
        case 1u: {{
            // Chirp factors occupy the first m output entries; the padded
            // signal lands in the second m.
            let chirp = load_out(element);
            let dst = o_idx + params.m + o_off;
            if (element < params.n) {{
                let v = load_in(i_idx + i_off);
                store_out(dst, C(v.re * chirp.re + v.im * chirp.im, -v.re * chirp.im + v.im * chirp.re));
            }} else {{
                let zero = {scalar_ty}(0.0);
                store_out(dst, C(zero, zero));
            }}
        }}
        default: {{
            // Chirp factors head the input buffer; the convolution result
            // starts past both chirp copies and is scaled by 1/m.
            let chirp = load_in(element);
            let v = load_in(i_idx + 2u * params.m + i_off);
            let mi = {scalar_ty}(1.0) / {scalar_ty}(params.m);
            store_out(o_idx + o_off, C(mi * (v.re * chirp.re + v.im * chirp.im), mi * (-v.re * chirp.im + v.im * chirp.re)));
        }}
    }}
}}"
    )
    .unwrap();

    shader
}
