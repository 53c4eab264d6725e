use std::fmt::Write;

use crate::backend::wgpu::config::MAX_DISPATCH_WORKGROUPS;

/// Build the chirp-generation shader for one scalar type.
///
/// Bindings: (0) the radix-256 twiddle table as flat scalars, re/im pairs,
/// (1) the chirp buffer as flat scalars covering `2m` complex values,
/// (2) the uniform `ChirpParams`.
///
/// The residue `tx^2 mod 2n` is computed by double-and-add so the square
/// never materialises in 32 bits; this is exact whenever `2n < 2^31`.
pub fn build_chirp_shader(scalar_ty: &str, workgroup_size: u32) -> String {
    let grid_span = workgroup_size * MAX_DISPATCH_WORKGROUPS;
    let mut shader = String::new();
    writeln!(shader, "struct Buf {{ data: array<{scalar_ty}> }};").unwrap();
    writeln!(
        shader,
        "struct Params {{ n: u32, m: u32, twl: u32, dir: i32 }};"
    )
    .unwrap();
    writeln!(
        shader,
        "@group(0) @binding(0) var<storage, read> twiddles: Buf;"
    )
    .unwrap();
    writeln!(
        shader,
        "@group(0) @binding(1) var<storage, read_write> output: Buf;"
    )
    .unwrap();
    writeln!(shader, "@group(0) @binding(2) var<uniform> params: Params;").unwrap();
    writeln!(shader, "const GRID_SPAN: u32 = {grid_span}u;").unwrap();
    writeln!(
        shader,
        "fn mul_mod(a0: u32, b0: u32, modulus: u32) -> u32 {{
    var a = a0 % modulus;
    var acc = 0u;
    for (var b = b0; b > 0u; b = b >> 1u) {{
        if ((b & 1u) != 0u) {{
            acc = (acc + a) % modulus;
        }}
        a = (a + a) % modulus;
    }}
    return acc;
}}"
    )
    .unwrap();
    writeln!(
        shader,
        "fn store(idx: u32, re: {scalar_ty}, im: {scalar_ty}) {{
    output.data[2u * idx] = re;
    output.data[2u * idx + 1u] = im;
}}"
    )
    .unwrap();
    writeln!(
        shader,
        "@compute @workgroup_size({workgroup_size}, 1, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {{
    let tx = gid.x + gid.y * GRID_SPAN;
    if (tx >= params.m) {{
        return;
    }}
    let r = mul_mod(tx, tx, 2u * params.n);
    var u = r;
    var re = twiddles.data[2u * (u & 0xffu)];
    var im = twiddles.data[2u * (u & 0xffu) + 1u];
    for (var level = 1u; level < params.twl; level = level + 1u) {{
        u = u >> 8u;
        let base = 2u * (level * 256u + (u & 0xffu));
        let wr = twiddles.data[base];
        let wi = twiddles.data[base + 1u];
        let next_re = re * wr - im * wi;
        im = re * wi + im * wr;
        re = next_re;
    }}
    if (params.dir < 0) {{
        im = -im;
    }}
    let zero = {scalar_ty}(0.0);
    let m = params.m;
    if (tx == 0u) {{
        store(0u, re, im);
        store(m, re, im);
    }} else if (tx < params.n) {{
        store(tx, re, im);
        store(tx + m, re, im);
        store(m - tx, re, im);
        store(2u * m - tx, re, im);
    }} else if (tx <= m - params.n) {{
        store(tx, zero, zero);
        store(tx + m, zero, zero);
    }}
}}"
    )
    .unwrap();

    shader
}
