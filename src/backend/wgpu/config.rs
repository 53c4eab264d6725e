/// Work items per workgroup for every kernel in this backend; the launch
/// bound the kernels were tuned for.
pub const WORKGROUP_SIZE: u32 = 64;

/// Per-axis dispatch cap; grids past it spill onto the second axis and the
/// shaders linearise `gid` back into one work-item index.
pub const MAX_DISPATCH_WORKGROUPS: u32 = 65_535;

/// Effective workgroup size for kernel compilation and dispatch.
/// Overridable via env `CHIRPZ_WG` (u32). Falls back to WORKGROUP_SIZE.
pub fn effective_workgroup_size() -> u32 {
    if let Ok(val) = std::env::var("CHIRPZ_WG") {
        if let Ok(parsed) = val.trim().parse::<u32>() {
            if parsed > 0 {
                return parsed;
            }
        }
    }
    WORKGROUP_SIZE
}
