use anyhow::{ensure, Result};

use crate::backend::wgpu::config::MAX_DISPATCH_WORKGROUPS;
use crate::backend::wgpu::pipelines::PipelineBundle;

/// Shape a flat work-item count into a 2-D workgroup grid. One axis covers
/// grids up to `MAX_DISPATCH_WORKGROUPS`; bigger grids keep the x extent at
/// the cap so the shader-side linearisation stays dense.
pub fn workgroup_grid(total_items: usize, workgroup_size: u32) -> Result<(u32, u32)> {
    let wg = workgroup_size as usize;
    let groups = (total_items + wg - 1) / wg;
    if groups <= MAX_DISPATCH_WORKGROUPS as usize {
        return Ok((groups.max(1) as u32, 1));
    }
    let rows = (groups + MAX_DISPATCH_WORKGROUPS as usize - 1) / MAX_DISPATCH_WORKGROUPS as usize;
    ensure!(
        rows <= MAX_DISPATCH_WORKGROUPS as usize,
        "dispatch of {total_items} work items exceeds the device grid"
    );
    Ok((MAX_DISPATCH_WORKGROUPS, rows as u32))
}

/// Encode and submit one compute pass over an already-built bind group.
pub fn run_compute(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bundle: &PipelineBundle,
    bind_group: &wgpu::BindGroup,
    grid: (u32, u32),
    label: &str,
) {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some(label),
    });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        pass.set_pipeline(&bundle.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(grid.0, grid.1, 1);
    }
    queue.submit(Some(encoder.finish()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_grids_stay_one_dimensional() {
        assert_eq!(workgroup_grid(1, 64).unwrap(), (1, 1));
        assert_eq!(workgroup_grid(64, 64).unwrap(), (1, 1));
        assert_eq!(workgroup_grid(65, 64).unwrap(), (2, 1));
        assert_eq!(workgroup_grid(0, 64).unwrap(), (1, 1));
    }

    #[test]
    fn large_grids_spill_to_rows() {
        let span = 64usize * MAX_DISPATCH_WORKGROUPS as usize;
        assert_eq!(
            workgroup_grid(span, 64).unwrap(),
            (MAX_DISPATCH_WORKGROUPS, 1)
        );
        assert_eq!(
            workgroup_grid(span + 1, 64).unwrap(),
            (MAX_DISPATCH_WORKGROUPS, 2)
        );
    }
}
