//! `snnk status` - print the kernel's default status dictionary

use std::path::PathBuf;

use clap::Args;
use snnk_kernel::KernelStatus;

use crate::error::CliResult;

/// Print the kernel status dictionary a freshly constructed kernel would
/// report, in the format `set_kernel_status`/`get_kernel_status` use.
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Print as JSON instead of a plain key/value listing.
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    /// Execute the status subcommand.
    pub fn execute(self, _config_path: Option<PathBuf>) -> CliResult<()> {
        let status = KernelStatus::default();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            println!("resolution                = {} ms", status.resolution);
            println!("total_num_virtual_procs    = {}", status.total_num_virtual_procs);
            println!("off_grid_spiking           = {}", status.off_grid_spiking);
            println!("overwrite_files            = {}", status.overwrite_files);
            println!("adaptive_spike_buffers     = {}", status.adaptive_spike_buffers);
            println!("adaptive_target_buffers    = {}", status.adaptive_target_buffers);
            println!("buffer_size_spike_data     = {}", status.buffer_size_spike_data);
            println!("buffer_size_target_data    = {}", status.buffer_size_target_data);
            println!("secondary_events_enabled   = {}", status.secondary_events_enabled);
            println!("tics_per_ms                = {}", status.tics_per_ms);
            println!("tics_per_step              = {}", status.tics_per_step);
        }
        Ok(())
    }
}
