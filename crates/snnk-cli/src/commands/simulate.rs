//! `snnk simulate` - run a small demo network through the kernel

use std::path::PathBuf;

use clap::Args;
use snnk_types::{NodeId, RankId};
use tracing::info;

use crate::config::CliConfig;
use crate::demo::{LifNode, LifParams, TableConnectionManager};
use crate::error::CliResult;

/// Run a chain of LIF neurons through the scheduling kernel for a fixed
/// duration and report per-node spike counts.
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// Number of neurons in the demo chain.
    #[arg(long, default_value_t = 10)]
    pub neurons: u64,

    /// Simulated duration, in milliseconds.
    #[arg(long, default_value_t = 100.0)]
    pub duration_ms: f64,

    /// Constant background current injected into neuron 0, in pA.
    #[arg(long, default_value_t = 400.0)]
    pub bias_current: f64,

    /// Synaptic delay between consecutive neurons in the chain, in steps.
    #[arg(long, default_value_t = 2)]
    pub delay_steps: u64,

    /// Number of local worker threads to report to the kernel.
    #[arg(long)]
    pub threads: Option<usize>,
}

impl SimulateCommand {
    /// Execute the simulate subcommand.
    pub fn execute(self, config_path: Option<PathBuf>) -> CliResult<()> {
        let config = match config_path {
            Some(path) => CliConfig::load_from_file(&path)?,
            None => CliConfig::load_from_file(&CliConfig::default_config_path()?)?,
        };
        let num_threads = self.threads.or(config.default_threads).unwrap_or(1);

        info!(
            neurons = self.neurons,
            duration_ms = self.duration_ms,
            "building demo chain"
        );

        let mut kernel = snnk_kernel::SimulationManager::new(
            num_threads,
            1,
            RankId::new(0),
            snnk_kernel::LoopbackTransport,
        )?;

        let bias = self.bias_current;
        kernel.register_node_model("lif", move || {
            Box::new(LifNode::new(LifParams {
                bias_current: 0.0,
                ..LifParams::default()
            }))
        });
        kernel.register_node_model("lif_driver", move || {
            Box::new(LifNode::new(LifParams {
                bias_current: bias,
                ..LifParams::default()
            }))
        });
        kernel.register_connection_model("static_synapse");

        let driver_id = kernel.create("lif_driver", 1)?;
        let rest_ids = kernel.create("lif", self.neurons.saturating_sub(1))?;
        let mut nodes: Vec<NodeId> = driver_id.map(NodeId::new).collect();
        nodes.extend(rest_ids.map(NodeId::new));

        for pair in nodes.windows(2) {
            kernel.connect(&pair[0..1], &pair[1..2], "static_synapse", self.delay_steps, 15.0)?;
        }

        let mut connections = TableConnectionManager::new();
        kernel.simulate(self.duration_ms, &mut connections)?;

        println!("simulated {:.3} ms across {} neuron(s)", kernel.now_ms(), nodes.len());
        let stats = kernel.delivery_stats();
        println!(
            "last slice: {} comm round(s), {} step(s) spent communicating",
            stats.comm_rounds_spike_data, stats.comm_steps_spike_data
        );
        for &id in &nodes {
            let count = kernel.spike_counts().get(&id).copied().unwrap_or(0);
            println!("  {id}: {count} spike(s)");
        }
        let relayed = connections.drain_deliveries().len();
        println!("connection manager relayed {relayed} event(s) downstream");

        Ok(())
    }
}
