use clap::Subcommand;
use std::path::PathBuf;

use crate::config::ToolConfig;

pub mod crc;
pub mod floor;
pub mod init;
pub mod inspect;
pub mod pob;
pub mod tree;
pub mod validate;

#[derive(Subcommand)]
pub enum Commands {
    /// Decode any supported asset and print a summary
    Inspect {
        /// Asset file (.msh, .mgn, .lod, .flr, .pob, .apt, .skt)
        path: PathBuf,

        /// Also dump the decoded record as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Print the FORM/chunk tree of an IFF file
    Tree {
        path: PathBuf,

        /// Show only blocks up to this depth
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Print the CRC-32 of an IFF file (and the stored one for .pob files)
    Crc { path: PathBuf },

    /// Read every known asset under a directory and report failures
    Validate {
        /// Directory to scan (defaults to the configured asset root)
        root: Option<PathBuf>,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Rebuild a floor's cell path graph from its waypoints and portal edges
    FloorGraph {
        /// Source .flr file
        path: PathBuf,

        /// Output file (defaults to overwriting the source)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Building portal id for each local portal index, comma separated
        #[arg(long, value_delimiter = ',')]
        portal_ids: Vec<i32>,
    },

    /// Resolve portal partners and rebuild a building's path graph
    PobGraph {
        /// Source .pob file
        path: PathBuf,

        /// Output file (defaults to overwriting the source)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Asset root used to find cell floors (defaults to the configured one)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// Write a default swgforge.toml
    InitConfig {
        #[arg(default_value = "swgforge.toml")]
        output: PathBuf,
    },
}

impl Commands {
    pub fn execute(&self, config: &ToolConfig) -> anyhow::Result<()> {
        match self {
            Commands::Inspect { path, json } => inspect::execute(path, json.as_deref()),
            Commands::Tree { path, depth } => tree::execute(path, *depth),
            Commands::Crc { path } => crc::execute(path),
            Commands::Validate { root, quiet } => validate::execute(root.as_deref(), config, !*quiet),
            Commands::FloorGraph {
                path,
                output,
                portal_ids,
            } => floor::execute(path, output.as_deref(), portal_ids, config),
            Commands::PobGraph { path, output, root } => {
                pob::execute(path, output.as_deref(), root.as_deref(), config)
            }
            Commands::InitConfig { output } => init::execute(output),
        }
    }
}
