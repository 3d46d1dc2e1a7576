//! Command implementations for mooerctl

pub mod backup;
pub mod frame;
pub mod ir;
pub mod preset;

use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum PresetCommands {
    /// Show a .mo preset file
    Show {
        /// Preset file
        path: PathBuf,
    },

    /// Create a new preset file
    New {
        /// Output file
        path: PathBuf,
        /// Preset name (up to 14 characters)
        #[arg(long)]
        name: Option<String>,
        /// Parameter assignment, e.g. amp.gain=120 (repeatable)
        #[arg(short, long = "param", value_name = "MODULE.PARAM=VALUE")]
        params: Vec<String>,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Change the name or parameters of a preset file
    Set {
        /// Preset file
        path: PathBuf,
        /// New preset name
        #[arg(long)]
        name: Option<String>,
        /// Parameter assignment, e.g. reverb.decay=80 (repeatable)
        #[arg(short, long = "param", value_name = "MODULE.PARAM=VALUE")]
        params: Vec<String>,
        /// Write the result here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the parameters of one module, or of every module
    Params {
        /// Module name (fx, od, amp, cab, ns, eq, mod, delay, reverb)
        module: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// List the presets in a .mbf backup
    List {
        /// Backup file
        path: PathBuf,
    },

    /// Write presets from a backup out as .mo files
    Extract {
        /// Backup file
        path: PathBuf,
        /// Output directory
        out_dir: PathBuf,
        /// Only extract this slot
        #[arg(short, long)]
        slot: Option<usize>,
    },

    /// Build a .mbf backup from .mo files, in slot order
    Pack {
        /// Output backup file
        output: PathBuf,
        /// Preset files for slots 0, 1, 2, ...
        #[arg(required = true)]
        presets: Vec<PathBuf>,
        /// Manufacturer string written to the header
        #[arg(long, env = "MOOERCTL_MANUFACTURER")]
        manufacturer: Option<String>,
        /// Model name written to the header
        #[arg(long, env = "MOOERCTL_MODEL")]
        model: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum IrCommands {
    /// Show the container details of an IR file
    Info {
        /// .gnr or raw IR file
        path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum FrameCommands {
    /// Encode a command and payload into HID reports
    Encode {
        /// Command name (e.g. volume, ACTIVE_PATCH) or byte (e.g. 0xA2)
        command: String,
        /// Payload bytes in hex, e.g. "05 78"
        #[arg(default_value = "")]
        payload: String,
    },

    /// Decode captured HID reports (one hex argument per report)
    Decode {
        #[arg(required = true)]
        reports: Vec<String>,
    },
}
