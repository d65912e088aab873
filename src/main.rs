use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sigtap::{
    load_layouts,
    process::{persist_all, Decoder, PersistOptions},
    schema::{target_type, write_layout_json},
    FsDirectory, OutputCompression, SigtapConfig, SourceEncoding,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "sigtap")]
#[command(about = "Decode SIGTAP fixed-width tables using their layout files")]
struct Args {
    /// YAML config file; flags below override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding `<table>.txt` and `<table>_layout.txt`
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Fail on lines shorter than the layout's record width
    #[arg(long, global = true)]
    strict: bool,

    /// Layout and data file encoding: utf-8 or latin1
    #[arg(long, global = true)]
    encoding: Option<SourceEncoding>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List layouts with their columns and target types
    Layouts {
        /// Also write `<table>_columns.json` descriptions here
        #[arg(long)]
        json_out: Option<PathBuf>,
    },
    /// Decode every table and print row counts
    Decode {
        /// Print the first records of this table
        #[arg(short, long)]
        table: Option<String>,

        /// Records to print with --table
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Ignore blank lines in data files
        #[arg(long)]
        skip_blank: bool,
    },
    /// Decode every table and write one Parquet file per table
    Export {
        /// Output directory (default from config: ./parquet)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Keep every column as text instead of coercing declared types
        #[arg(long)]
        raw: bool,

        /// snappy, zstd or uncompressed
        #[arg(long)]
        compression: Option<OutputCompression>,

        /// Ignore blank lines in data files
        #[arg(long)]
        skip_blank: bool,
    },
}

impl Args {
    fn resolve_config(&self) -> Result<SigtapConfig> {
        let mut cfg = match &self.config {
            Some(path) => SigtapConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => SigtapConfig::default(),
        };
        if let Some(dir) = &self.dir {
            cfg.source_dir = dir.clone();
        }
        if self.strict {
            cfg.strict = true;
        }
        if let Some(enc) = self.encoding {
            cfg.encoding = enc;
        }
        match &self.command {
            Command::Decode { skip_blank, .. } if *skip_blank => cfg.skip_blank_lines = true,
            Command::Export {
                out,
                raw,
                compression,
                skip_blank,
            } => {
                if let Some(out) = out {
                    cfg.output_dir = out.clone();
                }
                if *raw {
                    cfg.typed_output = false;
                }
                if let Some(c) = compression {
                    cfg.compression = *c;
                }
                if *skip_blank {
                    cfg.skip_blank_lines = true;
                }
            }
            _ => {}
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let default_level = if args.verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sigtap={}", default_level, default_level)));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) resolve config ───────────────────────────────────────────
    let cfg = args.resolve_config()?;
    let source = FsDirectory::new(&cfg.source_dir);

    // ─── 3) load layouts ─────────────────────────────────────────────
    info!(dir = %cfg.source_dir.display(), encoding = ?cfg.encoding, "loading layouts");
    let layouts = load_layouts(&source, &cfg.naming, cfg.encoding)
        .with_context(|| format!("loading layouts from {}", cfg.source_dir.display()))?;

    // ─── 4) run the subcommand ───────────────────────────────────────
    match &args.command {
        Command::Layouts { json_out } => {
            for layout in layouts.values() {
                println!(
                    "{} ({} columns, {} bytes)",
                    layout.table_name(),
                    layout.columns().len(),
                    layout.record_width()
                );
                for col in layout.columns() {
                    println!(
                        "  {:<30} {:>5}..={:<5} {:<14} -> {}",
                        col.name(),
                        col.start(),
                        col.end(),
                        col.declared_type().unwrap_or("-"),
                        target_type(col.declared_type())
                    );
                }
                if let Some(dir) = json_out {
                    write_layout_json(layout, dir)?;
                }
            }
        }
        Command::Decode { table, limit, .. } => {
            let tables = Decoder::from_config(&cfg).decode_directory(&layouts, &source, &cfg.naming)?;
            for (name, decoded) in &tables {
                println!("{},{}", name, decoded.len());
            }
            if let Some(name) = table {
                let Some(decoded) = tables.get(name) else {
                    bail!("no data file for table `{}`", name);
                };
                for record in decoded.records().take(*limit) {
                    let line: Vec<String> = record
                        .iter()
                        .map(|(col, value)| format!("{}={}", col, value))
                        .collect();
                    println!("{}", line.join(" | "));
                }
            }
        }
        Command::Export { .. } => {
            let tables = Decoder::from_config(&cfg).decode_directory(&layouts, &source, &cfg.naming)?;
            let written = persist_all(
                &tables,
                &layouts,
                &cfg.output_dir,
                &PersistOptions::from_config(&cfg),
            )?;
            println!(
                "→ wrote {} parquet files to {}",
                written.len(),
                cfg.output_dir.display()
            );
        }
    }

    info!("all done");
    Ok(())
}
