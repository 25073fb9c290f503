//! `batchline` — CLI client for the manufacturing batch-tracking server.
//!
//! Manages contexts, batches, and the material/equipment/quality
//! records attached to them. Think of it as `kubectl` for the batch
//! record page.

mod commands;
mod config;

use clap::{Parser, Subcommand, ValueEnum};

/// Batchline CLI tool.
#[derive(Parser, Debug)]
#[command(name = "batchline", about = "Batch-tracking CLI client")]
struct Cli {
    /// Path to client config file (default: ~/.batchline/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Output format: table or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Category {
    Material,
    Equipment,
    Quality,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage contexts.
    #[command(name = "context")]
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Switch the current context.
    #[command(name = "use")]
    Use {
        #[command(subcommand)]
        what: UseWhat,
    },

    /// Batch operations.
    Batch {
        #[command(subcommand)]
        action: BatchAction,
    },

    /// Record operations on a selected batch.
    Record {
        #[command(subcommand)]
        action: RecordAction,
    },

    /// List process segments.
    Segments,

    /// Show a segment's material/equipment/quality definitions.
    Definitions {
        /// Segment name.
        segment: String,
    },

    /// Show the record-field config (status enums).
    Fields,

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum ContextAction {
    /// Create or update a context.
    Create {
        /// Context name.
        name: String,
        /// Server URL.
        #[arg(long)]
        server: String,
        /// Session token.
        #[arg(long, default_value = "")]
        token: String,
        /// Role key or label (admin, write, write_material, ...).
        #[arg(long, default_value = "read")]
        role: String,
    },
    /// List all contexts.
    List,
    /// Set properties on a context.
    Set {
        name: String,
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    /// Delete a context.
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum UseWhat {
    /// Switch to a context.
    Context { name: String },
}

#[derive(Subcommand, Debug)]
enum BatchAction {
    /// List batches, one row per segment instance.
    List {
        /// Filter by product-name keyword.
        #[arg(long)]
        product: Option<String>,
        /// Filter by batch-number keyword (matches the composite key too).
        #[arg(long)]
        batch: Option<String>,
        /// Filter by exact segment.
        #[arg(long)]
        segment: Option<String>,
    },
    /// Show one batch with its sibling segments.
    Show { id: i64 },
    /// Create a batch.
    Create {
        #[arg(long)]
        number: String,
        #[arg(long)]
        product: String,
        #[arg(long)]
        segment: String,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Update a batch's status.
    Status {
        id: i64,
        status: String,
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Move a batch to another segment.
    Segment {
        id: i64,
        segment: String,
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Duplicate a batch into a new number/product.
    Duplicate {
        id: i64,
        #[arg(long)]
        number: String,
        #[arg(long)]
        product: String,
        /// Do not copy child records.
        #[arg(long = "no-copy-records")]
        no_copy_records: bool,
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Delete one batch row (admin only).
    Delete {
        id: i64,
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Bulk delete by product/batch/segment/status (admin only).
    /// Prompts through the cascading selectors when flags are omitted.
    Purge {
        #[arg(long)]
        product: Option<String>,
        #[arg(long)]
        batch: Option<String>,
        #[arg(long)]
        segment: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum RecordAction {
    /// List a batch's records in one category.
    List {
        category: Category,
        /// Batch id.
        #[arg(long)]
        batch: i64,
    },
    /// Add a record.
    Add {
        category: Category,
        #[arg(long)]
        batch: i64,
        #[command(flatten)]
        fields: RecordFields,
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Edit a record. Only the provided flags change; everything else
    /// (schema-unknown attributes included) is preserved.
    Edit {
        category: Category,
        #[arg(long)]
        batch: i64,
        /// Record id.
        id: i64,
        #[command(flatten)]
        fields: RecordFields,
        /// Drop a stored attachment path from the keep-list.
        #[arg(long = "drop")]
        drop: Vec<String>,
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Delete a record.
    Delete {
        category: Category,
        #[arg(long)]
        batch: i64,
        id: i64,
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },
    /// Upload attachments to an existing equipment/quality record,
    /// keeping everything already stored.
    Attach {
        category: Category,
        #[arg(long)]
        batch: i64,
        id: i64,
        /// Files to upload.
        files: Vec<String>,
    },
}

/// Field flags shared by `record add` and `record edit`. Which ones
/// apply depends on the category.
#[derive(clap::Args, Debug, Default)]
struct RecordFields {
    /// Material/equipment code.
    #[arg(long)]
    code: Option<String>,
    /// Material/equipment name (auto-filled for catalog codes).
    #[arg(long)]
    name: Option<String>,
    /// Material weight.
    #[arg(long)]
    weight: Option<String>,
    /// Unit.
    #[arg(long)]
    unit: Option<String>,
    /// Material supplier.
    #[arg(long)]
    supplier: Option<String>,
    /// Material lot number.
    #[arg(long)]
    lot: Option<String>,
    /// Equipment start time (YYYY-MM-DDTHH:MM).
    #[arg(long)]
    start: Option<String>,
    /// Equipment end time.
    #[arg(long)]
    end: Option<String>,
    /// Equipment status.
    #[arg(long)]
    status: Option<String>,
    /// Equipment parameter, key=value. Repeatable.
    #[arg(long = "param")]
    params: Vec<String>,
    /// Quality test item.
    #[arg(long)]
    item: Option<String>,
    /// Quality test value.
    #[arg(long)]
    value: Option<String>,
    /// Quality standard minimum.
    #[arg(long)]
    min: Option<String>,
    /// Quality standard maximum.
    #[arg(long)]
    max: Option<String>,
    /// Quality notes.
    #[arg(long)]
    notes: Option<String>,
    /// Attach a file. Repeatable.
    #[arg(long = "attach")]
    attach: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);
    let json_output = cli.output == "json";

    match cli.command {
        Commands::Context { action } => match action {
            ContextAction::Create {
                name,
                server,
                token,
                role,
            } => {
                commands::context::create(&name, &server, &token, &role, &config_path)?;
            }
            ContextAction::List => {
                commands::context::list(&config_path)?;
            }
            ContextAction::Set {
                name,
                server,
                token,
                role,
            } => {
                commands::context::set(
                    &name,
                    server.as_deref(),
                    token.as_deref(),
                    role.as_deref(),
                    &config_path,
                )?;
            }
            ContextAction::Delete { name } => {
                commands::context::delete(&name, &config_path)?;
            }
        },

        Commands::Use { what } => match what {
            UseWhat::Context { name } => {
                commands::context::use_context(&name, &config_path)?;
            }
        },

        Commands::Batch { action } => match action {
            BatchAction::List {
                product,
                batch,
                segment,
            } => {
                commands::batch::list(product, batch, segment, json_output, &config_path)?;
            }
            BatchAction::Show { id } => {
                commands::batch::show(id, &config_path)?;
            }
            BatchAction::Create {
                number,
                product,
                segment,
                yes,
            } => {
                commands::batch::create(&number, &product, &segment, yes, &config_path)?;
            }
            BatchAction::Status { id, status, yes } => {
                commands::batch::status(id, &status, yes, &config_path)?;
            }
            BatchAction::Segment { id, segment, yes } => {
                commands::batch::segment(id, &segment, yes, &config_path)?;
            }
            BatchAction::Duplicate {
                id,
                number,
                product,
                no_copy_records,
                yes,
            } => {
                commands::batch::duplicate(id, &number, &product, !no_copy_records, yes, &config_path)?;
            }
            BatchAction::Delete { id, yes } => {
                commands::batch::delete(id, yes, &config_path)?;
            }
            BatchAction::Purge {
                product,
                batch,
                segment,
                status,
                yes,
            } => {
                commands::batch::purge(product, batch, segment, status, yes, &config_path)?;
            }
        },

        Commands::Record { action } => match action {
            RecordAction::List { category, batch } => {
                commands::record::list(category, batch, json_output, &config_path)?;
            }
            RecordAction::Add {
                category,
                batch,
                fields,
                yes,
            } => {
                commands::record::add(category, batch, &fields, yes, &config_path)?;
            }
            RecordAction::Edit {
                category,
                batch,
                id,
                fields,
                drop,
                yes,
            } => {
                commands::record::edit(category, batch, id, &fields, &drop, yes, &config_path)?;
            }
            RecordAction::Delete {
                category,
                batch,
                id,
                yes,
            } => {
                commands::record::delete(category, batch, id, yes, &config_path)?;
            }
            RecordAction::Attach {
                category,
                batch,
                id,
                files,
            } => {
                commands::record::attach(category, batch, id, &files, &config_path)?;
            }
        },

        Commands::Segments => {
            commands::schema::segments(json_output, &config_path)?;
        }

        Commands::Definitions { segment } => {
            commands::schema::definitions(&segment, json_output, &config_path)?;
        }

        Commands::Fields => {
            commands::schema::fields(json_output, &config_path)?;
        }

        Commands::Version => {
            println!("batchline cli v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
