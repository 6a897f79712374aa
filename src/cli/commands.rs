//! CLI commands

use std::path::PathBuf;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use tracing::error;

use crate::config::{AuditBackend, Config};
use crate::core::{
    run_kill, AlreadyGonePolicy, ArgumentError, KillMode, KillRequest, MatchCriteria, Report,
};
use crate::db::backend::BackendError;
use crate::db::{AuditStore, AuditTable, MySqlAuditLog, MySqlServer, ServerSettings, SqliteAuditLog};

/// Exit code for `history` and `init-audit` failures
const AUX_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "querykill", version)]
#[command(about = "Find a running MySQL statement by its text, kill it, and record the kill", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.querykill/config.yml)
    #[arg(long, global = true, env = "QUERYKILL_CONFIG")]
    config: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(super) struct ConnectionArgs {
    /// MySQL server host
    #[arg(long)]
    pub(super) host: Option<String>,

    /// MySQL server port
    #[arg(long)]
    pub(super) port: Option<u16>,

    /// MySQL user
    #[arg(short, long)]
    pub(super) user: Option<String>,

    /// MySQL password (can be empty if not set)
    #[arg(short, long, env = "MYSQL_PWD", hide_env_values = true)]
    pub(super) password: Option<String>,
}

#[derive(Args, Debug, Default)]
struct AuditArgs {
    /// Audit store (mysql, sqlite)
    #[arg(long)]
    audit: Option<String>,

    /// Database holding the MySQL audit table
    #[arg(long)]
    audit_database: Option<String>,

    /// SQLite audit file
    #[arg(long)]
    audit_path: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Kill the first running statement containing QUERY
    Kill {
        /// The SQL text (or part of it) to find
        query: Option<String>,

        /// Who is killing the query, recorded in the audit log
        #[arg(long = "killed-by-user", env = "QUERYKILL_ADMIN")]
        killed_by: Option<String>,

        /// Kill only the statement (query) or the whole session (connection)
        #[arg(long)]
        mode: Option<String>,

        /// Match the query text case-sensitively
        #[arg(long)]
        case_sensitive: bool,

        /// Match the query text ignoring case
        #[arg(long, conflicts_with = "case_sensitive")]
        ignore_case: bool,

        /// How to report a session that ended before the kill (already-finished, success)
        #[arg(long)]
        already_gone: Option<String>,

        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        audit: AuditArgs,
    },

    /// Show the most recent audit records
    History {
        /// Number of records
        #[arg(long, default_value = "20")]
        limit: usize,

        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        audit: AuditArgs,
    },

    /// Create the audit table if it does not exist
    InitAudit {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        audit: AuditArgs,
    },

    /// Serve kill requests over HTTP (POST /api/kill-query)
    Serve {
        /// Address to listen on (default: api.listen from config)
        #[arg(long)]
        listen: Option<String>,

        #[command(flatten)]
        audit: AuditArgs,
    },
}

/// Resolved audit destination
#[derive(Debug, Clone, PartialEq)]
pub enum AuditSelection {
    Mysql(AuditTable),
    Sqlite(PathBuf),
}

/// Parse arguments, run the command, and return the process exit code
pub fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = e.print();
                return 0;
            }
            let report = Report::argument_error(&ArgumentError::Invalid {
                field: "arguments",
                reason: e.to_string().trim().to_string(),
            });
            report.emit();
            return report.exit_code();
        }
    };

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let err = ArgumentError::Config(format!("{:#}", e));
            return match cli.command {
                Commands::Kill { .. } => {
                    let report = Report::argument_error(&err);
                    report.emit();
                    report.exit_code()
                }
                _ => {
                    error!("{}", err);
                    AUX_FAILURE
                }
            };
        }
    };

    match cli.command {
        Commands::Kill {
            query,
            killed_by,
            mode,
            case_sensitive,
            ignore_case,
            already_gone,
            connection,
            audit,
        } => {
            let case_sensitive = if case_sensitive {
                true
            } else if ignore_case {
                false
            } else {
                config.matching.case_sensitive
            };
            let input = KillInput {
                query,
                killed_by,
                mode,
                case_sensitive,
                already_gone,
            };
            let report = kill(&config, &connection, &audit, input);
            report.emit();
            report.exit_code()
        }

        Commands::History {
            limit,
            connection,
            audit,
        } => exit_code_of(history(&config, &connection, &audit, limit)),

        Commands::InitAudit { connection, audit } => {
            exit_code_of(init_audit(&config, &connection, &audit))
        }

        Commands::Serve { listen, audit } => exit_code_of(serve(config, &audit, listen)),
    }
}

fn exit_code_of(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            AUX_FAILURE
        }
    }
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    // One run is strictly sequential
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

pub(super) struct KillInput {
    pub(super) query: Option<String>,
    pub(super) killed_by: Option<String>,
    pub(super) mode: Option<String>,
    pub(super) case_sensitive: bool,
    pub(super) already_gone: Option<String>,
}

fn kill(config: &Config, connection: &ConnectionArgs, audit: &AuditArgs, input: KillInput) -> Report {
    let resolved = resolve_server(config, connection).and_then(|settings| {
        let request = resolve_request(config, &settings, input)?;
        let audit = resolve_audit(config, audit)?;
        Ok((settings, request, audit))
    });
    let (settings, request, audit) = match resolved {
        Ok(resolved) => resolved,
        Err(e) => return Report::argument_error(&e),
    };

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => {
            return Report::connection_error(
                &settings.label(),
                &BackendError::Connection(format!("failed to start runtime: {}", e)),
            )
        }
    };

    rt.block_on(execute_kill(&settings, &request, &audit))
}

/// Connect, run the pipeline once, and close the connection
pub(super) async fn execute_kill(
    settings: &ServerSettings,
    request: &KillRequest,
    audit: &AuditSelection,
) -> Report {
    let server = match MySqlServer::connect(settings).await {
        Ok(server) => server,
        Err(e) => return Report::connection_error(&settings.label(), &e),
    };

    let store = audit_store(audit, &server);
    let report = run_kill(&server, store.as_ref(), request).await;

    drop(store);
    server.close().await;
    report
}

fn serve(config: Config, audit: &AuditArgs, listen: Option<String>) -> Result<()> {
    let audit = resolve_audit(&config, audit)?;
    let listen = listen.unwrap_or_else(|| config.api.listen.clone());
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", listen))?;

    let app = super::serve::router(config, audit);

    // Requests are independent; each one gets its own connection
    let rt = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    rt.block_on(super::serve::serve(addr, app))
}

fn history(config: &Config, connection: &ConnectionArgs, audit: &AuditArgs, limit: usize) -> Result<()> {
    let audit = resolve_audit(config, audit)?;
    let server = match audit {
        AuditSelection::Mysql(_) => Some(resolve_server(config, connection)?),
        AuditSelection::Sqlite(_) => None,
    };

    runtime()?.block_on(async {
        let server = match server {
            Some(settings) => Some(MySqlServer::connect(&settings).await?),
            None => None,
        };
        let store: Box<dyn AuditStore> = match (&audit, &server) {
            (AuditSelection::Mysql(table), Some(server)) => {
                Box::new(MySqlAuditLog::new(server.clone(), table.clone()))
            }
            (AuditSelection::Sqlite(path), _) => Box::new(SqliteAuditLog::new(path.clone())),
            (AuditSelection::Mysql(_), None) => anyhow::bail!("MySQL audit store needs a connection"),
        };

        let records = store.recent(limit).await;
        drop(store);
        if let Some(server) = &server {
            server.close().await;
        }
        let records = records?;

        if records.is_empty() {
            println!("No audit records found");
        } else {
            for record in records {
                println!(
                    "[{}] session {} {}@{} db={} by {} - {}",
                    record.killed_at.format("%Y-%m-%d %H:%M:%S"),
                    record.entry.session_id,
                    record.entry.user,
                    record.entry.host,
                    record.entry.db_name.as_deref().unwrap_or("-"),
                    record.entry.killed_by,
                    record.entry.statement.as_deref().unwrap_or("-")
                );
            }
        }
        Ok::<_, anyhow::Error>(())
    })
}

fn init_audit(config: &Config, connection: &ConnectionArgs, audit: &AuditArgs) -> Result<()> {
    let audit = resolve_audit(config, audit)?;

    match audit {
        AuditSelection::Sqlite(path) => runtime()?.block_on(async {
            SqliteAuditLog::new(path.clone()).ensure_schema().await?;
            println!("Audit database ready at {}", path.display());
            Ok::<_, anyhow::Error>(())
        }),
        AuditSelection::Mysql(table) => {
            let settings = resolve_server(config, connection)?;
            runtime()?.block_on(async {
                let server = MySqlServer::connect(&settings).await?;
                let result = MySqlAuditLog::new(server.clone(), table.clone())
                    .ensure_schema()
                    .await;
                server.close().await;
                result?;
                println!("Audit table {} ready on {}", table.qualified(), settings.label());
                Ok::<_, anyhow::Error>(())
            })
        }
    }
}

fn audit_store(selection: &AuditSelection, server: &MySqlServer) -> Box<dyn AuditStore> {
    match selection {
        AuditSelection::Mysql(table) => Box::new(MySqlAuditLog::new(server.clone(), table.clone())),
        AuditSelection::Sqlite(path) => Box::new(SqliteAuditLog::new(path.clone())),
    }
}

pub(super) fn resolve_server(config: &Config, args: &ConnectionArgs) -> Result<ServerSettings, ArgumentError> {
    let host = args
        .host
        .clone()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| Some(config.server.host.clone()).filter(|h| !h.trim().is_empty()))
        .ok_or(ArgumentError::Missing("host"))?;

    let user = args
        .user
        .clone()
        .filter(|u| !u.trim().is_empty())
        .ok_or(ArgumentError::Missing("user"))?;

    Ok(ServerSettings {
        host,
        port: args.port.unwrap_or(config.server.port),
        user,
        password: args.password.clone().unwrap_or_default(),
    })
}

pub(super) fn resolve_request(
    config: &Config,
    settings: &ServerSettings,
    input: KillInput,
) -> Result<KillRequest, ArgumentError> {
    let query = input.query.ok_or(ArgumentError::Missing("query"))?;
    let criteria = MatchCriteria::new(&query, input.case_sensitive)?;

    let killed_by = input
        .killed_by
        .filter(|k| !k.trim().is_empty())
        .ok_or(ArgumentError::Missing("killed-by-user"))?;

    let mode = match input.mode.as_deref() {
        Some(mode) => KillMode::from_str(mode)?,
        None => config.termination.mode,
    };

    let already_gone = match input.already_gone.as_deref() {
        Some(policy) => AlreadyGonePolicy::from_str(policy)?,
        None => config.termination.already_gone,
    };

    Ok(KillRequest {
        criteria,
        mode,
        already_gone,
        killed_by,
        server_label: settings.label(),
    })
}

fn resolve_audit(config: &Config, args: &AuditArgs) -> Result<AuditSelection, ArgumentError> {
    let backend = match args.audit.as_deref() {
        Some(name) => AuditBackend::from_str(name).map_err(|e| ArgumentError::Invalid {
            field: "audit",
            reason: e.to_string(),
        })?,
        None => config.audit.backend,
    };

    match backend {
        AuditBackend::Mysql => {
            let database = args.audit_database.as_deref().or(config.audit.database.as_deref());
            let table = AuditTable::new(database, Some(config.audit.table.as_str()))?;
            Ok(AuditSelection::Mysql(table))
        }
        AuditBackend::Sqlite => {
            let path = match args.audit_path.as_deref() {
                Some(path) => crate::config::config::expand_home(path),
                None => config.resolve_sqlite_path(),
            }
            .map_err(|e| ArgumentError::Config(format!("{:#}", e)))?;
            Ok(AuditSelection::Sqlite(path))
        }
    }
}
