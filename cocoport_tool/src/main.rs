use std::{io, path::PathBuf};

use clap::{Parser, ValueEnum};
use cocoport_import::{FileSystemAssetDatabase, ImportConfig, Pipeline, TEMP_FOLDER_NAME};
use cocoport_shared::{
    absolute_path,
    log::{self, info},
};
use color_eyre as ey;
use ey::eyre::Context;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
enum CommandLineArguments {
    /// Imports a builder (.ccbproj) or studio (.ccs) project
    Import(Import),
}

#[derive(Parser, Debug)]
struct Import {
    /// Project descriptor file
    descriptor: PathBuf,

    /// Host project that the resources are imported into
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Folder in the host project in which the staging directories are created
    #[arg(short, long, default_value = TEMP_FOLDER_NAME)]
    temp_folder: String,

    /// Maximum level of the log messages
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn setup_logger(level: log::LevelFilter) -> io::Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                cocoport_shared::chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stdout())
        .apply()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
}

fn main() -> ey::Result<()> {
    let command_line_arguments = CommandLineArguments::parse();
    match &command_line_arguments {
        CommandLineArguments::Import(import) => {
            setup_logger(import.log_level.into()).wrap_err("Failed to setup the logger")?;

            let project_path = absolute_path(&import.project).wrap_err("Failed to resolve the host project path")?;
            let config = ImportConfig::new(project_path).with_temp_folder_name(&import.temp_folder);
            let asset_database = FileSystemAssetDatabase::new(&config);
            let mut pipeline = Pipeline::new(config, &asset_database, &asset_database);

            let report = pipeline
                .import(&import.descriptor)
                .wrap_err_with(|| format!("Failed to import project {:?}", import.descriptor))?;

            info!(
                "Imported {} files and {} scenes of project '{}' to {}",
                report.staged_file_count,
                report.scene_files.len(),
                report.project_name,
                report.destination_url
            );
            info!("Assets are stored in {:?}", pipeline.config().assets_path());
            if !report.warnings.is_empty() {
                info!("{} resources have been skipped, see the warnings above", report.warnings.len());
            }
        }
    }
    Ok(())
}
