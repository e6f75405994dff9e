//! Turns a [`Config`] into a running server.

use std::fs;
use std::io;
use std::path::PathBuf;

use flies::server::{Server, ServerError};
use flies::writer::{
    DiscardWriter, JsonWriter, MultiWriter, Output, PrettyWriter, RawWriter, RequestWriter, TemplateWriter,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, Format};

/// Failures that keep the listener from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("--template (FLIES_TEMPLATE) must be set when the template format is selected")]
    MissingTemplate,

    #[error("can't read template {path}: {source}")]
    ReadTemplate { path: PathBuf, source: io::Error },

    #[error("invalid template {path}: {source}")]
    ParseTemplate { path: PathBuf, source: minijinja::Error },

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Builds the writer for the selected formats, all writing to `output`.
///
/// In raw mode nothing is parsed, so nothing is rendered either.
pub fn build_writer(config: &Config, output: &Output) -> Result<Box<dyn RequestWriter>, StartupError> {
    if config.raw {
        return Ok(Box::new(DiscardWriter));
    }

    let mut builder = MultiWriter::builder();
    for format in &config.format {
        builder = match format {
            Format::Pretty => builder.add_last(PrettyWriter::new(output.clone()).width(config.width)),
            Format::Json => builder.add_last(JsonWriter::new(output.clone()).pretty(config.json_pretty)),
            Format::Raw => builder.add_last(RawWriter::new(output.clone()).delimiter(config.delimiter())),
            Format::Template => builder.add_last(load_template(config, output)?),
        };
    }

    let writer = builder.build();
    if writer.len() == 1 {
        info!(format = ?config.format[0], "selected output format");
    } else {
        info!(formats = ?config.format, "selected output formats");
    }
    Ok(Box::new(writer))
}

fn load_template(config: &Config, output: &Output) -> Result<TemplateWriter, StartupError> {
    let path = config.template.clone().ok_or(StartupError::MissingTemplate)?;
    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(source) => return Err(StartupError::ReadTemplate { path, source }),
    };
    TemplateWriter::new(output.clone(), source).map_err(|source| StartupError::ParseTemplate { path, source })
}

/// Binds the listener and runs it until ctrl-c.
pub async fn run(config: Config) -> Result<(), StartupError> {
    let stdout = Output::stdout();
    let writer = build_writer(&config, &stdout)?;

    let mut builder = Server::builder().address(config.address()).writer(writer).acknowledge(!config.no_ack);
    if config.raw {
        builder = builder.raw_output(stdout);
    }
    if let Some(timeout) = config.timeout() {
        builder = builder.connection_timeout(timeout);
    }

    let server = builder.bind().await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(cause = %e, "can't listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("received ctrl-c, shutting down");
        })
        .await?;
    Ok(())
}
