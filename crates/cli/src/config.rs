//! Command line and environment configuration.
//!
//! Every option can be given as a flag or through its `FLIES_*` environment variable; the flag
//! wins when both are set.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::Level;

use flies::server::DEFAULT_PORT;

/// Output formats, several can be combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Banner, timestamp and request count, then the request as sent
    #[value(alias = "default")]
    Pretty,
    /// One JSON document per line
    Json,
    /// The request as sent, followed by the delimiter
    #[value(alias = "pipe")]
    Raw,
    /// The template given with --template
    Template,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "flies", version, about = "Logs every request sent to a port, in full", long_about = None)]
pub struct Config {
    /// Output formats, comma separated
    #[arg(long, env = "FLIES_FORMAT", value_enum, value_delimiter = ',', default_value = "pretty")]
    pub format: Vec<Format>,

    /// Template file for the template format
    #[arg(long, env = "FLIES_TEMPLATE")]
    pub template: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "FLIES_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to listen on
    #[arg(long, env = "FLIES_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Copy connections to stdout byte for byte, without parsing them
    #[arg(long, env = "FLIES_RAW")]
    pub raw: bool,

    /// Written after each request by the raw format, `\n`, `\r`, `\t` and `\\` are unescaped
    #[arg(long, env = "FLIES_DELIMITER", default_value = "\\n")]
    pub delimiter: String,

    /// Column count of the pretty separators
    #[arg(long, env = "FLIES_WIDTH", default_value_t = flies::writer::DEFAULT_WIDTH)]
    pub width: usize,

    /// Indent JSON output
    #[arg(long, env = "FLIES_JSON_PRETTY")]
    pub json_pretty: bool,

    /// Per connection timeout, in seconds
    #[arg(long, env = "FLIES_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Don't answer parsed requests
    #[arg(long, env = "FLIES_NO_ACK")]
    pub no_ack: bool,

    /// Level of the diagnostics written to stderr
    #[arg(long, env = "FLIES_LOG_LEVEL", default_value_t = Level::INFO)]
    pub log_level: Level,
}

impl Config {
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// The raw format delimiter with its escape sequences resolved.
    pub fn delimiter(&self) -> String {
        unescape(&self.delimiter)
    }
}

fn unescape(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('r') => unescaped.push('\r'),
            Some('t') => unescaped.push('\t'),
            Some('0') => unescaped.push('\0'),
            Some('\\') => unescaped.push('\\'),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("flies").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse(&[]);
        assert_eq!(config.format, vec![Format::Pretty]);
        assert_eq!(config.address(), SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert!(!config.raw);
        assert_eq!(config.delimiter(), "\n");
        assert_eq!(config.width, 80);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn comma_separated_formats_and_aliases() {
        let config = parse(&["--format", "default,json,pipe,template"]);
        assert_eq!(config.format, vec![Format::Pretty, Format::Json, Format::Raw, Format::Template]);
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Config::try_parse_from(["flies", "--format", "xml"]).is_err());
    }

    #[test]
    fn listen_options() {
        let config = parse(&["--host", "127.0.0.1", "-p", "9000", "--timeout", "5", "--log-level", "debug"]);
        assert_eq!(config.address(), SocketAddr::from(([127, 0, 0, 1], 9000)));
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn delimiter_escapes() {
        assert_eq!(unescape("\\n"), "\n");
        assert_eq!(unescape("--\\r\\n--"), "--\r\n--");
        assert_eq!(unescape("\\t|\\0|\\\\"), "\t|\0|\\");
        assert_eq!(unescape("\\x"), "\\x");
        assert_eq!(unescape("end\\"), "end\\");
    }
}
