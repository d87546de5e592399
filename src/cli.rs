//! Command Line Interface (CLI) arguments.

use clap::Parser;

/// Student performance server command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "STUDENT_PERF_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 3000, env = "PORT")]
    pub port: u16,
    /// Path to the SQLite database file holding the Student table
    #[arg(long, default_value = "student_perf.db", env = "STUDENT_PERF_DATABASE")]
    pub database: String,
    /// Maximum time in seconds to wait for requests to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "STUDENT_PERF_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}

/// Student performance CSV ingestion command line interface
#[derive(Clone, Debug, Parser)]
pub struct IngestArgs {
    /// CSV file whose header names columns of the Student table
    #[arg(default_value = "student-por.csv")]
    pub csv_file: String,
    /// Path to the SQLite database file to populate
    #[arg(long, default_value = "student_perf.db", env = "STUDENT_PERF_DATABASE")]
    pub database: String,
    /// Field delimiter of the CSV file
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
}

/// Returns parsed ingestion command line arguments.
pub fn parse_ingest() -> IngestArgs {
    IngestArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CommandLineArgs::try_parse_from(["student-perf"]).unwrap();
        assert_eq!("0.0.0.0", args.host);
        assert_eq!("student_perf.db", args.database);
        assert_eq!(60, args.graceful_shutdown_timeout);
    }

    #[test]
    fn explicit_port() {
        let args = CommandLineArgs::try_parse_from(["student-perf", "--port", "8080"]).unwrap();
        assert_eq!(8080, args.port);
    }

    #[test]
    fn ingest_args() {
        let args = IngestArgs::try_parse_from([
            "student-perf-ingest",
            "--delimiter",
            ";",
            "--database",
            "other.db",
            "data.csv",
        ])
        .unwrap();
        assert_eq!("data.csv", args.csv_file);
        assert_eq!("other.db", args.database);
        assert_eq!(';', args.delimiter);
    }
}
