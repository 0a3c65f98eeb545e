//! Command line surface of the worker

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "worker")]
#[command(about = "Run one queued algorithm job and report its result", long_about = None)]
pub struct Cli {
    /// JSON service configuration file
    #[arg(long)]
    pub config: PathBuf,

    /// Extra arguments appended to the algorithm command
    #[arg(long = "cliExtra", default_value = "", allow_hyphen_values = true)]
    pub cli_extra: String,

    /// User the job runs on behalf of
    #[arg(long = "userID")]
    pub user_id: String,

    /// Queue service id to report to
    #[arg(long = "serviceID")]
    pub service_id: String,

    /// Queue job id
    #[arg(long = "jobID", default_value = "")]
    pub job_id: String,

    /// Input source as "name:url" (repeatable)
    #[arg(short = 'i', long = "input")]
    pub inputs: Vec<String>,

    /// Output file name (repeatable, at least one)
    #[arg(short = 'o', long = "output", required = true)]
    pub outputs: Vec<String>,

    /// Queue base URL, overriding the service configuration
    #[arg(long = "queueURL")]
    pub queue_url: Option<String>,

    /// Queue API key, overriding the service configuration
    #[arg(long = "apiKey")]
    pub api_key: Option<String>,

    /// Directory inputs are fetched into and the algorithm runs in
    #[arg(long = "workDir", env = "WORKER_DIR", default_value = ".")]
    pub work_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::try_parse_from([
            "worker",
            "--cliExtra",
            "-t 0.5",
            "--userID",
            "analyst",
            "--config",
            "/app/config.json",
            "--serviceID",
            "svc-1",
            "--jobID",
            "J1",
            "-i",
            "n1:https://h/a.txt",
            "-i",
            "n2:https://h/b.tif",
            "-o",
            "shore.geojson",
        ])
        .unwrap();

        assert_eq!(cli.cli_extra, "-t 0.5");
        assert_eq!(cli.user_id, "analyst");
        assert_eq!(cli.job_id, "J1");
        assert_eq!(cli.inputs, vec!["n1:https://h/a.txt", "n2:https://h/b.tif"]);
        assert_eq!(cli.outputs, vec!["shore.geojson"]);
        assert!(cli.queue_url.is_none());
    }

    #[test]
    fn test_outputs_are_required() {
        let result = Cli::try_parse_from([
            "worker",
            "--config",
            "c.json",
            "--userID",
            "u",
            "--serviceID",
            "s",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_user_id_is_required() {
        let result = Cli::try_parse_from([
            "worker",
            "--config",
            "c.json",
            "--serviceID",
            "s",
            "-o",
            "out.txt",
        ]);
        assert!(result.is_err());
    }
}
