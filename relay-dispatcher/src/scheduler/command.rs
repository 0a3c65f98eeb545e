//! Worker command line construction

use relay_core::domain::job::JobInput;
use std::borrow::Cow;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandBuildError {
    #[error("Number of input file names and URLs did not match ({names} names, {urls} URLs)")]
    MismatchedInputs { names: usize, urls: usize },

    #[error("worker command is empty")]
    EmptyCommand,
}

/// Quotes a value for `sh` unless it is made only of characters that need none
fn shell_quote(value: &str) -> Cow<'_, str> {
    if value.is_empty() {
        return Cow::Borrowed("''");
    }

    let safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
    if safe {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(format!("'{}'", value.replace('\'', r"'\''")))
    }
}

/// Builds the shell command a task runs to process one job
///
/// Input names and URLs are paired positionally and must have the same
/// length; nothing is truncated.
pub fn build_worker_command(
    worker_command: &str,
    config_path: &Path,
    service_id: &str,
    job_id: &str,
    input: &JobInput,
) -> Result<String, CommandBuildError> {
    if input.input_names.len() != input.input_urls.len() {
        return Err(CommandBuildError::MismatchedInputs {
            names: input.input_names.len(),
            urls: input.input_urls.len(),
        });
    }

    if worker_command.trim().is_empty() {
        return Err(CommandBuildError::EmptyCommand);
    }

    let config_path = config_path.to_string_lossy();
    let mut parts: Vec<String> = vec![
        worker_command.trim().to_string(),
        "--cliExtra".to_string(),
        shell_quote(&input.command).into_owned(),
        "--userID".to_string(),
        shell_quote(&input.user_id).into_owned(),
        "--config".to_string(),
        shell_quote(&config_path).into_owned(),
        "--serviceID".to_string(),
        shell_quote(service_id).into_owned(),
        "--jobID".to_string(),
        shell_quote(job_id).into_owned(),
    ];

    for (name, url) in input.input_names.iter().zip(&input.input_urls) {
        parts.push("-i".to_string());
        parts.push(shell_quote(&format!("{}:{}", name, url)).into_owned());
    }

    for output in input.output_names() {
        parts.push("-o".to_string());
        parts.push(shell_quote(&output).into_owned());
    }

    Ok(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(names: &[&str], urls: &[&str]) -> JobInput {
        JobInput {
            command: "-t 0.5".to_string(),
            user_id: "analyst".to_string(),
            input_names: names.iter().map(|s| s.to_string()).collect(),
            input_urls: urls.iter().map(|s| s.to_string()).collect(),
            out_geojson: vec!["shore.geojson".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_inputs_are_paired_in_order() {
        let command = build_worker_command(
            "worker",
            Path::new("/app/config.json"),
            "svc-1",
            "J1",
            &job(&["n1", "n2"], &["a.txt", "b.tif"]),
        )
        .unwrap();

        assert!(command.contains("-i n1:a.txt -i n2:b.tif"));
        assert_eq!(command.matches(" -i ").count(), 2);
        assert_eq!(
            command,
            "worker --cliExtra '-t 0.5' --userID analyst --config /app/config.json \
             --serviceID svc-1 --jobID J1 -i n1:a.txt -i n2:b.tif -o shore.geojson"
        );
    }

    #[test]
    fn test_mismatched_inputs() {
        let err = build_worker_command(
            "worker",
            Path::new("config.json"),
            "svc-1",
            "J1",
            &job(&["n1"], &["a.txt", "b.tif"]),
        )
        .unwrap_err();

        assert_eq!(err, CommandBuildError::MismatchedInputs { names: 1, urls: 2 });
        assert!(err.to_string().contains("did not match"));
    }

    #[test]
    fn test_empty_worker_command() {
        let err = build_worker_command(" ", Path::new("c.json"), "s", "J", &job(&[], &[]))
            .unwrap_err();
        assert_eq!(err, CommandBuildError::EmptyCommand);
    }

    #[test]
    fn test_quoting() {
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("a.tif"), "a.tif");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(
            shell_quote("https://h/x?a=1&b=2"),
            "'https://h/x?a=1&b=2'"
        );
    }

    #[test]
    fn test_all_outputs_are_listed() {
        let mut input = job(&[], &[]);
        input.out_tiffs = vec!["ndwi.tif".to_string()];
        input.out_txts = vec!["stats.txt".to_string()];

        let command =
            build_worker_command("worker", Path::new("c.json"), "s", "J", &input).unwrap();
        assert!(command.ends_with("-o shore.geojson -o ndwi.tif -o stats.txt"));
        assert!(!command.contains(" -i "));
    }
}
