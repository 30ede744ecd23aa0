use super::{AnalysisRequest, AnalysisResult, Analyzer};
use crate::error::AnalyzerError;
use std::io::Write;
use std::process::{Command, Stdio};

/// Runs an external program per analysis.
///
/// The request is written to the program's stdin as JSON and a single JSON
/// result is read from its stdout. A non-zero exit status is a failure and
/// its stderr is reported.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    program: String,
    args: Vec<String>,
}

impl CommandAnalyzer {
    pub fn new(command: &[String]) -> Result<Self, AnalyzerError> {
        let (program, args) = command.split_first().ok_or(AnalyzerError::NotConfigured)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Analyzer for CommandAnalyzer {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalyzerError> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload)?;
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnalyzerError::Failed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let result: AnalysisResult = serde_json::from_slice(&output.stdout)?;
        log::debug!("Analyzer returned a {} result", result.kind());
        Ok(result)
    }
}
