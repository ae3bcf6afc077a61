use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::logic::converter::{get_converted_filename, ConversionError, FormatConverter};

/// `.doc`/`.docx` via the external `docx2pdf` command.
#[derive(Debug, Clone)]
pub struct WordConverter {
    command: String,
    timeout: Duration,
}

impl WordConverter {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl FormatConverter for WordConverter {
    fn name(&self) -> &'static str {
        "docx2pdf"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<String, ConversionError> {
        let mut command = Command::new(&self.command);
        command.arg(input).arg(output);
        run_converter("docx2pdf", command, self.timeout).await?;

        if !tokio::fs::try_exists(output).await? {
            return Err(ConversionError::MissingOutput(output.to_path_buf()));
        }
        Ok("DOCX converted successfully".to_string())
    }
}

/// `.ppt`/`.pptx` via LibreOffice in headless mode.
#[derive(Debug, Clone)]
pub struct PresentationConverter {
    soffice: PathBuf,
    timeout: Duration,
}

impl PresentationConverter {
    pub fn new(soffice: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            soffice: soffice.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl FormatConverter for PresentationConverter {
    fn name(&self) -> &'static str {
        "libreoffice"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<String, ConversionError> {
        let outdir = output
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut command = Command::new(&self.soffice);
        command
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(outdir)
            .arg(input);
        run_converter("LibreOffice", command, self.timeout).await?;

        // LibreOffice always names the result after the input stem
        let input_name = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let produced = outdir.join(get_converted_filename(&input_name));
        if !tokio::fs::try_exists(&produced).await? {
            return Err(ConversionError::MissingOutput(produced));
        }
        if produced != output {
            tokio::fs::rename(&produced, output).await?;
        }
        Ok("PPTX converted successfully".to_string())
    }
}

/// Runs an external converter to completion, killing it if it outlives
/// `timeout`.
async fn run_converter(
    tool: &str,
    mut command: Command,
    timeout: Duration,
) -> Result<(), ConversionError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConversionError::MissingDependency(format!("{} converter", tool)),
        _ => ConversionError::Io(e),
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(ConversionError::Io(e)),
        Err(_) => {
            log::warn!("{} timed out after {:?}", tool, timeout);
            return Err(ConversionError::Timeout(timeout));
        }
    };

    if !output.status.success() {
        return Err(ConversionError::ToolFailed {
            tool: tool.to_string(),
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_a_missing_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("deck.pptx");
        std::fs::write(&input, b"not really a deck").unwrap();

        let converter = PresentationConverter::new(
            dir.path().join("no-such-soffice"),
            Duration::from_secs(5),
        );
        let err = converter
            .convert(&input, &dir.path().join("deck.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::MissingDependency(_)));
        assert_eq!(err.to_string(), "LibreOffice converter not installed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_reports_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("essay.docx");
        std::fs::write(&input, b"x").unwrap();

        let converter = WordConverter::new("false", Duration::from_secs(5));
        let err = converter
            .convert(&input, &dir.path().join("essay.pdf"))
            .await
            .unwrap_err();
        match err {
            ConversionError::ToolFailed { tool, status, .. } => {
                assert_eq!(tool, "docx2pdf");
                assert_eq!(status, Some(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Writes an executable shell script standing in for an external tool.
    #[cfg(unix)]
    fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    // Mimics `soffice --headless --convert-to pdf --outdir <dir> <input>`:
    // writes <dir>/<input name minus its last extension>.pdf
    #[cfg(unix)]
    const FAKE_SOFFICE: &str = r#"outdir="$5"; input="$6"; base=$(basename "$input"); printf 'fake-pdf' > "$outdir/${base%.*}.pdf""#;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_presentation_with_dotted_stem() {
        let dir = tempfile::tempdir().unwrap();
        let soffice = fake_tool(dir.path(), "soffice", FAKE_SOFFICE);
        let input = dir.path().join("unit.1.pptx");
        std::fs::write(&input, b"deck").unwrap();
        let output = dir.path().join("unit.1.pdf");

        let converter = PresentationConverter::new(soffice, Duration::from_secs(5));
        let message = converter.convert(&input, &output).await.unwrap();

        assert_eq!(message, "PPTX converted successfully");
        assert!(output.is_file());
        assert!(!dir.path().join("unit.pdf").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_presentation_output_is_renamed_to_requested_path() {
        let dir = tempfile::tempdir().unwrap();
        let soffice = fake_tool(dir.path(), "soffice", FAKE_SOFFICE);
        let input = dir.path().join("lecture.v2.ppt");
        std::fs::write(&input, b"deck").unwrap();
        let output = dir.path().join("slides.pdf");

        let converter = PresentationConverter::new(soffice, Duration::from_secs(5));
        converter.convert(&input, &output).await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"fake-pdf");
        assert!(!dir.path().join("lecture.v2.pdf").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_word_conversion_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let docx2pdf = fake_tool(dir.path(), "docx2pdf", r#"printf 'fake-pdf' > "$2""#);
        let input = dir.path().join("essay.docx");
        std::fs::write(&input, b"docx").unwrap();
        let output = dir.path().join("essay.pdf");

        let converter = WordConverter::new(docx2pdf.to_string_lossy(), Duration::from_secs(5));
        let message = converter.convert(&input, &output).await.unwrap();

        assert_eq!(message, "DOCX converted successfully");
        assert!(output.is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_word_converter_without_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let docx2pdf = fake_tool(dir.path(), "docx2pdf", "exit 0");
        let input = dir.path().join("essay.docx");
        std::fs::write(&input, b"docx").unwrap();

        let converter = WordConverter::new(docx2pdf.to_string_lossy(), Duration::from_secs(5));
        let err = converter
            .convert(&input, &dir.path().join("essay.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::MissingOutput(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_converter_times_out() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let err = run_converter("sleep", command, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::Timeout(_)));
    }
}
